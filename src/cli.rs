//! Command line arguments and parameters management/parsing.
use std::path::PathBuf;

use structopt::StructOpt;

use rexfilter::config::Config;
use rexfilter::error::Error;

#[derive(Debug, StructOpt)]
#[structopt(name = "rexfilter", about = "document quality and deduplication pipeline.")]
/// Holds every command that is callable by the `rexfilter` command.
pub enum Rexfilter {
    #[structopt(about = "Filter and deduplicate documents")]
    Run(Run),
    #[structopt(about = "Print the JSON schema of processed documents")]
    Schema,
}

#[derive(Debug, StructOpt)]
/// Run command and parameters.
///
/// ```sh
/// rexfilter-run 0.1.0
/// Filter and deduplicate documents
///
/// USAGE:
///     rexfilter run [FLAGS] [OPTIONS] <src> <dst>
///
/// FLAGS:
///     -k, --kept-only    only write kept documents
///
/// OPTIONS:
///     -c, --config <config>          JSON configuration file
///     -s, --state-dir <state-dir>    dedup state directory
///     -t, --target <target>          target language (BCP-47)
///     -w, --workers <workers>        number of workers
///
/// ARGS:
///     <src>    source documents (.jsonl or .jsonl.gz)
///     <dst>    processed documents (.jsonl or .jsonl.gz)
/// ```
pub struct Run {
    #[structopt(parse(from_os_str), help = "source documents (.jsonl or .jsonl.gz)")]
    pub src: PathBuf,
    #[structopt(parse(from_os_str), help = "processed documents (.jsonl or .jsonl.gz)")]
    pub dst: PathBuf,
    #[structopt(short, long, parse(from_os_str), help = "JSON configuration file")]
    pub config: Option<PathBuf>,
    #[structopt(
        short,
        long,
        parse(from_os_str),
        help = "dedup state directory. Dedup state is not persisted if missing."
    )]
    pub state_dir: Option<PathBuf>,
    #[structopt(short, long, help = "target language (BCP-47)")]
    pub target: Option<String>,
    #[structopt(short, long, help = "number of workers. Default is one per core.")]
    pub workers: Option<usize>,
    #[structopt(short, long, help = "only write kept documents")]
    pub kept_only: bool,
}

impl Run {
    /// Configuration file (or defaults), overridden by command line flags.
    pub fn config(&self) -> Result<Config, Error> {
        let mut config = match &self.config {
            Some(path) => Config::from_path(path)?,
            None => Config::default(),
        };

        if let Some(state_dir) = &self.state_dir {
            config.state_dir = Some(state_dir.clone());
        }
        if let Some(target) = &self.target {
            config.target_language = target.clone();
        }
        if self.workers.is_some() {
            config.workers = self.workers;
        }

        config.validate()?;
        Ok(config)
    }
}
