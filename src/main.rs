//! # rexfilter
//!
//! Document quality and deduplication pipeline for web corpora.
//!
//! ```sh
//! rexfilter 0.1.0
//! document quality and deduplication pipeline.
//!
//! USAGE:
//!     rexfilter <SUBCOMMAND>
//!
//! FLAGS:
//!     -h, --help       Prints help information
//!     -V, --version    Prints version information
//!
//! SUBCOMMANDS:
//!     help      Prints this message or the help of the given subcommand(s)
//!     run       Filter and deduplicate documents
//!     schema    Print the JSON schema of processed documents
//! ```
//!
//! Logging is configured through `RUST_LOG` (e.g. `RUST_LOG=rexfilter=info`).
use rexfilter::error::Error;
use rexfilter::pipelines::types::ProcessedDocument;
use rexfilter::pipelines::{CorpusRun, Pipeline};
use structopt::StructOpt;

#[macro_use]
extern crate log;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();

    let opt = cli::Rexfilter::from_args();
    debug!("cli args\n{:#?}", opt);

    match opt {
        cli::Rexfilter::Run(r) => {
            let config = r.config()?;
            let run = CorpusRun::new(r.src, r.dst, config).kept_only(r.kept_only);

            let shutdown = run.shutdown_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupted, finishing in-flight documents");
                    shutdown.trigger();
                }
            });

            let summary = tokio::task::spawn_blocking(move || run.run())
                .await
                .map_err(|e| Error::Custom(format!("pipeline task failed: {e}")))??;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        cli::Rexfilter::Schema => {
            println!("{}", ProcessedDocument::get_schema()?);
        }
    };
    Ok(())
}
