/*! # rexfilter

Document quality and deduplication pipeline for web corpora.

Normalized documents (see [pipelines::types::DocumentRecord]) go through exact
and near duplicate detection, language identification, boilerplate labeling,
in-document deduplication and quality assessment, and come out as a
[pipelines::types::ProcessedDocument]: a verdict and the pruned record.

```no_run
use rexfilter::config::Config;
use rexfilter::pipelines::{CorpusRun, Pipeline};

let run = CorpusRun::new("in.jsonl.gz".into(), "out.jsonl.gz".into(), Config::default());
let summary = run.run().unwrap();
println!("{} documents kept", summary.kept);
```
!*/
#[macro_use]
extern crate log;

pub mod config;
pub mod dedup;
pub mod error;
pub mod filtering;
pub mod identifiers;
pub mod io;
pub mod pipelines;
pub mod transformers;
