//! Error enum
use std::fmt;

use crate::dedup::StoreError;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Serde(serde_json::Error),
    AvroError(avro_rs::Error),
    Glob(glob::GlobError),
    GlobPattern(glob::PatternError),
    LanguageTag(oxilangtag::LanguageTagParseError),
    ThreadPool(rayon::ThreadPoolBuildError),
    Store(StoreError),
    Config(String),
    FastText(String),
    Custom(String),

    /// Too many documents errored during a run.
    RunFailed {
        errored: usize,
        processed: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {e}"),
            Error::Serde(e) => write!(f, "serialization error: {e}"),
            Error::AvroError(e) => write!(f, "avro error: {e}"),
            Error::Glob(e) => write!(f, "glob error: {e}"),
            Error::GlobPattern(e) => write!(f, "glob pattern error: {e}"),
            Error::LanguageTag(e) => write!(f, "invalid language tag: {e}"),
            Error::ThreadPool(e) => write!(f, "could not build worker pool: {e}"),
            Error::Store(e) => write!(f, "store error: {e}"),
            Error::Config(msg) => write!(f, "invalid configuration: {msg}"),
            Error::FastText(msg) => write!(f, "fasttext error: {msg}"),
            Error::Custom(msg) => write!(f, "{msg}"),
            Error::RunFailed { errored, processed } => write!(
                f,
                "run failed: {errored} out of {processed} documents errored"
            ),
        }
    }
}

impl std::error::Error for Error {}

impl From<avro_rs::Error> for Error {
    fn from(v: avro_rs::Error) -> Self {
        Self::AvroError(v)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<glob::GlobError> for Error {
    fn from(e: glob::GlobError) -> Error {
        Error::Glob(e)
    }
}

impl From<glob::PatternError> for Error {
    fn from(e: glob::PatternError) -> Error {
        Error::GlobPattern(e)
    }
}

impl From<oxilangtag::LanguageTagParseError> for Error {
    fn from(e: oxilangtag::LanguageTagParseError) -> Error {
        Error::LanguageTag(e)
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(e: rayon::ThreadPoolBuildError) -> Error {
        Error::ThreadPool(e)
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Error {
        Error::Store(e)
    }
}

impl From<String> for Error {
    fn from(s: String) -> Error {
        Error::Custom(s)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Serde(e)
    }
}
