//! Processed document sinks.
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    sync::Mutex,
};

use flate2::{write::GzEncoder, Compression};

use crate::error::Error;
use crate::pipelines::types::ProcessedDocument;

/// Receives processed documents, from several workers at once.
pub trait Sink: Sync {
    fn emit(&self, doc: ProcessedDocument) -> Result<(), Error>;

    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Called once, after the last document. Nothing can be emitted afterwards.
    fn finish(&self) -> Result<(), Error> {
        self.flush()
    }
}

enum Output {
    Plain(Box<dyn Write + Send>),
    Gzip(GzEncoder<File>),
}

impl Output {
    /// Write the gzip trailer, if any.
    fn finish(&mut self) -> io::Result<()> {
        match self {
            Output::Plain(w) => w.flush(),
            Output::Gzip(encoder) => encoder.try_finish(),
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Plain(w) => w.write(buf),
            Output::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Plain(w) => w.flush(),
            Output::Gzip(encoder) => encoder.flush(),
        }
    }
}

/// Writes one JSON object per line.
pub struct JsonlWriter {
    writer: Mutex<BufWriter<Output>>,
    kept_only: bool,
}

impl JsonlWriter {
    /// Create (or truncate) `dst`. Output is gzipped if `dst` ends with `.gz`.
    ///
    /// Rejected documents are skipped if `kept_only` is set.
    pub fn create(dst: &Path, kept_only: bool) -> Result<Self, Error> {
        let file = File::create(dst)?;
        let output = if super::is_gzipped(dst) {
            Output::Gzip(GzEncoder::new(file, Compression::default()))
        } else {
            Output::Plain(Box::new(file))
        };
        Ok(Self::with_output(output, kept_only))
    }

    pub fn from_writer(writer: Box<dyn Write + Send>, kept_only: bool) -> Self {
        Self::with_output(Output::Plain(writer), kept_only)
    }

    fn with_output(output: Output, kept_only: bool) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(output)),
            kept_only,
        }
    }
}

impl Sink for JsonlWriter {
    fn emit(&self, doc: ProcessedDocument) -> Result<(), Error> {
        if self.kept_only && !doc.verdict().keep() {
            return Ok(());
        }

        // serialize outside of the lock
        let mut line = serde_json::to_vec(&doc)?;
        line.push(b'\n');

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::Custom("output writer lock is poisoned".to_string()))?;
        writer.write_all(&line)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::Custom("output writer lock is poisoned".to_string()))?;
        writer.flush()?;
        Ok(())
    }

    fn finish(&self) -> Result<(), Error> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::Custom("output writer lock is poisoned".to_string()))?;
        writer.flush()?;
        writer.get_mut().finish()?;
        Ok(())
    }
}

/// Keeps documents in memory.
#[derive(Default)]
pub struct MemorySink {
    docs: Mutex<Vec<ProcessedDocument>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<ProcessedDocument> {
        match self.docs.into_inner() {
            Ok(docs) => docs,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.lock().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Sink for MemorySink {
    fn emit(&self, doc: ProcessedDocument) -> Result<(), Error> {
        self.docs
            .lock()
            .map_err(|_| Error::Custom("memory sink lock is poisoned".to_string()))?
            .push(doc);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::pipelines::types::{Document, DocumentRecord, Reason};

    fn processed(id: &str, keep: bool) -> ProcessedDocument {
        let doc = Document::new(DocumentRecord::from_text(id, "Eine Zeile."));
        if keep {
            doc.into_processed(true, Reason::Kept)
        } else {
            doc.into_processed(false, Reason::TooShort)
        }
    }

    fn written(kept_only: bool, path: &Path) -> Vec<serde_json::Value> {
        {
            let writer = JsonlWriter::create(path, kept_only).unwrap();
            writer.emit(processed("a", true)).unwrap();
            writer.emit(processed("b", false)).unwrap();
            writer.flush().unwrap();
        }
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn all_documents() {
        let dir = tempfile::tempdir().unwrap();
        let docs = written(false, &dir.path().join("out.jsonl"));
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["verdict"]["id"], "a");
        assert_eq!(docs[0]["verdict"]["keep"], true);
        assert_eq!(docs[1]["verdict"]["reason"], "too_short");
    }

    #[test]
    fn kept_only() {
        let dir = tempfile::tempdir().unwrap();
        let docs = written(true, &dir.path().join("out.jsonl"));
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn gzipped_output_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl.gz");
        let writer = JsonlWriter::create(&path, false).unwrap();
        writer.emit(processed("a", true)).unwrap();
        writer.emit(processed("b", false)).unwrap();
        writer.finish().unwrap();

        // complete before the writer is dropped
        let mut text = String::new();
        flate2::read::GzDecoder::new(File::open(&path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        let ids: Vec<String> = text
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
            .map(|value| value["record"]["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        drop(writer);
    }

    #[test]
    fn memory() {
        let sink = MemorySink::new();
        sink.emit(processed("a", true)).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.into_inner()[0].verdict().id(), "a");
    }
}
