//! JSON Lines document reader.
use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use flate2::read::MultiGzDecoder;

use crate::error::Error;
use crate::pipelines::types::DocumentRecord;

/// Iterates over the [DocumentRecord]s of a JSON Lines stream.
///
/// Blank lines are skipped. A line that can not be deserialized (invalid JSON or invalid UTF-8)
/// yields an [Error::Serde] and iteration can go on, while an [Error::Io] means the stream
/// is unusable.
pub struct DocumentReader {
    reader: BufReader<Box<dyn Read + Send>>,
    buf: Vec<u8>,
    line_nb: usize,
}

impl DocumentReader {
    /// Open a (possibly gzipped) JSON Lines file.
    pub fn open(src: &Path) -> Result<Self, Error> {
        let file = File::open(src)?;
        let reader: Box<dyn Read + Send> = if super::is_gzipped(src) {
            debug!("reading gzipped documents from {:?}", src);
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(Self::from_reader(reader))
    }

    pub fn from_reader(reader: Box<dyn Read + Send>) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
            line_nb: 0,
        }
    }

    /// Number of lines read so far.
    pub fn line_nb(&self) -> usize {
        self.line_nb
    }
}

impl Iterator for DocumentReader {
    type Item = Result<DocumentRecord, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => (),
                Err(e) => return Some(Err(e.into())),
            }
            self.line_nb += 1;

            if self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            // bytes are parsed as is, so that invalid UTF-8 only spoils its own line
            return Some(serde_json::from_slice(&self.buf).map_err(|e| {
                warn!("line {}: invalid document: {}", self.line_nb, e);
                e.into()
            }));
        }
    }
}
