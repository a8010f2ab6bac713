//! Upstream document representation.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A contiguous text unit (a paragraph, a list, a menu...).
///
/// Serialized as an array of lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Block {
    lines: Vec<String>,
}

impl Block {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// trimmed, non-empty lines
    pub fn normalized_lines(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
    }

    /// Normalized text of the block (trimmed non-empty lines joined with `\n`).
    pub fn text(&self) -> String {
        self.normalized_lines().collect::<Vec<_>>().join("\n")
    }

    /// true if the block has no non-whitespace character.
    pub fn is_blank(&self) -> bool {
        self.normalized_lines().next().is_none()
    }
}

impl<S: Into<String>> FromIterator<S> for Block {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// A document as produced by ingestion (HTML stripped, encoding fixed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentRecord {
    /// source identifier, usually the URL
    id: String,
    /// target URI, when it differs from `id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    /// capture time (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    /// declared or detected original encoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encoding: Option<String>,
    blocks: Vec<Block>,
}

impl DocumentRecord {
    pub fn new(id: String, blocks: Vec<Block>) -> Self {
        Self {
            id,
            url: None,
            timestamp: None,
            encoding: None,
            blocks,
        }
    }

    /// Build a record from plain text.
    /// Blocks are separated by blank lines.
    pub fn from_text(id: &str, text: &str) -> Self {
        let mut blocks = Vec::new();
        let mut current = Vec::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                if !current.is_empty() {
                    blocks.push(Block::new(std::mem::take(&mut current)));
                }
            } else {
                current.push(line.to_string());
            }
        }
        if !current.is_empty() {
            blocks.push(Block::new(current));
        }

        Self::new(id.to_string(), blocks)
    }

    pub fn with_url(mut self, url: String) -> Self {
        self.url = Some(url);
        self
    }

    pub fn with_timestamp(mut self, timestamp: String) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_encoding(mut self, encoding: String) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Target URL, falling back on the id.
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or(&self.id)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Whole document text used for fingerprinting and shingling:
    /// lines are trimmed, empty lines dropped, blocks joined with a blank line.
    pub fn normalized_text(&self) -> String {
        self.blocks
            .iter()
            .filter(|block| !block.is_blank())
            .map(|block| block.text())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// true if there is no text at all.
    pub fn is_blank(&self) -> bool {
        self.blocks.iter().all(Block::is_blank)
    }

    /// Same record with other blocks.
    pub fn with_blocks(&self, blocks: Vec<Block>) -> Self {
        Self {
            id: self.id.clone(),
            url: self.url.clone(),
            timestamp: self.timestamp.clone(),
            encoding: self.encoding.clone(),
            blocks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_splits_on_blank_lines() {
        let r = DocumentRecord::from_text("a", "one\ntwo\n\n  \nthree\n");
        assert_eq!(r.blocks().len(), 2);
        assert_eq!(r.blocks()[0].lines(), &["one", "two"]);
        assert_eq!(r.blocks()[1].lines(), &["three"]);
    }

    #[test]
    fn normalization_ignores_layout() {
        let a = DocumentRecord::new(
            "a".to_string(),
            vec![
                Block::from_iter(["  first line ", "", "second"]),
                Block::from_iter(["   "]),
                Block::from_iter(["third"]),
            ],
        );
        let b = DocumentRecord::from_text("b", "first line\nsecond\n\nthird");
        assert_eq!(a.normalized_text(), "first line\nsecond\n\nthird");
        assert_eq!(a.normalized_text(), b.normalized_text());
    }

    #[test]
    fn deserialize_minimal() {
        let r: DocumentRecord =
            serde_json::from_str(r#"{"id":"https://example.de/","blocks":[["a","b"],["c"]]}"#)
                .unwrap();
        assert_eq!(r.url(), "https://example.de/");
        assert_eq!(r.timestamp(), None);
        assert_eq!(r.blocks()[0].lines(), &["a", "b"]);
    }

    #[test]
    fn blank() {
        let r = DocumentRecord::new("a".to_string(), vec![Block::from_iter(["", "  "])]);
        assert!(r.is_blank());
        assert!(DocumentRecord::new("a".to_string(), vec![]).is_blank());
    }
}
