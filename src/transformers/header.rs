/*! Header/Footer annotators

Flags documents whose first or last lines are mostly short ones (menus, breadcrumbs,
cookie banners, copyright lines...), adding `header` and/or `footer` annotations.
!*/
use crate::pipelines::types::Document;

use super::Annotate;

/// Header/Footer annotator.
pub struct Header {
    edge_pctg: f64,
    threshold_pctg: f64,
    min_length: usize,
}

impl Default for Header {
    /// Default values are:
    /// - 20% of the lines at each edge,
    /// - flagging if more than 50% of those are short,
    /// - short meaning less than 100 characters.
    fn default() -> Self {
        Self {
            edge_pctg: 0.2,
            threshold_pctg: 0.5,
            min_length: 100,
        }
    }
}

impl Header {
    /// * `edge_pctg`: share of the lines considered as header (and as footer).
    /// * `threshold_pctg`: share of short lines in the edge required to be annotated.
    /// * `min_length`: lines shorter than this (in characters) are short.
    pub fn new(edge_pctg: f64, threshold_pctg: f64, min_length: usize) -> Self {
        Self {
            edge_pctg,
            threshold_pctg,
            min_length,
        }
    }

    /// true if more than `threshold_pctg` of the edge lines are short.
    fn is_short_edge<'a>(
        &self,
        edge: impl Iterator<Item = &'a str>,
        nb_edge_lines: usize,
    ) -> bool {
        let threshold = (nb_edge_lines as f64 * self.threshold_pctg).floor() as usize;
        let nb_short = edge
            .take(nb_edge_lines)
            .filter(|line| line.chars().count() < self.min_length)
            .count();
        nb_short > threshold
    }
}

impl Annotate for Header {
    /// Works on every line of the record, boilerplate included.
    fn annotate(&self, doc: &mut Document) {
        let lines: Vec<&str> = doc
            .record()
            .blocks()
            .iter()
            .flat_map(|block| block.normalized_lines())
            .collect();
        let nb_edge_lines = (lines.len() as f64 * self.edge_pctg).floor() as usize;

        let header = self.is_short_edge(lines.iter().copied(), nb_edge_lines);
        let footer = self.is_short_edge(lines.iter().rev().copied(), nb_edge_lines);

        if header {
            doc.add_annotation("header");
        }
        if footer {
            doc.add_annotation("footer");
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        pipelines::types::{Document, DocumentRecord},
        transformers::Annotate,
    };

    use super::Header;

    const LONG: &str = "This is a lengthy enough sentence! Or at least I hope :)";
    const SHORT: &str = "oop, tiny one here";

    /// `pattern`: L for a long line, S for a short one.
    fn doc(pattern: &str) -> Document {
        let text = pattern
            .chars()
            .map(|c| if c == 'L' { LONG } else { SHORT })
            .collect::<Vec<_>>()
            .join("\n");
        Document::new(DocumentRecord::from_text("id", &text))
    }

    #[test]
    fn lengthy_enough() {
        let annotator = Header::new(0.30, 0.60, 30);
        let mut doc = doc("LLLLLLLLLLLLLLLSLL");
        annotator.annotate(&mut doc);
        assert!(doc.annotations().is_empty());
    }

    #[test]
    fn test_header() {
        let annotator = Header::new(0.30, 0.60, 30);
        let mut doc = doc("LSSSSSSSSLLLLLLSLL");
        annotator.annotate(&mut doc);
        assert_eq!(doc.annotations(), &["header".to_string()]);
    }

    #[test]
    fn test_footer() {
        let annotator = Header::new(0.30, 0.60, 30);
        let mut doc = doc("LLLLLLLLLLLLLLSSSSL");
        annotator.annotate(&mut doc);
        assert_eq!(doc.annotations(), &["footer".to_string()]);
    }

    #[test]
    fn test_both() {
        let annotator = Header::new(0.30, 0.60, 30);
        let mut doc = doc("LSSSSSLLLLLLSSSSSL");
        annotator.annotate(&mut doc);
        assert_eq!(
            doc.annotations(),
            &["header".to_string(), "footer".to_string()]
        );
    }

    #[test]
    fn too_short_to_tell() {
        let mut doc = doc("SS");
        Header::default().annotate(&mut doc);
        assert!(doc.annotations().is_empty());
    }
}
