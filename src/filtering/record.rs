//! Document-level filtering.
use super::Filter;

/// Simple length filter.
/// Returns `false` if the normalized text is shorter than [MinLength::min_chars] unicode codepoints.
///
/// [MinLength::min_chars] is 200 by default.
pub struct MinLength {
    min_chars: usize,
}

impl MinLength {
    /// specify a minimum length
    pub fn with_min_chars(min_chars: usize) -> Self {
        Self { min_chars }
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }
}

impl Filter<&str> for MinLength {
    fn detect(&self, text: &str) -> bool {
        // avoid counting the whole text
        text.chars().nth(self.min_chars.saturating_sub(1)).is_some() || self.min_chars == 0
    }
}

impl Default for MinLength {
    fn default() -> Self {
        Self { min_chars: 200 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary() {
        let f = MinLength::with_min_chars(5);
        assert!(f.detect("äöüßé"));
        assert!(!f.detect("äöüß"));
        assert!(f.detect("longer text"));
    }

    #[test]
    fn zero() {
        assert!(MinLength::with_min_chars(0).detect(""));
    }

    #[test]
    fn default_length() {
        let f = MinLength::default();
        assert_eq!(f.min_chars(), 200);
        assert!(!f.detect(&"a".repeat(199)));
        assert!(f.detect(&"a".repeat(200)));
    }
}
