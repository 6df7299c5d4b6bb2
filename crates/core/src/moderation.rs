//! Review moderation filter.
//!
//! A case-insensitive substring match against a fixed list of negative words.
//! Flagged reviews stay in the document store but are hidden from the public
//! listing. This is a heuristic: false positives ("badge" contains "bad") and
//! false negatives are expected.

/// Words that flag a review when they appear anywhere in its text.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "scam", "terrible", "awful", "trash", "garbage", "fake", "worst", "stole", "bad",
];

/// A lowercase denylist used to classify review text.
#[derive(Debug, Clone)]
pub struct Denylist {
    words: Vec<String>,
}

impl Denylist {
    /// Build a denylist from arbitrary words. Empty entries are ignored.
    #[must_use]
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// Returns `true` if the text should be flagged.
    #[must_use]
    pub fn classify(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.words.iter().any(|word| lower.contains(word.as_str()))
    }

    /// Number of words in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the list is empty (nothing will ever be flagged).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for Denylist {
    fn default() -> Self {
        Self::new(DEFAULT_DENYLIST)
    }
}

/// Classify text against [`DEFAULT_DENYLIST`].
#[must_use]
pub fn classify(text: &str) -> bool {
    Denylist::default().classify(text)
}
