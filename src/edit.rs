use crate::document::normalize_line_endings;
use serde::Deserialize;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// How many instances of an anchor a single edit may replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawOccurrences")]
pub enum Occurrences {
    /// Replace at most the first `n` instances, left to right.
    Limit(usize),
    /// Replace every non-overlapping instance.
    All,
}

impl Occurrences {
    pub const ONCE: Occurrences = Occurrences::Limit(1);

    /// Upper bound on replacements.
    pub fn limit(self) -> usize {
        match self {
            Occurrences::Limit(n) => n,
            Occurrences::All => usize::MAX,
        }
    }
}

impl Default for Occurrences {
    fn default() -> Self {
        Occurrences::ONCE
    }
}

impl fmt::Display for Occurrences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Occurrences::Limit(n) => write!(f, "{n}"),
            Occurrences::All => write!(f, "all"),
        }
    }
}

/// Either an integer bound or the keyword `"all"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawOccurrences {
    Count(usize),
    Keyword(String),
}

impl TryFrom<RawOccurrences> for Occurrences {
    type Error = String;

    fn try_from(raw: RawOccurrences) -> Result<Self, Self::Error> {
        match raw {
            RawOccurrences::Count(n) => Ok(Occurrences::Limit(n)),
            RawOccurrences::Keyword(word) if word.eq_ignore_ascii_case("all") => {
                Ok(Occurrences::All)
            }
            RawOccurrences::Keyword(word) => Err(format!(
                "invalid occurrence bound '{word}': expected a positive integer or \"all\""
            )),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("anchor text is empty")]
    EmptyAnchor,

    #[error("occurrence bound must be at least 1")]
    ZeroOccurrences,
}

/// Outcome of applying an [`Edit`] to a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "EditResult should be checked for applied/not-found"]
pub enum EditResult {
    /// Anchor found and replaced `replacements` times
    Applied { replacements: usize },
    /// Anchor not present in the text
    NotFound,
}

/// The fundamental edit primitive: literal anchor replacement.
///
/// Anchor and replacement are compared as opaque text. Both are normalized to
/// `\n` line endings on construction so they line up with a normalized
/// [`Document`](crate::Document).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    anchor: String,
    replacement: String,
    occurrences: Occurrences,
}

impl Edit {
    pub fn new(
        anchor: impl AsRef<str>,
        replacement: impl AsRef<str>,
        occurrences: Occurrences,
    ) -> Result<Self, EditError> {
        let anchor = normalize_line_endings(anchor.as_ref());
        if anchor.is_empty() {
            return Err(EditError::EmptyAnchor);
        }
        if occurrences == Occurrences::Limit(0) {
            return Err(EditError::ZeroOccurrences);
        }
        Ok(Self {
            anchor,
            replacement: normalize_line_endings(replacement.as_ref()),
            occurrences,
        })
    }

    pub fn anchor(&self) -> &str {
        &self.anchor
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn occurrences(&self) -> Occurrences {
        self.occurrences
    }

    /// Apply the edit, returning the new text and what happened.
    ///
    /// Unchanged text is returned borrowed.
    pub fn apply<'a>(&self, content: &'a str) -> (Cow<'a, str>, EditResult) {
        let mut output = String::with_capacity(content.len() + self.replacement.len());
        let mut last = 0;
        let mut replacements = 0;

        for (start, _) in content
            .match_indices(self.anchor.as_str())
            .take(self.occurrences.limit())
        {
            output.push_str(&content[last..start]);
            output.push_str(&self.replacement);
            last = start + self.anchor.len();
            replacements += 1;
        }

        if replacements == 0 {
            return (Cow::Borrowed(content), EditResult::NotFound);
        }

        output.push_str(&content[last..]);
        (Cow::Owned(output), EditResult::Applied { replacements })
    }
}
