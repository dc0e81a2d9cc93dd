//! The text buffer a patch set is applied to.
//!
//! A [`Document`] is decoded from the fetched bytes and has its line endings
//! normalized to `\n` before any anchor is compared. Anchors are authored with
//! `\n`, so a CRLF copy of the upstream script would otherwise miss every
//! multi-line anchor.

use std::fmt;
use thiserror::Error;

/// Line-ending convention detected in the raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
    Mixed,
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineEnding::Lf => write!(f, "LF"),
            LineEnding::CrLf => write!(f, "CRLF"),
            LineEnding::Mixed => write!(f, "mixed"),
        }
    }
}

impl LineEnding {
    fn detect(text: &str) -> Self {
        let crlf = text.matches("\r\n").count();
        let lf = text.matches('\n').count();
        if crlf == 0 {
            LineEnding::Lf
        } else if crlf == lf {
            LineEnding::CrLf
        } else {
            LineEnding::Mixed
        }
    }
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("input is not valid UTF-8 (first invalid byte at offset {offset})")]
    InvalidUtf8 {
        offset: usize,
        #[source]
        source: std::str::Utf8Error,
    },
}

/// Normalize CRLF line endings to LF.
///
/// Lone `\r` characters are left untouched.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Normalized text under transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    content: String,
    original_line_ending: LineEnding,
}

impl Document {
    /// Decode UTF-8 bytes and normalize line endings.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        let text = std::str::from_utf8(bytes).map_err(|source| DocumentError::InvalidUtf8 {
            offset: source.valid_up_to(),
            source,
        })?;
        Ok(Self::from_text(text))
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            original_line_ending: LineEnding::detect(text),
            content: normalize_line_endings(text),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn original_line_ending(&self) -> LineEnding {
        self.original_line_ending
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub(crate) fn set_content(&mut self, content: String) {
        self.content = content;
    }

    /// Re-encode as UTF-8 with LF line endings.
    pub fn into_bytes(self) -> Vec<u8> {
        self.content.into_bytes()
    }
}
