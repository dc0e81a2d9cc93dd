//! SHA-256 integrity gate.
//!
//! Patch anchors are literal text tied to one upstream revision, so a digest
//! mismatch stops the run before any patch is attempted.

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Lowercase hex SHA-256 of `bytes` (64 characters).
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error(
        "SHA-256 mismatch (expected {expected}, got {actual}){}",
        upstream_note(.upstream_version)
    )]
    Mismatch {
        expected: String,
        actual: String,
        /// `@version` found in the downloaded script, if readable
        upstream_version: Option<String>,
    },
}

fn upstream_note(version: &Option<String>) -> String {
    match version {
        Some(version) => format!("; upstream script reports @version {version}"),
        None => String::new(),
    }
}

/// Expected vs actual digest of the fetched bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityRecord {
    pub expected: String,
    pub actual: String,
}

impl IntegrityRecord {
    pub fn compute(expected: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            expected: expected.into(),
            actual: sha256_hex(bytes),
        }
    }

    pub fn is_match(&self) -> bool {
        self.actual == self.expected
    }

    /// Turn a mismatch into an error.
    pub fn verify(self, upstream_version: Option<&str>) -> Result<Self, IntegrityError> {
        if self.is_match() {
            Ok(self)
        } else {
            Err(IntegrityError::Mismatch {
                expected: self.expected,
                actual: self.actual,
                upstream_version: upstream_version.map(str::to_string),
            })
        }
    }
}
