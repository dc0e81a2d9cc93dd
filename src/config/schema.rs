use crate::edit::{Edit, EditError, Occurrences};
use semver::VersionReq;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct PatchConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub patches: Vec<PatchDefinition>,
}

impl PatchConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.meta.source_url.trim().is_empty() {
            issues.push(ValidationIssue::MissingMeta {
                field: "source_url",
            });
        }
        if self.meta.output.as_os_str().is_empty() {
            issues.push(ValidationIssue::MissingMeta { field: "output" });
        }
        if !is_sha256_hex(&self.meta.sha256) {
            issues.push(ValidationIssue::InvalidDigest {
                value: self.meta.sha256.clone(),
            });
        }
        let range = self.meta.version_range.as_deref().map(str::trim);
        if let Some(range) = range.filter(|range| !range.is_empty()) {
            if let Err(error) = VersionReq::parse(range) {
                issues.push(ValidationIssue::InvalidMeta {
                    message: format!("version_range '{range}' is not a semver requirement: {error}"),
                });
            }
        }
        if self.meta.timeout_secs == Some(0) {
            issues.push(ValidationIssue::InvalidMeta {
                message: "timeout_secs must be at least 1".to_string(),
            });
        }

        if self.patches.is_empty() {
            issues.push(ValidationIssue::EmptyPatchList);
        }

        let mut seen = HashSet::new();
        for patch in &self.patches {
            if patch.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: None,
                    field: "id",
                });
            } else if !seen.insert(patch.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId {
                    patch_id: patch.id.clone(),
                });
            }

            if patch.applied_marker.as_deref() == Some("") {
                issues.push(ValidationIssue::InvalidCombo {
                    patch_id: Some(patch.id.clone()).filter(|id| !id.trim().is_empty()),
                    message: "applied_marker must not be empty".to_string(),
                });
            }

            if let Err(error) = patch.edit() {
                let patch_id = Some(patch.id.clone()).filter(|id| !id.trim().is_empty());
                issues.push(match error {
                    EditError::EmptyAnchor => ValidationIssue::MissingField {
                        patch_id,
                        field: "anchor",
                    },
                    EditError::ZeroOccurrences => ValidationIssue::InvalidCombo {
                        patch_id,
                        message: "occurrences must be at least 1".to_string(),
                    },
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Request timeout for the upstream download.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.meta.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Where the upstream userscript is downloaded from
    #[serde(default)]
    pub source_url: String,
    /// Expected SHA-256 of the downloaded bytes, hex encoded
    #[serde(default)]
    pub sha256: String,
    /// Destination of the patched script
    #[serde(default)]
    pub output: PathBuf,
    /// Upstream `@version` values the anchors were authored against
    #[serde(default)]
    pub version_range: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// What a missed anchor means for the run.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// A miss aborts the run before anything is written
    #[default]
    Required,
    /// A miss is reported as a warning
    Optional,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Required => write!(f, "required"),
            Severity::Optional => write!(f, "optional"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PatchDefinition {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub anchor: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default)]
    pub occurrences: Occurrences,
    #[serde(default)]
    pub severity: Severity,
    /// Text whose presence means this patch already ran on the document.
    /// Only needed when the replacement re-emits its own anchor.
    #[serde(default)]
    pub applied_marker: Option<String>,
}

impl PatchDefinition {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

    pub fn edit(&self) -> Result<Edit, EditError> {
        Edit::new(&self.anchor, &self.replacement, self.occurrences)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyPatchList,
    MissingMeta {
        field: &'static str,
    },
    InvalidMeta {
        message: String,
    },
    InvalidDigest {
        value: String,
    },
    MissingField {
        patch_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        patch_id: String,
    },
    InvalidCombo {
        patch_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyPatchList => write!(f, "patch config contains no patches"),
            ValidationIssue::MissingMeta { field } => {
                write!(f, "meta is missing required field '{field}'")
            }
            ValidationIssue::InvalidMeta { message } => write!(f, "invalid meta: {message}"),
            ValidationIssue::InvalidDigest { value } => {
                write!(f, "meta.sha256 '{value}' is not a 64-digit hex SHA-256 digest")
            }
            ValidationIssue::MissingField { patch_id, field } => match patch_id {
                Some(id) => write!(f, "patch '{id}' missing required field '{field}'"),
                None => write!(f, "patch missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId { patch_id } => {
                write!(f, "patch id '{patch_id}' is used more than once")
            }
            ValidationIssue::InvalidCombo { patch_id, message } => match patch_id {
                Some(id) => write!(f, "patch '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid patch configuration: {message}"),
            },
        }
    }
}
