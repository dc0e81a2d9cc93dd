//! Patch applicator - folds an ordered patch list over a document
//!
//! This module is the patch engine:
//! - Applies patches strictly in list order (later anchors may only exist
//!   because an earlier patch inserted them)
//! - Never aborts on a missing anchor; the miss is recorded in the report
//! - Reports one [`PatchReport`] per patch, in the same order

use crate::config::schema::{PatchDefinition, Severity};
use crate::document::{normalize_line_endings, Document};
use crate::edit::{EditResult, Occurrences};
use std::borrow::Cow;
use std::fmt;

/// Minimum similarity for a line to be offered as a hint for a missed anchor.
const HINT_THRESHOLD: f64 = 0.6;

/// Result of applying a single patch
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchResult should be checked for success/failure"]
pub enum PatchResult {
    /// Anchor found and replaced
    Applied { replacements: usize },
    /// The patch's `applied_marker` is already in the document
    AlreadyApplied,
    /// Anchor not present in the document
    NotFound { hint: Option<String> },
    /// Patch definition itself is unusable
    Invalid { reason: String },
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchResult::Applied { replacements: 1 } => write!(f, "Applied"),
            PatchResult::Applied { replacements } => {
                write!(f, "Applied ({} replacements)", replacements)
            }
            PatchResult::AlreadyApplied => write!(f, "Already applied"),
            PatchResult::NotFound { hint: None } => write!(f, "Anchor not found"),
            PatchResult::NotFound { hint: Some(hint) } => {
                write!(f, "Anchor not found (closest line: {:?})", hint)
            }
            PatchResult::Invalid { reason } => write!(f, "Invalid patch: {}", reason),
        }
    }
}

/// Diagnostic record for one patch application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    /// 1-based position in the patch list
    pub ordinal: usize,
    pub id: String,
    pub label: String,
    pub severity: Severity,
    pub occurrences: Occurrences,
    pub result: PatchResult,
}

impl PatchReport {
    pub fn replacements(&self) -> usize {
        match self.result {
            PatchResult::Applied { replacements } => replacements,
            _ => 0,
        }
    }

    /// The anchor was not consumed on this run.
    pub fn is_miss(&self) -> bool {
        matches!(
            self.result,
            PatchResult::NotFound { .. } | PatchResult::Invalid { .. }
        )
    }

    /// A bounded patch matched fewer instances than its bound.
    pub fn is_partial(&self) -> bool {
        match (self.occurrences, &self.result) {
            (Occurrences::Limit(n), PatchResult::Applied { replacements }) => *replacements < n,
            _ => false,
        }
    }
}

/// Totals over a report sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub applied: usize,
    pub already_applied: usize,
    pub missed_required: usize,
    pub missed_optional: usize,
    pub partial: usize,
    pub replacements: usize,
}

impl Summary {
    pub fn from_reports(reports: &[PatchReport]) -> Self {
        reports.iter().fold(Summary::default(), |mut summary, report| {
            match (&report.result, report.severity) {
                (PatchResult::Applied { replacements }, _) => {
                    summary.applied += 1;
                    summary.replacements += replacements;
                }
                (PatchResult::AlreadyApplied, _) => summary.already_applied += 1,
                (_, Severity::Required) => summary.missed_required += 1,
                (_, Severity::Optional) => summary.missed_optional += 1,
            }
            if report.is_partial() {
                summary.partial += 1;
            }
            summary
        })
    }

    pub fn misses(&self) -> usize {
        self.missed_required + self.missed_optional
    }
}

/// Apply one patch to the document.
pub fn apply_patch(
    mut document: Document,
    patch: &PatchDefinition,
    ordinal: usize,
) -> (Document, PatchReport) {
    let result = match patch.edit() {
        Ok(_) if has_marker(&document, patch) => PatchResult::AlreadyApplied,
        Ok(edit) => {
            let (updated, result) = {
                let (text, result) = edit.apply(document.content());
                let result = match result {
                    EditResult::Applied { replacements } => PatchResult::Applied { replacements },
                    EditResult::NotFound => PatchResult::NotFound {
                        hint: closest_line(document.content(), edit.anchor()),
                    },
                };
                let updated = match text {
                    Cow::Owned(text) => Some(text),
                    Cow::Borrowed(_) => None,
                };
                (updated, result)
            };
            if let Some(text) = updated {
                document.set_content(text);
            }
            result
        }
        Err(error) => PatchResult::Invalid {
            reason: error.to_string(),
        },
    };

    let report = PatchReport {
        ordinal,
        id: patch.id.clone(),
        label: patch.label().to_string(),
        severity: patch.severity,
        occurrences: patch.occurrences,
        result,
    };
    (document, report)
}

/// Apply all patches in order, threading the document through each step.
pub fn apply_patches(
    document: Document,
    patches: &[PatchDefinition],
) -> (Document, Vec<PatchReport>) {
    patches.iter().enumerate().fold(
        (document, Vec::with_capacity(patches.len())),
        |(document, mut reports), (index, patch)| {
            let (document, report) = apply_patch(document, patch, index + 1);
            reports.push(report);
            (document, reports)
        },
    )
}

fn has_marker(document: &Document, patch: &PatchDefinition) -> bool {
    match patch.applied_marker.as_deref() {
        Some(marker) if !marker.is_empty() => document
            .content()
            .contains(normalize_line_endings(marker).as_str()),
        _ => false,
    }
}

/// Find the document line most similar to the anchor's first non-blank line.
fn closest_line(content: &str, anchor: &str) -> Option<String> {
    let needle = anchor.lines().map(str::trim).find(|line| !line.is_empty())?;

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| (strsim::normalized_levenshtein(needle, line), line))
        .filter(|(score, _)| *score >= HINT_THRESHOLD)
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, line)| line.to_string())
}
