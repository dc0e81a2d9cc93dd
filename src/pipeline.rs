//! Fetch → verify → decode → patch → write.
//!
//! [`run`] executes the stages strictly in sequence and stops at the first
//! fatal failure. The output is written only after every patch has been
//! applied and the required-patch gate has passed, so a failed run never
//! leaves a file behind. Progress is reported through [`Event`]s; the library
//! itself never prints.

use crate::config::applicator::{apply_patches, PatchReport, Summary};
use crate::config::schema::{PatchConfig, Severity};
use crate::config::version::{matches_requirement, userscript_version, VersionError};
use crate::document::{Document, DocumentError, LineEnding};
use crate::fetch::{FetchError, Fetcher};
use crate::integrity::{IntegrityError, IntegrityRecord};
use crate::output::Writer;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Pipeline stage, used to name where a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Verify,
    Decode,
    Patch,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Verify => "verify",
            Stage::Decode => "decode",
            Stage::Patch => "patch",
            Stage::Write => "write",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Transport(#[from] FetchError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Encoding(#[from] DocumentError),

    #[error("{} required patch(es) did not apply: {}", .ids.len(), .ids.join(", "))]
    PatchMiss { ids: Vec<String> },

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Transport(_) => Stage::Fetch,
            PipelineError::Integrity(_) => Stage::Verify,
            PipelineError::Encoding(_) => Stage::Decode,
            PipelineError::PatchMiss { .. } => Stage::Patch,
            PipelineError::Io { .. } => Stage::Write,
        }
    }
}

/// Progress notifications, in the order they happen.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    Fetching {
        source: &'a str,
    },
    Fetched {
        bytes: usize,
    },
    Verified(&'a IntegrityRecord),
    Decoded {
        line_ending: LineEnding,
    },
    UpstreamVersion {
        version: Option<&'a str>,
        range: Option<&'a str>,
        /// `None` when either side is missing
        check: Option<Result<bool, &'a VersionError>>,
    },
    Patched {
        report: &'a PatchReport,
        total: usize,
    },
    Writing {
        path: &'a Path,
    },
    Written {
        path: &'a Path,
        bytes: usize,
    },
    SkippedWrite {
        path: &'a Path,
    },
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output: PathBuf,
    /// Run every stage except the write
    pub dry_run: bool,
}

impl RunOptions {
    pub fn from_config(config: &PatchConfig) -> Self {
        Self {
            output: config.meta.output.clone(),
            dry_run: false,
        }
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub integrity: IntegrityRecord,
    pub upstream_version: Option<String>,
    /// Normalized input, before any patch
    pub original: Document,
    pub patched: Document,
    pub reports: Vec<PatchReport>,
    pub summary: Summary,
    /// `None` on a dry run
    pub written: Option<PathBuf>,
}

/// Run the whole pipeline for one configuration.
pub fn run<F, W>(
    config: &PatchConfig,
    fetcher: &F,
    writer: &W,
    options: &RunOptions,
    mut on_event: impl FnMut(Event<'_>),
) -> Result<Outcome, PipelineError>
where
    F: Fetcher + ?Sized,
    W: Writer + ?Sized,
{
    let url = config.meta.source_url.as_str();
    let source = fetcher.describe(url);
    on_event(Event::Fetching { source: &source });
    let bytes = fetcher.fetch(url)?;
    on_event(Event::Fetched { bytes: bytes.len() });

    let integrity = IntegrityRecord::compute(config.meta.sha256.as_str(), &bytes);
    let integrity = if integrity.is_match() {
        integrity
    } else {
        let text = String::from_utf8_lossy(&bytes);
        integrity.verify(userscript_version(&text))?
    };
    on_event(Event::Verified(&integrity));

    let document = Document::from_bytes(&bytes)?;
    on_event(Event::Decoded {
        line_ending: document.original_line_ending(),
    });

    let upstream_version = userscript_version(document.content()).map(str::to_string);
    let range = config.meta.version_range.as_deref();
    let check = match (upstream_version.as_deref(), range) {
        (Some(version), Some(range)) => Some(matches_requirement(version, Some(range))),
        _ => None,
    };
    on_event(Event::UpstreamVersion {
        version: upstream_version.as_deref(),
        range,
        check: check.as_ref().map(|result| result.as_ref().copied()),
    });

    let original = document.clone();
    let (patched, reports) = apply_patches(document, &config.patches);
    for report in &reports {
        on_event(Event::Patched {
            report,
            total: reports.len(),
        });
    }

    let summary = Summary::from_reports(&reports);
    if summary.missed_required > 0 {
        let ids = reports
            .iter()
            .filter(|r| r.is_miss() && r.severity == Severity::Required)
            .map(|r| r.id.clone())
            .collect();
        return Err(PipelineError::PatchMiss { ids });
    }

    let written = if options.dry_run {
        on_event(Event::SkippedWrite {
            path: &options.output,
        });
        None
    } else {
        on_event(Event::Writing {
            path: &options.output,
        });
        let output = patched.content().as_bytes();
        writer
            .write(output, &options.output)
            .map_err(|source| PipelineError::Io {
                path: options.output.clone(),
                source,
            })?;
        on_event(Event::Written {
            path: &options.output,
            bytes: output.len(),
        });
        Some(options.output.clone())
    };

    Ok(Outcome {
        integrity,
        upstream_version,
        original,
        patched,
        reports,
        summary,
        written,
    })
}
