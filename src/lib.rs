//! Userscript Patcher: adapt a pinned upstream userscript to another runtime
//!
//! Downloads a userscript, verifies its SHA-256 against a pinned digest, and
//! rewrites it with an ordered list of literal anchor substitutions before
//! writing the result to disk.
//!
//! # Architecture
//!
//! Every patch compiles down to a single primitive: [`Edit`], a literal
//! anchor replacement with an occurrence bound. The patch engine
//! ([`config::apply_patches`]) folds the ordered patch list over a
//! [`Document`], and the [`pipeline`] sequences fetch, verify, patch and
//! write around it.
//!
//! # Safety
//!
//! - Integrity is checked before any patch runs; a mismatch is fatal
//! - Line endings are normalized before any anchor is compared
//! - Patches apply strictly in order and never abort the engine
//! - Output is written atomically (tempfile + fsync + rename), and only
//!   after every required patch matched
//! - A patch applies whenever its anchor is present and misses whenever it
//!   is absent; only an explicit `applied_marker` skips it
//!
//! # Example
//!
//! ```
//! use userscript_patcher::config::{apply_patches, PatchDefinition, Severity};
//! use userscript_patcher::{Document, Occurrences};
//!
//! let patches = vec![PatchDefinition {
//!     id: "match".to_string(),
//!     label: None,
//!     anchor: "// @match old-pattern".to_string(),
//!     replacement: "// @match new-pattern".to_string(),
//!     occurrences: Occurrences::ONCE,
//!     severity: Severity::Required,
//!     applied_marker: None,
//! }];
//!
//! let document = Document::from_text("// @match old-pattern\n");
//! let (patched, reports) = apply_patches(document, &patches);
//!
//! assert_eq!(patched.content(), "// @match new-pattern\n");
//! assert_eq!(reports[0].replacements(), 1);
//! ```

pub mod config;
pub mod document;
pub mod edit;
pub mod fetch;
pub mod integrity;
pub mod output;
pub mod pipeline;

// Re-exports
pub use config::{
    apply_patch, apply_patches, builtin, load_from_path, load_from_str, ConfigError, PatchConfig,
    PatchDefinition, PatchReport, PatchResult, Severity, Summary,
};
pub use document::{Document, DocumentError, LineEnding};
pub use edit::{Edit, EditError, EditResult, Occurrences};
pub use fetch::{FetchError, Fetcher, HttpFetcher, LocalFile};
pub use integrity::{sha256_hex, IntegrityError, IntegrityRecord};
pub use output::{AtomicFileWriter, Writer};
pub use pipeline::{run, Event, Outcome, PipelineError, RunOptions, Stage};
