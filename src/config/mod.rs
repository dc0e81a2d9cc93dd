pub mod applicator;
pub mod loader;
pub mod schema;
pub mod version;

pub use applicator::{apply_patch, apply_patches, PatchReport, PatchResult, Summary};
pub use loader::{builtin, load_from_path, load_from_str, ConfigError, BUILTIN_CONFIG};
pub use schema::{
    Metadata, PatchConfig, PatchDefinition, Severity, ValidationError, ValidationIssue,
};
pub use version::{matches_requirement, userscript_version, VersionError};
