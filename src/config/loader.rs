use crate::config::schema::{PatchConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Patch set compiled into the binary and used when no `--patches` file is given.
pub const BUILTIN_CONFIG: &str = include_str!("../../patches/gfd-ninja.toml");

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read patch config from {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse patch config TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse patch config TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid patch config ({}): {}", path.display(), source),
                None => write!(f, "invalid patch config: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<PatchConfig, ConfigError> {
    let mut config: PatchConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config.meta.sha256 = config.meta.sha256.trim().to_ascii_lowercase();
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Load the compiled-in patch set.
pub fn builtin() -> Result<PatchConfig, ConfigError> {
    load_from_str(BUILTIN_CONFIG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{Severity, ValidationIssue};
    use crate::edit::Occurrences;

    const DIGEST: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn config_with_patches(patches: &str) -> String {
        format!(
            r#"
[meta]
name = "test"
source_url = "https://example.invalid/script.user.js"
sha256 = "{DIGEST}"
output = "out.user.js"

{patches}
"#
        )
    }

    #[test]
    fn test_defaults_applied() {
        let toml = config_with_patches(
            r#"
[[patches]]
id = "rename"
anchor = "old"
replacement = "new"
"#,
        );
        let config = load_from_str(&toml).unwrap();
        let patch = &config.patches[0];
        assert_eq!(patch.occurrences, Occurrences::ONCE);
        assert_eq!(patch.severity, Severity::Required);
        assert_eq!(patch.label(), "rename");
        assert_eq!(config.timeout().as_secs(), 30);
    }

    #[test]
    fn test_occurrences_keyword_and_severity() {
        let toml = config_with_patches(
            r#"
[[patches]]
id = "cleanup"
label = "Remove stale lines"
anchor = "stale\n"
occurrences = "all"
severity = "optional"

[[patches]]
id = "twice"
anchor = "a"
replacement = "b"
occurrences = 2
"#,
        );
        let config = load_from_str(&toml).unwrap();
        assert_eq!(config.patches[0].occurrences, Occurrences::All);
        assert_eq!(config.patches[0].severity, Severity::Optional);
        assert_eq!(config.patches[0].replacement, "");
        assert_eq!(config.patches[0].label(), "Remove stale lines");
        assert_eq!(config.patches[1].occurrences, Occurrences::Limit(2));
    }

    #[test]
    fn test_invalid_occurrence_keyword() {
        let toml = config_with_patches(
            r#"
[[patches]]
id = "bad"
anchor = "a"
occurrences = "some"
"#,
        );
        assert!(matches!(
            load_from_str(&toml),
            Err(ConfigError::Toml { .. })
        ));
    }

    #[test]
    fn test_validation_collects_all_issues() {
        let toml = r#"
[meta]
sha256 = "not-a-digest"

[[patches]]
id = "dup"
anchor = ""

[[patches]]
id = "dup"
anchor = "x"
occurrences = 0
"#;
        let err = load_from_str(toml).unwrap_err();
        let ConfigError::Validation { source, .. } = err else {
            panic!("expected validation error");
        };
        let issues = &source.issues;
        assert!(issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::MissingMeta { field: "source_url" })));
        assert!(issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::MissingMeta { field: "output" })));
        assert!(issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::InvalidDigest { .. })));
        assert!(issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::MissingField { field: "anchor", .. })));
        assert!(issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::DuplicateId { .. })));
        assert!(issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::InvalidCombo { .. })));
    }

    #[test]
    fn test_unparseable_version_range_rejected() {
        let toml = config_with_patches(
            r#"
[[patches]]
id = "p"
anchor = "a"
"#,
        )
        .replace(
            "output = \"out.user.js\"",
            "output = \"out.user.js\"\nversion_range = \">=bad\"",
        );

        let err = load_from_str(&toml).unwrap_err();
        assert!(err.to_string().contains(">=bad"));
        let ConfigError::Validation { source, .. } = err else {
            panic!("expected validation error");
        };
        assert!(matches!(
            source.issues.as_slice(),
            [ValidationIssue::InvalidMeta { .. }]
        ));
    }

    #[test]
    fn test_applied_marker() {
        let toml = config_with_patches(
            r#"
[[patches]]
id = "inject"
anchor = "// END"
replacement = "// END\nconst A = 1;"
applied_marker = "const A = 1;"
"#,
        );
        let config = load_from_str(&toml).unwrap();
        assert_eq!(
            config.patches[0].applied_marker.as_deref(),
            Some("const A = 1;")
        );

        let err = load_from_str(&toml.replace("\"const A = 1;\"\n", "\"\"\n")).unwrap_err();
        assert!(err.to_string().contains("applied_marker"));
    }

    #[test]
    fn test_empty_patch_list_rejected() {
        let err = load_from_str(&config_with_patches("")).unwrap_err();
        assert!(err.to_string().contains("contains no patches"));
    }

    #[test]
    fn test_digest_lowercased() {
        let toml = config_with_patches(
            r#"
[[patches]]
id = "p"
anchor = "a"
"#,
        )
        .replace(DIGEST, &DIGEST.to_ascii_uppercase());
        let config = load_from_str(&toml).unwrap();
        assert_eq!(config.meta.sha256, DIGEST);
    }

    #[test]
    fn test_load_from_path_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[meta\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { path: Some(_), .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_builtin_config_is_valid() {
        let config = builtin().unwrap();
        assert_eq!(config.meta.name, "gfd-ninja");
        assert_eq!(config.meta.output, PathBuf::from("GFD_Ninja.user.js"));
        assert_eq!(config.meta.version_range.as_deref(), Some("=1.5.2"));
        assert!(config.patches.len() >= 8);
    }
}
