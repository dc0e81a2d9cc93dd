//! Upstream version detection for userscripts.
//!
//! Reads the `// @version` entry from the `// ==UserScript==` metadata block
//! and checks it against the patch set's `version_range` (a semver
//! requirement such as `"=1.5.2"` or `">=1.5.0, <1.6.0"`).

use semver::{Version, VersionReq};
use std::fmt;

const HEADER_START: &str = "// ==UserScript==";
const HEADER_END: &str = "// ==/UserScript==";

/// Errors during version checks
#[derive(Debug, Clone)]
pub enum VersionError {
    /// Invalid version string (e.g., "1.5-beta")
    InvalidVersion { value: String, source: String },
    /// Invalid version requirement (e.g., ">=bad")
    InvalidRequirement { value: String, source: String },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::InvalidVersion { value, source } => {
                write!(f, "invalid version '{}': {}", value, source)
            }
            VersionError::InvalidRequirement { value, source } => {
                write!(f, "invalid version requirement '{}': {}", value, source)
            }
        }
    }
}

impl std::error::Error for VersionError {}

/// Extract the `@version` value from the userscript metadata block.
///
/// Returns `None` when there is no header or no `@version` key inside it.
///
/// ```
/// use userscript_patcher::config::version::userscript_version;
///
/// let script = "// ==UserScript==\n// @version      1.5.2\n// ==/UserScript==\n";
/// assert_eq!(userscript_version(script), Some("1.5.2"));
/// ```
pub fn userscript_version(script: &str) -> Option<&str> {
    script
        .lines()
        .map(str::trim)
        .skip_while(|line| *line != HEADER_START)
        .skip(1)
        .take_while(|line| *line != HEADER_END)
        .find_map(|line| {
            let rest = line.strip_prefix("//")?.trim_start();
            let value = rest.strip_prefix("@version")?;
            // `@versionfoo` is a different key
            if !value.starts_with(char::is_whitespace) {
                return None;
            }
            Some(value.trim())
        })
        .filter(|value| !value.is_empty())
}

/// Check if a version matches a requirement string
///
/// # Examples
///
/// ```
/// use userscript_patcher::config::version::matches_requirement;
///
/// assert!(matches_requirement("1.5.2", Some("=1.5.2")).unwrap());
/// assert!(!matches_requirement("1.6.0", Some(">=1.5.0, <1.6.0")).unwrap());
///
/// // None requirement means "any upstream version"
/// assert!(matches_requirement("2.0.0", None).unwrap());
/// ```
pub fn matches_requirement(
    version: &str,
    requirement: Option<&str>,
) -> Result<bool, VersionError> {
    let Some(req_str) = requirement else {
        return Ok(true);
    };

    let req_str = req_str.trim();
    if req_str.is_empty() {
        return Ok(true);
    }

    let version = parse_lenient(version).map_err(|e| VersionError::InvalidVersion {
        value: version.to_string(),
        source: e.to_string(),
    })?;

    let req = VersionReq::parse(req_str).map_err(|e| VersionError::InvalidRequirement {
        value: req_str.to_string(),
        source: e.to_string(),
    })?;

    Ok(req.matches(&version))
}

/// Userscripts often use two-part versions ("1.5"); pad them to semver.
fn parse_lenient(version: &str) -> Result<Version, semver::Error> {
    let version = version.trim().trim_start_matches('v');
    match version.matches('.').count() {
        0 => Version::parse(&format!("{version}.0.0")),
        1 => Version::parse(&format!("{version}.0")),
        _ => Version::parse(version),
    }
}
