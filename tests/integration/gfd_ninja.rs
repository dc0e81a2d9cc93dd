//! The built-in Galaxy Flight Duration patch set against an upstream excerpt.
//!
//! The excerpt keeps every line the required patches anchor on, in upstream
//! order, with the surrounding code trimmed.

use std::fs;
use tempfile::TempDir;
use userscript_patcher::config::{apply_patches, builtin, PatchResult, Severity, Summary};
use userscript_patcher::fetch::LocalFile;
use userscript_patcher::pipeline::{run, PipelineError, RunOptions};
use userscript_patcher::{sha256_hex, AtomicFileWriter, Document, IntegrityError};

const UPSTREAM: &str = include_str!("../fixtures/gfd-upstream-excerpt.user.js");

fn patched_excerpt() -> Document {
    let config = builtin().unwrap();
    let (patched, _) = apply_patches(Document::from_text(UPSTREAM), &config.patches);
    patched
}

#[test]
fn test_every_required_patch_applies_once() {
    let config = builtin().unwrap();
    let (_, reports) = apply_patches(Document::from_text(UPSTREAM), &config.patches);

    for report in &reports {
        match report.severity {
            Severity::Required => assert_eq!(
                report.result,
                PatchResult::Applied { replacements: 1 },
                "{} should apply exactly once",
                report.id
            ),
            Severity::Optional => assert!(
                matches!(report.result, PatchResult::NotFound { .. }),
                "{} has nothing to remove in this revision",
                report.id
            ),
        }
    }

    let summary = Summary::from_reports(&reports);
    assert_eq!(summary.missed_required, 0);
    assert_eq!(summary.missed_optional, 2);
    assert_eq!(summary.applied, 11);
}

#[test]
fn test_header_adapted_for_ninja() {
    let patched = patched_excerpt();
    let content = patched.content();

    assert!(content
        .contains("// @name         Galaxy Flight Duration Ninja (CellMaster's Patcher)\n"));
    assert!(content.contains("// @match        *://*/bots/*/browser/html/*?page=*\n"));
    assert!(!content.contains("ogame.gameforge.com"));
    assert!(!content.contains("@updateURL"));
    assert!(!content.contains("@downloadURL"));
    assert!(content.contains("// @version      1.5.2\n"));
}

#[test]
fn test_environment_injected_once_after_header() {
    let patched = patched_excerpt();
    let content = patched.content();

    assert_eq!(content.matches("// ==/UserScript==").count(), 1);
    let header_end = content.find("// ==/UserScript==").unwrap();
    let env = content.find("const urlMatch = ").unwrap();
    let first_use = content.find("UNIVERSE + \"-GFD_serverData\"").unwrap();

    assert!(header_end < env);
    assert!(env < first_use);
    assert!(content.contains("\tconst langNinja = urlMatch[2];\n"));
    assert!(content.contains("\tconst PLAYER_ID = document.querySelector"));
}

#[test]
fn test_runtime_lines_rewritten() {
    let patched = patched_excerpt();
    let content = patched.content();

    assert!(content.contains(
        r#"url: PROTOCOL + "//" + HOST + "/api/s" + universeNum + "/" + langNinja + "/serverData.xml","#
    ));
    assert!(content.contains("    let lang = langNinja;\n    return lang;"));
    assert!(!content.contains("oglocale"));
    assert!(content.contains(
        r#"fetch(window.location.pathname + "?page=ingame&component=fleetdispatch&action=checkTarget&ajax=1&asJson=1", {"#
    ));
    assert!(content.contains(
        r#"const PLAYER_INFO_LOCAL_STORAGE_KEY = UNIVERSE + "-" + PLAYER_ID + "-GFD_playerInfo";"#
    ));
    assert!(content.contains(
        r#"const PLAYER_SETTINGS_LOCAL_STORAGE_KEY = UNIVERSE + "-" + PLAYER_ID + "-GFD_playerSettings";"#
    ));
}

#[test]
fn test_reapplying_to_output_is_noop() {
    let config = builtin().unwrap();
    let first = patched_excerpt();
    let expected = first.content().to_string();

    let (second, reports) = apply_patches(first, &config.patches);

    assert_eq!(second.content(), expected);
    assert!(reports
        .iter()
        .all(|r| !matches!(r.result, PatchResult::Applied { .. })));
    // The injection keeps its anchor; only its applied_marker stops a repeat
    let inject = reports
        .iter()
        .find(|r| r.id == "inject-environment")
        .unwrap();
    assert_eq!(inject.result, PatchResult::AlreadyApplied);
    let rename = reports.iter().find(|r| r.id == "rename-script").unwrap();
    assert!(matches!(rename.result, PatchResult::NotFound { .. }));
}

#[test]
fn test_crlf_upstream_patches_identically() {
    let config = builtin().unwrap();
    let crlf = UPSTREAM.replace('\n', "\r\n");

    let document = Document::from_bytes(crlf.as_bytes()).unwrap();
    let (patched, reports) = apply_patches(document, &config.patches);

    assert_eq!(patched.content(), patched_excerpt().content());
    assert!(!patched.content().contains('\r'));
    assert_eq!(Summary::from_reports(&reports).missed_required, 0);
}

#[test]
fn test_pinned_digest_rejects_excerpt() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("upstream.user.js");
    fs::write(&input, UPSTREAM).unwrap();
    let output = dir.path().join("GFD_Ninja.user.js");

    let config = builtin().unwrap();
    let options = RunOptions {
        output: output.clone(),
        dry_run: false,
    };

    let err = run(
        &config,
        &LocalFile::new(&input),
        &AtomicFileWriter,
        &options,
        |_| {},
    )
    .unwrap_err();

    match err {
        PipelineError::Integrity(IntegrityError::Mismatch {
            expected,
            actual,
            upstream_version,
        }) => {
            assert_eq!(expected, config.meta.sha256);
            assert_eq!(actual, sha256_hex(UPSTREAM.as_bytes()));
            assert_eq!(upstream_version.as_deref(), Some("1.5.2"));
        }
        other => panic!("expected integrity failure, got {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn test_full_run_writes_patched_script() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("upstream.user.js");
    fs::write(&input, UPSTREAM).unwrap();
    let output = dir.path().join("GFD_Ninja.user.js");

    let mut config = builtin().unwrap();
    config.meta.sha256 = sha256_hex(UPSTREAM.as_bytes());
    let options = RunOptions {
        output: output.clone(),
        dry_run: false,
    };

    let outcome = run(
        &config,
        &LocalFile::new(&input),
        &AtomicFileWriter,
        &options,
        |_| {},
    )
    .unwrap();

    assert_eq!(outcome.upstream_version.as_deref(), Some("1.5.2"));
    assert_eq!(outcome.written.as_deref(), Some(output.as_path()));
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        patched_excerpt().content()
    );
}
