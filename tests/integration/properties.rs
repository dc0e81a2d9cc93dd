//! Property tests for the patch engine.

use proptest::prelude::*;
use userscript_patcher::config::{apply_patches, PatchDefinition, PatchResult, Severity};
use userscript_patcher::{Document, Occurrences};

const MARKERS: usize = 5;

fn marker(index: usize) -> String {
    format!("<<A{index}>>")
}

fn patch(index: usize, replacement: &str) -> PatchDefinition {
    PatchDefinition {
        id: format!("patch-{index}"),
        label: None,
        anchor: marker(index),
        replacement: replacement.to_string(),
        occurrences: Occurrences::ONCE,
        severity: Severity::Optional,
        applied_marker: None,
    }
}

/// Filler text with each marker present at most once. Replacements never
/// contain `<`, so no patch can create another patch's anchor.
fn scenario() -> impl Strategy<Value = (String, Vec<PatchDefinition>)> {
    (
        prop::collection::vec("[a-z \n]{0,12}", MARKERS + 1),
        prop::collection::vec(any::<bool>(), MARKERS),
        prop::collection::vec("[a-z]{0,8}", MARKERS),
        Just((0..MARKERS).collect::<Vec<usize>>()).prop_shuffle(),
    )
        .prop_map(|(filler, present, replacements, order)| {
            let mut text = String::new();
            for (index, chunk) in filler.iter().enumerate() {
                text.push_str(chunk);
                if index < MARKERS && present[index] {
                    text.push_str(&marker(index));
                }
            }
            let patches = order
                .into_iter()
                .map(|index| patch(index, &replacements[index]))
                .collect();
            (text, patches)
        })
}

proptest! {
    #[test]
    fn reapplying_sequence_is_noop((text, patches) in scenario()) {
        let (once, _) = apply_patches(Document::from_text(&text), &patches);
        let expected = once.content().to_string();

        let (twice, reports) = apply_patches(once, &patches);

        prop_assert_eq!(twice.content(), expected.as_str());
        for report in &reports {
            let applied = matches!(report.result, PatchResult::Applied { .. });
            prop_assert!(!applied, "{} applied twice", report.id);
        }
    }

    #[test]
    fn present_markers_are_consumed((text, patches) in scenario()) {
        let (patched, reports) = apply_patches(Document::from_text(&text), &patches);

        prop_assert!(!patched.content().contains("<<A"));
        for (report, patch) in reports.iter().zip(&patches) {
            let expected = text.contains(patch.anchor.as_str());
            let applied = report.result == PatchResult::Applied { replacements: 1 };
            prop_assert_eq!(applied, expected);
        }
    }

    #[test]
    fn line_endings_do_not_change_result((text, patches) in scenario()) {
        let crlf = text.replace('\n', "\r\n");

        let (from_lf, _) = apply_patches(Document::from_text(&text), &patches);
        let (from_crlf, _) = apply_patches(Document::from_text(&crlf), &patches);

        prop_assert_eq!(from_lf.content(), from_crlf.content());
    }

    #[test]
    fn reports_follow_sequence_order((text, patches) in scenario()) {
        let (_, reports) = apply_patches(Document::from_text(&text), &patches);

        prop_assert_eq!(reports.len(), patches.len());
        for (position, (report, patch)) in reports.iter().zip(&patches).enumerate() {
            prop_assert_eq!(report.ordinal, position + 1);
            prop_assert_eq!(&report.id, &patch.id);
        }
    }
}
