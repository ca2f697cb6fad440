#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use lumen_scan_core::markup::strip;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

fn broken(_: &ScannerRegistry) -> Result<Box<dyn Scan>, ScanError> {
    Err(ScanError::NoProgress {
        language: "broken",
        pos: 0,
    })
}

fn registry_with_broken() -> ScannerRegistry {
    let mut registry = ScannerRegistry::with_defaults();
    registry.add(&["broken"], "Broken", broken, |_, _| 0.0);
    registry
}

// === Highlighting ===

#[test]
fn highlights_known_language() {
    assert_eq!(
        highlight(default_registry(), "c", "int x = 1;", &HighlightOptions::default()),
        "<TYPE>int</TYPE> x <OPERATOR>=</OPERATOR> <NUMERIC>1</NUMERIC>;"
    );
}

#[test]
fn unknown_language_uses_default() {
    let out = highlight(default_registry(), "cobol", "a < b", &HighlightOptions::default());
    assert_eq!(out, "a &lt; b");
}

#[test]
fn unknown_language_with_auto_detect() {
    let options = HighlightOptions {
        auto_detect: true,
        ..HighlightOptions::default()
    };
    let out = highlight(default_registry(), "cobol", "#!/usr/bin/perl\nmy $x;", &options);
    assert!(out.contains("<VARIABLE>$x</VARIABLE>"), "{out}");
}

#[test]
fn failing_scanner_returns_escaped_source() {
    let registry = registry_with_broken();
    assert_eq!(highlight(&registry, "broken", "a<b", &HighlightOptions::default()), "a&lt;b");
    let tagged = HighlightOptions {
        failure_tag: Some("FAILED".to_owned()),
        ..HighlightOptions::default()
    };
    assert_eq!(highlight(&registry, "broken", "a<b", &tagged), "<FAILED>a&lt;b</FAILED>");
}

#[test]
fn empty_registry_fails_softly() {
    assert_eq!(
        highlight(&ScannerRegistry::new(), "c", "x & y", &HighlightOptions::default()),
        "x &amp; y"
    );
}

#[test]
fn deeply_nested_source_is_highlighted() {
    let src = format!("rule = {}", "[ ".repeat(100_000));
    let out = highlight(default_registry(), "bnf", &src, &HighlightOptions::default());
    assert_eq!(strip(&out), src);
}

// === Newlines ===

#[test]
fn newlines_are_normalized_by_default() {
    assert_eq!(normalize_newlines("a\r\nb\rc\n"), "a\nb\nc\n");
    assert!(matches!(normalize_newlines("a\nb"), Cow::Borrowed(_)));
    let out = highlight(default_registry(), "plain", "a\r\nb", &HighlightOptions::default());
    assert_eq!(out, "a\nb");
}

#[test]
fn normalization_can_be_turned_off() {
    let options = HighlightOptions {
        normalize_newlines: false,
        ..HighlightOptions::default()
    };
    assert_eq!(strip(&highlight(default_registry(), "c", "x;\r\n", &options)), "x;\r\n");
}

// === Guessing ===

#[test]
fn guess_language_uses_registry() {
    assert_eq!(guess_language(default_registry(), "<?php echo 1; ?>"), Some("php"));
    assert_eq!(guess_language(default_registry(), "words"), Some("plain"));
    assert_eq!(guess_language(&ScannerRegistry::new(), "words"), None);
}

#[test]
fn init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The facade never loses source text, whatever the language code.
    #[test]
    fn output_strips_to_normalized_source(
        src in "[a-z0-9 <>&/*'\"{};\n]{0,40}",
        code in prop::sample::select(vec!["c", "js", "html", "php", "perl", "broken", "nope"]),
    ) {
        let registry = registry_with_broken();
        let out = highlight(&registry, code, &src, &HighlightOptions::default());
        prop_assert_eq!(strip(&out), src);
    }
}
