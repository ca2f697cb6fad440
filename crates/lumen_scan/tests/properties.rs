//! Property tests over every registered language.
//!
//! Whatever the input, stripping the tags from the output gives back the
//! source, and a reused scanner renders exactly what a fresh one does.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]
#![allow(
    clippy::doc_markdown,
    clippy::redundant_closure_for_method_calls,
    reason = "Proptest macros generate code with these patterns"
)]

use lumen_scan::{ScannerRegistry, SourceBuffer};
use lumen_scan_core::markup::strip;
use proptest::prelude::*;

// -- Strategies --

/// Mostly punctuation: the characters every grammar treats specially.
fn source_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex(r#"[a-z0-9 \t\n<>/*+\-=;:{}()\[\]'"$@#!?.,%&|\\`_]{0,60}"#).expect("valid regex")
}

/// Script bodies that cannot spell out or swallow a closing tag.
fn script_body_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex(r#"[a-z0-9 =+;(){}\n'"]{0,40}"#).expect("valid regex")
}

fn codes(registry: &ScannerRegistry) -> Vec<&'static str> {
    registry.languages().map(|(codes, _)| codes[0]).collect()
}

fn highlight(registry: &ScannerRegistry, code: &str, src: &str) -> String {
    registry.get(code).unwrap().highlight(src).unwrap()
}

/// Well-formed sample per language.
const SAMPLES: &[(&str, &str)] = &[
    ("c", "#include <stdio.h>\n/* c */ int main() { return 'a' + \"s\\n\"[0]; } // x\n"),
    ("haskell", "module M where\n{- a {- b -} -}\nf :: Int -> Int\nf x = x + 1 -- c\n"),
    ("js", "var re = /a\\/b/g; // c\nfunction f(x) { return x / 2 + 'q'; }\n"),
    ("as", "package a { public class B { var x:int = 1; } }\n"),
    ("css", "@media screen { a:hover, .b > #c { color: #fff; width: 10px; } }\n/* c */\n"),
    ("html", "<!DOCTYPE html>\n<p class=\"x\">a &amp; b</p>\n<style>a { color: red; }</style>\n<script>var x = 1 < 2;</script>\n"),
    ("php", "<b><?php echo \"hi $name\"; /* c */ ?></b>\n<?= $x ?>\n"),
    ("php_snippet", "$a = array(1, 'b'); // c\nfunction f() { return $a; }\n"),
    ("perl", "my $x = qq{a {b}};\n$x =~ s/a/b/g;\nprint <<EOF;\nbody\nEOF\n=pod\ndoc\n=cut\n"),
    ("bnf", "<num> ::= <digit> | \"0\"\n<!c>\n"),
    ("bnf", "digit = \"0\" ;\nnumber = [ \"-\" ] , { digit } , ( ? x ? ) ; (* c *)\n"),
    ("diff", "--- a/x.c\n+++ b/x.c\n@@ -1,2 +1,2 @@\n int a;\n-int b;\n+int c;\n"),
    ("prettydiff", "--- a/x.js\n+++ b/x.js\n@@ -1 +1 @@\n-var a = 'x';\n+var a = \"y\";\n"),
];

// -- Fixed Samples --

#[test]
fn every_prefix_of_a_sample_reconstructs() {
    let registry = ScannerRegistry::with_defaults();
    for &(code, sample) in SAMPLES {
        let mut scanner = registry.get(code).unwrap();
        for (end, _) in sample.char_indices().chain(std::iter::once((sample.len(), ' '))) {
            let prefix = &sample[..end];
            let out = scanner.highlight(prefix).unwrap();
            assert_eq!(strip(&out), prefix, "{code} cut at {end}");
        }
    }
}

#[test]
fn well_formed_blocks_close_every_region() {
    let registry = ScannerRegistry::with_defaults();
    for &(code, sample) in SAMPLES.iter().filter(|(code, _)| matches!(*code, "css" | "bnf")) {
        let mut scanner = registry.get(code).unwrap();
        scanner.set_source(SourceBuffer::new(sample));
        scanner.main().unwrap();
        assert_eq!(scanner.scanner().depth(), 0, "{code}");
    }
}

// -- Generated Input --

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        max_shrink_iters: 500,
        ..ProptestConfig::default()
    })]

    /// Stripping the tags gives back the source for every language.
    #[test]
    fn output_reconstructs_source(src in source_strategy()) {
        let registry = ScannerRegistry::with_defaults();
        for code in codes(&registry) {
            let out = highlight(&registry, code, &src);
            prop_assert_eq!(strip(&out), src.clone(), "language {}", code);
        }
    }

    /// A reused scanner carries nothing over from its previous source.
    #[test]
    fn reused_scanner_matches_fresh(first in source_strategy(), second in source_strategy()) {
        let registry = ScannerRegistry::with_defaults();
        for code in codes(&registry) {
            let mut reused = registry.get(code).unwrap();
            reused.highlight(&first).unwrap();
            let again = reused.highlight(&second).unwrap();
            prop_assert_eq!(again, highlight(&registry, code, &second), "language {}", code);
        }
    }

    /// HTML resumes after an embedded script whatever the script holds.
    #[test]
    fn html_resumes_after_script(body in script_body_strategy()) {
        let registry = ScannerRegistry::with_defaults();
        let src = format!("<script>{body}</script><i>x</i>");
        let out = highlight(&registry, "html", &src);
        prop_assert_eq!(strip(&out), src);
        prop_assert!(
            out.ends_with("&lt;<HTMLTAG>/script</HTMLTAG>&gt;&lt;<HTMLTAG>i</HTMLTAG>&gt;x&lt;<HTMLTAG>/i</HTMLTAG>&gt;"),
            "{}",
            out
        );
    }
}
