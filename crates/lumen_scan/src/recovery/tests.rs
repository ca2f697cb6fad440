#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use super::*;
use crate::state::Region;
use crate::GrammarBuilder;
use lumen_scan_core::{SourceBuffer, Token};
use pretty_assertions::assert_eq;

const DSTRING: Kind = Kind::new("DSTRING");

fn scanner(src: &str) -> Scanner {
    let mut g = GrammarBuilder::bare("rec");
    g.add_recovery(DSTRING, r#"(?:[^"\\]|\\.)*(?:"|$)"#).unwrap();
    g.add_recovery(Kind::COMMENT, r"(?s).*?(?:\*/|$)").unwrap();
    let mut s = Scanner::new(g.build());
    s.set_source(SourceBuffer::new(src));
    s
}

fn server() -> EmbedOptions {
    EmbedOptions::new(EmbedFlags::SERVER)
}

// === Dirty Exit ===

#[test]
fn dirty_exit_needs_recovery() {
    let s = scanner("");
    let mut exit = ExitState::new();
    assert_eq!(
        exit.dirty_exit(&s, Kind::STRING).unwrap_err(),
        ScanError::NoRecovery { kind: Kind::STRING }
    );
    assert!(exit.is_clean());
}

#[test]
fn server_break_then_resume() {
    let src = r#""ab<?= x ?>cd" y"#;
    let mut s = scanner(src);
    let mut exit = ExitState::new();
    let string = Pattern::new(r#""[^"]*""#).unwrap();
    let m = s.scan(&string).unwrap();

    assert!(exit.server_break(&mut s, &server(), DSTRING, &m).unwrap());
    assert!(exit.interrupted());
    assert_eq!(exit.exit_kind(), Some(DSTRING));
    assert_eq!(s.pos(), 3);
    assert_eq!(s.tokens().as_slice(), &[Token::new(Some(DSTRING), "\"ab")]);

    // The host consumes its own block, then hands back.
    s.set_pos(11);
    let (kind, data) = exit.resume(&mut s).unwrap().unwrap();
    assert_eq!(kind, DSTRING);
    assert_eq!(s.match_str(&data), "cd\"");
    assert!(exit.is_clean());
    assert!(!exit.interrupted());
}

#[test]
fn server_break_ignored_when_not_embedded() {
    let mut s = scanner(r#""<?""#);
    let mut exit = ExitState::new();
    let m = s.scan(&Pattern::new(r#""[^"]*""#).unwrap()).unwrap();
    assert!(!exit.server_break(&mut s, &EmbedOptions::default(), DSTRING, &m).unwrap());
    assert!(s.tokens().is_empty());
}

#[test]
fn resume_after_clean_exit_is_noop() {
    let mut s = scanner("x");
    let mut exit = ExitState::new();
    assert!(exit.resume(&mut s).unwrap().is_none());
    assert_eq!(s.pos(), 0);
}

#[test]
fn resume_reports_failed_recovery() {
    let mut g = GrammarBuilder::bare("rec");
    g.add_recovery(DSTRING, "never").unwrap();
    let mut s = Scanner::new(g.build());
    s.set_source(SourceBuffer::new("abc"));
    let mut exit = ExitState::new();
    exit.dirty_exit(&s, DSTRING).unwrap();
    assert_eq!(
        exit.resume(&mut s).unwrap_err(),
        ScanError::RecoveryFailed { kind: DSTRING, pos: 0 }
    );
}

#[test]
fn script_break_is_clean() {
    let src = "// x </script>";
    let mut s = scanner(src);
    let mut exit = ExitState::new();
    let m = s.scan(&Pattern::new(r"//.*").unwrap()).unwrap();
    let close = Pattern::new(r"(?i)</script>").unwrap();
    let opts = EmbedOptions::new(EmbedFlags::HTML);
    assert!(exit.script_break(&mut s, &opts, &close, Kind::COMMENT, &m));
    assert!(exit.is_clean());
    assert_eq!(s.pos(), 5);
    assert_eq!(s.tokens().as_slice(), &[Token::new(Some(Kind::COMMENT), "// x ")]);
}

// === Unwinding ===

#[test]
fn unwind_innermost_first() {
    let mut s = scanner("a */ tail");
    s.push_state(Region::new(Kind::STRING, 0));
    s.push_state(Region::new(Kind::COMMENT, 0));
    s.unwind_states().unwrap();
    assert_eq!(s.depth(), 0);
    assert!(s.eos());
    assert_eq!(
        s.tokens().as_slice(),
        &[
            Token::new(Some(Kind::COMMENT), "a */"),
            Token::new(Some(Kind::STRING), " tail"),
        ]
    );
}
