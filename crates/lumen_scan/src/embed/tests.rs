#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use super::*;
use crate::{ExitState, GrammarBuilder};
use lumen_scan_core::markup::strip;
use lumen_scan_core::Pattern;
use pretty_assertions::assert_eq;

/// Child that highlights double-quoted strings and stops at `<?`.
struct Quotes {
    scanner: Scanner,
    exit: ExitState,
    opts: EmbedOptions,
    step: Pattern,
}

impl Quotes {
    fn new() -> Self {
        let mut g = GrammarBuilder::bare("quotes");
        g.add_recovery(Kind::STRING, r#"[^"]*"?"#).unwrap();
        Quotes {
            scanner: Scanner::new(g.build()),
            exit: ExitState::new(),
            opts: EmbedOptions::new(EmbedFlags::SERVER),
            step: Pattern::new(r#""[^"]*"?|[^"<]+|<"#).unwrap(),
        }
    }
}

impl Scan for Quotes {
    fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    fn scanner_mut(&mut self) -> &mut Scanner {
        &mut self.scanner
    }

    fn main(&mut self) -> Result<(), ScanError> {
        let s = &mut self.scanner;
        if let Some((kind, m)) = self.exit.resume(s)? {
            s.record_match(Some(kind), &m);
        }
        while !s.eos() {
            if s.rest().starts_with("<?") {
                break;
            }
            let Some(m) = s.scan(&self.step) else { break };
            if s.match_str(&m).starts_with('"') {
                if self.exit.server_break(s, &self.opts, Kind::STRING, &m)? {
                    return Ok(());
                }
                s.record_match(Some(Kind::STRING), &m);
            } else {
                s.record_match(None, &m);
            }
        }
        Ok(())
    }

    fn interrupted(&self) -> bool {
        self.exit.interrupted()
    }
}

fn host(src: &str) -> (Scanner, Children) {
    let buf = SourceBuffer::new(src);
    let mut host = Scanner::new(GrammarBuilder::bare("host").build());
    host.set_source(buf.clone());
    let mut children = Children::new();
    children.add("quotes", Box::new(Quotes::new()));
    children.set_source(&buf);
    (host, children)
}

#[test]
fn unknown_child_is_an_error() {
    let (mut h, mut c) = host("x");
    assert_eq!(
        delegate(&mut h, &mut c, "nope", None).unwrap_err(),
        ScanError::UnknownChild { name: "nope" }
    );
}

#[test]
fn delegation_splices_escaped_output() {
    let (mut h, mut c) = host(r#"<"a<b">"#);
    h.get(1);
    h.record(None, "<");
    // Child stops at EOS; host ends up there too.
    let interrupted = delegate(&mut h, &mut c, "quotes", None).unwrap();
    assert!(!interrupted);
    assert!(h.eos());
    let out = h.tagged();
    assert_eq!(out, r#"&lt;<STRING>"a&lt;b"</STRING>&gt;"#);
    assert_eq!(strip(&out), r#"<"a<b">"#);
}

#[test]
fn interrupted_child_resumes_with_state() {
    let src = r#"a"b<?x?>c"d"#;
    let (mut h, mut c) = host(src);
    h.get(1);
    h.record(None, "a");

    assert!(delegate(&mut h, &mut c, "quotes", None).unwrap());
    assert_eq!(h.pos(), 3);
    assert_eq!(c.pending(), Some(("quotes", 3)));
    assert_eq!(c.resume_due(h.pos()), None);

    // Host consumes the server block.
    let block = h.get(5);
    h.record(Some(Kind::KEYWORD), block);
    assert_eq!(c.resume_due(h.pos()), Some("quotes"));

    assert!(!delegate(&mut h, &mut c, "quotes", None).unwrap());
    assert_eq!(c.pending(), None);
    assert!(h.eos());
    let out = h.tagged();
    assert_eq!(
        out,
        r#"a<STRING>"b</STRING><KEYWORD>&lt;?x?&gt;</KEYWORD><STRING>c"</STRING>d"#
    );
}

#[test]
fn wrapped_delegation() {
    let (mut h, mut c) = host(r#""x""#);
    delegate(&mut h, &mut c, "quotes", Some(Kind::new("EMBED"))).unwrap();
    assert_eq!(h.tagged(), r#"<EMBED><STRING>"x"</STRING></EMBED>"#);
}

#[test]
fn embed_flags() {
    let opts = EmbedOptions::new(EmbedFlags::HTML | EmbedFlags::SERVER);
    assert!(opts.in_html());
    assert!(opts.in_server());
    assert_eq!(opts.server_tag, "<?");
    assert!(!EmbedOptions::default().in_html());
}
