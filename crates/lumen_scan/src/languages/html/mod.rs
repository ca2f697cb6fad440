//! HTML.
//!
//! Outside tags the scanner jumps between `&` entities and `<`; inside a tag
//! it classifies the tag name, attribute names, `=` values and quoted
//! strings. The body of `<script>` and `<style>` goes to JavaScript and CSS
//! child scanners, which share the source buffer and stop at the closing tag.
//!
//! Embedded in a server language, the scanner hands control back at every
//! server opening tag. A child (or a token) interrupted by one is resumed
//! when the host returns past the interruption point.

use lumen_scan_core::{Kind, MatchData, Pattern};

use super::{guess_count, guess_matches};
use super::css::CssScanner;
use super::javascript::JavaScriptScanner;
use crate::{
    delegate, Children, EmbedFlags, EmbedOptions, ExitState, GrammarBuilder, Language, Scan, ScanError,
    Scanner, ScannerRegistry, SourceBuffer, SourceInfo,
};

pub const DSTRING: Kind = Kind::new("DSTRING");
pub const SSTRING: Kind = Kind::new("SSTRING");
/// `<!-- ... -->`
pub const COMMENT1: Kind = Kind::new("COMMENT1");
/// `<! ... >` declarations other than comments and CDATA.
pub const COMMENT2: Kind = Kind::new("COMMENT2");
pub const CDATA: Kind = Kind::new("CDATA");

const AMP: Kind = Kind::new("AMP");
const LT: Kind = Kind::new("LT");
const TERM: Kind = Kind::new("TERM");

/// The HTML grammar for the given embedding.
pub fn grammar(opts: &EmbedOptions) -> Result<GrammarBuilder, ScanError> {
    let mut g = GrammarBuilder::new("html")?;
    g.map_rule(DSTRING, Some(Kind::STRING));
    g.map_rule(SSTRING, Some(Kind::STRING));
    g.map_rule(COMMENT1, Some(Kind::COMMENT));
    g.map_rule(COMMENT2, Some(Kind::COMMENT));
    g.map_rule(CDATA, Some(Kind::COMMENT));

    g.add_recovery(DSTRING, r#"[^">]*"?"#)?;
    g.add_recovery(SSTRING, r"[^'>]*'?")?;
    g.add_recovery(COMMENT1, r"(?s).*?(?:-->|\z)")?;
    g.add_recovery(COMMENT2, r"[^>]*>?")?;
    g.add_recovery(CDATA, r"(?s).*?(?:\]\]>|\z)")?;
    g.add_recovery(Kind::ESC, r"[^;]*;?")?;
    g.add_recovery(Kind::TYPE, r"\S*")?;
    g.add_recovery(Kind::VALUE, r"\S*")?;
    g.add_recovery(Kind::HTMLTAG, r"\S*")?;

    // outside tags, only these two chars matter
    g.add_pattern(AMP, "&")?;
    if opts.in_server() {
        g.add_compiled(TERM, Pattern::literal(opts.server_tag)?, None);
    }
    g.add_pattern(LT, "<")?;
    Ok(g)
}

#[derive(Debug)]
struct Patterns {
    server: Pattern,
    entity: Pattern,
    doctype: Pattern,
    cdata: Pattern,
    comment: Pattern,
    declaration: Pattern,
    self_close: Pattern,
    sstring: Pattern,
    dstring: Pattern,
    name: Pattern,
}

impl Patterns {
    fn compile(opts: &EmbedOptions) -> Result<Self, ScanError> {
        Ok(Patterns {
            server: Pattern::literal(opts.server_tag)?,
            entity: Pattern::new(r"&[^;\s]+;")?,
            doctype: Pattern::new(r"(?i)(<)(!DOCTYPE)")?,
            cdata: Pattern::new(r"(?is)<!\[CDATA\[.*?(?:\]\]>|\z)")?,
            comment: Pattern::new(r"(?s)<!--.*?(?:-->|\z)")?,
            declaration: Pattern::new(r"<![^>]*>?")?,
            self_close: Pattern::new(r"/\s*>")?,
            sstring: Pattern::new(r"(?s)'(?:[^'\\>]|\\.)*'?")?,
            dstring: Pattern::new(r#"(?s)"(?:[^"\\>]|\\.)*"?"#)?,
            name: Pattern::new(r"/?[^\s=<>/]+")?,
        })
    }
}

/// What the next name inside a tag is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Expecting {
    Nothing,
    TagName,
    Value,
}

/// HTML scanner with JavaScript and CSS children.
#[derive(Debug)]
pub struct HtmlScanner {
    scanner: Scanner,
    opts: EmbedOptions,
    exit: ExitState,
    children: Children,
    patterns: Patterns,
    in_tag: bool,
    expecting: Expecting,
    tag_name: String,
}

impl HtmlScanner {
    pub fn new(opts: EmbedOptions) -> Result<Self, ScanError> {
        let child_opts = EmbedOptions {
            flags: EmbedFlags::HTML | (opts.flags & EmbedFlags::SERVER),
            server_tag: opts.server_tag,
        };
        let mut children = Children::new();
        children.add("js", Box::new(JavaScriptScanner::new(child_opts)?));
        children.add("css", Box::new(CssScanner::new(child_opts)?));
        Ok(HtmlScanner {
            scanner: Scanner::new(grammar(&opts)?.build()),
            patterns: Patterns::compile(&opts)?,
            opts,
            exit: ExitState::new(),
            children,
            in_tag: false,
            expecting: Expecting::Nothing,
            tag_name: String::new(),
        })
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    /// Consume one char untagged.
    fn single(s: &mut Scanner) -> MatchData {
        let start = s.pos();
        let len = s.peek().map_or(1, char::len_utf8);
        let data = MatchData::from_range(start..start + len);
        s.accept(&data);
        data
    }

    /// Consume `<!...` constructs.
    fn bang(&mut self) -> (Option<Kind>, MatchData) {
        let s = &mut self.scanner;
        let p = &self.patterns;
        if let Some(m) = s.scan(&p.cdata) {
            (Some(CDATA), m)
        } else if let Some(m) = s.scan(&p.comment) {
            (Some(COMMENT1), m)
        } else if let Some(m) = s.scan(&p.declaration) {
            (Some(COMMENT2), m)
        } else {
            (None, Self::single(s))
        }
    }

    /// Classify a name inside a tag.
    fn name(&mut self, m: &MatchData) -> Kind {
        match self.expecting {
            Expecting::TagName => {
                self.expecting = Expecting::Nothing;
                self.tag_name = self.scanner.match_str(m).to_ascii_lowercase();
                Kind::HTMLTAG
            }
            Expecting::Value => {
                self.expecting = Expecting::Nothing;
                Kind::VALUE
            }
            Expecting::Nothing => Kind::TYPE,
        }
    }

    /// Handle `>`: closes the tag, and hands `<script>`/`<style>` bodies to
    /// a child.
    fn close_tag(&mut self) -> Result<(), ScanError> {
        self.in_tag = false;
        let child = match self.tag_name.as_str() {
            "script" => Some("js"),
            "style" => Some("css"),
            _ => None,
        };
        self.tag_name.clear();
        let gt = Self::single(&mut self.scanner);
        self.scanner.record_match(None, &gt);
        if let Some(name) = child {
            delegate(&mut self.scanner, &mut self.children, name, None)?;
        }
        Ok(())
    }
}

impl Scan for HtmlScanner {
    fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    fn scanner_mut(&mut self) -> &mut Scanner {
        &mut self.scanner
    }

    fn set_source(&mut self, buf: SourceBuffer) {
        self.children.set_source(&buf);
        self.scanner.set_source(buf);
        self.exit.clear();
        self.in_tag = false;
        self.expecting = Expecting::Nothing;
        self.tag_name.clear();
    }

    fn interrupted(&self) -> bool {
        self.exit.interrupted()
    }

    #[tracing::instrument(level = "debug", skip_all, fields(language = self.scanner.language()))]
    fn main(&mut self) -> Result<(), ScanError> {
        self.exit.set_interrupted(false);
        while !self.scanner.eos() {
            if self.opts.in_server() && self.scanner.check(&self.patterns.server).is_some() {
                self.exit.set_interrupted(true);
                break;
            }
            if let Some((kind, data)) = self.exit.resume(&mut self.scanner)? {
                if self.exit.server_break(&mut self.scanner, &self.opts, kind, &data)? {
                    break;
                }
                if !data.is_empty() {
                    self.scanner.record_match(Some(kind), &data);
                }
                continue;
            }
            if let Some(name) = self.children.resume_due(self.scanner.pos()) {
                delegate(&mut self.scanner, &mut self.children, name, None)?;
                continue;
            }

            if self.in_tag {
                self.scanner.skip_whitespace();
                if self.scanner.eos() {
                    break;
                }
                if self.opts.in_server() && self.scanner.check(&self.patterns.server).is_some() {
                    self.exit.set_interrupted(true);
                    break;
                }
            } else {
                let from = self.scanner.pos();
                let Some(next) = self.scanner.next_match() else {
                    self.scanner.record_rest(None);
                    break;
                };
                self.scanner.record_range(from, next.data.start(), None)?;
                self.scanner.set_pos(next.data.start());
                if next.kind == TERM {
                    self.exit.set_interrupted(true);
                    break;
                }
            }

            let start = self.scanner.pos();
            let depth = self.scanner.depth();
            let c = self.scanner.peek().unwrap_or('\0');
            let (kind, data) = if !self.in_tag && c == '&' {
                match self.scanner.scan(&self.patterns.entity) {
                    Some(m) => (Some(Kind::ESC), m),
                    None => (None, Self::single(&mut self.scanner)),
                }
            } else if !self.in_tag && c == '<' {
                if self.scanner.peek_n(2) == "<!" {
                    if let Some(m) = self.scanner.scan(&self.patterns.doctype) {
                        let text = self.scanner.text();
                        let (lt, doctype) = (m.group_str(text, 1).to_owned(), m.group_str(text, 2).to_owned());
                        self.scanner.record(None, lt);
                        self.scanner.record(Some(Kind::KEYWORD), doctype);
                        self.in_tag = true;
                        continue;
                    }
                    self.bang()
                } else {
                    self.in_tag = true;
                    self.expecting = Expecting::TagName;
                    (None, Self::single(&mut self.scanner))
                }
            } else if c == '>' {
                self.close_tag()?;
                continue;
            } else if let Some(m) = self.scanner.scan(&self.patterns.self_close) {
                // only reachable inside a tag: outside, the cursor is on `&` or `<`
                self.in_tag = false;
                self.tag_name.clear();
                (None, m)
            } else if c == '\'' {
                self.expecting = Expecting::Nothing;
                let m = self.scanner.scan(&self.patterns.sstring);
                m.map_or_else(|| (None, Self::single(&mut self.scanner)), |m| (Some(SSTRING), m))
            } else if c == '"' {
                self.expecting = Expecting::Nothing;
                let m = self.scanner.scan(&self.patterns.dstring);
                m.map_or_else(|| (None, Self::single(&mut self.scanner)), |m| (Some(DSTRING), m))
            } else if c == '=' {
                self.expecting = Expecting::Value;
                (None, Self::single(&mut self.scanner))
            } else if c != '/' || self.scanner.char_before() == Some('<') {
                match self.scanner.scan(&self.patterns.name) {
                    Some(m) => (Some(self.name(&m)), m),
                    None => (None, Self::single(&mut self.scanner)),
                }
            } else {
                (None, Self::single(&mut self.scanner))
            };

            if let Some(kind) = kind {
                if self.exit.server_break(&mut self.scanner, &self.opts, kind, &data)? {
                    break;
                }
            }
            self.scanner.record_match(kind, &data);
            self.scanner.ensure_progress(start, depth)?;
        }
        Ok(())
    }
}

impl Language for HtmlScanner {
    const CODES: &'static [&'static str] = &["html", "htm"];
    const DESCRIPTION: &'static str = "HTML";

    fn create(_: &ScannerRegistry) -> Result<Self, ScanError> {
        Self::new(EmbedOptions::default())
    }

    fn guess(src: &str, info: &SourceInfo<'_>) -> f64 {
        if info.trimmed.starts_with("<!DOCTYPE ") {
            return 0.75;
        }
        let mut p = 0.0;
        if guess_matches!(r"<(?:a|table|span|div)\s+class=", src) {
            p += 0.05;
        }
        if guess_matches!(r"</(?:a|table|span|div)>", src) {
            p += 0.05;
        }
        if guess_matches!(r"<(?:style|script)\b", src) {
            p += 0.15;
        }
        if src.contains("<![CDATA[") {
            p += 0.15;
        }
        // at least one tag every four lines
        let lines = src.lines().filter(|l| !l.trim().is_empty()).count().max(1);
        if guess_count!(r"<[!?/]?[a-zA-Z_:\-]", src) * 4 > lines {
            p += 0.15;
        }
        p
    }
}

#[cfg(test)]
mod tests;
