//! CSS.
//!
//! A hand-driven loop over a small region stack: the top level holds
//! selectors, `{` opens a declaration block where words alternate between
//! property names and values, and `@media`/`@keyframes` open a region whose
//! own `{` starts a nested top level. Embeddable in HTML (stops in front of
//! `</style>`) and in server languages, with dirty-exit recovery for
//! comments, strings and bracketed selectors.

use lumen_scan_core::{Kind, MatchData, Pattern};

use super::guess_matches;
use crate::presets::{C_COMMENT_ML, DOUBLE_STR, SINGLE_STR};
use crate::{
    EmbedOptions, ExitState, GrammarBuilder, Language, Region, Scan, ScanError, Scanner, ScannerRegistry,
    SourceBuffer, SourceInfo,
};

/// Property name, displayed as `TYPE`.
pub const KEY: Kind = Kind::new("KEY");
/// Class, id or pseudo-class name, displayed as `VARIABLE`.
pub const SELECTOR: Kind = Kind::new("SELECTOR");
/// `[attr=value]`, displayed as `OPERATOR`.
pub const ATTR_SELECTOR: Kind = Kind::new("ATTR_SELECTOR");
/// `:not(...)` argument, displayed as `OPERATOR`.
pub const ROUND_BRACKET_SELECTOR: Kind = Kind::new("ROUND_BRACKET_SELECTOR");
pub const SSTRING: Kind = Kind::new("SSTRING");
pub const DSTRING: Kind = Kind::new("DSTRING");

const BLOCK: Kind = Kind::new("block");
const MEDIA: Kind = Kind::new("media");
/// Top level nested inside a media region.
const GLOBAL: Kind = Kind::new("global");

/// The CSS grammar: display remaps and recovery patterns. Tokens are
/// produced by [`CssScanner`]'s own loop, not by a pattern table.
pub fn grammar() -> Result<GrammarBuilder, ScanError> {
    let mut g = GrammarBuilder::new("css")?;
    g.map_rule(Kind::TAG, Some(Kind::KEYWORD));
    g.map_rule(KEY, Some(Kind::TYPE));
    g.map_rule(SELECTOR, Some(Kind::VARIABLE));
    g.map_rule(ATTR_SELECTOR, Some(Kind::OPERATOR));
    g.map_rule(ROUND_BRACKET_SELECTOR, Some(Kind::OPERATOR));
    g.map_rule(SSTRING, Some(Kind::STRING));
    g.map_rule(DSTRING, Some(Kind::STRING));

    g.add_recovery(Kind::COMMENT, r"(?s).*?(?:\*/|\z)")?;
    g.add_recovery(SSTRING, r"(?s)(?:[^\\']|\\.)*(?:'|\\?\z)")?;
    g.add_recovery(DSTRING, r#"(?s)(?:[^\\"]|\\.)*(?:"|\\?\z)"#)?;
    g.add_recovery(ATTR_SELECTOR, r"(?s)(?:[^\]\\]|\\.)*(?:\]|\\?\z)")?;
    g.add_recovery(ROUND_BRACKET_SELECTOR, r"(?s)(?:[^)\\]|\\.)*(?:\)|\\?\z)")?;
    Ok(g)
}

#[derive(Debug)]
struct Patterns {
    server: Pattern,
    comment: Pattern,
    hex_colour: Pattern,
    length: Pattern,
    selector: Pattern,
    media: Pattern,
    word: Pattern,
    attr: Pattern,
    round: Pattern,
    dstring: Pattern,
    sstring: Pattern,
    style_close: Pattern,
    operator: Pattern,
}

impl Patterns {
    fn compile(opts: &EmbedOptions) -> Result<Self, ScanError> {
        Ok(Patterns {
            server: Pattern::literal(opts.server_tag)?,
            comment: Pattern::new(C_COMMENT_ML)?,
            hex_colour: Pattern::new(r"#[a-fA-F0-9]{3}(?:[a-fA-F0-9]{3})?")?,
            length: Pattern::new(r"-?\d+(?:\.\d+)?(?:em|px|ex|ch|mm|cm|in|pt|%)?")?,
            selector: Pattern::new(r"[\w\-]+")?,
            media: Pattern::new(r"@(?:-(?:moz|ms|webkit|o)-)?(?:keyframes|media)\b")?,
            word: Pattern::new(r"(!?)[\-\w@]+")?,
            attr: Pattern::new(r"(?s)\[(?:[^\]\\]|\\.)*\]")?,
            round: Pattern::new(r"(?s)\((?:[^)\\]|\\.)*\)")?,
            dstring: Pattern::new(DOUBLE_STR)?,
            sstring: Pattern::new(SINGLE_STR)?,
            style_close: Pattern::new(r"(?i)<\s*/\s*style")?,
            operator: Pattern::new(r"[:.#>*]+")?,
        })
    }
}

/// What a declaration-block word is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Expecting {
    Key,
    Value,
}

enum Step {
    Token(Option<Kind>, MatchData),
    Stop,
}

/// CSS scanner, optionally embedded in HTML and/or a server language.
#[derive(Debug)]
pub struct CssScanner {
    scanner: Scanner,
    opts: EmbedOptions,
    exit: ExitState,
    expecting: Expecting,
    patterns: Patterns,
}

impl CssScanner {
    pub fn new(opts: EmbedOptions) -> Result<Self, ScanError> {
        Ok(CssScanner {
            scanner: Scanner::new(grammar()?.build()),
            patterns: Patterns::compile(&opts)?,
            opts,
            exit: ExitState::new(),
            expecting: Expecting::Key,
        })
    }

    /// Consume one char, untagged unless `kind` is given.
    fn single(s: &mut Scanner, kind: Option<Kind>) -> Step {
        let start = s.pos();
        let len = s.peek().map_or(1, char::len_utf8);
        let data = MatchData::from_range(start..start + len);
        s.accept(&data);
        Step::Token(kind, data)
    }

    fn close_brace(s: &mut Scanner) -> Result<(), ScanError> {
        match s.state_name() {
            BLOCK | MEDIA => {
                s.pop_state()?;
            }
            GLOBAL => {
                s.pop_state()?;
                if s.state_name() == MEDIA {
                    s.pop_state()?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn step(&mut self) -> Result<Step, ScanError> {
        let s = &mut self.scanner;
        let p = &self.patterns;
        let c = s.peek().unwrap_or('\0');
        let state = s.state_name();
        let in_block = state == BLOCK;
        let in_media = state == MEDIA;

        if self.opts.in_server() && s.check(&p.server).is_some() {
            self.exit.set_interrupted(true);
            return Ok(Step::Stop);
        }
        if c == '/' {
            if let Some(m) = s.scan(&p.comment) {
                return Ok(Step::Token(Some(Kind::COMMENT), m));
            }
        }
        if in_block && c == '#' {
            if let Some(m) = s.scan(&p.hex_colour) {
                return Ok(Step::Token(Some(Kind::NUMERIC), m));
            }
        }
        if in_block && (c.is_ascii_digit() || c == '-') {
            if let Some(m) = s.scan(&p.length) {
                return Ok(Step::Token(Some(Kind::NUMERIC), m));
            }
        }
        if !in_block && s.char_before().is_some_and(|b| "#.:".contains(b)) {
            if let Some(m) = s.scan(&p.selector) {
                return Ok(Step::Token(Some(SELECTOR), m));
            }
        }
        if !in_block && !in_media && c == '@' {
            if let Some(m) = s.scan(&p.media) {
                s.push_state(Region::new(MEDIA, m.start()));
                return Ok(Step::Token(Some(Kind::TAG), m));
            }
        }
        if c.is_ascii_alphabetic() || "!@_-".contains(c) {
            if let Some(m) = s.scan(&p.word) {
                let important = m.group(1).is_some_and(|r| !r.is_empty());
                let kind = if in_media {
                    Kind::VALUE
                } else if !in_block || important {
                    Kind::TAG
                } else if self.expecting == Expecting::Key {
                    KEY
                } else if matches!(s.match_str(&m), "url" | "rgb" | "rgba") {
                    Kind::FUNCTION
                } else {
                    Kind::VALUE
                };
                return Ok(Step::Token(Some(kind), m));
            }
        }
        if !in_block && c == '[' {
            if let Some(m) = s.scan(&p.attr) {
                return Ok(Step::Token(Some(ATTR_SELECTOR), m));
            }
        }
        if !in_block && c == '(' {
            if let Some(m) = s.scan(&p.round) {
                return Ok(Step::Token(Some(ROUND_BRACKET_SELECTOR), m));
            }
        }
        match c {
            '}' => {
                Self::close_brace(s)?;
                return Ok(Self::single(s, None));
            }
            '{' => {
                if in_media {
                    s.push_state(Region::new(GLOBAL, s.pos()));
                } else if !in_block {
                    s.push_state(Region::new(BLOCK, s.pos()));
                    self.expecting = Expecting::Key;
                }
                return Ok(Self::single(s, None));
            }
            '"' => {
                if let Some(m) = s.scan(&p.dstring) {
                    return Ok(Step::Token(Some(DSTRING), m));
                }
            }
            '\'' => {
                if let Some(m) = s.scan(&p.sstring) {
                    return Ok(Step::Token(Some(SSTRING), m));
                }
            }
            ':' if in_block => {
                self.expecting = Expecting::Value;
                return Ok(Self::single(s, Some(Kind::OPERATOR)));
            }
            ';' if in_block => {
                self.expecting = Expecting::Key;
                return Ok(Self::single(s, Some(Kind::OPERATOR)));
            }
            _ => {}
        }
        if self.opts.in_html() && s.check(&p.style_close).is_some() {
            self.exit.clear();
            while s.depth() > 0 {
                s.pop_state()?;
            }
            return Ok(Step::Stop);
        }
        if let Some(m) = s.scan(&p.operator) {
            return Ok(Step::Token(Some(Kind::OPERATOR), m));
        }
        Ok(Self::single(s, None))
    }
}

impl Scan for CssScanner {
    fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    fn scanner_mut(&mut self) -> &mut Scanner {
        &mut self.scanner
    }

    fn set_source(&mut self, buf: SourceBuffer) {
        self.scanner.set_source(buf);
        self.exit.clear();
        self.expecting = Expecting::Key;
    }

    fn interrupted(&self) -> bool {
        self.exit.interrupted()
    }

    #[tracing::instrument(level = "debug", skip_all, fields(language = self.scanner.language()))]
    fn main(&mut self) -> Result<(), ScanError> {
        self.exit.set_interrupted(false);
        while !self.scanner.eos() {
            if let Some((kind, data)) = self.exit.resume(&mut self.scanner)? {
                if self.exit.server_break(&mut self.scanner, &self.opts, kind, &data)? {
                    return Ok(());
                }
                if !data.is_empty() {
                    self.scanner.record_match(Some(kind), &data);
                }
            }
            self.scanner.skip_whitespace();
            if self.scanner.eos() {
                break;
            }
            let start = self.scanner.pos();
            let depth = self.scanner.depth();
            let (kind, data) = match self.step()? {
                Step::Stop => return Ok(()),
                Step::Token(kind, data) => (kind, data),
            };
            if let Some(kind) = kind {
                if self.exit.server_break(&mut self.scanner, &self.opts, kind, &data)? {
                    return Ok(());
                }
            }
            self.scanner.record_match(kind, &data);
            self.scanner.ensure_progress(start, depth)?;
        }
        self.scanner.unwind_states()
    }
}

impl Language for CssScanner {
    const CODES: &'static [&'static str] = &["css"];
    const DESCRIPTION: &'static str = "CSS";

    fn create(_: &ScannerRegistry) -> Result<Self, ScanError> {
        Self::new(EmbedOptions::default())
    }

    fn guess(src: &str, _: &SourceInfo<'_>) -> f64 {
        let mut p = 0.0;
        if guess_matches!(r"(?:font-family|font-style|font-weight)\s*:\s*[^;\n\r]*;", src) {
            p += 0.15;
        }
        if src.contains("!important") {
            p += 0.05;
        }
        if guess_matches!(r"\b(?:div|span|table|body)\b[^\n\r{]*[\r\n]*\{", src) {
            p += 0.10;
        }
        p
    }
}
