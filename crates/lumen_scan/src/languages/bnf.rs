//! BNF and EBNF.
//!
//! Dialects are too many to match individually, so the source picks one of
//! two grammars: any `<name>` means classic BNF with angle-bracketed rule
//! names, otherwise extended BNF with `[ ]`, `{ }`, `( )` and `? ?` regions
//! driven by the token-tree engine. Rule names defined in EBNF mark later
//! uses of the same name as `VALUE`.

use std::sync::Arc;

use lumen_scan_core::{Kind, MatchData, Pattern};

use crate::presets::{DOUBLE_STR_SL, SINGLE_STR_SL};
use crate::{
    stateful, Grammar, GrammarBuilder, Language, Scan, ScanError, Scanner, ScannerRegistry, SourceBuffer,
};

pub const OPTION: Kind = Kind::new("OPTION");
pub const REPETITION: Kind = Kind::new("REPETITION");
pub const GROUP: Kind = Kind::new("GROUP");
pub const SPECIAL: Kind = Kind::new("SPECIAL");
/// EBNF rule head at the start of a line.
pub const RULE: Kind = Kind::new("RULE");

const HEAD: Kind = Kind::new("HEAD");
const HEAD_BRACE: Kind = Kind::new("HEAD_BRACE");
const BRACE: Kind = Kind::new("BRACE");

const IDENT: &str = r"[\w\-]+";

/// Record `<name>`-style matches with only the inside tagged.
fn bracketed(inner: Kind) -> impl Fn(&mut Scanner, &MatchData) -> Result<(), ScanError> + Send + Sync {
    move |s, m| {
        let (start, end) = (m.start(), m.end());
        let open = s.slice(start..start + 1).to_owned();
        let name = s.slice(start + 1..end - 1).to_owned();
        let close = s.slice(end - 1..end).to_owned();
        s.record(None, open);
        s.record(Some(inner), name);
        s.record(None, close);
        s.set_pos(end);
        Ok(())
    }
}

/// `name =` at the start of a line: the name becomes a user definition.
/// The match runs one character past the name; only indent and name are
/// consumed.
fn rule_head(s: &mut Scanner, m: &MatchData) -> Result<(), ScanError> {
    let (indent, name) = {
        let text = s.text();
        (m.group_str(text, 1).to_owned(), m.group_str(text, 2).to_owned())
    };
    let end = m.start() + indent.len() + name.len();
    s.record(None, indent);
    s.record(Some(Kind::USER_FUNCTION), name.clone());
    s.add_user_def(name, Kind::VALUE);
    s.set_pos(end);
    Ok(())
}

fn common(g: &mut GrammarBuilder) -> Result<(), ScanError> {
    g.add_pattern(Kind::STRING, SINGLE_STR_SL)?;
    g.add_pattern(Kind::STRING, DOUBLE_STR_SL)?;
    g.add_pattern(Kind::OPERATOR, r"[*\-=+;:|,]+")?;
    // a few punctuation characters at the start of a line comment it out
    g.add_pattern(Kind::COMMENT, r"(?m)^[!%-;].*")?;
    g.remove_filter("constant");
    g.remove_filter("comment-to-doc");
    Ok(())
}

/// Classic BNF: `<rule> ::= <a> | "b"`.
pub fn strict() -> Result<GrammarBuilder, ScanError> {
    let mut g = GrammarBuilder::new("bnf")?;
    g.add_pattern(Kind::COMMENT, r"<![^>]*>")?;
    g.add_pattern(HEAD, r"(?m)^<[^>]+>")?;
    g.add_pattern(HEAD_BRACE, r"(?m)^\{[^}]+\}")?;
    g.add_pattern(BRACE, r"\{[^}]+\}")?;
    g.add_pattern(Kind::VALUE, IDENT)?;
    g.add_override(HEAD, bracketed(Kind::KEYWORD));
    g.add_override(HEAD_BRACE, bracketed(Kind::KEYWORD));
    g.add_override(BRACE, bracketed(Kind::VALUE));
    common(&mut g)?;
    Ok(g)
}

/// Extended BNF: `rule = a , [ b ] , { c } ;`.
pub fn extended() -> Result<GrammarBuilder, ScanError> {
    let mut g = GrammarBuilder::new("bnf")?;
    g.add_pattern(Kind::COMMENT, r"(?s)\(\*.*?\*\)")?;
    g.add_delimited(OPTION, r"\[", r"\]")?;
    g.add_delimited(REPETITION, r"\{", r"\}")?;
    g.add_delimited(GROUP, r"\(", r"\)")?;
    g.add_delimited(SPECIAL, r"\?", r"\?")?;
    g.add_pattern(RULE, &format!(r"(?m)^([ \t]*)({IDENT})(\s*)(?:[^[:alnum:]\s]|\z)"))?;
    g.add_override(RULE, rule_head);
    g.add_pattern(Kind::IDENT, IDENT)?;
    common(&mut g)?;

    let all = [
        Kind::COMMENT,
        OPTION,
        REPETITION,
        GROUP,
        SPECIAL,
        Kind::STRING,
        Kind::IDENT,
        Kind::OPERATOR,
    ];
    g.set_transitions(crate::INITIAL, std::iter::once(RULE).chain(all));
    for region in [OPTION, REPETITION, GROUP] {
        g.set_transitions(region, all);
    }
    g.set_transitions(SPECIAL, all.into_iter().filter(|&k| k != SPECIAL));
    for region in [OPTION, REPETITION, GROUP, SPECIAL] {
        g.map_rule(region, None);
    }
    Ok(g)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Dialect {
    Strict,
    Extended,
}

/// Chooses a dialect per source, then runs the token-tree engine.
#[derive(Debug)]
pub struct BnfScanner {
    strict: Scanner,
    extended: Scanner,
    dialect: Dialect,
    marker: Pattern,
}

impl BnfScanner {
    pub fn new() -> Result<Self, ScanError> {
        Self::with_grammars(strict()?.build(), extended()?.build())
    }

    fn with_grammars(strict: Arc<Grammar>, extended: Arc<Grammar>) -> Result<Self, ScanError> {
        Ok(BnfScanner {
            strict: Scanner::with_tree(strict),
            extended: Scanner::with_tree(extended),
            dialect: Dialect::Extended,
            marker: Pattern::new(r"<\w+>")?,
        })
    }

    /// Whether the current source is classic BNF.
    pub fn is_strict(&self) -> bool {
        self.dialect == Dialect::Strict
    }
}

impl Scan for BnfScanner {
    fn scanner(&self) -> &Scanner {
        match self.dialect {
            Dialect::Strict => &self.strict,
            Dialect::Extended => &self.extended,
        }
    }

    fn scanner_mut(&mut self) -> &mut Scanner {
        match self.dialect {
            Dialect::Strict => &mut self.strict,
            Dialect::Extended => &mut self.extended,
        }
    }

    fn main(&mut self) -> Result<(), ScanError> {
        stateful::run(self.scanner_mut())
    }

    fn set_source(&mut self, buf: SourceBuffer) {
        self.dialect = if self.marker.is_match(buf.as_str()) {
            Dialect::Strict
        } else {
            Dialect::Extended
        };
        tracing::trace!(dialect = ?self.dialect, "bnf dialect");
        self.scanner_mut().set_source(buf);
    }
}

impl Language for BnfScanner {
    const CODES: &'static [&'static str] = &["bnf"];
    const DESCRIPTION: &'static str = "Backus-Naur Form";

    fn create(_: &ScannerRegistry) -> Result<Self, ScanError> {
        Self::new()
    }

    // BNF is rare enough that any positive score would mostly hide the
    // right language, so this keeps the default of zero.
}
