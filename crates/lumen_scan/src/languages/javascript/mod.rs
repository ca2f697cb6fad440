//! JavaScript (ECMAScript).
//!
//! Runs its own main loop rather than [`simple::run`](crate::simple::run)
//! because it is embeddable:
//!
//! - in HTML it stops in front of `</script>`, even when the tag sits inside
//!   a comment or string;
//! - in a server language it stops in front of the server's opening tag. If
//!   that tag interrupts a token (a string, comment or regex), the exit is
//!   dirty and the next `main` finishes the token with its recovery pattern.
//!
//! A `/` is a regex literal or a division depending on the token before it
//! (see [`classify_slash`]).

use std::sync::Arc;

use lumen_scan_core::{Kind, Pattern};

use crate::presets::{C_COMMENT_ML, C_COMMENT_SL, DOUBLE_STR_SL, NUM_HEX, NUM_REAL, SINGLE_STR_SL};
use crate::{
    classify_slash, EmbedOptions, ExitState, Grammar, GrammarBuilder, Language, Scan, ScanError, Scanner,
    ScannerRegistry, SlashKind, SourceBuffer, CLOSER, OPENER,
};

/// Single-quoted string, displayed as `STRING`.
pub const SSTRING: Kind = Kind::new("SSTRING");
/// Double-quoted string, displayed as `STRING`.
pub const DSTRING: Kind = Kind::new("DSTRING");
/// `//` comment, displayed as `COMMENT`.
pub const COMMENT_SL: Kind = Kind::new("COMMENT_SL");

const SLASH: Kind = Kind::new("SLASH");
const STOP_SERVER: Kind = Kind::new("STOP_SERVER");
const STOP_SCRIPT: Kind = Kind::new("STOP_SCRIPT");

const KEYWORDS: &[&str] = &[
    "break", "case", "catch", "comment", "continue", "do", "default", "delete", "else", "export",
    "for", "function", "if", "import", "in", "instanceof", "label", "new", "null", "return",
    "switch", "throw", "try", "typeof", "var", "void", "while", "with", "true", "false", "this",
];

const FUNCTIONS: &[&str] = &[
    "$", "alert", "confirm", "clearTimeout", "clearInterval", "encodeURI", "encodeURIComponent",
    "eval", "isFinite", "isNaN", "parseInt", "parseFloat", "prompt", "setTimeout", "setInterval",
    "decodeURI", "decodeURIComponent", "jQuery",
];

const TYPES: &[&str] = &[
    "Array", "Boolean", "Date", "Error", "EvalError", "Infinity", "Image", "Math", "NaN", "Number",
    "Object", "Option", "RangeError", "ReferenceError", "RegExp", "String", "SyntaxError",
    "TypeError", "URIError", "document", "undefined", "window",
];

/// Words after which a `/` starts a regex literal.
const REGEX_WORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "instanceof", "new", "delete", "void", "throw",
];

/// Regex literal: classes may contain an unescaped `/`. Unterminated
/// literals stop at the end of the line.
const REGEX_LITERAL: &str = r"/(?:[^\[\\/\n]+|\\.|\[(?:[^\]\\\n]+|\\.)*\]?)*(?:/[gimsuyx]*)?";

/// Closing tag of the HTML element hosting the script.
const SCRIPT_CLOSE: &str = r"(?i)</script>";

/// The JavaScript grammar for the given embedding.
pub fn builder(opts: &EmbedOptions) -> Result<GrammarBuilder, ScanError> {
    let mut g = GrammarBuilder::new("js")?;
    g.map_rule(COMMENT_SL, Some(Kind::COMMENT));
    g.map_rule(SSTRING, Some(Kind::STRING));
    g.map_rule(DSTRING, Some(Kind::STRING));
    g.map_rule(OPENER, None);
    g.map_rule(CLOSER, None);

    g.add_recovery(COMMENT_SL, ".*")?;
    g.add_recovery(Kind::COMMENT, r"(?s).*?(?:\*/|\z)")?;
    g.add_recovery(SSTRING, r"(?m)(?:[^\\'\n]|\\(?s:.))*(?:'|\\?$)")?;
    g.add_recovery(DSTRING, r#"(?m)(?:[^\\"\n]|\\(?s:.))*(?:"|\\?$)"#)?;
    g.add_recovery(Kind::REGEX, r"(?m)(?:[^\\/\n]|\\.)*(?:/[gimsuyx]*|\\?$)")?;

    g.add_identifier_mapping(Kind::KEYWORD, KEYWORDS);
    g.add_identifier_mapping(Kind::FUNCTION, FUNCTIONS);
    g.add_identifier_mapping(Kind::TYPE, TYPES);

    // stop patterns first: they win ties against `<`
    if opts.in_server() {
        g.add_compiled(STOP_SERVER, Pattern::literal(opts.server_tag)?, None);
    }
    if opts.in_html() {
        g.add_pattern(STOP_SCRIPT, SCRIPT_CLOSE)?;
    }
    g.add_pattern(Kind::IDENT, r"[a-zA-Z_$][_$\w]*")?;
    if opts.in_html() || opts.in_server() {
        // `<` on its own, so a host tag starting at it is still seen
        g.add_pattern(Kind::OPERATOR, r"[=!+*%\-&^|~:?;,.>]+|<")?;
    } else {
        g.add_pattern(Kind::OPERATOR, r"[=!+*%\-&^|~:?;,.><]+")?;
    }
    g.add_pattern(OPENER, r"[\[{(]+")?;
    g.add_pattern(CLOSER, r"[\]})]+")?;
    g.add_pattern(Kind::NUMERIC, NUM_HEX)?;
    g.add_pattern(Kind::NUMERIC, NUM_REAL)?;
    g.add_pattern(SSTRING, SINGLE_STR_SL)?;
    g.add_pattern(DSTRING, DOUBLE_STR_SL)?;
    g.add_pattern(Kind::COMMENT, C_COMMENT_ML)?;
    g.add_pattern(COMMENT_SL, C_COMMENT_SL)?;
    g.add_pattern(SLASH, "/")?;
    Ok(g)
}

/// JavaScript scanner, optionally embedded in HTML and/or a server language.
#[derive(Debug)]
pub struct JavaScriptScanner {
    scanner: Scanner,
    opts: EmbedOptions,
    exit: ExitState,
    regex: Pattern,
    script_close: Pattern,
}

impl JavaScriptScanner {
    pub fn new(opts: EmbedOptions) -> Result<Self, ScanError> {
        Self::with_grammar(builder(&opts)?.build(), opts)
    }

    /// Run the JavaScript main loop over a derived grammar. `grammar` must
    /// come from [`builder`] with the same `opts`.
    pub fn with_grammar(grammar: Arc<Grammar>, opts: EmbedOptions) -> Result<Self, ScanError> {
        Ok(JavaScriptScanner {
            scanner: Scanner::new(grammar),
            opts,
            exit: ExitState::new(),
            regex: Pattern::new(REGEX_LITERAL)?,
            script_close: Pattern::new(SCRIPT_CLOSE)?,
        })
    }

    pub fn options(&self) -> &EmbedOptions {
        &self.opts
    }

    pub fn exit_state(&self) -> &ExitState {
        &self.exit
    }
}

impl Scan for JavaScriptScanner {
    fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    fn scanner_mut(&mut self) -> &mut Scanner {
        &mut self.scanner
    }

    fn set_source(&mut self, buf: SourceBuffer) {
        self.scanner.set_source(buf);
        self.exit.clear();
    }

    fn interrupted(&self) -> bool {
        self.exit.interrupted()
    }

    #[tracing::instrument(level = "debug", skip_all, fields(language = self.scanner.language()))]
    fn main(&mut self) -> Result<(), ScanError> {
        let s = &mut self.scanner;
        self.exit.set_interrupted(false);
        while !s.eos() {
            let from = s.pos();
            let depth = s.depth();
            let (kind, data) = if let Some((kind, data)) = self.exit.resume(s)? {
                // nothing left of the interrupted token
                if data.is_empty() {
                    continue;
                }
                (kind, data)
            } else if let Some(next) = s.next_match() {
                s.record_range(from, next.data.start(), None)?;
                s.accept(&next.data);
                (next.kind, next.data)
            } else {
                s.record_rest(None);
                self.exit.clear();
                break;
            };

            let (kind, data) = match kind {
                SLASH => match classify_slash(s.tokens().as_slice(), REGEX_WORDS) {
                    SlashKind::Regex => {
                        s.unscan();
                        match s.scan(&self.regex) {
                            Some(m) => (Kind::REGEX, m),
                            None => {
                                s.accept(&data);
                                (Kind::OPERATOR, data)
                            }
                        }
                    }
                    SlashKind::Division => (Kind::OPERATOR, data),
                },
                STOP_SERVER => {
                    self.exit.set_interrupted(true);
                    s.unscan();
                    break;
                }
                STOP_SCRIPT => {
                    s.unscan();
                    break;
                }
                _ => (kind, data),
            };

            if self.exit.server_break(s, &self.opts, kind, &data)? {
                break;
            }
            if self
                .exit
                .script_break(s, &self.opts, &self.script_close, kind, &data)
            {
                break;
            }
            if !data.is_empty() {
                s.record_match(Some(kind), &data);
            }
            s.ensure_progress(from, depth)?;
        }
        Ok(())
    }
}

impl Language for JavaScriptScanner {
    const CODES: &'static [&'static str] = &["js", "javascript"];
    const DESCRIPTION: &'static str = "JavaScript";

    fn create(_: &ScannerRegistry) -> Result<Self, ScanError> {
        Self::new(EmbedOptions::default())
    }
}
