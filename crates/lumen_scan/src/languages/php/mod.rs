//! PHP.
//!
//! [`PhpScanner`] is a controller alternating between two children that
//! share its buffer: [`PhpCodeScanner`] for code between `<?php` and `?>`,
//! and an [`HtmlScanner`] embedded as a server language for everything
//! else. The HTML child stops at every `<?` and picks up where it left off
//! (even mid-attribute) when control comes back.

use std::sync::Arc;

use lumen_scan_core::markup::{escape_token, tag_matches};
use lumen_scan_core::{Kind, MatchData, Pattern, Token};

use super::html::HtmlScanner;
use super::guess_matches;
use crate::presets::{C_COMMENT_ML, DOUBLE_STR, NUM_HEX, NUM_REAL, SINGLE_STR};
use crate::{
    delegate, Children, EmbedFlags, EmbedOptions, Grammar, GrammarBuilder, Language, Scan, ScanError, Scanner,
    ScannerRegistry, SourceBuffer, SourceInfo,
};

const KEYWORDS: &[&str] = &[
    "__CLASS__", "__DIR__", "__FILE__", "__FUNCTION__", "__LINE__", "__METHOD__", "__NAMESPACE__",
    "__TRAIT__", "abstract", "and", "array", "as", "break", "callable", "case", "catch", "class",
    "clone", "const", "continue", "declare", "default", "die", "do", "echo", "else", "elseif",
    "empty", "enddeclare", "endfor", "endforeach", "endif", "endswitch", "endwhile", "enum",
    "eval", "exit", "extends", "false", "final", "finally", "fn", "for", "foreach", "function",
    "global", "goto", "if", "implements", "include", "include_once", "instanceof", "insteadof",
    "interface", "isset", "list", "match", "namespace", "new", "null", "or", "parent", "print",
    "private", "protected", "public", "readonly", "require", "require_once", "return", "self",
    "static", "switch", "throw", "trait", "true", "try", "unset", "use", "var", "while", "xor",
    "yield",
];

/// Commonly used builtins.
const FUNCTIONS: &[&str] = &[
    "array_filter", "array_key_exists", "array_keys", "array_map", "array_merge", "array_pop",
    "array_push", "array_reduce", "array_search", "array_shift", "array_slice", "array_splice",
    "array_unique", "array_values", "count", "date", "define", "defined", "explode", "fclose",
    "feof", "fgets", "file", "file_exists", "file_get_contents", "file_put_contents", "fopen",
    "fread", "function_exists", "fwrite", "header", "htmlentities", "htmlspecialchars",
    "implode", "in_array", "intval", "is_array", "is_bool", "is_callable", "is_float", "is_int",
    "is_null", "is_numeric", "is_object", "is_string", "json_decode", "json_encode", "ksort",
    "method_exists", "mktime", "preg_match", "preg_match_all", "preg_quote", "preg_replace",
    "preg_replace_callback", "preg_split", "print_r", "printf", "rtrim", "serialize",
    "session_start", "sort", "sprintf", "str_pad", "str_repeat", "str_replace", "strlen",
    "strpos", "strrpos", "strtolower", "strtoupper", "substr", "time", "trim", "ucfirst",
    "unserialize", "urlencode", "usort", "var_dump", "var_export",
];

const TERM: Kind = Kind::new("TERM");
pub const NOWDOC: Kind = Kind::new("NOWDOC");

/// `$var`, `${var}` and `{$var}` inside interpolating strings.
const INTERPOLATED_VAR: &str = r"(?:\$\{|\{\$)[^}]+\}|\$\$?[a-zA-Z_]\w*";

/// Mark interpolated variables in double-quoted strings and heredocs.
fn interpolate(pattern: &Pattern, token: Token) -> Token {
    let interpolating = token.is(Kind::HEREDOC) || token.text.starts_with('"');
    if !interpolating || !token.text.contains('$') {
        return token;
    }
    let mut token = escape_token(token);
    token.text = tag_matches(pattern, &token.text, Kind::VARIABLE);
    token
}

/// The grammar for code between `<?php` and `?>`.
pub fn grammar() -> Result<GrammarBuilder, ScanError> {
    let mut g = GrammarBuilder::new("php")?;
    g.set_case_sensitive(false);
    g.add_identifier_mapping(Kind::FUNCTION, FUNCTIONS);
    g.add_identifier_mapping(Kind::KEYWORD, KEYWORDS);

    let var = Arc::new(Pattern::new(INTERPOLATED_VAR)?);
    let in_string = Arc::clone(&var);
    g.add_filter(Some("interpolation"), Kind::STRING, move |t, _| interpolate(&in_string, t));
    g.add_filter(Some("heredoc-interpolation"), Kind::HEREDOC, move |t, _| interpolate(&var, t));
    // a nowdoc displays as a heredoc but never interpolates
    g.add_filter(Some("nowdoc"), NOWDOC, |mut t, _| {
        t.kind = Some(Kind::HEREDOC);
        t
    });

    g.add_pattern(TERM, r"\?>")?;
    // cut before `?>` in the main loop
    g.add_pattern(Kind::COMMENT, r"(?://|#).*")?;
    g.add_pattern(Kind::COMMENT, C_COMMENT_ML)?;
    g.add_pattern(Kind::NUMERIC, NUM_HEX)?;
    g.add_pattern(Kind::NUMERIC, NUM_REAL)?;
    g.add_pattern(Kind::DELIMITER, r"<\?(?:php)?")?;
    // `?` loses the tie against TERM at `?>`
    g.add_pattern(Kind::OPERATOR, r"[!%^&*\-=+~:<>/|.;,]+|\?")?;
    g.add_pattern(Kind::VARIABLE, r"\$\$?[a-zA-Z_]\w*")?;
    g.add_pattern(Kind::IDENT, r"[a-zA-Z_]\w*")?;
    g.add_pattern(Kind::STRING, DOUBLE_STR)?;
    g.add_pattern(Kind::STRING, SINGLE_STR)?;
    g.add_pattern(Kind::FUNCTION, r"(?s)`(?:[^`\\]|\\.)*(?:`|\z)")?;
    Ok(g)
}

#[derive(Debug)]
struct CodePatterns {
    user_def: Pattern,
    heredoc_head: Pattern,
    line_rest: Pattern,
    word: Pattern,
}

/// PHP code up to the next `?>`, which it leaves for the controller.
#[derive(Debug)]
pub struct PhpCodeScanner {
    scanner: Scanner,
    patterns: CodePatterns,
}

impl PhpCodeScanner {
    pub fn new() -> Result<Self, ScanError> {
        Self::with_grammar(grammar()?.build())
    }

    /// The PHP code loop over a derived grammar built from [`grammar`].
    pub fn with_grammar(grammar: Arc<Grammar>) -> Result<Self, ScanError> {
        Ok(PhpCodeScanner {
            scanner: Scanner::new(grammar),
            patterns: CodePatterns {
                user_def: Pattern::new(r"(\s+)([a-zA-Z_]\w*)")?,
                heredoc_head: Pattern::new(r#"(['"]?)(\w*)"#)?,
                line_rest: Pattern::new(r".+")?,
                word: Pattern::new(r"\w+")?,
            },
        })
    }

    /// `class Name`, `function name`, ...: record the name and remember it.
    fn ident(&mut self, data: &MatchData) {
        let s = &mut self.scanner;
        let word = s.match_str(data).to_owned();
        s.record(Some(Kind::IDENT), word.as_str());
        let def_kind = match word.as_str() {
            "function" => Kind::FUNCTION,
            "class" | "extends" | "implements" => Kind::TYPE,
            _ => return,
        };
        if let Some(m) = s.scan(&self.patterns.user_def) {
            let text = s.text();
            let (space, name) = (m.group_str(text, 1).to_owned(), m.group_str(text, 2).to_owned());
            s.record(None, space);
            s.record(Some(Kind::USER_FUNCTION), name.as_str());
            s.add_user_def(name, def_kind);
        }
    }

    /// Body of `<<<ID`, `<<<"ID"` or `<<<'ID'` after the operator.
    fn heredoc(&mut self) -> Result<(), ScanError> {
        let s = &mut self.scanner;
        let Some(head) = s.scan(&self.patterns.heredoc_head) else {
            return Ok(());
        };
        let text = s.text();
        let quote = head.group_str(text, 1).to_owned();
        let delimiter = head.group_str(text, 2).to_owned();
        let nowdoc = quote == "'";
        if !quote.is_empty() {
            s.record(None, quote.as_str());
        }
        if !delimiter.is_empty() {
            s.record(Some(Kind::KEYWORD), delimiter.as_str());
        }
        if !quote.is_empty() && s.peek_n(1) == quote {
            let closing = s.get(1);
            s.record(None, closing);
        }
        if let Some(m) = s.scan(&self.patterns.line_rest) {
            s.record_match(None, &m);
        }
        if delimiter.is_empty() {
            return Ok(());
        }
        let end = Pattern::new(&format!(r"(?m)^{}|\z", regex::escape(&delimiter)))?;
        if let Some(body) = s.scan_until(&end) {
            s.record_match(Some(if nowdoc { NOWDOC } else { Kind::HEREDOC }), &body);
            if let Some(m) = s.scan(&self.patterns.word) {
                s.record_match(Some(Kind::KEYWORD), &m);
            }
        }
        Ok(())
    }
}

impl Scan for PhpCodeScanner {
    fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    fn scanner_mut(&mut self) -> &mut Scanner {
        &mut self.scanner
    }

    #[tracing::instrument(level = "debug", skip_all, fields(language = self.scanner.language()))]
    fn main(&mut self) -> Result<(), ScanError> {
        while !self.scanner.eos() {
            let s = &mut self.scanner;
            let from = s.pos();
            let depth = s.depth();
            let Some(next) = s.next_match() else {
                s.record_rest(None);
                break;
            };
            s.record_range(from, next.data.start(), None)?;
            s.accept(&next.data);
            let text = s.match_str(&next.data);
            let heredoc = text.contains("<<<");
            let comment_cut = if text.starts_with("/*") { None } else { text.find("?>") };
            match (next.kind, comment_cut) {
                (TERM, _) => {
                    s.unscan();
                    break;
                }
                (Kind::IDENT, _) => self.ident(&next.data),
                (Kind::OPERATOR, _) if heredoc => {
                    s.record_match(Some(Kind::OPERATOR), &next.data);
                    self.heredoc()?;
                }
                (Kind::COMMENT, Some(cut)) => {
                    let start = next.data.start();
                    s.record_range(start, start + cut, Some(Kind::COMMENT))?;
                    s.set_pos(start + cut);
                }
                (kind, _) => s.record_match(Some(kind), &next.data),
            }
            self.scanner.ensure_progress(from, depth)?;
        }
        Ok(())
    }
}

/// PHP embedded in HTML.
#[derive(Debug)]
pub struct PhpScanner {
    scanner: Scanner,
    children: Children,
    open: Pattern,
    close: Pattern,
    snippet: bool,
}

impl PhpScanner {
    pub fn new() -> Result<Self, ScanError> {
        Self::build(false)
    }

    /// A scanner that starts in PHP code, without an opening `<?php`.
    pub fn snippet() -> Result<Self, ScanError> {
        Self::build(true)
    }

    fn build(snippet: bool) -> Result<Self, ScanError> {
        let mut children = Children::new();
        children.add("html", Box::new(HtmlScanner::new(EmbedOptions::new(EmbedFlags::SERVER))?));
        children.add("php", Box::new(PhpCodeScanner::new()?));
        Ok(PhpScanner {
            scanner: Scanner::new(GrammarBuilder::bare("php").build()),
            children,
            open: Pattern::new(r"<\?(?:php|=)?")?,
            close: Pattern::new(r"\?>")?,
            snippet,
        })
    }

    /// One PHP block. `<?=` blocks are wrapped as `INTERPOLATION`.
    fn code_block(&mut self, open: Option<String>) -> Result<(), ScanError> {
        let wrap = (open.as_deref() == Some("<?=")).then_some(Kind::INTERPOLATION);
        if let Some(open) = open {
            self.scanner.record(Some(Kind::DELIMITER), open);
        }
        delegate(&mut self.scanner, &mut self.children, "php", wrap)?;
        if let Some(m) = self.scanner.scan(&self.close) {
            self.scanner.record_match(Some(Kind::DELIMITER), &m);
        }
        Ok(())
    }
}

impl Scan for PhpScanner {
    fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    fn scanner_mut(&mut self) -> &mut Scanner {
        &mut self.scanner
    }

    fn set_source(&mut self, buf: SourceBuffer) {
        self.children.set_source(&buf);
        self.scanner.set_source(buf);
    }

    #[tracing::instrument(level = "debug", skip_all, fields(language = self.scanner.language()))]
    fn main(&mut self) -> Result<(), ScanError> {
        let mut in_code = self.snippet && self.scanner.pos() == 0;
        while !self.scanner.eos() {
            let from = self.scanner.pos();
            let depth = self.scanner.depth();
            if in_code {
                in_code = false;
                self.code_block(None)?;
            } else if let Some(m) = self.scanner.scan(&self.open) {
                let open = self.scanner.match_str(&m).to_owned();
                self.code_block(Some(open))?;
            } else {
                delegate(&mut self.scanner, &mut self.children, "html", None)?;
            }
            self.scanner.ensure_progress(from, depth)?;
        }
        Ok(())
    }
}

fn guess_php(src: &str) -> f64 {
    let mut p = 0.0;
    if src.contains("<?php") {
        p += 0.5;
    } else if src.match_indices("<?").any(|(at, _)| !src[at + 2..].starts_with("xml")) {
        p += 0.2;
    }
    if guess_matches!(r"\$this\b|(?i:self|parent)::", src) {
        p += 0.15;
    }
    if guess_matches!(r"(?i)\$[a-z_]\w*->[a-z_]", src) {
        p += 0.05;
    }
    if guess_matches!(r"(?i)\b(?:echo|require(?:_once)?|include(?:_once)?|preg_\w)", src) {
        p += 0.05;
    }
    p
}

impl Language for PhpScanner {
    const CODES: &'static [&'static str] = &["php"];
    const DESCRIPTION: &'static str = "PHP";

    fn create(_: &ScannerRegistry) -> Result<Self, ScanError> {
        Self::new()
    }

    fn guess(src: &str, _: &SourceInfo<'_>) -> f64 {
        guess_php(src)
    }
}

/// PHP that starts in code: no opening `<?php` needed.
#[derive(Debug)]
pub struct PhpSnippetScanner {
    inner: PhpScanner,
}

impl Scan for PhpSnippetScanner {
    fn scanner(&self) -> &Scanner {
        self.inner.scanner()
    }

    fn scanner_mut(&mut self) -> &mut Scanner {
        self.inner.scanner_mut()
    }

    fn set_source(&mut self, buf: SourceBuffer) {
        self.inner.set_source(buf);
    }

    fn main(&mut self) -> Result<(), ScanError> {
        self.inner.main()
    }
}

impl Language for PhpSnippetScanner {
    const CODES: &'static [&'static str] = &["php_snippet"];
    const DESCRIPTION: &'static str = "PHP Snippet";

    fn create(_: &ScannerRegistry) -> Result<Self, ScanError> {
        Ok(PhpSnippetScanner {
            inner: PhpScanner::snippet()?,
        })
    }

    /// Just ahead of [`PhpScanner`] when the source has no opening tag, or
    /// closes one before opening one; just behind otherwise.
    fn guess(src: &str, _: &SourceInfo<'_>) -> f64 {
        let p = guess_php(src);
        if p <= 0.0 {
            return p;
        }
        match (src.find("<?"), src.find("?>")) {
            (None, _) => p + 0.01,
            (Some(open), Some(close)) if close < open => p + 0.01,
            _ => p - 0.01,
        }
    }
}
