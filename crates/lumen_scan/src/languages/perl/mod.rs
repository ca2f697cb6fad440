//! Perl.
//!
//! Perl cannot be tokenized exactly without running it, so this settles for
//! probably right. The pattern table finds the next construct; quote-like
//! operators (`q qq qw qr qx m s tr y`), slashes, heredocs, POD blocks and
//! `__END__`/`__DATA__` are handled by the main loop because their extent
//! depends on what came before.

use lumen_scan_core::markup::{escape, tag_matches};
use lumen_scan_core::{Kind, MatchData, Pattern};

use super::{guess_matches, Heuristic};
use crate::presets::{DOUBLE_STR, NUM_HEX, NUM_REAL, SINGLE_STR};
use crate::{
    classify_slash, GrammarBuilder, Language, Region, Scan, ScanError, Scanner, ScannerRegistry,
    SlashKind, SourceBuffer, SourceInfo, OPENER,
};

/// Shell command in backticks.
pub const CMD: Kind = Kind::new("CMD");

const POD: Kind = Kind::new("POD");
const TERM: Kind = Kind::new("TERM");
const HEREDOC_DECL: Kind = Kind::new("HEREDOC_DECL");
const SLASH: Kind = Kind::new("SLASH");
const QUOTE_LIKE: Kind = Kind::new("QUOTE_LIKE");
/// Region for the body of a quote-like operator or regex.
const QUOTED: Kind = Kind::new("QUOTED");

/// `IDENT`s after which a `/` starts a regex.
const REGEX_WORDS: &[&str] = &[
    "lt", "gt", "le", "ge", "eq", "ne", "cmp", "and", "or", "xor", "if", "elsif", "while", "unless",
    "split", "print",
];

const KEYWORDS: &[&str] = &[
    "bless", "caller", "continue", "dbmclose", "dbmopen", "defined", "delete", "die", "do", "dump",
    "else", "elsif", "eval", "exit", "for", "foreach", "goto", "import", "if", "last", "local",
    "my", "next", "no", "our", "package", "prototype", "redo", "ref", "reset", "return",
    "require", "scalar", "sub", "tie", "tied", "undef", "untie", "unless", "use", "wantarray",
    "while",
];

const WORD_OPERATORS: &[&str] = &["lt", "gt", "le", "ge", "eq", "ne", "cmp", "and", "or", "xor"];

const FUNCTIONS: &[&str] = &[
    "chomp", "chop", "chr", "crypt", "hex", "index", "lc", "lcfirst", "length", "oct", "ord",
    "pack", "reverse", "rindex", "sprintf", "substr", "uc", "ucfirst", "pos", "quotemeta",
    "split", "study", "abs", "atan2", "cos", "exp", "int", "log", "rand", "sin", "sqrt", "srand",
    "pop", "push", "shift", "splice", "unshift", "grep", "join", "map", "sort", "unpack",
    "delete", "each", "exists", "keys", "values", "binmode", "close", "closedir", "die", "eof",
    "fileno", "flock", "format", "getc", "print", "printf", "read", "readdir", "readline",
    "rewinddir", "seek", "seekdir", "select", "syscall", "sysread", "sysseek", "syswrite", "tell",
    "telldir", "truncate", "warn", "write", "vec", "chdir", "chmod", "chown", "chroot", "fcntl",
    "glob", "ioctl", "link", "lstat", "mkdir", "open", "opendir", "readlink", "rename", "rmdir",
    "stat", "symlink", "sysopen", "umask", "unlink", "utime", "alarm", "exec", "fork", "getpgrp",
    "getppid", "getpriority", "kill", "pipe", "readpipe", "setpgrp", "setpriority", "sleep",
    "system", "times", "wait", "waitpid", "accept", "bind", "connect", "getpeername",
    "getsockname", "getsockopt", "listen", "recv", "send", "setsockopt", "shutdown", "socket",
    "socketpair", "msgctl", "msgget", "msgrcv", "msgsnd", "semctl", "semget", "semop", "shmctl",
    "shmget", "shmread", "shmwrite", "endgrent", "endhostent", "endnetent", "endpwent",
    "getgrent", "getgrgid", "getgrnam", "getlogin", "getpwent", "getpwnam", "getpwuid",
    "setgrent", "setpwent", "endprotoent", "endservent", "gethostbyaddr", "gethostbyname",
    "gethostent", "getnetbyaddr", "getnetbyname", "getnetent", "getprotobyname",
    "getprotobynumber", "getprotoent", "getservbyname", "getservbyport", "getservent",
    "sethostent", "setnetent", "setprotoent", "setservent", "gmtime", "localtime", "time",
];

/// The Perl grammar.
pub fn grammar() -> Result<GrammarBuilder, ScanError> {
    let mut g = GrammarBuilder::new("perl")?;
    // regex markup gets confused by arbitrary delimiters
    g.remove_filter("pcre");
    g.map_rule(CMD, Some(Kind::FUNCTION));
    g.map_rule(OPENER, None);
    g.add_identifier_mapping(Kind::KEYWORD, KEYWORDS);
    g.add_identifier_mapping(Kind::OPERATOR, WORD_OPERATORS);
    g.add_identifier_mapping(Kind::FUNCTION, FUNCTIONS);

    g.add_pattern(Kind::COMMENT, r"#.*")?;
    g.add_pattern(POD, r"(?m)^=[a-zA-Z_]")?;
    g.add_pattern(Kind::VARIABLE, r"(?i)[$%@][a-z_]\w*")?;
    g.add_pattern(Kind::VARIABLE, r##"\$[|%=\-~^\d&`'+_./\\,"#$?*O\[\];!@]"##)?;
    g.add_pattern(CMD, r"(?s)`(?:[^`\\]|\\.)*(?:`|\z)")?;
    g.add_pattern(Kind::STRING, DOUBLE_STR)?;
    g.add_pattern(Kind::STRING, SINGLE_STR)?;
    g.add_pattern(TERM, r"__(?:DATA|END)__")?;
    g.add_pattern(HEREDOC_DECL, r#"(<<)(['"`\\]?)([a-zA-Z_]\w*)(['"`]?)"#)?;
    g.add_pattern(Kind::OPERATOR, r"[!%^&*\-=+;:|,.?<>~\\]+")?;
    g.add_pattern(SLASH, r"//?")?;
    g.add_pattern(OPENER, r"[\[{(]+")?;
    g.add_pattern(Kind::NUMERIC, NUM_HEX)?;
    g.add_pattern(Kind::NUMERIC, NUM_REAL)?;
    g.add_pattern(QUOTE_LIKE, r"(q[rqxw]?|m|s|tr|y)(\s*)(\\?[^a-zA-Z0-9\s])")?;
    g.add_pattern(Kind::IDENT, r"[a-zA-Z_]\w*")?;
    Ok(g)
}

/// How the body of a delimited construct is recorded.
#[derive(Clone, Copy, Debug)]
enum Body {
    As(Kind),
    /// `qw`: whitespace-separated words, each a `STRING`.
    Words,
}

fn closing(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        '<' => '>',
        c => c,
    }
}

/// Open a quoted region at the cursor, just past its opening delimiter.
/// The region remembers the delimiter, whether variables interpolate and
/// the kind its body displays as.
fn open_quoted(s: &mut Scanner, open: char, body: Body, interpolate: bool) {
    let display = match body {
        Body::As(kind) => kind,
        Body::Words => Kind::STRING,
    };
    let region = Region::new(QUOTED, s.pos())
        .with_open(open.to_string())
        .with_interpolation(interpolate)
        .with_extra(display);
    s.push_state(region);
}

/// Consume the body of the innermost quoted region and its closing
/// delimiter, recorded as `DELIMITER`.
///
/// Bracket delimiters nest; a backslash escapes any char. Without a closing
/// delimiter the region stays open and `false` is returned: the body runs to
/// EOS when the regions are unwound.
fn consume_delimited(s: &mut Scanner, body: Body, variable: &Pattern) -> Result<bool, ScanError> {
    let Some(region) = s.state() else {
        return Ok(false);
    };
    let Some(open) = region.open.chars().next() else {
        return Ok(false);
    };
    let interpolate = region.interpolation;
    let close = closing(open);
    let nests = close != open;
    let start = s.pos();
    let end = {
        let mut depth = 1usize;
        let mut escaped = false;
        let mut end = None;
        for (i, c) in s.rest().char_indices() {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    end = Some(start + i);
                    break;
                }
            } else if nests && c == open {
                depth += 1;
            }
        }
        end
    };
    let Some(at) = end else {
        return Ok(false);
    };
    let text = s.slice(start..at).to_owned();
    match body {
        Body::Words => record_words(s, &text),
        Body::As(kind) if interpolate && variable.is_match(&text) => {
            let marked = tag_matches(variable, &escape(&text), Kind::VARIABLE);
            s.record_escaped(Some(kind), marked);
        }
        Body::As(kind) => s.record(Some(kind), text),
    }
    s.set_pos(at + close.len_utf8());
    s.record(Some(Kind::DELIMITER), close.to_string());
    s.pop_state()?;
    Ok(true)
}

fn record_words(s: &mut Scanner, mut text: &str) {
    while !text.is_empty() {
        let space = text.find(|c: char| !c.is_whitespace()).unwrap_or(text.len());
        if space > 0 {
            s.record(None, &text[..space]);
            text = &text[space..];
            continue;
        }
        let word = text.find(char::is_whitespace).unwrap_or(text.len());
        s.record(Some(Kind::STRING), &text[..word]);
        text = &text[word..];
    }
}

#[derive(Debug)]
struct Patterns {
    newline: Pattern,
    variable: Pattern,
    regex_flags: Pattern,
    quote_flags: Pattern,
    second_delimiter: Pattern,
    pod_line: Pattern,
    pod_end: Pattern,
}

/// Perl scanner.
#[derive(Debug)]
pub struct PerlScanner {
    scanner: Scanner,
    patterns: Patterns,
    /// Terminator of a declared heredoc whose body starts on the next line.
    heredoc: Option<String>,
}

impl PerlScanner {
    pub fn new() -> Result<Self, ScanError> {
        Ok(PerlScanner {
            scanner: Scanner::new(grammar()?.build()),
            patterns: Patterns {
                newline: Pattern::new(r"\n")?,
                variable: Pattern::new(r"[$@][a-zA-Z_]\w*")?,
                regex_flags: Pattern::new(r"[cgimosx]+")?,
                quote_flags: Pattern::new(r"[cgimosxpe]+")?,
                second_delimiter: Pattern::new(r"[^a-zA-Z0-9]")?,
                pod_line: Pattern::new(r"(?m)^=.*")?,
                pod_end: Pattern::new(r"(?m)^=cut$|\z")?,
            },
            heredoc: None,
        })
    }

    /// `/`: a regex unless it follows an operand; `//` is always an operator.
    fn slash(&mut self, data: &MatchData) -> Result<(), ScanError> {
        let s = &mut self.scanner;
        let division = data.len() == 2
            || classify_slash(s.tokens().as_slice(), REGEX_WORDS) == SlashKind::Division;
        s.accept(data);
        if division {
            s.record_match(Some(Kind::OPERATOR), data);
            return Ok(());
        }
        s.record_match(Some(Kind::DELIMITER), data);
        open_quoted(s, '/', Body::As(Kind::REGEX), true);
        if !consume_delimited(s, Body::As(Kind::REGEX), &self.patterns.variable)? {
            return Ok(());
        }
        if let Some(m) = s.scan(&self.patterns.regex_flags) {
            s.record_match(Some(Kind::KEYWORD), &m);
        }
        Ok(())
    }

    /// `q(...)`, `qw/.../`, `m{...}`, `s/a/b/g`, `tr[a-z][A-Z]`, ...
    fn quote_like(&mut self, data: &MatchData) -> Result<(), ScanError> {
        let s = &mut self.scanner;
        let variable = &self.patterns.variable;
        s.accept(data);
        s.record_match(Some(Kind::DELIMITER), data);
        let text = s.text();
        let op = data.group_str(text, 1).to_owned();
        let Some(open) = data.group_str(text, 3).chars().last() else {
            return Ok(());
        };
        let (body, regex, interpolate) = match op.as_str() {
            "m" | "qr" | "s" => (Body::As(Kind::REGEX), true, true),
            "tr" | "y" => (Body::As(Kind::REGEX), true, false),
            "qw" => (Body::Words, false, false),
            "q" => (Body::As(Kind::STRING), false, false),
            _ => (Body::As(Kind::STRING), false, true),
        };
        open_quoted(s, open, body, interpolate);
        if !consume_delimited(s, body, variable)? {
            return Ok(());
        }
        if matches!(op.as_str(), "s" | "tr" | "y") {
            s.skip_whitespace();
            let replacement = Body::As(Kind::STRING);
            if closing(open) == open {
                // the shared middle delimiter was consumed with the pattern
                open_quoted(s, open, replacement, interpolate);
            } else if let Some(m) = s.scan(&self.patterns.second_delimiter) {
                s.record_match(Some(Kind::DELIMITER), &m);
                let second = s.match_str(&m).chars().next().unwrap_or(open);
                open_quoted(s, second, replacement, interpolate);
            } else {
                return Ok(());
            }
            if !consume_delimited(s, replacement, variable)? {
                return Ok(());
            }
        }
        if regex {
            if let Some(m) = s.scan(&self.patterns.quote_flags) {
                s.record_match(Some(Kind::KEYWORD), &m);
            }
        }
        Ok(())
    }

    /// `<<EOF`, `<<"EOF"`, `<<'EOF'`, `<<\EOF`. The body starts after the
    /// next newline.
    fn heredoc_declaration(&mut self, data: &MatchData) {
        let s = &mut self.scanner;
        let text = s.text();
        let op = data.group_str(text, 1).to_owned();
        let open = data.group_str(text, 2).to_owned();
        let name = data.group_str(text, 3).to_owned();
        let close = data.group_str(text, 4);
        let close = if !open.is_empty() && close == open { close.to_owned() } else { String::new() };
        s.record(Some(Kind::OPERATOR), op.as_str());
        if close.is_empty() && !open.is_empty() && open != "\\" {
            // an unmatched quote: just the operator
            s.pos_shift(op.len());
            return;
        }
        let declared = format!("{open}{name}{close}");
        s.pos_shift(op.len() + declared.len());
        s.record(Some(Kind::DELIMITER), declared);
        self.heredoc = Some(name);
    }

    /// Heredoc body from the newline after its declaration.
    fn heredoc_body(&mut self, name: &str) -> Result<(), ScanError> {
        let s = &mut self.scanner;
        let nl = s.get(1);
        s.record(None, nl);
        let end = Pattern::new(&format!(r"(?m)^{}\b", regex::escape(name)))?;
        match s.scan_until(&end) {
            Some(body) => {
                if !body.is_empty() {
                    s.record_match(Some(Kind::HEREDOC), &body);
                }
                if let Some(m) = s.scan(&end) {
                    s.record_match(Some(Kind::DELIMITER), &m);
                }
            }
            None => s.record_rest(Some(Kind::HEREDOC)),
        }
        Ok(())
    }

    /// A POD block up to and including `=cut`.
    fn pod(&mut self) {
        let s = &mut self.scanner;
        let start = s.pos();
        s.scan(&self.patterns.pod_line);
        s.scan_until(&self.patterns.pod_end);
        s.scan(&self.patterns.pod_end);
        let end = s.pos();
        let text = s.slice(start..end).to_owned();
        s.record(Some(Kind::DOCCOMMENT), text);
    }
}

impl Scan for PerlScanner {
    fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    fn scanner_mut(&mut self) -> &mut Scanner {
        &mut self.scanner
    }

    fn set_source(&mut self, buf: SourceBuffer) {
        self.scanner.set_source(buf);
        self.heredoc = None;
    }

    #[tracing::instrument(level = "debug", skip_all, fields(language = self.scanner.language()))]
    fn main(&mut self) -> Result<(), ScanError> {
        while !self.scanner.eos() {
            let from = self.scanner.pos();
            let depth = self.scanner.depth();
            let next = self.scanner.next_match();

            if let Some(name) = self.heredoc.take() {
                match self.scanner.search(&self.patterns.newline) {
                    Some(nl) if next.as_ref().map_or(true, |n| nl.start() < n.data.start()) => {
                        self.scanner.record_range(from, nl.start(), None)?;
                        self.scanner.set_pos(nl.start());
                        self.heredoc_body(&name)?;
                        continue;
                    }
                    _ => self.heredoc = Some(name),
                }
            }

            let Some(next) = next else {
                self.scanner.record_rest(None);
                break;
            };
            let start = next.data.start();
            self.scanner.record_range(from, start, None)?;
            self.scanner.set_pos(start);
            match next.kind {
                SLASH => self.slash(&next.data)?,
                QUOTE_LIKE => self.quote_like(&next.data)?,
                HEREDOC_DECL => self.heredoc_declaration(&next.data),
                POD => self.pod(),
                TERM => {
                    let s = &mut self.scanner;
                    s.accept(&next.data);
                    s.record_match(Some(Kind::DELIMITER), &next.data);
                    s.record_rest(None);
                }
                kind => {
                    self.scanner.accept(&next.data);
                    self.scanner.record_match(Some(kind), &next.data);
                }
            }
            if self.scanner.depth() > 0 {
                // an unterminated quoted body runs to EOS
                break;
            }
            self.scanner.ensure_progress(start, depth)?;
        }
        self.scanner.unwind_states()
    }
}

impl Language for PerlScanner {
    const CODES: &'static [&'static str] = &["perl", "pl", "pm"];
    const DESCRIPTION: &'static str = "Perl";

    fn create(_: &ScannerRegistry) -> Result<Self, ScanError> {
        Self::new()
    }

    fn guess(src: &str, _: &SourceInfo<'_>) -> f64 {
        static WEIGHTS: [(Heuristic, f64); 6] = [
            (Heuristic::new(r"\$[a-zA-Z_]+"), 0.02),
            (Heuristic::new(r"@[a-zA-Z_]+"), 0.02),
            (Heuristic::new(r"%[a-zA-Z_]+"), 0.02),
            (Heuristic::new(r"\bsub\s+\w+\s*\{"), 0.1),
            (Heuristic::new(r"\bmy\s+[$@%]"), 0.05),
            (Heuristic::new(r"\$[a-zA-Z_]\w*\s+=~\s+s\W"), 0.15),
        ];
        if guess_matches!(r"\A#!.*\bperl\b", src) {
            return 1.0;
        }
        let mut p = 0.0;
        for (heuristic, score) in &WEIGHTS {
            if heuristic.is_match(src) {
                p += score;
            }
        }
        p
    }
}

#[cfg(test)]
mod tests;
