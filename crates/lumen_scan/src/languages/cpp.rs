//! C and C++.
//!
//! A pattern-table grammar plus one override: preprocessor directives. A
//! directive runs to the end of its line (continued by a trailing backslash
//! or a multi-line comment) and is recorded as one `PREPROCESSOR` token; the
//! `preprocessor` filter later marks the strings, `<header>` names and
//! comments inside it. `#if 0` blocks nest and are recorded as comments.

use std::sync::OnceLock;

use lumen_scan_core::markup::{escape_token, tag_block};
use lumen_scan_core::{Kind, MatchData, Pattern, Token};

use super::{guess_matches, simple_language};
use crate::filters::FilterContext;
use crate::presets::{C_COMMENT_ML, C_COMMENT_SL, NUM_HEX, NUM_REAL};
use crate::{GrammarBuilder, Language, ScanError, Scanner, ScannerRegistry, SourceInfo};

const KEYWORDS: &[&str] = &[
    "asm", "auto", "break", "case", "catch", "class", "continue", "const", "const_cast", "connect",
    "default", "delete", "do", "dynamic_cast", "else", "explicit", "extern", "for", "for_each",
    "friend", "goto", "if", "inline", "mutable", "namespace", "new", "operator", "private",
    "protected", "public", "register", "reinterpret_cast", "return", "static", "static_cast",
    "switch", "sizeof", "signed", "template", "this", "throw", "try", "typedef", "typeid",
    "typename", "using", "unsigned", "while", "NULL", "SIGNAL", "SLOT", "TRUE", "FALSE", "true",
    "false",
];

const TYPES: &[&str] = &[
    "bool", "char", "clock_t", "double", "div_t", "enum", "float", "fpos_t", "int", "int8",
    "int16", "int32", "int64", "int8_t", "int16_t", "int32_t", "int64_t", "long", "ldiv_t",
    "short", "struct", "size_t", "ptrdiff_t", "time_t", "union", "uint", "uint8", "uint16",
    "uint32", "uint64", "uint8_t", "uint16_t", "uint32_t", "uint64_t", "void", "va_list",
    "wchar_t", "pair", "list", "deque", "queue", "priority_queue", "set", "stack", "string", "map",
    "multiset", "multimap", "hash_set", "hash_multiset", "hash_map", "hash_multimap", "bitset",
    "vector", "valarray", "iterator",
];

/// C standard library functions.
const FUNCTIONS: &[&str] = &[
    "assert", "cabs", "cacos", "cacosh", "carg", "casin", "casinh", "catan", "catanh", "ccos",
    "ccosh", "cexp", "cimag", "cis", "clog", "conj", "cpow", "cproj", "creal", "csin", "csinh",
    "csqrt", "ctan", "ctanh", "digittoint", "isalnum", "isalpha", "isascii", "isblank",
    "iscntrl", "isdigit", "isgraph", "islower", "isprint", "ispunct", "isspace", "isupper",
    "isxdigit", "toascii", "tolower", "toupper", "imaxabs", "imaxdiv", "strtoimax", "strtoumax",
    "wcstoimax", "wcstoumax", "localeconv", "setlocale", "acos", "asin", "atan", "atan2", "atof",
    "ceil", "cos", "cosh", "exp", "fabs", "floor", "frexp", "ldexp", "log", "log10", "modf",
    "pow", "sin", "sinh", "sqrt", "tan", "tanh", "longjmp", "setjmp", "raise", "va_arg",
    "va_copy", "va_end", "va_start", "offsetof", "clearerr", "fclose", "feof", "ferror",
    "fflush", "fgetc", "fgetpos", "fgets", "fopen", "freopen", "fdopen", "fprintf", "fputc",
    "fputs", "fread", "fscanf", "fseek", "fsetpos", "ftell", "fwrite", "getc", "getchar", "gets",
    "perror", "printf", "sprintf", "snprintf", "putc", "putchar", "fputchar", "puts", "remove",
    "rename", "rewind", "scanf", "sscanf", "vfscanf", "vscanf", "vsscanf", "setbuf", "setvbuf",
    "tmpfile", "tmpnam", "ungetc", "vprintf", "vfprintf", "vsprintf", "abort", "abs", "labs",
    "atexit", "atoi", "atol", "bsearch", "div", "ldiv", "exit", "free", "itoa", "getenv", "ltoa",
    "malloc", "alloc", "realloc", "qsort", "rand", "srand", "strtod", "strtol", "strtoul",
    "system", "memchr", "memcmp", "memcpy", "memmove", "memset", "strcat", "strncat", "strchr",
    "strcmp", "strncmp", "strcoll", "strcpy", "strncpy", "strcspn", "strerror", "strlen",
    "strpbrk", "strrchr", "strspn", "strstr", "strtok", "strxfrm", "asctime", "clock", "ctime",
    "difftime", "gmtime", "localtime", "mktime", "strftime", "time", "btowc", "fgetwc", "fgetws",
    "fputwc", "fputws", "fwide", "fwprintf", "fwscanf", "getwc", "getwchar", "mbrlen", "mbrtowc",
    "mbsinit", "mbsrtowcs", "putwc", "putwchar", "swprintf", "swscanf", "ungetwc", "vfwprintf",
    "vswprintf", "vwprintf", "wcrtomb", "wcscat", "wcschr", "wcscmp", "wcscoll", "wcscpy",
    "wcscspn", "wcsftime", "wcslen", "wcsncat", "wcsncmp", "wcsncpy", "wcspbrk", "wcsrchr",
    "wcsrtombs", "wcsspn", "wcsstr", "wcstod", "wcstok", "wcstol", "wcstoul", "wcsxfrm", "wctob",
    "wmemchr", "wmemcmp", "wmemcpy", "wmemmove", "wmemset", "wprintf", "wscanf", "iswalnum",
    "iswalpha", "iswcntrl", "iswctype", "iswdigit", "iswgraph", "iswlower", "iswprint",
    "iswpunct", "iswspace", "iswupper", "iswxdigit", "towctrans", "towlower", "towupper",
    "wctrans", "wctype", "farmalloc", "getch", "getche", "gotoxy", "getaddrinfo", "getnameinfo",
];

/// Patterns used by the preprocessor override and filter.
struct Directive {
    if_zero: Pattern,
    open: Pattern,
    close: Pattern,
    line: Pattern,
    inner: Pattern,
}

fn directive() -> Result<&'static Directive, ScanError> {
    static DIRECTIVE: OnceLock<Directive> = OnceLock::new();
    if let Some(d) = DIRECTIVE.get() {
        return Ok(d);
    }
    let compiled = Directive {
        if_zero: Pattern::new(r"(?m)^[ \t]*#[ \t]*if[ \t]+0\b")?,
        open: Pattern::new(r"(?m)^[ \t]*#[ \t]*if(?:n?def)?\b")?,
        close: Pattern::new(r"(?m)^[ \t]*#[ \t]*endif\b")?,
        line: Pattern::new(r"#(?:[^/\n\\]+|(?s:/\*.*?(?:\*/|\z))|//.*|/|\\(?s:.))*")?,
        inner: Pattern::new(r#"(?m)"(?:[^\\\n"]+|\\.)*(?:"|$)|&lt;(.*?)&gt;|//.*|(?s:/\*.*?(?:\*/|\z))"#)?,
    };
    Ok(DIRECTIVE.get_or_init(|| compiled))
}

/// Record a directive line, or a whole `#if 0 ... #endif` block as a comment.
fn preprocessor(s: &mut Scanner, _: &MatchData) -> Result<(), ScanError> {
    let d = directive()?;
    if s.check(&d.if_zero).is_some() {
        return s.nestable_token(Kind::COMMENT, &d.open, &d.close);
    }
    s.skip_whitespace();
    match s.scan(&d.line) {
        Some(data) => s.record_match(Some(Kind::PREPROCESSOR), &data),
        None => {
            let hash = s.get(1);
            s.record(Some(Kind::PREPROCESSOR), hash);
        }
    }
    Ok(())
}

/// Mark strings, `<header>` names and comments inside a directive.
fn preprocessor_filter(token: Token, _: &FilterContext<'_>) -> Token {
    let Ok(d) = directive() else {
        return token;
    };
    let mut token = escape_token(token);
    token.text = d.inner.replace_all_with(&token.text, |caps| {
        let all = caps.get(0).map_or("", |m| m.as_str());
        if all.starts_with('"') {
            tag_block(Kind::STRING, all, true)
        } else if let Some(header) = all.strip_prefix("&lt;").and(caps.get(1)) {
            format!("&lt;{}&gt;", tag_block(Kind::STRING, header.as_str(), true))
        } else {
            tag_block(Kind::COMMENT, all, true)
        }
    });
    token
}

/// The C/C++ grammar.
pub fn grammar() -> Result<GrammarBuilder, ScanError> {
    let mut g = GrammarBuilder::new("c")?;
    g.add_filter(Some("preprocessor"), Kind::PREPROCESSOR, preprocessor_filter);
    g.add_identifier_mapping(Kind::FUNCTION, FUNCTIONS);
    g.add_identifier_mapping(Kind::KEYWORD, KEYWORDS);
    g.add_identifier_mapping(Kind::TYPE, TYPES);

    g.add_pattern(Kind::COMMENT, C_COMMENT_ML)?;
    g.add_pattern(Kind::COMMENT, C_COMMENT_SL)?;
    g.add_pattern(Kind::STRING, r#"(?m)L?"(?:[^\\"\n]+|\\(?s:.))*(?:"|$)"#)?;
    g.add_pattern(Kind::CHARACTER, r"(?im)L?'(?:\\(?:x[a-f0-9]{1,2}|.)|.)(?:'|$)")?;
    g.add_pattern(Kind::NUMERIC, r"(?i)0x[a-f0-9]+[ul]*")?;
    g.add_pattern(Kind::NUMERIC, r"(?i)(?:\d*\.\d+|\d+\.\d*)(?:e[+-]?\d+)?[fl]?")?;
    g.add_pattern(Kind::NUMERIC, r"(?i)\d+(?:[ul]+|(?:e[+-]?\d+)?[fl]?)")?;
    g.add_pattern(Kind::NUMERIC, NUM_HEX)?;
    g.add_pattern(Kind::NUMERIC, NUM_REAL)?;
    // a lone `/` so `x=//c` still finds the comment
    g.add_pattern(Kind::OPERATOR, r"[!%^&*\-+=~:?.|<>]+|/")?;
    g.add_pattern(Kind::PREPROCESSOR, r"(?m)^[ \t]*#")?;
    g.add_pattern(Kind::IDENT, r"[a-zA-Z_]\w*")?;
    g.add_override(Kind::PREPROCESSOR, preprocessor);
    Ok(g)
}

simple_language!(
    /// C and C++ scanner.
    CppScanner
);

impl Language for CppScanner {
    const CODES: &'static [&'static str] = &["c", "cpp", "h", "hpp", "cxx", "hxx"];
    const DESCRIPTION: &'static str = "C/C++";

    fn create(_: &ScannerRegistry) -> Result<Self, ScanError> {
        Self::new()
    }

    fn guess(src: &str, _: &SourceInfo<'_>) -> f64 {
        let mut p = 0.0;
        if guess_matches!(r#"(?m)^\s*#\s*(?:include\s+[<"]|ifdef|endif|define)\b"#, src) {
            p += 0.3;
        }
        if guess_matches!(r"\bchar\s*\*\s*\w+", src) {
            p += 0.05;
        }
        if guess_matches!(r"\bmalloc\s*\(", src) {
            p += 0.02;
        }
        p
    }
}
