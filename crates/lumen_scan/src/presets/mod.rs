//! Pattern sources shared by several grammars.
//!
//! Unterminated strings and comments run to the end of the line (`_SL`
//! variants) or the end of the source, so an unterminated construct is
//! always one token.

/// Double-quoted string, may span lines.
pub const DOUBLE_STR: &str = r#"(?s)"(?:[^"\\]|\\.)*(?:"|\\?\z)"#;

/// Double-quoted string ending at the end of the line.
pub const DOUBLE_STR_SL: &str = r#"(?m)"(?:[^"\\\n]|\\(?s:.))*(?:"|\\?$)"#;

/// Single-quoted string, may span lines.
pub const SINGLE_STR: &str = r"(?s)'(?:[^'\\]|\\.)*(?:'|\\?\z)";

/// Single-quoted string ending at the end of the line.
pub const SINGLE_STR_SL: &str = r"(?m)'(?:[^'\\\n]|\\(?s:.))*(?:'|\\?$)";

/// C character literal.
pub const CHAR: &str = r"(?i)'(?:\\(?:x[a-f0-9]{1,2}|.)|[^'\\\n])'?";

pub const NUM_HEX: &str = r"0[xX][a-fA-F0-9]+";

/// Integer, decimal fraction or exponent form.
pub const NUM_REAL: &str = r"(?i)(?:\d+(?:\.\d+)?|\.\d+)(?:e[+-]?\d+)?";

pub const C_COMMENT_SL: &str = r"//.*";

/// `/* ... */`, running to EOS when unterminated. Does not nest.
pub const C_COMMENT_ML: &str = r"(?s)/\*.*?(?:\*/|\z)";

pub const PERL_COMMENT: &str = r"#.*";

/// SQL string where `''` escapes a quote.
pub const SQL_SINGLE_STR: &str = r"'(?:[^']|'')*(?:'|\z)";

/// SQL string accepting both `''` and backslash escapes.
pub const SQL_SINGLE_STR_BSLASH: &str = r"(?s)'(?:[^'\\]|''|\\.)*(?:'|\\?\z)";
