//! Haskell.
//!
//! `{- -}` comments nest and go through the engine's nestable-token
//! primitive. A run of dashes only starts a line comment when neither
//! neighbour is an operator character (`-->` is an operator); that check is
//! a peephole in the `DASHES` override.

use std::sync::OnceLock;

use lumen_scan_core::{Kind, MatchData, Pattern, Token};

use super::{guess_matches, simple_language};
use crate::filters::FilterContext;
use crate::presets::{DOUBLE_STR_SL, SINGLE_STR_SL};
use crate::{GrammarBuilder, Language, ScanError, Scanner, ScannerRegistry, SourceInfo};

const KEYWORDS: &[&str] = &[
    "as", "case", "of", "class", "data", "family", "instance", "default", "deriving", "do",
    "forall", "foreign", "hiding", "if", "then", "else", "import", "infix", "infixl", "infixr",
    "let", "in", "mdo", "module", "newtype", "proc", "qualified", "rec", "type", "where",
];

const TYPES: &[&str] = &[
    "Bool", "Char", "Double", "Either", "FilePath", "Float", "Int", "Integer", "IO", "IOError",
    "Maybe", "Ordering", "ReadS", "ShowS", "String", "Bounded", "Enum", "Eq", "Floating",
    "Fractional", "Functor", "Integral", "Monad", "Num", "Ord", "Read", "Real", "RealFloat",
    "RealFrac", "Show",
];

const VALUES: &[&str] = &["EQ", "False", "GT", "Just", "Left", "LT", "Nothing", "Right", "True"];

/// Prelude functions.
const FUNCTIONS: &[&str] = &[
    "abs", "acos", "acosh", "all", "and", "any", "appendFile", "applyM", "asTypeOf", "asin",
    "asinh", "atan", "atan2", "atanh", "break", "catch", "ceiling", "compare", "concat",
    "concatMap", "const", "cos", "cosh", "curry", "cycle", "decodeFloat", "div", "divMod", "drop",
    "dropWhile", "elem", "encodeFloat", "enumFrom", "enumFromThen", "enumFromThenTo",
    "enumFromTo", "error", "even", "exp", "exponent", "fail", "filter", "flip", "floatDigits",
    "floatRadix", "floatRange", "floor", "fmap", "foldl", "foldl1", "foldr", "foldr1",
    "fromEnum", "fromInteger", "fromIntegral", "fromRational", "fst", "gcd", "getChar",
    "getContents", "getLine", "head", "id", "init", "interact", "ioError", "isDenormalized",
    "isIEEE", "isInfinite", "isNaN", "isNegativeZero", "iterate", "last", "lcm", "length", "lex",
    "lines", "log", "logBase", "lookup", "map", "mapM", "mapM_", "max", "maxBound", "maximum",
    "maybe", "min", "minBound", "minimum", "mod", "negate", "not", "notElem", "null", "odd", "or",
    "otherwise", "pi", "pred", "print", "product", "properFraction", "putChar", "putStr",
    "putStrLn", "quot", "quotRem", "read", "readFile", "readIO", "readList", "readLn",
    "readParen", "reads", "readsPrec", "realToFrac", "recip", "rem", "repeat", "replicate",
    "return", "reverse", "round", "scaleFloat", "scanl", "scanl1", "scanr", "scanr1", "seq",
    "sequence", "sequence_", "show", "showChar", "showList", "showParen", "showString", "shows",
    "showsPrec", "significand", "signum", "sin", "sinh", "snd", "span", "splitAt", "sqrt",
    "subtract", "succ", "sum", "tail", "take", "takeWhile", "tan", "tanh", "toEnum", "toInteger",
    "toRational", "truncate", "uncurry", "undefined", "unlines", "until", "unwords", "unzip",
    "unzip3", "userError", "words", "writeFile", "zip", "zip3", "zipWith", "zipWith3",
];

const OP_CHARS: &str = r"+%^/*?#<>:;=@\[\]|\\~\-!$&";

const DASHES: Kind = Kind::new("DASHES");
const NESTED_COMMENT: Kind = Kind::new("NESTED_COMMENT");

fn is_op_char(c: char) -> bool {
    "+%^/*?#<>:;=@[]|\\~-!$&".contains(c)
}

/// `--` comment, or an operator containing dashes.
fn dashes(s: &mut Scanner, _: &MatchData) -> Result<(), ScanError> {
    let start = s.pos();
    let rest = s.rest();
    let run = rest.bytes().take_while(|&b| b == b'-').count();
    let before_ok = s.char_before().map_or(true, |c| !is_op_char(c));
    let after_ok = rest[run..].chars().next().map_or(true, |c| !is_op_char(c));
    let (kind, len) = if before_ok && after_ok {
        (Kind::COMMENT, rest.find('\n').unwrap_or(rest.len()))
    } else {
        (Kind::OPERATOR, rest.find(|c| !is_op_char(c)).unwrap_or(rest.len()))
    };
    s.set_pos(start + len);
    s.record_range(start, start + len, Some(kind))
}

fn nested_comment(s: &mut Scanner, _: &MatchData) -> Result<(), ScanError> {
    static DELIMS: OnceLock<(Pattern, Pattern)> = OnceLock::new();
    let (open, close) = match DELIMS.get() {
        Some(d) => d,
        None => {
            let compiled = (Pattern::new(r"\{-")?, Pattern::new(r"-\}")?);
            DELIMS.get_or_init(|| compiled)
        }
    };
    s.nestable_token(Kind::COMMENT, open, close)
}

/// Capitalised names are recorded as `TYPE`; the identifier map can still
/// reclassify them (`True` is a value).
fn map_type(mut token: Token, ctx: &FilterContext<'_>) -> Token {
    if let Some(kind) = ctx.idents.get(&token.text) {
        token.kind = Some(kind);
    }
    token
}

/// The Haskell grammar.
pub fn grammar() -> Result<GrammarBuilder, ScanError> {
    let mut g = GrammarBuilder::new("haskell")?;
    g.add_identifier_mapping(Kind::KEYWORD, KEYWORDS);
    g.add_identifier_mapping(Kind::TYPE, TYPES);
    g.add_identifier_mapping(Kind::FUNCTION, FUNCTIONS);
    g.add_identifier_mapping(Kind::VALUE, VALUES);
    g.add_filter(Some("map-type"), Kind::TYPE, map_type);

    // shebang
    g.add_pattern(Kind::COMMENT, r"\A#!.*")?;
    g.add_pattern(Kind::TYPE, r"[A-Z]['\w]*")?;
    g.add_pattern(Kind::IDENT, r"[_a-z]['\w]*")?;
    g.add_pattern(DASHES, "--+")?;
    g.add_pattern(
        Kind::FUNCTION,
        r"!!|\$!?|&&|\|\|?|\*\*?|\+\+?|-|\.|/=?|<=?|==|=<<|>>?=?|\^\^?",
    )?;
    // backticks make a function infix
    g.add_pattern(Kind::OPERATOR, r"`[^`]*`")?;
    // lambda
    g.add_pattern(Kind::FUNCTION, &format!(r"\\[^{OP_CHARS}\s]\S*"))?;
    g.add_pattern(NESTED_COMMENT, r"\{-")?;
    g.add_pattern(Kind::OPERATOR, &format!("[{OP_CHARS}]+"))?;
    g.add_pattern(Kind::STRING, DOUBLE_STR_SL)?;
    g.add_pattern(Kind::CHARACTER, SINGLE_STR_SL)?;
    g.add_pattern(Kind::NUMERIC, r"0[oO]\d+|0[xX][a-fA-F\d]+|\d+(?:\.\d+)?(?:[eE][+-]?\d+)?")?;

    g.add_override(DASHES, dashes);
    g.add_override(NESTED_COMMENT, nested_comment);
    Ok(g)
}

simple_language!(
    /// Haskell scanner.
    HaskellScanner
);

impl Language for HaskellScanner {
    const CODES: &'static [&'static str] = &["haskell", "hs"];
    const DESCRIPTION: &'static str = "Haskell";

    fn create(_: &ScannerRegistry) -> Result<Self, ScanError> {
        Self::new()
    }

    fn guess(src: &str, _: &SourceInfo<'_>) -> f64 {
        let mut p = 0.0;
        if guess_matches!(r"\{-.*-\}", src) {
            p += 0.05;
        }
        if guess_matches!(r"(?m)^import\s+qualified", src) {
            p += 0.05;
        }
        if guess_matches!(r"data\s+\w+\s+\w+\s*=", src) {
            p += 0.05;
        }
        p
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests can panic")]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::Scan;

    fn kinds(src: &str) -> Vec<(Option<&'static str>, String)> {
        let mut s = HaskellScanner::new().unwrap();
        s.set_source(lumen_scan_core::SourceBuffer::new(src));
        s.main().unwrap();
        s.scanner()
            .tokens()
            .iter()
            .map(|t| (t.kind.map(Kind::name), t.text.clone()))
            .collect()
    }

    #[test]
    fn nested_comment_is_one_token() {
        assert_eq!(
            kinds("{- a {- b -} c -}x"),
            vec![
                (Some("COMMENT"), "{- a {- b -} c -}".to_owned()),
                (Some("IDENT"), "x".to_owned()),
            ]
        );
    }

    #[test]
    fn unterminated_nested_comment_runs_to_eos() {
        assert_eq!(kinds("{- a {- b -}"), vec![(Some("COMMENT"), "{- a {- b -}".to_owned())]);
    }

    #[test]
    fn dashes_comment_or_operator() {
        assert_eq!(
            kinds("x -- note\ny"),
            vec![
                (Some("IDENT"), "x".to_owned()),
                (None, " ".to_owned()),
                (Some("COMMENT"), "-- note".to_owned()),
                (None, "\n".to_owned()),
                (Some("IDENT"), "y".to_owned()),
            ]
        );
        assert_eq!(kinds("a -->b")[2], (Some("OPERATOR"), "-->".to_owned()));
    }

    #[test]
    fn capitalised_values() {
        let mut s = HaskellScanner::new().unwrap();
        let out = s.highlight("Just True :: Maybe Bool").unwrap();
        assert_eq!(
            out,
            "<VALUE>Just</VALUE> <VALUE>True</VALUE> <OPERATOR>::</OPERATOR> <TYPE>Maybe</TYPE> <TYPE>Bool</TYPE>"
        );
    }
}
