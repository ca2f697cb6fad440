//! ActionScript: the JavaScript grammar, never embedded, with a preprocessor
//! line pattern and its own word lists layered on top. Shared words take the
//! ActionScript kind (`var` is a type here, a keyword in JavaScript).

use lumen_scan_core::Kind;

use super::javascript::{self, JavaScriptScanner};
use super::guess_matches;
use crate::{EmbedOptions, GrammarBuilder, Language, Scan, ScanError, Scanner, ScannerRegistry, SourceBuffer};

const FUNCTIONS: &[&str] = &[
    "add", "chr", "clearInterval", "escape", "eval", "evaluate", "fscommand", "getProperty",
    "getTimer", "getVersion", "globalStyleFormat", "gotoAndPlay", "gotoAndStop", "ifFrameLoaded",
    "instanceOf", "isFinite", "isNaN", "loadMovie", "loadMovieNum", "loadVariables", "mbchr",
    "mblength", "mbord", "mbsubstring", "nextFrame", "nextScene", "onClipEvent", "ord",
    "parseFloat", "parseInt", "play", "prevFrame", "prevScene", "print", "printAsBitMap",
    "printNum", "random", "scroll", "setInterval", "setProperty", "stop", "stopDrag", "substring",
    "super", "targetPath", "tellTarget", "toString", "toggleHighQuality", "trace", "unescape",
];

const TYPES: &[&str] = &[
    "Accessibility", "Array", "Arguments", "Boolean", "Button", "ByteArray", "Camera", "Color",
    "Date", "Event", "FScrollPane", "FStyleFormat", "Function", "int", "Key", "LoadVars",
    "LocalConnection", "Math", "Microphone", "Mouse", "Movieclip", "Number", "Object",
    "Selection", "Sound", "Sprite", "String", "System", "TextField", "TextFormat", "Timer",
    "TimerEvent", "uint", "var", "void", "XML",
];

const KEYWORDS: &[&str] = &[
    "as", "break", "case", "catch", "class", "const", "continue", "default", "delete", "do",
    "else", "extends", "false", "finally", "for", "function", "if", "implements", "import", "in",
    "instanceof", "interface", "internal", "is", "native", "new", "null", "package", "private",
    "protected", "public", "return", "super", "switch", "static", "this", "throw", "to", "true",
    "try", "typeof", "use", "void", "while", "with",
];

/// The ActionScript grammar.
pub fn grammar() -> Result<GrammarBuilder, ScanError> {
    let mut g = javascript::builder(&EmbedOptions::default())?;
    g.rename("as");
    g.add_pattern(Kind::PREPROCESSOR, r"(?m)^[ \t]*#.*")?;
    g.add_identifier_mapping(Kind::FUNCTION, FUNCTIONS);
    g.add_identifier_mapping(Kind::TYPE, TYPES);
    g.add_identifier_mapping(Kind::KEYWORD, KEYWORDS);
    Ok(g)
}

/// ActionScript scanner: the JavaScript main loop over [`grammar`].
#[derive(Debug)]
pub struct ActionScriptScanner {
    inner: JavaScriptScanner,
}

impl ActionScriptScanner {
    pub fn new() -> Result<Self, ScanError> {
        Ok(ActionScriptScanner {
            inner: JavaScriptScanner::with_grammar(grammar()?.build(), EmbedOptions::default())?,
        })
    }
}

impl Scan for ActionScriptScanner {
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

impl Language for ActionScriptScanner {
    const CODES: &'static [&'static str] = &["as", "actionscript"];
    const DESCRIPTION: &'static str = "ActionScript";

    fn create(_: &ScannerRegistry) -> Result<Self, ScanError> {
        Self::new()
    }

    fn guess(src: &str, _: &crate::SourceInfo<'_>) -> f64 {
        let mut p = 0.0;
        if guess_matches!(r"\bfunction\s+\w+\s*\([^)]+\):(?:String|int|Number|void)", src) {
            p += 0.15;
        }
        if guess_matches!(r"\bvar\s+\w+:(?:String|int|Number)", src) {
            p += 0.15;
        }
        p
    }
}
