//! Tokens and the recorded token stream.
//!
//! A token is a `(kind, text, escaped)` triple. `kind == None` marks
//! untagged passthrough text (whitespace, punctuation a grammar does not
//! care about). `escaped` tokens already hold final markup, typically the
//! rendered output of a child scanner, and are never escaped again.

use std::fmt;

/// Token kind. The vocabulary is open: grammars may use any static name,
/// the associated constants cover the names the engine itself knows about.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Kind(&'static str);

impl Kind {
    pub const KEYWORD: Kind = Kind("KEYWORD");
    pub const TYPE: Kind = Kind("TYPE");
    pub const FUNCTION: Kind = Kind("FUNCTION");
    pub const VALUE: Kind = Kind("VALUE");
    pub const IDENT: Kind = Kind("IDENT");
    pub const VARIABLE: Kind = Kind("VARIABLE");
    pub const CONSTANT: Kind = Kind("CONSTANT");
    pub const USER_FUNCTION: Kind = Kind("USER_FUNCTION");
    pub const OO: Kind = Kind("OO");
    pub const OBJ: Kind = Kind("OBJ");

    pub const COMMENT: Kind = Kind("COMMENT");
    pub const DOCCOMMENT: Kind = Kind("DOCCOMMENT");
    pub const DOCTAG: Kind = Kind("DOCTAG");
    pub const DOCPROPERTY: Kind = Kind("DOCPROPERTY");
    pub const COMMENT_NOTE: Kind = Kind("COMMENT_NOTE");

    pub const STRING: Kind = Kind("STRING");
    pub const CHARACTER: Kind = Kind("CHARACTER");
    pub const ESC: Kind = Kind("ESC");
    pub const HEREDOC: Kind = Kind("HEREDOC");
    pub const INTERPOLATION: Kind = Kind("INTERPOLATION");
    pub const REGEX: Kind = Kind("REGEX");

    pub const NUMERIC: Kind = Kind("NUMERIC");
    pub const OPERATOR: Kind = Kind("OPERATOR");
    pub const PREPROCESSOR: Kind = Kind("PREPROCESSOR");
    pub const DELIMITER: Kind = Kind("DELIMITER");

    pub const TAG: Kind = Kind("TAG");
    pub const HTMLTAG: Kind = Kind("HTMLTAG");

    /// Create a kind with an arbitrary name.
    pub const fn new(name: &'static str) -> Self {
        Kind(name)
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// One span of output.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: Option<Kind>,
    pub text: String,
    /// `text` is already markup and must not be escaped again.
    pub escaped: bool,
}

impl Token {
    /// Raw (unescaped) token.
    pub fn new(kind: Option<Kind>, text: impl Into<String>) -> Self {
        Token {
            kind,
            text: text.into(),
            escaped: false,
        }
    }

    /// Token whose text is already markup.
    pub fn escaped(kind: Option<Kind>, text: impl Into<String>) -> Self {
        Token {
            kind,
            text: text.into(),
            escaped: true,
        }
    }

    #[inline]
    pub fn is(&self, kind: Kind) -> bool {
        self.kind == Some(kind)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(kind) => write!(f, "{kind}")?,
            None => f.write_str("_")?,
        }
        if self.escaped {
            f.write_str("!")?;
        }
        write!(f, "({:?})", self.text)
    }
}

/// Append-only sequence of tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new() -> Self {
        TokenStream::default()
    }

    /// Append a token. Empty text is dropped.
    pub fn push(&mut self, token: Token) {
        if !token.text.is_empty() {
            self.tokens.push(token);
        }
    }

    /// Append raw text under `kind`.
    pub fn record(&mut self, kind: Option<Kind>, text: impl Into<String>) {
        self.push(Token::new(kind, text));
    }

    /// Append pre-rendered markup under `kind`.
    pub fn record_escaped(&mut self, kind: Option<Kind>, text: impl Into<String>) {
        self.push(Token::escaped(kind, text));
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn last(&self) -> Option<&Token> {
        self.tokens.last()
    }

    /// Take the tokens out, leaving the stream empty.
    pub fn take(&mut self) -> Vec<Token> {
        std::mem::take(&mut self.tokens)
    }

    pub fn into_vec(self) -> Vec<Token> {
        self.tokens
    }

    /// Concatenated text of every token, as recorded.
    pub fn text(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }
}

impl From<Vec<Token>> for TokenStream {
    fn from(tokens: Vec<Token>) -> Self {
        let mut stream = TokenStream::new();
        for t in tokens {
            stream.push(t);
        }
        stream
    }
}

impl<'a> IntoIterator for &'a TokenStream {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

#[cfg(test)]
mod tests;
