//! Scanner state shared by every language.
//!
//! [`Scanner`] bundles the cursor, the recorded tokens, the frozen grammar,
//! user definitions and the region stack. Language main loops and override
//! handlers drive it; [`Scanner::tagged`] runs the filter chain and renders
//! the inline markup.
//!
//! A scanner built with [`Scanner::with_tree`] records into a token tree
//! instead of a flat stream: regions become tree nodes, and rendering
//! collapses the tree bottom-up.

use std::ops::Range;
use std::sync::Arc;

use lumen_scan_core::markup::{escape, tag_block};
use lumen_scan_core::{Cursor, Kind, MatchData, NextMatch, Pattern, SourceBuffer, Token, TokenStream};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::filters::FilterContext;
use crate::state::{Region, StateStack};
use crate::stateful::TokenTree;
use crate::{Grammar, ScanError};

/// Cursor, token output and region state for one scanner instance.
#[derive(Debug)]
pub struct Scanner {
    cursor: Cursor,
    tokens: TokenStream,
    grammar: Arc<Grammar>,
    user_defs: FxHashMap<String, Kind>,
    states: StateStack,
    tree: Option<TokenTree>,
}

impl Scanner {
    /// Flat-stream scanner over an empty source.
    pub fn new(grammar: Arc<Grammar>) -> Self {
        Scanner {
            cursor: Cursor::new(SourceBuffer::new("")),
            tokens: TokenStream::new(),
            grammar,
            user_defs: FxHashMap::default(),
            states: StateStack::new(),
            tree: None,
        }
    }

    /// Token-tree scanner over an empty source.
    pub fn with_tree(grammar: Arc<Grammar>) -> Self {
        let mut scanner = Self::new(grammar);
        scanner.tree = Some(TokenTree::new());
        scanner
    }

    #[inline]
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    #[inline]
    pub fn language(&self) -> &'static str {
        self.grammar.name()
    }

    /// Point at `buf` and clear all scan state.
    pub fn set_source(&mut self, buf: SourceBuffer) {
        self.cursor.set_source(buf);
        self.clear_output();
    }

    /// Rewind to the start of the source and clear all scan state.
    pub fn reset(&mut self) {
        self.cursor.reset();
        self.clear_output();
    }

    fn clear_output(&mut self) {
        self.tokens.clear();
        self.user_defs.clear();
        self.states.clear();
        if let Some(tree) = &mut self.tree {
            *tree = TokenTree::new();
        }
    }

    // === Cursor ===

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    #[inline]
    pub fn source(&self) -> &SourceBuffer {
        self.cursor.source()
    }

    #[inline]
    pub fn text(&self) -> &str {
        self.cursor.text()
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.cursor.pos()
    }

    #[inline]
    pub fn set_pos(&mut self, pos: usize) {
        self.cursor.set_pos(pos);
    }

    #[inline]
    pub fn pos_shift(&mut self, offset: usize) {
        self.cursor.pos_shift(offset);
    }

    #[inline]
    pub fn eos(&self) -> bool {
        self.cursor.eos()
    }

    #[inline]
    pub fn bol(&self) -> bool {
        self.cursor.bol()
    }

    #[inline]
    pub fn rest(&self) -> &str {
        self.cursor.rest()
    }

    #[inline]
    pub fn peek(&self) -> Option<char> {
        self.cursor.peek()
    }

    #[inline]
    pub fn peek_n(&self, n: usize) -> &str {
        self.cursor.peek_n(n)
    }

    #[inline]
    pub fn char_before(&self) -> Option<char> {
        self.cursor.char_before()
    }

    pub fn slice(&self, range: Range<usize>) -> &str {
        self.cursor.slice(range)
    }

    pub fn get(&mut self, n: usize) -> String {
        self.cursor.get(n)
    }

    pub fn scan(&mut self, pattern: &Pattern) -> Option<MatchData> {
        self.cursor.scan(pattern)
    }

    pub fn check(&mut self, pattern: &Pattern) -> Option<MatchData> {
        self.cursor.check(pattern)
    }

    pub fn scan_until(&mut self, pattern: &Pattern) -> Option<MatchData> {
        self.cursor.scan_until(pattern)
    }

    pub fn search(&mut self, pattern: &Pattern) -> Option<MatchData> {
        self.cursor.search(pattern)
    }

    pub fn index(&mut self, pattern: &Pattern) -> Option<usize> {
        self.cursor.index(pattern)
    }

    pub fn accept(&mut self, data: &MatchData) {
        self.cursor.accept(data);
    }

    pub fn unscan(&mut self) -> bool {
        self.cursor.unscan()
    }

    pub fn terminate(&mut self) {
        self.cursor.terminate();
    }

    /// Text of `data` in the source.
    pub fn match_str(&self, data: &MatchData) -> &str {
        data.as_str(self.cursor.text())
    }

    /// Nearest upcoming match in the grammar's pattern table.
    pub fn next_match(&mut self) -> Option<NextMatch> {
        self.grammar.patterns().next_match(&mut self.cursor)
    }

    // === Recording ===

    /// Drop everything recorded so far.
    pub fn start(&mut self) {
        self.tokens.clear();
    }

    /// Record raw `text` under `kind`.
    pub fn record(&mut self, kind: Option<Kind>, text: impl Into<String>) {
        match &mut self.tree {
            Some(tree) => tree.record(kind, text.into(), false),
            None => self.tokens.record(kind, text),
        }
    }

    /// Record pre-rendered markup under `kind`.
    pub fn record_escaped(&mut self, kind: Option<Kind>, text: impl Into<String>) {
        match &mut self.tree {
            Some(tree) => tree.record(kind, text.into(), true),
            None => self.tokens.record_escaped(kind, text),
        }
    }

    /// Record the source text in `[from, to)` under `kind`.
    pub fn record_range(&mut self, from: usize, to: usize, kind: Option<Kind>) -> Result<(), ScanError> {
        if to < from {
            return Err(ScanError::InvalidRange { from, to });
        }
        if to > from {
            let text = self.cursor.slice(from..to).to_owned();
            self.record(kind, text);
        }
        Ok(())
    }

    /// Record the text of `data` under `kind`.
    pub fn record_match(&mut self, kind: Option<Kind>, data: &MatchData) {
        let text = self.match_str(data).to_owned();
        self.record(kind, text);
    }

    /// Record everything from the cursor to EOS under `kind` and terminate.
    /// Records nothing at EOS.
    pub fn record_rest(&mut self, kind: Option<Kind>) {
        if !self.eos() {
            let rest = self.rest().to_owned();
            self.record(kind, rest);
            self.terminate();
        }
    }

    /// Tokens recorded so far (flat mode only).
    pub fn tokens(&self) -> &TokenStream {
        &self.tokens
    }

    /// Mutable access for peephole rewrites of recent tokens.
    pub fn tokens_mut(&mut self) -> &mut TokenStream {
        &mut self.tokens
    }

    /// Consume whitespace at the cursor as an untagged token.
    pub fn skip_whitespace(&mut self) {
        let len = self
            .rest()
            .find(|c: char| !c.is_whitespace())
            .unwrap_or_else(|| self.rest().len());
        if len > 0 {
            let text = self.get_raw(len);
            self.record(None, text);
        }
    }

    fn get_raw(&mut self, len: usize) -> String {
        let start = self.pos();
        let text = self.cursor.slice(start..start + len).to_owned();
        self.set_pos(start + len);
        text
    }

    // === User Definitions ===

    /// Remember that `name` was defined in the source as a `kind`.
    pub fn add_user_def(&mut self, name: impl Into<String>, kind: Kind) {
        self.user_defs.insert(name.into(), kind);
    }

    pub fn user_defs(&self) -> &FxHashMap<String, Kind> {
        &self.user_defs
    }

    // === Regions ===

    pub fn push_state(&mut self, region: Region) {
        trace!(language = self.language(), state = %region.name, pos = self.pos(), "push state");
        if let Some(tree) = &mut self.tree {
            tree.push(Some(region.name));
        }
        self.states.push(region);
    }

    pub fn pop_state(&mut self) -> Result<Region, ScanError> {
        let region = self.states.pop()?;
        trace!(language = self.language(), state = %region.name, pos = self.pos(), "pop state");
        if let Some(tree) = &mut self.tree {
            tree.pop();
        }
        Ok(region)
    }

    /// The innermost open region.
    pub fn state(&self) -> Option<&Region> {
        self.states.top()
    }

    pub fn state_mut(&mut self) -> Option<&mut Region> {
        self.states.top_mut()
    }

    pub fn state_name(&self) -> Kind {
        self.states.name()
    }

    pub fn depth(&self) -> usize {
        self.states.depth()
    }

    pub fn states(&self) -> &StateStack {
        &self.states
    }

    /// Consume a nestable construct such as `/* /* */ */` as one token.
    ///
    /// The cursor must be at a match of `open`. Depth is tracked over the
    /// nearest of `open`/`close`; an unterminated construct runs to EOS.
    pub fn nestable_token(&mut self, kind: Kind, open: &Pattern, close: &Pattern) -> Result<(), ScanError> {
        let start = self.pos();
        if self.check(open).is_none() {
            return Err(ScanError::NestableMismatch { kind, pos: start });
        }
        let mut depth = 0usize;
        loop {
            match self.cursor.get_next(&[open, close]) {
                None => {
                    self.terminate();
                    break;
                }
                Some((which, data)) => {
                    self.set_pos(data.end());
                    if which == 0 {
                        depth += 1;
                    } else {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            break;
                        }
                    }
                    if data.is_empty() {
                        self.pos_shift(1);
                    }
                }
            }
        }
        let end = self.pos();
        self.record_range(start, end, Some(kind))
    }

    /// Fail unless the cursor moved past `from` or the region depth changed.
    pub fn ensure_progress(&self, from: usize, depth: usize) -> Result<(), ScanError> {
        if self.pos() > from || self.depth() != depth || self.eos() {
            Ok(())
        } else {
            Err(ScanError::NoProgress {
                language: self.language(),
                pos: from,
            })
        }
    }

    // === Rendering ===

    pub fn filter_context(&self) -> FilterContext<'_> {
        FilterContext {
            idents: self.grammar.idents(),
            user_defs: &self.user_defs,
            rule_map: self.grammar.rule_map(),
        }
    }

    /// Run the filter chain over the recorded output and render it as
    /// inline markup. Drains the recorded tokens.
    pub fn tagged(&mut self) -> String {
        if let Some(tree) = self.tree.take() {
            let out = tree.collapse(self);
            self.tree = Some(TokenTree::new());
            return out;
        }
        let mut tokens = self.tokens.take();
        let ctx = self.filter_context();
        for filter in self.grammar.stream_filters() {
            tokens = (filter.apply)(tokens, &ctx);
        }
        let mut out = String::new();
        for token in tokens {
            let token = self.apply_filters(token, &ctx);
            render_into(&mut out, token);
        }
        out
    }

    /// Run the per-kind filters registered for the token's current kind.
    pub(crate) fn apply_filters(&self, mut token: Token, ctx: &FilterContext<'_>) -> Token {
        let Some(kind) = token.kind else {
            return token;
        };
        for filter in self.grammar.filters_for(kind) {
            token = (filter.apply)(token, ctx);
        }
        token
    }
}

/// Escape (if needed) and tag one token onto `out`.
pub(crate) fn render_into(out: &mut String, token: Token) {
    let text = if token.escaped {
        token.text
    } else {
        escape(&token.text)
    };
    match token.kind {
        Some(kind) => out.push_str(&tag_block(kind, &text, true)),
        None => out.push_str(&text),
    }
}

#[cfg(test)]
mod tests;
