//! Per-language scanner configuration.
//!
//! A [`GrammarBuilder`] collects everything a language registers: patterns,
//! identifier word lists, overrides, filters, the rule-tag remap, state
//! transitions and dirty-exit recovery patterns. [`GrammarBuilder::build`]
//! freezes it into a [`Grammar`] that scanners share through an `Arc` and
//! never mutate while scanning.
//!
//! # Derived Languages
//!
//! A language variant starts from its base language's builder and layers its
//! own registrations on top:
//!
//! ```text
//! let mut g = javascript::builder(&EmbedOptions::default())?;
//! g.add_identifier_mapping(Kind::FUNCTION, ["this"]);  // overrides KEYWORD
//! ```

use std::fmt;
use std::sync::Arc;

use lumen_scan_core::{IdentifierMap, Kind, MatchData, Pattern, PatternTable, Token};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::filters::{self, FilterContext};
use crate::{ScanError, Scanner};

/// Custom consumption routine run instead of recording a match directly.
///
/// Called with the cursor at the start of the match. Must move the cursor or
/// change the state stack.
pub type OverrideFn = dyn Fn(&mut Scanner, &MatchData) -> Result<(), ScanError> + Send + Sync;

/// Per-kind token rewrite.
pub type TokenFilterFn = dyn Fn(Token, &FilterContext<'_>) -> Token + Send + Sync;

/// Whole-stream rewrite, run before per-kind filters.
pub type StreamFilterFn = dyn Fn(Vec<Token>, &FilterContext<'_>) -> Vec<Token> + Send + Sync;

/// A per-kind filter with an optional name for later removal.
#[derive(Clone)]
pub struct TokenFilter {
    pub name: Option<&'static str>,
    pub kind: Kind,
    pub apply: Arc<TokenFilterFn>,
}

/// A stream filter with an optional name for later removal.
#[derive(Clone)]
pub struct StreamFilter {
    pub name: Option<&'static str>,
    pub apply: Arc<StreamFilterFn>,
}

impl fmt::Debug for TokenFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenFilter")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for StreamFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamFilter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Mutable grammar under construction.
#[derive(Clone)]
pub struct GrammarBuilder {
    name: &'static str,
    patterns: PatternTable,
    idents: IdentifierMap,
    overrides: FxHashMap<Kind, Arc<OverrideFn>>,
    filters: Vec<TokenFilter>,
    stream_filters: Vec<StreamFilter>,
    rule_map: FxHashMap<Kind, Option<Kind>>,
    transitions: FxHashMap<Kind, SmallVec<[Kind; 8]>>,
    recovery: FxHashMap<Kind, Pattern>,
}

impl GrammarBuilder {
    /// Empty grammar with the default filters installed.
    pub fn new(name: &'static str) -> Result<Self, ScanError> {
        let mut builder = Self::bare(name);
        filters::install_defaults(&mut builder)?;
        Ok(builder)
    }

    /// Empty grammar with no filters at all.
    pub fn bare(name: &'static str) -> Self {
        GrammarBuilder {
            name,
            patterns: PatternTable::new(),
            idents: IdentifierMap::default(),
            overrides: FxHashMap::default(),
            filters: Vec::new(),
            stream_filters: Vec::new(),
            rule_map: FxHashMap::default(),
            transitions: FxHashMap::default(),
            recovery: FxHashMap::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rename, for derived grammars.
    pub fn rename(&mut self, name: &'static str) {
        self.name = name;
    }

    // === Patterns ===

    /// Register `pattern` under `kind`. Earlier registrations win ties.
    pub fn add_pattern(&mut self, kind: Kind, pattern: &str) -> Result<(), ScanError> {
        self.patterns.register(kind, Pattern::new(pattern)?, None);
        Ok(())
    }

    /// Register an open/close delimited construct.
    pub fn add_delimited(&mut self, kind: Kind, open: &str, close: &str) -> Result<(), ScanError> {
        self.patterns
            .register(kind, Pattern::new(open)?, Some(Pattern::new(close)?));
        Ok(())
    }

    /// Register an already compiled pattern.
    pub fn add_compiled(&mut self, kind: Kind, pattern: Pattern, end: Option<Pattern>) {
        self.patterns.register(kind, pattern, end);
    }

    /// Drop every pattern producing `kind`.
    pub fn remove_pattern(&mut self, kind: Kind) {
        self.patterns.remove(kind);
    }

    // === Identifiers ===

    /// Map `words` to `kind`. Later mappings of the same word win.
    pub fn add_identifier_mapping<I, S>(&mut self, kind: Kind, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.idents.add_mapping(kind, words);
    }

    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.idents.set_case_sensitive(case_sensitive);
    }

    // === Overrides ===

    /// Replace the default "record the match" behavior for `kind`.
    pub fn add_override<F>(&mut self, kind: Kind, handler: F)
    where
        F: Fn(&mut Scanner, &MatchData) -> Result<(), ScanError> + Send + Sync + 'static,
    {
        self.overrides.insert(kind, Arc::new(handler));
    }

    pub fn remove_override(&mut self, kind: Kind) {
        self.overrides.remove(&kind);
    }

    // === Filters ===

    /// Append a per-kind filter.
    pub fn add_filter<F>(&mut self, name: Option<&'static str>, kind: Kind, filter: F)
    where
        F: Fn(Token, &FilterContext<'_>) -> Token + Send + Sync + 'static,
    {
        self.filters.push(TokenFilter {
            name,
            kind,
            apply: Arc::new(filter),
        });
    }

    /// Remove every per-kind filter called `name`.
    pub fn remove_filter(&mut self, name: &str) {
        self.filters.retain(|f| f.name != Some(name));
    }

    /// Append a stream filter.
    pub fn add_stream_filter<F>(&mut self, name: Option<&'static str>, filter: F)
    where
        F: Fn(Vec<Token>, &FilterContext<'_>) -> Vec<Token> + Send + Sync + 'static,
    {
        self.stream_filters.push(StreamFilter {
            name,
            apply: Arc::new(filter),
        });
    }

    /// Remove every stream filter called `name`.
    pub fn remove_stream_filter(&mut self, name: &str) {
        self.stream_filters.retain(|f| f.name != Some(name));
    }

    // === Rule Map / States ===

    /// Display `from` as `to` (`None` = untagged) in the output.
    pub fn map_rule(&mut self, from: Kind, to: Option<Kind>) {
        self.rule_map.insert(from, to);
    }

    /// Allow `to` to start while in state `from`.
    pub fn add_transition(&mut self, from: Kind, to: Kind) {
        self.transitions.entry(from).or_default().push(to);
    }

    /// Replace the allowed kinds for state `from`.
    pub fn set_transitions<I>(&mut self, from: Kind, to: I)
    where
        I: IntoIterator<Item = Kind>,
    {
        self.transitions.insert(from, to.into_iter().collect());
    }

    /// Register the pattern that consumes the rest of an interrupted `kind`.
    pub fn add_recovery(&mut self, kind: Kind, pattern: &str) -> Result<(), ScanError> {
        self.recovery.insert(kind, Pattern::new(pattern)?);
        Ok(())
    }

    /// Freeze the grammar.
    pub fn build(self) -> Arc<Grammar> {
        Arc::new(Grammar {
            name: self.name,
            patterns: self.patterns,
            idents: self.idents,
            overrides: self.overrides,
            filters: self.filters,
            stream_filters: self.stream_filters,
            rule_map: self.rule_map,
            transitions: self.transitions,
            recovery: self.recovery,
        })
    }
}

impl fmt::Debug for GrammarBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarBuilder")
            .field("name", &self.name)
            .field("patterns", &self.patterns.len())
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}

/// Frozen per-language configuration.
pub struct Grammar {
    name: &'static str,
    patterns: PatternTable,
    idents: IdentifierMap,
    overrides: FxHashMap<Kind, Arc<OverrideFn>>,
    filters: Vec<TokenFilter>,
    stream_filters: Vec<StreamFilter>,
    rule_map: FxHashMap<Kind, Option<Kind>>,
    transitions: FxHashMap<Kind, SmallVec<[Kind; 8]>>,
    recovery: FxHashMap<Kind, Pattern>,
}

impl Grammar {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    pub fn idents(&self) -> &IdentifierMap {
        &self.idents
    }

    /// Override registered for `kind`.
    pub fn override_for(&self, kind: Kind) -> Option<Arc<OverrideFn>> {
        self.overrides.get(&kind).cloned()
    }

    /// Per-kind filters for `kind`, in registration order.
    pub fn filters_for(&self, kind: Kind) -> impl Iterator<Item = &TokenFilter> {
        self.filters.iter().filter(move |f| f.kind == kind)
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.filters.iter().filter_map(|f| f.name)
    }

    pub fn stream_filters(&self) -> &[StreamFilter] {
        &self.stream_filters
    }

    pub fn rule_map(&self) -> &FxHashMap<Kind, Option<Kind>> {
        &self.rule_map
    }

    /// Display kind for `kind` after the rule-tag remap.
    pub fn display_kind(&self, kind: Kind) -> Option<Kind> {
        self.rule_map.get(&kind).copied().unwrap_or(Some(kind))
    }

    /// Kinds allowed to start in `state`, `None` when the state has no
    /// explicit transition list.
    pub fn transitions(&self, state: Kind) -> Option<&[Kind]> {
        self.transitions.get(&state).map(SmallVec::as_slice)
    }

    /// Whether `kind` may start while in `state`.
    ///
    /// The initial state allows every kind unless it has an explicit list.
    /// Any other state without a list allows nothing.
    pub fn allows(&self, state: Kind, kind: Kind) -> bool {
        match self.transitions(state) {
            Some(allowed) => allowed.contains(&kind),
            None => state == crate::state::INITIAL,
        }
    }

    /// Recovery pattern for an interrupted `kind`.
    pub fn recovery(&self, kind: Kind) -> Option<&Pattern> {
        self.recovery.get(&kind)
    }
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("name", &self.name)
            .field("patterns", &self.patterns.len())
            .field("idents", &self.idents.len())
            .finish_non_exhaustive()
    }
}
