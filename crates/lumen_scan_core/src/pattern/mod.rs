//! Compiled patterns and the ordered pattern table.
//!
//! Patterns use the `regex` crate, which guarantees linear-time matching.
//! Lookaround is not available; scanners express "what came before" checks
//! through [`Cursor::char_before`](crate::Cursor::char_before) or over the
//! recorded token stream instead.
//!
//! # Priority
//!
//! [`PatternTable::next_match`] returns the entry whose next match starts
//! earliest. When several entries match at the same offset, the one
//! registered first wins. There is no longest-match rule across entries,
//! so grammars register specific patterns before generic fallbacks.

use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};

use regex::Regex;
use smallvec::SmallVec;

use crate::{Cursor, Kind};

static NEXT_PATTERN_ID: AtomicU32 = AtomicU32::new(0);

/// Process-unique identity of a compiled pattern.
///
/// Clones of a [`Pattern`] keep their id, so cursor search caches are
/// shared between them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PatternId(u32);

/// A pattern failed to compile.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid pattern `{pattern}`: {message}")]
pub struct PatternError {
    /// The pattern text as written.
    pub pattern: String,
    /// The regex compiler's explanation.
    pub message: String,
}

/// A compiled matcher.
#[derive(Clone)]
pub struct Pattern {
    id: PatternId,
    regex: Regex,
}

impl Pattern {
    /// Compile `pattern`.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(pattern).map_err(|err| PatternError {
            pattern: pattern.to_owned(),
            message: err.to_string(),
        })?;
        Ok(Pattern {
            id: PatternId(NEXT_PATTERN_ID.fetch_add(1, Ordering::Relaxed)),
            regex,
        })
    }

    /// Compile a pattern matching `literal` exactly.
    pub fn literal(literal: &str) -> Result<Self, PatternError> {
        Self::new(&regex::escape(literal))
    }

    #[inline]
    pub fn id(&self) -> PatternId {
        self.id
    }

    /// The pattern text.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Leftmost match starting at or after `from`.
    ///
    /// Anchors and word boundaries see the text before `from`, so `^` in
    /// multi-line mode and `\b` behave the same as in a whole-text search.
    pub fn find_from(&self, haystack: &str, from: usize) -> Option<MatchData> {
        if from > haystack.len() {
            return None;
        }
        let caps = self.regex.captures_at(haystack, from)?;
        let groups = caps
            .iter()
            .map(|g| g.map(|m| (m.start(), m.end())))
            .collect();
        Some(MatchData { groups })
    }

    /// Whether the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Byte range of the first match in `text`.
    pub fn find(&self, text: &str) -> Option<Range<usize>> {
        self.regex.find(text).map(|m| m.range())
    }

    /// Number of matches in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.regex.find_iter(text).count()
    }

    /// Replace every match in `text`, `$0`/`$1`/... expanding to groups.
    pub fn replace_all(&self, text: &str, replacement: &str) -> String {
        self.regex.replace_all(text, replacement).into_owned()
    }

    /// Replace every match using a closure over the capture groups.
    pub fn replace_all_with<F>(&self, text: &str, mut rewrite: F) -> String
    where
        F: FnMut(&regex::Captures<'_>) -> String,
    {
        self.regex
            .replace_all(text, |caps: &regex::Captures<'_>| rewrite(caps))
            .into_owned()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("id", &self.id.0)
            .field("regex", &self.regex.as_str())
            .finish()
    }
}

/// Byte ranges of a match and its capture groups.
///
/// Owned and detached from the source, so a scanner can hold on to it while
/// mutating itself (recording, moving the cursor).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchData {
    /// Group 0 is always present.
    groups: SmallVec<[Option<(usize, usize)>; 4]>,
}

impl MatchData {
    /// A group-less match covering `range`.
    pub fn from_range(range: Range<usize>) -> Self {
        let mut groups = SmallVec::new();
        groups.push(Some((range.start, range.end)));
        MatchData { groups }
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.groups[0].map_or(0, |(s, _)| s)
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.groups[0].map_or(0, |(_, e)| e)
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    /// Length of the whole match in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of groups, including group 0.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Range of capture group `index`, `None` if it did not participate.
    pub fn group(&self, index: usize) -> Option<Range<usize>> {
        self.groups.get(index).copied().flatten().map(|(s, e)| s..e)
    }

    /// Text of the whole match within `source`.
    pub fn as_str<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.range()).unwrap_or("")
    }

    /// Text of group `index` within `source`; `""` when it did not
    /// participate.
    pub fn group_str<'s>(&self, source: &'s str, index: usize) -> &'s str {
        self.group(index)
            .and_then(|r| source.get(r))
            .unwrap_or("")
    }
}

/// One registered `(kind, pattern, end?)` entry.
#[derive(Clone, Debug)]
pub struct PatternEntry {
    pub kind: Kind,
    pub pattern: Pattern,
    /// Closing pattern for open/close delimited constructs.
    pub end: Option<Pattern>,
}

/// Result of [`PatternTable::next_match`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NextMatch {
    pub kind: Kind,
    /// Index of the winning entry in registration order.
    pub entry: usize,
    pub data: MatchData,
}

/// Ordered collection of pattern entries.
#[derive(Clone, Debug, Default)]
pub struct PatternTable {
    entries: Vec<PatternEntry>,
}

impl PatternTable {
    pub fn new() -> Self {
        PatternTable::default()
    }

    /// Append an entry. Earlier entries win ties.
    pub fn register(&mut self, kind: Kind, pattern: Pattern, end: Option<Pattern>) {
        self.entries.push(PatternEntry { kind, pattern, end });
    }

    /// Remove every entry producing `kind`. Returns how many were removed.
    pub fn remove(&mut self, kind: Kind) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.kind != kind);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PatternEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&PatternEntry> {
        self.entries.get(index)
    }

    /// Entries producing `kind`, in registration order.
    pub fn entries_for(&self, kind: Kind) -> impl Iterator<Item = &PatternEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    /// Nearest upcoming match of any entry, searching forward from the
    /// cursor. Does not move the cursor.
    pub fn next_match(&self, cursor: &mut Cursor) -> Option<NextMatch> {
        let target = cursor.pos();
        let mut best: Option<NextMatch> = None;
        for (index, entry) in self.entries.iter().enumerate() {
            let Some(data) = cursor.search(&entry.pattern) else {
                continue;
            };
            let start = data.start();
            if best.as_ref().map_or(true, |b| start < b.data.start()) {
                best = Some(NextMatch {
                    kind: entry.kind,
                    entry: index,
                    data,
                });
                if start == target {
                    break;
                }
            }
        }
        best
    }
}
