//! Scan position over a shared [`SourceBuffer`].
//!
//! The cursor owns an index into immutable text. Matching is always
//! anchored: [`Cursor::scan`] and [`Cursor::check`] only succeed when a
//! pattern matches exactly at the current offset. Forward searching
//! ([`Cursor::search`], [`Cursor::index`], [`Cursor::get_next`]) finds the
//! nearest upcoming match without moving.
//!
//! # Search Cache
//!
//! A forward search from `p0` that found a match at `s0` also answers every
//! search from `p` with `p0 <= p <= s0`: no match starts in `[p0, s0)`, and
//! leftmost-first semantics pick the same match at `s0`. A search that
//! found nothing stays empty for every later position. The cursor keeps
//! one such entry per pattern, which keeps repeated dispatch over the same
//! table close to linear in the input length.
//!
//! # Match History
//!
//! Each successful `scan` (and each accepted forward match) is logged with
//! the offset it started from. [`Cursor::unscan`] rewinds to that offset
//! and drops the entry; two entries are kept, so two consecutive unscans
//! are possible.

use std::ops::Range;

use rustc_hash::FxHashMap;

use crate::{MatchData, Pattern, PatternId, SourceBuffer};

#[derive(Clone, Debug)]
struct LoggedMatch {
    /// Offset the cursor rewinds to on unscan.
    index: usize,
    data: MatchData,
}

#[derive(Clone, Debug)]
struct CachedSearch {
    from: usize,
    found: Option<MatchData>,
}

/// Position and match state for one scanner.
#[derive(Clone, Debug)]
pub struct Cursor {
    buf: SourceBuffer,
    pos: usize,
    history: [Option<LoggedMatch>; 2],
    cache: FxHashMap<PatternId, CachedSearch>,
}

impl Cursor {
    /// Create a cursor at the start of `buf`.
    pub fn new(buf: SourceBuffer) -> Self {
        Cursor {
            buf,
            pos: 0,
            history: [None, None],
            cache: FxHashMap::default(),
        }
    }

    /// Point the cursor at a new buffer and rewind to its start.
    pub fn set_source(&mut self, buf: SourceBuffer) {
        self.buf = buf;
        self.reset();
    }

    #[inline]
    pub fn source(&self) -> &SourceBuffer {
        &self.buf
    }

    /// The full source text.
    #[inline]
    pub fn text(&self) -> &str {
        self.buf.as_str()
    }

    /// Substring of the source, clamped.
    #[inline]
    pub fn slice(&self, range: Range<usize>) -> &str {
        self.buf.slice(range)
    }

    // === Position ===

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Move to `pos`, clamped to the buffer and snapped back to a char
    /// boundary.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = self.buf.floor_char_boundary(pos);
    }

    /// Move forward by `offset` bytes.
    pub fn pos_shift(&mut self, offset: usize) {
        self.set_pos(self.pos.saturating_add(offset));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// End of source reached.
    #[inline]
    pub fn eos(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// At the beginning of a line.
    pub fn bol(&self) -> bool {
        self.pos == 0 || self.text().as_bytes().get(self.pos - 1) == Some(&b'\n')
    }

    /// At the end of a line or of the source.
    pub fn eol(&self) -> bool {
        self.eos() || self.text().as_bytes().get(self.pos) == Some(&b'\n')
    }

    /// Everything from the cursor to the end.
    pub fn rest(&self) -> &str {
        self.slice(self.pos..self.buf.len())
    }

    /// Rewind to the start, clearing match history and search cache.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.history = [None, None];
        self.cache.clear();
    }

    /// Jump to the end of the source. The driving loop sees EOS and stops.
    pub fn terminate(&mut self) {
        self.reset();
        self.pos = self.buf.len();
    }

    // === Peek / Get ===

    /// Next char, without consuming.
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Next `n` chars (fewer at EOS), without consuming.
    pub fn peek_n(&self, n: usize) -> &str {
        let rest = self.rest();
        let end = rest.char_indices().nth(n).map_or(rest.len(), |(i, _)| i);
        &rest[..end]
    }

    /// The char immediately before the cursor.
    pub fn char_before(&self) -> Option<char> {
        self.slice(0..self.pos).chars().next_back()
    }

    /// Consume and return the next `n` chars unconditionally.
    pub fn get(&mut self, n: usize) -> String {
        let taken = self.peek_n(n).to_owned();
        self.pos += taken.len();
        taken
    }

    // === Anchored Matching ===

    /// Match `pattern` exactly at the cursor and advance past it.
    ///
    /// On failure the cursor does not move and nothing is logged.
    pub fn scan(&mut self, pattern: &Pattern) -> Option<MatchData> {
        let data = self.check(pattern)?;
        self.accept(&data);
        Some(data)
    }

    /// Match `pattern` exactly at the cursor without moving or logging.
    pub fn check(&mut self, pattern: &Pattern) -> Option<MatchData> {
        let data = self.search(pattern)?;
        (data.start() == self.pos).then_some(data)
    }

    /// Consume everything up to (not including) the next match of
    /// `pattern`. Logs the skipped range as the match.
    pub fn scan_until(&mut self, pattern: &Pattern) -> Option<MatchData> {
        let found = self.search(pattern)?;
        let skipped = MatchData::from_range(self.pos..found.start());
        self.log(self.pos, skipped.clone());
        self.pos = found.start();
        Some(skipped)
    }

    /// Log `data` as the latest match and move to its end.
    ///
    /// Used to consume a match found by forward search, e.g. from
    /// [`PatternTable::next_match`](crate::PatternTable::next_match).
    pub fn accept(&mut self, data: &MatchData) {
        self.log(data.start(), data.clone());
        self.set_pos(data.end());
    }

    /// Rewind to where the latest logged match started.
    ///
    /// Returns `false` (and does nothing) if the history is empty.
    pub fn unscan(&mut self) -> bool {
        let Some(latest) = self.history[0].take() else {
            return false;
        };
        self.pos = latest.index;
        self.history[0] = self.history[1].take();
        true
    }

    fn log(&mut self, index: usize, data: MatchData) {
        self.history[1] = self.history[0].take();
        self.history[0] = Some(LoggedMatch { index, data });
    }

    // === Last Match ===

    /// The latest logged match.
    pub fn last_match(&self) -> Option<&MatchData> {
        self.history[0].as_ref().map(|m| &m.data)
    }

    /// Text of the latest logged match.
    pub fn matched(&self) -> Option<&str> {
        self.last_match().map(|m| m.as_str(self.buf.as_str()))
    }

    /// Text of group `index` of the latest logged match.
    pub fn match_group(&self, index: usize) -> Option<&str> {
        let data = self.last_match()?;
        data.group(index).map(|r| self.slice(r))
    }

    /// Start offset of the latest logged match.
    pub fn match_pos(&self) -> Option<usize> {
        self.last_match().map(MatchData::start)
    }

    // === Forward Search ===

    /// Nearest match of `pattern` at or after the cursor. Does not move.
    pub fn search(&mut self, pattern: &Pattern) -> Option<MatchData> {
        let pos = self.pos;
        if let Some(cached) = self.cache.get(&pattern.id()) {
            if cached.from <= pos {
                match &cached.found {
                    None => return None,
                    Some(data) if data.start() >= pos => return Some(data.clone()),
                    Some(_) => {}
                }
            }
        }
        let found = pattern.find_from(self.buf.as_str(), pos);
        self.cache.insert(
            pattern.id(),
            CachedSearch {
                from: pos,
                found: found.clone(),
            },
        );
        found
    }

    /// Offset of the next match of `pattern`.
    pub fn index(&mut self, pattern: &Pattern) -> Option<usize> {
        self.search(pattern).map(|m| m.start())
    }

    /// Earliest upcoming match among `patterns`, with its index in the
    /// slice. Ties go to the earlier pattern.
    pub fn get_next(&mut self, patterns: &[&Pattern]) -> Option<(usize, MatchData)> {
        let mut best: Option<(usize, MatchData)> = None;
        for (i, pattern) in patterns.iter().enumerate() {
            let Some(data) = self.search(pattern) else {
                continue;
            };
            if best.as_ref().map_or(true, |(_, b)| data.start() < b.start()) {
                let at_cursor = data.start() == self.pos;
                best = Some((i, data));
                if at_cursor {
                    break;
                }
            }
        }
        best
    }
}
