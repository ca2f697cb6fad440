//! Region stack.
//!
//! A region is an open construct the scanner is currently inside: a CSS
//! block, a Perl `q{...}` string, a BNF option group. Regions nest, and the
//! innermost one is the current state.

use lumen_scan_core::{Kind, Pattern};
use smallvec::SmallVec;

use crate::ScanError;

/// Name of the implicit root state.
pub const INITIAL: Kind = Kind::new("initial");

/// One open region.
#[derive(Clone, Debug)]
pub struct Region {
    pub name: Kind,
    /// Text of the opening delimiter.
    pub open: String,
    /// Pattern that closes the region, if it has a fixed one.
    pub close: Option<Pattern>,
    /// Whether interpolation is active inside the region.
    pub interpolation: bool,
    /// Byte offset the region opened at.
    pub start: usize,
    /// Language-defined extra tag, e.g. the kind the region records as.
    pub extra: Option<Kind>,
}

impl Region {
    pub fn new(name: Kind, start: usize) -> Self {
        Region {
            name,
            open: String::new(),
            close: None,
            interpolation: false,
            start,
            extra: None,
        }
    }

    #[must_use]
    pub fn with_open(mut self, open: impl Into<String>) -> Self {
        self.open = open.into();
        self
    }

    #[must_use]
    pub fn with_close(mut self, close: Option<Pattern>) -> Self {
        self.close = close;
        self
    }

    #[must_use]
    pub fn with_interpolation(mut self, interpolation: bool) -> Self {
        self.interpolation = interpolation;
        self
    }

    #[must_use]
    pub fn with_extra(mut self, extra: Kind) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// Stack of open regions, innermost last.
#[derive(Clone, Debug, Default)]
pub struct StateStack {
    regions: SmallVec<[Region; 4]>,
}

impl StateStack {
    pub fn new() -> Self {
        StateStack::default()
    }

    pub fn push(&mut self, region: Region) {
        self.regions.push(region);
    }

    pub fn pop(&mut self) -> Result<Region, ScanError> {
        self.regions.pop().ok_or(ScanError::EmptyStateStack)
    }

    /// The innermost region.
    pub fn top(&self) -> Option<&Region> {
        self.regions.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Region> {
        self.regions.last_mut()
    }

    /// Name of the innermost region, [`INITIAL`] when empty.
    pub fn name(&self) -> Kind {
        self.top().map_or(INITIAL, |r| r.name)
    }

    pub fn depth(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Regions from innermost to outermost.
    pub fn innermost_first(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter().rev()
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }
}
