//! Diffs: normal, context and unified, told apart by their line markers.
//!
//! The scanner is line based and tags headers, ranges and changed lines
//! itself. Runs of code lines are handled as one block: the markers are cut
//! off, and in pretty mode the remaining source goes through the child
//! scanner picked from the current file's extension. The rendered block is
//! split back into lines and each line gets its marker back, tagged as
//! `DIFF_OLD`, `DIFF_NEW` or `DIFF_UNCHANGED`. Highlighting the block as a
//! whole keeps multi-line tokens intact, since the renderer closes and
//! reopens tags at every newline.

use lumen_scan_core::markup::escape;
use lumen_scan_core::{Kind, Pattern};
use tracing::{debug, warn};

use super::{guess_count, guess_matches};
use crate::{GrammarBuilder, Language, Scan, ScanError, Scanner, ScannerRegistry, SourceBuffer, SourceInfo};

pub const DIFF_RANGE: Kind = Kind::new("DIFF_RANGE");
pub const DIFF_HEADER_OLD: Kind = Kind::new("DIFF_HEADER_OLD");
pub const DIFF_HEADER_NEW: Kind = Kind::new("DIFF_HEADER_NEW");
pub const DIFF_OLD: Kind = Kind::new("DIFF_OLD");
pub const DIFF_NEW: Kind = Kind::new("DIFF_NEW");
pub const DIFF_UNCHANGED: Kind = Kind::new("DIFF_UNCHANGED");

/// No patterns and no filters: the scanner assigns every kind itself.
pub fn grammar() -> GrammarBuilder {
    GrammarBuilder::bare("diff")
}

/// Line-marker convention of a diff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffFormat {
    /// `<` and `>` lines under `1,2c3` ranges.
    Normal,
    /// `***`/`---` sections with `!`, `+` and `-` lines.
    Context,
    /// `@@` hunks with `+` and `-` lines.
    Unified,
}

impl DiffFormat {
    pub fn detect(src: &str) -> Self {
        if guess_matches!(r"(?m)^[<>]", src) {
            DiffFormat::Normal
        } else if guess_matches!(r"(?m)^\*{3}", src) {
            DiffFormat::Context
        } else {
            DiffFormat::Unified
        }
    }
}

#[derive(Debug)]
struct Patterns {
    diff_line: Pattern,
    normal_range: Pattern,
    context_range: Pattern,
    unified_range: Pattern,
    bare_dashes: Pattern,
    keyword: Pattern,
    header: Pattern,
    no_newline: Pattern,
    normal_block: Pattern,
    context_block: Pattern,
    unified_block: Pattern,
    line: Pattern,
}

impl Patterns {
    fn compile() -> Result<Self, ScanError> {
        Ok(Patterns {
            diff_line: Pattern::new(r"diff[ \t].*")?,
            normal_range: Pattern::new(r"\d+.*")?,
            context_range: Pattern::new(r"(?:\*{3}[ \t]+\d+,\d+[ \t]+\*{3}|-{3}[ \t]+\d+,\d+[ \t]+-{3}).*")?,
            unified_range: Pattern::new(r"@@.*")?,
            bare_dashes: Pattern::new(r"(?m)-{3}[ \t]*$")?,
            keyword: Pattern::new(r"(?m)(?:\**|=*|\w.*)$")?,
            header: Pattern::new(r"[+\-*]{3}(?:[ \t]+(\S*))?.*")?,
            no_newline: Pattern::new(r"\\.*")?,
            normal_block: Pattern::new(r"(?m)^[<> ].*(?:\n[<> ].*)*")?,
            context_block: Pattern::new(r"(?m)^[!+\- ].*(?:\n[!+\- ].*)*")?,
            unified_block: Pattern::new(r"(?m)^[+\- ].*(?:\n[+\- ].*)*")?,
            line: Pattern::new(r".*")?,
        })
    }

    fn range(&self, format: DiffFormat) -> &Pattern {
        match format {
            DiffFormat::Normal => &self.normal_range,
            DiffFormat::Context => &self.context_range,
            DiffFormat::Unified => &self.unified_range,
        }
    }

    fn block(&self, format: DiffFormat) -> &Pattern {
        match format {
            DiffFormat::Normal => &self.normal_block,
            DiffFormat::Context => &self.context_block,
            DiffFormat::Unified => &self.unified_block,
        }
    }
}

/// Diff scanner. Pretty mode highlights code lines with child scanners
/// from the registry it was created with.
#[derive(Debug)]
pub struct DiffScanner {
    scanner: Scanner,
    patterns: Patterns,
    format: DiffFormat,
    registry: Option<ScannerRegistry>,
    child: Option<Box<dyn Scan>>,
    /// Inside the second (new) half of a context hunk.
    new_half: bool,
}

impl DiffScanner {
    /// Diff markup only; code is left untagged.
    pub fn plain() -> Result<Self, ScanError> {
        Self::with_registry(None)
    }

    /// Diff markup plus code highlighted per file through `registry`.
    pub fn pretty(registry: ScannerRegistry) -> Result<Self, ScanError> {
        Self::with_registry(Some(registry))
    }

    fn with_registry(registry: Option<ScannerRegistry>) -> Result<Self, ScanError> {
        Ok(DiffScanner {
            scanner: Scanner::new(grammar().build()),
            patterns: Patterns::compile()?,
            format: DiffFormat::Unified,
            registry,
            child: None,
            new_half: false,
        })
    }

    pub fn format(&self) -> DiffFormat {
        self.format
    }

    /// Language code of the current child scanner.
    pub fn child_language(&self) -> Option<&'static str> {
        self.child.as_ref().map(|c| c.language())
    }

    /// Scanner for the file at `path`, by extension.
    fn child_for(&self, path: &str) -> Option<Box<dyn Scan>> {
        let registry = self.registry.as_ref()?;
        let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        let (_, ext) = name.rsplit_once('.')?;
        let child = registry.get(&ext.to_ascii_lowercase()).ok();
        debug!(path, language = child.as_ref().map(|c| c.language()), "diff child scanner");
        child
    }

    fn header_kind(&self, marker: u8) -> Kind {
        let new = match self.format {
            DiffFormat::Context => marker != b'*',
            DiffFormat::Normal | DiffFormat::Unified => marker == b'+',
        };
        if new {
            DIFF_HEADER_NEW
        } else {
            DIFF_HEADER_OLD
        }
    }

    fn line_kind(&self, marker: u8) -> Kind {
        match marker {
            b'+' | b'>' => DIFF_NEW,
            b'-' | b'<' => DIFF_OLD,
            b'!' if self.new_half => DIFF_NEW,
            b'!' => DIFF_OLD,
            _ => DIFF_UNCHANGED,
        }
    }

    /// Header line: `--- path`, `+++ path` or `*** path`. A path switches
    /// the child scanner.
    fn header(&mut self) -> Option<(Option<Kind>, usize)> {
        let data = self.scanner.check(&self.patterns.header)?;
        let marker = self.scanner.text().as_bytes().get(data.start()).copied().unwrap_or(b'-');
        if data.group(1).is_some() {
            let path = data.group_str(self.scanner.text(), 1).to_owned();
            self.child = self.child_for(&path);
        }
        Some((Some(self.header_kind(marker)), data.end()))
    }

    /// Kind and end of the one-line token at the cursor, or `None` at code.
    fn line_token(&mut self) -> Option<(Option<Kind>, usize)> {
        let s = &mut self.scanner;
        let p = &self.patterns;
        if let Some(m) = s.check(&p.diff_line) {
            return Some((Some(Kind::KEYWORD), m.end()));
        }
        if let Some(m) = s.check(p.range(self.format)) {
            self.new_half = s.text().as_bytes().get(m.start()) == Some(&b'-');
            return Some((Some(DIFF_RANGE), m.end()));
        }
        if let Some(m) = s.check(&p.bare_dashes) {
            return Some((None, m.end()));
        }
        if let Some(m) = s.check(&p.keyword) {
            return Some((Some(Kind::KEYWORD), m.end()));
        }
        if let Some(header) = self.header() {
            return Some(header);
        }
        self.scanner.check(&self.patterns.no_newline).map(|m| (None, m.end()))
    }

    /// End of the code block at the cursor. A context block stops in front
    /// of the range line that opens the hunk's second half.
    fn block_end(&mut self) -> Option<usize> {
        let data = self.scanner.check(self.patterns.block(self.format))?;
        if self.format != DiffFormat::Context {
            return Some(data.end());
        }
        let text = self.scanner.text();
        let mut line_start = data.start();
        for line in data.as_str(text).split('\n') {
            if line_start > data.start() && self.patterns.context_range.find(line).is_some_and(|r| r.start == 0) {
                return Some(line_start - 1);
            }
            line_start += line.len() + 1;
        }
        Some(data.end())
    }

    /// Child markup for the code of `lines`, one entry per line.
    fn render_code(&mut self, lines: &[&str]) -> Option<Vec<String>> {
        let child = self.child.as_mut()?;
        let code = lines
            .iter()
            .map(|line| line.get(1..).unwrap_or(""))
            .collect::<Vec<_>>()
            .join("\n");
        match child.highlight(&code) {
            Ok(out) => {
                let rendered: Vec<String> = out.split('\n').map(str::to_owned).collect();
                if rendered.len() == lines.len() {
                    Some(rendered)
                } else {
                    warn!(language = child.language(), "child output lost line structure");
                    None
                }
            }
            Err(err) => {
                warn!(language = child.language(), %err, "child scanner failed");
                None
            }
        }
    }

    /// Record the code lines in `[from, to)`, markers re-attached.
    fn code_block(&mut self, from: usize, to: usize) {
        let block = self.scanner.slice(from..to).to_owned();
        self.scanner.set_pos(to);
        let lines: Vec<&str> = block.split('\n').collect();
        let rendered = self.render_code(&lines);
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                self.scanner.record(None, "\n");
            }
            let (prefix, _) = line.split_at(line.len().min(1));
            let kind = Some(self.line_kind(prefix.bytes().next().unwrap_or(b' ')));
            match rendered.as_ref().and_then(|r| r.get(i)) {
                Some(markup) => self
                    .scanner
                    .record_escaped(kind, format!("{}{markup}", escape(prefix))),
                None => self.scanner.record(kind, *line),
            }
        }
    }
}

impl Scan for DiffScanner {
    fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    fn scanner_mut(&mut self) -> &mut Scanner {
        &mut self.scanner
    }

    fn set_source(&mut self, buf: SourceBuffer) {
        self.format = DiffFormat::detect(buf.as_str());
        self.child = None;
        self.new_half = false;
        self.scanner.set_source(buf);
    }

    #[tracing::instrument(level = "debug", skip_all, fields(language = self.scanner.language()))]
    fn main(&mut self) -> Result<(), ScanError> {
        while !self.scanner.eos() {
            let from = self.scanner.pos();
            if let Some((kind, end)) = self.line_token() {
                self.scanner.record_range(from, end, kind)?;
                self.scanner.set_pos(end);
            } else if let Some(to) = self.block_end() {
                self.code_block(from, to);
            } else {
                let end = self.scanner.check(&self.patterns.line).map_or(from, |m| m.end());
                self.scanner.record_range(from, end, None)?;
                self.scanner.set_pos(end);
            }
            if self.scanner.peek() == Some('\n') {
                self.scanner.get(1);
                self.scanner.record(None, "\n");
            }
            self.scanner.ensure_progress(from, 0)?;
        }
        Ok(())
    }
}

fn guess_diff(src: &str, info: &SourceInfo<'_>) -> f64 {
    let mut p = 0.0;
    if guess_matches!(r"(?m)^-{3}.*[\n\r]+\+{3}", src) {
        p = 0.25;
    }
    if guess_matches!(r"(?m)^@@.*@@", src) {
        p += 0.25;
    }
    if guess_matches!(r"(?m)^(?:index|diff)\b", src) {
        p += 0.10;
    }
    // a tenth of all lines carrying change markers earns the remaining 0.4
    if info.num_lines > 0 {
        #[allow(clippy::cast_precision_loss, reason = "line counts are far below 2^52")]
        let proportion = guess_count!(r"(?m)^[<>+\-!]\s", src) as f64 / info.num_lines as f64;
        p += 4.0 * proportion.min(0.1);
    }
    p
}

impl Language for DiffScanner {
    const CODES: &'static [&'static str] = &["diff", "patch"];
    const DESCRIPTION: &'static str = "Diff";

    fn create(_: &ScannerRegistry) -> Result<Self, ScanError> {
        Self::plain()
    }

    fn guess(src: &str, info: &SourceInfo<'_>) -> f64 {
        guess_diff(src, info)
    }
}

/// Diff with code highlighted by per-file child scanners.
#[derive(Debug)]
pub struct PrettyDiffScanner {
    inner: DiffScanner,
}

impl PrettyDiffScanner {
    pub fn diff(&self) -> &DiffScanner {
        &self.inner
    }
}

impl Scan for PrettyDiffScanner {
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

impl Language for PrettyDiffScanner {
    const CODES: &'static [&'static str] = &["prettydiff", "prettypatch", "diffpretty", "patchpretty"];
    const DESCRIPTION: &'static str = "Diff-Pretty";

    fn create(registry: &ScannerRegistry) -> Result<Self, ScanError> {
        Ok(PrettyDiffScanner {
            inner: DiffScanner::pretty(registry.clone())?,
        })
    }
}
