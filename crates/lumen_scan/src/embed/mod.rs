//! Embedding options and child-scanner delegation.
//!
//! A host scanner owns its children. They are created once and share the
//! host's source buffer, so offsets line up across the boundary and a child
//! interrupted mid-token keeps its state until the host hands control back.

use bitflags::bitflags;
use tracing::trace;

use lumen_scan_core::{Kind, SourceBuffer};

use crate::{Scan, ScanError, Scanner};

bitflags! {
    /// Where a scanner is embedded.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct EmbedFlags: u8 {
        /// Inside an HTML document: stop at the closing script/style tag.
        const HTML = 1 << 0;
        /// Inside a server-side language: break at its opening tag.
        const SERVER = 1 << 1;
    }
}

/// Embedding configuration for a scanner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmbedOptions {
    pub flags: EmbedFlags,
    /// Opening tag of the server language.
    pub server_tag: &'static str,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        EmbedOptions {
            flags: EmbedFlags::empty(),
            server_tag: "<?",
        }
    }
}

impl EmbedOptions {
    pub fn new(flags: EmbedFlags) -> Self {
        EmbedOptions {
            flags,
            ..EmbedOptions::default()
        }
    }

    pub fn in_html(&self) -> bool {
        self.flags.contains(EmbedFlags::HTML)
    }

    pub fn in_server(&self) -> bool {
        self.flags.contains(EmbedFlags::SERVER)
    }
}

struct Binding {
    name: &'static str,
    scanner: Box<dyn Scan>,
    /// Host offset after which the interrupted child must be resumed.
    resume_at: Option<usize>,
}

/// Named child scanners of one host.
#[derive(Default)]
pub struct Children {
    bindings: Vec<Binding>,
}

impl std::fmt::Debug for Children {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.bindings.iter().map(|b| (b.name, b.resume_at)))
            .finish()
    }
}

impl Children {
    pub fn new() -> Self {
        Children::default()
    }

    /// Register `scanner` under `name`, replacing any previous binding.
    pub fn add(&mut self, name: &'static str, scanner: Box<dyn Scan>) {
        self.bindings.retain(|b| b.name != name);
        self.bindings.push(Binding {
            name,
            scanner,
            resume_at: None,
        });
    }

    pub fn get(&self, name: &str) -> Option<&dyn Scan> {
        self.bindings
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.scanner.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn Scan + 'static)> {
        self.bindings
            .iter_mut()
            .find(|b| b.name == name)
            .map(|b| b.scanner.as_mut())
    }

    /// Point every child at `buf` and clear pending resumptions.
    pub fn set_source(&mut self, buf: &SourceBuffer) {
        for b in &mut self.bindings {
            b.scanner.set_source(buf.clone());
            b.resume_at = None;
        }
    }

    /// The interrupted child whose resumption point the host has passed.
    pub fn resume_due(&self, pos: usize) -> Option<&'static str> {
        self.bindings
            .iter()
            .find(|b| b.resume_at.is_some_and(|at| at < pos))
            .map(|b| b.name)
    }

    /// Name and offset of any pending resumption.
    pub fn pending(&self) -> Option<(&'static str, usize)> {
        self.bindings
            .iter()
            .find_map(|b| b.resume_at.map(|at| (b.name, at)))
    }
}

/// Run child `name` from the host's position and splice its output.
///
/// The child's rendered markup is recorded in the host as one escaped token
/// (wrapped in `wrap` when given), and the host moves to where the child
/// stopped. Returns whether the child was interrupted; if so, it is due for
/// resumption once the host moves past the current offset.
pub fn delegate(
    host: &mut Scanner,
    children: &mut Children,
    name: &'static str,
    wrap: Option<Kind>,
) -> Result<bool, ScanError> {
    let binding = children
        .bindings
        .iter_mut()
        .find(|b| b.name == name)
        .ok_or(ScanError::UnknownChild { name })?;
    let child = binding.scanner.as_mut();
    let from = host.pos();
    child.set_pos(from);
    child.main()?;
    let out = child.tagged();
    host.record_escaped(wrap, out);
    let to = child.pos().max(from);
    host.set_pos(to);
    let interrupted = child.interrupted();
    binding.resume_at = interrupted.then_some(to);
    trace!(host = host.language(), child = name, from, to, interrupted, "delegate");
    Ok(interrupted)
}

#[cfg(test)]
mod tests;
