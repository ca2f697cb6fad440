//! Token-tree scanner.
//!
//! Grammar entries are `(kind, open, end?)` rules. In each state only the
//! kinds listed in the grammar's transition table may start (the initial
//! state allows every kind unless it lists its own). Each step compares the
//! nearest legal start with the nearest end of the current region:
//!
//! - a start at or before the end wins: the text before it is recorded,
//!   then the rule's override runs, or a node for the rule is pushed (and
//!   popped straight away when the rule has no end pattern);
//! - otherwise the region is closed: text through the end match is
//!   recorded and the node popped;
//! - with neither, the rest of the source is recorded and scanning stops.
//!
//! Regions still open at EOS are popped. Rendering collapses the tree:
//! children render first, then the node's rule-map and per-kind filters
//! apply to the escaped text, and the result is tagged.

use std::sync::Arc;

use lumen_scan_core::{Kind, MatchData, SourceBuffer, Token};

use crate::scanner::render_into;
use crate::state::Region;
use crate::{Grammar, Scan, ScanError, Scanner};

#[derive(Clone, Debug)]
enum Node {
    /// Raw source text.
    Text(String),
    /// Pre-rendered markup.
    Markup(String),
    Branch(TokenNode),
}

#[derive(Clone, Debug)]
struct TokenNode {
    kind: Option<Kind>,
    children: Vec<Node>,
}

impl TokenNode {
    fn new(kind: Option<Kind>) -> Self {
        TokenNode {
            kind,
            children: Vec::new(),
        }
    }
}

// Deep trees would overflow the stack with the derived recursive drop.
impl Drop for TokenNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(node) = pending.pop() {
            if let Node::Branch(mut branch) = node {
                pending.append(&mut branch.children);
            }
        }
    }
}

/// Open-node stack of a token tree under construction. The bottom entry is
/// the untagged root.
#[derive(Clone, Debug)]
pub(crate) struct TokenTree {
    stack: Vec<TokenNode>,
}

impl TokenTree {
    pub(crate) fn new() -> Self {
        TokenTree {
            stack: vec![TokenNode::new(None)],
        }
    }

    /// Open a child node of the current node.
    pub(crate) fn push(&mut self, kind: Option<Kind>) {
        self.stack.push(TokenNode::new(kind));
    }

    /// Close the current node. Returns `false` at the root.
    pub(crate) fn pop(&mut self) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        let Some(node) = self.stack.pop() else {
            return false;
        };
        if let Some(parent) = self.stack.last_mut() {
            parent.children.push(Node::Branch(node));
        }
        true
    }

    /// Append text to the current node, as its own `kind` node when given.
    pub(crate) fn record(&mut self, kind: Option<Kind>, text: String, escaped: bool) {
        if text.is_empty() {
            return;
        }
        let leaf = if escaped {
            Node::Markup(text)
        } else {
            Node::Text(text)
        };
        match kind {
            Some(kind) => {
                let mut node = TokenNode::new(Some(kind));
                node.children.push(leaf);
                self.current().children.push(Node::Branch(node));
            }
            None => self.current().children.push(leaf),
        }
    }

    fn current(&mut self) -> &mut TokenNode {
        if self.stack.is_empty() {
            self.stack.push(TokenNode::new(None));
        }
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// Close every open node and render the tree through `scanner`'s
    /// grammar.
    pub(crate) fn collapse(mut self, scanner: &Scanner) -> String {
        while self.pop() {}
        let Some(root) = self.stack.pop() else {
            return String::new();
        };
        collapse_node(root, scanner)
    }
}

/// A node being rendered: its remaining children and the markup so far.
struct Frame {
    kind: Option<Kind>,
    children: std::vec::IntoIter<Node>,
    text: String,
}

impl Frame {
    fn new(mut node: TokenNode) -> Self {
        Frame {
            kind: node.kind,
            children: std::mem::take(&mut node.children).into_iter(),
            text: String::new(),
        }
    }
}

/// Render a tree bottom-up with an explicit frame stack, so nesting depth is
/// bounded by the heap rather than the call stack.
fn collapse_node(root: TokenNode, scanner: &Scanner) -> String {
    let mut frames = vec![Frame::new(root)];
    while let Some(frame) = frames.last_mut() {
        match frame.children.next() {
            Some(Node::Text(raw)) => lumen_scan_core::markup::escape_into(&mut frame.text, &raw),
            Some(Node::Markup(markup)) => frame.text.push_str(&markup),
            Some(Node::Branch(branch)) => frames.push(Frame::new(branch)),
            None => {
                let Some(done) = frames.pop() else {
                    break;
                };
                let out = render_node(done.kind, done.text, scanner);
                match frames.last_mut() {
                    Some(parent) => parent.text.push_str(&out),
                    None => return out,
                }
            }
        }
    }
    String::new()
}

/// Tag a node's rendered children with its display kind and filters.
fn render_node(kind: Option<Kind>, text: String, scanner: &Scanner) -> String {
    let Some(kind) = kind else {
        return text;
    };
    let grammar = scanner.grammar();
    let mut token = Token::escaped(grammar.display_kind(kind), text);
    let ctx = scanner.filter_context();
    for filter in grammar.filters_for(kind) {
        token = (filter.apply)(token, &ctx);
    }
    let mut out = String::new();
    render_into(&mut out, token);
    out
}

/// Nearest start among the rules legal in `state`; ties go to the rule
/// registered first.
fn next_start(scanner: &mut Scanner, grammar: &Grammar, state: Kind) -> Option<(usize, MatchData)> {
    let mut best: Option<(usize, MatchData)> = None;
    for (index, entry) in grammar.patterns().entries().iter().enumerate() {
        if !grammar.allows(state, entry.kind) {
            continue;
        }
        let Some(data) = scanner.search(&entry.pattern) else {
            continue;
        };
        if best.as_ref().map_or(true, |(_, b)| data.start() < b.start()) {
            let at_cursor = data.start() == scanner.pos();
            best = Some((index, data));
            if at_cursor {
                break;
            }
        }
    }
    best
}

/// Drive a token-tree scanner to EOS.
#[tracing::instrument(level = "debug", skip_all, fields(language = scanner.language()))]
pub fn run(scanner: &mut Scanner) -> Result<(), ScanError> {
    let grammar = Arc::clone(scanner.grammar());
    while !scanner.eos() {
        let from = scanner.pos();
        let depth = scanner.depth();
        let state = scanner.state_name();

        let start = next_start(scanner, &grammar, state);
        let close = scanner.state().and_then(|r| r.close.clone());
        let end = match close {
            Some(close) => scanner.search(&close),
            None => None,
        };

        match (start, end) {
            (Some((index, data)), end) if end.as_ref().map_or(true, |e| data.start() <= e.start()) => {
                scanner.record_range(from, data.start(), None)?;
                scanner.set_pos(data.start());
                let Some(entry) = grammar.patterns().get(index) else {
                    continue;
                };
                if let Some(handler) = grammar.override_for(entry.kind) {
                    handler(scanner, &data)?;
                } else {
                    let text = scanner.match_str(&data).to_owned();
                    scanner.set_pos(data.end());
                    scanner.push_state(
                        Region::new(entry.kind, data.start())
                            .with_open(text.clone())
                            .with_close(entry.end.clone()),
                    );
                    scanner.record(None, text);
                    if entry.end.is_none() {
                        scanner.pop_state()?;
                    }
                }
            }
            (_, Some(end)) => {
                let pos = scanner.pos();
                scanner.record_range(pos, end.end(), None)?;
                scanner.set_pos(end.end());
                scanner.pop_state()?;
            }
            (_, None) => {
                scanner.record_rest(None);
                break;
            }
        }
        scanner.ensure_progress(from, depth)?;
    }
    while scanner.depth() > 0 {
        scanner.pop_state()?;
    }
    Ok(())
}

/// Scanner driven by [`run`] over a frozen grammar.
#[derive(Debug)]
pub struct StatefulScanner {
    scanner: Scanner,
}

impl StatefulScanner {
    pub fn new(grammar: Arc<Grammar>) -> Self {
        StatefulScanner {
            scanner: Scanner::with_tree(grammar),
        }
    }
}

impl Scan for StatefulScanner {
    fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    fn scanner_mut(&mut self) -> &mut Scanner {
        &mut self.scanner
    }

    fn main(&mut self) -> Result<(), ScanError> {
        run(&mut self.scanner)
    }

    fn set_source(&mut self, buf: SourceBuffer) {
        self.scanner.set_source(buf);
    }
}
