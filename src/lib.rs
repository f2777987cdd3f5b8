//! # prefix-cover
//!
//! Computes the smallest set of CDN invalidation patterns that covers every
//! changed object key and no unchanged one.
//!
//! Keys are inserted into a compressed trie together with a boolean
//! (`include` for changed, `exclude` for unchanged). A node's value can only
//! be lowered, and lowering it lowers every ancestor, so a node that is still
//! included after all insertions has no excluded key anywhere below it. The
//! topmost included nodes are the cover: a wildcard if the node has children,
//! an exact key otherwise.
//!
//! ## Example
//!
//! ```rust
//! use prefix_cover::PrefixCoverTree;
//!
//! let mut tree = PrefixCoverTree::new();
//! tree.exclude("assets/logo.png").unwrap();
//! tree.include("assets/app.js").unwrap();
//! tree.include("blog/post-1.html").unwrap();
//! tree.include("blog/post-2.html").unwrap();
//!
//! let patterns: Vec<String> = tree.patterns().collect();
//! assert_eq!(patterns, ["/assets/app.js", "/blog/post-*"]);
//! ```

#![forbid(unsafe_code)]

mod error;

pub use error::{Error, Result};

use smallvec::SmallVec;
use tracing::{debug, trace};

// =============================================================================
// Node model
// =============================================================================

/// Index of a node in the tree's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct NodeId(usize);

const ROOT: NodeId = NodeId(0);

/// Children sorted by the first char of their label. The sentinel child has an
/// empty label and sits under `None`, ahead of every other sibling.
type Children = SmallVec<[(Option<char>, NodeId); 4]>;

#[derive(Clone, Debug)]
struct Node {
    label: String,
    value: bool,
    /// The path to this node is a key the caller inserted. Complete nodes are
    /// always leaves.
    complete: bool,
    /// Only ever followed upwards.
    parent: Option<NodeId>,
    children: Children,
}

impl Node {
    fn new(label: String, parent: Option<NodeId>, value: bool, complete: bool) -> Self {
        Self {
            label,
            value,
            complete,
            parent,
            children: Children::new(),
        }
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn child(&self, first: Option<char>) -> Option<NodeId> {
        self.children
            .binary_search_by_key(&first, |&(c, _)| c)
            .ok()
            .map(|i| self.children[i].1)
    }

    #[inline]
    fn sentinel(&self) -> Option<NodeId> {
        self.child(None)
    }
}

#[inline]
fn first_char(s: &str) -> Option<char> {
    s.chars().next()
}

/// Byte length of the longest common prefix of `a` and `b`, always on a char
/// boundary of both.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|&((_, ca), cb)| ca != cb)
        .map_or_else(|| a.len().min(b.len()), |((i, _), _)| i)
}

/// Formats a cover entry as a CDN invalidation path.
///
/// Exact entries become `"/" + prefix`, wildcard entries `"/" + prefix + "*"`.
pub fn invalidation_path(prefix: &str, exact: bool) -> String {
    let mut path = String::with_capacity(prefix.len() + 2);
    path.push('/');
    path.push_str(prefix);
    if !exact {
        path.push('*');
    }
    path
}

// =============================================================================
// Tree
// =============================================================================

/// Radix tree over object keys that yields the minimal covering set of
/// invalidation prefixes.
///
/// Each key should be inserted once, either included or excluded. Including a
/// key that is already excluded fails with [`Error::InvalidTransition`];
/// excluding an included key is allowed and simply downgrades it.
#[derive(Clone)]
pub struct PrefixCoverTree {
    nodes: Vec<Node>,
    count: usize,
}

impl PrefixCoverTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(String::new(), None, true, false)],
            count: 0,
        }
    }

    /// Builds a tree from `(key, included)` pairs, inserted in order.
    pub fn try_from_marks<I, K>(marks: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, bool)>,
        K: AsRef<str>,
    {
        let mut tree = Self::new();
        for (key, value) in marks {
            tree.insert(key.as_ref(), value)?;
        }
        Ok(tree)
    }

    /// Number of distinct keys inserted.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Marks `key` as changed.
    pub fn include(&mut self, key: &str) -> Result<()> {
        self.insert(key, true)
    }

    /// Marks `key` as unchanged.
    pub fn exclude(&mut self, key: &str) -> Result<()> {
        self.insert(key, false)
    }

    /// Inserts `key` with `value` (`true` to include, `false` to exclude).
    pub fn insert(&mut self, key: &str, value: bool) -> Result<()> {
        let mut node = ROOT;
        let mut rest = key;

        loop {
            let Some(first) = first_char(rest) else {
                return self.mark(node, value);
            };

            let Some(child) = self.nodes[node.0].child(Some(first)) else {
                self.detach_key_state(node);
                self.push_node(node, rest, value);
                return Ok(());
            };

            let label_len = self.nodes[child.0].label.len();
            let cp = common_prefix_len(&self.nodes[child.0].label, rest);
            rest = &rest[cp..];

            if cp < label_len {
                self.split(child, cp);
                self.push_node(child, rest, value);
                return Ok(());
            }

            node = child;
        }
    }

    /// Returns the value `key` was inserted with, after any downgrades.
    pub fn value(&self, key: &str) -> Option<bool> {
        self.find(key).map(|id| self.nodes[id.0].value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Iterates over the covering `(prefix, exact)` pairs in ascending order
    /// of prefix.
    pub fn matches(&self) -> Matches<'_> {
        let root = &self.nodes[ROOT.0];
        let stack = if root.is_leaf() && !root.complete {
            Vec::new()
        } else {
            vec![(ROOT, String::new())]
        };
        Matches { tree: self, stack }
    }

    /// Iterates over the cover formatted as invalidation paths.
    pub fn patterns(&self) -> impl Iterator<Item = String> + '_ {
        self.matches()
            .map(|(prefix, exact)| invalidation_path(&prefix, exact))
    }

    /// Iterates over every inserted key with its current value, in ascending
    /// key order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            tree: self,
            stack: vec![(ROOT, String::new())],
        }
    }

    /// Iterates over every inserted key in ascending order, regardless of value.
    pub fn iterate(&self) -> Keys<'_> {
        Keys { inner: self.iter() }
    }

    // -------------------------------------------------------------------------
    // Mutation helpers
    // -------------------------------------------------------------------------

    /// Records `value` for the key that ends exactly at `id`.
    fn mark(&mut self, id: NodeId, value: bool) -> Result<()> {
        if self.nodes[id.0].is_leaf() {
            self.set_value(id, value)?;
            let node = &mut self.nodes[id.0];
            if !node.complete {
                node.complete = true;
                self.count += 1;
            }
            return Ok(());
        }

        // Branch point: the key's own state lives in the sentinel.
        match self.nodes[id.0].sentinel() {
            Some(sentinel) => self.set_value(sentinel, value),
            None => {
                self.push_node(id, "", value);
                Ok(())
            }
        }
    }

    /// The only way a stored value changes. Lowering a value lowers every
    /// ancestor still above it.
    fn set_value(&mut self, id: NodeId, value: bool) -> Result<()> {
        let current = self.nodes[id.0].value;
        if value && !current {
            return Err(Error::InvalidTransition {
                key: self.full_key(id),
            });
        }
        if current && !value {
            self.nodes[id.0].value = value;
            self.propagate(id);
        }
        Ok(())
    }

    fn propagate(&mut self, id: NodeId) {
        let value = self.nodes[id.0].value;
        let mut lowered = 0usize;
        let mut cursor = self.nodes[id.0].parent;
        while let Some(parent) = cursor {
            let ancestor = &mut self.nodes[parent.0];
            if ancestor.value <= value {
                break;
            }
            ancestor.value = value;
            lowered += 1;
            cursor = ancestor.parent;
        }
        if lowered > 0 {
            debug!(key = %self.full_key(id), ancestors = lowered, "downgraded ancestors");
        }
    }

    /// Appends a complete child under `parent`. An empty label makes it the
    /// sentinel.
    fn push_node(&mut self, parent: NodeId, label: &str, value: bool) -> NodeId {
        let id = NodeId(self.nodes.len());
        let first = first_char(label);
        self.nodes
            .push(Node::new(label.to_owned(), Some(parent), value, true));

        let children = &mut self.nodes[parent.0].children;
        let pos = match children.binary_search_by_key(&first, |&(c, _)| c) {
            Ok(_) => unreachable!("sibling labels share a first char"),
            Err(pos) => pos,
        };
        children.insert(pos, (first, id));
        self.count += 1;

        if first.is_none() {
            trace!(key = %self.full_key(id), value, "added sentinel");
        }
        self.propagate(id);
        id
    }

    /// Moves the key state of a complete node into a sentinel child so the
    /// node can take children of its own.
    fn detach_key_state(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.0];
        if !node.complete {
            return;
        }
        debug_assert!(node.is_leaf());
        node.complete = false;
        let value = node.value;
        self.count -= 1;
        self.push_node(id, "", value);
    }

    /// Splits the edge into `id` after `at` bytes. `id` keeps the shared
    /// prefix and becomes structural; a new child takes over the rest of the
    /// label along with the value, completeness and children.
    fn split(&mut self, id: NodeId, at: usize) {
        let tail_id = NodeId(self.nodes.len());

        let node = &mut self.nodes[id.0];
        let tail_label = node.label.split_off(at);
        let mut tail = Node::new(tail_label, Some(id), node.value, node.complete);
        tail.children = std::mem::take(&mut node.children);
        node.complete = false;
        node.children.push((first_char(&tail.label), tail_id));

        let moved = tail.children.clone();
        self.nodes.push(tail);
        for (_, child) in moved {
            self.nodes[child.0].parent = Some(tail_id);
        }

        trace!(
            prefix = %self.full_key(id),
            tail = %self.nodes[tail_id.0].label,
            "split edge"
        );
    }

    // -------------------------------------------------------------------------
    // Lookup helpers
    // -------------------------------------------------------------------------

    /// Finds the complete node holding `key`'s own state.
    fn find(&self, key: &str) -> Option<NodeId> {
        let mut node = ROOT;
        let mut rest = key;
        while let Some(first) = first_char(rest) {
            let child = self.nodes[node.0].child(Some(first))?;
            rest = rest.strip_prefix(self.nodes[child.0].label.as_str())?;
            node = child;
        }
        let n = &self.nodes[node.0];
        if n.complete {
            Some(node)
        } else {
            n.sentinel()
        }
    }

    fn full_key(&self, id: NodeId) -> String {
        let mut labels = Vec::new();
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            labels.push(self.nodes[c.0].label.as_str());
            cursor = self.nodes[c.0].parent;
        }
        labels.into_iter().rev().collect()
    }

    /// Pushes the children of `id` onto a traversal stack so that they pop in
    /// ascending order.
    fn push_children(&self, id: NodeId, key: &str, stack: &mut Vec<(NodeId, String)>) {
        for &(_, child) in self.nodes[id.0].children.iter().rev() {
            let mut child_key = String::with_capacity(key.len() + self.nodes[child.0].label.len());
            child_key.push_str(key);
            child_key.push_str(&self.nodes[child.0].label);
            stack.push((child, child_key));
        }
    }
}

impl Default for PrefixCoverTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PrefixCoverTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// Iterators
// =============================================================================

/// Covering `(prefix, exact)` pairs. See [`PrefixCoverTree::matches`].
pub struct Matches<'a> {
    tree: &'a PrefixCoverTree,
    /// Nodes with their full keys.
    stack: Vec<(NodeId, String)>,
}

impl<'a> Iterator for Matches<'a> {
    type Item = (String, bool);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, key)) = self.stack.pop() {
            let node = &self.tree.nodes[id.0];
            if node.value {
                // Only children of excluded nodes are ever pushed, so this is
                // the topmost included node on its path.
                debug_assert!(node.parent.map_or(true, |p| !self.tree.nodes[p.0].value));
                return Some((key, node.is_leaf()));
            }
            self.tree.push_children(id, &key, &mut self.stack);
        }
        None
    }
}

/// Inserted keys with their values. See [`PrefixCoverTree::iter`].
pub struct Iter<'a> {
    tree: &'a PrefixCoverTree,
    stack: Vec<(NodeId, String)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (String, bool);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, key)) = self.stack.pop() {
            let node = &self.tree.nodes[id.0];
            if node.complete {
                return Some((key, node.value));
            }
            self.tree.push_children(id, &key, &mut self.stack);
        }
        None
    }
}

/// Inserted keys. See [`PrefixCoverTree::iterate`].
pub struct Keys<'a> {
    inner: Iter<'a>,
}

impl<'a> Iterator for Keys<'a> {
    type Item = String;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }
}


#[cfg(test)]
mod proptests;
