//! The persistent B+Tree of leaves.
//!
//! [`Inner`] plays the role spec.md splits into `InnerLeaf`/`InnerInner`:
//! the `children` field tags which variant a given node is (`Leaves` for an
//! `InnerLeaf`, `Inners` for an `InnerInner`), and every node caches `size`,
//! `known_size`, and the set of bunches reachable beneath it.
//!
//! Nodes are immutable and reference-counted (`Rc`, not `Arc` — see
//! `SPEC_FULL.md` §5 on why this crate does not claim `Send`/`Sync`).
//! Mutators never edit a node in place; `replace_leaf` below allocates a
//! fresh spine from the affected leaf to the root and reuses every
//! untouched sibling subtree by reference, the same copy-on-write shape as
//! the teacher's `patch::branch` rewrite-on-insert, generalized from a
//! fixed-arity byte trie to an order-statistic tree with explicit
//! splitting.

use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

use crate::leaf::Leaf;

/// Maximum number of children of any inner node.
pub const M: usize = 8;

/// The two nesting variants of an inner node: children are leaves, or
/// children are themselves inner nodes of uniform height.
#[derive(Debug, Clone)]
pub enum Children {
    Leaves(Vec<Rc<Leaf>>),
    Inners(Vec<Rc<Inner>>),
}

/// An inner tree node, caching the aggregates mutators and accessors need
/// so they never have to walk a whole subtree to answer `size`,
/// `known_size`, or "might this subtree contain bunch X".
#[derive(Debug, Clone)]
pub struct Inner {
    pub children: Children,
    pub size: u64,
    pub known_size: u64,
    /// Bunches reachable beneath this node. Purely a pruning aid for
    /// `locate`: even if it were wrong in the over-inclusive direction,
    /// `locate` still produces the right answer (leaf-level checks are
    /// exact) — it would just stop pruning. It must never be
    /// under-inclusive, which the fold in `from_leaves`/`from_inners`
    /// guarantees.
    pub bunches: Rc<HashSet<Arc<str>>>,
}

impl Inner {
    pub fn from_leaves(leaves: Vec<Rc<Leaf>>) -> Self {
        let size = leaves.iter().map(|l| l.size()).sum();
        let known_size = leaves.iter().map(|l| l.known_size()).sum();
        let bunches = leaves.iter().map(|l| l.bunch.clone()).collect();
        Inner {
            children: Children::Leaves(leaves),
            size,
            known_size,
            bunches: Rc::new(bunches),
        }
    }

    pub fn from_inners(inners: Vec<Rc<Inner>>) -> Self {
        let size = inners.iter().map(|n| n.size).sum();
        let known_size = inners.iter().map(|n| n.known_size).sum();
        let mut bunches = HashSet::new();
        for n in &inners {
            bunches.extend(n.bunches.iter().cloned());
        }
        Inner {
            children: Children::Inners(inners),
            size,
            known_size,
            bunches: Rc::new(bunches),
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.children {
            Children::Leaves(l) => l.is_empty(),
            Children::Inners(i) => i.is_empty(),
        }
    }

    fn first_leaf(&self) -> Option<&Rc<Leaf>> {
        match &self.children {
            Children::Leaves(leaves) => leaves.first(),
            Children::Inners(inners) => inners.first().and_then(|n| n.first_leaf()),
        }
    }

    fn last_leaf(&self) -> Option<&Rc<Leaf>> {
        match &self.children {
            Children::Leaves(leaves) => leaves.last(),
            Children::Inners(inners) => inners.last().and_then(|n| n.last_leaf()),
        }
    }
}

/// The leftmost known identifier under `node`, i.e. `(bunch, startCounter)`.
pub fn first_id_of(node: &Rc<Inner>) -> Option<(Arc<str>, u64)> {
    node.first_leaf().map(|l| (l.bunch.clone(), l.start))
}

/// The rightmost known identifier under `node`, i.e.
/// `(bunch, startCounter + count - 1)`.
pub fn last_id_of(node: &Rc<Inner>) -> Option<(Arc<str>, u64)> {
    node.last_leaf().map(|l| (l.bunch.clone(), l.end() - 1))
}

/// A located leaf together with the root-to-leaf indices `locate` walked
/// through, in root-first order. `indices.len()` is the tree height.
#[derive(Debug, Clone)]
pub struct Path {
    pub indices: Vec<usize>,
    pub leaf: Rc<Leaf>,
}

/// Searches the tree rooted at `node` for the unique leaf whose `bunch`
/// equals `bunch` and whose range contains `counter`.
pub fn locate(node: &Rc<Inner>, bunch: &str, counter: u64) -> Option<Path> {
    match &node.children {
        Children::Leaves(leaves) => {
            for (i, leaf) in leaves.iter().enumerate() {
                if leaf.bunch.as_ref() == bunch && leaf.covers(counter) {
                    return Some(Path {
                        indices: vec![i],
                        leaf: leaf.clone(),
                    });
                }
            }
            None
        }
        Children::Inners(inners) => {
            for (i, child) in inners.iter().enumerate() {
                if !child.bunches.contains(bunch) {
                    continue;
                }
                if let Some(mut path) = locate(child, bunch, counter) {
                    path.indices.insert(0, i);
                    return Some(path);
                }
            }
            None
        }
    }
}

/// Splices `replacement` into `children` at `at` (replacing the single
/// existing element there), then, if the result overflows [`M`], splits it
/// into two halves — the right half one larger than the left for odd
/// lengths, per spec.md §4.4. Returns 0, 1, or 2 groups.
fn splice_and_maybe_split<T>(mut children: Vec<T>, at: usize, replacement: Vec<T>) -> Vec<Vec<T>> {
    children.splice(at..=at, replacement);
    if children.is_empty() {
        Vec::new()
    } else if children.len() <= M {
        vec![children]
    } else {
        let left_len = children.len() / 2;
        let right = children.split_off(left_len);
        vec![children, right]
    }
}

fn replace_rec(node: &Rc<Inner>, indices: &[usize], new_leaves: &[Rc<Leaf>]) -> Vec<Rc<Inner>> {
    match &node.children {
        Children::Leaves(leaves) => {
            debug_assert_eq!(indices.len(), 1);
            let groups = splice_and_maybe_split(leaves.clone(), indices[0], new_leaves.to_vec());
            groups.into_iter().map(|g| Rc::new(Inner::from_leaves(g))).collect()
        }
        Children::Inners(inners) => {
            let child_fragments = replace_rec(&inners[indices[0]], &indices[1..], new_leaves);
            let groups = splice_and_maybe_split(inners.clone(), indices[0], child_fragments);
            groups.into_iter().map(|g| Rc::new(Inner::from_inners(g))).collect()
        }
    }
}

/// Rewrites the tree rooted at `root`, replacing the leaf reached by
/// `path.indices` with `new_leaves` (0 to 3 leaves), and returns the new
/// root. This is the single primitive behind every mutator: insertion
/// (1→2 or 1→3), in-place tombstone/untombstone updates (1→1), and
/// `uninsert` removal (1→0, 1→1, or 1→2), cascading empty-parent removal
/// and root-height growth/shrink as needed.
pub fn replace_leaf(root: &Rc<Inner>, path: &Path, new_leaves: Vec<Rc<Leaf>>) -> Rc<Inner> {
    let fragments = replace_rec(root, &path.indices, &new_leaves);
    match fragments.len() {
        0 => Rc::new(Inner::from_leaves(Vec::new())),
        1 => fragments.into_iter().next().unwrap(),
        2 => Rc::new(Inner::from_inners(fragments)),
        _ => unreachable!("a single replacement never fragments a node into more than two"),
    }
}

/// Builds a balanced M-ary tree over `leaves` in O(n), by chunking leaves
/// into groups of at most [`M`], then chunking those groups, and so on
/// until a single root remains. Only the rightmost branch at each level can
/// be underfull, matching spec.md §4.8.
pub fn build_balanced(leaves: Vec<Rc<Leaf>>) -> Rc<Inner> {
    if leaves.is_empty() {
        return Rc::new(Inner::from_leaves(Vec::new()));
    }
    let mut level: Vec<Rc<Inner>> = leaves
        .chunks(M)
        .map(|chunk| Rc::new(Inner::from_leaves(chunk.to_vec())))
        .collect();
    while level.len() > 1 {
        level = level
            .chunks(M)
            .map(|chunk| Rc::new(Inner::from_inners(chunk.to_vec())))
            .collect();
    }
    level.into_iter().next().unwrap()
}

/// Depth-first, in-order iterator over the leaves of a tree.
pub struct LeafIter {
    stack: Vec<(Rc<Inner>, usize)>,
}

impl LeafIter {
    pub fn new(root: Rc<Inner>) -> Self {
        LeafIter {
            stack: vec![(root, 0)],
        }
    }
}

impl Iterator for LeafIter {
    type Item = Rc<Leaf>;

    fn next(&mut self) -> Option<Rc<Leaf>> {
        loop {
            let (node, idx) = self.stack.last_mut()?;
            match &node.children {
                Children::Leaves(leaves) => {
                    if *idx < leaves.len() {
                        let leaf = leaves[*idx].clone();
                        *idx += 1;
                        return Some(leaf);
                    }
                    self.stack.pop();
                }
                Children::Inners(inners) => {
                    if *idx < inners.len() {
                        let child = inners[*idx].clone();
                        *idx += 1;
                        self.stack.push((child, 0));
                    } else {
                        self.stack.pop();
                    }
                }
            }
        }
    }
}
