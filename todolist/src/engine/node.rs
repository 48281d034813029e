//! Node storage: a single growable arena addressed by index.
//!
//! Per the design notes, "the arena approach is recommended in an
//! ownership-strict language because every node has identical, bounded
//! lifetime." Nodes are never freed individually — only ever in bulk, when
//! an entire `Arena` is dropped during a full rebuild or at structure
//! teardown — so a plain `Vec<Node<T>>` addressed by `NodeId` gives one
//! allocation per growth step instead of one per node, with no unsafe code.

use todolist_core::{Error, Result};

/// An index into an [`Arena`]. Stable for the lifetime of the arena it came
/// from; never reused after a node is logically removed, because nodes are
/// only ever removed by discarding the whole arena.
pub(crate) type NodeId = usize;

pub(crate) struct Node<T> {
    pub(crate) key: T,
    /// One forward link per level the node participates in, indexed
    /// `0..height`. `None` means "nothing after this node at this level"
    /// for the null-terminated variant; the tail-sentinel variant never
    /// leaves a slot `None` once construction completes.
    pub(crate) next: Vec<Option<NodeId>>,
}

pub(crate) struct Arena<T> {
    nodes: Vec<Node<T>>,
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub(crate) fn with_capacity(cap: usize) -> Self {
        Self { nodes: Vec::with_capacity(cap) }
    }

    /// Allocates a node with `height` forward slots, all initially absent.
    ///
    /// Reserves space explicitly with [`Vec::try_reserve`] so that an
    /// allocation failure surfaces as [`Error::AllocationFailure`] instead
    /// of aborting the process, per the error design.
    pub(crate) fn alloc(&mut self, key: T, height: usize) -> Result<NodeId> {
        self.nodes
            .try_reserve(1)
            .map_err(Error::AllocationFailure)?;
        let id = self.nodes.len();
        self.nodes.push(Node { key, next: vec![None; height] });
        Ok(id)
    }

    #[inline]
    pub(crate) fn key(&self, id: NodeId) -> &T {
        &self.nodes[id].key
    }

    #[inline]
    pub(crate) fn next(&self, id: NodeId, level: usize) -> Option<NodeId> {
        self.nodes[id].next[level]
    }

    #[inline]
    pub(crate) fn set_next(&mut self, id: NodeId, level: usize, link: Option<NodeId>) {
        self.nodes[id].next[level] = link;
    }

    #[inline]
    pub(crate) fn height(&self, id: NodeId) -> usize {
        self.nodes[id].next.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Consumes the arena and returns its keys in the order given by
    /// `order` (a permutation of every id in the arena), without requiring
    /// `T: Clone`.
    pub(crate) fn into_keys_ordered(self, order: &[NodeId]) -> Vec<T> {
        let mut slots: Vec<Option<T>> = self.nodes.into_iter().map(|n| Some(n.key)).collect();
        order
            .iter()
            .map(|&id| slots[id].take().expect("each id appears exactly once in `order`"))
            .collect()
    }
}
