//! The tail-sentinel variant ("`TodoList2`" in the source): every forward
//! slot that would otherwise be absent instead points at a node holding a
//! value known to compare greater than every key that will ever be stored.
//! This removes the "does a next node exist" branch from the inner search
//! loop, leaving only the key comparison.
//!
//! Unlike [`super::list::SkipSet`], this variant keeps its own small arena
//! with plain `NodeId` forward slots (no `Option` wrapper) rather than
//! reusing [`super::node::Arena`] — the whole point of this variant is that
//! a forward slot is *never* absent, so an `Option<NodeId>` would just be an
//! unused niche the type system can't help us exploit in the search loop.

use todolist_core::{Error, Result, Successor};

use super::params::Params;

type NodeId = usize;

/// Reserved id meaning "the tail sentinel", distinct from every real node
/// id (real ids are always `< usize::MAX` in practice).
const TAIL: NodeId = NodeId::MAX;

struct TailNode<T> {
    key: T,
    next: Vec<NodeId>,
}

/// An ordered set of `T`, backed by the tail-sentinel variant of the
/// top-down skiplist. Requires an explicit maximum value at construction
/// time, strictly greater than every key that will be inserted.
///
/// ```
/// use todolist::TailSkipSet;
/// use todolist_core::Successor;
///
/// let mut set = TailSkipSet::new(0.4, i32::MAX).unwrap();
/// assert!(set.add(5).unwrap());
/// assert_eq!(set.find(&4), Successor::Found(&5));
/// assert_eq!(set.find(&6), Successor::NotFound);
/// ```
pub struct TailSkipSet<T> {
    nodes: Vec<TailNode<T>>,
    max: T,
    /// `head[i]` is the first link of level `i`: a real node id or `TAIL`.
    head: Vec<NodeId>,
    n: Vec<usize>,
    params: Params,
}

impl<T: Ord> TailSkipSet<T> {
    /// Creates an empty set tuned by `eps`, with `max` as the tail
    /// sentinel's key.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] unless `0 < eps < 1`.
    pub fn new(eps: f64, max: T) -> Result<Self> {
        let params = Params::derive(eps, 0)?;
        let height = params.k + 1;
        Ok(Self {
            nodes: Vec::new(),
            max,
            head: vec![TAIL; height],
            n: vec![0; height],
            params,
        })
    }

    /// Builds a set from an already strictly-ascending buffer, all of whose
    /// elements must be strictly less than `max`.
    ///
    /// # Errors
    /// [`Error::InvalidParameter`] if `eps` is out of range or some element
    /// is not `< max`; [`Error::InputUnsorted`] if `data` is not strictly
    /// ascending.
    pub fn from_sorted(data: Vec<T>, eps: f64, max: T) -> Result<Self> {
        if !data.windows(2).all(|w| w[0] < w[1]) {
            return Err(Error::InputUnsorted);
        }
        if data.last().is_some_and(|last| *last >= max) {
            return Err(Error::InvalidParameter(
                "max sentinel must be strictly greater than every element".into(),
            ));
        }
        let mut set = Self::new(eps, max)?;
        set.rebuild_from_sorted(data)?;
        Ok(set)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.n[self.params.k]
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn level_count(&self) -> usize {
        self.params.k
    }

    #[inline]
    fn key_of(&self, id: NodeId) -> &T {
        if id == TAIL {
            &self.max
        } else {
            &self.nodes[id].key
        }
    }

    #[inline]
    fn link_at(&self, pred: Option<NodeId>, level: usize) -> NodeId {
        match pred {
            None => self.head[level],
            Some(id) => self.nodes[id].next[level],
        }
    }

    #[inline]
    fn set_link_at(&mut self, pred: Option<NodeId>, level: usize, link: NodeId) {
        match pred {
            None => self.head[level] = link,
            Some(id) => self.nodes[id].next[level] = link,
        }
    }

    fn alloc(&mut self, key: T, height: usize) -> Result<NodeId> {
        self.nodes.try_reserve(1).map_err(Error::AllocationFailure)?;
        let id = self.nodes.len();
        self.nodes.push(TailNode { key, next: vec![TAIL; height] });
        Ok(id)
    }

    /// Top-down descent. The inner loop never checks "does a next node
    /// exist" — `link_at` always returns a real id, because every slot
    /// points at a real node or at `TAIL`, whose key compares greater than
    /// any `x` this set will ever see.
    fn descend(&self, x: &T) -> Vec<Option<NodeId>> {
        let mut path = vec![None; self.params.k + 1];
        let mut u: Option<NodeId> = None;
        for (i, slot) in path.iter_mut().enumerate() {
            loop {
                let cand = self.link_at(u, i);
                if self.key_of(cand) < x {
                    u = Some(cand);
                } else {
                    break;
                }
            }
            *slot = u;
        }
        path
    }

    /// Returns the smallest stored key `>= x`, or [`Successor::NotFound`]
    /// (the tail sentinel was reached instead of a real key).
    #[must_use]
    pub fn find(&self, x: &T) -> Successor<&T> {
        let path = self.descend(x);
        let w = self.link_at(path[self.params.k], self.params.k);
        if w == TAIL {
            Successor::NotFound
        } else {
            Successor::Found(self.key_of(w))
        }
    }

    /// Inserts `x`. Returns `Ok(true)` if newly inserted, `Ok(false)` if an
    /// equal key was already present.
    ///
    /// # Errors
    /// [`Error::InvalidParameter`] if `x` is not strictly less than the
    /// tail sentinel's value; [`Error::AllocationFailure`] if node
    /// allocation fails (the set is left unchanged in both cases).
    pub fn add(&mut self, x: T) -> Result<bool> {
        if x >= self.max {
            return Err(Error::InvalidParameter(
                "key must be strictly less than the tail sentinel".into(),
            ));
        }

        let path = self.descend(&x);
        let w = self.link_at(path[self.params.k], self.params.k);
        if w != TAIL && self.key_of(w) == &x {
            return Ok(false);
        }

        let height = self.params.k + 1;
        let id = self.alloc(x, height)?;
        for i in (0..height).rev() {
            let next = self.link_at(path[i], i);
            debug_assert!(path[i].map_or(true, |p| self.key_of(p) < self.key_of(id)));
            debug_assert!(self.key_of(id) < self.key_of(next));
            self.nodes[id].next[i] = next;
            self.set_link_at(path[i], i, id);
            self.n[i] += 1;
        }

        if self.n[self.params.k] > self.params.a[self.params.k] {
            self.full_rebuild()?;
        } else if self.n[0] > self.params.n0max {
            let mut j = 1;
            while self.n[j] > self.params.a[j] {
                j += 1;
            }
            debug_assert!(j <= self.params.k);
            self.partial_rebuild(j);
        }
        debug_assert!(self.n[0] <= self.params.n0max);
        Ok(true)
    }

    /// Re-derives `L_0..L_{j-1}` from `L_j`. The tail sentinel always
    /// survives the skip-alternation (it terminates every level), which
    /// plays the role of the source's `u == sentinel2` escape hatch.
    fn partial_rebuild(&mut self, j: usize) {
        log::trace!("partial rebuild up to level {j}");
        for i in (0..j).rev() {
            let mut prev: Option<NodeId> = None;
            let mut skipped = false;
            self.n[i] = 0;
            let mut cur = self.link_at(None, i + 1);
            loop {
                if skipped || cur == TAIL {
                    self.set_link_at(prev, i, cur);
                    prev = Some(cur);
                    if cur != TAIL {
                        self.n[i] += 1;
                    }
                    skipped = false;
                } else {
                    skipped = true;
                }
                if cur == TAIL {
                    break;
                }
                cur = self.nodes[cur].next[i + 1];
            }
        }
    }

    /// Flattens the real keys of `L_k`, discards the old node storage, and
    /// rebuilds with a freshly-derived budget schedule.
    fn full_rebuild(&mut self) -> Result<()> {
        let old_k = self.params.k;
        log::debug!(
            "full rebuild triggered: n[{old_k}] = {} > a[{old_k}] = {}",
            self.n[old_k],
            self.params.a[old_k]
        );

        let mut order = Vec::with_capacity(self.n[old_k]);
        let mut cur = self.link_at(None, old_k);
        while cur != TAIL {
            order.push(cur);
            cur = self.nodes[cur].next[old_k];
        }

        let old_nodes = std::mem::take(&mut self.nodes);
        let mut slots: Vec<Option<T>> = old_nodes.into_iter().map(|n| Some(n.key)).collect();
        let sorted_keys: Vec<T> = order
            .into_iter()
            .map(|id| slots[id].take().expect("each id appears exactly once in `order`"))
            .collect();

        self.rebuild_from_sorted(sorted_keys)
    }

    fn rebuild_from_sorted(&mut self, sorted_keys: Vec<T>) -> Result<()> {
        let n_total = sorted_keys.len();
        let params = Params::derive(self.params.eps, n_total)?;
        let height = params.k + 1;

        self.nodes = Vec::with_capacity(n_total);
        self.head = vec![TAIL; height];
        self.n = vec![0usize; height];
        self.n[params.k] = n_total;

        let mut prev: Option<NodeId> = None;
        for key in sorted_keys {
            let id = self.alloc(key, height)?;
            self.set_link_at(prev, params.k, id);
            prev = Some(id);
        }
        if let Some(last) = prev {
            self.nodes[last].next[params.k] = TAIL;
        }

        self.params = params;
        self.partial_rebuild(self.params.k);
        Ok(())
    }

    /// Checks the quantified invariants; intended for tests only.
    ///
    /// # Errors
    /// Returns a message describing the first violated invariant.
    pub fn sanity(&self) -> std::result::Result<(), String> {
        if self.n[0] > self.params.n0max {
            return Err(format!("n[0] = {} exceeds n0max = {}", self.n[0], self.params.n0max));
        }
        for i in 0..=self.params.k {
            if self.n[i] > self.params.a[i] {
                return Err(format!("n[{i}] = {} exceeds a[{i}] = {}", self.n[i], self.params.a[i]));
            }
            let mut count = 0;
            let mut cur = self.link_at(None, i);
            let mut last: Option<&T> = None;
            while cur != TAIL {
                let key = self.key_of(cur);
                if let Some(prev) = last {
                    if prev >= key {
                        return Err(format!("level {i} not strictly ascending"));
                    }
                }
                last = Some(key);
                count += 1;
                cur = self.nodes[cur].next[i];
            }
            if count != self.n[i] {
                return Err(format!("level {i} length {count} != n[{i}] = {}", self.n[i]));
            }
        }
        Ok(())
    }

    /// An iterator over every stored key in ascending order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { set: self, cur: self.head[self.params.k] }
    }
}

/// Ascending iterator over a [`TailSkipSet`]'s elements.
pub struct Iter<'a, T> {
    set: &'a TailSkipSet<T>,
    cur: NodeId,
}

impl<'a, T: Ord> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur == TAIL {
            return None;
        }
        let id = self.cur;
        self.cur = self.set.nodes[id].next[self.set.params.k];
        Some(&self.set.nodes[id].key)
    }
}

impl<T: Ord + std::fmt::Debug> std::fmt::Debug for TailSkipSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "TailSkipSet {{ n = {}, k = {} }}", self.len(), self.params.k)?;
        for i in 0..=self.params.k {
            writeln!(f, "  L({i}): n = {}, a = {}", self.n[i], self.params.a[i])?;
        }
        Ok(())
    }
}
