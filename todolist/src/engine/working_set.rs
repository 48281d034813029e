//! The working-set variant: every successful `find` moves its result to the
//! front of a recency queue and splices it into the sparser levels it
//! wasn't already linked at, so elements that are looked up repeatedly
//! become cheaper to find again. Leaving every element permanently
//! unranked (only ever calling [`WorkingSetSkipList::add`], never the
//! mutating `find`) degenerates to exactly the plain top-down behaviour.

use todolist_core::{Error, Result, Successor};

use super::params::Params;

type NodeId = usize;

struct WsNode<T> {
    key: T,
    next: Vec<Option<NodeId>>,
    /// The working-set number assigned during a rebuild's rank pass.
    /// `None` outside of a rebuild, the analogue of the source's `INT_MAX`.
    w: Option<u32>,
    qnext: Option<NodeId>,
    qprev: Option<NodeId>,
}

/// An ordered set of `T` with the working-set property: elements found
/// recently are promoted so that finding them again is cheaper, at the
/// expense of `find` taking `&mut self`.
///
/// ```
/// use todolist::WorkingSetSkipList;
/// use todolist_core::Successor;
///
/// let mut set = WorkingSetSkipList::new(0.4).unwrap();
/// set.add(5).unwrap();
/// set.add(9).unwrap();
/// assert_eq!(set.find(&5), Successor::Found(&5));
/// assert_eq!(set.find(&6), Successor::Found(&9));
/// ```
pub struct WorkingSetSkipList<T> {
    nodes: Vec<WsNode<T>>,
    head: Vec<Option<NodeId>>,
    n: Vec<usize>,
    params: Params,
    /// Most-recently-found (or most-recently-added) node, or `None` if the
    /// queue is empty.
    qhead: Option<NodeId>,
    qtail: Option<NodeId>,
}

impl<T: Ord> WorkingSetSkipList<T> {
    /// Creates an empty set tuned by `eps`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] unless `0 < eps < 1`.
    pub fn new(eps: f64) -> Result<Self> {
        let params = Params::derive(eps, 0)?;
        let height = params.k + 1;
        Ok(Self {
            nodes: Vec::new(),
            head: vec![None; height],
            n: vec![0; height],
            params,
            qhead: None,
            qtail: None,
        })
    }

    /// Builds a set from an already strictly-ascending buffer. The initial
    /// recency queue is seeded in the same ascending order, since a bulk
    /// constructor has no better notion of "recently used" to start from.
    ///
    /// # Errors
    /// [`Error::InvalidParameter`] if `eps` is out of range;
    /// [`Error::InputUnsorted`] if `data` is not strictly ascending.
    pub fn from_sorted(data: Vec<T>, eps: f64) -> Result<Self> {
        if !data.windows(2).all(|w| w[0] < w[1]) {
            return Err(Error::InputUnsorted);
        }
        let mut set = Self::new(eps)?;
        let queue_order: Vec<NodeId> = (0..data.len()).collect();
        set.rebuild_from_sorted(data, &queue_order)?;
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
        &self.nodes[id].key
    }

    #[inline]
    fn link_at(&self, pred: Option<NodeId>, level: usize) -> Option<NodeId> {
        match pred {
            None => self.head[level],
            Some(id) => self.nodes[id].next[level],
        }
    }

    #[inline]
    fn set_link_at(&mut self, pred: Option<NodeId>, level: usize, link: Option<NodeId>) {
        match pred {
            None => self.head[level] = link,
            Some(id) => self.nodes[id].next[level] = link,
        }
    }

    fn alloc(&mut self, key: T, height: usize) -> Result<NodeId> {
        self.nodes.try_reserve(1).map_err(Error::AllocationFailure)?;
        let id = self.nodes.len();
        self.nodes.push(WsNode { key, next: vec![None; height], w: None, qnext: None, qprev: None });
        Ok(id)
    }

    fn queue_push_front(&mut self, id: NodeId) {
        self.nodes[id].qprev = None;
        self.nodes[id].qnext = self.qhead;
        match self.qhead {
            Some(old_head) => self.nodes[old_head].qprev = Some(id),
            None => self.qtail = Some(id),
        }
        self.qhead = Some(id);
    }

    fn queue_push_back(&mut self, id: NodeId) {
        self.nodes[id].qprev = self.qtail;
        self.nodes[id].qnext = None;
        match self.qtail {
            Some(old_tail) => self.nodes[old_tail].qnext = Some(id),
            None => self.qhead = Some(id),
        }
        self.qtail = Some(id);
    }

    fn queue_unlink(&mut self, id: NodeId) {
        let prev = self.nodes[id].qprev;
        let next = self.nodes[id].qnext;
        match prev {
            Some(p) => self.nodes[p].qnext = next,
            None => self.qhead = next,
        }
        match next {
            Some(n) => self.nodes[n].qprev = prev,
            None => self.qtail = prev,
        }
    }

    fn queue_move_to_front(&mut self, id: NodeId) {
        if self.qhead == Some(id) {
            return;
        }
        self.queue_unlink(id);
        self.queue_push_front(id);
    }

    /// Returns the smallest stored key `>= x`. On a hit, splices the found
    /// node into every level below the one the descent stopped at and
    /// moves it to the front of the recency queue, which is why this
    /// variant's `find` needs `&mut self`.
    pub fn find(&mut self, x: &T) -> Successor<&T> {
        let k = self.params.k;
        let mut u: Option<NodeId> = None;
        let mut path: Vec<Option<NodeId>> = vec![None; k + 1];
        let mut found: Option<(usize, NodeId)> = None;

        for (i, slot) in path.iter_mut().enumerate() {
            while let Some(c) = self.link_at(u, i) {
                if self.key_of(c) < x {
                    u = Some(c);
                } else {
                    break;
                }
            }
            *slot = u;
            if let Some(c) = self.link_at(u, i) {
                if self.key_of(c) == x {
                    found = Some((i, c));
                    break;
                }
            }
        }

        let (found_level, id) = match found {
            Some(v) => v,
            None => return Successor::NotFound,
        };

        for i in (0..found_level).rev() {
            let next = self.link_at(path[i], i);
            self.nodes[id].next[i] = next;
            self.set_link_at(path[i], i, Some(id));
            self.n[i] += 1;
        }

        self.queue_move_to_front(id);
        self.rebuild_after_promotion();

        Successor::Found(&self.nodes[id].key)
    }

    /// Inserts `x`, pushing it to the front of the recency queue. Returns
    /// `Ok(true)` if newly inserted, `Ok(false)` if an equal key was
    /// already present.
    ///
    /// # Errors
    /// [`Error::AllocationFailure`] if node allocation fails (the set is
    /// left unchanged).
    pub fn add(&mut self, x: T) -> Result<bool> {
        let k = self.params.k;
        let mut u: Option<NodeId> = None;
        let mut path: Vec<Option<NodeId>> = vec![None; k + 1];
        for (i, slot) in path.iter_mut().enumerate() {
            while let Some(c) = self.link_at(u, i) {
                if self.key_of(c) < &x {
                    u = Some(c);
                } else {
                    break;
                }
            }
            *slot = u;
        }

        if let Some(w) = self.link_at(path[k], k) {
            if self.key_of(w) == &x {
                return Ok(false);
            }
        }

        let height = k + 1;
        let id = self.alloc(x, height)?;
        for i in (0..height).rev() {
            let next = self.link_at(path[i], i);
            debug_assert!(path[i].map_or(true, |p| self.key_of(p) < self.key_of(id)));
            debug_assert!(next.map_or(true, |w| self.key_of(id) < self.key_of(w)));
            self.nodes[id].next[i] = next;
            self.set_link_at(path[i], i, Some(id));
            self.n[i] += 1;
        }
        self.queue_push_front(id);

        if self.n[k] > self.params.a[k] {
            self.full_rebuild()?;
        } else if self.n[0] > self.params.n0max {
            let mut j = 1;
            while self.n[j] > self.params.a[j] {
                j += 1;
            }
            debug_assert!(j <= self.params.k);
            self.partial_rebuild(j);
        }
        Ok(true)
    }

    /// The rebuild-trigger decision after a promotion: climbs against the
    /// hysteresis budget `b[i]` rather than the plain budget `a[i]`, so a
    /// level that's only just over `a[i]` doesn't immediately re-rebuild.
    fn rebuild_after_promotion(&mut self) {
        if self.n[0] <= self.params.n0max {
            return;
        }
        let b = self.params.hysteresis_budget();
        let mut j = 1;
        while j < self.params.k && self.n[j] > b[j] {
            j += 1;
        }
        self.partial_rebuild(j);
    }

    /// Assigns sequential ranks to the front `wmax` nodes of the recency
    /// queue, runs the skip-alternation re-derivation of `L_0..L_{j-1}`
    /// from `L_j` keeping a node only if `skipped || w <= a[i]`, then clears
    /// the assigned ranks.
    fn partial_rebuild(&mut self, j: usize) {
        log::trace!("partial rebuild up to level {j}");
        let wmax = self.params.a[j - 1];

        let mut ranked = Vec::with_capacity(wmax);
        let mut cur = self.qhead;
        while let Some(id) = cur {
            if ranked.len() >= wmax {
                break;
            }
            self.nodes[id].w = Some(ranked.len() as u32);
            ranked.push(id);
            cur = self.nodes[id].qnext;
        }

        for i in (0..j).rev() {
            self.n[i] = 0;
            let threshold = self.params.a[i] as u32;
            let mut prev: Option<NodeId> = None;
            let mut skipped = false;
            let mut cur = self.link_at(None, i + 1);
            while let Some(id) = cur {
                let survives = skipped || self.nodes[id].w.is_some_and(|w| w <= threshold);
                if survives {
                    self.set_link_at(prev, i, Some(id));
                    prev = Some(id);
                    self.n[i] += 1;
                    skipped = false;
                } else {
                    skipped = true;
                }
                cur = self.nodes[id].next[i + 1];
            }
            self.set_link_at(prev, i, None);
        }

        for id in ranked {
            self.nodes[id].w = None;
        }
    }

    /// Flattens `L_k` and the recency queue, discards the old node
    /// storage, and rebuilds with a freshly-derived budget schedule. The
    /// recency queue's relative order survives the rebuild.
    fn full_rebuild(&mut self) -> Result<()> {
        let old_k = self.params.k;
        log::debug!(
            "full rebuild triggered: n[{old_k}] = {} > a[{old_k}] = {}",
            self.n[old_k],
            self.params.a[old_k]
        );

        let mut sorted_order = Vec::with_capacity(self.n[old_k]);
        let mut cur = self.link_at(None, old_k);
        while let Some(id) = cur {
            sorted_order.push(id);
            cur = self.nodes[id].next[old_k];
        }

        let mut queue_order = Vec::with_capacity(sorted_order.len());
        let mut qcur = self.qhead;
        while let Some(id) = qcur {
            queue_order.push(id);
            qcur = self.nodes[id].qnext;
        }
        debug_assert_eq!(queue_order.len(), sorted_order.len());

        let mut new_id_of = vec![0usize; self.nodes.len()];
        for (new_id, &old_id) in sorted_order.iter().enumerate() {
            new_id_of[old_id] = new_id;
        }

        let old_nodes = std::mem::take(&mut self.nodes);
        let mut slots: Vec<Option<T>> = old_nodes.into_iter().map(|n| Some(n.key)).collect();
        let sorted_keys: Vec<T> = sorted_order
            .iter()
            .map(|&id| slots[id].take().expect("each id appears exactly once in `sorted_order`"))
            .collect();
        let new_queue_order: Vec<NodeId> = queue_order.iter().map(|&old_id| new_id_of[old_id]).collect();

        self.rebuild_from_sorted(sorted_keys, &new_queue_order)
    }

    fn rebuild_from_sorted(&mut self, sorted_keys: Vec<T>, queue_order: &[NodeId]) -> Result<()> {
        let n_total = sorted_keys.len();
        let params = Params::derive(self.params.eps, n_total)?;
        let height = params.k + 1;

        self.nodes = Vec::with_capacity(n_total);
        self.head = vec![None; height];
        self.n = vec![0usize; height];
        self.n[params.k] = n_total;

        let mut prev: Option<NodeId> = None;
        for key in sorted_keys {
            let id = self.alloc(key, height)?;
            self.set_link_at(prev, params.k, Some(id));
            prev = Some(id);
        }

        self.qhead = None;
        self.qtail = None;
        for &id in queue_order {
            self.queue_push_back(id);
        }

        self.params = params;
        self.partial_rebuild(self.params.k.max(1));
        Ok(())
    }

    /// Checks the quantified invariants; intended for tests only. Uses the
    /// hysteresis budget rather than the plain one, since a level may sit
    /// between `a[i]` and `b[i]` between promotions without being rebuilt.
    ///
    /// # Errors
    /// Returns a message describing the first violated invariant.
    pub fn sanity(&self) -> std::result::Result<(), String> {
        if self.n[0] > self.params.n0max {
            return Err(format!("n[0] = {} exceeds n0max = {}", self.n[0], self.params.n0max));
        }
        let b = self.params.hysteresis_budget();
        for i in 0..=self.params.k {
            if self.n[i] > b[i] {
                return Err(format!("n[{i}] = {} exceeds hysteresis budget b[{i}] = {}", self.n[i], b[i]));
            }
            let mut count = 0;
            let mut cur = self.link_at(None, i);
            let mut last: Option<&T> = None;
            while let Some(id) = cur {
                let key = self.key_of(id);
                if let Some(prev) = last {
                    if prev >= key {
                        return Err(format!("level {i} not strictly ascending"));
                    }
                }
                last = Some(key);
                count += 1;
                cur = self.nodes[id].next[i];
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

/// Ascending iterator over a [`WorkingSetSkipList`]'s elements.
pub struct Iter<'a, T> {
    set: &'a WorkingSetSkipList<T>,
    cur: Option<NodeId>,
}

impl<'a, T: Ord> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        self.cur = self.set.nodes[id].next[self.set.params.k];
        Some(&self.set.nodes[id].key)
    }
}

impl<T: Ord + std::fmt::Debug> std::fmt::Debug for WorkingSetSkipList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "WorkingSetSkipList {{ n = {}, k = {} }}", self.len(), self.params.k)?;
        for i in 0..=self.params.k {
            writeln!(f, "  L({i}): n = {}, a = {}", self.n[i], self.params.a[i])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_finds_nothing() {
        let mut set = WorkingSetSkipList::<i32>::new(0.4).unwrap();
        assert_eq!(set.find(&0), Successor::NotFound);
        assert!(set.is_empty());
    }

    #[test]
    fn scenario_1_single_insert() {
        let mut set = WorkingSetSkipList::new(0.4).unwrap();
        assert!(set.add(5).unwrap());
        assert!(!set.add(5).unwrap());
        assert_eq!(set.find(&4), Successor::Found(&5));
        assert_eq!(set.find(&5), Successor::Found(&5));
        assert_eq!(set.find(&6), Successor::NotFound);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn repeated_find_promotes_without_changing_membership() {
        let mut set = WorkingSetSkipList::new(0.4).unwrap();
        for i in 1..=200i32 {
            set.add(i).unwrap();
        }
        for _ in 0..5 {
            assert_eq!(set.find(&37), Successor::Found(&37));
        }
        assert_eq!(set.qhead, set.nodes.iter().position(|n| n.key == 37));
        for i in 1..=200i32 {
            assert_eq!(set.find(&i), Successor::Found(&i));
        }
        assert_eq!(set.len(), 200);
        set.sanity().unwrap();
    }

    #[test]
    fn never_promoting_behaves_like_the_plain_variant() {
        let mut set = WorkingSetSkipList::new(0.4).unwrap();
        for i in 1..=500i32 {
            assert!(set.add(i).unwrap());
        }
        assert_eq!(set.len(), 500);
        set.sanity().unwrap();
        for i in 1..=500i32 {
            assert!(set.find(&i).is_found());
        }
    }

    #[test]
    fn scenario_3_bulk_constructor_then_insert() {
        let mut set = WorkingSetSkipList::from_sorted(vec![2, 4, 6, 8, 10], 0.5).unwrap();
        assert_eq!(set.find(&1), Successor::Found(&2));
        assert_eq!(set.find(&7), Successor::Found(&8));
        assert_eq!(set.find(&11), Successor::NotFound);

        assert!(set.add(5).unwrap());
        assert_eq!(set.find(&5), Successor::Found(&5));
        assert_eq!(set.len(), 6);
    }

    #[test]
    fn full_rebuild_preserves_recency_order() {
        let mut set = WorkingSetSkipList::new(0.6).unwrap();
        for i in 1..=64i32 {
            set.add(i).unwrap();
        }
        assert_eq!(set.find(&1), Successor::Found(&1));
        let most_recent_key = set.qhead.map(|id| *set.key_of(id)).unwrap();
        assert_eq!(most_recent_key, 1);
        for i in 65..=4000i32 {
            set.add(i).unwrap();
        }
        let most_recent_after = set.qhead.map(|id| *set.key_of(id)).unwrap();
        assert_eq!(most_recent_after, 4000);
        set.sanity().unwrap();
        for i in 1..=4000i32 {
            assert_eq!(set.find(&i), Successor::Found(&i));
        }
    }

    #[test]
    fn iter_yields_ascending_order() {
        let mut set = WorkingSetSkipList::new(0.4).unwrap();
        for i in [5, 1, 4, 2, 3] {
            set.add(i).unwrap();
        }
        let collected: Vec<_> = set.iter().copied().collect();
        assert_eq!(collected, vec![1, 2, 3, 4, 5]);
    }
}
