//! The plain top-down, partially-rebuilt skiplist (`SkipSet`) — the
//! null-terminated variant: a level's last node's forward pointer is `None`.

use todolist_core::{Error, Result, Successor};

use super::node::{Arena, NodeId};
use super::params::Params;

/// An ordered set of `T`, backed by a top-down skiplist that restores its
/// invariants with partial rebuilds rather than per-insertion
/// randomization.
///
/// ```
/// use todolist::SkipSet;
/// use todolist_core::Successor;
///
/// let mut set = SkipSet::new(0.4).unwrap();
/// assert!(set.add(5));
/// assert!(!set.add(5)); // duplicate
/// assert_eq!(set.find(&4), Successor::Found(&5));
/// assert_eq!(set.find(&5), Successor::Found(&5));
/// assert_eq!(set.find(&6), Successor::NotFound);
/// assert_eq!(set.len(), 1);
/// ```
pub struct SkipSet<T> {
    arena: Arena<T>,
    /// `head[i]` is the first node of level `i`, or `None` if that level is
    /// empty.
    head: Vec<Option<NodeId>>,
    /// `n[i]` is the current size of level `i`.
    n: Vec<usize>,
    params: Params,
}

impl<T: Ord> SkipSet<T> {
    /// Creates an empty set tuned by `eps`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] unless `0 < eps < 1`.
    pub fn new(eps: f64) -> Result<Self> {
        let params = Params::derive(eps, 0)?;
        let height = params.k + 1;
        Ok(Self {
            arena: Arena::new(),
            head: vec![None; height],
            n: vec![0; height],
            params,
        })
    }

    /// Builds a set from an already strictly-ascending buffer, avoiding the
    /// `N` individual `add` calls a naive caller would otherwise pay for.
    ///
    /// # Errors
    /// Returns [`Error::InvalidParameter`] unless `0 < eps < 1`, or
    /// [`Error::InputUnsorted`] if `data` is not strictly ascending.
    pub fn from_sorted(data: Vec<T>, eps: f64) -> Result<Self> {
        if !data.windows(2).all(|w| w[0] < w[1]) {
            return Err(Error::InputUnsorted);
        }
        let mut set = Self::new(eps)?;
        set.rebuild_from_sorted(data)?;
        Ok(set)
    }

    /// The number of elements currently stored (`n[k]`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.n[self.params.k]
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The highest level index currently in use.
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.params.k
    }

    #[inline]
    fn link_at(&self, pred: Option<NodeId>, level: usize) -> Option<NodeId> {
        match pred {
            None => self.head[level],
            Some(id) => self.arena.next(id, level),
        }
    }

    #[inline]
    fn set_link_at(&mut self, pred: Option<NodeId>, level: usize, link: Option<NodeId>) {
        match pred {
            None => self.head[level] = link,
            Some(id) => self.arena.set_next(id, level, link),
        }
    }

    /// Top-down descent, returning the predecessor reached at every level.
    fn descend(&self, x: &T) -> Vec<Option<NodeId>> {
        let mut path = vec![None; self.params.k + 1];
        let mut u: Option<NodeId> = None;
        for (i, slot) in path.iter_mut().enumerate() {
            loop {
                match self.link_at(u, i) {
                    Some(id) if self.arena.key(id) < x => u = Some(id),
                    _ => break,
                }
            }
            *slot = u;
        }
        path
    }

    /// Returns the smallest stored key `>= x`, or [`Successor::NotFound`].
    #[must_use]
    pub fn find(&self, x: &T) -> Successor<&T> {
        let path = self.descend(x);
        match self.link_at(path[self.params.k], self.params.k) {
            Some(id) => Successor::Found(self.arena.key(id)),
            None => Successor::NotFound,
        }
    }

    /// Inserts `x`. Returns `true` if it was newly inserted, `false` if an
    /// equal key was already present (the set is unchanged in that case).
    ///
    /// # Errors
    /// Returns [`Error::AllocationFailure`] if node allocation fails; the
    /// set is left unchanged.
    pub fn try_add(&mut self, x: T) -> Result<bool> {
        let path = self.descend(&x);
        if let Some(id) = self.link_at(path[self.params.k], self.params.k) {
            if self.arena.key(id) == &x {
                return Ok(false);
            }
        }

        let height = self.params.k + 1;
        let id = self.arena.alloc(x, height)?;
        for i in (0..height).rev() {
            let next = self.link_at(path[i], i);
            debug_assert!(path[i].map_or(true, |p| self.arena.key(p) < self.arena.key(id)));
            debug_assert!(next.map_or(true, |w| self.arena.key(id) < self.arena.key(w)));
            self.arena.set_next(id, i, next);
            self.set_link_at(path[i], i, Some(id));
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

    /// Infallible convenience wrapper over [`Self::try_add`] — allocation
    /// failure is rare enough in practice that most callers prefer a plain
    /// `bool`; reach for `try_add` to observe and handle it.
    pub fn add(&mut self, x: T) -> bool {
        self.try_add(x).expect("node allocation failed")
    }

    /// Re-derives `L_0..L_{j-1}` from `L_j` by dropping every other
    /// candidate (skip-alternation), per the partial rebuild design.
    /// Performs zero allocation and zero deallocation.
    fn partial_rebuild(&mut self, j: usize) {
        log::trace!("partial rebuild up to level {j}");
        for i in (0..j).rev() {
            let mut prev: Option<NodeId> = None;
            let mut skipped = false;
            self.n[i] = 0;
            let mut cur = self.link_at(None, i + 1);
            while let Some(id) = cur {
                if skipped {
                    self.set_link_at(prev, i, Some(id));
                    prev = Some(id);
                    self.n[i] += 1;
                    skipped = false;
                } else {
                    skipped = true;
                }
                cur = self.arena.next(id, i + 1);
            }
            self.set_link_at(prev, i, None);
        }
    }

    /// Flattens `L_k`, discards the old arena, and rebuilds everything with
    /// a freshly-derived `k`/budget schedule, per the full rebuild design.
    fn full_rebuild(&mut self) -> Result<()> {
        let old_k = self.params.k;
        log::debug!(
            "full rebuild triggered: n[{old_k}] = {} > a[{old_k}] = {}",
            self.n[old_k],
            self.params.a[old_k]
        );

        let mut order = Vec::with_capacity(self.n[old_k]);
        let mut cur = self.link_at(None, old_k);
        while let Some(id) = cur {
            order.push(id);
            cur = self.arena.next(id, old_k);
        }

        let old_arena = std::mem::replace(&mut self.arena, Arena::new());
        let sorted_keys = old_arena.into_keys_ordered(&order);
        self.rebuild_from_sorted(sorted_keys)
    }

    /// Builds `L_k` directly from an already-sorted buffer, then
    /// partial-rebuilds the rest of the levels from it. Used both by
    /// [`Self::from_sorted`] and by [`Self::full_rebuild`].
    fn rebuild_from_sorted(&mut self, sorted_keys: Vec<T>) -> Result<()> {
        let n_total = sorted_keys.len();
        let params = Params::derive(self.params.eps, n_total)?;
        let height = params.k + 1;

        let mut arena = Arena::with_capacity(n_total);
        let mut head = vec![None; height];
        let mut n = vec![0usize; height];
        n[params.k] = n_total;

        let mut prev: Option<NodeId> = None;
        for key in sorted_keys {
            let id = arena.alloc(key, height)?;
            match prev {
                None => head[params.k] = Some(id),
                Some(p) => arena.set_next(p, params.k, Some(id)),
            }
            prev = Some(id);
        }

        self.arena = arena;
        self.head = head;
        self.n = n;
        self.params = params;
        if self.params.k > 0 {
            self.partial_rebuild(self.params.k);
        }
        Ok(())
    }

    /// Checks the quantified invariants. Intended for tests, not for
    /// release-build use (mirrors the source's debug-only `sanity()`).
    ///
    /// # Errors
    /// Returns an error message describing the first violated invariant.
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
            while let Some(id) = cur {
                let key = self.arena.key(id);
                if let Some(prev) = last {
                    if prev >= key {
                        return Err(format!("level {i} not strictly ascending"));
                    }
                }
                last = Some(key);
                count += 1;
                cur = self.arena.next(id, i);
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

/// Ascending iterator over a [`SkipSet`]'s elements.
pub struct Iter<'a, T> {
    set: &'a SkipSet<T>,
    cur: Option<NodeId>,
}

impl<'a, T: Ord> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        self.cur = self.set.arena.next(id, self.set.params.k);
        Some(self.set.arena.key(id))
    }
}

impl<T: Ord + std::fmt::Debug> std::fmt::Debug for SkipSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SkipSet {{ n = {}, k = {} }}", self.len(), self.params.k)?;
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
        let set: SkipSet<i32> = SkipSet::new(0.4).unwrap();
        assert_eq!(set.find(&0), Successor::NotFound);
        assert_eq!(set.len(), 0);
        assert!(set.is_empty());
    }

    #[test]
    fn single_element_boundary_behaviour() {
        let mut set = SkipSet::new(0.4).unwrap();
        set.add(5);
        assert_eq!(set.find(&4), Successor::Found(&5));
        assert_eq!(set.find(&5), Successor::Found(&5));
        assert_eq!(set.find(&6), Successor::NotFound);
    }

    #[test]
    fn scenario_1_single_insert() {
        let mut set = SkipSet::new(0.4).unwrap();
        assert!(set.add(5));
        assert!(!set.add(5));
        assert_eq!(set.find(&4), Successor::Found(&5));
        assert_eq!(set.find(&5), Successor::Found(&5));
        assert_eq!(set.find(&6), Successor::NotFound);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn scenario_2_sequential_thousand() {
        let mut set = SkipSet::new(0.4).unwrap();
        for i in 1..=1000i64 {
            assert!(set.add(i));
        }
        for i in 1..=1000i64 {
            assert_eq!(set.find(&i), Successor::Found(&i));
        }
        assert_eq!(set.find(&0), Successor::Found(&1));
        assert_eq!(set.find(&1001), Successor::NotFound);
        assert_eq!(set.len(), 1000);
        for i in 0..=set.level_count() {
            assert!(set.n[i] <= 1.6f64.powi(i as i32).floor() as usize);
        }
        set.sanity().unwrap();
    }

    #[test]
    fn scenario_3_bulk_constructor_then_insert() {
        let mut set = SkipSet::from_sorted(vec![2, 4, 6, 8, 10], 0.5).unwrap();
        assert_eq!(set.find(&1), Successor::Found(&2));
        assert_eq!(set.find(&3), Successor::Found(&4));
        assert_eq!(set.find(&7), Successor::Found(&8));
        assert_eq!(set.find(&11), Successor::NotFound);

        assert!(set.add(5));
        assert_eq!(set.find(&5), Successor::Found(&5));
        assert_eq!(set.find(&4), Successor::Found(&4));
        assert_eq!(set.len(), 6);
    }

    #[test]
    fn from_sorted_rejects_non_ascending_input() {
        assert!(matches!(
            SkipSet::from_sorted(vec![1, 3, 2], 0.5),
            Err(Error::InputUnsorted)
        ));
        assert!(matches!(
            SkipSet::from_sorted(vec![1, 1, 2], 0.5),
            Err(Error::InputUnsorted)
        ));
    }

    #[test]
    fn rejects_invalid_epsilon() {
        assert!(SkipSet::<i32>::new(0.0).is_err());
        assert!(SkipSet::<i32>::new(1.0).is_err());
    }

    #[test]
    fn scenario_5_rebuild_trigger_preserves_all_keys() {
        let mut set = SkipSet::new(0.5).unwrap();
        let mut inserted = Vec::new();
        for i in 1..=2000i64 {
            let old_k = set.level_count();
            let pre_a_k = set.params.a[old_k];
            let pre_n_k = set.n[old_k];
            set.add(i);
            inserted.push(i);
            set.sanity().unwrap();
            if pre_n_k + 1 > pre_a_k {
                // a full rebuild must have fired: k may have grown
                assert!(set.level_count() >= old_k);
                for &key in &inserted {
                    assert_eq!(set.find(&key), Successor::Found(&key));
                }
            }
        }
    }

    #[test]
    fn iter_yields_ascending_order() {
        let mut set = SkipSet::new(0.4).unwrap();
        for i in [5, 1, 4, 2, 3] {
            set.add(i);
        }
        let collected: Vec<_> = set.iter().copied().collect();
        assert_eq!(collected, vec![1, 2, 3, 4, 5]);
    }
}
