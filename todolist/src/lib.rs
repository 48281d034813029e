//! A top-down, partially-rebuilt skiplist family tuned by a single `eps`
//! parameter, instead of the random coin flips a classical skiplist uses to
//! decide node height.
//!
//! Three variants are exported, all sharing the same budget-schedule
//! derivation ([`engine::params::Params`]):
//!
//! - [`SkipSet`] — the plain, null-terminated variant.
//! - [`TailSkipSet`] — a tail-sentinel variant that trades a required
//!   maximum value for removing the "does a next node exist" branch from
//!   the search loop.
//! - [`WorkingSetSkipList`] — promotes recently-found elements, at the cost
//!   of `find` taking `&mut self`.
//!
//! All three are single-threaded and hold no internal synchronization;
//! wrap one in a `Mutex` if you need to share it across threads.

pub mod engine;

pub use engine::{SkipSet, SkipSetIter, TailSkipSet, TailSkipSetIter, WorkingSetIter, WorkingSetSkipList};
pub use todolist_core::{Error, Result, Successor};
