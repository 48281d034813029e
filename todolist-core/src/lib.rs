//! Shared vocabulary types for the `todolist` skiplist engine crate.
//!
//! This crate holds the pieces every engine variant (`SkipSet`,
//! `TailSkipSet`, `WorkingSetSkipList`) agrees on: the error type and the
//! successor-query result type. It carries no skiplist logic itself.

mod error;
mod successor;

pub use error::{Error, Result};
pub use successor::Successor;
