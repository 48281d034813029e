//! Error types shared by every skiplist engine variant.

use thiserror::Error;

/// The error type for skiplist engine operations.
///
/// Construction (`new`/`from_sorted`) and allocation are the only fallible
/// operations in this crate; `add` and `find` never fail (a duplicate `add`
/// returns `Ok(false)`, not an error).
#[derive(Error, Debug)]
pub enum Error {
    /// ε was not in the open interval `(0, 1)`, or a required maximum
    /// sentinel value was missing/unusable.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A bulk constructor was given a buffer that was not strictly
    /// ascending.
    #[error("input buffer is not strictly sorted")]
    InputUnsorted,

    /// Node allocation failed; the structure is left exactly as it was
    /// before the operation that triggered the allocation.
    #[error("allocation failed: {0}")]
    AllocationFailure(#[from] std::collections::TryReserveError),
}

/// A specialized `Result` for skiplist engine operations.
pub type Result<T> = std::result::Result<T, Error>;
