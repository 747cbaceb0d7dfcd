//! Error kinds raised by [`crate::IdentifierList`] and [`crate::bitset::SparseBitset`]
//! operations.
//!
//! The taxonomy is fixed by the four failure modes an append-only,
//! identity-preserving list can hit: a caller passed a value that can never
//! be valid (`InvalidArgument`), referenced an identifier the list has never
//! seen or has forgotten (`NotKnown`), tried to insert an identifier that is
//! already part of the list (`AlreadyKnown`), or indexed past the end
//! (`OutOfBounds`). One enum, not four types, matching how `pile::LoadError`
//! and `pile::InsertError` group several failure variants behind a single
//! `Result` error type rather than one type per call site.

use std::fmt;

use crate::identifier::Identifier;

/// The error type returned by fallible [`crate::IdentifierList`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    /// A counter, count, or saved-record field was negative, non-integral in
    /// the caller's domain, or outside the representable safe-integer range.
    InvalidArgument(String),
    /// An identifier was referenced (e.g. as an anchor, or for `undelete`)
    /// that the list has never known.
    NotKnown(Identifier),
    /// An identifier being inserted is already known to the list.
    AlreadyKnown(Identifier),
    /// An index passed to `at` fell outside `[0, length)`.
    OutOfBounds {
        /// The index that was requested. Signed because callers (e.g.
        /// `indexOf`) may legitimately compute `-1`.
        index: i64,
        /// The length of the list against which `index` was checked.
        length: u64,
    },
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListError::InvalidArgument(reason) => write!(f, "invalid argument: {reason}"),
            ListError::NotKnown(id) => write!(f, "identifier {id:?} is not known"),
            ListError::AlreadyKnown(id) => write!(f, "identifier {id:?} is already known"),
            ListError::OutOfBounds { index, length } => {
                write!(f, "index {index} out of bounds for length {length}")
            }
        }
    }
}

impl std::error::Error for ListError {}
