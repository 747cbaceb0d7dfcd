//! A globally unique position identifier.
//!
//! An [`Identifier`] is a pair of a *bunch id* (supplied by the caller's
//! allocator, opaque to this crate) and a *counter*: the `n`-th identifier
//! minted for that bunch. Bunches are the run-length compression unit the
//! rest of the crate is built around — see [`crate::leaf::Leaf`].

use std::fmt;
use std::sync::Arc;

/// The largest counter value this crate will accept.
///
/// The data model is specified in terms of non-negative integers without an
/// upper bound; in practice every real allocator (and the JSON transport
/// callers typically use for [`crate::saved::SavedRecord`]) works in
/// double-precision floats, so we cap counters at `2^53 - 1`, the largest
/// integer a JSON number round-trips exactly. Values are stored as `u64`,
/// but anything beyond this bound is rejected with
/// [`crate::error::ListError::InvalidArgument`].
pub const MAX_COUNTER: u64 = (1u64 << 53) - 1;

/// `(bunchId, counter)`. Equality and ordering are component-wise, comparing
/// `bunch` before `counter`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct Identifier {
    /// The bunch this identifier was minted from. Cheaply cloneable and
    /// `Send + Sync` so identifiers can be copied out of a (single-threaded)
    /// list and passed across threads for comparison or display.
    pub bunch: Arc<str>,
    /// The counter within `bunch`, in `[0, MAX_COUNTER]`.
    pub counter: u64,
}

impl Identifier {
    /// Builds an identifier, returning
    /// [`ListError::InvalidArgument`](crate::error::ListError::InvalidArgument)
    /// if `counter` exceeds [`MAX_COUNTER`].
    pub fn new(
        bunch: impl Into<Arc<str>>,
        counter: u64,
    ) -> Result<Self, crate::error::ListError> {
        validate_counter(counter)?;
        Ok(Identifier {
            bunch: bunch.into(),
            counter,
        })
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.bunch, self.counter)
    }
}

pub(crate) fn validate_counter(counter: u64) -> Result<(), crate::error::ListError> {
    if counter > MAX_COUNTER {
        Err(crate::error::ListError::InvalidArgument(format!(
            "counter {counter} exceeds the maximum representable counter {MAX_COUNTER}"
        )))
    } else {
        Ok(())
    }
}

pub(crate) fn validate_count(count: u64) -> Result<(), crate::error::ListError> {
    if count == 0 {
        return Ok(());
    }
    if count - 1 > MAX_COUNTER {
        return Err(crate::error::ListError::InvalidArgument(format!(
            "count {count} is not representable"
        )));
    }
    Ok(())
}

/// `expand(start, n)`: the `n` sequential identifiers
/// `(start.bunch, start.counter + i)` for `i in 0..n`.
///
/// Fails with [`ListError::InvalidArgument`](crate::error::ListError::InvalidArgument)
/// if the resulting range would overflow [`MAX_COUNTER`].
pub fn expand(start: &Identifier, n: u64) -> Result<Vec<Identifier>, crate::error::ListError> {
    if n == 0 {
        return Ok(Vec::new());
    }
    let last = start
        .counter
        .checked_add(n - 1)
        .ok_or_else(|| crate::error::ListError::InvalidArgument("counter overflow".into()))?;
    validate_counter(last)?;
    Ok((0..n)
        .map(|i| Identifier {
            bunch: start.bunch.clone(),
            counter: start.counter + i,
        })
        .collect())
}
