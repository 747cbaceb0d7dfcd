//! [`SparseBitset`]: a compact, range-compressed set of non-negative
//! integers.
//!
//! Internally a [`BTreeMap`] from run start to run length, the same choice
//! the rest of this corpus reaches for whenever it needs an ordered,
//! log-time-indexed collection (`repo::pile::Pile`'s blob/branch indices,
//! `blob::memoryblobstore`). Runs are always kept maximally merged and
//! non-touching, so `runs.len()` is the number of *gaps*, not the number of
//! elements — `count()` is tracked separately so it stays O(1).
//!
//! `indexOfNth`/`countLessThan` are the two order-statistic operations and
//! are the ones spec.md's design notes call out as worth an O(log k)
//! upgrade (a run array with prefix sums, binary-searched) once a leaf's
//! run count grows large in practice; this implementation takes the
//! simpler O(k) route the design notes explicitly permit.

use std::collections::BTreeMap;

/// An ordered set of `u64` indices, represented as disjoint, non-adjacent
/// `(start, length)` runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseBitset {
    runs: BTreeMap<u64, u64>,
    total: u64,
}

impl SparseBitset {
    /// The empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set containing exactly `[start, start + n)`.
    pub fn full(start: u64, n: u64) -> Self {
        let mut bitset = Self::new();
        bitset.set(start, n);
        bitset
    }

    /// Adds `[i, i + n)` to the set, merging with any run it touches or
    /// overlaps. `n == 0` is a no-op.
    pub fn set(&mut self, i: u64, n: u64) {
        if n == 0 {
            return;
        }
        let mut lo = i;
        let mut hi = i + n;
        loop {
            let candidate = self.runs.range(..=hi).next_back().map(|(&s, &l)| (s, l));
            match candidate {
                Some((s, l)) if s + l >= lo => {
                    self.runs.remove(&s);
                    self.total -= l;
                    lo = lo.min(s);
                    hi = hi.max(s + l);
                }
                _ => break,
            }
        }
        self.runs.insert(lo, hi - lo);
        self.total += hi - lo;
    }

    /// Removes `i` from the set, splitting its enclosing run if necessary.
    /// A no-op if `i` is not a member.
    pub fn unset(&mut self, i: u64) {
        let Some((&s, &l)) = self.runs.range(..=i).next_back() else {
            return;
        };
        if s + l <= i {
            return;
        }
        self.runs.remove(&s);
        self.total -= 1;
        if s < i {
            self.runs.insert(s, i - s);
        }
        if i + 1 < s + l {
            self.runs.insert(i + 1, s + l - (i + 1));
        }
    }

    /// `i ∈ S`.
    pub fn has(&self, i: u64) -> bool {
        match self.runs.range(..=i).next_back() {
            Some((&s, &l)) => s + l > i,
            None => false,
        }
    }

    /// `|S|`, in O(1).
    pub fn count(&self) -> u64 {
        self.total
    }

    /// Returns `true` if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// The `(n+1)`-th smallest member, or `None` if `n >= count()`.
    pub fn index_of_nth(&self, n: u64) -> Option<u64> {
        let mut remaining = n;
        for (&s, &l) in self.runs.iter() {
            if remaining < l {
                return Some(s + remaining);
            }
            remaining -= l;
        }
        None
    }

    /// The number of members strictly less than `i`, and whether `i` itself
    /// is a member.
    pub fn count_less_than(&self, i: u64) -> (u64, bool) {
        let mut k = 0u64;
        for (&s, &l) in self.runs.range(..i) {
            let end = s + l;
            k += if end <= i { l } else { i - s };
        }
        (k, self.has(i))
    }

    /// Ordered iterator over `(start, length)` runs.
    pub fn runs(&self) -> impl DoubleEndedIterator<Item = (u64, u64)> + '_ {
        self.runs.iter().map(|(&s, &l)| (s, l))
    }

    /// Ordered iterator over individual members.
    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.runs().flat_map(|(s, l)| s..s + l)
    }

    /// A stateful cursor for partitioning this set around counter
    /// boundaries, used when a [`crate::leaf::Leaf`] is split.
    pub fn new_slicer(&self) -> Slicer<'_> {
        Slicer {
            bitset: self,
            cursor: 0,
        }
    }
}

/// Produced by [`SparseBitset::new_slicer`]. Each call to
/// [`Slicer::next_slice`] returns the members in `[cursor, end)` (or
/// `[cursor, ∞)` for `end = None`) and advances the cursor to `end`.
pub struct Slicer<'a> {
    bitset: &'a SparseBitset,
    cursor: u64,
}

impl<'a> Slicer<'a> {
    pub fn next_slice(&mut self, end_exclusive: Option<u64>) -> SparseBitset {
        let start = self.cursor;
        let mut out = SparseBitset::new();
        match end_exclusive {
            Some(end) => {
                for (s, l) in self.bitset.runs() {
                    let run_end = s + l;
                    if run_end <= start {
                        continue;
                    }
                    if s >= end {
                        break;
                    }
                    let lo = s.max(start);
                    let hi = run_end.min(end);
                    if hi > lo {
                        out.set(lo, hi - lo);
                    }
                }
                self.cursor = end;
            }
            None => {
                for (s, l) in self.bitset.runs() {
                    let run_end = s + l;
                    if run_end <= start {
                        continue;
                    }
                    let lo = s.max(start);
                    out.set(lo, run_end - lo);
                }
                self.cursor = u64::MAX;
            }
        }
        out
    }
}
