//! [`IdentifierList`]: the persistent façade tying together
//! [`crate::bitset`], [`crate::leaf`], and [`crate::node`].
//!
//! Every mutator here takes `&self` and returns a fresh `IdentifierList`;
//! the receiver is left untouched, and unaffected subtrees are shared by
//! `Rc` reference between old and new versions. This mirrors the teacher's
//! own copy-on-write discipline in `patch::branch` (rewrite the spine,
//! reuse the rest), generalized from a fixed-arity byte trie to this
//! order-statistic tree.

use std::rc::Rc;
use std::sync::Arc;

use itertools::Itertools;

use crate::bitset::SparseBitset;
use crate::error::ListError;
use crate::identifier::{validate_count, validate_counter, Identifier};
use crate::leaf::Leaf;
use crate::node::{
    build_balanced, first_id_of, last_id_of, locate, replace_leaf, Children, Inner, LeafIter, Path,
};
use crate::saved::SavedRecord;

/// Which boundary [`IdentifierList::index_of`] should report for a known
/// but tombstoned identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Report `-1`: "this identifier has no position".
    None,
    /// Report the index just before where it would be if present.
    Left,
    /// Report the index it would have if present.
    Right,
}

/// A persistent, order-preserving list of identifiers with tombstone
/// deletion and true removal. See the crate-level docs for the full
/// contract.
#[derive(Debug, Clone)]
pub struct IdentifierList {
    root: Rc<Inner>,
}

impl Default for IdentifierList {
    fn default() -> Self {
        Self::empty()
    }
}

impl IdentifierList {
    /// The empty list.
    pub fn empty() -> Self {
        IdentifierList {
            root: Rc::new(Inner::from_leaves(Vec::new())),
        }
    }

    /// Builds a list from identifiers in list order, all present.
    pub fn from_ids(ids: impl IntoIterator<Item = Identifier>) -> Result<Self, ListError> {
        Self::from_entries(ids.into_iter().map(|id| (id, false)))
    }

    /// Builds a list from `(identifier, isDeleted)` pairs in list order.
    pub fn from(entries: impl IntoIterator<Item = (Identifier, bool)>) -> Result<Self, ListError> {
        Self::from_entries(entries)
    }

    fn from_entries(
        entries: impl IntoIterator<Item = (Identifier, bool)>,
    ) -> Result<Self, ListError> {
        let mut leaves: Vec<Rc<Leaf>> = Vec::new();
        let mut current: Option<(Arc<str>, u64, u64, SparseBitset)> = None;
        for (id, is_deleted) in entries {
            validate_counter(id.counter)?;
            let continues = matches!(
                &current,
                Some((bunch, start, count, _)) if *bunch == id.bunch && *start + *count == id.counter
            );
            if continues {
                let (_, _, count, present) = current.as_mut().unwrap();
                *count += 1;
                if !is_deleted {
                    present.set(id.counter, 1);
                }
            } else {
                if let Some((bunch, start, count, present)) = current.take() {
                    leaves.push(Rc::new(Leaf {
                        bunch,
                        start,
                        count,
                        present,
                    }));
                }
                let mut present = SparseBitset::new();
                if !is_deleted {
                    present.set(id.counter, 1);
                }
                current = Some((id.bunch.clone(), id.counter, 1, present));
            }
        }
        if let Some((bunch, start, count, present)) = current {
            leaves.push(Rc::new(Leaf {
                bunch,
                start,
                count,
                present,
            }));
        }
        Ok(IdentifierList {
            root: build_balanced(leaves),
        })
    }

    /// The number of present identifiers.
    pub fn length(&self) -> u64 {
        self.root.size
    }

    /// `true` if `id` is known and present.
    pub fn has(&self, id: &Identifier) -> bool {
        match locate(&self.root, &id.bunch, id.counter) {
            Some(path) => path.leaf.present.has(id.counter),
            None => false,
        }
    }

    /// `true` if `id` has ever been inserted and not subsequently
    /// uninserted (present or tombstoned).
    pub fn is_known(&self, id: &Identifier) -> bool {
        locate(&self.root, &id.bunch, id.counter).is_some()
    }

    /// The largest counter known for `bunch`, or `None` if the bunch has no
    /// known identifiers in this list.
    pub fn max_counter(&self, bunch: &str) -> Option<u64> {
        LeafIter::new(self.root.clone())
            .filter(|leaf| leaf.bunch.as_ref() == bunch)
            .map(|leaf| leaf.end() - 1)
            .max()
    }

    /// The present identifier at position `index`.
    pub fn at(&self, index: u64) -> Result<Identifier, ListError> {
        if index >= self.root.size {
            return Err(ListError::OutOfBounds {
                index: index as i64,
                length: self.root.size,
            });
        }
        let mut node = self.root.clone();
        let mut remainder = index;
        loop {
            let next = match &node.children {
                Children::Leaves(leaves) => {
                    for leaf in leaves {
                        if remainder < leaf.size() {
                            let counter = leaf
                                .present
                                .index_of_nth(remainder)
                                .expect("remainder < leaf.size() guarantees a match");
                            return Ok(Identifier {
                                bunch: leaf.bunch.clone(),
                                counter,
                            });
                        }
                        remainder -= leaf.size();
                    }
                    unreachable!("size invariant violated")
                }
                Children::Inners(inners) => {
                    let mut found = None;
                    for child in inners {
                        if remainder < child.size {
                            found = Some(child.clone());
                            break;
                        }
                        remainder -= child.size;
                    }
                    found.expect("size invariant violated")
                }
            };
            node = next;
        }
    }

    /// The position of `id`, or a bias-dependent value if it is known but
    /// tombstoned. Fails with `NotKnown` if `id` was never inserted.
    pub fn index_of(&self, id: &Identifier, bias: Bias) -> Result<i64, ListError> {
        let path =
            locate(&self.root, &id.bunch, id.counter).ok_or_else(|| ListError::NotKnown(id.clone()))?;
        let mut total = 0u64;
        let mut node = self.root.clone();
        for &idx in &path.indices[..path.indices.len() - 1] {
            let next = match &node.children {
                Children::Inners(inners) => {
                    for child in &inners[..idx] {
                        total += child.size;
                    }
                    inners[idx].clone()
                }
                Children::Leaves(_) => unreachable!("path shorter than tree height"),
            };
            node = next;
        }
        let leaf_idx = *path.indices.last().expect("locate returns a non-empty path");
        match &node.children {
            Children::Leaves(leaves) => {
                for leaf in &leaves[..leaf_idx] {
                    total += leaf.size();
                }
            }
            Children::Inners(_) => unreachable!("path ends one level short of a Leaves node"),
        }
        let (k, present) = path.leaf.present.count_less_than(id.counter);
        total += k;
        if present {
            Ok(total as i64)
        } else {
            Ok(match bias {
                Bias::None => -1,
                Bias::Left => total as i64 - 1,
                Bias::Right => total as i64,
            })
        }
    }

    /// In-order iterator over present identifiers.
    pub fn values(&self) -> impl Iterator<Item = Identifier> + '_ {
        LeafIter::new(self.root.clone()).flat_map(|leaf| {
            let bunch = leaf.bunch.clone();
            let keys: Vec<u64> = leaf.present.keys().collect();
            keys.into_iter().map(move |counter| Identifier {
                bunch: bunch.clone(),
                counter,
            })
        })
    }

    /// In-order iterator over every known identifier, present or
    /// tombstoned, with a flag for which.
    pub fn values_with_deleted(&self) -> impl Iterator<Item = (Identifier, bool)> + '_ {
        LeafIter::new(self.root.clone()).flat_map(|leaf| {
            let bunch = leaf.bunch.clone();
            let start = leaf.start;
            let present = leaf.present.clone();
            (0..leaf.count).map(move |i| {
                let counter = start + i;
                (
                    Identifier {
                        bunch: bunch.clone(),
                        counter,
                    },
                    !present.has(counter),
                )
            })
        })
    }

    /// A view of this list that ignores tombstones: every known identifier
    /// counts toward `length`/`at`/`indexOf`.
    pub fn known_view(&self) -> KnownView {
        KnownView {
            root: self.root.clone(),
        }
    }

    /// Inserts `count` sequential identifiers starting at `new_id`,
    /// immediately after `before` (or at the head, if `before` is `None`).
    pub fn insert_after(
        &self,
        before: Option<&Identifier>,
        new_id: &Identifier,
        count: u64,
    ) -> Result<Self, ListError> {
        self.check_insertable(new_id, count)?;
        // The anchor must be known whenever it's given, regardless of `count`
        // — validate it before the `count == 0` short-circuit below.
        let anchor_path = match before {
            None => None,
            Some(before_id) => Some(
                locate(&self.root, &before_id.bunch, before_id.counter)
                    .ok_or_else(|| ListError::NotKnown(before_id.clone()))?,
            ),
        };
        if count == 0 {
            return Ok(self.clone());
        }
        let path = match anchor_path {
            Some(path) => path,
            None => {
                return match first_id_of(&self.root) {
                    None => Ok(self.insert_into_empty(new_id, count)),
                    Some((bunch, counter)) => {
                        self.insert_before(Some(&Identifier { bunch, counter }), new_id, count)
                    }
                };
            }
        };
        let before_id = before.expect("anchor_path is Some only when before is Some");
        let leaf = path.leaf.clone();
        let c = before_id.counter;
        if c == leaf.end() - 1 {
            if *new_id.bunch == *leaf.bunch && new_id.counter == leaf.end() {
                return Ok(self.replace_with(&path, vec![Self::extend_leaf(&leaf, new_id, count)]));
            }
            let fresh = Rc::new(Leaf::new_present(new_id.bunch.clone(), new_id.counter, count));
            return Ok(self.replace_with(&path, vec![leaf, fresh]));
        }
        let (left, right) = Self::split_leaf(&leaf, c + 1);
        let fresh = Rc::new(Leaf::new_present(new_id.bunch.clone(), new_id.counter, count));
        Ok(self.replace_with(&path, vec![left, fresh, right]))
    }

    /// Inserts `count` sequential identifiers starting at `new_id`,
    /// immediately before `after` (or at the tail, if `after` is `None`).
    pub fn insert_before(
        &self,
        after: Option<&Identifier>,
        new_id: &Identifier,
        count: u64,
    ) -> Result<Self, ListError> {
        self.check_insertable(new_id, count)?;
        // The anchor must be known whenever it's given, regardless of `count`
        // — validate it before the `count == 0` short-circuit below.
        let anchor_path = match after {
            None => None,
            Some(after_id) => Some(
                locate(&self.root, &after_id.bunch, after_id.counter)
                    .ok_or_else(|| ListError::NotKnown(after_id.clone()))?,
            ),
        };
        if count == 0 {
            return Ok(self.clone());
        }
        let path = match anchor_path {
            Some(path) => path,
            None => {
                return match last_id_of(&self.root) {
                    None => Ok(self.insert_into_empty(new_id, count)),
                    Some((bunch, counter)) => {
                        self.insert_after(Some(&Identifier { bunch, counter }), new_id, count)
                    }
                };
            }
        };
        let after_id = after.expect("anchor_path is Some only when after is Some");
        let leaf = path.leaf.clone();
        let c = after_id.counter;
        if c == leaf.start {
            if *new_id.bunch == *leaf.bunch && new_id.counter + count == leaf.start {
                let mut present = leaf.present.clone();
                present.set(new_id.counter, count);
                let new_leaf = Rc::new(Leaf {
                    bunch: leaf.bunch.clone(),
                    start: new_id.counter,
                    count: leaf.count + count,
                    present,
                });
                return Ok(self.replace_with(&path, vec![new_leaf]));
            }
            let fresh = Rc::new(Leaf::new_present(new_id.bunch.clone(), new_id.counter, count));
            return Ok(self.replace_with(&path, vec![fresh, leaf]));
        }
        let (left, right) = Self::split_leaf(&leaf, c);
        let fresh = Rc::new(Leaf::new_present(new_id.bunch.clone(), new_id.counter, count));
        Ok(self.replace_with(&path, vec![left, fresh, right]))
    }

    fn check_insertable(&self, new_id: &Identifier, count: u64) -> Result<(), ListError> {
        validate_count(count)?;
        if count == 0 {
            return Ok(());
        }
        validate_counter(new_id.counter)?;
        let last = new_id
            .counter
            .checked_add(count - 1)
            .ok_or_else(|| ListError::InvalidArgument("counter range overflows".into()))?;
        validate_counter(last)?;
        for counter in new_id.counter..=last {
            if self.is_known(&Identifier {
                bunch: new_id.bunch.clone(),
                counter,
            }) {
                return Err(ListError::AlreadyKnown(Identifier {
                    bunch: new_id.bunch.clone(),
                    counter,
                }));
            }
        }
        Ok(())
    }

    fn insert_into_empty(&self, new_id: &Identifier, count: u64) -> Self {
        let leaf = Rc::new(Leaf::new_present(new_id.bunch.clone(), new_id.counter, count));
        IdentifierList {
            root: Rc::new(Inner::from_leaves(vec![leaf])),
        }
    }

    fn extend_leaf(leaf: &Leaf, new_id: &Identifier, count: u64) -> Rc<Leaf> {
        let mut present = leaf.present.clone();
        present.set(new_id.counter, count);
        Rc::new(Leaf {
            bunch: leaf.bunch.clone(),
            start: leaf.start,
            count: leaf.count + count,
            present,
        })
    }

    /// Splits `leaf` at `boundary`, returning `([start, boundary), [boundary, end))`.
    fn split_leaf(leaf: &Leaf, boundary: u64) -> (Rc<Leaf>, Rc<Leaf>) {
        let mut slicer = leaf.present.new_slicer();
        let left_present = slicer.next_slice(Some(boundary));
        let right_present = slicer.next_slice(None);
        let left = Rc::new(Leaf {
            bunch: leaf.bunch.clone(),
            start: leaf.start,
            count: boundary - leaf.start,
            present: left_present,
        });
        let right = Rc::new(Leaf {
            bunch: leaf.bunch.clone(),
            start: boundary,
            count: leaf.end() - boundary,
            present: right_present,
        });
        (left, right)
    }

    fn replace_with(&self, path: &Path, new_leaves: Vec<Rc<Leaf>>) -> Self {
        IdentifierList {
            root: replace_leaf(&self.root, path, new_leaves),
        }
    }

    /// Tombstones `id`. A no-op if `id` is not known or already deleted.
    pub fn delete(&self, id: &Identifier) -> Self {
        let Some(path) = locate(&self.root, &id.bunch, id.counter) else {
            return self.clone();
        };
        if !path.leaf.present.has(id.counter) {
            return self.clone();
        }
        let mut present = path.leaf.present.clone();
        present.unset(id.counter);
        let new_leaf = Rc::new(Leaf {
            bunch: path.leaf.bunch.clone(),
            start: path.leaf.start,
            count: path.leaf.count,
            present,
        });
        self.replace_with(&path, vec![new_leaf])
    }

    /// Un-tombstones `id`. A no-op if already present.
    /// Fails with `NotKnown` if `id` was never inserted.
    pub fn undelete(&self, id: &Identifier) -> Result<Self, ListError> {
        let path =
            locate(&self.root, &id.bunch, id.counter).ok_or_else(|| ListError::NotKnown(id.clone()))?;
        if path.leaf.present.has(id.counter) {
            return Ok(self.clone());
        }
        let mut present = path.leaf.present.clone();
        present.set(id.counter, 1);
        let new_leaf = Rc::new(Leaf {
            bunch: path.leaf.bunch.clone(),
            start: path.leaf.start,
            count: path.leaf.count,
            present,
        });
        Ok(self.replace_with(&path, vec![new_leaf]))
    }

    /// Physically removes `count` sequential identifiers starting at `id`,
    /// the true inverse of `insert_after`/`insert_before`. Unknown
    /// identifiers in the range are silently skipped.
    pub fn uninsert(&self, id: &Identifier, count: u64) -> Result<Self, ListError> {
        validate_count(count)?;
        if count == 0 {
            return Ok(self.clone());
        }
        let window_end = id
            .counter
            .checked_add(count)
            .ok_or_else(|| ListError::InvalidArgument("counter range overflows".into()))?;
        validate_counter(window_end.saturating_sub(1))?;

        let mut root = self.root.clone();
        let mut cursor = id.counter;
        while cursor < window_end {
            match locate(&root, &id.bunch, cursor) {
                None => cursor += 1,
                Some(path) => {
                    let leaf = path.leaf.clone();
                    let remove_end = leaf.end().min(window_end);
                    let new_leaves = Self::uninsert_leaf(&leaf, cursor, remove_end);
                    root = replace_leaf(&root, &path, new_leaves);
                    cursor = remove_end;
                }
            }
        }
        Ok(IdentifierList { root })
    }

    fn uninsert_leaf(leaf: &Leaf, lo: u64, hi: u64) -> Vec<Rc<Leaf>> {
        let mut out = Vec::new();
        if leaf.start < lo {
            let mut slicer = leaf.present.new_slicer();
            let left_present = slicer.next_slice(Some(lo));
            out.push(Rc::new(Leaf {
                bunch: leaf.bunch.clone(),
                start: leaf.start,
                count: lo - leaf.start,
                present: left_present,
            }));
        }
        if hi < leaf.end() {
            let mut slicer = leaf.present.new_slicer();
            let _skipped_prefix = slicer.next_slice(Some(hi));
            let right_present = slicer.next_slice(None);
            out.push(Rc::new(Leaf {
                bunch: leaf.bunch.clone(),
                start: hi,
                count: leaf.end() - hi,
                present: right_present,
            }));
        }
        out
    }

    /// Flattens the list into run-length-compressed, maximally-merged
    /// save records, in list order.
    pub fn save(&self) -> Vec<SavedRecord> {
        let raw = LeafIter::new(self.root.clone()).flat_map(|leaf| {
            let mut records = Vec::new();
            let mut cursor = leaf.start;
            for (run_start, run_len) in leaf.present.runs() {
                if run_start > cursor {
                    records.push(SavedRecord {
                        bunch_id: leaf.bunch.clone(),
                        start_counter: cursor,
                        count: run_start - cursor,
                        is_deleted: true,
                    });
                }
                records.push(SavedRecord {
                    bunch_id: leaf.bunch.clone(),
                    start_counter: run_start,
                    count: run_len,
                    is_deleted: false,
                });
                cursor = run_start + run_len;
            }
            if cursor < leaf.end() {
                records.push(SavedRecord {
                    bunch_id: leaf.bunch.clone(),
                    start_counter: cursor,
                    count: leaf.end() - cursor,
                    is_deleted: true,
                });
            }
            records
        });
        // Adjacent compatible records across a leaf boundary still merge,
        // the same way `itertools::coalesce` folds runs in the teacher's
        // own dedup passes.
        raw.coalesce(|a, b| {
            if a.bunch_id == b.bunch_id && a.is_deleted == b.is_deleted && a.start_counter + a.count == b.start_counter {
                Ok(SavedRecord {
                    bunch_id: a.bunch_id,
                    start_counter: a.start_counter,
                    count: a.count + b.count,
                    is_deleted: a.is_deleted,
                })
            } else {
                Err((a, b))
            }
        })
        .collect()
    }

    /// Rebuilds a list from saved records. Rejects records with a
    /// non-representable counter/count, and records whose `(bunchId,
    /// counter)` range overlaps an earlier record (see `SPEC_FULL.md` §9a).
    pub fn load(records: &[SavedRecord]) -> Result<Self, ListError> {
        let mut leaves: Vec<Rc<Leaf>> = Vec::new();
        let mut current: Option<(Arc<str>, u64, u64, SparseBitset)> = None;
        let mut seen_ranges: std::collections::HashMap<Arc<str>, Vec<(u64, u64)>> =
            std::collections::HashMap::new();

        for rec in records {
            if rec.count == 0 {
                continue;
            }
            validate_counter(rec.start_counter)?;
            validate_count(rec.count)?;
            let rec_end = rec
                .start_counter
                .checked_add(rec.count)
                .ok_or_else(|| ListError::InvalidArgument("record range overflows".into()))?;
            validate_counter(rec_end - 1)?;

            let ranges = seen_ranges.entry(rec.bunch_id.clone()).or_default();
            for &(s, e) in ranges.iter() {
                if rec.start_counter < e && s < rec_end {
                    return Err(ListError::InvalidArgument(format!(
                        "overlapping saved records for bunch {:?}: [{s}, {e}) and [{}, {rec_end})",
                        rec.bunch_id, rec.start_counter
                    )));
                }
            }
            ranges.push((rec.start_counter, rec_end));

            let continues = matches!(
                &current,
                Some((bunch, start, count, _))
                    if *bunch == rec.bunch_id && *start + *count == rec.start_counter
            );
            if continues {
                let (_, _, count, present) = current.as_mut().unwrap();
                *count += rec.count;
                if !rec.is_deleted {
                    present.set(rec.start_counter, rec.count);
                }
            } else {
                if let Some((bunch, start, count, present)) = current.take() {
                    leaves.push(Rc::new(Leaf {
                        bunch,
                        start,
                        count,
                        present,
                    }));
                }
                let mut present = SparseBitset::new();
                if !rec.is_deleted {
                    present.set(rec.start_counter, rec.count);
                }
                current = Some((rec.bunch_id.clone(), rec.start_counter, rec.count, present));
            }
        }
        if let Some((bunch, start, count, present)) = current {
            leaves.push(Rc::new(Leaf {
                bunch,
                start,
                count,
                present,
            }));
        }
        Ok(IdentifierList {
            root: build_balanced(leaves),
        })
    }
}

/// A view of an [`IdentifierList`] that treats every known identifier
/// (present or tombstoned) as occupying a position; tombstones are never
/// skipped.
#[derive(Debug, Clone)]
pub struct KnownView {
    root: Rc<Inner>,
}

impl KnownView {
    /// The number of known identifiers (present or tombstoned).
    pub fn length(&self) -> u64 {
        self.root.known_size
    }

    /// The known identifier at position `index`.
    pub fn at(&self, index: u64) -> Result<Identifier, ListError> {
        if index >= self.root.known_size {
            return Err(ListError::OutOfBounds {
                index: index as i64,
                length: self.root.known_size,
            });
        }
        let mut node = self.root.clone();
        let mut remainder = index;
        loop {
            let next = match &node.children {
                Children::Leaves(leaves) => {
                    for leaf in leaves {
                        if remainder < leaf.known_size() {
                            return Ok(Identifier {
                                bunch: leaf.bunch.clone(),
                                counter: leaf.start + remainder,
                            });
                        }
                        remainder -= leaf.known_size();
                    }
                    unreachable!("known_size invariant violated")
                }
                Children::Inners(inners) => {
                    let mut found = None;
                    for child in inners {
                        if remainder < child.known_size {
                            found = Some(child.clone());
                            break;
                        }
                        remainder -= child.known_size;
                    }
                    found.expect("known_size invariant violated")
                }
            };
            node = next;
        }
    }

    /// The known position of `id`. Fails with `NotKnown` if `id` was never
    /// inserted (tombstoned identifiers still have a position here).
    pub fn index_of(&self, id: &Identifier) -> Result<u64, ListError> {
        let path =
            locate(&self.root, &id.bunch, id.counter).ok_or_else(|| ListError::NotKnown(id.clone()))?;
        let mut total = 0u64;
        let mut node = self.root.clone();
        for &idx in &path.indices[..path.indices.len() - 1] {
            let next = match &node.children {
                Children::Inners(inners) => {
                    for child in &inners[..idx] {
                        total += child.known_size;
                    }
                    inners[idx].clone()
                }
                Children::Leaves(_) => unreachable!("path shorter than tree height"),
            };
            node = next;
        }
        let leaf_idx = *path.indices.last().expect("locate returns a non-empty path");
        match &node.children {
            Children::Leaves(leaves) => {
                for leaf in &leaves[..leaf_idx] {
                    total += leaf.known_size();
                }
            }
            Children::Inners(_) => unreachable!("path ends one level short of a Leaves node"),
        }
        total += id.counter - path.leaf.start;
        Ok(total)
    }

    /// In-order iterator over every known identifier.
    pub fn iter(&self) -> impl Iterator<Item = Identifier> + '_ {
        LeafIter::new(self.root.clone()).flat_map(|leaf| {
            let bunch = leaf.bunch.clone();
            let start = leaf.start;
            (0..leaf.count).map(move |i| Identifier {
                bunch: bunch.clone(),
                counter: start + i,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(bunch: &str, counter: u64) -> Identifier {
        Identifier::new(bunch, counter).unwrap()
    }

    /// spec.md S1 — bulk insert and compression.
    #[test]
    fn s1_bulk_insert_and_compression() {
        let list = IdentifierList::empty()
            .insert_after(None, &id("abc", 1), 100)
            .unwrap();
        assert_eq!(list.length(), 100);
        assert_eq!(list.at(0).unwrap(), id("abc", 1));
        assert_eq!(list.at(99).unwrap(), id("abc", 100));
        assert_eq!(
            list.save(),
            vec![SavedRecord {
                bunch_id: Arc::from("abc"),
                start_counter: 1,
                count: 100,
                is_deleted: false,
            }]
        );
    }

    /// spec.md S2 — deletion as tombstone.
    #[test]
    fn s2_deletion_as_tombstone() {
        let list = IdentifierList::empty()
            .insert_after(None, &id("abc", 1), 100)
            .unwrap();
        let list = list.delete(&id("abc", 50));
        assert_eq!(list.length(), 99);
        assert!(!list.has(&id("abc", 50)));
        assert!(list.is_known(&id("abc", 50)));
        assert_eq!(list.index_of(&id("abc", 50), Bias::Left).unwrap(), 48);
        assert_eq!(list.index_of(&id("abc", 50), Bias::Right).unwrap(), 49);
        assert_eq!(
            list.save(),
            vec![
                SavedRecord {
                    bunch_id: Arc::from("abc"),
                    start_counter: 1,
                    count: 49,
                    is_deleted: false
                },
                SavedRecord {
                    bunch_id: Arc::from("abc"),
                    start_counter: 50,
                    count: 1,
                    is_deleted: true
                },
                SavedRecord {
                    bunch_id: Arc::from("abc"),
                    start_counter: 51,
                    count: 50,
                    is_deleted: false
                },
            ]
        );
    }

    /// spec.md S3 — split on interior insert.
    #[test]
    fn s3_split_on_interior_insert() {
        let list = IdentifierList::empty()
            .insert_after(None, &id("b", 0), 6)
            .unwrap();
        let list = list.insert_after(Some(&id("b", 2)), &id("m", 0), 1).unwrap();
        let values: Vec<_> = list.values().collect();
        assert_eq!(
            values,
            vec![
                id("b", 0),
                id("b", 1),
                id("b", 2),
                id("m", 0),
                id("b", 3),
                id("b", 4),
                id("b", 5),
            ]
        );
        assert_eq!(list.length(), 7);
    }

    /// spec.md S4 — root split at M=8.
    #[test]
    fn s4_root_split_at_branching_factor() {
        let mut list = IdentifierList::empty();
        for i in 0..8u64 {
            list = list
                .insert_before(None, &id(&format!("x{i}"), 0), 1)
                .unwrap();
        }
        match &inner_root(&list).children {
            Children::Leaves(leaves) => assert_eq!(leaves.len(), 8),
            Children::Inners(_) => panic!("root should still be an InnerLeaf with 8 children"),
        }
        list = list.insert_before(None, &id("x8", 0), 1).unwrap();
        match &inner_root(&list).children {
            Children::Inners(children) => {
                assert_eq!(children.len(), 2);
                assert_eq!(children[0].size, 4);
                assert_eq!(children[1].size, 5);
            }
            Children::Leaves(_) => panic!("root should have split into an InnerInner"),
        }
    }

    /// spec.md S5 — persistence.
    #[test]
    fn s5_persistence() {
        let l1 = IdentifierList::empty();
        let l2 = l1.insert_after(None, &id("a", 0), 1).unwrap();
        let l3 = l2.insert_after(Some(&id("a", 0)), &id("b", 0), 1).unwrap();
        let l4 = l3.delete(&id("a", 0));
        assert_eq!(l1.length(), 0);
        assert_eq!(l2.length(), 1);
        assert_eq!(l3.length(), 2);
        assert_eq!(l4.length(), 1);
        assert!(l4.is_known(&id("a", 0)));
        assert!(!l4.has(&id("a", 0)));
    }

    /// spec.md S6 — uninsert inverse.
    #[test]
    fn s6_uninsert_inverse() {
        let list = IdentifierList::empty()
            .insert_after(None, &id("x", 0), 5)
            .unwrap();
        let list = list.uninsert(&id("x", 1), 3).unwrap();
        let known: Vec<_> = list.values_with_deleted().collect();
        assert_eq!(known, vec![(id("x", 0), false), (id("x", 4), false)]);
    }

    #[test]
    fn known_view_ignores_tombstones() {
        let list = IdentifierList::empty()
            .insert_after(None, &id("a", 0), 5)
            .unwrap();
        let list = list.delete(&id("a", 2));
        let view = list.known_view();
        assert_eq!(view.length(), 5);
        assert_eq!(view.at(2).unwrap(), id("a", 2));
        assert_eq!(view.index_of(&id("a", 2)).unwrap(), 2);
    }

    #[test]
    fn undelete_inverts_delete() {
        let list = IdentifierList::empty()
            .insert_after(None, &id("a", 0), 3)
            .unwrap();
        let deleted = list.delete(&id("a", 1));
        let restored = deleted.undelete(&id("a", 1)).unwrap();
        assert_eq!(restored.values().collect::<Vec<_>>(), list.values().collect::<Vec<_>>());
    }

    #[test]
    fn save_load_round_trips() {
        let list = IdentifierList::empty()
            .insert_after(None, &id("a", 0), 10)
            .unwrap();
        let list = list.delete(&id("a", 5));
        let saved = list.save();
        let reloaded = IdentifierList::load(&saved).unwrap();
        assert_eq!(reloaded.length(), list.length());
        assert_eq!(
            reloaded.values_with_deleted().collect::<Vec<_>>(),
            list.values_with_deleted().collect::<Vec<_>>()
        );
    }

    #[test]
    fn load_rejects_overlapping_records() {
        let records = vec![
            SavedRecord {
                bunch_id: Arc::from("a"),
                start_counter: 0,
                count: 5,
                is_deleted: false,
            },
            SavedRecord {
                bunch_id: Arc::from("a"),
                start_counter: 3,
                count: 2,
                is_deleted: false,
            },
        ];
        assert!(IdentifierList::load(&records).is_err());
    }

    #[test]
    fn insert_after_already_known_fails() {
        let list = IdentifierList::empty()
            .insert_after(None, &id("a", 0), 1)
            .unwrap();
        let err = list.insert_after(None, &id("a", 0), 1).unwrap_err();
        assert_eq!(err, ListError::AlreadyKnown(id("a", 0)));
    }

    #[test]
    fn at_out_of_bounds_fails() {
        let list = IdentifierList::empty()
            .insert_after(None, &id("a", 0), 3)
            .unwrap();
        assert!(matches!(
            list.at(3),
            Err(ListError::OutOfBounds { index: 3, length: 3 })
        ));
    }

    #[test]
    fn max_counter_tracks_highest_seen_per_bunch() {
        let list = IdentifierList::empty()
            .insert_after(None, &id("a", 10), 5)
            .unwrap();
        assert_eq!(list.max_counter("a"), Some(14));
        assert_eq!(list.max_counter("b"), None);

        let list = list.insert_after(Some(&id("a", 14)), &id("b", 100), 3).unwrap();
        assert_eq!(list.max_counter("a"), Some(14));
        assert_eq!(list.max_counter("b"), Some(102));

        // A tombstoned tail still counts toward the highest-seen counter.
        let list = list.delete(&id("a", 14));
        assert_eq!(list.max_counter("a"), Some(14));
    }

    #[test]
    fn insert_after_rejects_unknown_anchor_even_with_zero_count() {
        let list = IdentifierList::empty()
            .insert_after(None, &id("a", 0), 1)
            .unwrap();
        let err = list
            .insert_after(Some(&id("ghost", 0)), &id("z", 0), 0)
            .unwrap_err();
        assert_eq!(err, ListError::NotKnown(id("ghost", 0)));
    }

    #[test]
    fn insert_before_rejects_unknown_anchor_even_with_zero_count() {
        let list = IdentifierList::empty()
            .insert_after(None, &id("a", 0), 1)
            .unwrap();
        let err = list
            .insert_before(Some(&id("ghost", 0)), &id("z", 0), 0)
            .unwrap_err();
        assert_eq!(err, ListError::NotKnown(id("ghost", 0)));
    }

    fn inner_root(list: &IdentifierList) -> Rc<Inner> {
        list.root.clone()
    }
}
