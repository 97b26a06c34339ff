// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::slice_set::SliceSet;
use super::{Arc, ArcOverflow, SetError, ThinSlice};
use std::hash::{self, BuildHasher};
use std::ops::Deref;

use super::SetHasher as Hasher;

/// Number of shards used by the parallel slice set and (by extension)
/// the string-specific parallel set. Kept as a constant so tests and
/// related code can refer to the same value.
pub const N_SHARDS: usize = 16;

/// The initial capacities for Rust's hash map (and set) currently go
/// like this: 3, 7, 14, 28. We want to avoid some of the smaller sizes so
/// that there's less frequent re-allocation, which is the most expensive
/// part of the set's operations.
const HASH_TABLE_MIN_CAPACITY: usize = 28;

pub type ParallelSliceStorage<T> = super::Sharded<SliceSet<T>, 16>;

/// A slice set which can have parallel read and write operations. It works
/// by sharding the set and using read-write locks local to each shard. Items
/// cannot be removed from the set; the implementation relies on this for a
/// variety of optimizations.
///
/// This is a fairly naive implementation. Unfortunately, dashmap and other
/// off-the-shelf implementations I looked at don't have adequate APIs for
/// avoiding panics, including handling allocation failures. Since we're
/// rolling our own, we can get some benefits like having wait-free lookups
/// when fetching the value associated to an ID.
///
/// Also unfortunately, even parking_lot's RwLock doesn't handle allocation
/// failures. But I'm not going to go _that_ far to avoid allocation failures
/// today. We're very unlikely to run out of memory while adding a waiter to
/// its queue, because the amount of memory used is bounded by the number of
/// threads, which is small.
#[repr(transparent)]
pub struct ParallelSliceSet<T: Copy + hash::Hash + Eq + 'static> {
    pub(crate) arc: Arc<ParallelSliceStorage<T>>,
}

// SAFETY: uses `RwLock<SliceSet<T>>` to synchronize access. All reads/writes
// in this wrapper go through those locks. All non-mut methods of
// `ParallelSliceStorage` and `Set` are safe to call under a read-lock, and all
// mut methods are safe to call under a write-lock.
unsafe impl<T: Copy + hash::Hash + Eq + 'static> Send for ParallelSliceSet<T> {}
unsafe impl<T: Copy + hash::Hash + Eq + 'static> Sync for ParallelSliceSet<T> {}

impl<T: Copy + hash::Hash + Eq + 'static> Deref for ParallelSliceSet<T> {
    type Target = ParallelSliceStorage<T>;
    fn deref(&self) -> &Self::Target {
        &self.arc
    }
}

impl<T: Copy + hash::Hash + Eq + 'static> ParallelSliceSet<T> {
    pub fn try_clone(&self) -> Result<ParallelSliceSet<T>, ArcOverflow> {
        let ptr = self.arc.try_clone().map_err(|_| ArcOverflow)?;
        Ok(ParallelSliceSet { arc: ptr })
    }

    pub const fn select_shard(hash: u64) -> usize {
        // Use lower bits for shard selection to avoid interfering with
        // Swiss tables' internal SIMD comparisons that use upper 7 bits.
        // Using 4 bits provides resilience against hash function deficiencies
        // and optimal scaling for low thread counts.
        (hash & 0b1111) as usize
    }

    /// Tries to create a new parallel slice set.
    pub fn try_new() -> Result<Self, SetError> {
        let storage = ParallelSliceStorage::try_new_with_min_capacity(HASH_TABLE_MIN_CAPACITY)?;
        let ptr = Arc::try_new(storage)?;
        Ok(Self { arc: ptr })
    }

    /// # Safety
    /// The slice must not have been inserted yet, as it skips checking if
    /// the slice is already present.
    pub unsafe fn insert_unique_uncontended(
        &self,
        slice: &[T],
    ) -> Result<ThinSlice<'static, T>, SetError>
    where
        T: hash::Hash,
    {
        let hash = Hasher::default().hash_one(slice);
        let shard_idx = Self::select_shard(hash);
        let lock = &self.shards[shard_idx];
        let mut guard = lock.write();
        guard.insert_unique_uncontended(slice)
    }

    /// Adds the slice to the slice set if it isn't present already, and
    /// returns a handle to the slice that can be used to retrieve it later.
    pub fn try_insert(&self, slice: &[T]) -> Result<ThinSlice<'static, T>, SetError>
    where
        T: hash::Hash + PartialEq,
    {
        // Hash once and reuse it for all operations.
        // Do this without holding any locks.
        let hash = Hasher::default().hash_one(slice);
        let shard_idx = Self::select_shard(hash);
        let lock = &self.shards[shard_idx];

        let read_len = {
            let guard = lock.read();
            // SAFETY: the slice's hash is correct, we use the same hasher as
            // SliceSet uses.
            if let Some(id) = unsafe { guard.deref().find_with_hash(hash, slice) } {
                return Ok(id);
            }
            guard.len()
        };

        let mut write_guard = lock.write();
        let write_len = write_guard.slices.len();
        // This is an ABA defense. It's simple because we only support insert.
        if write_len != read_len {
            // SAFETY: the slice's hash is correct, we use the same hasher as
            // SliceSet uses.
            if let Some(id) = unsafe { write_guard.find_with_hash(hash, slice) } {
                return Ok(id);
            }
        }

        // SAFETY: we just checked above that the slice isn't in the set.
        let id = unsafe { write_guard.insert_unique_uncontended_with_hash(hash, slice)? };
        Ok(id)
    }
}
