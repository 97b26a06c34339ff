// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::parallel_slice_set::ParallelSliceSet;
use super::string_set::{StringId2, WELL_KNOWN_STRING_IDS};
use super::{Arc, ParallelSliceStorage};
use super::{ArcOverflow, SetError};
use core::ptr;
use std::ffi::c_void;
use std::ops::Deref;

/// A string set which can have parallel read and write operations.
/// This is a newtype wrapper around ParallelSliceSet<u8> that adds
/// string-specific functionality like well-known strings.
#[repr(transparent)]
pub struct ParallelStringSet {
    pub(crate) inner: ParallelSliceSet<u8>,
}

impl Deref for ParallelStringSet {
    type Target = ParallelSliceSet<u8>;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl ParallelStringSet {
    /// Consumes the `ParallelStringSet`, returning a non-null pointer to the
    /// inner storage. This storage should not be mutated--it only exists to
    /// be passed across FFI boundaries, which is why its type has been erased.
    #[inline]
    pub fn into_raw(self) -> ptr::NonNull<c_void> {
        Arc::into_raw(self.inner.arc).cast()
    }

    /// Recreates a `ParallelStringSet` from a raw pointer produced by
    /// [`ParallelStringSet::into_raw`].
    ///
    /// # Safety
    ///
    /// The pointer must have been produced by [`ParallelStringSet::into_raw`]
    /// and be returned unchanged.
    #[inline]
    pub unsafe fn from_raw(raw: ptr::NonNull<c_void>) -> Self {
        let arc = Arc::from_raw(raw.cast::<ParallelSliceStorage<u8>>());
        Self {
            inner: ParallelSliceSet { arc },
        }
    }

    pub fn try_clone(&self) -> Result<ParallelStringSet, ArcOverflow> {
        Ok(ParallelStringSet {
            inner: self.inner.try_clone()?,
        })
    }

    /// Tries to create a new parallel string set that contains the well-known
    /// strings, including the empty string.
    pub fn try_new() -> Result<Self, SetError> {
        let inner = ParallelSliceSet::try_new()?;
        let set = Self { inner };

        for id in WELL_KNOWN_STRING_IDS.iter() {
            // SAFETY: the well-known strings are unique, and we're in the
            // constructor where other threads don't have access to it yet.
            _ = unsafe { set.insert_unique_uncontended(id.0.deref())? };
        }
        Ok(set)
    }

    /// # Safety
    /// The string must not have been inserted yet, as it skips checking if
    /// the string is already present.
    pub unsafe fn insert_unique_uncontended(&self, str: &str) -> Result<StringId2, SetError> {
        let thin_slice = self.inner.insert_unique_uncontended(str.as_bytes())?;
        Ok(StringId2(thin_slice.into()))
    }

    /// Adds the string to the string set if it isn't present already, and
    /// returns a handle to the string that can be used to retrieve it later.
    pub fn try_insert(&self, str: &str) -> Result<StringId2, SetError> {
        let thin_slice = self.inner.try_insert(str.as_bytes())?;
        Ok(StringId2(thin_slice.into()))
    }

    /// Selects which shard a hash should go to (0-3 for 4 shards).
    pub fn select_shard(hash: u64) -> usize {
        ParallelSliceSet::<u8>::select_shard(hash)
    }

    /// # Safety
    /// The caller must ensure that the StringId is valid for this set.
    pub unsafe fn get(&self, id: StringId2) -> &str {
        // SAFETY: safe as long as caller respects this function's safety.
        unsafe { core::mem::transmute::<&str, &str>(id.0.deref()) }
    }
}
