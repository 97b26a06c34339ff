// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! A single-shot allocator backed by a caller-provided fixed memory region.
//!
//! Designed for use with `hashbrown::HashTable` in shared memory. It hands out
//! the entire region on the first `allocate` call and rejects all subsequent
//! allocations. `deallocate` is a no-op (the caller owns the underlying memory).

use allocator_api2::alloc::{AllocError, Allocator};
use core::alloc::Layout;
use core::cell::Cell;
use core::ptr::NonNull;

/// A single-shot allocator over a fixed memory region.
///
/// On the first call to [`allocate`](Allocator::allocate), it returns the
/// entire region (if the requested layout fits). All subsequent allocations
/// fail with [`AllocError`]. Deallocation is a no-op.
///
/// This is intended to back exactly one `hashbrown::HashTable` whose data
/// lives in a pre-allocated shared memory region.
pub struct FixedAllocator {
    base: NonNull<u8>,
    size: usize,
    allocated: Cell<bool>,
}

impl FixedAllocator {
    /// Creates a new `FixedAllocator` over the given memory region.
    ///
    /// # Safety
    /// - `base` must point to a valid, writable memory region of at least `size` bytes.
    /// - The region must remain valid for the lifetime of this allocator and any allocations made
    ///   from it.
    /// - The caller must not use the region for other purposes while this allocator (or any
    ///   allocation it produced) is alive.
    pub unsafe fn new(base: NonNull<u8>, size: usize) -> Self {
        Self {
            base,
            size,
            allocated: Cell::new(false),
        }
    }
}

unsafe impl Allocator for FixedAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        // We only support a single allocation. hashbrown makes exactly one
        // allocation for its internal table.
        if self.allocated.get() {
            return Err(AllocError);
        }

        // Check alignment: the base must be aligned for the requested layout.
        let addr = self.base.as_ptr() as usize;
        let aligned_addr =
            addr.checked_add(layout.align() - 1).ok_or(AllocError)? & !(layout.align() - 1);
        let padding = aligned_addr - addr;

        let available = self.size.checked_sub(padding).ok_or(AllocError)?;
        if layout.size() > available {
            return Err(AllocError);
        }

        self.allocated.set(true);

        // Return exactly the requested size -- no excess.
        let ptr = unsafe { NonNull::new_unchecked(self.base.as_ptr().add(padding)) };
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
        // No-op: the caller owns the underlying memory (e.g., mmap region).
    }
}
