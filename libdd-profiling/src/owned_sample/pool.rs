// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Pool for reusing `OwnedSample` instances to reduce allocation overhead.

use super::{Metadata, OwnedSample};
use crossbeam_queue::ArrayQueue;
use std::sync::Arc;

/// A bounded pool of `OwnedSample` instances for efficient reuse.
///
/// The pool maintains a limited number of samples that can be reused
/// across multiple profiling operations. When a sample is requested,
/// it's either taken from the pool or freshly allocated. When returned,
/// it's reset and added back to the pool if there's space, otherwise dropped.
///
/// This pool is **thread-safe** and uses a lock-free `ArrayQueue` internally,
/// allowing concurrent access from multiple threads without locks.
///
/// # Example
/// ```no_run
/// # use libdd_profiling::owned_sample::{SamplePool, Metadata, SampleType};
/// # use std::sync::Arc;
/// let metadata = Arc::new(Metadata::new(vec![
///     SampleType::CpuTime,
///     SampleType::WallTime,
/// ], 64, true).unwrap());
///
/// let pool = SamplePool::new(metadata, 10);
///
/// // Get a sample from the pool (thread-safe)
/// let mut sample = pool.get();
/// sample.set_value(SampleType::CpuTime, 100).unwrap();
/// // ... use sample ...
///
/// // Return it to the pool for reuse (thread-safe)
/// pool.put(sample);
/// ```
pub struct SamplePool {
    /// The sample type metadata configuration shared by all samples
    metadata: Arc<Metadata>,
    /// Lock-free bounded queue of available samples.
    /// Uses `ArrayQueue` for lock-free concurrent access via atomic operations,
    /// enabling efficient multi-threaded usage without mutex contention.
    samples: ArrayQueue<Box<OwnedSample>>,
}

impl SamplePool {
    /// Creates a new sample pool with the given capacity.
    ///
    /// # Arguments
    /// * `indices` - The sample type indices configuration to use for all samples
    /// * `capacity` - Maximum number of samples to keep in the pool
    ///
    /// # Example
    /// ```no_run
    /// # use libdd_profiling::owned_sample::{SamplePool, Metadata, SampleType};
    /// # use std::sync::Arc;
    /// # let metadata = Arc::new(Metadata::new(vec![SampleType::CpuTime], 64, true).unwrap());
    /// let pool = SamplePool::new(metadata, 100);
    /// ```
    pub fn new(metadata: Arc<Metadata>, capacity: usize) -> Self {
        Self {
            metadata,
            samples: ArrayQueue::new(capacity),
        }
    }

    /// Gets a sample from the pool, or allocates a new one if the pool is empty.
    ///
    /// The returned sample is guaranteed to be reset and ready to use.
    ///
    /// This method is **thread-safe** and can be called concurrently from multiple threads.
    ///
    /// # Example
    /// ```no_run
    /// # use libdd_profiling::owned_sample::{SamplePool, Metadata, SampleType};
    /// # use std::sync::Arc;
    /// # let metadata = Arc::new(Metadata::new(vec![SampleType::CpuTime], 64, true).unwrap());
    /// # let pool = SamplePool::new(metadata, 10);
    /// let sample = pool.get();
    /// assert_eq!(sample.num_locations(), 0);
    /// ```
    pub fn get(&self) -> Box<OwnedSample> {
        self.samples.pop().unwrap_or_else(|| {
            Box::new(OwnedSample::new(self.metadata.clone()))
        })
    }

    /// Returns a sample to the pool for reuse.
    ///
    /// The sample is reset before being added to the pool. If the pool is at capacity,
    /// the sample is dropped instead.
    ///
    /// This method is **thread-safe** and can be called concurrently from multiple threads.
    ///
    /// # Example
    /// ```no_run
    /// # use libdd_profiling::owned_sample::{SamplePool, Metadata, SampleType};
    /// # use std::sync::Arc;
    /// # let metadata = Arc::new(Metadata::new(vec![SampleType::CpuTime], 64, true).unwrap());
    /// # let pool = SamplePool::new(metadata, 10);
    /// let mut sample = pool.get();
    /// sample.set_value(SampleType::CpuTime, 100).unwrap();
    /// pool.put(sample);  // Resets and returns to pool
    /// ```
    pub fn put(&self, mut sample: Box<OwnedSample>) {
        // Reset the sample to clean state
            sample.reset();
        
        // Try to add back to pool (lock-free operation)
        // If full, push() returns Err(sample), which we just drop
        let _ = self.samples.push(sample);
    }

    /// Returns the current number of samples in the pool.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the maximum capacity of the pool.
    pub fn capacity(&self) -> usize {
        self.samples.capacity()
    }
}

// SAFETY: SamplePool uses ArrayQueue which is Send + Sync, and Arc<Metadata> which is also Send + Sync
unsafe impl Send for SamplePool {}
unsafe impl Sync for SamplePool {}
