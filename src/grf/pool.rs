//! Reusable read-buffer pool.
//!
//! Payload extraction allocates a scratch buffer per read; archives are
//! commonly walked thousands of entries at a time, so scratch buffers are
//! pooled in power-of-two size buckets (1 KiB through 256 KiB, at most ten
//! buffers per bucket). Requests above the largest bucket bypass the pool.
//! Buffers return to their bucket when the guard drops.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, OnceLock};

/// Smallest bucket size in bytes.
const MIN_BUCKET: usize = 1024;
/// Largest bucket size in bytes; larger requests bypass the pool.
const MAX_BUCKET: usize = 256 * 1024;
/// Number of power-of-two buckets between the two bounds.
const BUCKET_COUNT: usize = 9;
/// Retained buffers per bucket.
const MAX_PER_BUCKET: usize = 10;

/// A pool of size-bucketed reusable byte buffers.
#[derive(Debug, Default)]
pub struct BytePool {
    buckets: [Mutex<Vec<Vec<u8>>>; BUCKET_COUNT],
}

/// A buffer borrowed from a pool, sized to the requested length. Dropping
/// the guard returns the backing allocation to its bucket.
pub struct PooledBuf<'a> {
    data: Vec<u8>,
    bucket: Option<usize>,
    pool: &'a BytePool,
}

/// Index of the smallest bucket able to hold `len` bytes, or `None` when
/// the request bypasses the pool.
fn bucket_index(len: usize) -> Option<usize> {
    if len > MAX_BUCKET {
        return None;
    }
    let mut size = MIN_BUCKET;
    let mut index = 0;
    while size < len {
        size <<= 1;
        index += 1;
    }
    Some(index)
}

fn bucket_capacity(index: usize) -> usize {
    MIN_BUCKET << index
}

impl BytePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires a buffer of exactly `len` bytes, reusing a pooled
    /// allocation when one is available.
    pub fn acquire(&self, len: usize) -> PooledBuf<'_> {
        let bucket = bucket_index(len);
        let mut data = match bucket {
            Some(index) => {
                let mut shelf = match self.buckets[index].lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                shelf
                    .pop()
                    .unwrap_or_else(|| Vec::with_capacity(bucket_capacity(index)))
            }
            None => Vec::with_capacity(len),
        };
        data.clear();
        data.resize(len, 0);
        PooledBuf {
            data,
            bucket,
            pool: self,
        }
    }

    fn release(&self, bucket: usize, data: Vec<u8>) {
        let mut shelf = match self.buckets[bucket].lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if shelf.len() < MAX_PER_BUCKET {
            shelf.push(data);
        }
    }

    #[cfg(test)]
    fn pooled_in_bucket(&self, index: usize) -> usize {
        self.buckets[index].lock().unwrap().len()
    }
}

impl Deref for PooledBuf<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for PooledBuf<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for PooledBuf<'_> {
    fn drop(&mut self) {
        if let Some(bucket) = self.bucket {
            self.pool.release(bucket, std::mem::take(&mut self.data));
        }
    }
}

static GLOBAL_POOL: OnceLock<BytePool> = OnceLock::new();

/// The process-wide pool shared by all archives.
pub fn global_pool() -> &'static BytePool {
    GLOBAL_POOL.get_or_init(BytePool::new)
}
