//! Chunk arithmetic.
//!
//! The same chunk size feeds both the chunk count reported at pre-allocation
//! and the byte offset used for each chunk write. Keeping both computations
//! here means a deployment can only ever have one value.

use serde::{Deserialize, Serialize};

/// Layout of a pre-allocated chunked file, as reported to the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPlan {
    /// Number of chunks the client is expected to send.
    pub chunk_count: u64,
    /// Size of every chunk except possibly the last.
    pub chunk_size: u64,
}

impl ChunkPlan {
    /// Compute the plan for a file of `total_size` bytes.
    pub fn for_size(total_size: u64, chunk_size: u64) -> Self {
        Self {
            chunk_count: chunk_count(total_size, chunk_size),
            chunk_size,
        }
    }
}

/// Number of chunks needed to cover `total_size` bytes (rounded up).
///
/// A zero chunk size yields zero chunks rather than dividing by zero;
/// configuration validation rejects that value before it reaches here.
pub fn chunk_count(total_size: u64, chunk_size: u64) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    total_size.div_ceil(chunk_size)
}

/// Byte offset of chunk `index`, or `None` if it overflows `u64`.
pub fn chunk_offset(index: u64, chunk_size: u64) -> Option<u64> {
    index.checked_mul(chunk_size)
}
