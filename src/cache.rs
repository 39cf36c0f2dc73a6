//! Per-key change detection.
//!
//! Each key remembers a 64-bit xxHash fingerprint of the last tile that was
//! handed to the encoder. A tile whose fingerprint matches is skipped, which
//! avoids both the JPEG encode and the USB transfer for static keys.

use tracing::trace;
use twox_hash::XxHash64;

use crate::error::{Result, ScdkError};

const FINGERPRINT_SEED: u64 = 0;

/// Compute the fingerprint of a tile buffer.
pub fn fingerprint(tile: &[u8]) -> u64 {
    XxHash64::oneshot(FINGERPRINT_SEED, tile)
}

/// Fingerprint table, one slot per key.
///
/// `None` means the key has never been sent (or was invalidated).
#[derive(Debug, Clone)]
pub struct TileCache {
    fingerprints: Vec<Option<u64>>,
}

impl TileCache {
    /// Create a cold cache for `key_count` keys.
    pub fn new(key_count: usize) -> Result<Self> {
        let mut fingerprints = Vec::new();
        fingerprints
            .try_reserve_exact(key_count)
            .map_err(|_| ScdkError::Allocation {
                bytes: key_count * std::mem::size_of::<Option<u64>>(),
            })?;
        fingerprints.resize(key_count, None);
        Ok(Self { fingerprints })
    }

    /// Number of keys tracked.
    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    /// Returns true if the cache tracks no keys.
    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// Decide whether `tile` must be sent for `key`.
    ///
    /// Stores the new fingerprint when the answer is yes.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not below [`len`](Self::len); callers validate
    /// key indices against the device geometry first.
    pub fn should_send(&mut self, key: u8, tile: &[u8]) -> bool {
        let hash = fingerprint(tile);
        let slot = &mut self.fingerprints[usize::from(key)];
        if *slot == Some(hash) {
            trace!(key, hash, "Tile unchanged, skipping");
            return false;
        }
        *slot = Some(hash);
        true
    }

    /// Stored fingerprint for `key`, if any.
    pub fn get(&self, key: u8) -> Option<u64> {
        self.fingerprints.get(usize::from(key)).copied().flatten()
    }

    /// Forget the fingerprint of one key so its next tile is always sent.
    pub fn invalidate(&mut self, key: u8) {
        if let Some(slot) = self.fingerprints.get_mut(usize::from(key)) {
            *slot = None;
        }
    }

    /// Forget every fingerprint.
    pub fn clear(&mut self) {
        self.fingerprints.fill(None);
    }
}
