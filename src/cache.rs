// src/cache.rs
//! Skip cache: remembers that layer N made no change to an exact content at
//! an exact path.
//!
//! Layers branch on the file path (config kind, test file, app directory),
//! so the path is part of every key.

use crate::layers::LayerId;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Entry count at which `mark_skippable` sweeps expired entries first.
pub const PRUNE_THRESHOLD: usize = 4096;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(seed: u64, bytes: &[u8]) -> u64 {
    bytes.iter().fold(seed, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// 64-bit FNV-1a over the content bytes. Not cryptographic.
#[must_use]
pub fn content_hash(content: &str) -> u64 {
    fnv1a(FNV_OFFSET, content.as_bytes())
}

/// Hash of a (path, content) pair. `0xFF` never occurs in UTF-8, so it
/// separates the two without ambiguity.
#[must_use]
pub fn entry_hash(path: &str, content: &str) -> u64 {
    let seeded = fnv1a(FNV_OFFSET, path.as_bytes());
    fnv1a(fnv1a(seeded, &[0xFF]), content.as_bytes())
}

/// Concurrent (entry hash, layer) → "no-op" memo with a TTL.
///
/// Shared by reference between rayon workers; all methods take `&self`.
#[derive(Debug)]
pub struct SkipCache {
    entries: DashMap<(u64, LayerId), Instant>,
    ttl: Duration,
    prune_threshold: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl Default for SkipCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl SkipCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            prune_threshold: PRUNE_THRESHOLD,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_prune_threshold(mut self, threshold: usize) -> Self {
        self.prune_threshold = threshold;
        self
    }

    /// `true` if `layer` was recorded as a no-op for `hash` within the TTL.
    /// Expired entries are removed on the way.
    pub fn should_skip(&self, hash: u64, layer: LayerId) -> bool {
        let key = (hash, layer);
        let fresh = self
            .entries
            .get(&key)
            .map(|stamp| stamp.elapsed() < self.ttl);

        match fresh {
            Some(true) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                true
            }
            Some(false) => {
                self.entries.remove(&key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                false
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn mark_skippable(&self, hash: u64, layer: LayerId) {
        if self.entries.len() >= self.prune_threshold {
            let removed = self.prune_expired();
            tracing::trace!(removed, "skip cache swept");
        }
        self.entries.insert((hash, layer), Instant::now());
    }

    /// Drops every expired entry. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, stamp| stamp.elapsed() < ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
        assert_eq!(content_hash(""), FNV_OFFSET);
    }

    #[test]
    fn entry_hash_separates_paths() {
        let code = "describe('x', () => {});";
        assert_ne!(
            entry_hash("src/Stories.tsx", code),
            entry_hash("src/Button.test.tsx", code)
        );
        assert_ne!(entry_hash("ab", "c"), entry_hash("a", "bc"));
        assert_eq!(entry_hash("a.js", code), entry_hash("a.js", code));
    }

    #[test]
    fn marks_are_per_layer() {
        let cache = SkipCache::default();
        let h = content_hash("const a = 1;");
        cache.mark_skippable(h, 2);
        assert!(cache.should_skip(h, 2));
        assert!(!cache.should_skip(h, 3));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn zero_ttl_never_hits() {
        let cache = SkipCache::new(Duration::ZERO);
        cache.mark_skippable(1, 1);
        assert!(!cache.should_skip(1, 1));
        assert!(cache.is_empty());
    }

    #[test]
    fn marking_past_the_threshold_sweeps_expired() {
        let cache = SkipCache::new(Duration::ZERO).with_prune_threshold(2);
        cache.mark_skippable(1, 1);
        cache.mark_skippable(2, 1);
        assert_eq!(cache.len(), 2);
        cache.mark_skippable(3, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn prune_removes_expired() {
        let cache = SkipCache::new(Duration::ZERO);
        cache.mark_skippable(1, 1);
        cache.mark_skippable(2, 1);
        assert_eq!(cache.prune_expired(), 2);
        assert!(cache.is_empty());
    }
}
