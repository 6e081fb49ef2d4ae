//! Deterministic fingerprints for items and item sets.
//!
//! Set hashing has to be independent of iteration order and stable across
//! hasher instances, so item sets combine per-item FNV-1a fingerprints with a
//! commutative sum instead of feeding items through a seeded hasher.

use core::hash::{Hash, Hasher};

/// FNV-1a hasher with a fixed offset basis.
pub struct FnvHasher {
    state: u64,
}

impl FnvHasher {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self {
            state: Self::FNV_OFFSET,
        }
    }
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.state ^= *byte as u64;
            self.state = self.state.wrapping_mul(Self::FNV_PRIME);
        }
    }
}

/// Computes the fingerprint of a single value.
pub fn fingerprint<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = FnvHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Combines value fingerprints so that the result does not depend on order.
pub fn unordered_fingerprint<'a, T: Hash + 'a>(values: impl IntoIterator<Item = &'a T>) -> u64 {
    values
        .into_iter()
        .fold(0u64, |acc, v| acc.wrapping_add(fingerprint(v)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(fingerprint(&42u64), fingerprint(&42u64));
        assert_ne!(fingerprint(&42u64), fingerprint(&43u64));
    }

    #[test]
    fn test_unordered_fingerprint() {
        let a = [1u32, 2, 3];
        let b = [3u32, 1, 2];
        assert_eq!(unordered_fingerprint(&a), unordered_fingerprint(&b));
        assert_ne!(unordered_fingerprint(&a), unordered_fingerprint(&a[..2]));
    }
}
