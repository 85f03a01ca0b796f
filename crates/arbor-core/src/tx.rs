// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Transaction identifier and version stamp types.

/// Thin wrapper around a transaction identifier.
///
/// The store issues monotonically increasing identifiers when a transaction
/// is opened. External bindings may construct `TxId` values for logging or
/// interop using [`TxId::from_raw`].
///
/// # Invariants
/// - Zero (`TxId(0)`) is reserved as invalid; the store never issues it.
/// - The underlying `u64` may wrap at `u64::MAX`; the allocator then resumes
///   at `1`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct TxId(u64);

impl TxId {
    /// Constructs a `TxId` from a raw `u64` value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for TxId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing version stamp.
///
/// The store's version advances by exactly one per successful commit. Tree
/// nodes carry the version of the last commit that changed them or any of
/// their descendants, so a child's version never exceeds its parent's.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default)]
pub struct Version(u64);

impl Version {
    /// Version of a freshly created, empty store.
    pub const INITIAL: Self = Self(0);

    /// Constructs a version from a raw counter value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the version that follows `self`.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl core::fmt::Display for Version {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Allocates transaction identifiers, skipping the reserved zero.
#[derive(Debug, Default)]
pub(crate) struct TxIdAllocator {
    counter: std::sync::atomic::AtomicU64,
}

impl TxIdAllocator {
    pub(crate) fn next(&self) -> TxId {
        use std::sync::atomic::Ordering;
        loop {
            let raw = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            if raw != 0 {
                return TxId::from_raw(raw);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_never_issues_zero() {
        let alloc = TxIdAllocator::default();
        let first = alloc.next();
        let second = alloc.next();
        assert_eq!(first.value(), 1);
        assert_eq!(second.value(), 2);
    }

    #[test]
    fn version_next_is_monotonic() {
        let v = Version::INITIAL;
        assert!(v.next() > v);
        assert_eq!(v.next().value(), 1);
        assert_eq!(v.next().to_string(), "v1");
    }
}
