//! Stored Values and Expiry
//!
//! A key holds exactly one [`StoredValue`]: either a string or a list. The
//! variant is the key's type, so replacing the value replaces the type too.
//! Expiry belongs to the stored [`Entry`], not the key.

use bytes::Bytes;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// The typed payload stored under a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    /// A binary-safe string
    String(Bytes),
    /// A list with O(1) push/pop at both ends
    List(VecDeque<Bytes>),
}

impl StoredValue {
    /// The name TYPE reports for this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            StoredValue::String(_) => "string",
            StoredValue::List(_) => "list",
        }
    }
}

/// When a stored value stops being visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiry {
    #[default]
    Never,
    At(Instant),
}

impl Expiry {
    /// An expiry `ttl` from `now`.
    ///
    /// Durations too large to represent are treated as no expiry.
    pub fn after(now: Instant, ttl: Duration) -> Self {
        now.checked_add(ttl).map_or(Expiry::Never, Expiry::At)
    }

    /// A value is live at `now` iff it never expires or expires strictly later.
    #[inline]
    pub fn is_live_at(&self, now: Instant) -> bool {
        match self {
            Expiry::Never => true,
            Expiry::At(deadline) => *deadline > now,
        }
    }
}

/// A stored value together with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub value: StoredValue,
    pub expiry: Expiry,
}

impl Entry {
    /// Creates an entry that never expires.
    pub fn new(value: StoredValue) -> Self {
        Self {
            value,
            expiry: Expiry::Never,
        }
    }

    pub fn with_expiry(value: StoredValue, expiry: Expiry) -> Self {
        Self { value, expiry }
    }

    /// Convenience for a non-expiring string entry.
    pub fn string(value: impl Into<Bytes>) -> Self {
        Self::new(StoredValue::String(value.into()))
    }

    #[inline]
    pub fn is_live_at(&self, now: Instant) -> bool {
        self.expiry.is_live_at(now)
    }
}
