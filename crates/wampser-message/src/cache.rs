//! Per-message memo of serialized payloads.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use wampser_codec::Format;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Identity of one serializer instance, used as the cache key.
///
/// Two serializers with the same format and batching mode still get distinct
/// identities; only the instance that produced a payload finds it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerializerId {
    format: Format,
    batched: bool,
    instance: u64,
}

impl SerializerId {
    /// Allocate a fresh identity.
    pub fn allocate(format: Format, batched: bool) -> Self {
        Self {
            format,
            batched,
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn is_batched(&self) -> bool {
        self.batched
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }
}

impl fmt::Display for SerializerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = if self.batched { ".batched" } else { "" };
        write!(f, "{}{}#{}", self.format, suffix, self.instance)
    }
}

/// Payloads previously produced for a message, keyed by serializer identity.
///
/// The cache never takes part in message equality: any two caches compare equal.
/// It is cleared only in bulk via [`SerializationCache::clear`].
#[derive(Debug, Clone, Default)]
pub struct SerializationCache {
    entries: HashMap<SerializerId, Bytes>,
}

impl SerializationCache {
    pub fn get(&self, id: &SerializerId) -> Option<&Bytes> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &SerializerId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn insert(&mut self, id: SerializerId, payload: Bytes) {
        self.entries.insert(id, payload);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for SerializationCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}
