//! The in-memory store: an expiring string map plus a stream map.
//!
//! The two key-spaces are kept disjoint. A SET discards any stream stored
//! under the key, and creating a stream discards any string. TYPE lookups
//! still check the stream space first.

use std::collections::HashMap;

use bytes::Bytes;
use jiff::Timestamp;

use crate::stream::{EntryIdSpec, Stream, StreamEntryId, StreamIdError};

/// A stored string value. `expires_at` of `None` means the entry never
/// expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub payload: Bytes,
    pub expires_at: Option<Timestamp>,
}

/// The observable kind of a key, as reported by TYPE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Stream,
    None,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Stream => "stream",
            ValueKind::None => "none",
        }
    }
}

#[derive(Debug, Default)]
pub struct Store {
    strings: HashMap<String, Entry>,
    streams: HashMap<String, Stream>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: String, payload: Bytes, expires_at: Option<Timestamp>) {
        self.streams.remove(&key);
        self.strings.insert(
            key,
            Entry {
                payload,
                expires_at,
            },
        );
    }

    /// Looks up a string entry. An entry whose expiry has passed is deleted
    /// in place and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<&Entry> {
        let expired = match self.strings.get(key) {
            Some(entry) => entry
                .expires_at
                .is_some_and(|expires_at| Timestamp::now() > expires_at),
            None => return None,
        };

        if expired {
            self.strings.remove(key);
            return None;
        }

        self.strings.get(key)
    }

    pub fn type_of(&self, key: &str) -> ValueKind {
        if self.streams.contains_key(key) {
            ValueKind::Stream
        } else if self.strings.contains_key(key) {
            ValueKind::String
        } else {
            ValueKind::None
        }
    }

    /// Enumerates the string key-space only.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.strings.keys()
    }

    pub fn stream_get_or_create(&mut self, key: &str) -> &mut Stream {
        if !self.streams.contains_key(key) {
            self.strings.remove(key);
        }
        self.streams.entry(key.to_string()).or_default()
    }

    pub fn stream_append(
        &mut self,
        key: &str,
        spec: EntryIdSpec,
        fields: Vec<(Bytes, Bytes)>,
        now_ms: u64,
    ) -> Result<StreamEntryId, StreamIdError> {
        self.stream_get_or_create(key).append(spec, fields, now_ms)
    }

    /// Merges entries loaded from a snapshot into the string space.
    pub fn absorb_snapshot(&mut self, entries: HashMap<String, Entry>) {
        self.strings.extend(entries);
    }
}
