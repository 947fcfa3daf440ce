//! Append-only stream model.
//!
//! A stream is an ordered sequence of entries whose IDs are pairs of
//! unsigned integers `(ms, seq)`, rendered on the wire as `"<ms>-<seq>"`.
//! IDs are strictly increasing in lexicographic-pair order; appends that
//! would violate that order are rejected with the exact error strings
//! clients expect.

use std::fmt;

use bytes::Bytes;
use thiserror::Error;

/// Rejections raised while resolving or validating an entry ID.
///
/// The display text is the full client-facing message (minus the `ERR`
/// prefix added when the error is framed).
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum StreamIdError {
    #[error("Invalid stream ID specified as stream command argument")]
    Malformed,
    #[error("The ID specified in XADD must be greater than 0-0")]
    ZeroId,
    #[error("The ID specified in XADD is equal or smaller than the target stream top item")]
    NotMonotonic,
}

/// A stream entry ID. Ordering is lexicographic on `(ms, seq)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StreamEntryId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamEntryId {
    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }
}

impl fmt::Display for StreamEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// An entry ID as requested by a client, before resolution against the
/// stream it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryIdSpec {
    /// `*`: both components are auto-generated.
    Auto,
    /// `<ms>-*`: the millisecond part is literal, the sequence is
    /// auto-generated.
    AutoSeq { ms: u64 },
    /// `<ms>-<seq>`: both components are literal.
    Explicit(StreamEntryId),
}

impl EntryIdSpec {
    pub fn parse(raw: &str) -> Result<Self, StreamIdError> {
        if raw == "*" {
            return Ok(EntryIdSpec::Auto);
        }

        let Some((ms_part, seq_part)) = raw.split_once('-') else {
            return Err(StreamIdError::Malformed);
        };

        let ms = ms_part.parse::<u64>().map_err(|_| StreamIdError::Malformed)?;

        if seq_part == "*" {
            return Ok(EntryIdSpec::AutoSeq { ms });
        }

        let seq = seq_part
            .parse::<u64>()
            .map_err(|_| StreamIdError::Malformed)?;

        Ok(EntryIdSpec::Explicit(StreamEntryId::new(ms, seq)))
    }
}

/// One appended record: an ID plus its field/value pairs in insertion
/// order. The pair list always has even total length by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    pub id: StreamEntryId,
    pub fields: Vec<(Bytes, Bytes)>,
}

/// An append-only sequence of entries with strictly increasing IDs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stream {
    entries: Vec<StreamEntry>,
}

impl Stream {
    pub fn last_id(&self) -> Option<StreamEntryId> {
        self.entries.last().map(|entry| entry.id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[StreamEntry] {
        &self.entries
    }

    /// Resolves the requested ID against the current tail, validates it,
    /// and appends. `now_ms` is the wall clock used for auto-generation.
    ///
    /// Validation order: `0-0` is rejected first, then any ID that is not
    /// strictly greater than the current tail.
    pub fn append(
        &mut self,
        spec: EntryIdSpec,
        fields: Vec<(Bytes, Bytes)>,
        now_ms: u64,
    ) -> Result<StreamEntryId, StreamIdError> {
        let id = self.resolve_id(spec, now_ms)?;

        if id == StreamEntryId::new(0, 0) {
            return Err(StreamIdError::ZeroId);
        }

        if let Some(last) = self.last_id() {
            if id <= last {
                return Err(StreamIdError::NotMonotonic);
            }
        }

        self.entries.push(StreamEntry { id, fields });
        Ok(id)
    }

    fn resolve_id(&self, spec: EntryIdSpec, now_ms: u64) -> Result<StreamEntryId, StreamIdError> {
        match spec {
            EntryIdSpec::Explicit(id) => Ok(id),
            EntryIdSpec::Auto => match self.last_id() {
                Some(last) => {
                    let ms = last.ms.max(now_ms);
                    let seq = if ms == last.ms { last.seq + 1 } else { 0 };
                    Ok(StreamEntryId::new(ms, seq))
                }
                None => Ok(StreamEntryId::new(now_ms, 0)),
            },
            EntryIdSpec::AutoSeq { ms } => match self.last_id() {
                Some(last) if ms < last.ms => Err(StreamIdError::NotMonotonic),
                Some(last) if ms == last.ms => Ok(StreamEntryId::new(ms, last.seq + 1)),
                _ => {
                    let seq = if ms == 0 { 1 } else { 0 };
                    Ok(StreamEntryId::new(ms, seq))
                }
            },
        }
    }
}
