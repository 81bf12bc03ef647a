use serde::Serialize;

use crate::models::error::AudioError;
use crate::models::state::{StreamEnd, StreamStatus};

/// Result of reading the shared buffer at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRead {
    /// `n` bytes were copied.
    Bytes(usize),
    /// Caught up with the write frontier; more data may arrive.
    Pending,
    /// Caught up and the stream has ended.
    EndOfStream,
}

impl BufferRead {
    /// Bytes copied, 0 for `Pending` and `EndOfStream`.
    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(n) => *n,
            Self::Pending | Self::EndOfStream => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Append-only, position-addressed audio store.
///
/// One writer, any number of readers each holding its own position.
pub trait AudioBufferData: Send + Sync {
    /// Append `data` at the write frontier, returning its starting offset.
    fn write(&self, data: &[u8]) -> u64;

    /// Copy bytes starting at `position` into `buffer`.
    fn read_at(&self, position: u64, buffer: &mut [u8]) -> Result<BufferRead, AudioError>;

    /// Write frontier: total bytes ever written.
    fn total_bytes(&self) -> u64;

    /// Mark the stream as ended. Later calls are ignored.
    fn end_of_stream(&self, outcome: StreamEnd);

    fn status(&self) -> StreamStatus;

    /// Drop whole chunks that end at or before `position`.
    fn discard_till(&self, position: u64);

    /// Release all stored data; subsequent reads report end of stream.
    fn term(&self);
}

/// A property recorded at a buffer position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyRecord {
    pub position: u64,
    pub name: String,
    pub value: String,
}

/// Out-of-band properties keyed by buffer position.
pub trait AudioBufferProperties: Send + Sync {
    /// Record `name = value` at the buffer's current write frontier.
    fn set_property(&self, name: &str, value: &str) -> Result<(), AudioError>;

    /// Latest value of `name` recorded at or before `position`.
    fn property_at(&self, name: &str, position: u64) -> Option<String>;

    /// All records with `start <= position < end`.
    fn records_in(&self, start: u64, end: u64) -> Vec<PropertyRecord>;
}
