use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::component::capability::{Capability, CapabilityTag, Component};
use crate::component::site::Site;
use crate::models::error::AudioError;
use crate::models::state::{StreamEnd, StreamStatus};
use crate::traits::audio_buffer::{AudioBufferData, BufferRead};
use crate::traits::site::{ObjectWithSite, ServiceProvider};

#[derive(Debug)]
struct StoredChunk {
    offset: u64,
    data: Vec<u8>,
}

impl StoredChunk {
    fn end(&self) -> u64 {
        self.offset + self.data.len() as u64
    }
}

#[derive(Debug)]
struct BufferState {
    chunks: VecDeque<StoredChunk>,
    /// Offset of the oldest byte still held.
    base: u64,
    /// Offset one past the newest byte written.
    frontier: u64,
    status: StreamStatus,
    terminated: bool,
}

/// Append-only audio store shared by every logical reader of an adapter.
///
/// Unlike a ring buffer, nothing is consumed by reading: each reader passes
/// its own position, so any number of cursors advance independently over
/// the same bytes. Memory is only released by [`AudioBufferData::discard_till`]
/// or [`AudioBufferData::term`].
///
/// Service queries are forwarded to the buffer's own site, so components
/// sited on the buffer (the properties store) share the adapter's site chain.
pub struct AudioSourceBuffer {
    state: RwLock<BufferState>,
    site: Mutex<Option<Site>>,
}

impl AudioSourceBuffer {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(BufferState {
                chunks: VecDeque::new(),
                base: 0,
                frontier: 0,
                status: StreamStatus::Active,
                terminated: false,
            }),
            site: Mutex::new(None),
        }
    }

    /// Offset of the oldest byte still readable.
    pub fn base(&self) -> u64 {
        self.state.read().base
    }

    pub fn chunk_count(&self) -> usize {
        self.state.read().chunks.len()
    }
}

impl Default for AudioSourceBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBufferData for AudioSourceBuffer {
    fn write(&self, data: &[u8]) -> u64 {
        let mut state = self.state.write();
        let offset = state.frontier;
        if state.terminated {
            log::warn!("Dropping {} bytes written to a terminated buffer", data.len());
            return offset;
        }
        if data.is_empty() {
            return offset;
        }

        state.frontier += data.len() as u64;
        state.chunks.push_back(StoredChunk {
            offset,
            data: data.to_vec(),
        });
        offset
    }

    fn read_at(&self, position: u64, buffer: &mut [u8]) -> Result<BufferRead, AudioError> {
        let state = self.state.read();
        if state.terminated {
            return Ok(BufferRead::EndOfStream);
        }
        if position < state.base {
            return Err(AudioError::PositionDiscarded {
                position,
                base: state.base,
            });
        }
        if position >= state.frontier {
            return Ok(match state.status {
                StreamStatus::Active => BufferRead::Pending,
                _ => BufferRead::EndOfStream,
            });
        }
        if buffer.is_empty() {
            return Ok(BufferRead::Bytes(0));
        }

        let first = state.chunks.partition_point(|chunk| chunk.end() <= position);
        let mut copied = 0;
        let mut at = position;
        for chunk in state.chunks.iter().skip(first) {
            let start = (at - chunk.offset) as usize;
            let available = &chunk.data[start..];
            let n = available.len().min(buffer.len() - copied);
            buffer[copied..copied + n].copy_from_slice(&available[..n]);
            copied += n;
            at += n as u64;
            if copied == buffer.len() {
                break;
            }
        }
        Ok(BufferRead::Bytes(copied))
    }

    fn total_bytes(&self) -> u64 {
        self.state.read().frontier
    }

    fn end_of_stream(&self, outcome: StreamEnd) {
        let mut state = self.state.write();
        if state.status.is_active() {
            log::debug!("Audio buffer ended at {} bytes: {:?}", state.frontier, outcome);
            state.status = outcome.into();
        }
    }

    fn status(&self) -> StreamStatus {
        self.state.read().status.clone()
    }

    fn discard_till(&self, position: u64) {
        let mut state = self.state.write();
        let position = position.min(state.frontier);
        while state.chunks.front().is_some_and(|chunk| chunk.end() <= position) {
            state.chunks.pop_front();
        }
        state.base = state
            .chunks
            .front()
            .map(|chunk| chunk.offset)
            .unwrap_or(state.frontier);
    }

    fn term(&self) {
        let mut state = self.state.write();
        state.chunks.clear();
        state.base = state.frontier;
        state.terminated = true;
        log::debug!("Audio buffer terminated after {} bytes", state.frontier);
    }
}

impl ServiceProvider for AudioSourceBuffer {
    fn query_service(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.site.lock().as_ref()?.query_service(name)
    }
}

impl ObjectWithSite for AudioSourceBuffer {
    fn set_site(&self, site: Site) -> Result<(), AudioError> {
        *self.site.lock() = Some(site);
        Ok(())
    }
}

impl Component for AudioSourceBuffer {
    fn query_capability(self: Arc<Self>, tag: CapabilityTag) -> Option<Capability> {
        match tag {
            CapabilityTag::BufferData => Some(Capability::BufferData(self)),
            CapabilityTag::ServiceProvider => Some(Capability::ServiceProvider(self)),
            CapabilityTag::ObjectWithSite => Some(Capability::ObjectWithSite(self)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(buffer: &AudioSourceBuffer, position: u64, len: usize) -> (BufferRead, Vec<u8>) {
        let mut out = vec![0u8; len];
        let read = buffer.read_at(position, &mut out).unwrap();
        out.truncate(read.len());
        (read, out)
    }

    #[test]
    fn write_returns_offsets() {
        let buffer = AudioSourceBuffer::new();
        assert_eq!(buffer.write(&[1, 2, 3]), 0);
        assert_eq!(buffer.write(&[4, 5]), 3);
        assert_eq!(buffer.write(&[]), 5);
        assert_eq!(buffer.total_bytes(), 5);
        assert_eq!(buffer.chunk_count(), 2);
    }

    #[test]
    fn reads_span_chunks() {
        let buffer = AudioSourceBuffer::new();
        buffer.write(&[1, 2, 3]);
        buffer.write(&[4, 5, 6]);

        let (read, bytes) = read_all(&buffer, 2, 3);
        assert_eq!(read, BufferRead::Bytes(3));
        assert_eq!(bytes, vec![3, 4, 5]);

        let (_, bytes) = read_all(&buffer, 4, 10);
        assert_eq!(bytes, vec![5, 6]);
    }

    #[test]
    fn readers_do_not_consume() {
        let buffer = AudioSourceBuffer::new();
        buffer.write(&[7, 8, 9]);

        assert_eq!(read_all(&buffer, 0, 3).1, vec![7, 8, 9]);
        assert_eq!(read_all(&buffer, 0, 3).1, vec![7, 8, 9]);
    }

    #[test]
    fn caught_up_is_pending_until_end() {
        let buffer = AudioSourceBuffer::new();
        buffer.write(&[1]);

        assert_eq!(read_all(&buffer, 1, 4).0, BufferRead::Pending);
        buffer.end_of_stream(StreamEnd::Completed);
        assert_eq!(read_all(&buffer, 1, 4).0, BufferRead::EndOfStream);
        // data behind the frontier is still readable after the end
        assert_eq!(read_all(&buffer, 0, 4).1, vec![1]);
    }

    #[test]
    fn first_outcome_wins() {
        let buffer = AudioSourceBuffer::new();
        let error = AudioError::ReadFailed("unplugged".into());
        buffer.end_of_stream(StreamEnd::Failed(error.clone()));
        buffer.end_of_stream(StreamEnd::Stopped);
        assert_eq!(buffer.status(), StreamStatus::Failed(error));
    }

    #[test]
    fn discard_drops_whole_chunks() {
        let buffer = AudioSourceBuffer::new();
        buffer.write(&[1, 2]);
        buffer.write(&[3, 4]);
        buffer.write(&[5, 6]);

        buffer.discard_till(3);
        assert_eq!(buffer.base(), 2);
        assert_eq!(read_all(&buffer, 2, 4).1, vec![3, 4, 5, 6]);
        assert_eq!(
            buffer.read_at(0, &mut [0u8; 2]).err(),
            Some(AudioError::PositionDiscarded { position: 0, base: 2 })
        );

        buffer.discard_till(100);
        assert_eq!(buffer.base(), 6);
        assert_eq!(buffer.chunk_count(), 0);
    }

    #[test]
    fn term_reports_end_of_stream() {
        let buffer = AudioSourceBuffer::new();
        buffer.write(&[1, 2, 3]);
        buffer.term();

        assert_eq!(read_all(&buffer, 0, 3).0, BufferRead::EndOfStream);
        buffer.write(&[4]);
        assert_eq!(buffer.total_bytes(), 3);
    }
}
