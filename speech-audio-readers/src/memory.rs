//! In-memory stream reader.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use speech_audio_core::component::capability::{Capability, CapabilityTag, Component};
use speech_audio_core::models::audio_format::AudioFormat;
use speech_audio_core::models::error::AudioError;
use speech_audio_core::processing::wav_format;
use speech_audio_core::traits::stream_reader::AudioStreamReader;

/// Serves a fixed byte buffer as an audio stream.
///
/// With [`MemoryStreamReader::realtime`] each read sleeps for the playback
/// time of the bytes it returns, so the reader behaves like a live capture
/// device.
pub struct MemoryStreamReader {
    format: AudioFormat,
    data: Vec<u8>,
    position: Mutex<usize>,
    realtime: bool,
    closed: AtomicBool,
}

impl MemoryStreamReader {
    pub fn new(format: AudioFormat, data: Vec<u8>) -> Self {
        Self {
            format,
            data,
            position: Mutex::new(0),
            realtime: false,
            closed: AtomicBool::new(false),
        }
    }

    /// Pace reads at the format's byte rate.
    pub fn realtime(mut self) -> Self {
        self.realtime = true;
        self
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.data.len() - *self.position.lock()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl AudioStreamReader for MemoryStreamReader {
    fn get_format(&self, format: Option<&mut [u8]>) -> Result<usize, AudioError> {
        wav_format::write_format_query(&self.format, format)
    }

    fn read(&self, buffer: &mut [u8]) -> Result<usize, AudioError> {
        if self.is_closed() {
            return Err(AudioError::ReaderClosed);
        }

        let n = {
            let mut position = self.position.lock();
            let n = buffer.len().min(self.data.len() - *position);
            buffer[..n].copy_from_slice(&self.data[*position..*position + n]);
            *position += n;
            n
        };

        if self.realtime && n > 0 {
            thread::sleep(self.format.duration_of(n));
        }
        Ok(n)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            log::debug!("Closed in-memory stream ({} bytes unread)", self.remaining());
        }
    }
}

impl Component for MemoryStreamReader {
    fn query_capability(self: Arc<Self>, tag: CapabilityTag) -> Option<Capability> {
        match tag {
            CapabilityTag::StreamReader => Some(Capability::StreamReader(self)),
            _ => None,
        }
    }
}
