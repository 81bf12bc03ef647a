use std::sync::Arc;

use crate::models::error::AudioError;
use crate::models::state::PumpState;
use crate::traits::audio_processor::AudioProcessor;
use crate::traits::stream_reader::AudioStreamReader;

/// Control surface of an audio pump.
pub trait AudioPumpControl: Send + Sync {
    /// Bind the reader the pump drains. Must precede `start`.
    fn set_reader(&self, reader: Arc<dyn AudioStreamReader>);

    /// Bytes requested from the reader per iteration.
    fn set_chunk_size(&self, bytes: usize);

    /// Start the read loop on a dedicated thread, forwarding to `processor`.
    fn start(&self, processor: Arc<dyn AudioProcessor>) -> Result<(), AudioError>;

    /// Stop the read loop and wait for the thread to exit.
    fn stop(&self);

    fn state(&self) -> PumpState;
}

/// Receives errors that ended a pump run. Resolved by the pump through its site.
pub trait PumpErrorSink: Send + Sync {
    fn error(&self, error: &AudioError);
}
