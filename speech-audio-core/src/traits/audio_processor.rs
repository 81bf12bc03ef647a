use crate::models::error::AudioError;
use crate::models::state::StreamEnd;

/// Receives chunks from an audio pump.
///
/// Called on the pump thread.
pub trait AudioProcessor: Send + Sync {
    fn process_audio(&self, data: &[u8]) -> Result<(), AudioError>;

    /// Called once after the last chunk of a pump run.
    fn end_of_stream(&self, outcome: StreamEnd);
}
