use crate::models::error::AudioError;

/// Pull-based audio stream reader.
///
/// Implemented by singleton sources (microphone, file) and by the per-client
/// logical readers handed out by the fan-out adapter.
pub trait AudioStreamReader: Send + Sync {
    /// Two-call format query. With `None`, returns the number of bytes the
    /// encoded format needs. With `Some(buf)` sized from the first call,
    /// fills it and returns the same size.
    fn get_format(&self, format: Option<&mut [u8]>) -> Result<usize, AudioError>;

    /// Read up to `buffer.len()` bytes. `Ok(0)` means no data: end of stream
    /// for a singleton reader, caught-up or ended for a logical reader.
    fn read(&self, buffer: &mut [u8]) -> Result<usize, AudioError>;

    /// Release the underlying source.
    fn close(&self);

    /// Out-of-band property associated with the current read position.
    fn get_property(&self, _name: &str) -> Option<String> {
        None
    }
}
