use super::error::AudioError;

/// Audio pump state machine.
///
/// ```text
/// idle → running → idle
/// ```
/// The pump falls back to idle on its own when the reader ends or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    Idle,
    Running,
}

impl PumpState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// How the pump's stream came to an end, as seen by its processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// The reader reported end of stream.
    Completed,
    /// The owner stopped the pump.
    Stopped,
    /// A read or processing error ended the loop.
    Failed(AudioError),
}

/// Stream status observed through the shared buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    Active,
    Ended,
    Failed(AudioError),
}

impl StreamStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl From<StreamEnd> for StreamStatus {
    fn from(end: StreamEnd) -> Self {
        match end {
            StreamEnd::Completed | StreamEnd::Stopped => Self::Ended,
            StreamEnd::Failed(error) => Self::Failed(error),
        }
    }
}
