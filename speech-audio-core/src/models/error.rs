use thiserror::Error;

/// Errors produced by the fan-out core.
///
/// Three families share this enum: resource failures surfaced synchronously
/// from `bind`, mid-stream failures caught at the pump boundary, and logic
/// misuse by the owner (see [`AudioError::is_logic_error`]).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("failed to open audio source: {0}")]
    ResourceOpen(String),

    #[error("invalid audio format: {0}")]
    InvalidFormat(String),

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    #[error("adapter is already bound to a singleton reader")]
    AlreadyBound,

    #[error("adapter is not bound to a singleton reader")]
    NotBound,

    #[error("pump is already running")]
    AlreadyRunning,

    #[error("pump has no reader")]
    ReaderNotSet,

    #[error("disconnect from client {client_id} with no connected clients")]
    NoClients { client_id: u64 },

    #[error("client {0} is not connected")]
    UnknownClient(u64),

    #[error("client {0} is already connected")]
    ClientAlreadyAttached(u64),

    #[error("cannot terminate with {0} client(s) still attached")]
    ClientsStillAttached(usize),

    #[error("adapter already terminated")]
    AlreadyTerminated,

    #[error("adapter has been terminated")]
    Terminated,

    #[error("stream reader is closed")]
    ReaderClosed,

    #[error("site is not available")]
    SiteUnavailable,

    #[error("capability not supported: {0}")]
    CapabilityMissing(String),

    #[error("unknown component: {0}")]
    UnknownComponent(String),

    #[error("position {position} was discarded (buffer starts at {base})")]
    PositionDiscarded { position: u64, base: u64 },

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl AudioError {
    /// Whether this error is a programming error in the owner rather than an
    /// I/O condition.
    pub fn is_logic_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyBound
                | Self::NotBound
                | Self::AlreadyRunning
                | Self::ReaderNotSet
                | Self::NoClients { .. }
                | Self::UnknownClient(_)
                | Self::ClientAlreadyAttached(_)
                | Self::ClientsStillAttached(_)
                | Self::AlreadyTerminated
                | Self::Terminated
                | Self::ReaderClosed
        )
    }
}
