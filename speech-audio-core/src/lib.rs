//! # speech-audio-core
//!
//! Single-source, multi-client audio stream fan-out.
//!
//! Wraps one non-shareable audio stream reader (a capture device, a file) so
//! that any number of clients can each read the complete stream through their
//! own logical reader. A pump thread drains the singleton into a shared,
//! position-addressed buffer; clients read the buffer at independent cursors.
//!
//! Parts find each other through a small capability-query object model
//! instead of concrete types, so any of them can be swapped through the
//! [`ComponentFactory`].
//!
//! ## Architecture
//!
//! ```text
//! speech-audio-core (this crate)
//! ├── component/    ← Component, Capability, Site, ComponentFactory
//! ├── traits/       ← AudioStreamReader, AudioProcessor, AudioPumpControl, AudioBufferData, ...
//! ├── models/       ← AudioError, AudioFormat, PumpState, StreamStatus, FanOutConfiguration
//! ├── processing/   ← AudioPump, AudioProcessorWriteToBuffer, AudioSourceBuffer, WAV format
//! └── session/      ← SingleToManyStreamAdapter, SingleToManyStreamReader
//! ```

pub mod component;
pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use component::capability::{query, query_interface, Capability, CapabilityTag, Component, Interface};
pub use component::factory::ComponentFactory;
pub use component::site::Site;
pub use models::audio_format::AudioFormat;
pub use models::config::FanOutConfiguration;
pub use models::error::AudioError;
pub use models::state::{PumpState, StreamEnd, StreamStatus};
pub use processing::buffer_properties::AudioSourceBufferProperties;
pub use processing::buffer_writer::AudioProcessorWriteToBuffer;
pub use processing::pump::AudioPump;
pub use processing::source_buffer::AudioSourceBuffer;
pub use session::client_reader::SingleToManyStreamReader;
pub use session::single_to_many::SingleToManyStreamAdapter;
pub use traits::audio_buffer::{AudioBufferData, AudioBufferProperties, BufferRead, PropertyRecord};
pub use traits::audio_processor::AudioProcessor;
pub use traits::audio_pump::{AudioPumpControl, PumpErrorSink};
pub use traits::fan_out_delegate::FanOutDelegate;
pub use traits::site::{ClientLifetime, ObjectWithSite, ServiceProvider};
pub use traits::stream_reader::AudioStreamReader;
