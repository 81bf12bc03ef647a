//! # speech-audio-readers
//!
//! Single-owner stream readers for `speech-audio-core`.
//!
//! Provides:
//! - `WavFileReader`: streams the samples of a RIFF/WAVE file
//! - `MemoryStreamReader`: serves an in-memory buffer, optionally paced like a live device
//!
//! Either can be bound to a `SingleToManyStreamAdapter` as its singleton reader.
//!
//! ## Usage
//! ```ignore
//! use speech_audio_core::{FanOutConfiguration, SingleToManyStreamAdapter};
//! use speech_audio_readers::WavFileReader;
//!
//! let adapter = SingleToManyStreamAdapter::new(FanOutConfiguration::default())?;
//! adapter.bind(Arc::new(WavFileReader::open("utterance.wav")?))?;
//! let first = adapter.create_reader()?;
//! let second = adapter.create_reader()?;
//! ```

pub mod memory;
pub mod wav_file;

pub use memory::MemoryStreamReader;
pub use wav_file::WavFileReader;
