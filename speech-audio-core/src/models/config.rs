use std::time::Duration;

use serde::Deserialize;

use super::audio_format::AudioFormat;
use super::error::AudioError;

/// Longest chunk the pump may read in one iteration.
pub const MAX_CHUNK_DURATION_MS: u32 = 10_000;

/// Upper bound on the pump's read size, whatever the format reports.
pub const MAX_CHUNK_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for a single-to-many stream adapter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FanOutConfiguration {
    /// Duration of audio the pump reads per iteration (default: 100 ms).
    pub chunk_duration_ms: u32,

    /// Read size used when the format does not report a byte rate (default: 3200).
    pub fallback_chunk_bytes: usize,

    /// Name given to the pump thread (default: "audio-pump").
    pub pump_thread_name: String,
}

impl FanOutConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_duration_ms == 0 {
            return Err("chunk duration must be positive".into());
        }
        if self.chunk_duration_ms > MAX_CHUNK_DURATION_MS {
            return Err(format!(
                "chunk duration {} ms exceeds {} ms",
                self.chunk_duration_ms, MAX_CHUNK_DURATION_MS
            ));
        }
        if self.fallback_chunk_bytes == 0 {
            return Err("fallback chunk size must be positive".into());
        }
        if self.fallback_chunk_bytes > MAX_CHUNK_BYTES {
            return Err(format!(
                "fallback chunk size {} exceeds {} bytes",
                self.fallback_chunk_bytes, MAX_CHUNK_BYTES
            ));
        }
        if self.pump_thread_name.is_empty() {
            return Err("pump thread name must not be empty".into());
        }
        Ok(())
    }

    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, AudioError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AudioError::ConfigurationFailed(format!("failed to parse configuration: {}", e)))?;
        config.validate().map_err(AudioError::ConfigurationFailed)?;
        Ok(config)
    }

    /// Pump read size for `format`, never more than [`MAX_CHUNK_BYTES`].
    pub fn chunk_bytes_for(&self, format: &AudioFormat) -> usize {
        let bytes = match format.bytes_for_duration(Duration::from_millis(self.chunk_duration_ms as u64)) {
            0 => self.fallback_chunk_bytes,
            bytes => bytes,
        };
        bytes.min(MAX_CHUNK_BYTES)
    }
}

impl Default for FanOutConfiguration {
    fn default() -> Self {
        Self {
            chunk_duration_ms: 100,
            fallback_chunk_bytes: 3200,
            pump_thread_name: "audio-pump".into(),
        }
    }
}
