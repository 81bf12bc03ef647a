use std::time::Duration;

/// Format tag for integer PCM.
pub const FORMAT_TAG_PCM: u16 = 1;

/// Format tag for IEEE float samples.
pub const FORMAT_TAG_IEEE_FLOAT: u16 = 3;

/// Byte-format descriptor of the audio flowing through a stream reader.
///
/// Captured once from the singleton reader and copied into every client
/// reader. The byte layout exchanged through `get_format` is produced by
/// [`crate::processing::wav_format::encode_format`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Codec-specific trailing bytes.
    pub extra: Vec<u8>,
}

impl AudioFormat {
    /// Integer PCM with derived byte rate and block alignment.
    pub fn pcm(sample_rate: u32, bits_per_sample: u16, channels: u16) -> Self {
        let block_align = channels * bits_per_sample / 8;
        Self {
            format_tag: FORMAT_TAG_PCM,
            channels,
            sample_rate,
            avg_bytes_per_sec: sample_rate * block_align as u32,
            block_align,
            bits_per_sample,
            extra: Vec::new(),
        }
    }

    pub fn is_pcm(&self) -> bool {
        self.format_tag == FORMAT_TAG_PCM
    }

    /// Number of bytes covering `duration`, rounded down to whole blocks.
    ///
    /// Returns 0 when the format does not report a byte rate.
    pub fn bytes_for_duration(&self, duration: Duration) -> usize {
        let raw = (self.avg_bytes_per_sec as f64 * duration.as_secs_f64()) as usize;
        match self.block_align as usize {
            0 => raw,
            align => raw - raw % align,
        }
    }

    /// Playback time of `bytes`. Zero when the format does not report a byte rate.
    pub fn duration_of(&self, bytes: usize) -> Duration {
        match self.avg_bytes_per_sec {
            0 => Duration::ZERO,
            rate => Duration::from_secs_f64(bytes as f64 / rate as f64),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.channels == 0 {
            return Err("channel count must be positive".into());
        }
        if self.is_pcm() && ![8, 16, 24, 32].contains(&self.bits_per_sample) {
            return Err(format!("unsupported bit depth: {}", self.bits_per_sample));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_derives_rates() {
        let format = AudioFormat::pcm(16000, 16, 1);
        assert_eq!(format.block_align, 2);
        assert_eq!(format.avg_bytes_per_sec, 32000);
        assert!(format.validate().is_ok());
    }

    #[test]
    fn bytes_for_duration_respects_block_align() {
        let format = AudioFormat::pcm(44100, 16, 2);
        let bytes = format.bytes_for_duration(Duration::from_millis(100));
        assert_eq!(bytes % 4, 0);
        assert_eq!(bytes, 17640);
    }

    #[test]
    fn duration_of_inverts_byte_rate() {
        let format = AudioFormat::pcm(16000, 16, 1);
        assert_eq!(format.duration_of(3200), Duration::from_millis(100));

        let mut unknown = format.clone();
        unknown.avg_bytes_per_sec = 0;
        assert_eq!(unknown.duration_of(3200), Duration::ZERO);
    }

    #[test]
    fn validate_rejects_zero_rate() {
        let mut format = AudioFormat::pcm(16000, 16, 1);
        format.sample_rate = 0;
        assert!(format.validate().is_err());
    }
}
