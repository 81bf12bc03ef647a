//! WAVE format utilities.
//!
//! Encodes and decodes the format descriptor exchanged through the
//! two-call `get_format` query, and generates/parses RIFF WAVE file headers.
//!
//! Descriptor layout (little-endian, 18 bytes + extra):
//! ```text
//! [0-1]    format tag
//! [2-3]    channels
//! [4-7]    sample rate
//! [8-11]   average bytes per second
//! [12-13]  block align
//! [14-15]  bits per sample
//! [16-17]  extra size (n)
//! [18..]   n extra bytes
//! ```
use std::io::Read;

use crate::models::audio_format::AudioFormat;
use crate::models::error::AudioError;

/// Size of the fixed part of the format descriptor.
pub const FORMAT_DESCRIPTOR_SIZE: usize = 18;

/// Size of the canonical PCM WAV header.
pub const WAV_HEADER_SIZE: usize = 44;

/// Largest `fmt ` chunk accepted: the fixed descriptor plus the most extra
/// bytes its 16-bit size field can declare.
pub const MAX_FORMAT_CHUNK_SIZE: usize = FORMAT_DESCRIPTOR_SIZE + u16::MAX as usize;

/// Number of bytes `encode_format` produces for `format`.
pub fn encoded_len(format: &AudioFormat) -> usize {
    FORMAT_DESCRIPTOR_SIZE + format.extra.len()
}

pub fn encode_format(format: &AudioFormat) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(encoded_len(format));
    bytes.extend_from_slice(&format.format_tag.to_le_bytes());
    bytes.extend_from_slice(&format.channels.to_le_bytes());
    bytes.extend_from_slice(&format.sample_rate.to_le_bytes());
    bytes.extend_from_slice(&format.avg_bytes_per_sec.to_le_bytes());
    bytes.extend_from_slice(&format.block_align.to_le_bytes());
    bytes.extend_from_slice(&format.bits_per_sample.to_le_bytes());
    bytes.extend_from_slice(&(format.extra.len() as u16).to_le_bytes());
    bytes.extend_from_slice(&format.extra);
    bytes
}

/// Decode a descriptor. A bare 16-byte PCM `fmt ` body (no extra-size field)
/// is accepted too.
pub fn decode_format(bytes: &[u8]) -> Result<AudioFormat, AudioError> {
    if bytes.len() < 16 {
        return Err(AudioError::InvalidFormat(format!(
            "format descriptor too short: {} bytes",
            bytes.len()
        )));
    }

    let extra = if bytes.len() >= FORMAT_DESCRIPTOR_SIZE {
        let extra_len = u16_at(bytes, 16) as usize;
        let end = FORMAT_DESCRIPTOR_SIZE + extra_len;
        if bytes.len() < end {
            return Err(AudioError::InvalidFormat(format!(
                "format declares {} extra bytes, only {} present",
                extra_len,
                bytes.len() - FORMAT_DESCRIPTOR_SIZE
            )));
        }
        bytes[FORMAT_DESCRIPTOR_SIZE..end].to_vec()
    } else {
        Vec::new()
    };

    Ok(AudioFormat {
        format_tag: u16_at(bytes, 0),
        channels: u16_at(bytes, 2),
        sample_rate: u32_at(bytes, 4),
        avg_bytes_per_sec: u32_at(bytes, 8),
        block_align: u16_at(bytes, 12),
        bits_per_sample: u16_at(bytes, 14),
        extra,
    })
}

/// Copy the encoded descriptor into `out`, following the two-call query:
/// with `None` only the required size is returned; with `Some` the buffer
/// must be at least that size.
pub fn write_format_query(format: &AudioFormat, out: Option<&mut [u8]>) -> Result<usize, AudioError> {
    let encoded = encode_format(format);
    if let Some(out) = out {
        if out.len() < encoded.len() {
            return Err(AudioError::InvalidFormat(format!(
                "format buffer holds {} bytes, {} required",
                out.len(),
                encoded.len()
            )));
        }
        out[..encoded.len()].copy_from_slice(&encoded);
    }
    Ok(encoded.len())
}

/// Generate a 44-byte PCM RIFF header.
///
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size (saturating)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16
/// [20-35]  format descriptor without extra size
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(format: &AudioFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&data_size.saturating_add(36).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..36].copy_from_slice(&encode_format(format)[..16]);

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Header information of a WAV stream positioned at the start of its samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavHeader {
    pub format: AudioFormat,
    /// Declared size of the `data` chunk.
    pub data_len: u32,
}

/// Read RIFF chunks up to the `data` chunk, leaving `reader` positioned at
/// the first sample byte. Chunks other than `fmt ` and `data` are skipped.
pub fn read_wav_header<R: Read>(reader: &mut R) -> Result<WavHeader, AudioError> {
    let mut riff = [0u8; 12];
    read_exact(reader, &mut riff)?;
    if &riff[0..4] != b"RIFF" || &riff[8..12] != b"WAVE" {
        return Err(AudioError::InvalidFormat("not a RIFF/WAVE stream".into()));
    }

    let mut format = None;
    loop {
        let mut chunk_header = [0u8; 8];
        read_exact(reader, &mut chunk_header)?;
        let chunk_len = u32_at(&chunk_header, 4);

        match &chunk_header[0..4] {
            b"fmt " => {
                if chunk_len as usize > MAX_FORMAT_CHUNK_SIZE {
                    return Err(AudioError::InvalidFormat(format!(
                        "fmt chunk of {} bytes exceeds {}",
                        chunk_len, MAX_FORMAT_CHUNK_SIZE
                    )));
                }
                let mut body = vec![0u8; chunk_len as usize];
                read_exact(reader, &mut body)?;
                skip_padding(reader, chunk_len)?;
                format = Some(decode_format(&body)?);
            }
            b"data" => {
                let format = format
                    .ok_or_else(|| AudioError::InvalidFormat("data chunk before fmt chunk".into()))?;
                return Ok(WavHeader {
                    format,
                    data_len: chunk_len,
                });
            }
            _ => {
                let padded = chunk_len as u64 + (chunk_len & 1) as u64;
                let skipped = std::io::copy(&mut reader.by_ref().take(padded), &mut std::io::sink())
                    .map_err(|e| AudioError::ReadFailed(e.to_string()))?;
                if skipped != padded {
                    return Err(AudioError::InvalidFormat("truncated RIFF chunk".into()));
                }
            }
        }
    }
}

fn skip_padding<R: Read>(reader: &mut R, chunk_len: u32) -> Result<(), AudioError> {
    if chunk_len & 1 == 1 {
        let mut pad = [0u8; 1];
        read_exact(reader, &mut pad)?;
    }
    Ok(())
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), AudioError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => AudioError::InvalidFormat("truncated WAV header".into()),
        _ => AudioError::ReadFailed(e.to_string()),
    })
}

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_layout_16khz_mono() {
        let bytes = encode_format(&AudioFormat::pcm(16000, 16, 1));
        assert_eq!(bytes.len(), FORMAT_DESCRIPTOR_SIZE);

        assert_eq!(u16_at(&bytes, 0), 1); // PCM
        assert_eq!(u16_at(&bytes, 2), 1);
        assert_eq!(u32_at(&bytes, 4), 16000);
        assert_eq!(u32_at(&bytes, 8), 32000);
        assert_eq!(u16_at(&bytes, 12), 2);
        assert_eq!(u16_at(&bytes, 14), 16);
        assert_eq!(u16_at(&bytes, 16), 0);
    }

    #[test]
    fn decode_keeps_extra_bytes() {
        let mut format = AudioFormat::pcm(8000, 8, 1);
        format.format_tag = 0x0011;
        format.extra = vec![0xf9, 0x01];

        let bytes = encode_format(&format);
        assert_eq!(bytes.len(), 20);
        assert_eq!(decode_format(&bytes).unwrap(), format);
    }

    #[test]
    fn decode_rejects_short_descriptor() {
        assert!(matches!(decode_format(&[1, 0, 1, 0]), Err(AudioError::InvalidFormat(_))));

        let mut bytes = encode_format(&AudioFormat::pcm(16000, 16, 1));
        bytes[16] = 4; // claims 4 extra bytes that are not there
        assert!(decode_format(&bytes).is_err());
    }

    #[test]
    fn format_query_reports_size_then_fills() {
        let format = AudioFormat::pcm(16000, 16, 1);
        let size = write_format_query(&format, None).unwrap();
        assert_eq!(size, 18);

        let mut buf = vec![0u8; size];
        assert_eq!(write_format_query(&format, Some(&mut buf)).unwrap(), size);
        assert_eq!(decode_format(&buf).unwrap(), format);

        let mut small = vec![0u8; size - 1];
        assert!(write_format_query(&format, Some(&mut small)).is_err());
    }

    #[test]
    fn header_48khz_stereo_16bit() {
        let header = generate_wav_header(&AudioFormat::pcm(48000, 16, 2), 9600);

        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[36..40], b"data");
        assert_eq!(u32_at(&header, 4), 36 + 9600);
        assert_eq!(u32_at(&header, 24), 48000);
        assert_eq!(u32_at(&header, 28), 192000);
        assert_eq!(u16_at(&header, 32), 4);
        assert_eq!(u32_at(&header, 40), 9600);
    }

    #[test]
    fn read_header_skips_unknown_chunks() {
        let format = AudioFormat::pcm(16000, 16, 1);
        let header = generate_wav_header(&format, 4);

        let mut stream = Vec::new();
        stream.extend_from_slice(&header[..36]);
        stream.extend_from_slice(b"LIST");
        stream.extend_from_slice(&3u32.to_le_bytes());
        stream.extend_from_slice(&[1, 2, 3, 0]); // odd chunk + pad byte
        stream.extend_from_slice(&header[36..]);
        stream.extend_from_slice(&[10, 20, 30, 40]);

        let mut cursor = std::io::Cursor::new(stream);
        let parsed = read_wav_header(&mut cursor).unwrap();
        assert_eq!(parsed.format, format);
        assert_eq!(parsed.data_len, 4);

        let mut samples = Vec::new();
        cursor.read_to_end(&mut samples).unwrap();
        assert_eq!(samples, vec![10, 20, 30, 40]);
    }

    #[test]
    fn header_saturates_streaming_data_size() {
        let header = generate_wav_header(&AudioFormat::pcm(16000, 16, 1), u32::MAX);
        assert_eq!(u32_at(&header, 4), u32::MAX);
        assert_eq!(u32_at(&header, 40), u32::MAX);
    }

    #[test]
    fn read_header_rejects_oversized_fmt_chunk() {
        let mut stream = Vec::new();
        stream.extend_from_slice(b"RIFF");
        stream.extend_from_slice(&28u32.to_le_bytes());
        stream.extend_from_slice(b"WAVE");
        stream.extend_from_slice(b"fmt ");
        stream.extend_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        stream.extend_from_slice(&[0u8; 16]);

        let mut cursor = std::io::Cursor::new(stream);
        match read_wav_header(&mut cursor) {
            Err(AudioError::InvalidFormat(message)) => assert!(message.contains("exceeds")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn read_header_rejects_non_wave() {
        let mut cursor = std::io::Cursor::new(b"RIFX\0\0\0\0WAVE".to_vec());
        assert!(matches!(read_wav_header(&mut cursor), Err(AudioError::InvalidFormat(_))));
    }
}
