//! RIFF/WAVE file stream reader.
//!
//! Opens the file once, parses the header up to the `data` chunk, and then
//! hands out raw sample bytes. Only one owner may read it, which makes it a
//! natural singleton for a `SingleToManyStreamAdapter`.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use speech_audio_core::component::capability::{Capability, CapabilityTag, Component};
use speech_audio_core::models::audio_format::AudioFormat;
use speech_audio_core::models::error::AudioError;
use speech_audio_core::processing::wav_format;
use speech_audio_core::traits::stream_reader::AudioStreamReader;

/// Property holding the path the reader was opened from.
pub const FILE_PATH_PROPERTY: &str = "file_path";

/// `data` chunk sizes that mean "until end of file" (streamed WAV output).
const UNBOUNDED_DATA_LENS: [u32; 2] = [0, u32::MAX];

struct OpenFile {
    reader: BufReader<File>,
    /// Sample bytes left in the `data` chunk; `None` reads to end of file.
    remaining: Option<u64>,
}

/// Streams the sample data of a WAV file.
pub struct WavFileReader {
    path: PathBuf,
    format: AudioFormat,
    file: Mutex<Option<OpenFile>>,
    closed: AtomicBool,
}

impl WavFileReader {
    /// Open `path` and parse its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AudioError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .map_err(|e| AudioError::ResourceOpen(format!("{}: {}", path.display(), e)))?;

        let mut reader = BufReader::new(file);
        let header = wav_format::read_wav_header(&mut reader)?;
        header.format.validate().map_err(AudioError::InvalidFormat)?;

        let remaining = (!UNBOUNDED_DATA_LENS.contains(&header.data_len)).then_some(header.data_len as u64);
        log::info!(
            "Opened {}: {} Hz, {} bit, {} channel(s), {:?} data bytes",
            path.display(),
            header.format.sample_rate,
            header.format.bits_per_sample,
            header.format.channels,
            remaining
        );

        Ok(Self {
            path,
            format: header.format,
            file: Mutex::new(Some(OpenFile { reader, remaining })),
            closed: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl AudioStreamReader for WavFileReader {
    fn get_format(&self, format: Option<&mut [u8]>) -> Result<usize, AudioError> {
        wav_format::write_format_query(&self.format, format)
    }

    fn read(&self, buffer: &mut [u8]) -> Result<usize, AudioError> {
        let mut guard = self.file.lock();
        let Some(open) = guard.as_mut() else {
            return Err(AudioError::ReaderClosed);
        };

        let wanted = match open.remaining {
            Some(remaining) => buffer.len().min(remaining as usize),
            None => buffer.len(),
        };
        if wanted == 0 {
            return Ok(0);
        }

        let n = open
            .reader
            .read(&mut buffer[..wanted])
            .map_err(|e| AudioError::ReadFailed(format!("{}: {}", self.path.display(), e)))?;
        if n == 0 && open.remaining.is_some() {
            log::warn!("{} ended before its declared data size", self.path.display());
        }
        if let Some(remaining) = open.remaining.as_mut() {
            *remaining -= n as u64;
        }
        Ok(n)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.file.lock().take();
        log::debug!("Closed {}", self.path.display());
    }

    fn get_property(&self, name: &str) -> Option<String> {
        (name == FILE_PATH_PROPERTY).then(|| self.path.display().to_string())
    }
}

impl Component for WavFileReader {
    fn query_capability(self: Arc<Self>, tag: CapabilityTag) -> Option<Capability> {
        match tag {
            CapabilityTag::StreamReader => Some(Capability::StreamReader(self)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{Duration, Instant};

    use speech_audio_core::models::config::FanOutConfiguration;
    use speech_audio_core::session::single_to_many::SingleToManyStreamAdapter;

    fn temp_wav(name: &str, format: &AudioFormat, samples: &[u8], data_len: Option<u32>) -> PathBuf {
        let path = std::env::temp_dir().join(format!("speech-audio-readers-{}-{}.wav", std::process::id(), name));
        let header = wav_format::generate_wav_header(format, data_len.unwrap_or(samples.len() as u32));
        let mut file = File::create(&path).unwrap();
        file.write_all(&header).unwrap();
        file.write_all(samples).unwrap();
        path
    }

    fn sample_bytes(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 256) as u8).collect()
    }

    #[test]
    fn streams_data_chunk() {
        let format = AudioFormat::pcm(16000, 16, 1);
        let samples = sample_bytes(1000);
        let path = temp_wav("streams", &format, &samples, None);

        let reader = WavFileReader::open(&path).unwrap();
        assert_eq!(reader.format(), &format);

        let mut out = Vec::new();
        let mut buffer = [0u8; 300];
        loop {
            let n = reader.read(&mut buffer).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buffer[..n]);
        }
        assert_eq!(out, samples);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn stops_at_declared_data_size() {
        let format = AudioFormat::pcm(8000, 8, 1);
        // trailing bytes after the data chunk belong to another chunk
        let path = temp_wav("declared", &format, &sample_bytes(64), Some(40));

        let reader = WavFileReader::open(&path).unwrap();
        let mut buffer = [0u8; 64];
        assert_eq!(reader.read(&mut buffer).unwrap(), 40);
        assert_eq!(reader.read(&mut buffer).unwrap(), 0);

        std::fs::remove_file(path).ok();
    }

    fn read_until_eof(reader: &WavFileReader) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buffer = [0u8; 256];
        loop {
            let n = reader.read(&mut buffer).unwrap();
            if n == 0 {
                return out;
            }
            out.extend_from_slice(&buffer[..n]);
        }
    }

    #[test]
    fn streams_to_eof_when_data_size_is_zero() {
        let format = AudioFormat::pcm(16000, 16, 1);
        let samples = sample_bytes(700);
        let path = temp_wav("unbounded-zero", &format, &samples, Some(0));

        let reader = WavFileReader::open(&path).unwrap();
        assert_eq!(read_until_eof(&reader), samples);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn streams_to_eof_when_data_size_is_max() {
        let format = AudioFormat::pcm(16000, 16, 1);
        let samples = sample_bytes(700);
        let path = temp_wav("unbounded-max", &format, &samples, Some(u32::MAX));

        let reader = WavFileReader::open(&path).unwrap();
        assert_eq!(read_until_eof(&reader), samples);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn format_query_matches_header() {
        let format = AudioFormat::pcm(44100, 16, 2);
        let path = temp_wav("format", &format, &sample_bytes(8), None);
        let reader = WavFileReader::open(&path).unwrap();

        let size = reader.get_format(None).unwrap();
        let mut bytes = vec![0u8; size];
        assert_eq!(reader.get_format(Some(&mut bytes)).unwrap(), size);
        assert_eq!(wav_format::decode_format(&bytes).unwrap(), format);
        assert_eq!(reader.get_property(FILE_PATH_PROPERTY), Some(path.display().to_string()));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn close_is_idempotent_and_final() {
        let format = AudioFormat::pcm(16000, 16, 1);
        let path = temp_wav("close", &format, &sample_bytes(16), None);
        let reader = WavFileReader::open(&path).unwrap();

        reader.close();
        reader.close();
        assert!(reader.is_closed());
        assert_eq!(reader.read(&mut [0u8; 4]), Err(AudioError::ReaderClosed));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_is_a_resource_error() {
        let path = std::env::temp_dir().join("speech-audio-readers-does-not-exist.wav");
        assert!(matches!(WavFileReader::open(path), Err(AudioError::ResourceOpen(_))));
    }

    #[test]
    fn rejects_non_wave_file() {
        let path = std::env::temp_dir().join(format!("speech-audio-readers-{}-text.wav", std::process::id()));
        std::fs::write(&path, b"definitely not a riff file").unwrap();
        assert!(matches!(WavFileReader::open(&path), Err(AudioError::InvalidFormat(_))));
        std::fs::remove_file(path).ok();
    }

    fn read_to_end(reader: &dyn AudioStreamReader, done: impl Fn() -> bool) -> Vec<u8> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut out = Vec::new();
        let mut buffer = [0u8; 512];
        loop {
            assert!(Instant::now() < deadline, "timed out reading shared stream");
            let ended = done();
            let n = reader.read(&mut buffer).unwrap();
            out.extend_from_slice(&buffer[..n]);
            if n == 0 {
                if ended {
                    return out;
                }
                std::thread::sleep(Duration::from_millis(1));
            }
        }
    }

    #[test]
    fn two_clients_read_the_whole_file() {
        let format = AudioFormat::pcm(16000, 16, 1);
        let samples = sample_bytes(10_000);
        let path = temp_wav("fan-out", &format, &samples, None);

        let file = Arc::new(WavFileReader::open(&path).unwrap());
        let adapter = SingleToManyStreamAdapter::new(FanOutConfiguration::default()).unwrap();
        adapter.bind(file.clone()).unwrap();

        let first = adapter.create_reader().unwrap();
        let second = adapter.create_reader().unwrap();
        assert_eq!(first.format(), &format);

        let first_bytes = read_to_end(&*first, || !first.stream_status().is_active());
        let second_bytes = read_to_end(&*second, || !second.stream_status().is_active());
        assert_eq!(first_bytes, samples);
        assert_eq!(second_bytes, samples);

        drop(first);
        drop(second);
        assert!(file.is_closed());

        std::fs::remove_file(path).ok();
    }
}
