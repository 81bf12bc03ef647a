use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::component::capability::{Capability, CapabilityTag, Component};
use crate::component::site::Site;
use crate::models::config::MAX_CHUNK_BYTES;
use crate::models::error::AudioError;
use crate::models::state::{PumpState, StreamEnd};
use crate::traits::audio_processor::AudioProcessor;
use crate::traits::audio_pump::{AudioPumpControl, PumpErrorSink};
use crate::traits::site::ObjectWithSite;
use crate::traits::stream_reader::AudioStreamReader;

const DEFAULT_CHUNK_BYTES: usize = 3200;

/// Drives one stream reader into one processor on a dedicated thread.
///
/// ```text
/// [AudioStreamReader] → read loop (pump thread) → [AudioProcessor]
/// ```
///
/// The loop ends on end of stream, on the first read/processing error, or
/// when [`AudioPumpControl::stop`] is called. Errors go once to the
/// [`PumpErrorSink`] found through the pump's site; nothing is retried.
pub struct AudioPump {
    thread_name: String,
    site: Mutex<Option<Site>>,
    reader: Mutex<Option<Arc<dyn AudioStreamReader>>>,
    chunk_size: AtomicUsize,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<PumpState>>,
    pump_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl AudioPump {
    pub fn new() -> Self {
        Self::with_thread_name("audio-pump")
    }

    pub fn with_thread_name(name: &str) -> Self {
        Self {
            thread_name: name.to_string(),
            site: Mutex::new(None),
            reader: Mutex::new(None),
            chunk_size: AtomicUsize::new(DEFAULT_CHUNK_BYTES),
            running: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(PumpState::Idle)),
            pump_handle: Mutex::new(None),
        }
    }

    /// Join a previous run that ended on its own.
    fn reap_finished_run(&self) {
        if let Some(handle) = self.pump_handle.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Default for AudioPump {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPumpControl for AudioPump {
    fn set_reader(&self, reader: Arc<dyn AudioStreamReader>) {
        *self.reader.lock() = Some(reader);
    }

    fn set_chunk_size(&self, bytes: usize) {
        self.chunk_size.store(bytes.clamp(1, MAX_CHUNK_BYTES), Ordering::SeqCst);
    }

    fn start(&self, processor: Arc<dyn AudioProcessor>) -> Result<(), AudioError> {
        if self.state.lock().is_running() {
            return Err(AudioError::AlreadyRunning);
        }
        let reader = self.reader.lock().clone().ok_or(AudioError::ReaderNotSet)?;

        self.reap_finished_run();

        let site = self.site.lock().clone();
        let chunk_size = self.chunk_size.load(Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let state = Arc::clone(&self.state);

        running.store(true, Ordering::SeqCst);
        *state.lock() = PumpState::Running;

        let spawned = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                let outcome = pump_loop(&running, reader.as_ref(), processor.as_ref(), chunk_size);
                running.store(false, Ordering::SeqCst);

                if let StreamEnd::Failed(ref error) = outcome {
                    log::error!("Audio pump stopped on error: {}", error);
                    match site.as_ref().and_then(|site| site.query::<dyn PumpErrorSink>()) {
                        Some(sink) => sink.error(error),
                        None => log::warn!("Audio pump has no error sink"),
                    }
                } else {
                    log::debug!("Audio pump finished: {:?}", outcome);
                }

                processor.end_of_stream(outcome);
                *state.lock() = PumpState::Idle;
            });

        match spawned {
            Ok(handle) => {
                *self.pump_handle.lock() = Some(handle);
                log::info!("Audio pump started ({} byte chunks)", chunk_size);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                *self.state.lock() = PumpState::Idle;
                Err(AudioError::Unknown(format!("failed to spawn pump thread: {}", e)))
            }
        }
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        let handle = self.pump_handle.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                log::warn!("Audio pump stop requested from the pump thread; not joining");
                return;
            }
            let _ = handle.join();
            log::info!("Audio pump stopped");
        }
        *self.state.lock() = PumpState::Idle;
    }

    fn state(&self) -> PumpState {
        *self.state.lock()
    }
}

impl ObjectWithSite for AudioPump {
    fn set_site(&self, site: Site) -> Result<(), AudioError> {
        *self.site.lock() = Some(site);
        Ok(())
    }
}

impl Component for AudioPump {
    fn query_capability(self: Arc<Self>, tag: CapabilityTag) -> Option<Capability> {
        match tag {
            CapabilityTag::PumpControl => Some(Capability::PumpControl(self)),
            CapabilityTag::ObjectWithSite => Some(Capability::ObjectWithSite(self)),
            _ => None,
        }
    }
}

impl Drop for AudioPump {
    fn drop(&mut self) {
        self.stop();
    }
}

fn pump_loop(
    running: &AtomicBool,
    reader: &dyn AudioStreamReader,
    processor: &dyn AudioProcessor,
    chunk_size: usize,
) -> StreamEnd {
    let mut buffer = vec![0u8; chunk_size];
    while running.load(Ordering::SeqCst) {
        match reader.read(&mut buffer) {
            Ok(0) => return StreamEnd::Completed,
            Ok(n) => {
                if let Err(e) = processor.process_audio(&buffer[..n]) {
                    return StreamEnd::Failed(e);
                }
            }
            Err(e) => return StreamEnd::Failed(e),
        }
    }
    StreamEnd::Stopped
}
