use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::component::capability::{query_interface, Capability, CapabilityTag, Component};
use crate::component::factory::{
    ComponentFactory, AUDIO_PROCESSOR_WRITE_TO_BUFFER, AUDIO_PUMP, AUDIO_SOURCE_BUFFER_DATA,
    AUDIO_SOURCE_BUFFER_PROPERTIES,
};
use crate::component::site::Site;
use crate::models::audio_format::AudioFormat;
use crate::models::config::FanOutConfiguration;
use crate::models::error::AudioError;
use crate::models::state::PumpState;
use crate::processing::wav_format;
use crate::session::client_reader::SingleToManyStreamReader;
use crate::traits::audio_buffer::AudioBufferData;
use crate::traits::audio_processor::AudioProcessor;
use crate::traits::audio_pump::{AudioPumpControl, PumpErrorSink};
use crate::traits::fan_out_delegate::FanOutDelegate;
use crate::traits::site::{ClientLifetime, ObjectWithSite, ServiceProvider};
use crate::traits::stream_reader::AudioStreamReader;

/// Everything composed by `bind`. Never changes afterwards.
struct Services {
    reader: Arc<dyn AudioStreamReader>,
    pump: Arc<dyn AudioPumpControl>,
    processor: Arc<dyn AudioProcessor>,
    buffer_data: Arc<dyn Component>,
    buffer_properties: Arc<dyn Component>,
    data: Arc<dyn AudioBufferData>,
    format: AudioFormat,
}

/// Client bookkeeping, protected by one lock together with the pump
/// start/stop decision.
#[derive(Debug, Default)]
struct ClientLifetimeState {
    /// Attached clients; its size is the reference count.
    live: BTreeSet<u64>,
    /// Clients created by `create_reader` that have not attached yet.
    pending: BTreeSet<u64>,
    audio_started: bool,
    reader_closed: bool,
    terminated: bool,
}

impl ClientLifetimeState {
    fn is_unused(&self) -> bool {
        self.live.is_empty() && self.pending.is_empty()
    }
}

/// Shares one non-shareable stream reader among any number of clients.
///
/// ```text
/// [singleton reader] → [AudioPump] → [AudioProcessorWriteToBuffer] → [AudioSourceBuffer]
///                                                                     ↑    ↑    ↑
///                                                  [SingleToManyStreamReader] (one per client)
/// ```
///
/// The pump runs while at least one client is attached. When the last
/// client detaches the pump stops and the singleton reader is closed; the
/// reader is never reopened, so the adapter accepts no new clients after
/// that point.
pub struct SingleToManyStreamAdapter {
    self_ref: Weak<SingleToManyStreamAdapter>,
    factory: ComponentFactory,
    services: RwLock<Option<Arc<Services>>>,
    lifetime: Mutex<ClientLifetimeState>,
    next_client_id: AtomicU64,
    last_error: Mutex<Option<AudioError>>,
    error_count: AtomicU64,
    delegate: RwLock<Option<Arc<dyn FanOutDelegate>>>,
}

impl SingleToManyStreamAdapter {
    pub fn new(config: FanOutConfiguration) -> Result<Arc<Self>, AudioError> {
        Self::with_factory(ComponentFactory::new(config))
    }

    /// Build an adapter that composes its parts from `factory`.
    pub fn with_factory(factory: ComponentFactory) -> Result<Arc<Self>, AudioError> {
        factory.config().validate().map_err(AudioError::ConfigurationFailed)?;

        Ok(Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            factory,
            services: RwLock::new(None),
            lifetime: Mutex::new(ClientLifetimeState::default()),
            next_client_id: AtomicU64::new(0),
            last_error: Mutex::new(None),
            error_count: AtomicU64::new(0),
            delegate: RwLock::new(None),
        }))
    }

    pub fn set_delegate(&self, delegate: Arc<dyn FanOutDelegate>) {
        *self.delegate.write() = Some(delegate);
    }

    /// This adapter as a site for the components it composes.
    pub fn site(&self) -> Site {
        let component: Weak<dyn Component> = self.self_ref.clone();
        Site::from_weak(component)
    }

    /// Take ownership of the singleton reader and compose the pump, buffer
    /// writer, buffer and properties around it. One-time.
    pub fn bind(&self, reader: Arc<dyn AudioStreamReader>) -> Result<(), AudioError> {
        if self.lifetime.lock().terminated {
            return Err(AudioError::Terminated);
        }

        let mut services = self.services.write();
        if services.is_some() {
            log::error!("Singleton reader bound twice");
            return Err(AudioError::AlreadyBound);
        }

        let format = query_format(reader.as_ref())?;
        let site = self.site();

        let pump = self
            .factory
            .create_interface_with_site::<dyn AudioPumpControl>(AUDIO_PUMP, site.clone())?;
        pump.set_reader(Arc::clone(&reader));
        pump.set_chunk_size(self.factory.config().chunk_bytes_for(&format));

        // The writer pulls the buffer back out of this adapter through its site.
        let processor = self
            .factory
            .create_interface_with_site::<dyn AudioProcessor>(AUDIO_PROCESSOR_WRITE_TO_BUFFER, site.clone())?;

        let buffer_data = self.factory.create_with_site(AUDIO_SOURCE_BUFFER_DATA, site)?;
        let data = query_interface::<dyn AudioBufferData>(&buffer_data)
            .ok_or_else(|| AudioError::CapabilityMissing(AUDIO_SOURCE_BUFFER_DATA.into()))?;
        let buffer_properties = self
            .factory
            .create_with_site(AUDIO_SOURCE_BUFFER_PROPERTIES, Site::new(&buffer_data))?;

        log::info!(
            "Bound singleton reader: {} Hz, {} bit, {} channel(s), tag {:#06x}",
            format.sample_rate,
            format.bits_per_sample,
            format.channels,
            format.format_tag
        );

        *services = Some(Arc::new(Services {
            reader,
            pump,
            processor,
            buffer_data,
            buffer_properties,
            data,
            format,
        }));
        Ok(())
    }

    /// Create a new logical reader over the shared stream.
    ///
    /// The pump is running before this returns, so the caller can read
    /// immediately.
    pub fn create_reader(&self) -> Result<Arc<SingleToManyStreamReader>, AudioError> {
        let Some(services) = self.services() else {
            return Err(if self.is_terminated() {
                AudioError::Terminated
            } else {
                AudioError::NotBound
            });
        };
        let client_id = self.next_client_id.fetch_add(1, Ordering::SeqCst);

        let started = {
            let mut lifetime = self.lifetime.lock();
            Self::check_accepting(&lifetime)?;
            let started = Self::ensure_audio_started(&mut lifetime, &services)?;
            lifetime.pending.insert(client_id);
            started
        };
        if started {
            self.notify_pump_state(PumpState::Running);
        }

        // Attaching calls back into `reconnect`; the lifetime lock must be free.
        let reader = Arc::new(SingleToManyStreamReader::new(client_id, services.format.clone()));
        if let Err(e) = reader.set_site(self.site()) {
            log::error!("Client {} failed to attach: {}", client_id, e);
            self.abandon_pending(client_id);
            return Err(e);
        }

        log::info!("Created reader for client {} ({} attached)", client_id, self.client_count());
        Ok(reader)
    }

    /// Stop the pump, close the singleton reader and release the buffer.
    /// Requires that no client is attached. One-time.
    pub fn terminate(&self) -> Result<(), AudioError> {
        let stopped = {
            let mut lifetime = self.lifetime.lock();
            if lifetime.terminated {
                log::error!("Adapter terminated twice");
                return Err(AudioError::AlreadyTerminated);
            }
            let attached = lifetime.live.len() + lifetime.pending.len();
            if attached > 0 {
                log::error!("Terminate with {} client(s) attached", attached);
                return Err(AudioError::ClientsStillAttached(attached));
            }
            self.release(&mut lifetime)
        };

        if stopped {
            self.notify_pump_state(PumpState::Idle);
        }
        log::info!("Adapter terminated");
        Ok(())
    }

    /// Number of attached clients.
    pub fn client_count(&self) -> usize {
        self.lifetime.lock().live.len()
    }

    pub fn is_pump_started(&self) -> bool {
        self.lifetime.lock().audio_started
    }

    pub fn is_terminated(&self) -> bool {
        self.lifetime.lock().terminated
    }

    /// State of the pump itself, which may have gone idle on end of stream
    /// while clients are still attached.
    pub fn pump_state(&self) -> PumpState {
        self.services()
            .map(|services| services.pump.state())
            .unwrap_or(PumpState::Idle)
    }

    pub fn format(&self) -> Option<AudioFormat> {
        self.services().map(|services| services.format.clone())
    }

    /// The shared buffer, once bound.
    pub fn buffer(&self) -> Option<Arc<dyn AudioBufferData>> {
        self.services().map(|services| Arc::clone(&services.data))
    }

    /// Most recent error reported by the pump.
    pub fn last_error(&self) -> Option<AudioError> {
        self.last_error.lock().clone()
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::SeqCst)
    }

    // --- Internal helpers ---

    fn services(&self) -> Option<Arc<Services>> {
        self.services.read().clone()
    }

    fn delegate(&self) -> Option<Arc<dyn FanOutDelegate>> {
        self.delegate.read().clone()
    }

    fn check_accepting(lifetime: &ClientLifetimeState) -> Result<(), AudioError> {
        if lifetime.terminated {
            return Err(AudioError::Terminated);
        }
        if lifetime.reader_closed {
            return Err(AudioError::ReaderClosed);
        }
        Ok(())
    }

    /// Start the pump unless it already runs. Returns whether it was started
    /// by this call.
    fn ensure_audio_started(
        lifetime: &mut ClientLifetimeState,
        services: &Services,
    ) -> Result<bool, AudioError> {
        if lifetime.audio_started {
            return Ok(false);
        }
        services.pump.start(Arc::clone(&services.processor))?;
        lifetime.audio_started = true;
        log::info!("Pump started on singleton reader");
        Ok(true)
    }

    /// Stop the pump and close the singleton reader. Returns whether the pump
    /// was stopped by this call.
    fn close_pump_and_stream(&self, lifetime: &mut ClientLifetimeState) -> bool {
        if !lifetime.audio_started {
            return false;
        }
        if let Some(services) = self.services() {
            services.pump.stop();
            Self::close_singleton(lifetime, &services);
        }
        lifetime.audio_started = false;
        true
    }

    fn close_singleton(lifetime: &mut ClientLifetimeState, services: &Services) {
        if lifetime.reader_closed {
            return;
        }
        log::info!("Closing the singleton reader");
        services.reader.close();
        lifetime.reader_closed = true;
    }

    /// Undo the reservation made by `create_reader` for a client that never
    /// attached.
    fn abandon_pending(&self, client_id: u64) {
        let stopped = {
            let mut lifetime = self.lifetime.lock();
            lifetime.pending.remove(&client_id)
                && lifetime.is_unused()
                && self.close_pump_and_stream(&mut lifetime)
        };
        if stopped {
            self.notify_pump_state(PumpState::Idle);
        }
    }

    /// Tear everything down. Returns whether the pump was stopped.
    fn release(&self, lifetime: &mut ClientLifetimeState) -> bool {
        let stopped = self.close_pump_and_stream(lifetime);

        let services = self.services.write().take();
        if let Some(services) = services {
            // Never started, or already closed above; stop is idempotent.
            services.pump.stop();
            Self::close_singleton(lifetime, &services);
            services.data.term();
        }
        lifetime.terminated = true;
        stopped
    }

    fn notify_pump_state(&self, state: PumpState) {
        if let Some(delegate) = self.delegate() {
            delegate.on_pump_state_changed(state);
        }
    }

    fn notify_client_count(&self, count: usize) {
        if let Some(delegate) = self.delegate() {
            delegate.on_client_count_changed(count);
        }
    }
}

/// Two-call format query: ask for the size, then fetch exactly that many bytes.
fn query_format(reader: &dyn AudioStreamReader) -> Result<AudioFormat, AudioError> {
    let required = reader.get_format(None).map_err(open_error)?;
    if required == 0 {
        return Err(AudioError::ResourceOpen("reader reported an empty format".into()));
    }

    let mut bytes = vec![0u8; required];
    let written = reader.get_format(Some(&mut bytes)).map_err(open_error)?;
    if written != required {
        return Err(AudioError::InvalidFormat(format!(
            "format size changed between queries: {} then {}",
            required, written
        )));
    }

    let format = wav_format::decode_format(&bytes)?;
    format.validate().map_err(AudioError::InvalidFormat)?;
    Ok(format)
}

fn open_error(error: AudioError) -> AudioError {
    match error {
        AudioError::ResourceOpen(_) | AudioError::InvalidFormat(_) => error,
        other => AudioError::ResourceOpen(other.to_string()),
    }
}

impl ClientLifetime for SingleToManyStreamAdapter {
    fn reconnect(&self, client_id: u64) -> Result<(), AudioError> {
        let services = self.services().ok_or(AudioError::NotBound)?;

        let (count, started) = {
            let mut lifetime = self.lifetime.lock();
            log::info!("Reconnect client {} ({} attached)", client_id, lifetime.live.len());
            Self::check_accepting(&lifetime)?;
            if lifetime.live.contains(&client_id) {
                log::error!("Client {} reconnected while attached", client_id);
                return Err(AudioError::ClientAlreadyAttached(client_id));
            }

            let started = Self::ensure_audio_started(&mut lifetime, &services)?;
            lifetime.pending.remove(&client_id);
            lifetime.live.insert(client_id);
            (lifetime.live.len(), started)
        };

        if started {
            self.notify_pump_state(PumpState::Running);
        }
        self.notify_client_count(count);
        Ok(())
    }

    fn disconnect(&self, client_id: u64) -> Result<(), AudioError> {
        let (count, stopped) = {
            let mut lifetime = self.lifetime.lock();
            if lifetime.live.is_empty() {
                log::error!("Disconnect client {}: 0 clients", client_id);
                return Err(AudioError::NoClients { client_id });
            }
            if !lifetime.live.remove(&client_id) {
                log::error!("Disconnect client {}: not attached", client_id);
                return Err(AudioError::UnknownClient(client_id));
            }
            log::info!("Disconnect client {} ({} attached)", client_id, lifetime.live.len());

            let stopped = lifetime.is_unused() && self.close_pump_and_stream(&mut lifetime);
            (lifetime.live.len(), stopped)
        };

        self.notify_client_count(count);
        if stopped {
            self.notify_pump_state(PumpState::Idle);
        }
        Ok(())
    }
}

impl PumpErrorSink for SingleToManyStreamAdapter {
    fn error(&self, error: &AudioError) {
        // Clients observe the failure through the buffer's stream status.
        log::error!("Singleton pump error: {}", error);
        self.error_count.fetch_add(1, Ordering::SeqCst);
        *self.last_error.lock() = Some(error.clone());

        if let Some(delegate) = self.delegate() {
            delegate.on_error(error);
        }
    }
}

impl ServiceProvider for SingleToManyStreamAdapter {
    fn query_service(&self, name: &str) -> Option<Arc<dyn Component>> {
        let services = self.services()?;
        if name.eq_ignore_ascii_case(AUDIO_SOURCE_BUFFER_DATA) {
            Some(Arc::clone(&services.buffer_data))
        } else if name.eq_ignore_ascii_case(AUDIO_SOURCE_BUFFER_PROPERTIES) {
            Some(Arc::clone(&services.buffer_properties))
        } else {
            None
        }
    }
}

impl Component for SingleToManyStreamAdapter {
    fn query_capability(self: Arc<Self>, tag: CapabilityTag) -> Option<Capability> {
        match tag {
            CapabilityTag::ServiceProvider => Some(Capability::ServiceProvider(self)),
            CapabilityTag::ClientLifetime => Some(Capability::ClientLifetime(self)),
            CapabilityTag::PumpErrorSink => Some(Capability::PumpErrorSink(self)),
            _ => None,
        }
    }
}

impl Drop for SingleToManyStreamAdapter {
    fn drop(&mut self) {
        let lifetime = self.lifetime.get_mut();
        if lifetime.terminated {
            return;
        }
        if !lifetime.live.is_empty() {
            log::warn!("Adapter dropped with {} client(s) attached", lifetime.live.len());
        }
        let mut lifetime = std::mem::take(lifetime);
        self.release(&mut lifetime);
    }
}
