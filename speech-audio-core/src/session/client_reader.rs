use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::component::capability::{Capability, CapabilityTag, Component};
use crate::component::factory::{AUDIO_SOURCE_BUFFER_DATA, AUDIO_SOURCE_BUFFER_PROPERTIES};
use crate::component::site::Site;
use crate::models::audio_format::AudioFormat;
use crate::models::error::AudioError;
use crate::models::state::StreamStatus;
use crate::processing::wav_format;
use crate::traits::audio_buffer::{AudioBufferData, AudioBufferProperties, BufferRead};
use crate::traits::site::{ClientLifetime, ObjectWithSite};
use crate::traits::stream_reader::AudioStreamReader;

#[derive(Clone)]
struct Attachment {
    site: Site,
    data: Arc<dyn AudioBufferData>,
    properties: Option<Arc<dyn AudioBufferProperties>>,
}

/// One client's view of a shared singleton stream.
///
/// Reads the adapter's shared buffer through its own cursor, so clients never
/// affect each other's position. Attaching to a site registers the client
/// with the adapter; closing (or dropping) unregisters it exactly once.
pub struct SingleToManyStreamReader {
    client_id: u64,
    format: AudioFormat,
    cursor: Mutex<u64>,
    attachment: Mutex<Option<Attachment>>,
    closed: AtomicBool,
}

impl SingleToManyStreamReader {
    pub fn new(client_id: u64, format: AudioFormat) -> Self {
        Self {
            client_id,
            format,
            cursor: Mutex::new(0),
            attachment: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    /// The format captured from the singleton reader at bind time.
    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Offset of the next byte this client will read.
    pub fn position(&self) -> u64 {
        *self.cursor.lock()
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.lock().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// State of the shared stream. `Failed` distinguishes an upstream error
    /// from a normal end even though both read as 0 bytes.
    pub fn stream_status(&self) -> StreamStatus {
        if self.is_closed() {
            return StreamStatus::Ended;
        }
        match self.attachment.lock().as_ref() {
            Some(attachment) => attachment.data.status(),
            None => StreamStatus::Ended,
        }
    }

    fn attachment(&self) -> Result<Attachment, AudioError> {
        if self.is_closed() {
            return Err(AudioError::ReaderClosed);
        }
        self.attachment.lock().clone().ok_or(AudioError::SiteUnavailable)
    }
}

impl AudioStreamReader for SingleToManyStreamReader {
    fn get_format(&self, format: Option<&mut [u8]>) -> Result<usize, AudioError> {
        wav_format::write_format_query(&self.format, format)
    }

    fn read(&self, buffer: &mut [u8]) -> Result<usize, AudioError> {
        let attachment = self.attachment()?;

        let mut cursor = self.cursor.lock();
        match attachment.data.read_at(*cursor, buffer)? {
            BufferRead::Bytes(n) => {
                *cursor += n as u64;
                Ok(n)
            }
            BufferRead::Pending | BufferRead::EndOfStream => Ok(0),
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(attachment) = self.attachment.lock().take() else {
            return;
        };

        match attachment.site.query::<dyn ClientLifetime>() {
            Some(lifetime) => {
                if let Err(e) = lifetime.disconnect(self.client_id) {
                    log::error!("Client {} failed to disconnect: {}", self.client_id, e);
                }
            }
            None => log::warn!("Client {} closed after its adapter was released", self.client_id),
        }
    }

    fn get_property(&self, name: &str) -> Option<String> {
        let attachment = self.attachment().ok()?;
        let position = self.position();
        attachment.properties?.property_at(name, position)
    }
}

impl ObjectWithSite for SingleToManyStreamReader {
    /// Resolve the shared buffer through `site` and register with the
    /// adapter. Calls back into the site.
    fn set_site(&self, site: Site) -> Result<(), AudioError> {
        if self.is_closed() {
            return Err(AudioError::ReaderClosed);
        }
        if self.is_attached() {
            log::warn!("Client {} is already attached", self.client_id);
            return Ok(());
        }

        let lifetime = site
            .query::<dyn ClientLifetime>()
            .ok_or_else(|| AudioError::CapabilityMissing("client lifetime on reader site".into()))?;
        let data = site
            .query_service_interface::<dyn AudioBufferData>(AUDIO_SOURCE_BUFFER_DATA)
            .ok_or_else(|| AudioError::CapabilityMissing(AUDIO_SOURCE_BUFFER_DATA.into()))?;
        let properties =
            site.query_service_interface::<dyn AudioBufferProperties>(AUDIO_SOURCE_BUFFER_PROPERTIES);

        lifetime.reconnect(self.client_id)?;

        *self.attachment.lock() = Some(Attachment {
            site,
            data,
            properties,
        });
        Ok(())
    }
}

impl Component for SingleToManyStreamReader {
    fn query_capability(self: Arc<Self>, tag: CapabilityTag) -> Option<Capability> {
        match tag {
            CapabilityTag::StreamReader => Some(Capability::StreamReader(self)),
            CapabilityTag::ObjectWithSite => Some(Capability::ObjectWithSite(self)),
            _ => None,
        }
    }
}

impl Drop for SingleToManyStreamReader {
    fn drop(&mut self) {
        self.close();
    }
}
