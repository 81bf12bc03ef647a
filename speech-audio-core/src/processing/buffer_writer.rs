use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;

use crate::component::capability::{Capability, CapabilityTag, Component};
use crate::component::factory::{AUDIO_SOURCE_BUFFER_DATA, AUDIO_SOURCE_BUFFER_PROPERTIES};
use crate::component::site::Site;
use crate::models::error::AudioError;
use crate::models::state::StreamEnd;
use crate::traits::audio_buffer::{AudioBufferData, AudioBufferProperties};
use crate::traits::audio_processor::AudioProcessor;
use crate::traits::site::ObjectWithSite;

/// Property recorded at the start of every chunk: wall-clock capture time
/// (RFC 3339, microsecond precision, UTC).
pub const CAPTURE_TIMESTAMP_PROPERTY: &str = "capture_timestamp";

#[derive(Clone)]
struct Targets {
    data: Arc<dyn AudioBufferData>,
    properties: Option<Arc<dyn AudioBufferProperties>>,
}

/// Pump processor that appends every chunk to the shared buffer.
///
/// Holds no buffer of its own: the buffer data and properties services are
/// pulled from its site on first use.
pub struct AudioProcessorWriteToBuffer {
    site: Mutex<Option<Site>>,
    targets: Mutex<Option<Targets>>,
}

impl AudioProcessorWriteToBuffer {
    pub fn new() -> Self {
        Self {
            site: Mutex::new(None),
            targets: Mutex::new(None),
        }
    }

    fn targets(&self) -> Result<Targets, AudioError> {
        let mut cached = self.targets.lock();
        if let Some(targets) = cached.as_ref() {
            return Ok(targets.clone());
        }

        let site = self.site.lock().clone().ok_or(AudioError::SiteUnavailable)?;
        let data = site
            .query_service_interface::<dyn AudioBufferData>(AUDIO_SOURCE_BUFFER_DATA)
            .ok_or_else(|| AudioError::CapabilityMissing(AUDIO_SOURCE_BUFFER_DATA.into()))?;
        let properties =
            site.query_service_interface::<dyn AudioBufferProperties>(AUDIO_SOURCE_BUFFER_PROPERTIES);

        let targets = Targets { data, properties };
        *cached = Some(targets.clone());
        Ok(targets)
    }
}

impl Default for AudioProcessorWriteToBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioProcessor for AudioProcessorWriteToBuffer {
    fn process_audio(&self, data: &[u8]) -> Result<(), AudioError> {
        let targets = self
            .targets()
            .map_err(|e| AudioError::ProcessingFailed(format!("no buffer to write to: {}", e)))?;

        if let Some(properties) = targets.properties {
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
            properties.set_property(CAPTURE_TIMESTAMP_PROPERTY, &now)?;
        }
        targets.data.write(data);
        Ok(())
    }

    fn end_of_stream(&self, outcome: StreamEnd) {
        match self.targets() {
            Ok(targets) => targets.data.end_of_stream(outcome),
            Err(e) => log::warn!("End of stream ({:?}) with no buffer: {}", outcome, e),
        }
    }
}

impl ObjectWithSite for AudioProcessorWriteToBuffer {
    fn set_site(&self, site: Site) -> Result<(), AudioError> {
        *self.site.lock() = Some(site);
        *self.targets.lock() = None;
        Ok(())
    }
}

impl Component for AudioProcessorWriteToBuffer {
    fn query_capability(self: Arc<Self>, tag: CapabilityTag) -> Option<Capability> {
        match tag {
            CapabilityTag::AudioProcessor => Some(Capability::AudioProcessor(self)),
            CapabilityTag::ObjectWithSite => Some(Capability::ObjectWithSite(self)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::state::StreamStatus;
    use crate::processing::buffer_properties::AudioSourceBufferProperties;
    use crate::processing::source_buffer::AudioSourceBuffer;
    use crate::traits::site::ServiceProvider;

    /// Minimal site offering the two buffer services.
    struct BufferHost {
        data: Arc<dyn Component>,
        properties: Arc<dyn Component>,
    }

    impl ServiceProvider for BufferHost {
        fn query_service(&self, name: &str) -> Option<Arc<dyn Component>> {
            match name {
                AUDIO_SOURCE_BUFFER_DATA => Some(self.data.clone()),
                AUDIO_SOURCE_BUFFER_PROPERTIES => Some(self.properties.clone()),
                _ => None,
            }
        }
    }

    impl Component for BufferHost {
        fn query_capability(self: Arc<Self>, tag: CapabilityTag) -> Option<Capability> {
            match tag {
                CapabilityTag::ServiceProvider => Some(Capability::ServiceProvider(self)),
                _ => None,
            }
        }
    }

    fn host() -> (Arc<AudioSourceBuffer>, Arc<AudioSourceBufferProperties>, Arc<dyn Component>) {
        let data = Arc::new(AudioSourceBuffer::new());
        let data_component: Arc<dyn Component> = data.clone();
        let properties = Arc::new(AudioSourceBufferProperties::new());
        properties.set_site(Site::new(&data_component)).unwrap();
        let host: Arc<dyn Component> = Arc::new(BufferHost {
            data: data_component,
            properties: properties.clone(),
        });
        (data, properties, host)
    }

    #[test]
    fn writes_chunks_and_timestamps() {
        let (data, properties, host) = host();
        let writer = AudioProcessorWriteToBuffer::new();
        writer.set_site(Site::new(&host)).unwrap();

        writer.process_audio(&[1, 2, 3, 4]).unwrap();
        writer.process_audio(&[5, 6]).unwrap();

        assert_eq!(data.total_bytes(), 6);
        let stamps = properties.records_in(0, 6);
        assert_eq!(stamps.len(), 2);
        assert_eq!(stamps[0].position, 0);
        assert_eq!(stamps[1].position, 4);
        assert!(chrono::DateTime::parse_from_rfc3339(&stamps[1].value).is_ok());
    }

    #[test]
    fn end_of_stream_reaches_buffer() {
        let (data, _properties, host) = host();
        let writer = AudioProcessorWriteToBuffer::new();
        writer.set_site(Site::new(&host)).unwrap();

        writer.end_of_stream(StreamEnd::Completed);
        assert_eq!(data.status(), StreamStatus::Ended);
    }

    #[test]
    fn fails_without_site() {
        let writer = AudioProcessorWriteToBuffer::new();
        assert!(matches!(
            writer.process_audio(&[1]),
            Err(AudioError::ProcessingFailed(_))
        ));
    }
}
