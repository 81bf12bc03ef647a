use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::component::capability::{Capability, CapabilityTag, Component};
use crate::component::site::Site;
use crate::models::error::AudioError;
use crate::traits::audio_buffer::{AudioBufferData, AudioBufferProperties, PropertyRecord};
use crate::traits::site::ObjectWithSite;

/// Property store positioned against a buffer.
///
/// Sited on the buffer-data component it describes: positions come from
/// that buffer's write frontier.
pub struct AudioSourceBufferProperties {
    site: Mutex<Option<Site>>,
    records: RwLock<Vec<PropertyRecord>>,
}

impl AudioSourceBufferProperties {
    pub fn new() -> Self {
        Self {
            site: Mutex::new(None),
            records: RwLock::new(Vec::new()),
        }
    }

    /// Records with `start <= position < end` as a JSON array of
    /// `{ "position", "name", "value" }` objects.
    pub fn records_json(&self, start: u64, end: u64) -> Result<String, AudioError> {
        serde_json::to_string(&self.records_in(start, end))
            .map_err(|e| AudioError::Unknown(format!("failed to serialize properties: {}", e)))
    }

    fn buffer(&self) -> Result<Arc<dyn AudioBufferData>, AudioError> {
        self.site
            .lock()
            .as_ref()
            .and_then(|site| site.query::<dyn AudioBufferData>())
            .ok_or_else(|| AudioError::CapabilityMissing("buffer data on properties site".into()))
    }
}

impl Default for AudioSourceBufferProperties {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBufferProperties for AudioSourceBufferProperties {
    fn set_property(&self, name: &str, value: &str) -> Result<(), AudioError> {
        let position = self.buffer()?.total_bytes();
        self.records.write().push(PropertyRecord {
            position,
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn property_at(&self, name: &str, position: u64) -> Option<String> {
        self.records
            .read()
            .iter()
            .rev()
            .find(|record| record.position <= position && record.name == name)
            .map(|record| record.value.clone())
    }

    fn records_in(&self, start: u64, end: u64) -> Vec<PropertyRecord> {
        self.records
            .read()
            .iter()
            .filter(|record| record.position >= start && record.position < end)
            .cloned()
            .collect()
    }
}

impl ObjectWithSite for AudioSourceBufferProperties {
    fn set_site(&self, site: Site) -> Result<(), AudioError> {
        *self.site.lock() = Some(site);
        Ok(())
    }
}

impl Component for AudioSourceBufferProperties {
    fn query_capability(self: Arc<Self>, tag: CapabilityTag) -> Option<Capability> {
        match tag {
            CapabilityTag::BufferProperties => Some(Capability::BufferProperties(self)),
            CapabilityTag::ObjectWithSite => Some(Capability::ObjectWithSite(self)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::source_buffer::AudioSourceBuffer;

    fn sited_on_buffer() -> (Arc<AudioSourceBuffer>, Arc<dyn Component>, AudioSourceBufferProperties) {
        let buffer = Arc::new(AudioSourceBuffer::new());
        let component: Arc<dyn Component> = buffer.clone();
        let properties = AudioSourceBufferProperties::new();
        properties.set_site(Site::new(&component)).unwrap();
        (buffer, component, properties)
    }

    #[test]
    fn records_at_write_frontier() {
        let (buffer, _component, properties) = sited_on_buffer();

        properties.set_property("speaker", "a").unwrap();
        buffer.write(&[0u8; 10]);
        properties.set_property("speaker", "b").unwrap();
        buffer.write(&[0u8; 10]);

        assert_eq!(properties.property_at("speaker", 0).as_deref(), Some("a"));
        assert_eq!(properties.property_at("speaker", 9).as_deref(), Some("a"));
        assert_eq!(properties.property_at("speaker", 10).as_deref(), Some("b"));
        assert_eq!(properties.property_at("speaker", 19).as_deref(), Some("b"));
        assert_eq!(properties.property_at("missing", 19), None);
    }

    #[test]
    fn records_in_range() {
        let (buffer, _component, properties) = sited_on_buffer();
        properties.set_property("k", "0").unwrap();
        buffer.write(&[0u8; 4]);
        properties.set_property("k", "4").unwrap();

        let records = properties.records_in(1, 10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].position, 4);
        assert_eq!(records[0].value, "4");
    }

    #[test]
    fn exports_records_as_json() {
        let (buffer, _component, properties) = sited_on_buffer();
        properties.set_property("speaker", "a").unwrap();
        buffer.write(&[0u8; 8]);
        properties.set_property("speaker", "b").unwrap();

        let json: serde_json::Value = serde_json::from_str(&properties.records_json(0, 100).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "position": 0, "name": "speaker", "value": "a" },
                { "position": 8, "name": "speaker", "value": "b" }
            ])
        );
        assert_eq!(properties.records_json(1, 8).unwrap(), "[]");
    }

    #[test]
    fn requires_buffer_site() {
        let properties = AudioSourceBufferProperties::new();
        assert!(matches!(
            properties.set_property("k", "v"),
            Err(AudioError::CapabilityMissing(_))
        ));

        let (buffer, component, properties) = sited_on_buffer();
        drop(component);
        drop(buffer);
        assert!(properties.set_property("k", "v").is_err());
    }
}
