//! Capability-query object model.
//!
//! A [`Component`] answers "do you support capability X?" by returning a
//! shared trait-object handle, so independently written parts (pump, buffer,
//! adapter, readers) can find each other without naming concrete types.

use std::fmt;
use std::sync::Arc;

use crate::traits::audio_buffer::{AudioBufferData, AudioBufferProperties};
use crate::traits::audio_processor::AudioProcessor;
use crate::traits::audio_pump::{AudioPumpControl, PumpErrorSink};
use crate::traits::site::{ClientLifetime, ObjectWithSite, ServiceProvider};
use crate::traits::stream_reader::AudioStreamReader;

/// Names of the contracts a component may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityTag {
    StreamReader,
    AudioProcessor,
    PumpControl,
    PumpErrorSink,
    BufferData,
    BufferProperties,
    ObjectWithSite,
    ServiceProvider,
    ClientLifetime,
}

impl CapabilityTag {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StreamReader => "stream reader",
            Self::AudioProcessor => "audio processor",
            Self::PumpControl => "pump control",
            Self::PumpErrorSink => "pump error sink",
            Self::BufferData => "buffer data",
            Self::BufferProperties => "buffer properties",
            Self::ObjectWithSite => "object with site",
            Self::ServiceProvider => "service provider",
            Self::ClientLifetime => "client lifetime",
        }
    }
}

/// A shared handle to one capability of a component.
#[derive(Clone)]
pub enum Capability {
    StreamReader(Arc<dyn AudioStreamReader>),
    AudioProcessor(Arc<dyn AudioProcessor>),
    PumpControl(Arc<dyn AudioPumpControl>),
    PumpErrorSink(Arc<dyn PumpErrorSink>),
    BufferData(Arc<dyn AudioBufferData>),
    BufferProperties(Arc<dyn AudioBufferProperties>),
    ObjectWithSite(Arc<dyn ObjectWithSite>),
    ServiceProvider(Arc<dyn ServiceProvider>),
    ClientLifetime(Arc<dyn ClientLifetime>),
}

impl Capability {
    pub fn tag(&self) -> CapabilityTag {
        match self {
            Self::StreamReader(_) => CapabilityTag::StreamReader,
            Self::AudioProcessor(_) => CapabilityTag::AudioProcessor,
            Self::PumpControl(_) => CapabilityTag::PumpControl,
            Self::PumpErrorSink(_) => CapabilityTag::PumpErrorSink,
            Self::BufferData(_) => CapabilityTag::BufferData,
            Self::BufferProperties(_) => CapabilityTag::BufferProperties,
            Self::ObjectWithSite(_) => CapabilityTag::ObjectWithSite,
            Self::ServiceProvider(_) => CapabilityTag::ServiceProvider,
            Self::ClientLifetime(_) => CapabilityTag::ClientLifetime,
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Capability").field(&self.tag()).finish()
    }
}

/// Any unit that implements zero or more capabilities.
pub trait Component: Send + Sync + 'static {
    /// Return a handle to `tag` if supported. Must not have side effects.
    fn query_capability(self: Arc<Self>, tag: CapabilityTag) -> Option<Capability>;
}

/// Look up `tag` on `component`. Unsupported tags yield `None`.
pub fn query(component: &Arc<dyn Component>, tag: CapabilityTag) -> Option<Capability> {
    Arc::clone(component).query_capability(tag)
}

/// Maps a capability trait object type to its tag.
pub trait Interface {
    const TAG: CapabilityTag;

    fn from_capability(capability: Capability) -> Option<Arc<Self>>;
}

macro_rules! interface {
    ($trait_name:ident, $variant:ident) => {
        impl Interface for dyn $trait_name {
            const TAG: CapabilityTag = CapabilityTag::$variant;

            fn from_capability(capability: Capability) -> Option<Arc<Self>> {
                match capability {
                    Capability::$variant(handle) => Some(handle),
                    _ => None,
                }
            }
        }
    };
}

interface!(AudioStreamReader, StreamReader);
interface!(AudioProcessor, AudioProcessor);
interface!(AudioPumpControl, PumpControl);
interface!(PumpErrorSink, PumpErrorSink);
interface!(AudioBufferData, BufferData);
interface!(AudioBufferProperties, BufferProperties);
interface!(ObjectWithSite, ObjectWithSite);
interface!(ServiceProvider, ServiceProvider);
interface!(ClientLifetime, ClientLifetime);

/// Typed form of [`query`]: `query_interface::<dyn AudioPumpControl>(&c)`.
pub fn query_interface<I>(component: &Arc<dyn Component>) -> Option<Arc<I>>
where
    I: Interface + ?Sized,
{
    query(component, I::TAG).and_then(I::from_capability)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::error::AudioError;

    struct NullReader;

    impl AudioStreamReader for NullReader {
        fn get_format(&self, _format: Option<&mut [u8]>) -> Result<usize, AudioError> {
            Ok(0)
        }

        fn read(&self, _buffer: &mut [u8]) -> Result<usize, AudioError> {
            Ok(0)
        }

        fn close(&self) {}
    }

    impl Component for NullReader {
        fn query_capability(self: Arc<Self>, tag: CapabilityTag) -> Option<Capability> {
            match tag {
                CapabilityTag::StreamReader => Some(Capability::StreamReader(self)),
                _ => None,
            }
        }
    }

    #[test]
    fn supported_tag_returns_handle() {
        let component: Arc<dyn Component> = Arc::new(NullReader);
        let reader = query_interface::<dyn AudioStreamReader>(&component).unwrap();
        assert_eq!(reader.read(&mut [0u8; 4]).unwrap(), 0);
    }

    #[test]
    fn unsupported_tag_returns_none() {
        let component: Arc<dyn Component> = Arc::new(NullReader);
        assert!(query(&component, CapabilityTag::PumpControl).is_none());
        assert!(query_interface::<dyn AudioBufferData>(&component).is_none());
    }

    #[test]
    fn query_shares_the_component() {
        let component: Arc<dyn Component> = Arc::new(NullReader);
        let handle = query(&component, CapabilityTag::StreamReader).unwrap();
        assert_eq!(handle.tag(), CapabilityTag::StreamReader);
        assert_eq!(Arc::strong_count(&component), 2);
        drop(handle);
        assert_eq!(Arc::strong_count(&component), 1);
    }
}
