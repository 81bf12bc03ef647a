use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::component::capability::{query_interface, Component, Interface};
use crate::component::site::Site;
use crate::models::config::FanOutConfiguration;
use crate::models::error::AudioError;
use crate::processing::buffer_properties::AudioSourceBufferProperties;
use crate::processing::buffer_writer::AudioProcessorWriteToBuffer;
use crate::processing::pump::AudioPump;
use crate::processing::source_buffer::AudioSourceBuffer;
use crate::traits::site::ObjectWithSite;

pub const AUDIO_PUMP: &str = "AudioPump";
pub const AUDIO_PROCESSOR_WRITE_TO_BUFFER: &str = "AudioProcessorWriteToBuffer";
pub const AUDIO_SOURCE_BUFFER_DATA: &str = "AudioSourceBufferData";
pub const AUDIO_SOURCE_BUFFER_PROPERTIES: &str = "AudioSourceBufferProperties";

/// Builds a fresh component from the factory's configuration.
pub type ComponentConstructor =
    Arc<dyn Fn(&FanOutConfiguration) -> Arc<dyn Component> + Send + Sync + 'static>;

/// Creates named components and hands them their site.
///
/// Comes with the four components the fan-out adapter composes. An owner may
/// replace any of them with [`ComponentFactory::register`].
#[derive(Clone)]
pub struct ComponentFactory {
    config: FanOutConfiguration,
    constructors: HashMap<String, ComponentConstructor>,
}

impl ComponentFactory {
    pub fn new(config: FanOutConfiguration) -> Self {
        let mut factory = Self {
            config,
            constructors: HashMap::new(),
        };
        factory.register(AUDIO_PUMP, |config| {
            Arc::new(AudioPump::with_thread_name(&config.pump_thread_name))
        });
        factory.register(AUDIO_PROCESSOR_WRITE_TO_BUFFER, |_| {
            Arc::new(AudioProcessorWriteToBuffer::new())
        });
        factory.register(AUDIO_SOURCE_BUFFER_DATA, |_| Arc::new(AudioSourceBuffer::new()));
        factory.register(AUDIO_SOURCE_BUFFER_PROPERTIES, |_| {
            Arc::new(AudioSourceBufferProperties::new())
        });
        factory
    }

    pub fn config(&self) -> &FanOutConfiguration {
        &self.config
    }

    /// Register (or replace) the constructor for `name`.
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn(&FanOutConfiguration) -> Arc<dyn Component> + Send + Sync + 'static,
    {
        self.constructors.insert(name.to_string(), Arc::new(constructor));
    }

    pub fn create(&self, name: &str) -> Result<Arc<dyn Component>, AudioError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| AudioError::UnknownComponent(name.to_string()))?;
        Ok(constructor(&self.config))
    }

    /// Create `name` and, if it accepts one, give it `site`.
    pub fn create_with_site(&self, name: &str, site: Site) -> Result<Arc<dyn Component>, AudioError> {
        let component = self.create(name)?;
        if let Some(with_site) = query_interface::<dyn ObjectWithSite>(&component) {
            with_site.set_site(site)?;
        }
        Ok(component)
    }

    /// Create `name` with `site` and return its capability `I`.
    pub fn create_interface_with_site<I>(&self, name: &str, site: Site) -> Result<Arc<I>, AudioError>
    where
        I: Interface + ?Sized,
    {
        let component = self.create_with_site(name, site)?;
        query_interface::<I>(&component)
            .ok_or_else(|| AudioError::CapabilityMissing(format!("{} on {}", I::TAG.name(), name)))
    }
}

impl Default for ComponentFactory {
    fn default() -> Self {
        Self::new(FanOutConfiguration::default())
    }
}

impl fmt::Debug for ComponentFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.constructors.keys().collect();
        names.sort();
        f.debug_struct("ComponentFactory")
            .field("config", &self.config)
            .field("components", &names)
            .finish()
    }
}
