use std::fmt;
use std::sync::{Arc, Weak};

use crate::component::capability::{query_interface, Component, Interface};
use crate::traits::site::ServiceProvider;

/// Non-owning reference from a component to its composition context.
///
/// Holding a `Site` never keeps the context alive; lookups fail once the
/// context has been dropped.
#[derive(Clone)]
pub struct Site(Weak<dyn Component>);

impl Site {
    pub fn new(component: &Arc<dyn Component>) -> Self {
        Self(Arc::downgrade(component))
    }

    pub fn from_weak(component: Weak<dyn Component>) -> Self {
        Self(component)
    }

    pub fn upgrade(&self) -> Option<Arc<dyn Component>> {
        self.0.upgrade()
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Capability implemented by the site itself.
    pub fn query<I>(&self) -> Option<Arc<I>>
    where
        I: Interface + ?Sized,
    {
        query_interface::<I>(&self.upgrade()?)
    }

    /// Named service offered by the site.
    pub fn query_service(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.query::<dyn ServiceProvider>()?.query_service(name)
    }

    /// Capability `I` of the named service.
    pub fn query_service_interface<I>(&self, name: &str) -> Option<Arc<I>>
    where
        I: Interface + ?Sized,
    {
        query_interface::<I>(&self.query_service(name)?)
    }
}

impl fmt::Debug for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Site").field("alive", &self.is_alive()).finish()
    }
}
