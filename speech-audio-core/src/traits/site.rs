use std::sync::Arc;

use crate::component::capability::Component;
use crate::component::site::Site;
use crate::models::error::AudioError;

/// A component that accepts a composition context after construction.
pub trait ObjectWithSite: Send + Sync {
    /// Hand the component its site. Implementations may call back into the
    /// site from here.
    fn set_site(&self, site: Site) -> Result<(), AudioError>;
}

/// Named service lookup offered by a site.
pub trait ServiceProvider: Send + Sync {
    fn query_service(&self, name: &str) -> Option<Arc<dyn Component>>;
}

/// Reference-counting entry points a logical reader calls on its adapter.
pub trait ClientLifetime: Send + Sync {
    fn reconnect(&self, client_id: u64) -> Result<(), AudioError>;

    fn disconnect(&self, client_id: u64) -> Result<(), AudioError>;
}
