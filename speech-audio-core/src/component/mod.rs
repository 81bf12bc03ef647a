pub mod capability;
pub mod factory;
pub mod site;
