//! Core traits, settings, backend gateways and the module registry.

pub mod gateway;
pub mod module;
pub mod registry;
pub mod settings;

pub use module::{InitCtx, Migration, Module};
pub use registry::ModuleRegistry;
