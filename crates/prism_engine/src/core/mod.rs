//! Engine core: configuration and the module host frame loop

pub mod config;
pub mod module_host;

pub use config::{ConfigError, EngineConfig, LoaderConfig, LoggingConfig, RendererConfig};
pub use module_host::{Module, ModuleContext, ModuleHost, ModuleId};
