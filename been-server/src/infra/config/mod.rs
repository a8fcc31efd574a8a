pub mod loader;
pub mod models;
pub mod sources;

pub use loader::{ConfigLoadError, ConfigLoader};
pub use models::{
    CollaboratorsConfig, Config, ConfigLoad, ConfigMetadata, ConfigWarning, ConfigWarnings,
    ServerConfig,
};
