pub mod config;
pub mod session;
pub mod paths;

pub use config::{AdminConfig, AuthConfig, CatalogConfig, Config, LoggingConfig, PlaybackConfig, StoreBackend, StoreConfig};
pub use session::SessionFile;
pub use paths::{PathManager, HOME_ENV};
