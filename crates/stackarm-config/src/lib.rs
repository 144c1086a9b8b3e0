mod raw;
mod loader;
pub mod error;

pub use loader::{load_settings, parse_settings, Settings, SettingsFormat};
pub use error::ConfigError;
