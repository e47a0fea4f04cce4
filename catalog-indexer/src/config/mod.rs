//! Configuration and dependency wiring.

mod app_config;
mod dependencies;

pub use app_config::{AppConfig, StorageSettings, Topics, Worker};
pub use dependencies::Dependencies;
