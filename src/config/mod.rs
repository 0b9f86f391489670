//! Configuration module for the boosty-downloader.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - Storage mode selection
//! - Configuration validation and link parsing

pub mod loader;
pub mod modes;
pub mod validation;

pub use loader::{AuthConfig, Config, OptionsConfig, TargetConfig};
pub use modes::StorageType;
pub use validation::{parse_boosty_link, parse_links, validate_config, LinkTarget};
