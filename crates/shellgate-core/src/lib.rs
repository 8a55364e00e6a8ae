//! Foundational types shared across shellgate crates.
//!
//! Provides the immutable gateway configuration, the error taxonomy reported
//! to SSH users, and the borrowed session streams handed to every command.

pub mod config;
pub mod error;
pub mod readwriter;
pub mod time_utils;

pub use config::{load_config, GatewayConfig, HttpSettingsConfig, CONFIG_FILE_NAME};
pub use error::GatewayError;
pub use readwriter::{write_console_message, ReadWriter, CONSOLE_MESSAGE_PREFIX};
pub use time_utils::current_unix_timestamp;
