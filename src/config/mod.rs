//! Configuration
//!
//! Typed access to the bot's single flat config file plus the store that
//! loads, validates, and persists it. The file is parsed as JSON5 (plain
//! JSON with optional comments) and always written back as pretty JSON.

pub mod store;
pub mod types;

pub use store::{read_document, write_document, ConfigStore};
pub use types::{BotConfig, ChatOverrides, ConfigError, ReplySettings, MIN_DELAY_SECONDS};
