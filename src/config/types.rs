//! Typed configuration structures
//!
//! Provides strongly-typed access to configuration values with validation
//! and default values. Per-chat overrides are partial; anything a chat does
//! not set falls back to the global defaults.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::bridge::BridgeSettings;

/// Smallest delay the owner may configure, in seconds.
pub const MIN_DELAY_SECONDS: u64 = 10;

/// Errors raised while loading or persisting configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found at {0}; create it or pass --config")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed config document: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// JID of the single account allowed to issue `/autoreply` commands.
    pub bot_owner_jid: String,

    /// Bridge daemon connection settings.
    #[serde(default)]
    pub bridge: BridgeSettings,

    /// Chats that never receive auto-replies and whose commands are ignored.
    /// Any JID ending in `@broadcast` is excluded regardless of this list.
    #[serde(default = "default_excluded_chats")]
    pub excluded_chats: Vec<String>,

    /// Global fallback reply settings.
    #[serde(default)]
    pub defaults: ReplySettings,

    /// Per-chat overrides, keyed by chat JID.
    #[serde(default)]
    pub chats: HashMap<String, ChatOverrides>,
}

/// Effective reply settings for one chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplySettings {
    /// Whether auto-replies are sent at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Wait between receiving a message and replying, giving the real user
    /// time to answer first.
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: u64,

    /// The reply text.
    #[serde(default = "default_message")]
    pub message: String,

    /// Minimum interval between two auto-replies to the same chat.
    #[serde(default = "default_rate_limit_minutes")]
    pub rate_limit_minutes: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_delay_seconds() -> u64 {
    300
}

fn default_message() -> String {
    "I'm away right now and will get back to you later.".to_string()
}

fn default_rate_limit_minutes() -> u64 {
    15
}

fn default_excluded_chats() -> Vec<String> {
    vec!["status@broadcast".to_string()]
}

impl Default for ReplySettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            delay_seconds: default_delay_seconds(),
            message: default_message(),
            rate_limit_minutes: default_rate_limit_minutes(),
        }
    }
}

/// Partial per-chat settings. Every field is optional; unset fields fall
/// back to [`BotConfig::defaults`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_seconds: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_minutes: Option<u64>,

    /// Unix seconds of the last auto-reply sent to this chat. Written by the
    /// scheduler after each successful send; seeds the rate limiter across
    /// restarts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_auto_reply_ts: Option<i64>,
}

impl BotConfig {
    /// Merge a chat's overrides over the global defaults.
    pub fn effective_settings(&self, chat_jid: &str) -> ReplySettings {
        let overrides = self.chats.get(chat_jid);
        let defaults = &self.defaults;
        match overrides {
            Some(o) => ReplySettings {
                enabled: o.enabled.unwrap_or(defaults.enabled),
                delay_seconds: o.delay_seconds.unwrap_or(defaults.delay_seconds),
                message: o.message.clone().unwrap_or_else(|| defaults.message.clone()),
                rate_limit_minutes: o.rate_limit_minutes.unwrap_or(defaults.rate_limit_minutes),
            },
            None => defaults.clone(),
        }
    }

    /// Unix seconds of the last auto-reply sent to a chat, if any.
    pub fn last_auto_reply_ts(&self, chat_jid: &str) -> Option<i64> {
        self.chats.get(chat_jid).and_then(|o| o.last_auto_reply_ts)
    }

    /// Whether a chat may never receive auto-replies.
    pub fn is_excluded(&self, chat_jid: &str) -> bool {
        chat_jid.ends_with("@broadcast") || self.excluded_chats.iter().any(|c| c == chat_jid)
    }

    /// Validate required fields and value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_owner_jid.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "'bot_owner_jid' is required".to_string(),
            ));
        }
        if self.defaults.delay_seconds < MIN_DELAY_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "defaults.delay_seconds must be >= {}",
                MIN_DELAY_SECONDS
            )));
        }
        if self.excluded_chats.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "excluded_chats entries must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> BotConfig {
        BotConfig {
            bot_owner_jid: "15551230000@s.whatsapp.net".to_string(),
            bridge: BridgeSettings::default(),
            excluded_chats: default_excluded_chats(),
            defaults: ReplySettings::default(),
            chats: HashMap::new(),
        }
    }

    #[test]
    fn test_effective_settings_fall_back_to_defaults() {
        let config = base_config();
        let settings = config.effective_settings("someone@s.whatsapp.net");
        assert_eq!(settings, config.defaults);
    }

    #[test]
    fn test_effective_settings_merge_partial_overrides() {
        let mut config = base_config();
        config.chats.insert(
            "friend@s.whatsapp.net".to_string(),
            ChatOverrides {
                delay_seconds: Some(60),
                ..Default::default()
            },
        );

        let settings = config.effective_settings("friend@s.whatsapp.net");
        assert_eq!(settings.delay_seconds, 60);
        assert_eq!(settings.enabled, config.defaults.enabled);
        assert_eq!(settings.message, config.defaults.message);
        assert_eq!(settings.rate_limit_minutes, config.defaults.rate_limit_minutes);
    }

    #[test]
    fn test_broadcast_suffix_always_excluded() {
        let config = base_config();
        assert!(config.is_excluded("status@broadcast"));
        assert!(config.is_excluded("1234-567@broadcast"));
        assert!(!config.is_excluded("friend@s.whatsapp.net"));
    }

    #[test]
    fn test_configured_exclusions() {
        let mut config = base_config();
        config.excluded_chats.push("noisy@g.us".to_string());
        assert!(config.is_excluded("noisy@g.us"));
        assert!(!config.is_excluded("quiet@g.us"));
    }

    #[test]
    fn test_validate_requires_owner() {
        let mut config = base_config();
        config.bot_owner_jid = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bot_owner_jid"));
    }

    #[test]
    fn test_validate_rejects_small_default_delay() {
        let mut config = base_config();
        config.defaults.delay_seconds = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_round_trip_without_null_noise() {
        let overrides = ChatOverrides {
            enabled: Some(false),
            ..Default::default()
        };
        let json = serde_json::to_string(&overrides).unwrap();
        assert!(!json.contains("delay_seconds"));

        let parsed: ChatOverrides = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.enabled, Some(false));
        assert!(parsed.delay_seconds.is_none());
    }

    #[test]
    fn test_missing_optional_sections_use_defaults() {
        let config: BotConfig =
            json5::from_str(r#"{ "bot_owner_jid": "1@s.whatsapp.net" }"#).unwrap();
        assert!(config.defaults.enabled);
        assert_eq!(config.defaults.delay_seconds, 300);
        assert_eq!(config.excluded_chats, vec!["status@broadcast".to_string()]);
        assert!(config.chats.is_empty());
    }
}
