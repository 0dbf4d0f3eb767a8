//! Owner Commands
//!
//! Parses `/autoreply` chat commands from the bot owner and applies them to
//! the configuration. Every reply string goes back to the chat the command
//! came from; invalid arguments leave the configuration untouched.

use chrono::{Local, TimeZone};
use tracing::{info, warn};

use crate::config::{ConfigStore, MIN_DELAY_SECONDS};

/// Help text returned by `/autoreply help` and unknown subcommands.
pub const HELP_TEXT: &str = "Available commands:\n\
    /autoreply on | off\n\
    /autoreply delay <seconds>\n\
    /autoreply message <text>\n\
    /autoreply status";

/// Whether a message body is addressed to the command interpreter.
pub fn is_command(content: &str) -> bool {
    content.trim_start().starts_with("/autoreply")
}

/// Handle one owner command for `chat_jid` and return the reply text.
pub fn handle_command(store: &ConfigStore, chat_jid: &str, content: &str) -> String {
    let (command, subcommand, value) = split_command(content);
    info!(
        chat = %chat_jid,
        command = %command,
        subcommand = subcommand.unwrap_or("-"),
        "owner command received"
    );

    if !command.eq_ignore_ascii_case("/autoreply") {
        return format!("Unknown command base: {}. Use /autoreply.", command);
    }

    let Some(subcommand) = subcommand else {
        return HELP_TEXT.to_string();
    };

    match subcommand.to_ascii_lowercase().as_str() {
        "on" => set_enabled(store, chat_jid, true),
        "off" => set_enabled(store, chat_jid, false),
        "delay" => set_delay(store, chat_jid, value),
        "message" => set_message(store, chat_jid, value),
        "status" => status_report(store, chat_jid),
        "help" => HELP_TEXT.to_string(),
        other => format!("Unknown subcommand '{}'. Use /autoreply help.", other),
    }
}

fn set_enabled(store: &ConfigStore, chat_jid: &str, enabled: bool) -> String {
    let result = store.update(|cfg| {
        cfg.chats.entry(chat_jid.to_string()).or_default().enabled = Some(enabled);
    });
    match result {
        Ok(()) if enabled => "Auto-reply ENABLED for this chat.".to_string(),
        Ok(()) => "Auto-reply DISABLED for this chat.".to_string(),
        Err(e) => save_failed(chat_jid, e),
    }
}

fn set_delay(store: &ConfigStore, chat_jid: &str, value: Option<&str>) -> String {
    let Some(parsed) = value.and_then(|v| v.parse::<u64>().ok()) else {
        return "Usage: /autoreply delay <seconds>".to_string();
    };
    if parsed < MIN_DELAY_SECONDS {
        return format!("Invalid delay. Must be >= {} seconds.", MIN_DELAY_SECONDS);
    }
    let result = store.update(|cfg| {
        cfg.chats.entry(chat_jid.to_string()).or_default().delay_seconds = Some(parsed);
    });
    match result {
        Ok(()) => format!("Auto-reply delay set to {} seconds for this chat.", parsed),
        Err(e) => save_failed(chat_jid, e),
    }
}

fn set_message(store: &ConfigStore, chat_jid: &str, value: Option<&str>) -> String {
    let Some(text) = value else {
        return "Usage: /autoreply message <your message text>".to_string();
    };
    let result = store.update(|cfg| {
        cfg.chats.entry(chat_jid.to_string()).or_default().message = Some(text.to_string());
    });
    match result {
        Ok(()) => format!("Auto-reply message set for this chat:\n'{}'", text),
        Err(e) => save_failed(chat_jid, e),
    }
}

fn status_report(store: &ConfigStore, chat_jid: &str) -> String {
    let config = store.snapshot();
    let settings = config.effective_settings(chat_jid);
    let enabled = if settings.enabled { "ENABLED" } else { "DISABLED" };
    let last_sent = match config.last_auto_reply_ts(chat_jid) {
        Some(ts) if ts > 0 => match Local.timestamp_opt(ts, 0).single() {
            Some(when) => when.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => "Unknown".to_string(),
        },
        _ => "Never sent".to_string(),
    };
    format!(
        "Auto-reply status for this chat:\n\
         - Status: {}\n\
         - Delay: {} seconds\n\
         - Message: '{}'\n\
         - Rate limit: {} minutes\n\
         - Last sent: {}",
        enabled, settings.delay_seconds, settings.message, settings.rate_limit_minutes, last_sent
    )
}

fn save_failed(chat_jid: &str, e: crate::config::ConfigError) -> String {
    warn!(chat = %chat_jid, error = %e, "failed to save configuration");
    "Failed to save configuration; settings unchanged.".to_string()
}

/// Split a command body into `(command, subcommand, value)`. The value keeps
/// its internal spacing so `/autoreply message On my way  home` survives.
fn split_command(content: &str) -> (&str, Option<&str>, Option<&str>) {
    let content = content.trim();
    let (command, rest) = match content.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim_start()),
        None => (content, ""),
    };
    if rest.is_empty() {
        return (command, None, None);
    }
    match rest.split_once(char::is_whitespace) {
        Some((sub, value)) => {
            let value = value.trim();
            (command, Some(sub), (!value.is_empty()).then_some(value))
        }
        None => (command, Some(rest), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BotConfig, ChatOverrides, ReplySettings};
    use std::collections::HashMap;
    use std::sync::Arc;

    const CHAT: &str = "friend@s.whatsapp.net";

    fn make_store() -> (Arc<ConfigStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = BotConfig {
            bot_owner_jid: "owner@s.whatsapp.net".to_string(),
            bridge: Default::default(),
            excluded_chats: vec!["status@broadcast".to_string()],
            defaults: ReplySettings::default(),
            chats: HashMap::new(),
        };
        (
            Arc::new(ConfigStore::with_config(dir.path().join("config.json"), config)),
            dir,
        )
    }

    #[test]
    fn test_on_and_off_toggle_the_chat() {
        let (store, _dir) = make_store();

        let reply = handle_command(&store, CHAT, "/autoreply off");
        assert_eq!(reply, "Auto-reply DISABLED for this chat.");
        assert!(!store.effective_settings(CHAT).enabled);

        let reply = handle_command(&store, CHAT, "/autoreply on");
        assert_eq!(reply, "Auto-reply ENABLED for this chat.");
        assert!(store.effective_settings(CHAT).enabled);
    }

    #[test]
    fn test_delay_updates_value() {
        let (store, _dir) = make_store();
        let reply = handle_command(&store, CHAT, "/autoreply delay 45");
        assert_eq!(reply, "Auto-reply delay set to 45 seconds for this chat.");
        assert_eq!(store.effective_settings(CHAT).delay_seconds, 45);
    }

    #[test]
    fn test_delay_below_minimum_is_rejected() {
        let (store, _dir) = make_store();
        let before = store.effective_settings(CHAT).delay_seconds;

        let reply = handle_command(&store, CHAT, "/autoreply delay 9");
        assert_eq!(reply, "Invalid delay. Must be >= 10 seconds.");
        assert_eq!(store.effective_settings(CHAT).delay_seconds, before);
    }

    #[test]
    fn test_delay_requires_a_number() {
        let (store, _dir) = make_store();
        let reply = handle_command(&store, CHAT, "/autoreply delay soon");
        assert_eq!(reply, "Usage: /autoreply delay <seconds>");

        let reply = handle_command(&store, CHAT, "/autoreply delay");
        assert_eq!(reply, "Usage: /autoreply delay <seconds>");
    }

    #[test]
    fn test_message_keeps_internal_spacing() {
        let (store, _dir) = make_store();
        let reply = handle_command(&store, CHAT, "/autoreply message On my way,  back at 5");
        assert!(reply.contains("On my way,  back at 5"));
        assert_eq!(
            store.effective_settings(CHAT).message,
            "On my way,  back at 5"
        );
    }

    #[test]
    fn test_message_without_text_shows_usage() {
        let (store, _dir) = make_store();
        let reply = handle_command(&store, CHAT, "/autoreply message");
        assert_eq!(reply, "Usage: /autoreply message <your message text>");
    }

    #[test]
    fn test_status_reports_effective_settings() {
        let (store, _dir) = make_store();
        handle_command(&store, CHAT, "/autoreply delay 60");

        let reply = handle_command(&store, CHAT, "/autoreply status");
        assert!(reply.contains("Status: ENABLED"));
        assert!(reply.contains("Delay: 60 seconds"));
        assert!(reply.contains("Last sent: Never sent"));
    }

    #[test]
    fn test_status_formats_last_sent_timestamp() {
        let (store, _dir) = make_store();
        store
            .update(|cfg| {
                cfg.chats.insert(
                    CHAT.to_string(),
                    ChatOverrides {
                        last_auto_reply_ts: Some(chrono::Utc::now().timestamp()),
                        ..Default::default()
                    },
                );
            })
            .unwrap();

        let reply = handle_command(&store, CHAT, "/autoreply status");
        assert!(!reply.contains("Never sent"));
    }

    #[test]
    fn test_help_and_unknown_subcommand() {
        let (store, _dir) = make_store();
        assert_eq!(handle_command(&store, CHAT, "/autoreply help"), HELP_TEXT);
        assert_eq!(handle_command(&store, CHAT, "/autoreply"), HELP_TEXT);

        let reply = handle_command(&store, CHAT, "/autoreply frobnicate");
        assert!(reply.contains("Unknown subcommand 'frobnicate'"));
    }

    #[test]
    fn test_subcommands_are_case_insensitive() {
        let (store, _dir) = make_store();
        let reply = handle_command(&store, CHAT, "/autoreply OFF");
        assert_eq!(reply, "Auto-reply DISABLED for this chat.");
    }

    #[test]
    fn test_is_command() {
        assert!(is_command("/autoreply status"));
        assert!(is_command("  /autoreply on"));
        assert!(!is_command("hello there"));
        assert!(!is_command("autoreply on"));
    }

    #[test]
    fn test_split_command() {
        assert_eq!(split_command("/autoreply"), ("/autoreply", None, None));
        assert_eq!(split_command("/autoreply on"), ("/autoreply", Some("on"), None));
        assert_eq!(
            split_command("/autoreply delay 30"),
            ("/autoreply", Some("delay"), Some("30"))
        );
        assert_eq!(
            split_command("/autoreply message hi  there"),
            ("/autoreply", Some("message"), Some("hi  there"))
        );
    }
}
