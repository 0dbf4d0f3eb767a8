//! awaybot library
//!
//! This library provides the core functionality for awaybot: a delayed
//! auto-reply bot that polls a local WhatsApp bridge daemon for inbound
//! messages, schedules one pending reply per chat, and lets the bot owner
//! reconfigure it over chat commands.

pub mod autoreply;
pub mod bot;
pub mod bridge;
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
