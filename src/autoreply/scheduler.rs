//! Per-chat reply scheduling and rate limiting.
//!
//! Each eligible inbound message arms a delayed send for its chat,
//! cancelling whatever was pending there; only the latest message in a
//! chat can produce a reply. When the timer fires, the chat's settings and
//! rate limit are checked again: settings may have changed during the
//! delay, and a fire inside the rate-limit window is dropped, not queued.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::bridge::DynBridge;
use crate::config::ConfigStore;

/// A scheduled-but-not-yet-fired reply for one chat.
struct PendingReply {
    /// Identifies the arming message; a fire with a stale generation was
    /// superseded and must not send.
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct ChatState {
    pending: Option<PendingReply>,
    /// When the last auto-reply to this chat went out. Never cleared while
    /// the process runs.
    last_sent: Option<Instant>,
}

impl ChatState {
    fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }
}

struct SchedulerInner {
    store: Arc<ConfigStore>,
    bridge: DynBridge,
    chats: Mutex<HashMap<String, ChatState>>,
    next_generation: AtomicU64,
}

/// Schedules one delayed auto-reply per chat and enforces the per-chat
/// rate limit.
#[derive(Clone)]
pub struct ReplyScheduler {
    inner: Arc<SchedulerInner>,
}

impl ReplyScheduler {
    /// Create a scheduler. Persisted `last_auto_reply_ts` values seed the
    /// rate limiter so a restart cannot bypass the window.
    pub fn new(store: Arc<ConfigStore>, bridge: DynBridge) -> Self {
        let mut chats: HashMap<String, ChatState> = HashMap::new();
        let now_unix = Utc::now().timestamp();
        for (chat_jid, overrides) in &store.snapshot().chats {
            let Some(ts) = overrides.last_auto_reply_ts.filter(|ts| *ts > 0) else {
                continue;
            };
            let elapsed = Duration::from_secs(now_unix.saturating_sub(ts).max(0) as u64);
            if let Some(instant) = Instant::now().checked_sub(elapsed) {
                chats.insert(
                    chat_jid.clone(),
                    ChatState {
                        pending: None,
                        last_sent: Some(instant),
                    },
                );
            }
        }

        Self {
            inner: Arc::new(SchedulerInner {
                store,
                bridge,
                chats: Mutex::new(chats),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// An inbound message arrived in `chat_jid`. Cancels any pending timer
    /// for the chat and, if the chat is eligible, arms a new one.
    pub fn on_message_received(&self, chat_jid: &str) {
        if self.inner.store.is_excluded(chat_jid) {
            debug!(chat = %chat_jid, "chat excluded, not scheduling");
            return;
        }

        let settings = self.inner.store.effective_settings(chat_jid);

        let mut chats = self.inner.chats.lock();
        let state = chats.entry(chat_jid.to_string()).or_default();

        if state.cancel_pending() {
            info!(chat = %chat_jid, "new message supersedes pending auto-reply");
        }

        if !settings.enabled {
            debug!(chat = %chat_jid, "auto-reply disabled, not scheduling");
            return;
        }

        if let Some(remaining) =
            rate_limit_remaining(state.last_sent, settings.rate_limit_minutes)
        {
            info!(
                chat = %chat_jid,
                remaining_secs = remaining.as_secs(),
                "rate limit active, not scheduling"
            );
            return;
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let delay = Duration::from_secs(settings.delay_seconds);
        let handle = {
            let scheduler = self.clone();
            let chat = chat_jid.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                scheduler.fire(&chat, generation).await;
            })
        };
        state.pending = Some(PendingReply { generation, handle });
        info!(
            chat = %chat_jid,
            delay_seconds = settings.delay_seconds,
            "auto-reply scheduled"
        );
    }

    /// The bot's own account wrote in `chat_jid`: the user is active, so
    /// any pending auto-reply there is cancelled.
    pub fn on_own_message(&self, chat_jid: &str) {
        let mut chats = self.inner.chats.lock();
        if let Some(state) = chats.get_mut(chat_jid) {
            if state.cancel_pending() {
                info!(chat = %chat_jid, "user replied, pending auto-reply cancelled");
            }
        }
    }

    /// Cancel every outstanding timer without sending.
    pub fn shutdown(&self) {
        let mut chats = self.inner.chats.lock();
        let cancelled = chats
            .values_mut()
            .map(|state| state.cancel_pending())
            .filter(|&cancelled| cancelled)
            .count();
        if cancelled > 0 {
            info!(count = cancelled, "cancelled pending auto-replies");
        }
    }

    /// Number of chats with a timer currently pending.
    pub fn pending_count(&self) -> usize {
        self.inner
            .chats
            .lock()
            .values()
            .filter(|state| state.pending.is_some())
            .count()
    }

    /// Delayed action: re-validate and send.
    async fn fire(&self, chat_jid: &str, generation: u64) {
        let message = {
            let mut chats = self.inner.chats.lock();
            let Some(state) = chats.get_mut(chat_jid) else {
                return;
            };
            match &state.pending {
                Some(pending) if pending.generation == generation => {}
                // Superseded or cancelled while the sleep was finishing.
                _ => return,
            }
            state.pending = None;

            let settings = self.inner.store.effective_settings(chat_jid);
            if !settings.enabled {
                info!(chat = %chat_jid, "auto-reply disabled while timer was running, dropping");
                return;
            }
            if let Some(remaining) =
                rate_limit_remaining(state.last_sent, settings.rate_limit_minutes)
            {
                info!(
                    chat = %chat_jid,
                    remaining_secs = remaining.as_secs(),
                    "rate limit active at fire time, dropping"
                );
                return;
            }
            settings.message
        };

        match self.inner.bridge.send_message(chat_jid, &message).await {
            Ok(()) => {
                self.inner
                    .chats
                    .lock()
                    .entry(chat_jid.to_string())
                    .or_default()
                    .last_sent = Some(Instant::now());
                info!(chat = %chat_jid, "auto-reply sent");
                self.persist_last_sent(chat_jid);
            }
            Err(e) => {
                warn!(chat = %chat_jid, error = %e, "failed to send auto-reply");
            }
        }
    }

    fn persist_last_sent(&self, chat_jid: &str) {
        let now_unix = Utc::now().timestamp();
        let result = self.inner.store.update(|cfg| {
            cfg.chats.entry(chat_jid.to_string()).or_default().last_auto_reply_ts =
                Some(now_unix);
        });
        if let Err(e) = result {
            warn!(chat = %chat_jid, error = %e, "failed to persist last-sent timestamp");
        }
    }
}

/// Time left in the rate-limit window, or `None` when a send is allowed.
/// The configured minutes are converted once to seconds; all comparisons
/// happen in seconds.
fn rate_limit_remaining(last_sent: Option<Instant>, rate_limit_minutes: u64) -> Option<Duration> {
    let last = last_sent?;
    let window = Duration::from_secs(rate_limit_minutes * 60);
    let elapsed = last.elapsed();
    if elapsed < window {
        Some(window - elapsed)
    } else {
        None
    }
}
