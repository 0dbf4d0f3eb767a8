//! Bot runtime
//!
//! Polls the bridge for inbound messages and routes each one: owner
//! commands to the command interpreter, the account's own messages to the
//! scheduler as cancellations, everything else as an auto-reply trigger.
//! A cancellation token drives graceful shutdown: stop polling, cancel all
//! pending timers, disconnect.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::autoreply::ReplyScheduler;
use crate::bridge::{same_user, DynBridge, InboundMessage};
use crate::commands;
use crate::config::ConfigStore;

/// How often the bridge is polled for new messages.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Pause after a failed poll before trying again.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// The running bot: bridge poller, router, and scheduler owner.
pub struct Bot {
    store: Arc<ConfigStore>,
    bridge: DynBridge,
    scheduler: ReplyScheduler,
}

impl Bot {
    pub fn new(store: Arc<ConfigStore>, bridge: DynBridge) -> Self {
        let scheduler = ReplyScheduler::new(Arc::clone(&store), Arc::clone(&bridge));
        Self {
            store,
            bridge,
            scheduler,
        }
    }

    /// The scheduler driving delayed replies.
    pub fn scheduler(&self) -> &ReplyScheduler {
        &self.scheduler
    }

    /// Poll-and-route until `shutdown` is cancelled, then tear down.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!("bot started, polling bridge");
        let mut poll = tokio::time::interval(POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = poll.tick() => {}
            }

            match self.bridge.poll_messages().await {
                Ok(batch) => {
                    if !batch.is_empty() {
                        debug!(count = batch.len(), "received new messages");
                    }
                    for message in &batch {
                        self.handle_message(message).await;
                    }
                }
                Err(e) => {
                    error!(error = %e, "bridge poll failed");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        self.teardown().await;
    }

    /// Route one inbound message.
    pub async fn handle_message(&self, message: &InboundMessage) {
        if message.chat_jid.is_empty() {
            return;
        }

        // Excluded chats get no auto-replies and no command handling.
        if self.store.is_excluded(&message.chat_jid) {
            debug!(chat = %message.chat_jid, "ignoring message in excluded chat");
            return;
        }

        if commands::is_command(&message.content) {
            if same_user(&message.sender_jid, &self.store.owner_jid()) {
                let reply =
                    commands::handle_command(&self.store, &message.chat_jid, &message.content);
                if let Err(e) = self.bridge.send_message(&message.chat_jid, &reply).await {
                    warn!(chat = %message.chat_jid, error = %e, "failed to send command reply");
                }
                return;
            }
            // Command-shaped text from anyone else is just a message.
            warn!(
                chat = %message.chat_jid,
                sender = %message.sender_jid,
                "ignoring command from non-owner"
            );
        }

        if message.is_from_me {
            self.scheduler.on_own_message(&message.chat_jid);
        } else {
            self.scheduler.on_message_received(&message.chat_jid);
        }
    }

    async fn teardown(&self) {
        info!("shutting down");
        self.scheduler.shutdown();
        if let Err(e) = self.bridge.disconnect().await {
            warn!(error = %e, "bridge disconnect failed");
        }
        info!("shutdown complete");
    }
}
