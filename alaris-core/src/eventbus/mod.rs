//! src/eventbus/mod.rs
//!
//! Provides an in-process event bus that supports guaranteed delivery
//! to multiple subscribers via bounded MPSC queues.

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use chrono::{DateTime, Utc};

use alaris_common::models::UserIdentity;

/// Everything the bot announces: incoming chat plus plugin and registry lifecycle.
#[derive(Debug, Clone)]
pub enum BotEvent {
    /// A PRIVMSG received from IRC. For private messages `channel` is the
    /// sender's nick so replies go back to them.
    ChatMessage {
        channel: String,
        sender: UserIdentity,
        text: String,
        timestamp: DateTime<Utc>,
    },

    PluginLoaded { name: String, path: String },

    PluginUnloaded { name: String },

    /// Emitted after every registry rebuild or clear.
    MappingsRebuilt { commands: usize, sub_commands: usize },
}

impl BotEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            BotEvent::ChatMessage { .. } => "chat_message",
            BotEvent::PluginLoaded { .. } => "plugin.loaded",
            BotEvent::PluginUnloaded { .. } => "plugin.unloaded",
            BotEvent::MappingsRebuilt { .. } => "commands.rebuilt",
        }
    }
}

/// Each subscriber gets its own `mpsc::Sender<BotEvent>` for guaranteed delivery.
///
/// - If the subscriber’s channel buffer fills, `publish` will await
///   until there's space (backpressure).
/// - If the subscriber has dropped the `Receiver`, the channel is closed
///   and sending returns an error.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<BotEvent>>>>,
    shutdown_tx: watch::Sender<bool>,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Default size for each subscriber’s buffer.
const DEFAULT_BUFFER_SIZE: usize = 10000;

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a new, empty event bus.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Returns a receiver on which events will be delivered.
    pub async fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<BotEvent> {
        let size = buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
        let (tx, rx) = mpsc::channel(size);
        let mut subs = self.subscribers.lock().await;
        subs.push(tx);
        rx
    }

    /// Publish an event to all subscribers. Closed subscribers are pruned.
    pub async fn publish(&self, event: BotEvent) {
        let senders = {
            let mut subs = self.subscribers.lock().await;
            subs.retain(|s| !s.is_closed());
            subs.clone()
        };
        for s in senders {
            let _ = s.send(event.clone()).await;
        }
    }

    /// Convenience method: publish a `ChatMessage` event.
    pub async fn publish_chat(&self, channel: &str, sender: UserIdentity, text: &str) {
        let event = BotEvent::ChatMessage {
            channel: channel.to_string(),
            sender,
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        self.publish(event).await;
    }
}
