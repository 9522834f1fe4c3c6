//! src/irc/runtime.rs
//!
//! Drives an `IrcClient`: joins channels once registered, keeps the nick
//! usable, and forwards PRIVMSGs onto the event bus.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use alaris_common::traits::IrcConnection;

use super::client::{IrcHandle, IrcIncomingEvent};
use crate::eventbus::EventBus;

/// RPL_WELCOME
const RPL_WELCOME: &str = "001";
/// ERR_NICKNAMEINUSE
const ERR_NICKNAMEINUSE: &str = "433";

pub struct IrcRuntime {
    handle: IrcHandle,
    channels: Vec<String>,
    event_bus: Arc<EventBus>,
}

impl IrcRuntime {
    pub fn new(handle: IrcHandle, channels: Vec<String>, event_bus: Arc<EventBus>) -> Self {
        Self { handle, channels, event_bus }
    }

    /// Consumes `incoming` until the connection closes or the bus shuts down.
    pub fn spawn(self, mut incoming: mpsc::UnboundedReceiver<IrcIncomingEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut shutdown_rx = self.event_bus.shutdown_rx.clone();
            while !self.event_bus.is_shutdown() {
                tokio::select! {
                    maybe_evt = incoming.recv() => {
                        match maybe_evt {
                            Some(evt) => self.handle_event(evt).await,
                            None => break,
                        }
                    }
                    Ok(_) = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("(IrcRuntime) read loop ended.");
        })
    }

    pub async fn handle_event(&self, evt: IrcIncomingEvent) {
        match evt.command.as_str() {
            RPL_WELCOME => {
                info!("Registered with the server as '{}'", self.handle.nickname());
                for channel in &self.channels {
                    self.handle.join_channel(channel);
                }
            }
            ERR_NICKNAMEINUSE => {
                let next = format!("{}_", self.handle.nickname());
                warn!("Nickname in use; retrying as '{}'", next);
                self.handle.set_nickname(&next);
            }
            "PRIVMSG" => {
                let (Some(sender), Some(target), Some(text)) = (evt.sender, evt.target, evt.text) else {
                    debug!("Ignoring malformed PRIVMSG: {}", evt.raw_line);
                    return;
                };
                // Private messages are answered back to the sender.
                let channel = if target.eq_ignore_ascii_case(&self.handle.nickname()) {
                    sender.nick.clone()
                } else {
                    target
                };
                self.event_bus.publish_chat(&channel, sender, &text).await;
            }
            other => debug!("(IrcRuntime) ignoring {}", other),
        }
    }
}
