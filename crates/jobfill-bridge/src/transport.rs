//! Message transport shared by both contexts.
//!
//! The bus behaves like a window message channel: frames carry only text
//! and are addressed by channel name. Each listener owns an unbounded
//! queue, so a listener that falls behind still sees every frame.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use jobfill_protocols::{BridgeError, Envelope, Frame};

struct Listener {
    channel: String,
    tx: mpsc::UnboundedSender<Frame>,
}

/// Multiplexed, unordered message bus.
#[derive(Clone, Default)]
pub struct MessageBus {
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a named channel on this bus.
    pub fn channel(&self, name: impl Into<String>) -> MessageChannel {
        MessageChannel {
            name: name.into(),
            bus: self.clone(),
        }
    }

    /// Number of live listeners across all channels.
    pub fn listener_count(&self) -> usize {
        let mut listeners = self.listeners.lock();
        listeners.retain(|l| !l.tx.is_closed());
        listeners.len()
    }

    fn listen(&self, channel: &str) -> mpsc::UnboundedReceiver<Frame> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().push(Listener {
            channel: channel.to_string(),
            tx,
        });
        rx
    }

    /// Hand `frame` to every live listener on its channel. Returns how many
    /// listeners received it.
    fn deliver(&self, frame: Frame) -> usize {
        let mut listeners = self.listeners.lock();
        listeners.retain(|l| !l.tx.is_closed());
        listeners
            .iter()
            .filter(|l| l.channel == frame.channel)
            .filter(|l| l.tx.send(frame.clone()).is_ok())
            .count()
    }
}

/// Handle for posting to and listening on one named channel.
#[derive(Clone)]
pub struct MessageChannel {
    name: String,
    bus: MessageBus,
}

impl MessageChannel {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Serialize and post an envelope.
    pub fn post(&self, envelope: &Envelope) -> Result<(), BridgeError> {
        let frame = Frame {
            channel: self.name.clone(),
            body: envelope.encode()?,
        };
        trace!("bus send [{}]: {}", self.name, frame.body);
        match self.bus.deliver(frame) {
            0 => Err(BridgeError::Transport(format!(
                "no listeners on '{}'",
                self.name
            ))),
            _ => Ok(()),
        }
    }

    /// Start listening. Only frames posted after this call are seen.
    pub fn subscribe(&self) -> ChannelReceiver {
        ChannelReceiver {
            name: self.name.clone(),
            rx: self.bus.listen(&self.name),
        }
    }
}

/// Receiving end of a [`MessageChannel`].
pub struct ChannelReceiver {
    name: String,
    rx: mpsc::UnboundedReceiver<Frame>,
}

impl ChannelReceiver {
    /// Next well-formed envelope on this channel, or `None` once every
    /// handle to the bus is gone. Undecodable frames are skipped.
    pub async fn recv(&mut self) -> Option<Envelope> {
        while let Some(frame) = self.rx.recv().await {
            match Envelope::decode(&frame.body) {
                Ok(envelope) => return Some(envelope),
                Err(e) => warn!("Dropping malformed frame on '{}': {}", self.name, e),
            }
        }
        None
    }
}
