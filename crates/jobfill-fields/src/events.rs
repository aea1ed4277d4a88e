//! Per-instance refresh notifications.
//!
//! Each field automation owns one [`RefreshChannel`]. Overlays subscribe
//! to it and redraw on every [`RefreshEvent`]; end-of-stream means the
//! field's element left the document.

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use jobfill_protocols::{Answer, FieldPath};

use crate::automation::{FieldState, SaveStatus};

/// State published after every refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshEvent {
    pub instance_id: String,
    pub path: FieldPath,
    pub state: FieldState,
    pub has_answer: bool,
    pub answer: Option<Answer>,
    pub current_value: Option<Answer>,
    pub save_status: SaveStatus,
}

/// Broadcast channel named `refresh-<instance id>`.
pub struct RefreshChannel {
    id: String,
    sender: Mutex<Option<broadcast::Sender<RefreshEvent>>>,
}

impl RefreshChannel {
    pub fn new(instance_id: &str) -> Self {
        let (sender, _) = broadcast::channel(64);
        Self {
            id: format!("refresh-{}", instance_id),
            sender: Mutex::new(Some(sender)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Publish `event`. Returns how many subscribers received it.
    pub fn notify(&self, event: RefreshEvent) -> usize {
        match self.sender.lock().as_ref() {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Subscribe to future events. A closed channel yields a subscription
    /// that ends immediately.
    pub fn subscribe(&self) -> RefreshSubscription {
        let rx = match self.sender.lock().as_ref() {
            Some(sender) => sender.subscribe(),
            None => {
                let (_, rx) = broadcast::channel(1);
                rx
            }
        };
        RefreshSubscription {
            channel_id: self.id.clone(),
            rx: Some(rx),
        }
    }

    /// End the stream for every subscriber.
    pub fn close(&self) {
        if self.sender.lock().take().is_some() {
            debug!("Closed {}", self.id);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender
            .lock()
            .as_ref()
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

/// Explicit handle on a [`RefreshChannel`] subscription.
///
/// Released by [`RefreshSubscription::release`] or on drop.
pub struct RefreshSubscription {
    channel_id: String,
    rx: Option<broadcast::Receiver<RefreshEvent>>,
}

impl RefreshSubscription {
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Next event, or `None` once the channel is closed or released.
    pub async fn recv(&mut self) -> Option<RefreshEvent> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("{} subscriber lagged by {} events", self.channel_id, skipped);
                }
                Err(RecvError::Closed) => {
                    self.rx = None;
                    return None;
                }
            }
        }
    }

    pub fn release(&mut self) {
        self.rx = None;
    }

    pub fn is_released(&self) -> bool {
        self.rx.is_none()
    }
}
