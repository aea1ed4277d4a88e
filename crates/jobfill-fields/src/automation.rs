//! Per-field automation instances.
//!
//! A [`FieldAutomation`] binds one discovered container element to its
//! [`FieldKind`] and to the answer bridge. It derives the field's path from
//! the live document on every read, fills the field from the stored answer,
//! saves what the user typed, and publishes a [`RefreshEvent`] whenever its
//! view of the answer changes.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use jobfill_bridge::AnswerClient;
use jobfill_protocols::{Answer, FieldError, FieldPath, FieldSnapshot};

use crate::document::{DocumentEvent, NodeId, Page};
use crate::events::{RefreshChannel, RefreshEvent, RefreshSubscription};
use crate::kind::FieldKind;

/// Lifecycle of an automation instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldState {
    Discovered,
    Listening,
    Unfilled,
    HasAnswer,
}

/// Outcome of the most recent save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Ok,
    Loading,
    Error,
}

pub struct FieldAutomation {
    id: String,
    element: NodeId,
    kind: Arc<dyn FieldKind>,
    page: Arc<Page>,
    answers: AnswerClient,
    channel: RefreshChannel,
    state: Mutex<FieldState>,
    save_status: Mutex<SaveStatus>,
    last_answer: Mutex<Option<Answer>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    ready: watch::Sender<bool>,
}

impl FieldAutomation {
    /// Bind an automation to `element` and start it.
    ///
    /// Change observation is wired before this returns; the initial fill
    /// runs on the next scheduler tick. Must be called inside a Tokio
    /// runtime.
    pub fn attach(
        element: NodeId,
        kind: Arc<dyn FieldKind>,
        page: Arc<Page>,
        answers: AnswerClient,
    ) -> Arc<Self> {
        let id = Uuid::new_v4().to_string();
        let (ready, _) = watch::channel(false);
        let automation = Arc::new(Self {
            channel: RefreshChannel::new(&id),
            id,
            element,
            kind,
            page,
            answers,
            state: Mutex::new(FieldState::Discovered),
            save_status: Mutex::new(SaveStatus::Ok),
            last_answer: Mutex::new(None),
            listener: Mutex::new(None),
            ready,
        });

        automation.listen_for_changes();

        let initial = automation.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            if let Err(e) = initial.fill().await {
                warn!("Initial fill of {} failed: {}", initial.id, e);
            }
            initial.ready.send_replace(true);
        });

        automation
    }

    fn listen_for_changes(self: &Arc<Self>) {
        let watched = self
            .page
            .read(|tree| self.kind.listen_for_changes(tree, self.element));
        let mut events = self.page.subscribe();
        let weak: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            loop {
                let changed = match events.recv().await {
                    Ok(DocumentEvent::ValueChanged { node }) => watched.contains(&node),
                    Ok(_) => false,
                    // A missed change cannot be ruled out.
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Change listener lagged by {} events", skipped);
                        true
                    }
                    Err(RecvError::Closed) => break,
                };
                if !changed {
                    continue;
                }
                let Some(this) = weak.upgrade() else {
                    break;
                };
                if let Err(e) = this.refresh().await {
                    warn!("Refresh of {} after change failed: {}", this.id, e);
                }
            }
        });

        *self.listener.lock() = Some(handle);
        *self.state.lock() = FieldState::Listening;
        debug!(
            "{} {} listening on {} ({})",
            self.kind.field_type(),
            self.id,
            self.element,
            self.channel.id()
        );
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn field_type(&self) -> &str {
        self.kind.field_type()
    }

    pub fn kind(&self) -> &Arc<dyn FieldKind> {
        &self.kind
    }

    pub fn channel_id(&self) -> &str {
        self.channel.id()
    }

    pub fn state(&self) -> FieldState {
        *self.state.lock()
    }

    pub fn save_status(&self) -> SaveStatus {
        *self.save_status.lock()
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Wait until the initial fill has run.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        let _ = rx.wait_for(|ready| *ready).await;
    }

    pub fn is_connected(&self) -> bool {
        self.page.read(|tree| tree.is_connected(self.element))
    }

    /// Current logical path, derived from the document as it is now.
    pub fn path(&self) -> FieldPath {
        self.page.read(|tree| {
            let page = match tree.find_first(tree.root(), "h2") {
                Some(heading) => tree.inner_text(heading),
                None => {
                    debug!("No page heading for {}", self.id);
                    String::new()
                }
            };
            FieldPath {
                page,
                section: self.kind.section(tree, self.element),
                field_type: self.kind.field_type().to_string(),
                field_name: self.kind.field_name(tree, self.element),
            }
        })
    }

    pub fn current_value(&self) -> Option<Answer> {
        self.page
            .read(|tree| self.kind.current_value(tree, self.element))
    }

    /// Path plus live value.
    pub fn field_snapshot(&self) -> FieldSnapshot {
        self.path().snapshot(self.current_value())
    }

    /// Stored snapshot for this field's path.
    pub async fn fetch_answer(&self) -> Result<Option<FieldSnapshot>, FieldError> {
        Ok(self.answers.get_answer(&self.path()).await?)
    }

    pub async fn has_answer(&self) -> Result<bool, FieldError> {
        Ok(self.fetch_answer().await?.is_some())
    }

    /// Stored answer narrowed to this kind's shape.
    pub async fn answer(&self) -> Result<Option<Answer>, FieldError> {
        let snapshot = self.fetch_answer().await?;
        snapshot
            .and_then(|s| s.answer)
            .map(|stored| self.kind.answer(&stored))
            .transpose()
    }

    /// Whether the live value equals the stored answer.
    pub async fn is_filled(&self) -> Result<bool, FieldError> {
        Ok(match self.answer().await? {
            Some(answer) => self.current_value() == Some(answer),
            None => false,
        })
    }

    /// Write the stored answer, if any, into the field. Returns whether a
    /// value was written.
    pub async fn fill(&self) -> Result<bool, FieldError> {
        let answer = self.answer().await?;
        let filled = match &answer {
            Some(answer) => {
                self.kind.fill(&self.page, self.element, answer)?;
                info!("Filled {} with {}", self.path(), self.redact(answer));
                true
            }
            None => false,
        };
        self.refresh().await?;
        Ok(filled)
    }

    /// Persist the live value. Returns whether the store accepted it.
    ///
    /// Success refreshes from the store. Failure does not: the stored answer
    /// is left as it was, and only a [`RefreshEvent`] carrying
    /// [`SaveStatus::Error`] is published so the overlay can report it.
    pub async fn save(&self) -> bool {
        *self.save_status.lock() = SaveStatus::Loading;
        let snapshot = self.field_snapshot();

        match self.answers.save_answer(&snapshot).await {
            Ok(true) => {
                *self.save_status.lock() = SaveStatus::Ok;
                debug!("Saved {}", snapshot.path);
                if let Err(e) = self.refresh().await {
                    warn!("Refresh of {} after save failed: {}", self.id, e);
                }
                true
            }
            Ok(false) => {
                warn!("Store declined answer for {}", snapshot.path);
                self.mark_save_failed();
                false
            }
            Err(e) => {
                warn!("Saving {} failed: {}", snapshot.path, e);
                self.mark_save_failed();
                false
            }
        }
    }

    fn mark_save_failed(&self) {
        *self.save_status.lock() = SaveStatus::Error;
        self.publish();
    }

    /// Remove the stored answer, then refresh whatever the outcome.
    pub async fn delete_answer(&self) -> bool {
        let path = self.path();
        let deleted = match self.answers.delete_answer(&path).await {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!("Deleting answer for {} failed: {}", path, e);
                false
            }
        };
        if let Err(e) = self.refresh().await {
            warn!("Refresh of {} after delete failed: {}", self.id, e);
        }
        deleted
    }

    /// Re-read the stored answer and live value, update the state and
    /// broadcast the result.
    ///
    /// On a bridge failure nothing changes and nothing is broadcast.
    pub async fn refresh(&self) -> Result<RefreshEvent, FieldError> {
        let snapshot = self.fetch_answer().await?;
        let has_answer = snapshot.is_some();
        let answer = snapshot
            .and_then(|s| s.answer)
            .map(|stored| self.kind.answer(&stored))
            .transpose()?;

        *self.state.lock() = if has_answer {
            FieldState::HasAnswer
        } else {
            FieldState::Unfilled
        };
        *self.last_answer.lock() = answer;

        Ok(self.publish())
    }

    fn publish(&self) -> RefreshEvent {
        let state = self.state();
        let event = RefreshEvent {
            instance_id: self.id.clone(),
            path: self.path(),
            state,
            has_answer: state == FieldState::HasAnswer,
            answer: self.last_answer.lock().clone(),
            current_value: self.current_value(),
            save_status: self.save_status(),
        };
        self.channel.notify(event.clone());
        event
    }

    pub fn subscribe(&self) -> RefreshSubscription {
        self.channel.subscribe()
    }

    /// Stop observing the element and end the refresh stream.
    pub fn destroy(&self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
        self.channel.close();
        debug!("Destroyed {} {}", self.kind.field_type(), self.id);
    }

    pub fn is_destroyed(&self) -> bool {
        self.channel.is_closed()
    }

    fn redact(&self, answer: &Answer) -> String {
        if self.kind.is_sensitive() {
            "<redacted>".to_string()
        } else {
            answer.to_string()
        }
    }
}

impl Drop for FieldAutomation {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            listener.abort();
        }
    }
}

#[cfg(test)]
#[path = "automation_tests.rs"]
mod tests;
