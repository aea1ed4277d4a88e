//! Field discovery and instance ownership.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use jobfill_bridge::AnswerClient;

use crate::automation::FieldAutomation;
use crate::document::{DocumentEvent, NodeId, Page};
use crate::kind::KindRegistry;

/// Attribute written onto every claimed element.
pub const DEFAULT_MARKER_ATTRIBUTE: &str = "job-app-filler";

/// Finds field containers on a page and owns one automation per element.
pub struct Discoverer {
    page: Arc<Page>,
    answers: AnswerClient,
    registry: Arc<KindRegistry>,
    marker_attribute: String,
    owned: Mutex<HashSet<NodeId>>,
    instances: Mutex<BTreeMap<NodeId, Arc<FieldAutomation>>>,
}

impl Discoverer {
    pub fn new(page: Arc<Page>, answers: AnswerClient, registry: Arc<KindRegistry>) -> Self {
        Self {
            page,
            answers,
            registry,
            marker_attribute: DEFAULT_MARKER_ATTRIBUTE.to_string(),
            owned: Mutex::new(HashSet::new()),
            instances: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn with_marker_attribute(mut self, name: impl Into<String>) -> Self {
        self.marker_attribute = name.into();
        self
    }

    pub fn page(&self) -> &Arc<Page> {
        &self.page
    }

    pub fn marker_attribute(&self) -> &str {
        &self.marker_attribute
    }

    /// Attach an automation to every unclaimed field container under
    /// `scope`, for every registered kind. Returns the new instances.
    ///
    /// Each element is claimed before its automation is built, so a second
    /// pass over an unchanged tree creates nothing.
    pub fn auto_discover(&self, scope: NodeId) -> Vec<Arc<FieldAutomation>> {
        let mut created = Vec::new();

        for kind in self.registry.kinds() {
            let candidates: Vec<NodeId> = self.page.read(|tree| {
                tree.query(kind.locator(), scope)
                    .into_iter()
                    .filter(|node| !tree.has_attribute(*node, &self.marker_attribute))
                    .collect()
            });

            for element in candidates {
                if !self.owned.lock().insert(element) {
                    continue;
                }

                let automation = FieldAutomation::attach(
                    element,
                    kind.clone(),
                    self.page.clone(),
                    self.answers.clone(),
                );
                if let Err(e) =
                    self.page
                        .set_attribute(element, self.marker_attribute.clone(), automation.id())
                {
                    warn!("Could not mark {}: {}", element, e);
                }
                self.instances.lock().insert(element, automation.clone());
                created.push(automation);
            }
        }

        if !created.is_empty() {
            info!("Discovered {} new field(s) under {}", created.len(), scope);
        }
        created
    }

    pub fn auto_discover_document(&self) -> Vec<Arc<FieldAutomation>> {
        self.auto_discover(self.page.root())
    }

    /// Live instances in document order.
    pub fn instances(&self) -> Vec<Arc<FieldAutomation>> {
        self.instances.lock().values().cloned().collect()
    }

    pub fn instance_for(&self, element: NodeId) -> Option<Arc<FieldAutomation>> {
        self.instances.lock().get(&element).cloned()
    }

    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }

    /// Destroy the instances bound to any of `nodes`. Returns how many
    /// were destroyed.
    pub fn release_removed(&self, nodes: &[NodeId]) -> usize {
        let released: Vec<Arc<FieldAutomation>> = {
            let mut instances = self.instances.lock();
            nodes.iter().filter_map(|node| instances.remove(node)).collect()
        };
        {
            let mut owned = self.owned.lock();
            for node in nodes {
                owned.remove(node);
            }
        }
        for automation in &released {
            automation.destroy();
        }
        if !released.is_empty() {
            debug!("Released {} field(s) removed from the document", released.len());
        }
        released.len()
    }

    /// Destroy the instances whose element is no longer in the document.
    pub fn release_disconnected(&self) -> usize {
        let gone: Vec<NodeId> = {
            let elements: Vec<NodeId> = self.instances.lock().keys().copied().collect();
            self.page.read(|tree| {
                elements
                    .into_iter()
                    .filter(|element| !tree.is_connected(*element))
                    .collect()
            })
        };
        self.release_removed(&gone)
    }

    /// Destroy every instance.
    pub fn shutdown(&self) {
        let all: Vec<NodeId> = self.instances.lock().keys().copied().collect();
        self.release_removed(&all);
    }

    /// Follow document mutations: rediscover on insertion, release on
    /// removal. The task exits at the first event after the discoverer is
    /// dropped; abort the handle to stop it sooner.
    pub fn watch(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.page.subscribe();
        let weak: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Discovery watcher lagged by {} events, rescanning", skipped);
                        match weak.upgrade() {
                            Some(this) => {
                                this.release_disconnected();
                                this.auto_discover_document();
                                continue;
                            }
                            None => break,
                        }
                    }
                    Err(RecvError::Closed) => break,
                };

                let Some(this) = weak.upgrade() else {
                    break;
                };
                match event {
                    DocumentEvent::NodesInserted { .. } => {
                        this.auto_discover_document();
                    }
                    DocumentEvent::NodesRemoved { nodes } => {
                        this.release_removed(&nodes);
                    }
                    _ => {}
                }
            }
            debug!("Discovery watcher stopped");
        })
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
