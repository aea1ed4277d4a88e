//! Wiring of both contexts inside one process.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use jobfill_bridge::{
    register_answer_methods, AnswerClient, ClientConfig, MessageBus, RpcClient, RpcServer,
};
use jobfill_config::{Config, FieldsConfig};
use jobfill_fields::{Checkbox, Discoverer, KindRegistry, Page, PasswordInput, TextInput};
use jobfill_protocols::{FieldError, FieldSnapshot};
use jobfill_store_memory::MemoryAnswerStore;

/// Store and server on one side of the bus, discoverer and its automations
/// on the other.
pub(crate) struct Session {
    pub discoverer: Arc<Discoverer>,
    pub store: Arc<MemoryAnswerStore>,
    serving: JoinHandle<()>,
    watcher: Option<JoinHandle<()>>,
}

impl Session {
    pub(crate) fn start(
        config: &Config,
        page: Page,
        seed: Vec<FieldSnapshot>,
    ) -> Result<Self, FieldError> {
        let bus = MessageBus::new();

        let store = Arc::new(MemoryAnswerStore::seeded(seed));
        let server = RpcServer::new(bus.channel(config.bridge.channel.clone()));
        register_answer_methods(&server, store.clone());
        let serving = server.start();

        let rpc = RpcClient::new(
            bus.channel(config.bridge.channel.clone()),
            ClientConfig {
                request_timeout: config.bridge.request_timeout(),
            },
        );
        let answers = AnswerClient::new(Arc::new(rpc));

        let registry = build_registry(&config.fields)?;
        info!("Field kinds: {:?}", registry.list_ids());

        let discoverer = Arc::new(
            Discoverer::new(Arc::new(page), answers, Arc::new(registry))
                .with_marker_attribute(config.discovery.marker_attribute.clone()),
        );
        let watcher = config
            .discovery
            .watch_mutations
            .then(|| discoverer.watch());

        Ok(Self {
            discoverer,
            store,
            serving,
            watcher,
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.discoverer.shutdown();
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        self.serving.abort();
        debug!("Session closed");
    }
}

/// Registry with every enabled built-in kind, honouring locator overrides.
pub(crate) fn build_registry(fields: &FieldsConfig) -> Result<KindRegistry, FieldError> {
    let registry = KindRegistry::new();

    if fields.text_input.enabled {
        let mut kind = TextInput::new();
        if let Some(locator) = &fields.text_input.locator {
            kind = kind.with_locator(locator.clone());
        }
        if let Some(attribute) = &fields.text_input.section_attribute {
            kind = kind.with_section_attribute(attribute.clone());
        }
        registry.register(Arc::new(kind))?;
    }

    if fields.password_input.enabled {
        let mut kind = PasswordInput::new();
        if let Some(locator) = &fields.password_input.locator {
            kind = kind.with_locator(locator.clone());
        }
        registry.register(Arc::new(kind))?;
    }

    if fields.checkbox.enabled {
        let mut kind = Checkbox::new();
        if let Some(locator) = &fields.checkbox.locator {
            kind = kind.with_locator(locator.clone());
        }
        registry.register(Arc::new(kind))?;
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobfill_config::ConfigLoader;
    use jobfill_protocols::Locator;

    #[test]
    fn test_build_registry_defaults() {
        let registry = build_registry(&FieldsConfig::default()).unwrap();
        assert_eq!(
            registry.list_ids(),
            vec!["Checkbox", "PasswordInput", "TextInput"]
        );
    }

    #[test]
    fn test_build_registry_respects_enabled_and_locator() {
        let config = ConfigLoader::load_str(
            r#"
            [fields.password_input]
            enabled = false
            [fields.checkbox.locator]
            tag = "label"
            "#,
        )
        .unwrap();
        let registry = build_registry(&config.fields).unwrap();
        assert_eq!(registry.list_ids(), vec!["Checkbox", "TextInput"]);
        assert_eq!(
            registry.get("Checkbox").unwrap().locator(),
            &Locator::tag("label")
        );
    }

    #[tokio::test]
    async fn test_session_discovers_fields() {
        let page = Page::load_json(
            r#"[{"tag": "h2", "text": "Apply"},
                {"tag": "div", "attributes": {"data-automation-id": "formField-name"},
                 "children": [{"tag": "label", "text": "Name"},
                              {"tag": "input", "attributes": {"type": "text"}}]}]"#,
        )
        .unwrap();
        let session = Session::start(&Config::default(), page, Vec::new()).unwrap();
        let fields = session.discoverer.auto_discover_document();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].path().field_name, "Name");
    }
}
