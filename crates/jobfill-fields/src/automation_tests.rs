use super::*;
use std::time::Duration;

use jobfill_bridge::{register_answer_methods, ClientConfig, MessageBus, RpcClient, RpcServer};
use jobfill_protocols::AnswerStore;
use jobfill_store_memory::MemoryAnswerStore;
use serde_json::json;

use crate::document::NodeSpec;
use crate::kinds::{Checkbox, PasswordInput, TextInput};

struct Harness {
    page: Arc<Page>,
    store: Arc<MemoryAnswerStore>,
    answers: AnswerClient,
    _serving: JoinHandle<()>,
}

fn document() -> Vec<NodeSpec> {
    vec![
        NodeSpec::new("h2").with_text("My Experience"),
        NodeSpec::new("div")
            .with_attr("data-automation-id", "formField-company")
            .with_child(NodeSpec::new("label").with_text("Company"))
            .with_child(NodeSpec::new("input").with_attr("type", "text")),
        NodeSpec::new("div")
            .with_attr("data-automation-id", "formField-password")
            .with_child(NodeSpec::new("label").with_text("Password"))
            .with_child(NodeSpec::new("input").with_attr("type", "password")),
        NodeSpec::new("div")
            .with_attr("data-automation-id", "formField-relocate")
            .with_child(NodeSpec::new("label").with_text("Willing to relocate"))
            .with_child(NodeSpec::new("input").with_attr("type", "checkbox")),
    ]
}

fn harness(seed: Vec<FieldSnapshot>) -> Harness {
    let bus = MessageBus::new();
    let store = Arc::new(MemoryAnswerStore::seeded(seed));
    let server = RpcServer::new(bus.channel("jobfill"));
    register_answer_methods(&server, store.clone());
    let serving = server.start();
    let rpc = RpcClient::new(bus.channel("jobfill"), ClientConfig::default());

    Harness {
        page: Arc::new(Page::from_specs(&document()).unwrap()),
        store,
        answers: AnswerClient::new(Arc::new(rpc)),
        _serving: serving,
    }
}

fn company_path() -> FieldPath {
    FieldPath::new("My Experience", "", "TextInput", "Company")
}

fn attach(h: &Harness, kind: Arc<dyn FieldKind>) -> Arc<FieldAutomation> {
    let element = h.page.read(|tree| tree.query(kind.locator(), tree.root()))[0];
    FieldAutomation::attach(element, kind, h.page.clone(), h.answers.clone())
}

fn input_of(h: &Harness, automation: &FieldAutomation) -> NodeId {
    h.page
        .read(|tree| tree.find_first(automation.element(), "input"))
        .unwrap()
}

#[tokio::test]
async fn test_attach_wires_listener_then_fills() {
    let h = harness(vec![]);
    let field = attach(&h, Arc::new(TextInput::new()));

    assert_eq!(field.state(), FieldState::Listening);
    assert_eq!(field.channel_id(), format!("refresh-{}", field.id()));

    field.wait_ready().await;
    assert!(field.is_ready());
    assert_eq!(field.state(), FieldState::Unfilled);
    assert_eq!(field.current_value(), Some(json!("")));
}

#[tokio::test]
async fn test_path_is_derived_from_document() {
    let h = harness(vec![]);
    let field = attach(&h, Arc::new(TextInput::new()));
    assert_eq!(field.path(), company_path());
    assert_eq!(field.field_type(), "TextInput");

    // Path follows the live document.
    let heading = h.page.read(|t| t.find_first(t.root(), "h2")).unwrap();
    h.page.remove(heading).unwrap();
    assert_eq!(field.path().page, "");
}

#[tokio::test]
async fn test_initial_fill_uses_stored_answer() {
    let h = harness(vec![company_path().snapshot(Some(json!("Acme Corp")))]);
    let field = attach(&h, Arc::new(TextInput::new()));
    field.wait_ready().await;

    assert_eq!(field.current_value(), Some(json!("Acme Corp")));
    assert_eq!(field.state(), FieldState::HasAnswer);
    assert!(field.has_answer().await.unwrap());
    assert!(field.is_filled().await.unwrap());
}

#[tokio::test]
async fn test_fill_without_answer_writes_nothing() {
    let h = harness(vec![]);
    let field = attach(&h, Arc::new(TextInput::new()));
    field.wait_ready().await;

    assert!(!field.fill().await.unwrap());
    assert!(!field.is_filled().await.unwrap());
    assert_eq!(field.answer().await.unwrap(), None);
}

#[tokio::test]
async fn test_save_persists_live_value() {
    let h = harness(vec![]);
    let field = attach(&h, Arc::new(TextInput::new()));
    field.wait_ready().await;

    h.page.set_value(input_of(&h, &field), "Initech").unwrap();
    assert!(field.save().await);

    assert_eq!(field.save_status(), SaveStatus::Ok);
    assert_eq!(field.state(), FieldState::HasAnswer);
    let stored = h.store.get(&company_path().store_key()).await.unwrap().unwrap();
    assert_eq!(stored.answer, Some(json!("Initech")));
    assert_eq!(field.answer().await.unwrap(), Some(json!("Initech")));
}

#[tokio::test]
async fn test_delete_answer_returns_to_unfilled() {
    let h = harness(vec![company_path().snapshot(Some(json!("Acme Corp")))]);
    let field = attach(&h, Arc::new(TextInput::new()));
    field.wait_ready().await;

    assert!(field.delete_answer().await);
    assert_eq!(field.state(), FieldState::Unfilled);
    assert!(!field.has_answer().await.unwrap());
    assert_eq!(h.store.len().await.unwrap(), 0);
    // The live value is left in place.
    assert_eq!(field.current_value(), Some(json!("Acme Corp")));
}

#[tokio::test]
async fn test_live_change_triggers_refresh() {
    let h = harness(vec![]);
    let field = attach(&h, Arc::new(TextInput::new()));
    field.wait_ready().await;
    let mut sub = field.subscribe();

    h.page.set_value(input_of(&h, &field), "typed").unwrap();

    let event = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = sub.recv().await.unwrap();
            if event.current_value == Some(json!("typed")) {
                return event;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(event.instance_id, field.id());
    assert_eq!(event.state, FieldState::Unfilled);
    assert!(!event.has_answer);
}

#[tokio::test]
async fn test_change_buried_under_other_events_still_refreshes() {
    let h = harness(vec![]);
    let field = attach(&h, Arc::new(TextInput::new()));
    field.wait_ready().await;
    let mut sub = field.subscribe();

    // Enough unrelated mutations to push the value change out of the
    // listener's event buffer before it runs.
    h.page.set_value(input_of(&h, &field), "Initech").unwrap();
    for i in 0..1100 {
        h.page
            .set_attribute(field.element(), "data-tick", i.to_string())
            .unwrap();
    }

    let event = tokio::time::timeout(Duration::from_secs(5), sub.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.current_value, Some(json!("Initech")));
}

#[tokio::test]
async fn test_refresh_broadcasts_answer() {
    let h = harness(vec![company_path().snapshot(Some(json!("Acme Corp")))]);
    let field = attach(&h, Arc::new(TextInput::new()));
    field.wait_ready().await;
    let mut sub = field.subscribe();

    let returned = field.refresh().await.unwrap();
    let received = sub.recv().await.unwrap();
    assert_eq!(returned, received);
    assert!(received.has_answer);
    assert_eq!(received.answer, Some(json!("Acme Corp")));
    assert_eq!(received.path, company_path());
}

#[tokio::test]
async fn test_checkbox_round_trip() {
    let h = harness(vec![]);
    let field = attach(&h, Arc::new(Checkbox::new()));
    field.wait_ready().await;
    assert_eq!(field.current_value(), Some(json!(false)));

    h.page.set_checked(input_of(&h, &field), true).unwrap();
    assert!(field.save().await);
    h.page.set_checked(input_of(&h, &field), false).unwrap();

    assert!(field.fill().await.unwrap());
    assert_eq!(field.current_value(), Some(json!(true)));
}

#[tokio::test]
async fn test_password_answers_are_stored() {
    let h = harness(vec![]);
    let field = attach(&h, Arc::new(PasswordInput::new()));
    field.wait_ready().await;

    h.page.set_value(input_of(&h, &field), "s3cret").unwrap();
    assert!(field.save().await);
    let path = FieldPath::new("My Experience", "", "PasswordInput", "Password");
    let stored = h.store.get(&path.store_key()).await.unwrap().unwrap();
    assert_eq!(stored.answer, Some(json!("s3cret")));
}

#[tokio::test]
async fn test_stored_answer_of_wrong_type_is_rejected() {
    let path = FieldPath::new("My Experience", "", "Checkbox", "Willing to relocate");
    let h = harness(vec![path.snapshot(Some(json!("yes")))]);
    let field = attach(&h, Arc::new(Checkbox::new()));
    field.wait_ready().await;

    assert!(matches!(field.answer().await, Err(FieldError::AnswerType { .. })));
    assert_eq!(field.current_value(), Some(json!(false)));
}

#[tokio::test]
async fn test_bridge_failure_leaves_state_unchanged() {
    let bus = MessageBus::new();
    let rpc = RpcClient::new(
        bus.channel("nobody-home"),
        ClientConfig {
            request_timeout: Some(Duration::from_millis(50)),
        },
    );
    let page = Arc::new(Page::from_specs(&document()).unwrap());
    let kind: Arc<dyn FieldKind> = Arc::new(TextInput::new());
    let element = page.read(|tree| tree.query(kind.locator(), tree.root()))[0];
    let field = FieldAutomation::attach(element, kind, page, AnswerClient::new(Arc::new(rpc)));
    field.wait_ready().await;

    assert_eq!(field.state(), FieldState::Listening);
    assert!(matches!(field.refresh().await, Err(FieldError::Bridge(_))));
    assert_eq!(field.state(), FieldState::Listening);

    let mut sub = field.subscribe();
    assert!(!field.save().await);
    assert_eq!(field.save_status(), SaveStatus::Error);
    let event = sub.recv().await.unwrap();
    assert_eq!(event.save_status, SaveStatus::Error);
    assert_eq!(event.state, FieldState::Listening);
}

#[tokio::test]
async fn test_destroy_closes_refresh_channel() {
    let h = harness(vec![]);
    let field = attach(&h, Arc::new(TextInput::new()));
    field.wait_ready().await;
    let mut sub = field.subscribe();

    field.destroy();
    assert!(field.is_destroyed());
    assert_eq!(sub.recv().await, None);
}
