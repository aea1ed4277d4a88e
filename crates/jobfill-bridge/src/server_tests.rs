use super::*;
use crate::transport::MessageBus;
use serde::Deserialize;
use serde_json::json;

fn server() -> Arc<RpcServer> {
    RpcServer::new(MessageBus::new().channel("test"))
}

#[derive(Deserialize)]
struct AddParams {
    a: i64,
    b: i64,
}

#[tokio::test]
async fn test_registered_handler_succeeds() {
    let server = server();
    server.register("echo", |params: Value| async move { Ok::<_, HandlerError>(params) });

    let response = server
        .handle(RpcRequest::new("echo", json!({"hello": "world"})))
        .await;
    assert!(response.ok);
    assert_eq!(response.data, Some(json!({"hello": "world"})));
    assert!(response.error.is_none());
}

#[tokio::test]
async fn test_unregistered_method_is_rejected() {
    let server = server();
    let request = RpcRequest::new("missing", Value::Null);
    let request_id = request.request_id.clone();

    let response = server.handle(request).await;
    assert!(!response.ok);
    assert_eq!(response.request_id, request_id);
    assert!(response.error.unwrap().contains("No such method: missing"));
}

#[tokio::test]
async fn test_handler_failure_becomes_error_envelope() {
    let server = server();
    server.register("fail", |_params: Value| async move {
        Err::<Value, _>(HandlerError::Failed("store offline".to_string()))
    });

    let response = server.handle(RpcRequest::new("fail", Value::Null)).await;
    assert!(!response.ok);
    assert_eq!(response.error.as_deref(), Some("store offline"));
}

#[tokio::test]
async fn test_handler_panic_becomes_error_envelope() {
    let server = server();
    server.register("explode", |_params: Value| async move {
        if true {
            panic!("handler bug");
        }
        Ok::<_, HandlerError>(Value::Null)
    });

    let response = server.handle(RpcRequest::new("explode", Value::Null)).await;
    assert!(!response.ok);
    assert!(response.error.unwrap().contains("aborted"));
}

#[tokio::test]
async fn test_reregistration_overwrites() {
    let server = server();
    server.register("version", |_params: Value| async move { Ok::<_, HandlerError>(json!(1)) });
    server.register("version", |_params: Value| async move { Ok::<_, HandlerError>(json!(2)) });

    let response = server.handle(RpcRequest::new("version", Value::Null)).await;
    assert_eq!(response.data, Some(json!(2)));
    assert_eq!(server.registered_methods(), vec!["version".to_string()]);
}

#[tokio::test]
async fn test_typed_handler_decodes_params() {
    let server = server();
    server.register_typed("add", |params: AddParams| async move {
        Ok::<i64, HandlerError>(params.a + params.b)
    });

    let response = server
        .handle(RpcRequest::new("add", json!({"a": 2, "b": 40})))
        .await;
    assert_eq!(response.data, Some(json!(42)));
}

#[tokio::test]
async fn test_typed_handler_rejects_bad_params() {
    let server = server();
    server.register_typed("add", |params: AddParams| async move {
        Ok::<i64, HandlerError>(params.a + params.b)
    });

    let response = server
        .handle(RpcRequest::new("add", json!({"a": "two"})))
        .await;
    assert!(!response.ok);
    assert!(response.error.unwrap().starts_with("Invalid params"));
}

#[tokio::test]
async fn test_started_server_answers_over_the_bus() {
    let bus = MessageBus::new();
    let channel = bus.channel("test");
    let server = RpcServer::new(channel.clone());
    server.register("ping", |_params: Value| async move { Ok::<_, HandlerError>(json!("pong")) });
    let task = server.start();

    let mut rx = channel.subscribe();
    let request = RpcRequest::new("ping", Value::Null);
    let request_id = request.request_id.clone();
    channel.post(&Envelope::Request(request)).unwrap();

    loop {
        match rx.recv().await {
            Some(Envelope::Response(response)) => {
                assert_eq!(response.request_id, request_id);
                assert_eq!(response.data, Some(json!("pong")));
                break;
            }
            Some(Envelope::Request(_)) => continue,
            None => panic!("bus closed"),
        }
    }
    task.abort();
}
