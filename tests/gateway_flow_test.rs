use std::time::Duration;

use agent_gateway::config::{AuthContext, GatewayConfig, ModelConfig, ToolApiConfig};
use agent_gateway::gateway::{build_orchestrator, build_session_store};
use agent_gateway::orchestrator::TurnEvent;
use agent_gateway::retry::RetryPolicy;
use agent_gateway::types::{Message, MessageRole};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ACTION_LINK: &str = "[![tx](https://www.blinkai.xyz/gpt/tran_execute.svg)](https://www.blinkai.xyz/transaction/ab-12)";

fn sse(chunks: &[Value]) -> ResponseTemplate {
    let mut body: String = chunks.iter().map(|c| format!("data: {c}\n\n")).collect();
    body.push_str("data: [DONE]\n\n");
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_raw(body, "text/event-stream")
}

fn openapi() -> Value {
    json!({
        "openapi": "3.0.0",
        "paths": {
            "/wallet/balance": {
                "get": {
                    "operationId": "getBalance",
                    "summary": "Wallet balance",
                    "parameters": [
                        {"name": "address", "in": "query", "required": true,
                         "schema": {"type": "string"}}
                    ]
                }
            }
        }
    })
}

/// Model answers with a tool call first and with text once a tool
/// result is in the history.
async fn mount_backends(server: &MockServer, final_text: &str) {
    Mock::given(method("GET"))
        .and(path("/openapi.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openapi()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/wallet/balance"))
        .and(query_param("address", "0xabc"))
        .and(header("authorization", "Bearer tool-token"))
        .and(header("network", "testnet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"balance": "1.5"})))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains(r#""role":"tool""#))
        .respond_with(sse(&[
            json!({"choices": [{"index": 0, "delta": {"content": final_text}}]}),
            json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]}),
        ]))
        .with_priority(1)
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(sse(&[
            json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "id": "call_1", "type": "function",
                 "function": {"name": "getBalance", "arguments": ""}}
            ]}}]}),
            json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": "{\"address\":\"0xabc\"}"}}
            ]}}]}),
            json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]}),
        ]))
        .expect(1)
        .mount(server)
        .await;
}

fn config(server: &MockServer) -> GatewayConfig {
    GatewayConfig::new(
        ModelConfig::new("sk-test")
            .with_base_url(format!("{}/v1", server.uri()))
            .with_retry(RetryPolicy::none()),
        ToolApiConfig::new(
            format!("{}/api", server.uri()),
            format!("{}/openapi.json", server.uri()),
        ),
        AuthContext::new("tool-token", "agent-7", "testnet"),
    )
}

#[tokio::test]
async fn tool_round_trip_produces_final_answer() {
    let server = MockServer::start().await;
    mount_backends(&server, "Your balance is 1.5").await;

    let orchestrator = build_orchestrator(
        &config(&server),
        reqwest::Client::new(),
        CancellationToken::new(),
    );
    let (tx, mut rx) = mpsc::channel(64);
    let mut history = vec![
        Message::system("You are a wallet assistant."),
        Message::user("What is the balance of 0xabc?"),
    ];

    let outcome = assert_ok!(orchestrator.run_turn(&mut history, &tx).await);
    drop(tx);

    assert_eq!(outcome.text, "Your balance is 1.5");
    assert_eq!(outcome.steps, 2);
    assert_eq!(outcome.dispatched, 1);

    let roles: Vec<MessageRole> = history.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::System,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::Tool,
            MessageRole::Assistant,
        ]
    );
    assert_eq!(history[2].tool_calls[0].function.name, "getBalance");
    assert_eq!(history[3].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(history[3].content, r#"{"balance":"1.5"}"#);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert!(matches!(events.first(), Some(TurnEvent::ToolStarted { .. })));
    assert!(events.iter().any(|e| matches!(e, TurnEvent::ToolFinished { .. })));
    assert!(matches!(events.last(), Some(TurnEvent::TextDelta(t)) if t == "Your balance is 1.5"));
}

#[tokio::test]
async fn session_reply_carries_action_button() {
    let server = MockServer::start().await;
    let final_text = format!("Transfer prepared. {ACTION_LINK}");
    mount_backends(&server, &final_text).await;

    let store = build_session_store(&config(&server), CancellationToken::new());
    let handle = assert_ok!(store.submit("chat-1", "Send 1 token to 0xabc").await);
    let reply = assert_ok!(handle.reply().await);

    assert_eq!(reply.text, "Transfer prepared. [![tx](");
    let action = reply.action.unwrap();
    assert_eq!(action.transaction_id, "ab-12");
    assert_eq!(action.url, "https://www.blinkai.xyz/tran/ab-12");

    let transcript = store.transcript("chat-1").await.unwrap();
    assert_eq!(transcript.len(), 2);
    assert!(transcript[0].is_human);
    assert_eq!(transcript[1].text, reply.text);

    let history = store.history("chat-1").await.unwrap();
    assert_eq!(history[0].role, MessageRole::System);
    assert_eq!(history.len(), 5);
}

#[tokio::test]
async fn stalled_document_falls_back_to_no_tools() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/openapi.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(openapi())
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(sse(&[
            json!({"choices": [{"index": 0, "delta": {"content": "No tools right now."}, "finish_reason": "stop"}]}),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.tools = config.tools.with_timeout(Duration::from_millis(200));
    let orchestrator = build_orchestrator(&config, reqwest::Client::new(), CancellationToken::new());
    let (tx, _rx) = mpsc::channel(64);
    let mut history = vec![Message::user("What is the balance of 0xabc?")];

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.run_turn(&mut history, &tx),
    )
    .await
    .expect("document fetch must time out");
    let outcome = assert_ok!(outcome);
    assert_eq!(outcome.text, "No tools right now.");

    let requests = server.received_requests().await.unwrap();
    let completion = requests
        .iter()
        .find(|r| r.url.path() == "/v1/chat/completions")
        .unwrap();
    let body: Value = serde_json::from_slice(&completion.body).unwrap();
    assert!(body.get("tools").is_none());
}
