use agent_gateway::GatewayError;
use agent_gateway::catalog::{CatalogSource, HttpCatalogSource, RouteBinding, RouteKind};
use agent_gateway::config::{AuthContext, ToolApiConfig};
use agent_gateway::dispatch::{HttpToolDispatcher, ToolInvoker};
use serde_json::{Map, Value, json};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

fn auth() -> AuthContext {
    AuthContext::new("tool-token", "agent-7", "testnet")
}

fn dispatcher(server: &MockServer) -> HttpToolDispatcher {
    let config = ToolApiConfig::new(server.uri(), format!("{}/openapi.json", server.uri()));
    HttpToolDispatcher::new(reqwest::Client::new(), &config)
}

#[tokio::test]
async fn get_sends_arguments_as_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wallet/balance"))
        .and(query_param("x", "5"))
        .and(header("authorization", "Bearer tool-token"))
        .and(header("openai-gpt-id", "agent-7"))
        .and(header("network", "testnet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"balance": 42})))
        .expect(1)
        .mount(&server)
        .await;

    let route = RouteBinding::new("/wallet/balance", RouteKind::Get);
    let text = dispatcher(&server)
        .invoke(&route, &args(json!({"x": "5"})), &auth())
        .await
        .unwrap();
    assert_eq!(text, r#"{"balance":42}"#);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn post_splits_body_from_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transfer"))
        .and(query_param("x", "5"))
        .and(body_json(json!({"y": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_string("queued"))
        .expect(1)
        .mount(&server)
        .await;

    let route = RouteBinding::new("/transfer", RouteKind::Post);
    let text = dispatcher(&server)
        .invoke(
            &route,
            &args(json!({"requestBody": {"y": 1}, "x": "5"})),
            &auth(),
        )
        .await
        .unwrap();
    assert_eq!(text, "queued");

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].url.query().unwrap_or("").contains("requestBody"));
}

#[tokio::test]
async fn error_status_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wallet/balance"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such wallet"))
        .mount(&server)
        .await;

    let route = RouteBinding::new("/wallet/balance", RouteKind::Get);
    let err = dispatcher(&server)
        .invoke(&route, &Map::new(), &auth())
        .await
        .unwrap_err();
    match err {
        GatewayError::ApiError { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "no such wallet");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unsupported_method_makes_no_request() {
    let server = MockServer::start().await;

    let route = RouteBinding::new("/wallet", RouteKind::from_method("delete"));
    let err = dispatcher(&server)
        .invoke(&route, &Map::new(), &auth())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "HTTP method 'DELETE' is not implemented.");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn catalog_is_fetched_on_every_load() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/openapi.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
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
        })))
        .expect(2)
        .mount(&server)
        .await;

    let source = HttpCatalogSource::new(
        reqwest::Client::new(),
        format!("{}/openapi.json", server.uri()),
    );
    let first = source.load().await.unwrap();
    let second = source.load().await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    let route = first.route("getBalance").unwrap();
    assert_eq!(route.path, "/wallet/balance");
    assert_eq!(route.kind, RouteKind::Get);
}

#[tokio::test]
async fn unreachable_catalog_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/openapi.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = HttpCatalogSource::new(
        reqwest::Client::new(),
        format!("{}/openapi.json", server.uri()),
    );
    assert!(source.load().await.is_err());
}
