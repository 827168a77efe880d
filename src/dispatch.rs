//! Tool dispatch
//!
//! Executes a finalized tool call against the tool-provider API. `GET`
//! routes send every argument as a query parameter; `POST` routes send the
//! reserved `requestBody` argument as the JSON body and the rest as query
//! parameters. Any other method fails immediately without a request.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::catalog::{REQUEST_BODY_KEY, RouteBinding, RouteKind};
use crate::config::{AuthContext, ToolApiConfig};
use crate::error::{GatewayError, Result};

/// Executes tool calls.
///
/// Errors are returned, not swallowed; the orchestrator turns them into
/// tool-result text so the conversation can continue.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(
        &self,
        route: &RouteBinding,
        arguments: &Map<String, Value>,
        auth: &AuthContext,
    ) -> Result<String>;
}

/// [`ToolInvoker`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpToolDispatcher {
    client: reqwest::Client,
    base_url: String,
    identity_header: String,
    network_header: String,
    timeout: Duration,
}

impl HttpToolDispatcher {
    pub fn new(client: reqwest::Client, config: &ToolApiConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            identity_header: config.identity_header.clone(),
            network_header: config.network_header.clone(),
            timeout: config.timeout,
        }
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

/// Query pairs for every argument except the request body.
fn query_pairs(arguments: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(arguments.len());
    for (name, value) in arguments {
        if name == REQUEST_BODY_KEY {
            continue;
        }
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = query_value(item) {
                        pairs.push((name.clone(), text));
                    }
                }
            }
            other => {
                if let Some(text) = query_value(other) {
                    pairs.push((name.clone(), text));
                }
            }
        }
    }
    pairs
}

fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        // numbers, bools and nested structures keep their JSON text
        other => Some(other.to_string()),
    }
}

/// JSON bodies are normalised; anything else is passed through.
fn render_body(text: String) -> String {
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => json.to_string(),
        Err(_) => text,
    }
}

#[async_trait]
impl ToolInvoker for HttpToolDispatcher {
    async fn invoke(
        &self,
        route: &RouteBinding,
        arguments: &Map<String, Value>,
        auth: &AuthContext,
    ) -> Result<String> {
        let url = self.url_for(&route.path);
        let query = query_pairs(arguments);

        let builder = match &route.kind {
            RouteKind::Get => self.client.get(&url).query(&query),
            RouteKind::Post => {
                let builder = self.client.post(&url).query(&query);
                match arguments.get(REQUEST_BODY_KEY) {
                    Some(body) => builder.json(body),
                    None => builder,
                }
            }
            RouteKind::Unsupported(method) => {
                return Err(GatewayError::UnsupportedMethod {
                    method: method.clone(),
                });
            }
        };

        let builder = builder
            .bearer_auth(auth.bearer())
            .header(self.identity_header.as_str(), auth.agent_id.as_str())
            .header(self.network_header.as_str(), auth.network.as_str())
            .timeout(self.timeout);

        tracing::info!(method = route.kind.as_str(), %url, "dispatching tool call");

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), %url, "tool API returned an error");
            return Err(GatewayError::api_error(status.as_u16(), text));
        }

        Ok(render_body(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn query_pairs_skip_body_and_null() {
        let pairs = query_pairs(&args(json!({
            "requestBody": {"y": 1},
            "x": "5",
            "n": 3,
            "flag": true,
            "missing": null,
            "ids": ["a", "b"]
        })));
        assert!(pairs.contains(&("x".into(), "5".into())));
        assert!(pairs.contains(&("n".into(), "3".into())));
        assert!(pairs.contains(&("flag".into(), "true".into())));
        assert!(pairs.contains(&("ids".into(), "a".into())));
        assert!(pairs.contains(&("ids".into(), "b".into())));
        assert_eq!(pairs.len(), 5);
    }

    #[test]
    fn non_json_bodies_pass_through() {
        assert_eq!(render_body("plain text".into()), "plain text");
        assert_eq!(render_body("{ \"a\" : 1 }".into()), r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn unsupported_method_fails_without_request() {
        let dispatcher = HttpToolDispatcher::new(
            reqwest::Client::new(),
            &ToolApiConfig::new("http://127.0.0.1:9", "http://127.0.0.1:9/openapi.json"),
        );
        let err = dispatcher
            .invoke(
                &RouteBinding::new("/x", RouteKind::Unsupported("DELETE".into())),
                &Map::new(),
                &AuthContext::new("t", "a", "n"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP method 'DELETE' is not implemented.");
    }
}
