//! Gateway configuration
//!
//! Configuration is assembled with builder-style setters or read from the
//! process environment with [`GatewayConfig::from_env`].
//!
//! ```rust,no_run
//! use agent_gateway::config::{AuthContext, GatewayConfig, ModelConfig, ToolApiConfig};
//!
//! let config = GatewayConfig::new(
//!     ModelConfig::new("sk-...").with_model("gpt-4o"),
//!     ToolApiConfig::new("https://api.example.com", "https://api.example.com/openapi.json"),
//!     AuthContext::new("token", "agent-1", "testnet"),
//! )
//! .with_max_steps(6);
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::{GatewayError, Result};
use crate::orchestrator::{CatalogFallback, OrchestratorOptions, UnknownToolPolicy};
use crate::retry::RetryPolicy;
use crate::session::SessionOptions;

/// Default model endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default model name
pub const DEFAULT_MODEL: &str = "gpt-4o";
/// Default Azure OpenAI api-version
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-06-01";
/// Header carrying the agent identity on tool API requests
pub const DEFAULT_IDENTITY_HEADER: &str = "openai-gpt-id";
/// Header selecting the target network on tool API requests
pub const DEFAULT_NETWORK_HEADER: &str = "network";
/// Default listen address of the HTTP front-end
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2000,
            frequency_penalty: 0.1,
            presence_penalty: 0.0,
        }
    }
}

/// Which URL layout and auth header the completion endpoint uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelApiFlavor {
    /// `{base_url}/chat/completions` with `Authorization: Bearer`
    OpenAi,
    /// `{base_url}/openai/deployments/{deployment}/chat/completions?api-version=..` with `api-key`
    Azure {
        deployment: String,
        api_version: String,
    },
}

/// Completion endpoint configuration
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub flavor: ModelApiFlavor,
    pub params: GenerationParams,
    pub retry: RetryPolicy,
    /// Per-request timeout covering connect and response headers
    pub timeout: Duration,
}

impl ModelConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            flavor: ModelApiFlavor::OpenAi,
            params: GenerationParams::default(),
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_azure_deployment(
        mut self,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        self.flavor = ModelApiFlavor::Azure {
            deployment: deployment.into(),
            api_version: api_version.into(),
        };
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of the chat-completions endpoint.
    pub fn completions_url(&self) -> String {
        match &self.flavor {
            ModelApiFlavor::OpenAi => format!("{}/chat/completions", self.base_url),
            ModelApiFlavor::Azure {
                deployment,
                api_version,
            } => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.base_url, deployment, api_version
            ),
        }
    }
}

/// Tool-provider API configuration
#[derive(Debug, Clone)]
pub struct ToolApiConfig {
    /// Base URL that route paths are appended to
    pub base_url: String,
    /// Where the OpenAPI document is fetched from
    pub openapi_url: String,
    pub identity_header: String,
    pub network_header: String,
    pub timeout: Duration,
}

impl ToolApiConfig {
    pub fn new(base_url: impl Into<String>, openapi_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            openapi_url: openapi_url.into(),
            identity_header: DEFAULT_IDENTITY_HEADER.to_string(),
            network_header: DEFAULT_NETWORK_HEADER.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_headers(
        mut self,
        identity_header: impl Into<String>,
        network_header: impl Into<String>,
    ) -> Self {
        self.identity_header = identity_header.into();
        self.network_header = network_header.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Credentials forwarded verbatim on every tool API request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub bearer_token: SecretString,
    /// Value of the identity header
    pub agent_id: String,
    /// Value of the network-selector header
    pub network: String,
}

impl AuthContext {
    pub fn new(
        bearer_token: impl Into<String>,
        agent_id: impl Into<String>,
        network: impl Into<String>,
    ) -> Self {
        Self {
            bearer_token: SecretString::from(bearer_token.into()),
            agent_id: agent_id.into(),
            network: network.into(),
        }
    }

    pub fn bearer(&self) -> &str {
        self.bearer_token.expose_secret()
    }
}

/// Top-level gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub model: ModelConfig,
    pub tools: ToolApiConfig,
    pub auth: AuthContext,
    pub orchestrator: OrchestratorOptions,
    pub session: SessionOptions,
    pub listen_addr: SocketAddr,
}

impl GatewayConfig {
    pub fn new(model: ModelConfig, tools: ToolApiConfig, auth: AuthContext) -> Self {
        Self {
            model,
            tools,
            auth,
            orchestrator: OrchestratorOptions::default(),
            session: SessionOptions::default(),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.orchestrator.max_steps = max_steps;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.session.system_prompt = prompt.into();
        self
    }

    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    /// Load configuration from `GATEWAY_*` environment variables.
    ///
    /// Required: `GATEWAY_MODEL_API_KEY`, `GATEWAY_OPENAPI_URL`,
    /// `GATEWAY_TOOL_API_BASE_URL`, `GATEWAY_TOOL_API_TOKEN`,
    /// `GATEWAY_TOOL_AGENT_ID`, `GATEWAY_TOOL_NETWORK`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| GatewayError::ConfigurationError(format!("{key} is not set")))
        };

        let mut model = ModelConfig::new(required("GATEWAY_MODEL_API_KEY")?);
        if let Some(base_url) = lookup("GATEWAY_MODEL_BASE_URL") {
            model = model.with_base_url(base_url);
        }
        if let Some(name) = lookup("GATEWAY_MODEL") {
            model = model.with_model(name);
        }
        if let Some(deployment) = lookup("GATEWAY_MODEL_AZURE_DEPLOYMENT") {
            let api_version = lookup("GATEWAY_MODEL_AZURE_API_VERSION")
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string());
            model = model.with_azure_deployment(deployment, api_version);
        }

        let tools = ToolApiConfig::new(
            required("GATEWAY_TOOL_API_BASE_URL")?,
            required("GATEWAY_OPENAPI_URL")?,
        );
        let auth = AuthContext::new(
            required("GATEWAY_TOOL_API_TOKEN")?,
            required("GATEWAY_TOOL_AGENT_ID")?,
            required("GATEWAY_TOOL_NETWORK")?,
        );

        let mut config = Self::new(model, tools, auth);

        if let Some(prompt) = lookup("GATEWAY_SYSTEM_PROMPT") {
            config = config.with_system_prompt(prompt);
        }
        if let Some(steps) = lookup("GATEWAY_MAX_STEPS") {
            let steps = steps.parse::<usize>().map_err(|e| {
                GatewayError::ConfigurationError(format!("GATEWAY_MAX_STEPS: {e}"))
            })?;
            config = config.with_max_steps(steps);
        }
        if let Some(policy) = lookup("GATEWAY_UNKNOWN_TOOL_POLICY") {
            config.orchestrator.unknown_tool = match policy.to_lowercase().as_str() {
                "skip" => UnknownToolPolicy::Skip,
                "error" => UnknownToolPolicy::ReportError,
                other => {
                    return Err(GatewayError::ConfigurationError(format!(
                        "GATEWAY_UNKNOWN_TOOL_POLICY: expected skip or error, got {other}"
                    )));
                }
            };
        }
        if let Some(fallback) = lookup("GATEWAY_CATALOG_FALLBACK") {
            config.orchestrator.catalog_fallback = match fallback.to_lowercase().as_str() {
                "no-tools" => CatalogFallback::NoTools,
                "fail" => CatalogFallback::FailTurn,
                other => {
                    return Err(GatewayError::ConfigurationError(format!(
                        "GATEWAY_CATALOG_FALLBACK: expected no-tools or fail, got {other}"
                    )));
                }
            };
        }
        let addr = lookup("GATEWAY_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.into());
        config.listen_addr = addr.parse().map_err(|e| {
            GatewayError::ConfigurationError(format!("GATEWAY_LISTEN_ADDR '{addr}': {e}"))
        })?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("GATEWAY_MODEL_API_KEY", "sk-test"),
            ("GATEWAY_OPENAPI_URL", "https://tools.example/openapi.json"),
            ("GATEWAY_TOOL_API_BASE_URL", "https://tools.example/api/"),
            ("GATEWAY_TOOL_API_TOKEN", "tok"),
            ("GATEWAY_TOOL_AGENT_ID", "agent-7"),
            ("GATEWAY_TOOL_NETWORK", "testnet"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<GatewayConfig> {
        GatewayConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn loads_defaults_from_minimal_env() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.model.model, DEFAULT_MODEL);
        assert_eq!(
            config.model.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(config.tools.base_url, "https://tools.example/api");
        assert_eq!(config.auth.bearer(), "tok");
        assert_eq!(config.orchestrator.max_steps, 8);
        assert_eq!(config.model.params, GenerationParams::default());
        assert_eq!(config.listen_addr.port(), 8080);
    }

    #[test]
    fn missing_required_key_is_reported() {
        let mut env = base_env();
        env.remove("GATEWAY_TOOL_NETWORK");
        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("GATEWAY_TOOL_NETWORK"));
    }

    #[test]
    fn azure_flavor_builds_deployment_url() {
        let mut env = base_env();
        env.insert("GATEWAY_MODEL_BASE_URL", "https://res.openai.azure.com/");
        env.insert("GATEWAY_MODEL_AZURE_DEPLOYMENT", "gpt4o");
        let config = load(&env).unwrap();
        assert_eq!(
            config.model.completions_url(),
            "https://res.openai.azure.com/openai/deployments/gpt4o/chat/completions?api-version=2024-06-01"
        );
    }

    #[test]
    fn policies_parse_from_env() {
        let mut env = base_env();
        env.insert("GATEWAY_UNKNOWN_TOOL_POLICY", "error");
        env.insert("GATEWAY_CATALOG_FALLBACK", "fail");
        env.insert("GATEWAY_MAX_STEPS", "3");
        let config = load(&env).unwrap();
        assert_eq!(
            config.orchestrator.unknown_tool,
            UnknownToolPolicy::ReportError
        );
        assert_eq!(
            config.orchestrator.catalog_fallback,
            CatalogFallback::FailTurn
        );
        assert_eq!(config.orchestrator.max_steps, 3);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = load(&base_env()).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-test"));
        assert!(!rendered.contains("\"tok\""));
    }
}
