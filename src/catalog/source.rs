//! Where catalogs come from

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{ToolCatalog, build_catalog};
use crate::error::{GatewayError, Result};

/// Produces the tool catalog for a turn.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load(&self) -> Result<ToolCatalog>;
}

/// Default bound on a single document fetch
pub const DEFAULT_DOCUMENT_TIMEOUT: Duration = Duration::from_secs(100);

/// Fetches the OpenAPI document over HTTP on every load, so catalog changes
/// on the tool provider are picked up by the next turn.
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpCatalogSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            timeout: DEFAULT_DOCUMENT_TIMEOUT,
        }
    }

    /// Bound the whole fetch, body included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_document(&self) -> Result<Value> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::api_error(status.as_u16(), body));
        }
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| GatewayError::InvalidDocument(format!("not valid JSON: {e}")))
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn load(&self) -> Result<ToolCatalog> {
        let document = self.fetch_document().await?;
        build_catalog(&document)
    }
}

/// Catalog built once up front.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalogSource {
    catalog: ToolCatalog,
}

impl StaticCatalogSource {
    pub fn new(catalog: ToolCatalog) -> Self {
        Self { catalog }
    }

    pub fn from_document(document: &Value) -> Result<Self> {
        Ok(Self::new(build_catalog(document)?))
    }
}

#[async_trait]
impl CatalogSource for StaticCatalogSource {
    async fn load(&self) -> Result<ToolCatalog> {
        Ok(self.catalog.clone())
    }
}
