//! Elasticsearch index store
//!
//! Documents are written to `http://<addr>/<index>/<type>` with `POST`, or
//! to `http://<addr>/<index>/<type>/<id>` with `PUT` when a fixed id is
//! configured. Submitting the same document twice produces a duplicate
//! (auto ids) or an overwrite (fixed id), never an error.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, error, trace};

use crate::config::{ElasticsearchConfig, IdPolicy};
use crate::error::{BotbotError, Result};
use crate::storage::IndexStore;

/// HTTP client for one Elasticsearch index
#[derive(Debug, Clone)]
pub struct Elasticsearch {
    client: reqwest::Client,
    url: String,
    method: Method,
}

impl Elasticsearch {
    /// Build a client from configuration.
    ///
    /// `addr` may be `host:port` or a full `http(s)://` base URL.
    ///
    /// # Errors
    ///
    /// Returns `BotbotError::Startup` if the HTTP client cannot be built.
    ///
    /// # Examples
    ///
    /// ```
    /// use botbot_plugins::config::ElasticsearchConfig;
    /// use botbot_plugins::storage::Elasticsearch;
    ///
    /// let es = Elasticsearch::new(&ElasticsearchConfig::default()).unwrap();
    /// assert_eq!(es.url(), "http://localhost:9200/botbot/line");
    /// ```
    pub fn new(config: &ElasticsearchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BotbotError::Startup(format!("Failed to build HTTP client: {}", e)))?;

        let base = if config.addr.starts_with("http://") || config.addr.starts_with("https://") {
            config.addr.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", config.addr)
        };

        let (url, method) = match config.id_policy {
            IdPolicy::Auto => (
                format!("{}/{}/{}", base, config.index, config.doc_type),
                Method::POST,
            ),
            IdPolicy::Fixed => (
                format!(
                    "{}/{}/{}/{}",
                    base, config.index, config.doc_type, config.fixed_id
                ),
                Method::PUT,
            ),
        };

        Ok(Self {
            client,
            url,
            method,
        })
    }

    /// URL documents are sent to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// HTTP method used for submissions
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Serialize `document` to JSON and submit it.
    ///
    /// # Errors
    ///
    /// Returns `BotbotError::Serialization` if the value cannot be encoded,
    /// otherwise the same errors as [`IndexStore::submit`].
    pub async fn index<T: Serialize + ?Sized>(&self, document: &T) -> Result<Bytes> {
        let body = serde_json::to_vec(document).map_err(|e| {
            error!("Failed to serialize document: {}", e);
            BotbotError::Serialization(e)
        })?;
        self.submit(Bytes::from(body)).await
    }
}

#[async_trait::async_trait]
impl IndexStore for Elasticsearch {
    async fn submit(&self, document: Bytes) -> Result<Bytes> {
        trace!(url = %self.url, method = %self.method, "Submitting document to elasticsearch");
        debug!(json = %String::from_utf8_lossy(&document), "Document body");

        let response = self
            .client
            .request(self.method.clone(), &self.url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .body(document)
            .send()
            .await
            .map_err(|e| {
                BotbotError::Storage(format!("Request to elasticsearch failed: {}", e))
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            BotbotError::Storage(format!("Failed to read elasticsearch response: {}", e))
        })?;

        if !status.is_success() {
            return Err(BotbotError::Storage(format!(
                "elasticsearch returned error {}: {}",
                status,
                String::from_utf8_lossy(&body)
            ))
            .into());
        }

        debug!(response = %String::from_utf8_lossy(&body), "Response from elasticsearch");
        Ok(body)
    }
}
