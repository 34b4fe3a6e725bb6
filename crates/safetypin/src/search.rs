//! Client for the HTTP query builder search service.
//!
//! The service answers `GET <host><endpoint>?k=v&...` with
//! `{"hits": [{"path": "..."}, ...]}`. Every failure (transport, status,
//! body) is an [`Error::QueryBuilder`] naming the query that caused it.

use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use safetypin_core::JcrConfig;

use crate::error::{Error, Result};
use crate::jcr::Jcr;
use crate::node::Node;

#[derive(Deserialize)]
struct SearchResponse {
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    path: String,
}

/// Search service client bound to one host and login.
pub struct QueryBuilder {
    client: Client,
    endpoint: Url,
    username: String,
    password: String,
}

impl QueryBuilder {
    pub fn new(config: &JcrConfig) -> Result<Self> {
        let mut endpoint = Url::parse(&config.hostname).map_err(|e| {
            Error::InvalidArgument(format!("invalid hostname {:?}: {e}", config.hostname))
        })?;
        endpoint.set_path(&config.search_endpoint);
        let client = Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| Error::QueryBuilder(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Endpoint URL with the credentials embedded.
    pub fn url(&self) -> String {
        let mut url = self.endpoint.clone();
        // Only fails for cannot-be-a-base URLs, which `new` never produces.
        let _ = url.set_username(&self.username);
        let _ = url.set_password(Some(&self.password));
        url.to_string()
    }

    /// Run a search and return the hit paths in service order.
    pub async fn fetch_paths<I, K, V>(&self, params: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let params: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let query_string = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let response = self
            .client
            .get(self.endpoint.clone())
            .basic_auth(&self.username, Some(&self.password))
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                Error::QueryBuilder(format!("request failed for query {query_string:?}: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::QueryBuilder(format!(
                "returned error status {} for query {query_string:?}",
                status.as_u16()
            )));
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            Error::QueryBuilder(format!("invalid response for query {query_string:?}: {e}"))
        })?;
        debug!(query = %query_string, hits = body.hits.len(), "Search returned");
        Ok(body.hits.into_iter().map(|hit| hit.path).collect())
    }

    /// Run a search and resolve each hit to a node. Hits that no longer
    /// resolve are dropped.
    pub async fn execute<I, K, V>(&self, jcr: &Jcr, params: I) -> Result<Vec<Node>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut nodes = Vec::new();
        for path in self.fetch_paths(params).await? {
            match Node::find(jcr, &path).await {
                Ok(Some(node)) => nodes.push(node),
                Ok(None) => warn!(path = %path, "Search hit no longer exists, skipping"),
                Err(Error::InvalidPath(_)) => warn!(path = %path, "Search hit is not a node path, skipping"),
                Err(e) => return Err(e),
            }
        }
        Ok(nodes)
    }
}
