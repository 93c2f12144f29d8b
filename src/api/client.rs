use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::fetch::FetchError;
use crate::query::QueryKey;

/// State-changing request methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Post,
    Put,
    Delete,
}

impl std::str::FromStr for Mutation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "POST" => Ok(Mutation::Post),
            "PUT" => Ok(Mutation::Put),
            "DELETE" => Ok(Mutation::Delete),
            other => anyhow::bail!("Unsupported method: {}", other),
        }
    }
}

/// How the dashboard talks to its API
#[async_trait]
pub trait Transport: Send + Sync {
    /// `GET` the resource described by `key`
    async fn get(&self, key: &QueryKey) -> Result<Value, FetchError>;

    /// Send a mutation and return the server's JSON representation
    async fn send(&self, method: Mutation, path: &str, body: Option<Value>) -> Result<Value, FetchError>;
}

/// reqwest-backed transport against the dashboard's REST API
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .user_agent(concat!("leasehold/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn get(&self, key: &QueryKey) -> Result<Value, FetchError> {
        debug!("GET {}", key.request_path());
        let request = self
            .client
            .get(self.url(key.resource_path()))
            .query(&key.query_pairs());

        let response = self.authorize(request).send().await?.error_for_status()?;
        read_json(response).await
    }

    async fn send(&self, method: Mutation, path: &str, body: Option<Value>) -> Result<Value, FetchError> {
        debug!("{:?} {}", method, path);
        let url = self.url(path);
        let mut request = match method {
            Mutation::Post => self.client.post(url),
            Mutation::Put => self.client.put(url),
            Mutation::Delete => self.client.delete(url),
        };
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = self.authorize(request).send().await?.error_for_status()?;
        read_json(response).await
    }
}

/// An empty body (e.g. `204 No Content`) reads as `null`
async fn read_json(response: reqwest::Response) -> Result<Value, FetchError> {
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}
