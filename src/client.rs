use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::config::ClientConfig;
use crate::credentials::{bearer_value, CredentialProvider};
use crate::errors::{CrudError, CrudResult};
use crate::services::{CrudTransport, Method};

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// HTTP client bound to one base URL that attaches the current bearer token
/// to every request.
#[derive(Clone)]
pub struct RequestClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl RequestClient {
    pub fn new(
        config: &ClientConfig,
        credentials: impl CredentialProvider + 'static,
    ) -> CrudResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| CrudError::InvalidConfig(format!("http client init failed: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: Arc::new(credentials),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Builds the outbound request without sending it.
    pub fn build(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> CrudResult<reqwest::Request> {
        let mut req = self.http.request(method.into(), self.url(path));
        if let Some(bearer) = bearer_value(self.credentials.as_ref()) {
            req = req.header(AUTHORIZATION, bearer);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        Ok(req.build()?)
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> CrudResult<Value> {
        let request = self.build(method, path, body)?;
        debug!(%method, url = %request.url(), "sending request");
        let resp = self.http.execute(request).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CrudError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        let bytes = resp.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl CrudTransport for RequestClient {
    async fn get(&self, path: &str) -> CrudResult<Value> {
        self.send(Method::Get, path, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> CrudResult<Value> {
        self.send(Method::Post, path, Some(body)).await
    }

    async fn put(&self, path: &str, body: &Value) -> CrudResult<Value> {
        self.send(Method::Put, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> CrudResult<Value> {
        self.send(Method::Delete, path, None).await
    }
}
