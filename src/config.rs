use std::{env, net::SocketAddr, time::Duration};

use tracing::warn;

use crate::errors::{CrudError, CrudResult};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000/api";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

fn normalize_base_url(raw: &str) -> String {
    let base = raw.trim().trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        base.to_string()
    } else {
        format!("http://{base}")
    }
}

/// Whole seconds; anything else is reported and ignored.
fn parse_timeout(raw: Option<String>) -> Option<Duration> {
    let raw = raw?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(err) => {
            warn!(value = %raw, error = %err, "ignoring invalid CRUD_API_TIMEOUT_SECS");
            None
        }
    }
}

/// Client configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            request_timeout: None,
        }
    }

    pub fn from_env() -> Self {
        let base_url =
            env::var("CRUD_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let request_timeout = parse_timeout(env::var("CRUD_API_TIMEOUT_SECS").ok());

        Self {
            base_url: normalize_base_url(&base_url),
            request_timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Settings for the development resource server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub api_token: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> CrudResult<Self> {
        let raw = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into());
        let bind_addr = raw.parse().map_err(|_| {
            CrudError::InvalidConfig(format!("invalid BIND_ADDR {raw:?}, expected host:port"))
        })?;
        let api_token = env::var("CRUD_API_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Ok(Self {
            bind_addr,
            api_token,
        })
    }
}
