//! HTTP request/response contracts of the backend (version, snapshot,
//! alert config and alert history).

use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use url::Url;

use crate::types::{AlertConfig, AlertHistory, MetricSample, VersionInfo};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid backend url: {0}")]
    Url(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("backend rejected the request: {0}")]
    Rejected(String),
}

/// `POST /api/alerts/config` body. The backend only decodes the
/// `*_treshold` spelling, so the update never goes out with the read-side keys.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlertConfigBody {
    pub cpu_treshold: f64,
    pub ram_treshold: f64,
    pub disk_treshold: f64,
    pub enabled: bool,
}

impl From<&AlertConfig> for AlertConfigBody {
    fn from(c: &AlertConfig) -> Self {
        Self {
            cpu_treshold: c.cpu_threshold,
            ram_treshold: c.ram_threshold,
            disk_treshold: c.disk_threshold,
            enabled: c.enabled,
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: Url) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { base, http })
    }

    /// `ws://host:port/ws` -> `http://host:port/`, `wss` -> `https`.
    pub fn base_from_ws_url(ws_url: &str) -> Result<Url, ApiError> {
        let mut u = Url::parse(ws_url).map_err(|e| ApiError::Url(format!("{ws_url}: {e}")))?;
        let scheme = match u.scheme() {
            "ws" | "http" => "http",
            "wss" | "https" => "https",
            other => return Err(ApiError::Url(format!("unsupported scheme '{other}'"))),
        };
        u.set_scheme(scheme)
            .map_err(|_| ApiError::Url(format!("cannot rewrite scheme of {ws_url}")))?;
        u.set_path("/");
        u.set_query(None);
        u.set_fragment(None);
        Ok(u)
    }

    pub fn from_ws_url(ws_url: &str) -> Result<Self, ApiError> {
        Self::new(Self::base_from_ws_url(ws_url)?)
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Url(format!("{path}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp.json::<T>().await?)
    }

    async fn post_expect_ok<B: Serialize>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(path)?;
        let mut req = self.http.post(url);
        if let Some(b) = body {
            req = req.json(b);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }
        // Acknowledgement body: {"status": "..."} or {"error": "..."}
        let ack: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
        if let Some(err) = ack.get("error").and_then(|v| v.as_str()) {
            return Err(ApiError::Rejected(err.to_string()));
        }
        Ok(())
    }

    pub async fn fetch_version(&self) -> Result<VersionInfo, ApiError> {
        self.get_json("api/version").await
    }

    pub async fn fetch_metrics(&self) -> Result<MetricSample, ApiError> {
        self.get_json("api/metrics").await
    }

    pub async fn fetch_alert_config(&self) -> Result<AlertConfig, ApiError> {
        self.get_json("api/alerts/config").await
    }

    pub async fn update_alert_config(&self, cfg: &AlertConfig) -> Result<(), ApiError> {
        self.post_expect_ok("api/alerts/config", Some(&AlertConfigBody::from(cfg)))
            .await
    }

    pub async fn fetch_alert_history(&self) -> Result<AlertHistory, ApiError> {
        self.get_json("api/alerts/history").await
    }

    pub async fn clear_alert_history(&self) -> Result<(), ApiError> {
        self.post_expect_ok::<()>("api/alerts/clear", None).await
    }
}
