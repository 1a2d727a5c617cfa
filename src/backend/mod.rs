//! Async HTTP adapters for the image-classification backends.
//!
//! Each adapter implements [`Backend`] and returns a [`CanonicalResponse`]
//! whose `scores` are keyed by catalog code, whatever key convention the
//! upstream uses. Missing credentials or endpoints fail when the adapter is
//! built, before any request leaves the process.

pub mod hosted;
pub mod local;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::Config;
use crate::diagnosis::catalog::resolve_key;
use crate::error::AnalysisError;
use crate::models::{BackendKind, CanonicalResponse};
use crate::upload::ImageUpload;

const USER_AGENT: &str = concat!("skinsight/", env!("CARGO_PKG_VERSION"));

/// A classification service that turns an image into a [`CanonicalResponse`].
#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Send one image upstream. Transport failures map to
    /// [`AnalysisError::Backend`].
    async fn analyze(&self, image: &ImageUpload) -> Result<CanonicalResponse, AnalysisError>;
}

/// Build the adapter selected by `config.backend`.
pub fn from_config(config: &Config) -> Result<Box<dyn Backend>, AnalysisError> {
    match config.backend {
        BackendKind::Hosted => Ok(Box::new(hosted::HostedModel::from_config(
            &config.hosted,
            config.timeout(),
        )?)),
        BackendKind::Local => Ok(Box::new(local::LocalClassifier::from_config(
            &config.local,
            config.timeout(),
        )?)),
    }
}

fn http_client(timeout: Duration) -> Result<Client, AnalysisError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| AnalysisError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Re-key an upstream score object by catalog code.
///
/// Keys outside the catalog and non-numeric values are dropped.
fn normalize_scores(raw: &serde_json::Map<String, serde_json::Value>) -> HashMap<String, f64> {
    let mut scores = HashMap::new();
    for (key, value) in raw {
        let Some(code) = resolve_key(key) else {
            tracing::debug!(key = %key, "dropping score for class outside the catalog");
            continue;
        };
        match value.as_f64() {
            Some(p) => {
                scores.insert(code.to_string(), p);
            }
            None => tracing::debug!(key = %key, value = %value, "dropping non-numeric score"),
        }
    }
    scores
}

/// Best human-readable detail from an error response body: `error.message`,
/// then `detail`, then the body itself.
fn error_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return Some(trimmed.to_string());
    };

    if let Some(message) = json
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .filter(|m| !m.trim().is_empty())
    {
        return Some(message.to_string());
    }

    match json.get("detail") {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(serde_json::Value::String(_)) | Some(serde_json::Value::Null) | None => {
            Some(json.to_string())
        }
        Some(other) => Some(other.to_string()),
    }
}

fn http_error(status: reqwest::StatusCode, body: &str) -> String {
    match error_detail(body) {
        Some(detail) => format!("HTTP error! status: {} - {}", status.as_u16(), detail),
        None => format!("HTTP error! status: {}", status.as_u16()),
    }
}
