//! HTTP client for the network controller API.
//!
//! Every request carries the static API key in the `X-API-KEY` header.
//! List endpoints answer with a `{ "data": [...] }` envelope.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Response, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::DashboardError;
use crate::models::{Client, DataEnvelope, Device, Site};

const API_KEY_HEADER: &str = "X-API-KEY";

/// Async client for the controller's sites, devices and clients endpoints.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: Url,
}

impl UpstreamClient {
    pub fn new(
        base_url: &str,
        api_key: &SecretString,
        timeout: Duration,
    ) -> Result<Self, DashboardError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            DashboardError::Config(format!("invalid upstream URL {base_url:?}: {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DashboardError::Config(format!(
                "upstream URL {base_url} cannot be used as a base"
            )));
        }

        let mut headers = HeaderMap::new();
        let mut key_value = HeaderValue::from_str(api_key.expose_secret())?;
        key_value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key_value);

        let http = reqwest::Client::builder()
            .user_agent(concat!("SitePulse/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { http, base_url })
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get(&self, segments: &[&str]) -> Result<Response, DashboardError> {
        let url = self.endpoint(segments);
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DashboardError::UpstreamStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }
        Ok(resp)
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> Result<Vec<T>, DashboardError> {
        let body = self.get(segments).await?.bytes().await?;
        let envelope: DataEnvelope<T> = serde_json::from_slice(&body)?;
        Ok(envelope.data)
    }

    /// Raw JSON body of an upstream GET, used by the passthrough routes.
    pub async fn get_json(&self, segments: &[&str]) -> Result<Value, DashboardError> {
        let body = self.get(segments).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn list_sites(&self) -> Result<Vec<Site>, DashboardError> {
        self.get_list(&["sites"]).await
    }

    pub async fn list_devices(&self, site_id: &str) -> Result<Vec<Device>, DashboardError> {
        self.get_list(&["sites", site_id, "devices"]).await
    }

    pub async fn list_clients(&self, site_id: &str) -> Result<Vec<Client>, DashboardError> {
        self.get_list(&["sites", site_id, "clients"]).await
    }
}
