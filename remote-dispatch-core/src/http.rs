//! HTTP transport backed by reqwest
//!
//! Resolves a descriptor's logical target against a configured host table,
//! performs the call, decodes the JSON body, and lifts the `Link` header's
//! `rel="next"` continuation for paginated resources.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::ApiError;
use crate::executor::{Transport, TransportResponse};
use crate::request::{ApiRequest, Method};

/// Logical api target id → base url.
#[derive(Clone, Debug, Default)]
pub struct ApiHosts {
    hosts: HashMap<String, String>,
}

impl ApiHosts {
    /// An empty host table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target. An empty base means same-origin paths.
    pub fn with(mut self, target: impl Into<String>, base: impl Into<String>) -> Self {
        self.hosts.insert(target.into(), base.into());
        self
    }

    /// Resolve a descriptor's endpoint to a full url.
    ///
    /// Endpoints that are already absolute (pagination continuation urls)
    /// pass through untouched and need no host entry.
    pub fn resolve(&self, request: &ApiRequest) -> Result<String, ApiError> {
        let endpoint = request.endpoint();
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return Ok(endpoint.to_string());
        }
        let base = self
            .hosts
            .get(request.target())
            .ok_or_else(|| ApiError::MissingHost(request.target().to_string()))?;
        if base.is_empty() {
            Ok(format!("/{}", endpoint.trim_start_matches('/')))
        } else {
            Ok(format!(
                "{}/{}",
                base.trim_end_matches('/'),
                endpoint.trim_start_matches('/')
            ))
        }
    }
}

/// Production [`Transport`] over reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    hosts: ApiHosts,
}

impl HttpTransport {
    /// Transport with a fresh client and the given host table.
    pub fn new(hosts: ApiHosts) -> Self {
        Self {
            client: reqwest::Client::new(),
            hosts,
        }
    }

    /// Transport reusing an existing client (connection pools, default
    /// headers configured by the host application).
    pub fn with_client(client: reqwest::Client, hosts: ApiHosts) -> Self {
        Self { client, hosts }
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<TransportResponse, ApiError> {
        let url = self.hosts.resolve(request)?;
        let method = match request.method() {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &url);
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let next_page_url = response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(next_link);

        let json: Value = response
            .json()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))?;

        let mut transport_response = TransportResponse::new(json);
        transport_response.next_page_url = next_page_url;
        Ok(transport_response)
    }
}

/// Extract the `rel="next"` url from a `Link` header value.
///
/// Header form: `<https://host/page?page=3>; rel="next", <...>; rel="last"`.
pub fn next_link(header: &str) -> Option<String> {
    for part in header.split(',') {
        let mut sections = part.split(';');
        let url = sections.next()?.trim();
        let is_next = sections
            .any(|section| section.trim().eq_ignore_ascii_case(r#"rel="next""#));
        if is_next && url.starts_with('<') && url.ends_with('>') {
            return Some(url[1..url.len() - 1].to_string());
        }
    }
    None
}
