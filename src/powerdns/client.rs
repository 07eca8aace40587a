// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `reqwest` client for the PowerDNS authoritative HTTP API.
//!
//! Endpoints used:
//!
//! - `GET {base}/servers` to discover the server id when none is configured
//! - `GET {base}/servers/{id}/zones/{zone}` to read a zone with its rrsets
//! - `PATCH {base}/servers/{id}/zones/{zone}` to replace or delete rrsets
//!
//! Every request carries the `X-API-Key` header.

use super::retry::{http_backoff, retry_request};
use super::types::{PdnsZone, RRSet, RRSetPatch, ServerInfo};
use super::RecordBackend;
use crate::canonical::canonicalize;
use crate::constants::{PDNS_API_KEY_HEADER, PDNS_CHANGETYPE_DELETE, PDNS_CHANGETYPE_REPLACE};
use crate::errors::PdnsError;
use crate::model::ApiServer;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

/// Build the API base URL, without a trailing slash.
pub(crate) fn build_api_url(api_url: &str) -> String {
    api_url.trim_end_matches('/').to_string()
}

/// Client for one PowerDNS API server.
pub struct PowerDnsClient {
    http: HttpClient,
    name: String,
    base_url: String,
    api_key: String,
    server_id: OnceCell<String>,
    retry: bool,
}

impl PowerDnsClient {
    /// Create a client for `server`, sharing the `http` connection pool.
    ///
    /// When `retry` is set, transient failures are retried with exponential backoff.
    #[must_use]
    pub fn new(server: &ApiServer, http: HttpClient, retry: bool) -> Self {
        let server_id = match &server.server_id {
            Some(id) => OnceCell::new_with(Some(id.clone())),
            None => OnceCell::new(),
        };
        Self {
            http,
            name: server.name.clone(),
            base_url: build_api_url(&server.api_url),
            api_key: server.api_token.clone(),
            server_id,
            retry,
        }
    }

    /// PowerDNS server id, discovered once from `/servers` if not configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the server list cannot be fetched or is empty.
    pub async fn server_id(&self) -> Result<&str, PdnsError> {
        self.server_id
            .get_or_try_init(move || async move {
                let url = format!("{}/servers", self.base_url);
                let servers: Vec<ServerInfo> = self.get_json(&url).await?;
                let id = servers
                    .into_iter()
                    .next()
                    .map(|s| s.id)
                    .ok_or_else(|| PdnsError::NoServerId {
                        url: self.base_url.clone(),
                    })?;
                debug!(server = %self.name, server_id = %id, "Discovered PowerDNS server id");
                Ok(id)
            })
            .await
            .map(String::as_str)
    }

    async fn zone_url(&self, zone: &str) -> Result<String, PdnsError> {
        let server_id = self.server_id().await?;
        Ok(format!(
            "{}/servers/{server_id}/zones/{}",
            self.base_url,
            canonicalize(zone)
        ))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, PdnsError> {
        let text = self.request(Method::GET, url, None).await?;
        serde_json::from_str(&text).map_err(|e| PdnsError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn patch(&self, zone: &str, rrset: RRSet) -> Result<(), PdnsError> {
        let url = self.zone_url(zone).await?;
        let body = RRSetPatch {
            rrsets: vec![rrset],
        };
        self.request(Method::PATCH, &url, Some(&body)).await?;
        Ok(())
    }

    /// Send a request, retrying transient failures when enabled.
    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&RRSetPatch>,
    ) -> Result<String, PdnsError> {
        if self.retry {
            let method_name = method.to_string();
            retry_request(http_backoff(), &method_name, url, move || {
                self.request_once(method.clone(), url, body)
            })
            .await
        } else {
            self.request_once(method, url, body).await
        }
    }

    async fn request_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&RRSetPatch>,
    ) -> Result<String, PdnsError> {
        debug!(
            server = %self.name,
            method = %method,
            url = %url,
            body = ?body,
            "HTTP API request to PowerDNS"
        );

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(PDNS_API_KEY_HEADER, &self.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| PdnsError::Connection {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| PdnsError::Connection {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            if !matches!(status, StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY) {
                error!(
                    server = %self.name,
                    method = %method,
                    url = %url,
                    status = %status,
                    error = %text,
                    "HTTP API request failed"
                );
            }
            return Err(PdnsError::Http {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        debug!(
            server = %self.name,
            method = %method,
            url = %url,
            status = %status,
            response_len = text.len(),
            "HTTP API request successful"
        );
        Ok(text)
    }
}

#[async_trait]
impl RecordBackend for PowerDnsClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_zone(&self, zone: &str) -> Result<Option<PdnsZone>, PdnsError> {
        let url = self.zone_url(zone).await?;
        match self.get_json::<PdnsZone>(&url).await {
            Ok(zone) => Ok(Some(zone)),
            Err(PdnsError::Http { status, .. })
                if status == StatusCode::NOT_FOUND.as_u16()
                    || status == StatusCode::UNPROCESSABLE_ENTITY.as_u16() =>
            {
                debug!(server = %self.name, zone = %zone, status, "Zone not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_rrset(&self, zone: &str, mut rrset: RRSet) -> Result<(), PdnsError> {
        rrset.changetype = Some(PDNS_CHANGETYPE_REPLACE.to_string());
        info!(
            server = %self.name,
            zone = %zone,
            name = %rrset.name,
            rtype = %rrset.rtype,
            "Replacing rrset"
        );
        self.patch(zone, rrset).await
    }

    async fn delete_rrset(&self, zone: &str, mut rrset: RRSet) -> Result<(), PdnsError> {
        rrset.changetype = Some(PDNS_CHANGETYPE_DELETE.to_string());
        rrset.records.clear();
        rrset.comments.clear();
        info!(
            server = %self.name,
            zone = %zone,
            name = %rrset.name,
            rtype = %rrset.rtype,
            "Deleting rrset"
        );
        self.patch(zone, rrset).await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
