// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! PowerDNS wire layer.
//!
//! The reconciliation engine only talks to [`RecordBackend`]; backends are
//! obtained per API server from a [`BackendFactory`]. [`HttpBackendFactory`]
//! hands out [`client::PowerDnsClient`]s that share one connection pool and
//! remember each server's discovered server id.

pub mod client;
pub mod retry;
pub mod types;

use crate::errors::PdnsError;
use crate::model::ApiServer;
use async_trait::async_trait;
use client::PowerDnsClient;
use reqwest::Client as HttpClient;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use types::{PdnsZone, RRSet};

/// Zone reads and rrset writes against one authoritative server.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// API server name, for logs and job output.
    fn name(&self) -> &str;

    /// Fetch a zone with its rrsets; `None` if the server does not have it.
    async fn get_zone(&self, zone: &str) -> Result<Option<PdnsZone>, PdnsError>;

    /// Create (replace) an rrset in `zone`.
    async fn create_rrset(&self, zone: &str, rrset: RRSet) -> Result<(), PdnsError>;

    /// Delete an rrset from `zone`.
    async fn delete_rrset(&self, zone: &str, rrset: RRSet) -> Result<(), PdnsError>;
}

/// Builds the backend for an API server.
pub trait BackendFactory: Send + Sync {
    /// Backend for `server`.
    ///
    /// # Errors
    ///
    /// Returns an error if no backend can be built for the server.
    fn backend(&self, server: &ApiServer) -> Result<Arc<dyn RecordBackend>, PdnsError>;
}

/// Factory for HTTP clients, one per API server, kept for the process lifetime.
pub struct HttpBackendFactory {
    http: HttpClient,
    retry: bool,
    clients: Mutex<HashMap<String, Arc<PowerDnsClient>>>,
}

impl HttpBackendFactory {
    /// Create a factory whose clients time out after `timeout` and optionally
    /// retry transient failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration, retry: bool) -> anyhow::Result<Self> {
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, retry))
    }

    /// Create a factory sharing an existing HTTP client.
    #[must_use]
    pub fn with_client(http: HttpClient, retry: bool) -> Self {
        Self {
            http,
            retry,
            clients: Mutex::new(HashMap::new()),
        }
    }
}

impl BackendFactory for HttpBackendFactory {
    fn backend(&self, server: &ApiServer) -> Result<Arc<dyn RecordBackend>, PdnsError> {
        url::Url::parse(&server.api_url).map_err(|e| PdnsError::InvalidUrl {
            url: server.api_url.clone(),
            reason: e.to_string(),
        })?;

        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let client = clients
            .entry(server.name.clone())
            .or_insert_with(|| Arc::new(PowerDnsClient::new(server, self.http.clone(), self.retry)))
            .clone();
        Ok(client)
    }
}
