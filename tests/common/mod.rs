// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common test utilities for integration tests
//!
//! A `wiremock` server stands in for a PowerDNS authoritative API, and the
//! configuration and inventory fixtures are written to a temporary directory
//! and loaded the same way the binary loads them.

#![allow(dead_code)]

use pdnsync::config::Config;
use pdnsync::inventory::MemoryInventory;
use pdnsync::powerdns::HttpBackendFactory;
use pdnsync::reconcilers::Reconciler;
use pdnsync::runner::LocalJobRunner;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// API key every fixture server is configured with
pub const API_KEY: &str = "integration-secret";

/// Two addresses with DNS names and the primary address of an access switch.
pub const INVENTORY: &str = r"
addresses:
  - id: 1
    address: 10.1.2.3/24
    dnsName: web.corp.example.com
  - id: 2
    address: 10.1.2.4/24
    attachment:
      kind: interface
      interface: { id: 20, name: 'GigabitEthernet0/1' }
      host: { id: 200, kind: device, name: sw1, deviceRole: access, primaryIp4: 10.1.2.4 }
  - id: 3
    address: 192.0.2.10/24
    dnsName: db.corp.example.com
";

/// Configuration with a forward zone and a reverse zone on one API server.
pub fn config_yaml(api_url: &str) -> String {
    format!(
        r"
apiServers:
  - name: pdns1
    apiUrl: {api_url}/api/v1
    apiToken: {API_KEY}
zones:
  - name: corp.example.com.
    defaultTtl: 600
    apiServers: [pdns1]
    matchers:
      deviceRoles: [access]
    naming:
      ip: dnsName
      device: byInterfaceExceptPrimary
  - name: 10.in-addr.arpa.
    apiServers: [pdns1]
inventory:
  path: inventory.yaml
workers: 2
"
    )
}

/// A configured engine and the directory its fixtures live in.
pub struct Harness {
    pub dir: TempDir,
    pub config: Config,
    pub runner: LocalJobRunner,
}

/// Write the fixtures and wire a runner the way the binary does.
pub fn harness(config_text: &str, inventory_text: &str) -> Harness {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("pdnsync.yaml"), config_text).expect("write config");
    std::fs::write(dir.path().join("inventory.yaml"), inventory_text).expect("write inventory");

    let config = Config::load(&dir.path().join("pdnsync.yaml")).expect("config loads");
    let registry = config.build_registry().expect("registry builds");
    let inventory = MemoryInventory::load(&config.inventory_path().expect("inventory path"))
        .expect("inventory loads");
    let backends =
        HttpBackendFactory::new(Duration::from_secs(5), false).expect("http client builds");
    let reconciler = Reconciler::new(
        Arc::new(inventory),
        Arc::new(registry),
        Arc::new(backends),
        config.settings.clone(),
    );
    let runner = LocalJobRunner::with_retention(
        Arc::new(reconciler),
        config.workers,
        config.job_retention.clone(),
    );

    Harness {
        dir,
        config,
        runner,
    }
}

/// Start a PowerDNS API mock serving `zones`, each with its rrsets.
///
/// Unknown zones answer 404 and every PATCH succeeds with 204.
pub async fn start_pdns(zones: &[(&str, Value)]) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/servers"))
        .and(header("X-API-Key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "localhost", "daemon_type": "authoritative", "version": "4.9.0"}
        ])))
        .mount(&server)
        .await;

    for (zone, rrsets) in zones {
        Mock::given(method("GET"))
            .and(path(format!("/api/v1/servers/localhost/zones/{zone}")))
            .and(header("X-API-Key", API_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": zone,
                "name": zone,
                "rrsets": rrsets,
            })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(format!("/api/v1/servers/localhost/zones/{zone}")))
            .and(header("X-API-Key", API_KEY))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Not Found"})))
        .with_priority(u8::MAX)
        .mount(&server)
        .await;

    server
}

/// A managed rrset as PowerDNS returns it.
pub fn managed_rrset(name: &str, rtype: &str, ttl: u32, content: &str) -> Value {
    json!({
        "name": name,
        "type": rtype,
        "ttl": ttl,
        "records": [{"content": content, "disabled": false}],
        "comments": [{"content": "pdnsync", "account": ""}],
    })
}

/// An rrset without the managed comment.
pub fn foreign_rrset(name: &str, rtype: &str, ttl: u32, content: &str) -> Value {
    json!({
        "name": name,
        "type": rtype,
        "ttl": ttl,
        "records": [{"content": content, "disabled": false}],
        "comments": [],
    })
}

/// `(zone, changetype, name, type, contents)` of every PATCH received, in order.
pub async fn patches(server: &MockServer) -> Vec<(String, String, String, String, Vec<String>)> {
    let requests = server.received_requests().await.unwrap_or_default();
    let mut out = Vec::new();
    for request in requests {
        if request.method.as_str() != "PATCH" {
            continue;
        }
        let zone = request
            .url
            .path()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let body: Value = serde_json::from_slice(&request.body).expect("PATCH body is JSON");
        for rrset in body["rrsets"].as_array().cloned().unwrap_or_default() {
            out.push((
                zone.clone(),
                rrset["changetype"].as_str().unwrap_or_default().to_string(),
                rrset["name"].as_str().unwrap_or_default().to_string(),
                rrset["type"].as_str().unwrap_or_default().to_string(),
                rrset["records"]
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(|r| r["content"].as_str().map(ToString::to_string))
                    .collect(),
            ));
        }
    }
    out
}
