// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `client.rs`

use super::*;
use crate::powerdns::types::{Comment, RecordContent};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn server(uri: &str, server_id: Option<&str>) -> ApiServer {
    let mut server = ApiServer::new("pdns1", format!("{uri}/api/v1/"), "secret");
    server.server_id = server_id.map(ToString::to_string);
    server
}

fn client(uri: &str, server_id: Option<&str>) -> PowerDnsClient {
    PowerDnsClient::new(&server(uri, server_id), HttpClient::new(), false)
}

fn a_rrset() -> RRSet {
    RRSet {
        name: "host1.corp.example.com.".to_string(),
        rtype: "A".to_string(),
        ttl: 600,
        changetype: None,
        records: vec![RecordContent {
            content: "10.0.0.5".to_string(),
            disabled: false,
        }],
        comments: vec![Comment::new("pdnsync")],
    }
}

#[test]
fn test_build_api_url_trims_slash() {
    assert_eq!(
        build_api_url("http://pdns:8081/api/v1/"),
        "http://pdns:8081/api/v1"
    );
    assert_eq!(build_api_url("http://pdns:8081/api/v1"), "http://pdns:8081/api/v1");
}

#[tokio::test]
async fn test_server_id_is_discovered_once() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/servers"))
        .and(header("X-API-Key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "localhost", "daemon_type": "authoritative", "version": "4.9.0"}
        ])))
        .expect(1)
        .mount(&mock)
        .await;

    let client = client(&mock.uri(), None);
    assert_eq!(client.server_id().await.unwrap(), "localhost");
    assert_eq!(client.server_id().await.unwrap(), "localhost");
}

#[tokio::test]
async fn test_empty_server_list() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/servers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock)
        .await;

    let err = client(&mock.uri(), None).server_id().await.unwrap_err();
    assert!(matches!(err, PdnsError::NoServerId { .. }));
}

#[tokio::test]
async fn test_get_zone_parses_rrsets() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/servers/localhost/zones/corp.example.com."))
        .and(header("X-API-Key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "corp.example.com.",
            "name": "corp.example.com.",
            "kind": "Native",
            "rrsets": [{
                "name": "host1.corp.example.com.",
                "type": "A",
                "ttl": 600,
                "records": [{"content": "10.0.0.5", "disabled": false}],
                "comments": [{"content": "pdnsync", "account": "", "modified_at": 0}]
            }]
        })))
        .mount(&mock)
        .await;

    let zone = client(&mock.uri(), Some("localhost"))
        .get_zone("corp.example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(zone.name, "corp.example.com.");
    assert_eq!(zone.rrsets.len(), 1);
    assert_eq!(zone.rrsets[0].records[0].content, "10.0.0.5");
    assert_eq!(zone.rrsets[0].comments[0].content, "pdnsync");
}

#[tokio::test]
async fn test_get_zone_missing() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/servers/localhost/zones/missing.example.com."))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Not Found"})))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/servers/localhost/zones/other.example.com."))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"error": "Could not find domain"})),
        )
        .mount(&mock)
        .await;

    let client = client(&mock.uri(), Some("localhost"));
    assert!(client.get_zone("missing.example.com.").await.unwrap().is_none());
    assert!(client.get_zone("other.example.com.").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_zone_server_error() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/servers/localhost/zones/corp.example.com."))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock)
        .await;

    let err = client(&mock.uri(), Some("localhost"))
        .get_zone("corp.example.com.")
        .await
        .unwrap_err();
    assert!(matches!(err, PdnsError::Http { status: 500, ref body, .. } if body == "boom"));
}

#[tokio::test]
async fn test_create_rrset_sends_replace() {
    let mock = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/servers/localhost/zones/corp.example.com."))
        .and(header("X-API-Key", "secret"))
        .and(body_json(json!({
            "rrsets": [{
                "name": "host1.corp.example.com.",
                "type": "A",
                "ttl": 600,
                "changetype": "REPLACE",
                "records": [{"content": "10.0.0.5", "disabled": false}],
                "comments": [{"content": "pdnsync", "account": ""}]
            }]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock)
        .await;

    client(&mock.uri(), Some("localhost"))
        .create_rrset("corp.example.com.", a_rrset())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_rrset_sends_delete() {
    let mock = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/servers/localhost/zones/corp.example.com."))
        .and(body_json(json!({
            "rrsets": [{
                "name": "host1.corp.example.com.",
                "type": "A",
                "ttl": 600,
                "changetype": "DELETE",
                "records": [],
                "comments": []
            }]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock)
        .await;

    client(&mock.uri(), Some("localhost"))
        .delete_rrset("corp.example.com.", a_rrset())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_connection_error() {
    let client = client("http://127.0.0.1:1", Some("localhost"));
    let err = client.get_zone("corp.example.com.").await.unwrap_err();
    assert!(matches!(err, PdnsError::Connection { .. }));
}

#[tokio::test]
async fn test_retry_enabled_recovers() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/servers"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/servers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "localhost"}])))
        .mount(&mock)
        .await;

    let client = PowerDnsClient::new(&server(&mock.uri(), None), HttpClient::new(), true);
    assert_eq!(client.server_id().await.unwrap(), "localhost");
}
