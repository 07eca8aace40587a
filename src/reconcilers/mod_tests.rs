// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `reconcilers/mod.rs`, and the in-memory PowerDNS fake the
//! other reconciler tests share.

use super::*;
use crate::errors::PdnsError;
use crate::inventory::{IpAddress, MemoryInventory};
use crate::jobs::{EnqueueRequest, JobId};
use crate::model::ApiServer;
use crate::naming::IpNaming;
use crate::powerdns::types::{PdnsZone, RRSet};
use crate::record::RecordType;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// A PowerDNS server kept in memory, recording every write.
pub(crate) struct FakePowerDns {
    name: String,
    zones: Mutex<BTreeMap<String, Vec<RRSet>>>,
    writes: Mutex<Vec<(String, RRSet)>>,
    fail_writes: bool,
}

impl FakePowerDns {
    pub(crate) fn new(name: &str, zones: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            zones: Mutex::new(zones.iter().map(|z| ((*z).to_string(), Vec::new())).collect()),
            writes: Mutex::new(Vec::new()),
            fail_writes: false,
        }
    }

    pub(crate) fn failing(name: &str, zones: &[&str]) -> Self {
        Self {
            fail_writes: true,
            ..Self::new(name, zones)
        }
    }

    /// Seed an rrset as if it had been created earlier.
    pub(crate) fn seed(&self, zone: &str, rrset: RRSet) {
        self.zones
            .lock()
            .unwrap()
            .entry(zone.to_string())
            .or_default()
            .push(rrset);
    }

    /// `(changetype, "name type")` for every write, in order.
    pub(crate) fn writes(&self) -> Vec<(String, String)> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|(_, rrset)| {
                (
                    rrset.changetype.clone().unwrap_or_default(),
                    format!("{} {}", rrset.name, rrset.rtype),
                )
            })
            .collect()
    }

    pub(crate) fn rrsets(&self, zone: &str) -> Vec<RRSet> {
        self.zones
            .lock()
            .unwrap()
            .get(zone)
            .cloned()
            .unwrap_or_default()
    }

    fn write(&self, zone: &str, rrset: RRSet, keep: bool) -> Result<(), PdnsError> {
        if self.fail_writes {
            return Err(PdnsError::Http {
                method: "PATCH".to_string(),
                url: format!("http://{}/zones/{zone}", self.name),
                status: 500,
                body: "boom".to_string(),
            });
        }
        self.writes
            .lock()
            .unwrap()
            .push((zone.to_string(), rrset.clone()));
        let mut zones = self.zones.lock().unwrap();
        let rrsets = zones.entry(zone.to_string()).or_default();
        rrsets.retain(|r| !(r.name == rrset.name && r.rtype == rrset.rtype));
        if keep {
            rrsets.push(RRSet {
                changetype: None,
                ..rrset
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RecordBackend for FakePowerDns {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_zone(&self, zone: &str) -> Result<Option<PdnsZone>, PdnsError> {
        Ok(self.zones.lock().unwrap().get(zone).map(|rrsets| PdnsZone {
            id: zone.to_string(),
            name: zone.to_string(),
            rrsets: rrsets.clone(),
        }))
    }

    async fn create_rrset(&self, zone: &str, rrset: RRSet) -> Result<(), PdnsError> {
        self.write(zone, rrset, true)
    }

    async fn delete_rrset(&self, zone: &str, rrset: RRSet) -> Result<(), PdnsError> {
        self.write(zone, rrset, false)
    }
}

/// Hands out the fakes by API server name.
#[derive(Default)]
pub(crate) struct FakeFactory {
    backends: BTreeMap<String, Arc<FakePowerDns>>,
}

impl FakeFactory {
    pub(crate) fn with(mut self, backend: Arc<FakePowerDns>) -> Self {
        self.backends.insert(backend.name.clone(), backend);
        self
    }
}

impl BackendFactory for FakeFactory {
    fn backend(&self, server: &ApiServer) -> Result<Arc<dyn RecordBackend>, PdnsError> {
        self.backends
            .get(&server.name)
            .map(|b| Arc::clone(b) as Arc<dyn RecordBackend>)
            .ok_or_else(|| PdnsError::InvalidUrl {
                url: server.api_url.clone(),
                reason: "no fake backend".to_string(),
            })
    }
}

/// Queue that records requests instead of running them.
#[derive(Default)]
pub(crate) struct RecordingQueue {
    pub(crate) requests: Mutex<Vec<EnqueueRequest>>,
}

#[async_trait]
impl JobQueue for RecordingQueue {
    async fn enqueue(&self, request: EnqueueRequest) -> Result<JobId, SyncError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request);
        Ok(requests.len() as JobId)
    }

    async fn cancel_scheduled(&self, _subject: &JobSubject, _name: &str) -> usize {
        0
    }
}

/// `corp.example.com.` (dnsName naming) and `10.in-addr.arpa.`, both on pdns1.
pub(crate) fn registry() -> ZoneRegistry {
    let mut registry = ZoneRegistry::new();
    registry
        .add_server(ApiServer::new("pdns1", "http://pdns1:8081/api/v1", "secret"))
        .unwrap();
    let mut corp = Zone::new("corp.example.com.");
    corp.default_ttl = 600;
    corp.api_servers = vec!["pdns1".to_string()];
    corp.naming.ip = Some(IpNaming::DnsName);
    registry.add_zone(corp).unwrap();
    let mut reverse = Zone::new("10.in-addr.arpa.");
    reverse.api_servers = vec!["pdns1".to_string()];
    registry.add_zone(reverse).unwrap();
    registry
}

pub(crate) fn named_address(id: u64, ip: &str, dns_name: &str) -> IpAddress {
    serde_yaml::from_str(&format!("id: {id}\naddress: '{ip}'\ndnsName: '{dns_name}'\n")).unwrap()
}

pub(crate) fn reconciler(
    registry: ZoneRegistry,
    addresses: Vec<IpAddress>,
    backend: Arc<FakePowerDns>,
) -> Reconciler {
    Reconciler::new(
        Arc::new(MemoryInventory::from_addresses(addresses)),
        Arc::new(registry),
        Arc::new(FakeFactory::default().with(backend)),
        Settings::default(),
    )
}

#[test]
fn test_backends_for_without_enabled_servers() {
    let mut registry = registry();
    let mut orphan = Zone::new("lab.example.com.");
    orphan.naming.ip = Some(IpNaming::DnsName);
    registry.add_zone(orphan).unwrap();
    let backend = Arc::new(FakePowerDns::new("pdns1", &["corp.example.com."]));
    let reconciler = reconciler(registry, Vec::new(), backend);

    let zone = reconciler.registry().zone("lab.example.com.").unwrap();
    let err = reconciler.backends_for(zone).err().unwrap();
    assert_eq!(err.to_string(), "No valid servers found for zone lab.example.com.");
}

#[tokio::test]
async fn test_push_record_requires_zone_on_server() {
    let backend = Arc::new(FakePowerDns::new("pdns1", &[]));
    let reconciler = reconciler(registry(), Vec::new(), backend.clone());
    let mut job = Job::new(1, EnqueueRequest::update_address(1, "update", None));
    let record = DnsRecord::new(
        "web.corp.example.com.",
        RecordType::A,
        600,
        "10.1.2.3",
        "corp.example.com.",
    );

    let err = reconciler
        .push_record(&mut job, &record)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Zone corp.example.com. not found on server pdns1");
    assert!(job.data.output.is_empty());
    assert!(backend.writes().is_empty());
}

#[tokio::test]
async fn test_push_record_writes_output_row_and_comment() {
    let backend = Arc::new(FakePowerDns::new("pdns1", &["corp.example.com."]));
    let reconciler = reconciler(registry(), Vec::new(), backend.clone());
    let mut job = Job::new(1, EnqueueRequest::update_address(1, "update", None));
    let record = DnsRecord::new(
        "web.corp.example.com.",
        RecordType::A,
        600,
        "10.1.2.3",
        "corp.example.com.",
    );

    reconciler
        .push_record(&mut job, &record)
        .await
        .unwrap();

    assert_eq!(
        job.data.output,
        vec![OutputRow {
            action: RecordAction::Create,
            rr: "web.corp.example.com. A 600 10.1.2.3".to_string(),
            zone: "corp.example.com.".to_string(),
            server: "pdns1".to_string(),
        }]
    );
    let rrsets = backend.rrsets("corp.example.com.");
    assert_eq!(rrsets.len(), 1);
    assert_eq!(rrsets[0].comments[0].content, "pdnsync");
}

#[tokio::test]
async fn test_execute_rejects_mismatched_subject() {
    let backend = Arc::new(FakePowerDns::new("pdns1", &[]));
    let reconciler = reconciler(registry(), Vec::new(), backend);
    let queue = RecordingQueue::default();
    let mut job = Job::new(
        1,
        EnqueueRequest {
            task: TaskKind::UpdateAddress,
            subject: JobSubject::Zone("corp.example.com.".to_string()),
            name: "update".to_string(),
            user: None,
            schedule_at: None,
            interval_minutes: None,
        },
    );

    assert!(reconciler.execute(&mut job, &queue).await.is_err());
    assert_eq!(job.status, JobStatus::Errored);
}
