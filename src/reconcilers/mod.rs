// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of inventory addresses into PowerDNS zones.
//!
//! # Reconciliation Architecture
//!
//! pdnsync follows the same desired/actual loop for both of its tasks:
//!
//! 1. **Resolve** - Place the address (or every candidate address) in its
//!    forward and reverse zones and derive its FQDN
//! 2. **Compare** - Build the desired records and, for a zone sync, diff them
//!    against the managed records PowerDNS currently serves
//! 3. **Apply** - Write every touched rrset in full (or delete it) on every
//!    enabled API server bound to the zone
//! 4. **Report** - Record progress, one output row per operation and the
//!    outcome on the job
//!
//! # Available Reconcilers
//!
//! - [`update_address`] - Create the forward and reverse records of one address
//! - [`sync_zone`] - Reconcile a whole zone, deleting stale managed records
//!
//! [`Reconciler`] implements [`TaskExecutor`] and dispatches jobs to these.

pub mod address;
pub mod context;
pub mod zone_sync;

pub use address::update_address;
pub use zone_sync::{diff_records, plan_changes, sync_zone, RecordDiff};

use crate::config::Settings;
use crate::errors::SyncError;
use crate::inventory::Inventory;
use crate::jobs::{
    Job, JobQueue, JobStatus, JobSubject, OutputRow, RecordAction, TaskExecutor, TaskKind,
};
use crate::metrics;
use crate::model::Zone;
use crate::powerdns::{BackendFactory, RecordBackend};
use crate::record::{DnsRecord, RRSetChange};
use crate::registry::ZoneRegistry;
use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::Arc;

/// Everything a task needs: the inventory, the zones, the PowerDNS backends
/// and the engine settings.
pub struct Reconciler {
    inventory: Arc<dyn Inventory>,
    registry: Arc<ZoneRegistry>,
    backends: Arc<dyn BackendFactory>,
    settings: Settings,
}

impl Reconciler {
    /// Create a reconciler.
    #[must_use]
    pub fn new(
        inventory: Arc<dyn Inventory>,
        registry: Arc<ZoneRegistry>,
        backends: Arc<dyn BackendFactory>,
        settings: Settings,
    ) -> Self {
        Self {
            inventory,
            registry,
            backends,
            settings,
        }
    }

    /// Zone registry tasks resolve against.
    #[must_use]
    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    /// Engine settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Backends for every enabled API server bound to `zone`.
    ///
    /// # Errors
    ///
    /// Returns `NoServers` if the zone has no enabled server, or the factory
    /// error if a backend cannot be built.
    pub(crate) fn backends_for(&self, zone: &Zone) -> Result<Vec<Arc<dyn RecordBackend>>, SyncError> {
        let servers = self.registry.enabled_servers_for_zone(zone);
        if servers.is_empty() {
            return Err(SyncError::NoServers {
                zone: zone.name.clone(),
            });
        }
        servers
            .into_iter()
            .map(|server| self.backends.backend(server).map_err(SyncError::from))
            .collect()
    }

    /// Add `record` to its rrset on every server hosting its zone, checking
    /// first that each server has the zone.
    ///
    /// Other managed records in the rrset are kept and take `record`'s TTL.
    /// A record already present with different data stays until a zone sync.
    ///
    /// # Errors
    ///
    /// Returns `NoServers`, `ServerZoneMissing` or the backend error.
    pub(crate) async fn push_record(&self, job: &mut Job, record: &DnsRecord) -> Result<(), SyncError> {
        let zone = self
            .registry
            .zone(&record.zone)
            .ok_or_else(|| SyncError::NoServers {
                zone: record.zone.clone(),
            })?;
        let key = record.key();
        let managed_comment = self.settings.managed_comment();
        for backend in self.backends_for(zone)? {
            let live = backend.get_zone(&record.zone).await?.ok_or_else(|| {
                SyncError::ServerZoneMissing {
                    zone: record.zone.clone(),
                    server: backend.name().to_string(),
                }
            })?;

            let mut records: Vec<DnsRecord> = live
                .rrsets
                .iter()
                .flat_map(|rrset| DnsRecord::from_rrset(rrset, &record.zone, managed_comment))
                .filter(|other| other.key() == key && other.data != record.data)
                .map(|other| DnsRecord {
                    ttl: record.ttl,
                    ..other
                })
                .collect();
            records.push(record.clone());
            let change = RRSetChange {
                key: key.clone(),
                records,
            };
            self.send(job, backend.as_ref(), &change, &[(RecordAction::Create, record)])
                .await?;
        }
        Ok(())
    }

    /// Record the operations `change` settles on the job, then write the rrset
    /// to one server.
    pub(crate) async fn send(
        &self,
        job: &mut Job,
        backend: &dyn RecordBackend,
        change: &RRSetChange,
        settles: &[(RecordAction, &DnsRecord)],
    ) -> Result<(), SyncError> {
        for (action, record) in settles {
            job.add_output(OutputRow {
                action: *action,
                rr: record.to_string(),
                zone: record.zone.clone(),
                server: backend.name().to_string(),
            });
        }
        let rrset = change.to_rrset(self.settings.managed_comment());
        if change.is_delete() {
            backend.delete_rrset(&change.key.zone, rrset).await?;
        } else {
            backend.create_rrset(&change.key.zone, rrset).await?;
        }
        for (action, record) in settles {
            metrics::record_operation(action.as_str(), record.record_type.as_str());
        }
        Ok(())
    }
}

#[async_trait]
impl TaskExecutor for Reconciler {
    async fn execute(&self, job: &mut Job, queue: &dyn JobQueue) -> Result<(), SyncError> {
        match (job.task, job.subject.clone()) {
            (TaskKind::UpdateAddress, JobSubject::Address(id)) => {
                update_address(self, job, id).await
            }
            (TaskKind::SyncZone, JobSubject::Zone(zone)) => {
                sync_zone(self, job, &zone, queue).await;
                Ok(())
            }
            (task, subject) => {
                let err = SyncError::Other(anyhow!(
                    "Task {} cannot run on {subject}",
                    task.as_str()
                ));
                job.start();
                job.log_failure(err.to_string());
                job.terminate(JobStatus::Errored);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
