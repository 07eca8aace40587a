// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Full-zone synchronization task.
//!
//! The desired record set is built from every inventory address the zone
//! selects. The live set is the union of the managed records on every enabled
//! API server bound to the zone. Each rrset holding a record only in one of
//! the two sets is rewritten in full with its desired records, or deleted
//! when the inventory wants none.
//!
//! Failures never escape this task: they are logged on the job, which is
//! marked errored. A recurring job schedules its next run either way.

use super::context::AddressContext;
use super::Reconciler;
use crate::errors::{error_sources, SyncError};
use crate::jobs::{EnqueueRequest, Job, JobQueue, JobStatus, RecordAction};
use crate::model::Zone;
use crate::powerdns::RecordBackend;
use crate::record::{group_by_rrset, unify_ttls, DnsRecord, RRSetChange, RRSetKey};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Records to delete and to create, in record order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordDiff {
    /// Live records nothing in the inventory asks for
    pub to_delete: BTreeSet<DnsRecord>,
    /// Desired records PowerDNS does not serve
    pub to_create: BTreeSet<DnsRecord>,
}

impl RecordDiff {
    /// Returns true if the zone is already in sync.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_create.is_empty()
    }
}

/// Set difference in both directions.
#[must_use]
pub fn diff_records(desired: &BTreeSet<DnsRecord>, live: &BTreeSet<DnsRecord>) -> RecordDiff {
    RecordDiff {
        to_delete: live.difference(desired).cloned().collect(),
        to_create: desired.difference(live).cloned().collect(),
    }
}

/// Rrset writes that turn `live` into `desired`, deletes first.
///
/// Every rrset touched by `diff` is written once with all the desired records
/// for its name and type, or deleted when none remain.
#[must_use]
pub fn plan_changes(desired: &BTreeSet<DnsRecord>, diff: &RecordDiff) -> Vec<RRSetChange> {
    let touched: BTreeSet<RRSetKey> = diff
        .to_delete
        .iter()
        .chain(&diff.to_create)
        .map(DnsRecord::key)
        .collect();
    let mut wanted = group_by_rrset(desired);
    let (deletes, replaces): (Vec<_>, Vec<_>) = touched
        .into_iter()
        .map(|key| {
            let records = wanted.remove(&key).unwrap_or_default();
            RRSetChange { key, records }
        })
        .partition(RRSetChange::is_delete);
    deletes.into_iter().chain(replaces).collect()
}

/// Run the sync task for `zone_name` on `job`, then schedule the next run if
/// the job recurs.
pub async fn sync_zone(reconciler: &Reconciler, job: &mut Job, zone_name: &str, queue: &dyn JobQueue) {
    job.log_debug(format!("Starting sync for zone {zone_name}"));
    job.start();

    let Some(zone) = reconciler.registry().zone(zone_name) else {
        job.log_warning(format!("Zone {zone_name} no longer exists, not syncing"));
        job.terminate(JobStatus::Completed);
        return;
    };

    match run(reconciler, job, zone).await {
        Ok(()) => {}
        Err(e @ SyncError::NoServers { .. }) => {
            job.log_failure(e.to_string());
            job.terminate(JobStatus::Errored);
        }
        Err(e) => {
            let mut message = format!("An exception occurred: `{}: {e}`", e.status_reason());
            let sources = error_sources(&e);
            if !sources.is_empty() {
                message.push_str("\n```\n");
                for cause in sources {
                    message.push_str(&format!("caused by: {cause}\n"));
                }
                message.push_str("```");
            }
            job.log_failure(message);
            job.terminate(JobStatus::Errored);
        }
    }

    schedule_next(job, &zone.name, queue).await;
}

async fn run(reconciler: &Reconciler, job: &mut Job, zone: &Zone) -> Result<(), SyncError> {
    if !zone.enabled {
        job.log_warning(format!("Zone {zone} is disabled for updates, not syncing"));
        job.terminate(JobStatus::Completed);
        return Ok(());
    }

    let desired = unify_ttls(&load_desired_records(reconciler, job, zone).await?);
    let (backends, live) = load_live_records(reconciler, zone).await?;
    job.log_info(format!(
        "Found record count: inventory:{} pdns:{}",
        desired.len(),
        live.len()
    ));

    let diff = diff_records(&desired, &live);
    job.log_info(format!(
        "Record change count: to_delete:{} to_create:{}",
        diff.to_delete.len(),
        diff.to_create.len()
    ));

    for change in plan_changes(&desired, &diff) {
        let settles: Vec<(RecordAction, &DnsRecord)> = diff
            .to_delete
            .iter()
            .filter(|r| r.key() == change.key)
            .map(|r| (RecordAction::Delete, r))
            .chain(
                diff.to_create
                    .iter()
                    .filter(|r| r.key() == change.key)
                    .map(|r| (RecordAction::Create, r)),
            )
            .collect();
        for backend in &backends {
            reconciler
                .send(job, backend.as_ref(), &change, &settles)
                .await?;
        }
    }

    job.log_success("Finished");
    job.terminate(JobStatus::Completed);
    Ok(())
}

/// Records the inventory asks for in `zone`.
async fn load_desired_records(
    reconciler: &Reconciler,
    job: &mut Job,
    zone: &Zone,
) -> Result<BTreeSet<DnsRecord>, SyncError> {
    let addresses = reconciler.inventory.addresses().await?;
    let candidates: Vec<_> = addresses
        .iter()
        .filter(|address| zone.selects_address(address))
        .collect();
    job.log_info(format!(
        "Found {} matching addresses to check",
        candidates.len()
    ));

    let mut records = BTreeSet::new();
    let mut ctx: Option<AddressContext<'_>> = None;
    for address in candidates {
        let ctx = ctx.get_or_insert_with(|| {
            AddressContext::new(reconciler.registry(), reconciler.settings(), address)
        });
        ctx.reset(address);

        let Some(forward_zone) = ctx.forward_zone() else {
            job.log_info(format!(
                "No matching forward zone found for IP:{}. Skipping",
                address.address
            ));
            continue;
        };
        let Some(fqdn) = ctx.fqdn() else {
            job.log_info(format!(
                "No FQDN could be determined for IP:{} (zone:{forward_zone}). Skipping",
                address.address
            ));
            continue;
        };

        if forward_zone.name == zone.name {
            records.insert(ctx.forward_record()?);
        }
        if zone.is_reverse() {
            match ctx.reverse_record()? {
                Some(record) if record.zone == zone.name => {
                    records.insert(record);
                }
                Some(_) => {}
                None => job.log_info(format!(
                    "No matching reverse zone for {} ({fqdn}). Skipping",
                    address.address
                )),
            }
        }
    }
    Ok(records)
}

/// Managed records currently served for `zone`, with the backends that serve it.
async fn load_live_records(
    reconciler: &Reconciler,
    zone: &Zone,
) -> Result<(Vec<Arc<dyn RecordBackend>>, BTreeSet<DnsRecord>), SyncError> {
    let backends = reconciler.backends_for(zone)?;
    let managed_comment = reconciler.settings().managed_comment();
    let mut live = BTreeSet::new();
    for backend in &backends {
        let pdns_zone =
            backend
                .get_zone(&zone.name)
                .await?
                .ok_or_else(|| SyncError::ServerZoneMissing {
                    zone: zone.name.clone(),
                    server: backend.name().to_string(),
                })?;
        for rrset in &pdns_zone.rrsets {
            live.extend(DnsRecord::from_rrset(rrset, &zone.name, managed_comment));
        }
    }
    Ok((backends, live))
}

/// Enqueue the next run of a recurring sync job.
async fn schedule_next(job: &mut Job, zone_name: &str, queue: &dyn JobQueue) {
    let Some(next_run) = job.next_run_at() else {
        return;
    };
    let request = EnqueueRequest::sync_zone(
        zone_name,
        &job.name,
        job.user.clone(),
        Some(next_run),
        job.interval_minutes,
    );
    match queue.enqueue(request).await {
        Ok(id) => info!(zone = %zone_name, job_id = id, next_run = %next_run, "Scheduled next zone sync"),
        Err(e) => {
            warn!(zone = %zone_name, "Failed to schedule next zone sync: {e}");
            job.log_failure(format!("Failed to schedule next sync: {e}"));
        }
    }
}

#[cfg(test)]
#[path = "zone_sync_tests.rs"]
mod zone_sync_tests;
