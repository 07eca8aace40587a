// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Inventory change notifications.
//!
//! The inventory tells pdnsync about changes through [`ChangeNotifier`]. Each
//! notification carries the state before the change (when the object already
//! existed) and after it; an update job is queued only when something DNS
//! depends on changed.
//!
//! | Object | Fields that matter | Jobs |
//! |--------|-------------------|------|
//! | IP address | address, DNS name, attachment | the address |
//! | Interface, VM interface, failover group | name | every attached address |
//! | Device, virtual machine | name, primary IPv4, primary IPv6 | each primary address |
//!
//! Nothing is queued while auto-trigger is off, except that removing a zone
//! always cancels its scheduled syncs.

use crate::config::Settings;
use crate::constants::{JOB_NAME_ADDRESS, JOB_NAME_HOST, JOB_NAME_INTERFACE, JOB_NAME_SYNC};
use crate::errors::SyncError;
use crate::inventory::{
    AddressId, Attachment, FailoverGroup, Host, HostKind, Interface, Inventory, IpAddress,
};
use crate::jobs::{EnqueueRequest, JobId, JobQueue, JobSubject};
use std::sync::Arc;
use tracing::{debug, info};

/// Something addresses are attached to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachmentTarget {
    /// Interface of a device or of a virtual machine
    Interface {
        /// Kind of host owning the interface
        host_kind: HostKind,
        /// The interface
        interface: Interface,
    },
    /// Failover group
    FailoverGroup(FailoverGroup),
}

impl AttachmentTarget {
    /// Name DNS names may be derived from.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Interface { interface, .. } => &interface.name,
            Self::FailoverGroup(group) => &group.name,
        }
    }

    /// Returns true if `address` is attached to this target.
    #[must_use]
    pub fn holds(&self, address: &IpAddress) -> bool {
        match (self, &address.attachment) {
            (Self::Interface { host_kind, interface }, Attachment::Interface(attached)) => {
                attached.host.kind == *host_kind && attached.interface.id == interface.id
            }
            (Self::FailoverGroup(group), Attachment::FailoverGroup(attached)) => {
                attached.id == group.id
            }
            _ => false,
        }
    }
}

/// Identity of whatever an address is attached to.
fn attachment_identity(attachment: &Attachment) -> Option<(&'static str, u64)> {
    match attachment {
        Attachment::None => None,
        Attachment::Interface(attached) => Some(match attached.host.kind {
            HostKind::Device => ("interface", attached.interface.id),
            HostKind::VirtualMachine => ("vminterface", attached.interface.id),
        }),
        Attachment::FailoverGroup(group) => Some(("failovergroup", group.id)),
    }
}

/// Returns true if an address change affects its records.
#[must_use]
pub fn address_needs_update(before: Option<&IpAddress>, after: &IpAddress) -> bool {
    let Some(before) = before else {
        return true;
    };
    before.address != after.address
        || before.dns_name != after.dns_name
        || attachment_identity(&before.attachment) != attachment_identity(&after.attachment)
}

/// Returns true if an interface or failover group change affects the records
/// of its addresses.
#[must_use]
pub fn attachment_needs_update(before: Option<&AttachmentTarget>, after: &AttachmentTarget) -> bool {
    before.is_none_or(|before| before.name() != after.name())
}

/// Returns true if a host change affects the records of its primary addresses.
///
/// A newly created host never does: its addresses are created, and notified,
/// on their own.
#[must_use]
pub fn host_needs_update(before: Option<&Host>, after: &Host) -> bool {
    before.is_some_and(|before| {
        before.name != after.name
            || before.primary_ip4 != after.primary_ip4
            || before.primary_ip6 != after.primary_ip6
    })
}

/// Queues update jobs in response to inventory changes.
pub struct ChangeNotifier {
    inventory: Arc<dyn Inventory>,
    queue: Arc<dyn JobQueue>,
    auto_trigger: bool,
}

impl ChangeNotifier {
    /// Create a notifier honouring the auto-trigger flag of `settings`.
    #[must_use]
    pub fn new(inventory: Arc<dyn Inventory>, queue: Arc<dyn JobQueue>, settings: &Settings) -> Self {
        Self {
            inventory,
            queue,
            auto_trigger: settings.auto_trigger,
        }
    }

    /// An address was created (`before` is `None`) or updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the job cannot be queued.
    pub async fn on_address_changed(
        &self,
        before: Option<&IpAddress>,
        after: &IpAddress,
        user: Option<&str>,
    ) -> Result<Vec<JobId>, SyncError> {
        if !self.auto_trigger || !address_needs_update(before, after) {
            return Ok(Vec::new());
        }
        debug!(address = %after.address, "Address change affects DNS");
        self.enqueue_updates([after.id], JOB_NAME_ADDRESS, user).await
    }

    /// An interface, VM interface or failover group was created or updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the inventory cannot be read or a job cannot be queued.
    pub async fn on_attachment_changed(
        &self,
        before: Option<&AttachmentTarget>,
        after: &AttachmentTarget,
        user: Option<&str>,
    ) -> Result<Vec<JobId>, SyncError> {
        if !self.auto_trigger || !attachment_needs_update(before, after) {
            return Ok(Vec::new());
        }
        let ids: Vec<AddressId> = self
            .inventory
            .addresses()
            .await?
            .iter()
            .filter(|address| after.holds(address))
            .map(|address| address.id)
            .collect();
        debug!(name = %after.name(), addresses = ids.len(), "Attachment change affects DNS");
        self.enqueue_updates(ids, JOB_NAME_INTERFACE, user).await
    }

    /// A device or virtual machine was updated.
    ///
    /// `created_addresses` lists addresses created in the same change batch;
    /// they get their own notification and are skipped here.
    ///
    /// # Errors
    ///
    /// Returns an error if the inventory cannot be read or a job cannot be queued.
    pub async fn on_host_changed(
        &self,
        before: Option<&Host>,
        after: &Host,
        created_addresses: &[AddressId],
        user: Option<&str>,
    ) -> Result<Vec<JobId>, SyncError> {
        if !self.auto_trigger || !host_needs_update(before, after) {
            return Ok(Vec::new());
        }
        let primaries = [after.primary_ip4, after.primary_ip6];
        let ids: Vec<AddressId> = self
            .inventory
            .addresses()
            .await?
            .iter()
            .filter(|address| {
                address
                    .host()
                    .is_some_and(|h| h.id == after.id && h.kind == after.kind)
            })
            .filter(|address| primaries.contains(&Some(address.ip())))
            .map(|address| address.id)
            .filter(|id| !created_addresses.contains(id))
            .collect();
        debug!(host = %after.name, addresses = ids.len(), "Host change affects DNS");
        self.enqueue_updates(ids, JOB_NAME_HOST, user).await
    }

    /// A zone was removed: cancel its pending and scheduled sync jobs.
    pub async fn on_zone_removed(&self, zone_name: &str) -> usize {
        let cancelled = self
            .queue
            .cancel_scheduled(&JobSubject::Zone(zone_name.to_string()), JOB_NAME_SYNC)
            .await;
        info!(zone = %zone_name, cancelled, "Zone removed");
        cancelled
    }

    async fn enqueue_updates(
        &self,
        ids: impl IntoIterator<Item = AddressId>,
        name: &str,
        user: Option<&str>,
    ) -> Result<Vec<JobId>, SyncError> {
        let mut jobs = Vec::new();
        for id in ids {
            let job_id = self
                .queue
                .enqueue(EnqueueRequest::update_address(id, name, user.map(str::to_string)))
                .await?;
            info!(address_id = id, job_id, job = %name, "Queued address update");
            jobs.push(job_id);
        }
        Ok(jobs)
    }
}

#[cfg(test)]
#[path = "triggers_tests.rs"]
mod triggers_tests;
