// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Single-address update task.
//!
//! Adds the forward record of one inventory address and, when a reverse zone
//! covers it, its PTR record to their rrsets. Nothing is deleted: stale
//! records left behind by a rename are removed by the next zone sync.

use super::context::AddressContext;
use super::Reconciler;
use crate::errors::SyncError;
use crate::inventory::AddressId;
use crate::jobs::{Job, JobStatus};

/// Run the update task for address `id` on `job`.
///
/// A missing address is not an error: the job completes with a warning.
///
/// # Errors
///
/// Returns the error that aborted the task. By then the job is marked errored
/// and carries the error string under `exception`.
pub async fn update_address(
    reconciler: &Reconciler,
    job: &mut Job,
    id: AddressId,
) -> Result<(), SyncError> {
    match run(reconciler, job, id).await {
        Ok(()) => Ok(()),
        Err(e) => {
            job.log_failure(format!("error {e}"));
            job.data.exception = Some(e.to_string());
            job.terminate(JobStatus::Errored);
            Err(e)
        }
    }
}

async fn run(reconciler: &Reconciler, job: &mut Job, id: AddressId) -> Result<(), SyncError> {
    let Some(address) = reconciler.inventory.get_address(id).await? else {
        job.start();
        job.log_warning(format!(
            "No IP Address object given (id {id}). IP was probably removed, nothing to do."
        ));
        job.terminate(JobStatus::Completed);
        return Ok(());
    };

    job.log_debug("Starting task");
    job.start();
    let mut ctx = AddressContext::new(reconciler.registry(), reconciler.settings(), &address);

    job.log_debug("Creating forward record");
    create_forward(reconciler, job, &mut ctx).await?;

    job.log_debug("Creating reverse record");
    create_reverse(reconciler, job, &mut ctx).await?;

    job.log_success("Finished");
    job.terminate(JobStatus::Completed);
    Ok(())
}

async fn create_forward(
    reconciler: &Reconciler,
    job: &mut Job,
    ctx: &mut AddressContext<'_>,
) -> Result<(), SyncError> {
    let record = ctx.forward_record()?;
    job.log_info(format!("Forward record: {record}"));
    reconciler
        .push_record(job, &record)
        .await?;
    job.log_info("Forward record created");
    Ok(())
}

async fn create_reverse(
    reconciler: &Reconciler,
    job: &mut Job,
    ctx: &mut AddressContext<'_>,
) -> Result<(), SyncError> {
    let Some(record) = ctx.reverse_record()? else {
        job.log_warning(format!(
            "No reverse zone for IP:{} fqdn:{} Skipping",
            ctx.address().address,
            ctx.fqdn().unwrap_or_default()
        ));
        return Ok(());
    };
    job.log_info(format!("Reverse record {record}"));
    reconciler
        .push_record(job, &record)
        .await?;
    job.log_info("Reverse record created");
    Ok(())
}

#[cfg(test)]
#[path = "address_tests.rs"]
mod address_tests;
