//! Demo data set with fixed identifiers.
//!
//! The job `aaaaaaaa-…` has three versions (extended, then active, then a
//! rate drop to 15.5) so history and as-of reads have something to show.

use chrono::{DateTime, TimeZone, Utc};
use scd_core::{ScdError, ScdResult};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::job::{Job, JobStatus};
use crate::payment::{PaymentLineItem, PaymentStatus};
use crate::timelog::{LogType, Timelog};
use crate::DomainStores;

pub const SOFTWARE_ENGINEER_JOB: Uuid = Uuid::from_u128(0xaaaaaaaa_aaaa_aaaa_aaaa_aaaaaaaaaaaa);
pub const ML_ENGINEER_JOB: Uuid = Uuid::from_u128(0xdddddddd_dddd_dddd_dddd_dddddddddddd);
pub const COMPANY: Uuid = Uuid::from_u128(0xbbbbbbbb_bbbb_bbbb_bbbb_bbbbbbbbbbbb);
pub const CONTRACTOR: Uuid = Uuid::from_u128(0xcccccccc_cccc_cccc_cccc_cccccccccccc);
pub const OTHER_CONTRACTOR: Uuid = Uuid::from_u128(0xeeeeeeee_eeee_eeee_eeee_eeeeeeeeeeee);
pub const TIMELOG: Uuid = Uuid::from_u128(0x2d30a4b8_983f_4282_8b54_2f82fb70102a);
pub const PAYMENT: Uuid = Uuid::from_u128(0x39358d52_2489_4944_a271_ced8d642980d);

/// Rows written by one seeding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub jobs: usize,
    pub timelogs: usize,
    pub payments: usize,
}

fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> ScdResult<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .ok_or_else(|| ScdError::Configuration(format!("invalid seed date {}-{}-{}", year, month, day)))
}

fn job_uid(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

fn jobs() -> Vec<Job> {
    let version = |business_id: Uuid,
                   uid: u128,
                   version: u32,
                   status: JobStatus,
                   rate: f64,
                   title: &str,
                   contractor_id: Uuid| Job {
        business_id,
        version_uid: job_uid(uid),
        version,
        status,
        rate,
        title: title.to_string(),
        company_id: COMPANY,
        contractor_id,
        created_at: None,
        updated_at: None,
    };

    vec![
        version(SOFTWARE_ENGINEER_JOB, 1, 1, JobStatus::Extended, 20.0, "Software Engineer", CONTRACTOR),
        version(SOFTWARE_ENGINEER_JOB, 2, 2, JobStatus::Active, 20.0, "Software Engineer", CONTRACTOR),
        version(SOFTWARE_ENGINEER_JOB, 3, 3, JobStatus::Active, 15.5, "Software Engineer", CONTRACTOR),
        version(ML_ENGINEER_JOB, 4, 1, JobStatus::Extended, 30.0, "ML Engineer", OTHER_CONTRACTOR),
    ]
}

fn timelogs() -> ScdResult<Vec<Timelog>> {
    let start = utc(2025, 7, 26, 20, 26)?;
    let captured_end = utc(2025, 7, 26, 21, 26)?;
    let adjusted_end = utc(2025, 7, 26, 21, 56)?;

    Ok(vec![
        Timelog {
            business_id: TIMELOG,
            version_uid: Uuid::from_u128(0x1c2e2ca7_a69d_421b_b278_f7f83a49e7e5),
            version: 1,
            contractor_id: CONTRACTOR,
            start_time: start,
            end_time: captured_end,
            duration: (captured_end - start).num_milliseconds(),
            log_type: LogType::Captured,
            job_uid: job_uid(3),
            created_at: None,
            updated_at: None,
        },
        Timelog {
            business_id: TIMELOG,
            version_uid: Uuid::from_u128(0xf31a0700_1c48_4813_ae39_c48110143ee3),
            version: 2,
            contractor_id: CONTRACTOR,
            start_time: start,
            end_time: adjusted_end,
            duration: (adjusted_end - start).num_milliseconds(),
            log_type: LogType::Adjusted,
            job_uid: job_uid(3),
            created_at: None,
            updated_at: None,
        },
    ])
}

fn payments() -> ScdResult<Vec<PaymentLineItem>> {
    let issued_at = utc(2025, 7, 26, 0, 0)?;
    let item = |uid: u128, version: u32, status: PaymentStatus| PaymentLineItem {
        business_id: PAYMENT,
        version_uid: Uuid::from_u128(uid),
        version,
        job_uid: job_uid(3),
        timelog_uid: Uuid::from_u128(0xf31a0700_1c48_4813_ae39_c48110143ee3),
        amount: 35.0,
        status,
        contractor_id: CONTRACTOR,
        issued_at,
        created_at: None,
        updated_at: None,
    };

    Ok(vec![
        item(0xde1dbf39_3e6c_4d3b_af19_4447e2c26571, 1, PaymentStatus::NotPaid),
        item(0x9cd2d600_49ae_4b68_8b95_e48c3a68f3ea, 2, PaymentStatus::Paid),
    ])
}

/// Load the demo data set unless the jobs table already has rows.
///
/// Returns `None` when seeding was skipped.
pub fn seed_demo_data(stores: &DomainStores) -> ScdResult<Option<SeedSummary>> {
    if stores.jobs.count_all()? > 0 {
        info!("Jobs table not empty, skipping seed");
        return Ok(None);
    }

    let summary = SeedSummary {
        jobs: stores.jobs.create_batch(jobs())?.len(),
        timelogs: stores.timelogs.create_batch(timelogs()?)?.len(),
        payments: stores.payments.create_batch(payments()?)?.len(),
    };
    info!(
        jobs = summary.jobs,
        timelogs = summary.timelogs,
        payments = summary.payments,
        "Seeded demo data"
    );
    Ok(Some(summary))
}
