//! Payment line items owed to a contractor for logged time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use scd_core::{
    Column, ColumnType, Direction, Entity, ScdError, ScdResult, SoftDelete, VersionStore,
};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::info;
use uuid::Uuid;

use crate::job::Job;
use crate::timelog::Timelog;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PaymentStatus {
    #[default]
    NotPaid,
    Paid,
    Failed,
    /// Soft-deleted.
    Void,
}

/// One version of a payment line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLineItem {
    pub business_id: Uuid,
    pub version_uid: Uuid,
    pub version: u32,
    pub job_uid: Uuid,
    pub timelog_uid: Uuid,
    pub amount: f64,
    pub status: PaymentStatus,
    pub contractor_id: Uuid,
    pub issued_at: DateTime<Utc>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPaymentLineItem {
    #[serde(default)]
    pub business_id: Option<Uuid>,
    pub job_uid: Uuid,
    pub timelog_uid: Uuid,
    pub amount: f64,
    #[serde(default)]
    pub status: PaymentStatus,
    pub contractor_id: Uuid,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentUpdate {
    pub amount: f64,
    pub issued_at: DateTime<Utc>,
    pub contractor_id: Uuid,
}

impl PaymentLineItem {
    pub fn new(input: NewPaymentLineItem) -> Self {
        Self {
            business_id: input.business_id.unwrap_or_else(Uuid::new_v4),
            version_uid: Uuid::new_v4(),
            version: 1,
            job_uid: input.job_uid,
            timelog_uid: input.timelog_uid,
            amount: input.amount,
            status: input.status,
            contractor_id: input.contractor_id,
            issued_at: input.issued_at,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Entity for PaymentLineItem {
    const TABLE: &'static str = "payment_line_items";
    const COLUMNS: &'static [Column] = &[
        Column::new("job_uid", ColumnType::Uuid),
        Column::new("timelog_uid", ColumnType::Uuid),
        Column::new("amount", ColumnType::Real),
        Column::new("status", ColumnType::Text),
        Column::new("contractor_id", ColumnType::Uuid),
        Column::new("issued_at", ColumnType::Timestamp),
    ];

    fn business_id(&self) -> String {
        self.business_id.to_string()
    }

    fn version_uid(&self) -> String {
        self.version_uid.to_string()
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn copy_for_new_version(&self) -> Self {
        Self {
            version_uid: Uuid::new_v4(),
            version: self.version + 1,
            created_at: None,
            updated_at: None,
            ..self.clone()
        }
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = Some(at);
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }
}

impl SoftDelete for PaymentLineItem {
    fn mark_deleted(&mut self) {
        self.amount = 0.0;
        self.status = PaymentStatus::Void;
    }

    fn is_deleted(&self) -> bool {
        self.status == PaymentStatus::Void
    }
}

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn VersionStore<PaymentLineItem>>,
    jobs: Arc<dyn VersionStore<Job>>,
    timelogs: Arc<dyn VersionStore<Timelog>>,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn VersionStore<PaymentLineItem>>,
        jobs: Arc<dyn VersionStore<Job>>,
        timelogs: Arc<dyn VersionStore<Timelog>>,
    ) -> Self {
        Self {
            store,
            jobs,
            timelogs,
        }
    }

    /// Create version 1. Both referenced versions must exist.
    pub fn create(&self, input: NewPaymentLineItem) -> ScdResult<PaymentLineItem> {
        if input.amount < 0.0 {
            return Err(ScdError::validation(format!(
                "payment amount must not be negative, got {}",
                input.amount
            )));
        }

        let job_uid = input.job_uid.to_string();
        if !self.jobs.exists(&job_uid)? {
            return Err(ScdError::not_found_uid(Job::TABLE, job_uid));
        }
        let timelog_uid = input.timelog_uid.to_string();
        if !self.timelogs.exists(&timelog_uid)? {
            return Err(ScdError::not_found_uid(Timelog::TABLE, timelog_uid));
        }

        let item = self.store.create(PaymentLineItem::new(input))?;
        info!(
            payment_id = %item.business_id,
            amount = item.amount,
            "Created payment line item"
        );
        Ok(item)
    }

    pub fn get_by_uid(&self, uid: &str) -> ScdResult<PaymentLineItem> {
        self.store.find_by_uid(uid)
    }

    pub fn update(&self, uid: &str, changes: PaymentUpdate) -> ScdResult<PaymentLineItem> {
        self.store.update(
            uid,
            Box::new(move |mut item: PaymentLineItem| {
                item.amount = changes.amount;
                item.issued_at = changes.issued_at;
                item.contractor_id = changes.contractor_id;
                item
            }),
        )
    }

    pub fn mark_paid(&self, uid: &str) -> ScdResult<PaymentLineItem> {
        let current = self.store.find_by_uid(uid)?;
        if current.status == PaymentStatus::Void {
            return Err(ScdError::validation(format!(
                "payment line item '{}' is void",
                uid
            )));
        }
        self.store.update(
            uid,
            Box::new(|mut item: PaymentLineItem| {
                item.status = PaymentStatus::Paid;
                item
            }),
        )
    }

    pub fn delete(&self, uid: &str) -> ScdResult<PaymentLineItem> {
        self.store.soft_delete(uid)
    }

    /// Latest line items of a contractor, most recently issued first.
    pub fn by_contractor(&self, contractor_id: Uuid) -> ScdResult<Vec<PaymentLineItem>> {
        self.store
            .query()
            .latest()
            .where_eq("contractor_id", contractor_id.to_string())
            .order_by("issued_at", Direction::Desc)
            .find()
    }

    /// Latest line items of a contractor recorded within the period.
    pub fn by_contractor_in_period(
        &self,
        contractor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ScdResult<Vec<PaymentLineItem>> {
        self.store
            .query()
            .latest()
            .where_eq("contractor_id", contractor_id.to_string())
            .between_dates(start, end)
            .order_by("issued_at", Direction::Desc)
            .find()
    }
}
