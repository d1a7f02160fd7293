//! Jobs: a contractor engaged by a company at a rate.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use scd_core::{
    Column, ColumnType, Direction, Entity, Filter, ScdResult, SoftDelete, Transform, VersionStore,
};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::info;
use uuid::Uuid;

/// Lifecycle of a job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Active,
    Extended,
    Completed,
    Deleted,
}

/// One version of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub business_id: Uuid,
    pub version_uid: Uuid,
    pub version: u32,
    pub status: JobStatus,
    pub rate: f64,
    pub title: String,
    pub company_id: Uuid,
    pub contractor_id: Uuid,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for creating a job. A missing id starts a new business entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    #[serde(default)]
    pub business_id: Option<Uuid>,
    #[serde(default)]
    pub status: JobStatus,
    pub rate: f64,
    pub title: String,
    pub company_id: Uuid,
    pub contractor_id: Uuid,
}

impl Job {
    /// Version 1 of a job with a fresh version uid.
    pub fn new(input: NewJob) -> Self {
        Self {
            business_id: input.business_id.unwrap_or_else(Uuid::new_v4),
            version_uid: Uuid::new_v4(),
            version: 1,
            status: input.status,
            rate: input.rate,
            title: input.title,
            company_id: input.company_id,
            contractor_id: input.contractor_id,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Entity for Job {
    const TABLE: &'static str = "jobs";
    const COLUMNS: &'static [Column] = &[
        Column::new("status", ColumnType::Text),
        Column::new("rate", ColumnType::Real),
        Column::new("title", ColumnType::Text),
        Column::new("company_id", ColumnType::Uuid),
        Column::new("contractor_id", ColumnType::Uuid),
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

impl SoftDelete for Job {
    fn mark_deleted(&mut self) {
        self.status = JobStatus::Deleted;
    }

    fn is_deleted(&self) -> bool {
        self.status == JobStatus::Deleted
    }
}

/// Job operations over a version store.
#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn VersionStore<Job>>,
}

impl JobService {
    pub fn new(store: Arc<dyn VersionStore<Job>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn VersionStore<Job>> {
        &self.store
    }

    pub fn create_job(&self, input: NewJob) -> ScdResult<Job> {
        let job = self.store.create(Job::new(input))?;
        info!(job_id = %job.business_id, uid = %job.version_uid, "Created job");
        Ok(job)
    }

    pub fn get_by_uid(&self, uid: &str) -> ScdResult<Job> {
        self.store.find_by_uid(uid)
    }

    pub fn get_latest(&self, job_id: &str) -> ScdResult<Job> {
        self.store.get_latest_version(job_id)
    }

    /// New version with a changed title and rate.
    pub fn update_job(&self, uid: &str, title: String, rate: f64) -> ScdResult<Job> {
        self.store.update(
            uid,
            Box::new(move |mut job: Job| {
                job.title = title;
                job.rate = rate;
                job
            }),
        )
    }

    pub fn update_status(&self, uid: &str, status: JobStatus) -> ScdResult<Job> {
        self.store.update(uid, Self::set_status(status))
    }

    /// Apply status changes in order; stops at the first failure.
    pub fn update_statuses(&self, changes: Vec<(String, JobStatus)>) -> ScdResult<Vec<Job>> {
        let updates = changes
            .into_iter()
            .map(|(uid, status)| (uid, Self::set_status(status)))
            .collect();
        self.store.update_batch(updates)
    }

    pub fn delete_job(&self, uid: &str) -> ScdResult<Job> {
        self.store.soft_delete(uid)
    }

    /// Latest versions of a company's active jobs, newest first.
    pub fn active_jobs_by_company(&self, company_id: Uuid) -> ScdResult<Vec<Job>> {
        self.store
            .query()
            .latest()
            .where_eq("company_id", company_id.to_string())
            .where_eq("status", JobStatus::Active.as_ref())
            .order_by("created_at", Direction::Desc)
            .find()
    }

    /// Latest versions of a contractor's active or extended jobs.
    pub fn jobs_by_contractor(&self, contractor_id: Uuid) -> ScdResult<Vec<Job>> {
        self.store
            .query()
            .latest()
            .where_eq("contractor_id", contractor_id.to_string())
            .where_in(
                "status",
                [JobStatus::Active.as_ref(), JobStatus::Extended.as_ref()],
            )
            .order_by("created_at", Direction::Desc)
            .find()
    }

    /// Every active job by title.
    pub fn all_active_jobs(&self) -> ScdResult<Vec<Job>> {
        self.store
            .query()
            .latest()
            .where_eq("status", JobStatus::Active.as_ref())
            .order_by("title", Direction::Asc)
            .find()
    }

    /// Active jobs paying at least `min_rate`, best paid first, at most 50.
    pub fn high_value_active_jobs(&self, min_rate: f64) -> ScdResult<Vec<Job>> {
        self.store
            .query()
            .latest()
            .where_eq("status", JobStatus::Active.as_ref())
            .filter(Filter::gte("rate", min_rate))
            .order_by("rate", Direction::Desc)
            .limit(50)
            .find()
    }

    pub fn job_history(&self, job_id: &str) -> ScdResult<Vec<Job>> {
        self.store.get_version_history(job_id)
    }

    pub fn job_as_of(&self, job_id: &str, at: DateTime<Utc>) -> ScdResult<Job> {
        self.store.get_version_at(job_id, at)
    }

    fn set_status(status: JobStatus) -> Transform<Job> {
        Box::new(move |mut job: Job| {
            job.status = status;
            job
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scd_core::{ErrorCode, SqliteVersionStore};

    fn service() -> JobService {
        JobService::new(Arc::new(SqliteVersionStore::<Job>::in_memory().unwrap()))
    }

    fn new_job(title: &str, rate: f64, company_id: Uuid, contractor_id: Uuid) -> NewJob {
        NewJob {
            business_id: None,
            status: JobStatus::Active,
            rate,
            title: title.to_string(),
            company_id,
            contractor_id,
        }
    }

    #[test]
    fn test_create_assigns_identity() {
        let svc = service();
        let job = svc
            .create_job(new_job("Software Engineer", 20.0, Uuid::new_v4(), Uuid::new_v4()))
            .unwrap();
        assert_eq!(job.version, 1);
        assert!(job.created_at.is_some());

        let fixed = Uuid::new_v4();
        let mut input = new_job("ML Engineer", 30.0, Uuid::new_v4(), Uuid::new_v4());
        input.business_id = Some(fixed);
        assert_eq!(svc.create_job(input).unwrap().business_id, fixed);
    }

    #[test]
    fn test_update_job_and_history() {
        let svc = service();
        let v1 = svc
            .create_job(new_job("Engineer", 20.0, Uuid::new_v4(), Uuid::new_v4()))
            .unwrap();
        let v2 = svc
            .update_job(&v1.version_uid.to_string(), "Senior Engineer".to_string(), 15.5)
            .unwrap();

        assert_eq!(v2.version, 2);
        assert_eq!(v2.title, "Senior Engineer");
        assert_eq!(v2.rate, 15.5);

        let history = svc.job_history(&v1.business_id.to_string()).unwrap();
        assert_eq!(history, vec![v1, v2]);
    }

    #[test]
    fn test_status_queries_use_latest_version() {
        let svc = service();
        let company = Uuid::new_v4();
        let contractor = Uuid::new_v4();

        let a = svc.create_job(new_job("A", 10.0, company, contractor)).unwrap();
        let b = svc.create_job(new_job("B", 20.0, company, contractor)).unwrap();
        svc.update_status(&b.version_uid.to_string(), JobStatus::Extended)
            .unwrap();
        let c = svc.create_job(new_job("C", 30.0, company, Uuid::new_v4())).unwrap();
        svc.update_status(&c.version_uid.to_string(), JobStatus::Completed)
            .unwrap();

        let active = svc.active_jobs_by_company(company).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].business_id, a.business_id);

        let by_contractor = svc.jobs_by_contractor(contractor).unwrap();
        assert_eq!(by_contractor.len(), 2);
        assert!(by_contractor.iter().all(|j| j.version_uid != b.version_uid));

        let titles: Vec<String> = svc
            .all_active_jobs()
            .unwrap()
            .into_iter()
            .map(|j| j.title)
            .collect();
        assert_eq!(titles, vec!["A"]);
    }

    #[test]
    fn test_high_value_jobs() {
        let svc = service();
        let company = Uuid::new_v4();
        for (title, rate) in [("low", 10.0), ("mid", 40.0), ("high", 90.0)] {
            svc.create_job(new_job(title, rate, company, Uuid::new_v4()))
                .unwrap();
        }
        let rates: Vec<f64> = svc
            .high_value_active_jobs(40.0)
            .unwrap()
            .iter()
            .map(|j| j.rate)
            .collect();
        assert_eq!(rates, vec![90.0, 40.0]);
    }

    #[test]
    fn test_delete_marks_status() {
        let svc = service();
        let v1 = svc
            .create_job(new_job("Temp", 10.0, Uuid::new_v4(), Uuid::new_v4()))
            .unwrap();
        let v2 = svc.delete_job(&v1.version_uid.to_string()).unwrap();
        assert_eq!(v2.status, JobStatus::Deleted);
        assert!(svc.all_active_jobs().unwrap().is_empty());
    }

    #[test]
    fn test_update_statuses_reports_partial_progress() {
        let svc = service();
        let a = svc
            .create_job(new_job("A", 10.0, Uuid::new_v4(), Uuid::new_v4()))
            .unwrap();
        let err = svc
            .update_statuses(vec![
                (a.version_uid.to_string(), JobStatus::Extended),
                (Uuid::new_v4().to_string(), JobStatus::Completed),
            ])
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BatchAborted);
        assert_eq!(
            svc.get_latest(&a.business_id.to_string()).unwrap().status,
            JobStatus::Extended
        );
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(JobStatus::Extended.to_string(), "extended");
        assert_eq!("completed".parse::<JobStatus>().unwrap(), JobStatus::Completed);
        assert_eq!(
            serde_json::to_value(JobStatus::Active).unwrap(),
            serde_json::json!("active")
        );
    }
}
