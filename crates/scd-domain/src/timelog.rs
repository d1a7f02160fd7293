//! Timelogs: time a contractor spent on one specific job version.

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

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogType {
    /// Recorded by the tracker.
    #[default]
    Captured,
    /// Corrected afterwards.
    Adjusted,
}

/// One version of a timelog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timelog {
    pub business_id: Uuid,
    pub version_uid: Uuid,
    pub version: u32,
    pub contractor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Milliseconds between start and end.
    pub duration: i64,
    pub log_type: LogType,
    /// The job version this time was logged against.
    pub job_uid: Uuid,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTimelog {
    #[serde(default)]
    pub business_id: Option<Uuid>,
    pub contractor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub log_type: LogType,
    pub job_uid: Uuid,
}

/// Fields a timelog update may change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelogUpdate {
    pub contractor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Only deletion writes a zero-length span, so live timelogs must be positive.
fn span_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> ScdResult<i64> {
    if end <= start {
        return Err(ScdError::validation(format!(
            "timelog must end after it starts; got {} to {}",
            end.to_rfc3339(),
            start.to_rfc3339()
        )));
    }
    Ok((end - start).num_milliseconds())
}

impl Timelog {
    pub fn new(input: NewTimelog) -> ScdResult<Self> {
        let duration = span_ms(input.start_time, input.end_time)?;
        Ok(Self {
            business_id: input.business_id.unwrap_or_else(Uuid::new_v4),
            version_uid: Uuid::new_v4(),
            version: 1,
            contractor_id: input.contractor_id,
            start_time: input.start_time,
            end_time: input.end_time,
            duration,
            log_type: input.log_type,
            job_uid: input.job_uid,
            created_at: None,
            updated_at: None,
        })
    }
}

impl Entity for Timelog {
    const TABLE: &'static str = "timelogs";
    const COLUMNS: &'static [Column] = &[
        Column::new("contractor_id", ColumnType::Uuid),
        Column::new("start_time", ColumnType::Timestamp),
        Column::new("end_time", ColumnType::Timestamp),
        Column::new("duration", ColumnType::Integer),
        Column::new("log_type", ColumnType::Text),
        Column::new("job_uid", ColumnType::Uuid),
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

impl SoftDelete for Timelog {
    /// Collapse the span to zero length.
    fn mark_deleted(&mut self) {
        self.end_time = self.start_time;
        self.duration = 0;
    }

    fn is_deleted(&self) -> bool {
        self.end_time == self.start_time && self.duration == 0
    }
}

#[derive(Clone)]
pub struct TimelogService {
    store: Arc<dyn VersionStore<Timelog>>,
    jobs: Arc<dyn VersionStore<Job>>,
}

impl TimelogService {
    pub fn new(store: Arc<dyn VersionStore<Timelog>>, jobs: Arc<dyn VersionStore<Job>>) -> Self {
        Self { store, jobs }
    }

    /// Create version 1. The referenced job version must exist.
    pub fn create(&self, input: NewTimelog) -> ScdResult<Timelog> {
        let job_uid = input.job_uid.to_string();
        if !self.jobs.exists(&job_uid)? {
            return Err(ScdError::not_found_uid(Job::TABLE, job_uid));
        }

        let timelog = self.store.create(Timelog::new(input)?)?;
        info!(
            timelog_id = %timelog.business_id,
            job_uid = %timelog.job_uid,
            duration_ms = timelog.duration,
            "Created timelog"
        );
        Ok(timelog)
    }

    pub fn get_by_uid(&self, uid: &str) -> ScdResult<Timelog> {
        self.store.find_by_uid(uid)
    }

    /// New version with changed bounds; marks it adjusted.
    pub fn update(&self, uid: &str, changes: TimelogUpdate) -> ScdResult<Timelog> {
        let duration = span_ms(changes.start_time, changes.end_time)?;
        self.store.update(
            uid,
            Box::new(move |mut timelog: Timelog| {
                timelog.contractor_id = changes.contractor_id;
                timelog.start_time = changes.start_time;
                timelog.end_time = changes.end_time;
                timelog.duration = duration;
                timelog.log_type = LogType::Adjusted;
                timelog
            }),
        )
    }

    pub fn delete(&self, uid: &str) -> ScdResult<Timelog> {
        self.store.soft_delete(uid)
    }

    /// Latest timelogs of a contractor, newest start first.
    pub fn by_contractor(&self, contractor_id: Uuid) -> ScdResult<Vec<Timelog>> {
        self.store
            .query()
            .latest()
            .where_eq("contractor_id", contractor_id.to_string())
            .order_by("start_time", Direction::Desc)
            .find()
    }

    /// Latest captured timelogs of a contractor recorded within the period.
    pub fn by_contractor_in_period(
        &self,
        contractor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ScdResult<Vec<Timelog>> {
        self.store
            .query()
            .latest()
            .where_eq("contractor_id", contractor_id.to_string())
            .between_dates(start, end)
            .where_eq("log_type", LogType::Captured.as_ref())
            .order_by("start_time", Direction::Desc)
            .find()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobService, JobStatus, NewJob};
    use chrono::Duration;
    use scd_core::row::now;
    use scd_core::{Database, ErrorCode, SqliteVersionStore};

    struct Fixture {
        jobs: JobService,
        timelogs: TimelogService,
        job: Job,
    }

    fn fixture() -> Fixture {
        let db = Database::in_memory().unwrap();
        let job_store: Arc<dyn VersionStore<Job>> =
            Arc::new(SqliteVersionStore::<Job>::new(db.clone()).unwrap());
        let timelog_store = Arc::new(SqliteVersionStore::<Timelog>::new(db).unwrap());

        let jobs = JobService::new(job_store.clone());
        let job = jobs
            .create_job(NewJob {
                business_id: None,
                status: JobStatus::Active,
                rate: 20.0,
                title: "Software Engineer".to_string(),
                company_id: Uuid::new_v4(),
                contractor_id: Uuid::new_v4(),
            })
            .unwrap();

        Fixture {
            jobs,
            timelogs: TimelogService::new(timelog_store, job_store),
            job,
        }
    }

    fn hour_from(job: &Job, start: DateTime<Utc>) -> NewTimelog {
        NewTimelog {
            business_id: None,
            contractor_id: job.contractor_id,
            start_time: start,
            end_time: start + Duration::hours(1),
            log_type: LogType::Captured,
            job_uid: job.version_uid,
        }
    }

    #[test]
    fn test_create_derives_duration() {
        let f = fixture();
        let start = now() - Duration::hours(3);
        let timelog = f.timelogs.create(hour_from(&f.job, start)).unwrap();
        assert_eq!(timelog.duration, 3_600_000);
        assert_eq!(timelog.version, 1);
    }

    #[test]
    fn test_create_requires_existing_job_version() {
        let f = fixture();
        let mut input = hour_from(&f.job, now());
        input.job_uid = Uuid::new_v4();
        let err = f.timelogs.create(input).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFoundUid);
    }

    #[test]
    fn test_create_rejects_negative_span() {
        let f = fixture();
        let mut input = hour_from(&f.job, now());
        input.end_time = input.start_time - Duration::minutes(1);
        assert!(matches!(
            f.timelogs.create(input).unwrap_err(),
            ScdError::Validation { .. }
        ));
    }

    #[test]
    fn test_zero_length_span_is_rejected() {
        let f = fixture();
        let start = now() - Duration::hours(1);

        let mut input = hour_from(&f.job, start);
        input.end_time = input.start_time;
        assert!(matches!(
            f.timelogs.create(input).unwrap_err(),
            ScdError::Validation { .. }
        ));

        let v1 = f.timelogs.create(hour_from(&f.job, start)).unwrap();
        let err = f
            .timelogs
            .update(
                &v1.version_uid.to_string(),
                TimelogUpdate {
                    contractor_id: v1.contractor_id,
                    start_time: start,
                    end_time: start,
                },
            )
            .unwrap_err();
        assert!(matches!(err, ScdError::Validation { .. }));

        let stored = f.timelogs.get_by_uid(&v1.version_uid.to_string()).unwrap();
        assert!(!stored.is_deleted());
        assert_eq!(stored.version, 1);
    }

    #[test]
    fn test_update_marks_adjusted() {
        let f = fixture();
        let start = now() - Duration::hours(2);
        let v1 = f.timelogs.create(hour_from(&f.job, start)).unwrap();
        let v2 = f
            .timelogs
            .update(
                &v1.version_uid.to_string(),
                TimelogUpdate {
                    contractor_id: v1.contractor_id,
                    start_time: start,
                    end_time: start + Duration::minutes(90),
                },
            )
            .unwrap();
        assert_eq!(v2.duration, 5_400_000);
        assert_eq!(v2.log_type, LogType::Adjusted);
        assert_eq!(v2.job_uid, v1.job_uid);
    }

    #[test]
    fn test_delete_collapses_span() {
        let f = fixture();
        let v1 = f.timelogs.create(hour_from(&f.job, now())).unwrap();
        let v2 = f.timelogs.delete(&v1.version_uid.to_string()).unwrap();
        assert_eq!(v2.start_time, v2.end_time);
        assert_eq!(v2.duration, 0);
        assert!(f.timelogs.delete(&v2.version_uid.to_string()).is_err());
    }

    #[test]
    fn test_period_query_returns_latest_captured_only() {
        let f = fixture();
        let start = now() - Duration::hours(5);
        let captured = f.timelogs.create(hour_from(&f.job, start)).unwrap();
        let adjusted = f
            .timelogs
            .create(hour_from(&f.job, start + Duration::hours(2)))
            .unwrap();
        f.timelogs
            .update(
                &adjusted.version_uid.to_string(),
                TimelogUpdate {
                    contractor_id: adjusted.contractor_id,
                    start_time: adjusted.start_time,
                    end_time: adjusted.end_time + Duration::minutes(10),
                },
            )
            .unwrap();

        let period = f
            .timelogs
            .by_contractor_in_period(
                f.job.contractor_id,
                now() - Duration::hours(1),
                now() + Duration::hours(1),
            )
            .unwrap();
        assert_eq!(period, vec![captured]);

        assert_eq!(f.timelogs.by_contractor(f.job.contractor_id).unwrap().len(), 2);
        assert!(f.jobs.get_by_uid(&f.job.version_uid.to_string()).is_ok());
    }
}
