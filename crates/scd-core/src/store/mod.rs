//! Append-only version storage.
//!
//! A [`VersionStore`] never rewrites a row. Create writes version 1 (or
//! whatever version the caller supplies), Update derives the next version from
//! an existing row and writes it alongside the old one. Uniqueness of
//! `(business_id, version)` is enforced by the table itself, so two writers
//! racing from the same base produce one row and one [`ScdError::Conflict`].

mod batch;
mod database;

pub use database::Database;

use std::marker::PhantomData;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::entity::{
    Entity, SoftDelete, BUSINESS_ID, CREATED_AT, IDENTITY_COLUMNS, TIMESTAMP_COLUMNS, VERSION,
    VERSION_UID,
};
use crate::error::{ScdError, ScdResult};
use crate::query::{Direction, QueryBuilder};
use crate::row::{self, column_list, decode_timestamp, entity_to_values, quote_ident};

/// Change applied to the copy that becomes the next version.
pub type Transform<T> = Box<dyn FnOnce(T) -> T + Send>;

/// Aggregate view of one business id's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub business_id: String,
    pub total_versions: u32,
    pub latest_version: u32,
    pub first_created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// Storage operations for one versioned entity type.
pub trait VersionStore<T: Entity>: Send + Sync {
    /// Persist a fully populated entity. Timestamps are stamped here.
    fn create(&self, entity: T) -> ScdResult<T>;

    /// The row with this version uid.
    fn find_by_uid(&self, uid: &str) -> ScdResult<T>;

    /// Whether a row with this version uid exists.
    fn exists(&self, uid: &str) -> ScdResult<bool>;

    /// Write the successor of the row at `uid`. The row at `uid` is untouched.
    fn update(&self, uid: &str, transform: Transform<T>) -> ScdResult<T>;

    /// The row with the highest version for this business id.
    fn get_latest_version(&self, business_id: &str) -> ScdResult<T>;

    /// A specific version number.
    fn get_version(&self, business_id: &str, version: u32) -> ScdResult<Option<T>>;

    /// Every version, oldest first. Unknown ids yield an empty list.
    fn get_version_history(&self, business_id: &str) -> ScdResult<Vec<T>>;

    /// The version current at `at`.
    fn get_version_at(&self, business_id: &str, at: DateTime<Utc>) -> ScdResult<T>;

    /// Versions created within `[start, end]`, oldest first.
    fn get_versions_in_range(
        &self,
        business_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ScdResult<Vec<T>>;

    fn get_summary(&self, business_id: &str) -> ScdResult<Option<VersionSummary>>;

    /// Total rows across all business ids.
    fn count_all(&self) -> ScdResult<u64>;

    /// Create many entities, written in chunk-sized transactions.
    fn create_batch(&self, entities: Vec<T>) -> ScdResult<Vec<T>>;

    /// Apply updates in order, stopping at the first failure.
    fn update_batch(&self, updates: Vec<(String, Transform<T>)>) -> ScdResult<Vec<T>>;

    /// Start a query over this entity type.
    fn query(&self) -> QueryBuilder<T>;

    /// Write a successor carrying the deletion sentinel.
    fn soft_delete(&self, uid: &str) -> ScdResult<T>
    where
        T: SoftDelete,
    {
        let current = self.find_by_uid(uid)?;
        if current.is_deleted() {
            return Err(ScdError::validation_with_suggestion(
                format!("{} version '{}' is already deleted", T::TABLE, uid),
                "Soft delete the latest version of a live entity",
            ));
        }
        self.update(
            uid,
            Box::new(|mut entity: T| {
                entity.mark_deleted();
                entity
            }),
        )
    }
}

/// SQLite-backed version store for `T`.
pub struct SqliteVersionStore<T: Entity> {
    db: Database,
    batch_size: usize,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for SqliteVersionStore<T> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            batch_size: self.batch_size,
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> SqliteVersionStore<T> {
    /// Create a store on `db`, creating the table if needed.
    pub fn new(db: Database) -> ScdResult<Self> {
        Self::with_config(db, &StoreConfig::default())
    }

    pub fn with_config(db: Database, config: &StoreConfig) -> ScdResult<Self> {
        config.validate()?;
        let store = Self {
            db,
            batch_size: config.batch_size,
            _entity: PhantomData,
        };
        if config.create_schema {
            store.ensure_schema()?;
        }
        Ok(store)
    }

    /// Open the database named by `config` and build a store on it.
    pub fn from_config(config: &StoreConfig) -> ScdResult<Self> {
        let db = Database::from_config(config)?;
        Self::with_config(db, config)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> ScdResult<Self> {
        Self::new(Database::in_memory()?)
    }

    /// DDL for the table and its indexes.
    pub fn schema_sql() -> String {
        let table = quote_ident(T::TABLE);
        let definitions: Vec<String> = T::all_columns()
            .iter()
            .map(|column| {
                let mut def = format!(
                    "{} {}",
                    quote_ident(column.name),
                    column.column_type.sql_type()
                );
                if column.name == VERSION_UID {
                    def.push_str(" PRIMARY KEY");
                }
                if !column.nullable {
                    def.push_str(" NOT NULL");
                }
                if column.name == VERSION {
                    def.push_str(&format!(" CHECK ({} >= 1)", quote_ident(VERSION)));
                }
                def
            })
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {table} (\n    {defs},\n    UNIQUE ({bid}, {ver})\n);\n\
             CREATE INDEX IF NOT EXISTS {by_version} ON {table} ({bid}, {ver} DESC);\n\
             CREATE INDEX IF NOT EXISTS {by_created} ON {table} ({bid}, {created});",
            table = table,
            defs = definitions.join(",\n    "),
            bid = quote_ident(BUSINESS_ID),
            ver = quote_ident(VERSION),
            created = quote_ident(CREATED_AT),
            by_version = quote_ident(&format!("idx_{}_business_version", T::TABLE)),
            by_created = quote_ident(&format!("idx_{}_business_created", T::TABLE)),
        )
    }

    /// Create the table, the `(business_id, version)` constraint and indexes.
    pub fn ensure_schema(&self) -> ScdResult<()> {
        for column in T::COLUMNS {
            let reserved = IDENTITY_COLUMNS
                .iter()
                .chain(TIMESTAMP_COLUMNS.iter())
                .any(|core| core.name == column.name);
            if reserved {
                return Err(ScdError::Configuration(format!(
                    "{} declares core column '{}' as a payload column",
                    T::TABLE,
                    column.name
                )));
            }
        }

        let sql = Self::schema_sql();
        self.db.with_conn(|conn| {
            conn.execute_batch(&sql)?;
            Ok(())
        })?;
        debug!(table = T::TABLE, "Schema ready");
        Ok(())
    }

    fn insert_sql() -> String {
        let count = T::all_columns().len();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(T::TABLE),
            column_list::<T>(),
            vec!["?"; count].join(", ")
        )
    }

    fn validate_identity(entity: &T) -> ScdResult<()> {
        if entity.business_id().trim().is_empty() {
            return Err(ScdError::invalid_identity(format!(
                "{} entity has an empty business id",
                T::TABLE
            )));
        }
        if entity.version_uid().trim().is_empty() {
            return Err(ScdError::invalid_identity(format!(
                "{} entity '{}' has an empty version uid",
                T::TABLE,
                entity.business_id()
            )));
        }
        if entity.version() < 1 {
            return Err(ScdError::invalid_identity(format!(
                "{} entity '{}' has version {}, versions start at 1",
                T::TABLE,
                entity.business_id(),
                entity.version()
            )));
        }
        Ok(())
    }

    /// Map unique-constraint failures to conflicts.
    fn classify_write_error(err: rusqlite::Error, entity: &T) -> ScdError {
        if let rusqlite::Error::SqliteFailure(failure, _) = &err {
            match failure.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return ScdError::duplicate_uid(entity.version_uid())
                }
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => {
                    return ScdError::version_conflict(entity.business_id(), entity.version())
                }
                _ => {}
            }
        }
        err.into()
    }

    /// Versions are dense: anything above 1 needs its predecessor stored.
    fn check_predecessor(conn: &Connection, entity: &T) -> ScdResult<()> {
        let version = entity.version();
        if version <= 1 {
            return Ok(());
        }

        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE {} = ?1 AND {} = ?2)",
            quote_ident(T::TABLE),
            quote_ident(BUSINESS_ID),
            quote_ident(VERSION)
        );
        let found: bool =
            conn.query_row(&sql, params![entity.business_id(), version - 1], |row| row.get(0))?;
        if !found {
            return Err(ScdError::missing_predecessor(
                T::TABLE,
                entity.business_id(),
                version,
            ));
        }
        Ok(())
    }

    /// Predecessor check and insert in one transaction.
    fn insert_row(conn: &mut Connection, entity: &T) -> ScdResult<()> {
        let values = entity_to_values(entity)?;
        let tx = conn.transaction()?;
        Self::check_predecessor(&tx, entity)?;
        tx.execute(&Self::insert_sql(), params_from_iter(values.iter()))
            .map_err(|e| Self::classify_write_error(e, entity))?;
        tx.commit()?;
        Ok(())
    }

    fn remap_not_found<R>(result: ScdResult<R>, err: impl FnOnce() -> ScdError) -> ScdResult<R> {
        result.map_err(|e| if e.is_not_found() { err() } else { e })
    }
}

impl<T: Entity> VersionStore<T> for SqliteVersionStore<T> {
    fn create(&self, mut entity: T) -> ScdResult<T> {
        Self::validate_identity(&entity)?;

        let now = row::now();
        entity.set_created_at(now);
        entity.set_updated_at(now);

        let result = self
            .db
            .with_conn(|conn| Self::insert_row(conn, &entity));
        if let Err(err) = result {
            if matches!(err, ScdError::Conflict { .. }) {
                warn!(
                    table = T::TABLE,
                    business_id = %entity.business_id(),
                    version = entity.version(),
                    error = %err,
                    "Create rejected"
                );
            }
            return Err(err);
        }

        debug!(
            table = T::TABLE,
            business_id = %entity.business_id(),
            version_uid = %entity.version_uid(),
            version = entity.version(),
            "Created version"
        );
        Ok(entity)
    }

    fn find_by_uid(&self, uid: &str) -> ScdResult<T> {
        Self::remap_not_found(
            self.query().where_eq(VERSION_UID, uid).first(),
            || ScdError::not_found_uid(T::TABLE, uid),
        )
    }

    fn exists(&self, uid: &str) -> ScdResult<bool> {
        Ok(self.query().where_eq(VERSION_UID, uid).count()? > 0)
    }

    fn update(&self, uid: &str, transform: Transform<T>) -> ScdResult<T> {
        let base = self.find_by_uid(uid)?;

        let copy = base.copy_for_new_version();
        let (business_id, next_uid, next_version) =
            (copy.business_id(), copy.version_uid(), copy.version());
        if business_id != base.business_id()
            || next_version != base.version() + 1
            || next_uid == base.version_uid()
        {
            return Err(ScdError::invalid_identity(format!(
                "{}::copy_for_new_version must keep the business id, bump the version and issue a fresh uid",
                T::TABLE
            )));
        }

        let mut next = transform(copy);
        if next.business_id() != business_id
            || next.version_uid() != next_uid
            || next.version() != next_version
        {
            return Err(ScdError::invalid_identity(format!(
                "update of {} '{}' tried to change identity fields",
                T::TABLE,
                business_id
            )));
        }

        // Successors must sort after their base even on a coarse clock.
        let mut now = row::now();
        if let Some(previous) = base.created_at() {
            if now <= previous {
                now = previous + Duration::microseconds(1);
            }
        }
        next.set_created_at(now);
        next.set_updated_at(now);

        let result = self.db.with_conn(|conn| Self::insert_row(conn, &next));
        if let Err(err) = result {
            warn!(
                table = T::TABLE,
                business_id = %business_id,
                base_uid = %uid,
                version = next_version,
                error = %err,
                "Update rejected"
            );
            return Err(err);
        }

        debug!(
            table = T::TABLE,
            business_id = %business_id,
            version_uid = %next_uid,
            version = next_version,
            "Created version from update"
        );
        Ok(next)
    }

    fn get_latest_version(&self, business_id: &str) -> ScdResult<T> {
        Self::remap_not_found(
            self.query().for_business_id(business_id).latest().first(),
            || ScdError::not_found_business_id(T::TABLE, business_id),
        )
    }

    fn get_version(&self, business_id: &str, version: u32) -> ScdResult<Option<T>> {
        Ok(self
            .query()
            .for_business_id(business_id)
            .where_eq(VERSION, version)
            .find()?
            .into_iter()
            .next())
    }

    fn get_version_history(&self, business_id: &str) -> ScdResult<Vec<T>> {
        self.query()
            .for_business_id(business_id)
            .order_by(VERSION, Direction::Asc)
            .find()
    }

    fn get_version_at(&self, business_id: &str, at: DateTime<Utc>) -> ScdResult<T> {
        Self::remap_not_found(
            self.query().for_business_id(business_id).as_of(at).first(),
            || ScdError::not_found_as_of(T::TABLE, business_id, at),
        )
    }

    fn get_versions_in_range(
        &self,
        business_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ScdResult<Vec<T>> {
        self.query()
            .for_business_id(business_id)
            .between_dates(start, end)
            .order_by(VERSION, Direction::Asc)
            .find()
    }

    fn get_summary(&self, business_id: &str) -> ScdResult<Option<VersionSummary>> {
        let sql = format!(
            "SELECT COUNT(*), MAX({ver}), MIN({created}), MAX({created}) FROM {table} WHERE {bid} = ?1",
            ver = quote_ident(VERSION),
            created = quote_ident(CREATED_AT),
            table = quote_ident(T::TABLE),
            bid = quote_ident(BUSINESS_ID),
        );

        let row = self.db.with_conn(|conn| {
            Ok(conn
                .query_row(&sql, params![business_id], |row| {
                    let total: u32 = row.get(0)?;
                    if total == 0 {
                        return Ok(None);
                    }
                    let latest: u32 = row.get(1)?;
                    let first: String = row.get(2)?;
                    let last: String = row.get(3)?;
                    Ok(Some((total, latest, first, last)))
                })
                .optional()?
                .flatten())
        })?;

        row.map(|(total, latest, first, last)| {
            Ok(VersionSummary {
                business_id: business_id.to_string(),
                total_versions: total,
                latest_version: latest,
                first_created: decode_timestamp(&first)?,
                last_modified: decode_timestamp(&last)?,
            })
        })
        .transpose()
    }

    fn count_all(&self) -> ScdResult<u64> {
        self.query().count()
    }

    fn create_batch(&self, entities: Vec<T>) -> ScdResult<Vec<T>> {
        self.create_chunked(entities)
    }

    fn update_batch(&self, updates: Vec<(String, Transform<T>)>) -> ScdResult<Vec<T>> {
        self.update_sequential(updates)
    }

    fn query(&self) -> QueryBuilder<T> {
        QueryBuilder::new(self.db.clone())
    }
}
