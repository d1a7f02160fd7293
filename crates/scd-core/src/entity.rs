//! The contract every versioned type satisfies.
//!
//! The engine is written once against [`Entity`]. A concrete type declares its
//! table, its payload columns, and how to derive the next version of itself;
//! row mapping goes through its serde representation, so field names must
//! match column names.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use strum::{AsRefStr, Display};

/// Stable identifier shared by every version of one logical entity.
pub const BUSINESS_ID: &str = "business_id";
/// Identifier unique to one version row.
pub const VERSION_UID: &str = "version_uid";
/// Per-business-id sequence number, starting at 1.
pub const VERSION: &str = "version";
/// Stamped by the store when the row is written.
pub const CREATED_AT: &str = "created_at";
/// Stamped by the store when the row is written.
pub const UPDATED_AT: &str = "updated_at";

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    /// Stored as 0/1.
    Boolean,
    /// Stored as fixed-width RFC 3339 text so text order is time order.
    Timestamp,
    /// Stored as hyphenated lowercase text.
    Uuid,
}

impl ColumnType {
    /// SQLite declared type.
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Text | Self::Timestamp | Self::Uuid => "TEXT",
            Self::Integer | Self::Boolean => "INTEGER",
            Self::Real => "REAL",
        }
    }

    /// Whether `contains` filters make sense on this type.
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Text | Self::Uuid)
    }
}

/// One column of an entity's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl Column {
    /// A NOT NULL column.
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: false,
        }
    }

    /// A nullable column.
    pub const fn optional(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: true,
        }
    }
}

/// Columns every versioned table has, in storage order around the payload.
pub const IDENTITY_COLUMNS: [Column; 3] = [
    Column::new(BUSINESS_ID, ColumnType::Text),
    Column::new(VERSION_UID, ColumnType::Text),
    Column::new(VERSION, ColumnType::Integer),
];

/// Timestamp columns following the payload.
pub const TIMESTAMP_COLUMNS: [Column; 2] = [
    Column::new(CREATED_AT, ColumnType::Timestamp),
    Column::new(UPDATED_AT, ColumnType::Timestamp),
];

/// A type whose values are stored as immutable, append-only versions.
///
/// # Example
///
/// ```ignore
/// impl Entity for Job {
///     const TABLE: &'static str = "jobs";
///     const COLUMNS: &'static [Column] = &[
///         Column::new("title", ColumnType::Text),
///         Column::new("rate", ColumnType::Real),
///     ];
///     // accessors ...
/// }
/// ```
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Table holding every version of this type.
    const TABLE: &'static str;

    /// Payload columns. Identity and timestamp columns are implicit.
    const COLUMNS: &'static [Column];

    fn business_id(&self) -> String;

    fn version_uid(&self) -> String;

    fn version(&self) -> u32;

    /// `None` until the store stamps it.
    fn created_at(&self) -> Option<DateTime<Utc>>;

    /// Copy the payload into the next version: same business id, fresh
    /// version uid, `version + 1`, timestamps unset.
    fn copy_for_new_version(&self) -> Self;

    fn set_created_at(&mut self, at: DateTime<Utc>);

    fn set_updated_at(&mut self, at: DateTime<Utc>);

    /// Every column in storage order.
    fn all_columns() -> Vec<Column> {
        IDENTITY_COLUMNS
            .iter()
            .chain(Self::COLUMNS.iter())
            .chain(TIMESTAMP_COLUMNS.iter())
            .copied()
            .collect()
    }

    /// Look up a column by name.
    fn column(name: &str) -> Option<Column> {
        IDENTITY_COLUMNS
            .iter()
            .chain(Self::COLUMNS.iter())
            .chain(TIMESTAMP_COLUMNS.iter())
            .find(|c| c.name == name)
            .copied()
    }
}

/// Entities that support logical deletion.
///
/// Deletion writes a new version carrying a sentinel; history is kept.
pub trait SoftDelete: Entity {
    /// Set the sentinel on a copy that is about to become the next version.
    fn mark_deleted(&mut self);

    fn is_deleted(&self) -> bool;
}
