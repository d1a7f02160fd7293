//! Fixture entity for unit tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{Column, ColumnType, Entity, SoftDelete};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub business_id: String,
    pub version_uid: String,
    pub version: u32,
    pub title: String,
    pub rate: f64,
    pub active: bool,
    pub note: Option<String>,
    pub owner_id: Uuid,
    pub starts_at: DateTime<Utc>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Contract {
    pub fn new(title: &str, rate: f64) -> Self {
        Self {
            business_id: Uuid::new_v4().to_string(),
            version_uid: Uuid::new_v4().to_string(),
            version: 1,
            title: title.to_string(),
            rate,
            active: true,
            note: None,
            owner_id: Uuid::new_v4(),
            starts_at: DateTime::parse_from_rfc3339("2025-07-26T20:26:00Z")
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            created_at: None,
            updated_at: None,
        }
    }
}

impl Entity for Contract {
    const TABLE: &'static str = "contracts";
    const COLUMNS: &'static [Column] = &[
        Column::new("title", ColumnType::Text),
        Column::new("rate", ColumnType::Real),
        Column::new("active", ColumnType::Boolean),
        Column::optional("note", ColumnType::Text),
        Column::new("owner_id", ColumnType::Uuid),
        Column::new("starts_at", ColumnType::Timestamp),
    ];

    fn business_id(&self) -> String {
        self.business_id.clone()
    }

    fn version_uid(&self) -> String {
        self.version_uid.clone()
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn copy_for_new_version(&self) -> Self {
        Self {
            version_uid: Uuid::new_v4().to_string(),
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

impl SoftDelete for Contract {
    fn mark_deleted(&mut self) {
        self.active = false;
    }

    fn is_deleted(&self) -> bool {
        !self.active
    }
}
