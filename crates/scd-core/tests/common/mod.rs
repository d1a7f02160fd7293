//! Fixture entity shared by the integration tests.

use chrono::{DateTime, Utc};
use scd_core::{Column, ColumnType, Entity, SoftDelete};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub business_id: Uuid,
    pub version_uid: Uuid,
    pub version: u32,
    pub title: String,
    pub rate: f64,
    pub status: String,
    pub company_id: Uuid,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Engagement {
    pub fn new(title: &str, rate: f64, company_id: Uuid) -> Self {
        Self {
            business_id: Uuid::new_v4(),
            version_uid: Uuid::new_v4(),
            version: 1,
            title: title.to_string(),
            rate,
            status: "active".to_string(),
            company_id,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Entity for Engagement {
    const TABLE: &'static str = "engagements";
    const COLUMNS: &'static [Column] = &[
        Column::new("title", ColumnType::Text),
        Column::new("rate", ColumnType::Real),
        Column::new("status", ColumnType::Text),
        Column::new("company_id", ColumnType::Uuid),
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

impl SoftDelete for Engagement {
    fn mark_deleted(&mut self) {
        self.status = "deleted".to_string();
    }

    fn is_deleted(&self) -> bool {
        self.status == "deleted"
    }
}
