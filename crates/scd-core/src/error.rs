//! Error types for scd operations.
//!
//! Every engine operation returns [`ScdResult`]. Errors carry a structured
//! [`ErrorCode`] so collaborators can map them to transport responses without
//! matching on message text.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for scd operations.
pub type ScdResult<T> = Result<T, ScdError>;

/// Main error type for all scd operations.
#[derive(Error, Debug)]
pub enum ScdError {
    /// No row matches the requested version uid, business id, or as-of bound.
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        key: Option<String>,
    },

    /// A concurrent write already claimed this identity.
    #[error("Version conflict: {message}")]
    Conflict {
        message: String,
        code: ErrorCode,
        business_id: Option<String>,
        version: Option<u32>,
    },

    /// Malformed input (unknown column, mistyped filter value, bad identity).
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// Backend failure not classified above.
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Entity <-> row mapping failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A batch stopped part way. Rows listed in `committed` stay written.
    #[error("Batch aborted at '{failed_key}' after {} committed row(s): {source}", .committed.len())]
    Batch {
        committed: Vec<String>,
        failed_key: String,
        #[source]
        source: Box<ScdError>,
    },
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Not found (NF_xxx)
    NotFoundUid,
    NotFoundBusinessId,
    NotFoundAsOf,
    NotFoundQuery,

    // Conflict (CFL_xxx)
    ConflictVersion,
    ConflictUid,

    // Validation (VAL_xxx)
    ValInvalidInput,
    ValUnknownColumn,
    ValTypeMismatch,
    ValInvalidIdentity,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,
    DbLockPoisoned,

    // Parse (PARSE_xxx)
    ParseInvalidRow,

    // Batch
    BatchAborted,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFoundUid => "NF_001",
            ErrorCode::NotFoundBusinessId => "NF_002",
            ErrorCode::NotFoundAsOf => "NF_003",
            ErrorCode::NotFoundQuery => "NF_004",
            ErrorCode::ConflictVersion => "CFL_001",
            ErrorCode::ConflictUid => "CFL_002",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValUnknownColumn => "VAL_002",
            ErrorCode::ValTypeMismatch => "VAL_003",
            ErrorCode::ValInvalidIdentity => "VAL_004",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::DbLockPoisoned => "DB_003",
            ErrorCode::ParseInvalidRow => "PARSE_001",
            ErrorCode::BatchAborted => "BATCH_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl ScdError {
    /// No row carries this version uid.
    pub fn not_found_uid(table: &str, uid: impl Into<String>) -> Self {
        let uid = uid.into();
        Self::NotFound {
            message: format!("{} row with version uid '{}' not found", table, uid),
            code: ErrorCode::NotFoundUid,
            key: Some(uid),
        }
    }

    /// No row exists for this business id.
    pub fn not_found_business_id(table: &str, business_id: impl Into<String>) -> Self {
        let id = business_id.into();
        Self::NotFound {
            message: format!("{} entity with business id '{}' not found", table, id),
            code: ErrorCode::NotFoundBusinessId,
            key: Some(id),
        }
    }

    /// No version of this business id existed at the cutoff.
    pub fn not_found_as_of(
        table: &str,
        business_id: impl Into<String>,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let id = business_id.into();
        Self::NotFound {
            message: format!(
                "{} entity '{}' has no version created at or before {}",
                table,
                id,
                cutoff.to_rfc3339()
            ),
            code: ErrorCode::NotFoundAsOf,
            key: Some(id),
        }
    }

    /// A query terminal found no rows.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: ErrorCode::NotFoundQuery,
            key: None,
        }
    }

    /// `(business_id, version)` is already taken.
    pub fn version_conflict(business_id: impl Into<String>, version: u32) -> Self {
        let id = business_id.into();
        Self::Conflict {
            message: format!(
                "version {} of '{}' was already written by another update",
                version, id
            ),
            code: ErrorCode::ConflictVersion,
            business_id: Some(id),
            version: Some(version),
        }
    }

    /// The version uid is already taken.
    pub fn duplicate_uid(uid: impl Into<String>) -> Self {
        Self::Conflict {
            message: format!("version uid '{}' already exists", uid.into()),
            code: ErrorCode::ConflictUid,
            business_id: None,
            version: None,
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// The column is not part of the entity's schema.
    pub fn unknown_column(table: &str, column: &str) -> Self {
        let mut details = HashMap::new();
        details.insert("table".to_string(), table.to_string());
        details.insert("column".to_string(), column.to_string());
        Self::Validation {
            message: format!("unknown column '{}' on table '{}'", column, table),
            code: ErrorCode::ValUnknownColumn,
            details,
            suggestion: Some("Use a core column or one declared in Entity::COLUMNS".to_string()),
        }
    }

    /// A value does not fit the column type.
    pub fn type_mismatch(column: &str, expected: &str, got: &serde_json::Value) -> Self {
        let mut details = HashMap::new();
        details.insert("column".to_string(), column.to_string());
        details.insert("expected".to_string(), expected.to_string());
        Self::Validation {
            message: format!("column '{}' expects {} but got {}", column, expected, got),
            code: ErrorCode::ValTypeMismatch,
            details,
            suggestion: None,
        }
    }

    /// The entity's identity fields are unusable.
    pub fn invalid_identity(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidIdentity,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// `version` was written without `version - 1` existing for the id.
    pub fn missing_predecessor(table: &str, business_id: impl Into<String>, version: u32) -> Self {
        let id = business_id.into();
        let mut details = HashMap::new();
        details.insert("business_id".to_string(), id.clone());
        details.insert("version".to_string(), version.to_string());
        Self::Validation {
            message: format!(
                "{} entity '{}' has no version {} to follow with version {}",
                table,
                id,
                version.saturating_sub(1),
                version
            ),
            code: ErrorCode::ValInvalidIdentity,
            details,
            suggestion: Some("Create version 1 first, then derive later versions with update".to_string()),
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// The connection mutex was poisoned by a panicking holder.
    pub fn lock_poisoned(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            code: ErrorCode::DbLockPoisoned,
            source: None,
        }
    }

    /// A stored row could not be decoded.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            code: ErrorCode::ParseInvalidRow,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { code, .. } => *code,
            Self::Conflict { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::Storage { code, .. } => *code,
            Self::Batch { .. } => ErrorCode::BatchAborted,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether re-invoking the operation may succeed.
    ///
    /// Only version conflicts qualify, and only after re-reading the latest
    /// version. For batches this looks at the failing item.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Conflict { code, .. } => *code == ErrorCode::ConflictVersion,
            Self::Batch { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Whether this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::NotFound { .. } => Some("Please check the identifier and ensure it exists"),
            Self::Conflict { .. } => {
                Some("Re-read the latest version and apply the change to it")
            }
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::Storage { .. } => Some("Please check the database path and permissions"),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for ScdError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}
