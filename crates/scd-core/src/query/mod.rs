//! Fluent, composable reads over a versioned table.
//!
//! A [`QueryBuilder`] only records what the caller asked for. Nothing touches
//! the database until one of the terminal operations ([`QueryBuilder::find`],
//! [`QueryBuilder::first`], [`QueryBuilder::count`]) runs, and each of those
//! lowers the builder to exactly one SQL statement.
//!
//! ```ignore
//! let active = store
//!     .query()
//!     .latest()
//!     .filter(Filter::eq("company_id", company_id.to_string()))
//!     .filter(Filter::eq("status", "active"))
//!     .order_by("created_at", Direction::Desc)
//!     .find()?;
//! ```

pub mod filter;
pub mod sql;

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use rusqlite::params_from_iter;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use tracing::debug;

use crate::entity::{Entity, BUSINESS_ID, CREATED_AT, VERSION};
use crate::error::{ScdError, ScdResult};
use crate::resolver::Resolution;
use crate::row::{column_list, entity_from_row, quote_ident, timestamp_value};
use crate::store::Database;

pub use filter::{Filter, FilterCondition, FilterOperator, FilterTranslator};
pub use sql::{SqlFragment, SqlTranslator};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    #[strum(serialize = "ASC")]
    Asc,
    #[strum(serialize = "DESC")]
    Desc,
}

/// One sort clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

/// Builder for reads over the raw, latest, or as-of row set of `T`.
///
/// Methods consume and return the builder; it is a plain value owned by one
/// caller and can be cloned to branch a partially built query.
pub struct QueryBuilder<T: Entity> {
    db: Database,
    filters: Vec<Filter>,
    orders: Vec<OrderBy>,
    limit: Option<usize>,
    offset: Option<usize>,
    latest: bool,
    with_history: bool,
    as_of: Option<DateTime<Utc>>,
    created_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
    scope: Option<String>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for QueryBuilder<T> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            filters: self.filters.clone(),
            orders: self.orders.clone(),
            limit: self.limit,
            offset: self.offset,
            latest: self.latest,
            with_history: self.with_history,
            as_of: self.as_of,
            created_between: self.created_between,
            scope: self.scope.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> QueryBuilder<T> {
    pub(crate) fn new(db: Database) -> Self {
        Self {
            db,
            filters: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            latest: false,
            with_history: false,
            as_of: None,
            created_between: None,
            scope: None,
            _entity: PhantomData,
        }
    }

    /// Read from the latest version of each business id.
    pub fn latest(mut self) -> Self {
        self.latest = true;
        self
    }

    /// Read every version; turns [`Self::latest`] into a no-op.
    pub fn with_history(mut self) -> Self {
        self.with_history = true;
        self
    }

    /// Read the version of each business id current at `cutoff`.
    pub fn as_of(mut self, cutoff: DateTime<Utc>) -> Self {
        self.as_of = Some(cutoff);
        self
    }

    /// Keep rows whose `created_at` lies in `[start, end]`.
    pub fn between_dates(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.created_between = Some((start, end));
        self
    }

    /// Restrict the input to one business id.
    pub fn for_business_id(mut self, business_id: impl Into<String>) -> Self {
        self.scope = Some(business_id.into());
        self
    }

    /// Add a predicate. All predicates must hold.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Shorthand for an equality predicate.
    pub fn where_eq(self, column: &str, value: impl Into<serde_json::Value>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    /// Membership predicate.
    pub fn where_in<V: Into<serde_json::Value>>(
        self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filter(Filter::in_list(column, values))
    }

    /// Append a sort clause. Clauses apply in the order given.
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.orders.push(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// The reduction the base row set goes through, if any.
    ///
    /// `latest` wins over `as_of`; `with_history` cancels `latest`.
    pub fn resolution(&self) -> Option<Resolution> {
        if self.latest && !self.with_history {
            Some(Resolution::Latest)
        } else {
            self.as_of.map(Resolution::AsOf)
        }
    }

    /// Lower to the SELECT statement `find` would run.
    pub fn to_sql(&self) -> ScdResult<SqlFragment> {
        let columns = T::all_columns();
        let translator = SqlTranslator::new(T::TABLE, &columns);
        let cols = column_list::<T>();

        let (source, mut params) = match self.resolution() {
            Some(resolution) => resolution.source_sql(T::TABLE, &cols, self.scope.as_deref()),
            None => match &self.scope {
                Some(business_id) => (
                    format!(
                        "SELECT {} FROM {} WHERE {} = ?",
                        cols,
                        quote_ident(T::TABLE),
                        quote_ident(BUSINESS_ID)
                    ),
                    vec![rusqlite::types::Value::Text(business_id.clone())],
                ),
                None => (
                    format!("SELECT {} FROM {}", cols, quote_ident(T::TABLE)),
                    vec![],
                ),
            },
        };

        let mut conditions = Vec::new();
        for filter in &self.filters {
            let fragment = translator.translate(filter)?;
            conditions.push(format!("({})", fragment.sql));
            params.extend(fragment.params);
        }

        if let Some((start, end)) = self.created_between {
            if start > end {
                return Err(ScdError::validation(format!(
                    "date range start {} is after end {}",
                    start.to_rfc3339(),
                    end.to_rfc3339()
                )));
            }
            conditions.push(format!("{} BETWEEN ? AND ?", quote_ident(CREATED_AT)));
            params.push(timestamp_value(&start));
            params.push(timestamp_value(&end));
        }

        let mut sql = format!("SELECT {} FROM ({}) AS base", cols, source);
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        let orders = if self.orders.is_empty() {
            vec![
                format!("{} ASC", quote_ident(BUSINESS_ID)),
                format!("{} ASC", quote_ident(VERSION)),
            ]
        } else {
            self.orders
                .iter()
                .map(|order| {
                    let column = translator.column(&order.column)?;
                    Ok(format!("{} {}", quote_ident(column.name), order.direction))
                })
                .collect::<ScdResult<Vec<_>>>()?
        };
        sql.push_str(" ORDER BY ");
        sql.push_str(&orders.join(", "));

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset))
            }
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded.
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        Ok(SqlFragment::new(sql, params))
    }

    /// All matching rows.
    pub fn find(&self) -> ScdResult<Vec<T>> {
        let fragment = self.to_sql()?;
        debug!(table = T::TABLE, sql = %fragment.sql, "Running query");

        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&fragment.sql)?;
            let rows = stmt.query_map(params_from_iter(fragment.params.iter()), |row| {
                Ok(entity_from_row::<T>(row))
            })?;

            rows.map(|r| r.map_err(ScdError::from).and_then(|inner| inner))
                .collect()
        })
    }

    /// The first matching row.
    pub fn first(&self) -> ScdResult<T> {
        let mut single = self.clone();
        single.limit = Some(self.limit.map_or(1, |limit| limit.min(1)));

        single.find()?.into_iter().next().ok_or_else(|| {
            ScdError::not_found(format!("no {} row matched the query", T::TABLE))
        })
    }

    /// Number of rows `find` would return.
    pub fn count(&self) -> ScdResult<u64> {
        let fragment = self.to_sql()?;
        let sql = format!("SELECT COUNT(*) FROM ({})", fragment.sql);
        debug!(table = T::TABLE, sql = %sql, "Running count");

        self.db.with_conn(|conn| {
            let count: i64 = conn.query_row(&sql, params_from_iter(fragment.params.iter()), |row| {
                row.get(0)
            })?;
            Ok(count.max(0) as u64)
        })
    }
}
