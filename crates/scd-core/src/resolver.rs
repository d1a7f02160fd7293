//! Reduction of a versioned row set to one row per business id.
//!
//! Both reductions partition by business id and keep the extremal member of
//! each partition:
//!
//! - [`Resolution::Latest`] keeps the maximum `version`.
//! - [`Resolution::AsOf`] drops rows created after the cutoff, then keeps the
//!   maximum `created_at`, ties broken by maximum `version`.
//!
//! [`Resolution::source_sql`] lowers to a `ROW_NUMBER()` ranking subquery;
//! [`Resolution::apply`] is the equivalent grouped pass in memory.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;

use crate::entity::{Entity, BUSINESS_ID, CREATED_AT, VERSION};
use crate::row::{quote_ident, timestamp_value};

/// Which reduction to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Maximum version per business id.
    Latest,
    /// State current at the cutoff.
    AsOf(DateTime<Utc>),
}

impl Resolution {
    fn rank_order(&self) -> String {
        match self {
            Self::Latest => format!("{} DESC", quote_ident(VERSION)),
            Self::AsOf(_) => format!(
                "{} DESC, {} DESC",
                quote_ident(CREATED_AT),
                quote_ident(VERSION)
            ),
        }
    }

    /// SQL yielding the reduced row set with `columns` selected.
    ///
    /// `scope` restricts the input to one business id before ranking; the
    /// partition key makes that equivalent to filtering afterwards.
    pub fn source_sql(
        &self,
        table: &str,
        columns: &str,
        scope: Option<&str>,
    ) -> (String, Vec<Value>) {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some(business_id) = scope {
            conditions.push(format!("{} = ?", quote_ident(BUSINESS_ID)));
            params.push(Value::Text(business_id.to_string()));
        }
        if let Self::AsOf(cutoff) = self {
            conditions.push(format!("{} <= ?", quote_ident(CREATED_AT)));
            params.push(timestamp_value(cutoff));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT {cols} FROM (SELECT {cols}, ROW_NUMBER() OVER (PARTITION BY {pk} ORDER BY {order}) AS rn FROM {table}{where_clause}) WHERE rn = 1",
            cols = columns,
            pk = quote_ident(BUSINESS_ID),
            order = self.rank_order(),
            table = quote_ident(table),
            where_clause = where_clause,
        );

        (sql, params)
    }

    /// Reduce `rows` in memory. Output is ordered by business id.
    ///
    /// Rows without `created_at` never qualify for an as-of cutoff.
    pub fn apply<T, I>(&self, rows: I) -> Vec<T>
    where
        T: Entity,
        I: IntoIterator<Item = T>,
    {
        let mut best: BTreeMap<String, T> = BTreeMap::new();

        for row in rows {
            if let Self::AsOf(cutoff) = self {
                match row.created_at() {
                    Some(at) if at <= *cutoff => {}
                    _ => continue,
                }
            }

            let key = row.business_id();
            let replace = match best.get(&key) {
                None => true,
                Some(current) => self.outranks(&row, current),
            };
            if replace {
                best.insert(key, row);
            }
        }

        best.into_values().collect()
    }

    fn outranks<T: Entity>(&self, candidate: &T, current: &T) -> bool {
        match self {
            Self::Latest => candidate.version() > current.version(),
            Self::AsOf(_) => {
                (candidate.created_at(), candidate.version())
                    > (current.created_at(), current.version())
            }
        }
    }
}
