//! Lowering of filters to parameterized SQLite predicates.

use rusqlite::types::Value;

use crate::entity::Column;
use crate::error::{ScdError, ScdResult};
use crate::query::filter::{Filter, FilterCondition, FilterOperator, FilterTranslator};
use crate::row::{quote_ident, to_sql_value};

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Value>,
}

impl SqlFragment {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Translates [`Filter`] trees against one table's columns.
///
/// Column names are checked against the schema and values are converted to
/// the column's storage type, so no caller text reaches the SQL unquoted.
pub struct SqlTranslator<'a> {
    table: &'a str,
    columns: &'a [Column],
}

impl<'a> SqlTranslator<'a> {
    pub fn new(table: &'a str, columns: &'a [Column]) -> Self {
        Self { table, columns }
    }

    /// Resolve a column name or fail with a validation error.
    pub fn column(&self, name: &str) -> ScdResult<&'a Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ScdError::unknown_column(self.table, name))
    }

    fn placeholders(count: usize) -> String {
        vec!["?"; count].join(", ")
    }

    fn condition(&self, condition: &FilterCondition) -> ScdResult<SqlFragment> {
        let column = self.column(&condition.field)?;
        let ident = quote_ident(column.name);

        let compare = |op: &str, value: &serde_json::Value| -> ScdResult<SqlFragment> {
            Ok(SqlFragment::new(
                format!("{} {} ?", ident, op),
                vec![to_sql_value(column, value)?],
            ))
        };

        match &condition.operator {
            FilterOperator::Eq(value) if value.is_null() => {
                Ok(SqlFragment::new(format!("{} IS NULL", ident), vec![]))
            }
            FilterOperator::Ne(value) if value.is_null() => {
                Ok(SqlFragment::new(format!("{} IS NOT NULL", ident), vec![]))
            }
            FilterOperator::Eq(value) => compare("=", value),
            FilterOperator::Ne(value) => compare("<>", value),
            FilterOperator::Gt(value) => compare(">", value),
            FilterOperator::Gte(value) => compare(">=", value),
            FilterOperator::Lt(value) => compare("<", value),
            FilterOperator::Lte(value) => compare("<=", value),
            FilterOperator::In(values) | FilterOperator::Nin(values) => {
                if values.is_empty() {
                    return Err(ScdError::validation_with_suggestion(
                        format!("empty value list for '{}'", column.name),
                        "Pass at least one value to in/not-in filters",
                    ));
                }
                let params = values
                    .iter()
                    .map(|v| to_sql_value(column, v))
                    .collect::<ScdResult<Vec<_>>>()?;
                let keyword = match condition.operator {
                    FilterOperator::Nin(_) => "NOT IN",
                    _ => "IN",
                };
                Ok(SqlFragment::new(
                    format!("{} {} ({})", ident, keyword, Self::placeholders(params.len())),
                    params,
                ))
            }
            FilterOperator::Contains(needle) => {
                if !column.column_type.is_textual() {
                    return Err(ScdError::validation(format!(
                        "contains is not supported on {} column '{}'",
                        column.column_type, column.name
                    )));
                }
                let escaped = needle
                    .replace('\\', "\\\\")
                    .replace('%', "\\%")
                    .replace('_', "\\_");
                Ok(SqlFragment::new(
                    format!("{} LIKE ? ESCAPE '\\'", ident),
                    vec![Value::Text(format!("%{}%", escaped))],
                ))
            }
            FilterOperator::Between { min, max } => Ok(SqlFragment::new(
                format!("{} BETWEEN ? AND ?", ident),
                vec![to_sql_value(column, min)?, to_sql_value(column, max)?],
            )),
            FilterOperator::IsNull => Ok(SqlFragment::new(format!("{} IS NULL", ident), vec![])),
            FilterOperator::IsNotNull => {
                Ok(SqlFragment::new(format!("{} IS NOT NULL", ident), vec![]))
            }
        }
    }

    fn join(&self, filters: &[Filter], separator: &str, empty: &str) -> ScdResult<SqlFragment> {
        if filters.is_empty() {
            return Ok(SqlFragment::new(empty, vec![]));
        }

        let mut parts = Vec::with_capacity(filters.len());
        let mut params = Vec::new();
        for filter in filters {
            let fragment = self.translate(filter)?;
            parts.push(format!("({})", fragment.sql));
            params.extend(fragment.params);
        }
        Ok(SqlFragment::new(parts.join(separator), params))
    }
}

impl FilterTranslator for SqlTranslator<'_> {
    type Output = SqlFragment;
    type Error = ScdError;

    fn translate(&self, filter: &Filter) -> ScdResult<SqlFragment> {
        match filter {
            Filter::Condition(condition) => self.condition(condition),
            Filter::And(filters) => self.join(filters, " AND ", "1 = 1"),
            Filter::Or(filters) => self.join(filters, " OR ", "1 = 0"),
            Filter::Not(inner) => {
                let fragment = self.translate(inner)?;
                Ok(SqlFragment::new(
                    format!("NOT ({})", fragment.sql),
                    fragment.params,
                ))
            }
        }
    }
}
