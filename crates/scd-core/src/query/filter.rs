//! Filter predicates for versioned queries.

use serde::{Deserialize, Serialize};

/// Comparison applied to one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Equal to. `null` means IS NULL.
    Eq(serde_json::Value),
    /// Not equal to. `null` means IS NOT NULL.
    Ne(serde_json::Value),
    Gt(serde_json::Value),
    Gte(serde_json::Value),
    Lt(serde_json::Value),
    Lte(serde_json::Value),
    In(Vec<serde_json::Value>),
    Nin(Vec<serde_json::Value>),
    /// Contains substring (text columns only).
    Contains(String),
    /// Inclusive range.
    Between {
        min: serde_json::Value,
        max: serde_json::Value,
    },
    IsNull,
    IsNotNull,
}

/// A single filter condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    /// Column name to filter on.
    pub field: String,
    /// Operator to apply.
    pub operator: FilterOperator,
}

impl FilterCondition {
    fn new(field: impl Into<String>, operator: FilterOperator) -> Self {
        Self {
            field: field.into(),
            operator,
        }
    }
}

/// Predicate tree over an entity's columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Single condition.
    Condition(FilterCondition),
    /// AND of multiple filters.
    And(Vec<Filter>),
    /// OR of multiple filters.
    Or(Vec<Filter>),
    /// NOT of a filter.
    Not(Box<Filter>),
}

impl Filter {
    /// `field = value`; a `null` value lowers to `IS NULL`.
    pub fn eq(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Filter::Condition(FilterCondition::new(field, FilterOperator::Eq(value.into())))
    }

    pub fn ne(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Filter::Condition(FilterCondition::new(field, FilterOperator::Ne(value.into())))
    }

    pub fn gt(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Filter::Condition(FilterCondition::new(field, FilterOperator::Gt(value.into())))
    }

    pub fn gte(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Filter::Condition(FilterCondition::new(field, FilterOperator::Gte(value.into())))
    }

    pub fn lt(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Filter::Condition(FilterCondition::new(field, FilterOperator::Lt(value.into())))
    }

    pub fn lte(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Filter::Condition(FilterCondition::new(field, FilterOperator::Lte(value.into())))
    }

    /// Matches any of `values`. An empty list is rejected when lowered.
    pub fn in_list<V: Into<serde_json::Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        Filter::Condition(FilterCondition::new(field, FilterOperator::In(values)))
    }

    pub fn not_in<V: Into<serde_json::Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        Filter::Condition(FilterCondition::new(field, FilterOperator::Nin(values)))
    }

    /// Substring match. `%` and `_` in `value` match literally.
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Condition(FilterCondition::new(
            field,
            FilterOperator::Contains(value.into()),
        ))
    }

    /// Inclusive on both ends.
    pub fn between(
        field: impl Into<String>,
        min: impl Into<serde_json::Value>,
        max: impl Into<serde_json::Value>,
    ) -> Self {
        Filter::Condition(FilterCondition::new(
            field,
            FilterOperator::Between {
                min: min.into(),
                max: max.into(),
            },
        ))
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Filter::Condition(FilterCondition::new(field, FilterOperator::IsNull))
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Filter::Condition(FilterCondition::new(field, FilterOperator::IsNotNull))
    }

    /// An empty list matches everything.
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    /// An empty list matches nothing.
    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }
}

/// Lowers a [`Filter`] tree into a backend predicate.
pub trait FilterTranslator {
    type Output;
    type Error;

    fn translate(&self, filter: &Filter) -> Result<Self::Output, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_in_list_accepts_any_json_values() {
        let filter = Filter::in_list("status", ["active", "extended"]);
        match filter {
            Filter::Condition(FilterCondition {
                field,
                operator: FilterOperator::In(values),
            }) => {
                assert_eq!(field, "status");
                assert_eq!(values, vec![json!("active"), json!("extended")]);
            }
            other => panic!("unexpected filter: {:?}", other),
        }
    }

    #[test]
    fn test_filter_serde_shape() {
        let filter = Filter::and(vec![Filter::eq("rate", 20.0), Filter::is_null("note")]);
        let json = serde_json::to_value(&filter).unwrap();
        let back: Filter = serde_json::from_value(json).unwrap();
        assert_eq!(back, filter);
    }
}
