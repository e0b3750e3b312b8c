//! Query builders
//!
//! A [`CanonicalFilter`] is rendered two ways: as the flat [`RemoteQuery`]
//! sent to the upstream listing endpoint, and as a [`LocalPredicate`] over
//! the stored payloads. Only `created` and `type` reach the local predicate;
//! cursors and limits are upstream pagination concerns.

use bridge_traits::source::{RemoteQuery, TOTAL_COUNT_KEY, TOTAL_COUNT_VALUE};

use crate::filter::{CanonicalFilter, CreatedFilter, RangeOperator};

/// Render the upstream query for `filter`.
///
/// Every present field is copied under its upstream key, and the total-count
/// directive is always appended so the reconciler can compare counts.
pub fn build_remote_query(filter: &CanonicalFilter) -> RemoteQuery {
    let mut query = RemoteQuery::new();

    match filter.created {
        Some(CreatedFilter::Exact(value)) => query.insert("created", value.to_string()),
        Some(CreatedFilter::Range { op, value }) => {
            query.insert(format!("created[{}]", op.as_key()), value.to_string())
        }
        None => {}
    }

    if let Some(cursor) = &filter.ending_before {
        query.insert("ending_before", cursor.as_str());
    }

    if let Some(cursor) = &filter.starting_after {
        query.insert("starting_after", cursor.as_str());
    }

    if let Some(limit) = filter.limit {
        query.insert("limit", limit.to_string());
    }

    if let Some(event_type) = &filter.event_type {
        query.insert("type", event_type.as_str());
    }

    query.insert(TOTAL_COUNT_KEY, TOTAL_COUNT_VALUE);
    query
}

/// Payload field a condition reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadField {
    Created,
    Type,
}

impl PayloadField {
    fn sql(&self) -> &'static str {
        match self {
            PayloadField::Created => "CAST(json_extract(payload, '$.created') AS INTEGER)",
            PayloadField::Type => "json_extract(payload, '$.type')",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    fn sql(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
        }
    }
}

impl From<RangeOperator> for Comparison {
    fn from(op: RangeOperator) -> Self {
        match op {
            RangeOperator::Gt => Comparison::Gt,
            RangeOperator::Gte => Comparison::Gte,
            RangeOperator::Lt => Comparison::Lt,
            RangeOperator::Lte => Comparison::Lte,
        }
    }
}

/// Value bound to a condition's placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateValue {
    Integer(i64),
    Text(String),
}

/// One `field <cmp> ?` comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: PayloadField,
    pub comparison: Comparison,
    pub value: PredicateValue,
}

/// Conjunction of payload conditions. Empty means "every event of the
/// account".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalPredicate {
    conditions: Vec<Condition>,
}

impl LocalPredicate {
    /// Predicate matching every stored event.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_filter(filter: &CanonicalFilter) -> Self {
        let mut conditions = Vec::new();

        match filter.created {
            Some(CreatedFilter::Exact(value)) => conditions.push(Condition {
                field: PayloadField::Created,
                comparison: Comparison::Eq,
                value: PredicateValue::Integer(value),
            }),
            Some(CreatedFilter::Range { op, value }) => conditions.push(Condition {
                field: PayloadField::Created,
                comparison: op.into(),
                value: PredicateValue::Integer(value),
            }),
            None => {}
        }

        if let Some(event_type) = &filter.event_type {
            conditions.push(Condition {
                field: PayloadField::Type,
                comparison: Comparison::Eq,
                value: PredicateValue::Text(event_type.clone()),
            });
        }

        Self { conditions }
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// SQL fragment joined with `AND`, or `None` when unconstrained.
    ///
    /// Placeholders appear in the same order as [`LocalPredicate::bindings`].
    pub fn to_sql(&self) -> Option<String> {
        if self.conditions.is_empty() {
            return None;
        }

        let fragment = self
            .conditions
            .iter()
            .map(|c| format!("{} {} ?", c.field.sql(), c.comparison.sql()))
            .collect::<Vec<_>>()
            .join(" AND ");

        Some(fragment)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &PredicateValue> {
        self.conditions.iter().map(|c| &c.value)
    }
}

impl From<&CanonicalFilter> for LocalPredicate {
    fn from(filter: &CanonicalFilter) -> Self {
        Self::from_filter(filter)
    }
}
