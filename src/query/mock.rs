//! Recording query builder for tests.

use super::builder::{PredicateGroup, QueryBuilder};
use crate::dsl::{FieldComparison, SortDirection};

/// One call made against a [`RecordingBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderCall {
    Filter(PredicateGroup),
    WhereColumn(FieldComparison),
    OrderBy(String, SortDirection),
    With(String),
    WithCount(String),
    GroupBy(String),
    Having(PredicateGroup),
    Limit(u64),
    Offset(u64),
}

/// A builder that only records the calls it receives, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingBuilder {
    pub calls: Vec<BuilderCall>,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns only the filter groups, in order.
    pub fn filters(&self) -> Vec<&PredicateGroup> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BuilderCall::Filter(group) => Some(group),
                _ => None,
            })
            .collect()
    }

    fn record(mut self, call: BuilderCall) -> Self {
        self.calls.push(call);
        self
    }
}

impl QueryBuilder for RecordingBuilder {
    fn filter(self, group: PredicateGroup) -> Self {
        self.record(BuilderCall::Filter(group))
    }

    fn where_column(self, comparison: &FieldComparison) -> Self {
        self.record(BuilderCall::WhereColumn(comparison.clone()))
    }

    fn order_by(self, field: &str, direction: SortDirection) -> Self {
        self.record(BuilderCall::OrderBy(field.to_string(), direction))
    }

    fn with(self, relation: &str) -> Self {
        self.record(BuilderCall::With(relation.to_string()))
    }

    fn with_count(self, relation: &str) -> Self {
        self.record(BuilderCall::WithCount(relation.to_string()))
    }

    fn group_by(self, field: &str) -> Self {
        self.record(BuilderCall::GroupBy(field.to_string()))
    }

    fn having(self, group: PredicateGroup) -> Self {
        self.record(BuilderCall::Having(group))
    }

    fn limit(self, limit: u64) -> Self {
        self.record(BuilderCall::Limit(limit))
    }

    fn offset(self, offset: u64) -> Self {
        self.record(BuilderCall::Offset(offset))
    }
}
