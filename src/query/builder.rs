use crate::dsl::{FieldComparison, JoinType, Operator, Scalar, SortDirection};

/// A single test applied to each row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    Field {
        field: String,
        operator: Operator,
        values: Vec<Scalar>,
    },
    /// Matches nothing. Produced when an opaque id fails to decode under
    /// [`DecodePolicy::NoMatch`](crate::identity::DecodePolicy::NoMatch).
    Never,
}

impl Predicate {
    pub fn field(field: impl Into<String>, operator: Operator, values: Vec<Scalar>) -> Self {
        Predicate::Field {
            field: field.into(),
            operator,
            values,
        }
    }
}

/// Predicates combined with one join. Groups handed to a builder are AND-ed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PredicateGroup {
    pub join: JoinType,
    pub predicates: Vec<Predicate>,
}

impl PredicateGroup {
    pub fn new(join: JoinType) -> Self {
        Self {
            join,
            predicates: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

/// Query builder exposed by the underlying entity store.
///
/// Methods consume and return the builder so criteria can be folded over it.
pub trait QueryBuilder: Sized {
    /// Adds a predicate group; successive groups are conjoined.
    fn filter(self, group: PredicateGroup) -> Self;

    /// Adds a same-row comparison between two columns.
    fn where_column(self, comparison: &FieldComparison) -> Self;

    fn order_by(self, field: &str, direction: SortDirection) -> Self;

    /// Eagerly loads a relation path.
    fn with(self, relation: &str) -> Self;

    /// Attaches a `<relation>_count` aggregate column.
    fn with_count(self, relation: &str) -> Self;

    fn group_by(self, field: &str) -> Self;

    /// Adds a predicate group evaluated after grouping.
    fn having(self, group: PredicateGroup) -> Self;

    fn limit(self, limit: u64) -> Self;

    fn offset(self, offset: u64) -> Self;
}
