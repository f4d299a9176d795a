use serde::{Deserialize, Serialize};

use crate::dsl::{
    FieldComparison, FilterSpec, IncludeKind, IncludeSpec, JoinType, QuerySpec, Scalar,
    SearchSpec, SortKey,
};
use crate::query::{Predicate, PredicateGroup, QueryBuilder};

/// One composable query transformation.
///
/// Criteria are plain values: two criteria are the same criterion when their
/// variant and parameters are equal, which is what `pop` and cache keys rely on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum Criterion {
    /// A whole parsed request.
    Request(QuerySpec),
    Where(FilterSpec),
    Filter(SearchSpec),
    OrderBy(SortKey),
    With(IncludeSpec),
    GroupBy(Vec<String>),
    Compare(FieldComparison),
    Limit { limit: u64, offset: u64 },
}

impl Criterion {
    /// Shorthand for an AND-joined `eq` filter.
    pub fn where_eq(field: &str, value: impl Into<Scalar>) -> Self {
        Criterion::Where(FilterSpec::eq(field, value))
    }

    /// Shorthand for an OR-joined group of conditions.
    pub fn filter_any(conditions: Vec<FilterSpec>) -> Self {
        let conditions = conditions
            .into_iter()
            .map(|mut c| {
                c.join = JoinType::Or;
                c
            })
            .collect();
        Criterion::Filter(SearchSpec {
            conditions,
            join: JoinType::Or,
            term: None,
        })
    }

    /// Applies this criterion to `builder` and returns the result.
    pub fn apply<B: QueryBuilder>(&self, builder: B) -> B {
        match self {
            Criterion::Request(spec) => apply_request(spec, builder),
            Criterion::Where(filter) => {
                apply_groups(builder, group_conditions(std::slice::from_ref(filter)))
            }
            Criterion::Filter(search) => {
                apply_groups(builder, group_conditions(&search.conditions))
            }
            Criterion::OrderBy(key) => builder.order_by(&key.field, key.direction),
            Criterion::With(include) => apply_include(include, builder),
            Criterion::GroupBy(fields) => fields.iter().fold(builder, |b, f| b.group_by(f)),
            Criterion::Compare(comparison) => builder.where_column(comparison),
            Criterion::Limit { limit, offset } => {
                let builder = builder.limit(*limit);
                if *offset > 0 {
                    builder.offset(*offset)
                } else {
                    builder
                }
            }
        }
    }

    /// Returns every row-level filter this criterion applies, in order.
    pub fn filters(&self) -> Vec<&FilterSpec> {
        match self {
            Criterion::Request(spec) => spec
                .filter
                .iter()
                .chain(spec.search.iter())
                .flat_map(|s| s.conditions.iter())
                .collect(),
            Criterion::Where(filter) => vec![filter],
            Criterion::Filter(search) => search.conditions.iter().collect(),
            _ => Vec::new(),
        }
    }
}

fn apply_request<B: QueryBuilder>(spec: &QuerySpec, builder: B) -> B {
    let mut builder = builder;

    if let Some(filter) = &spec.filter {
        builder = apply_groups(builder, group_conditions(&filter.conditions));
    }
    if let Some(search) = &spec.search {
        builder = apply_groups(builder, group_conditions(&search.conditions));
    }
    for comparison in &spec.compare {
        builder = builder.where_column(comparison);
    }
    for field in &spec.group_by {
        builder = builder.group_by(field);
    }
    if let Some(having) = &spec.having {
        for group in group_conditions(&having.conditions) {
            builder = builder.having(group);
        }
    }
    if let Some(sort) = &spec.sort {
        for key in &sort.keys {
            builder = builder.order_by(&key.field, key.direction);
        }
    }
    if let Some(include) = &spec.include {
        builder = apply_include(include, builder);
    }

    builder
}

fn apply_groups<B: QueryBuilder>(builder: B, groups: Vec<PredicateGroup>) -> B {
    groups.into_iter().fold(builder, |b, group| b.filter(group))
}

fn apply_include<B: QueryBuilder>(include: &IncludeSpec, builder: B) -> B {
    include.paths.iter().fold(builder, |b, p| match p.kind {
        IncludeKind::Load => b.with(&p.path),
        IncludeKind::Count => b.with_count(&p.path),
    })
}

/// Collects conditions into one group per join type, in first-seen order.
fn group_conditions(conditions: &[FilterSpec]) -> Vec<PredicateGroup> {
    let mut groups: Vec<PredicateGroup> = Vec::new();
    for condition in conditions {
        let predicate = to_predicate(condition);
        match groups.iter_mut().find(|g| g.join == condition.join) {
            Some(group) => group.predicates.push(predicate),
            None => {
                let mut group = PredicateGroup::new(condition.join);
                group.predicates.push(predicate);
                groups.push(group);
            }
        }
    }
    groups
}

fn to_predicate(filter: &FilterSpec) -> Predicate {
    if filter.unmatchable {
        return Predicate::Never;
    }
    Predicate::field(&filter.field, filter.operator, filter.values.clone())
}

impl From<QuerySpec> for Criterion {
    fn from(spec: QuerySpec) -> Self {
        Criterion::Request(spec)
    }
}

impl From<FilterSpec> for Criterion {
    fn from(filter: FilterSpec) -> Self {
        Criterion::Where(filter)
    }
}

impl From<SortKey> for Criterion {
    fn from(key: SortKey) -> Self {
        Criterion::OrderBy(key)
    }
}
