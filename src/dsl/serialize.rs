//! Canonical serializer: the inverse of [`parse`](super::parse).
//!
//! Every condition is written with an explicit operator token so the output parses
//! back to the same [`QuerySpec`] regardless of the parameter's default operator.

use std::collections::BTreeMap;

use super::types::{FilterSpec, IncludeKind, QuerySpec, Scalar, SearchSpec};
use crate::constants::{
    COUNT_SUFFIX, PARAM_COMPARE, PARAM_FILTER, PARAM_FILTER_JOIN, PARAM_GROUP_BY, PARAM_HAVING,
    PARAM_HAVING_JOIN, PARAM_INCLUDE, PARAM_ORDER_BY, PARAM_SEARCH, PARAM_SEARCH_JOIN,
    PARAM_SKIP_CACHE, PARAM_SORTED_BY,
};

/// Raw request parameters, ordered by name.
pub type RequestParams = BTreeMap<String, String>;

/// Serializes `spec` back to raw request parameters.
pub fn to_params(spec: &QuerySpec) -> RequestParams {
    let mut params = RequestParams::new();

    if let Some(search) = &spec.search {
        params.insert(PARAM_SEARCH.into(), write_conditions(search));
        params.insert(PARAM_SEARCH_JOIN.into(), search.join.as_str().into());
    }
    if let Some(filter) = &spec.filter {
        params.insert(PARAM_FILTER.into(), write_conditions(filter));
        params.insert(PARAM_FILTER_JOIN.into(), filter.join.as_str().into());
    }
    if let Some(having) = &spec.having {
        params.insert(PARAM_HAVING.into(), write_conditions(having));
        params.insert(PARAM_HAVING_JOIN.into(), having.join.as_str().into());
    }

    if let Some(sort) = &spec.sort {
        let fields: Vec<&str> = sort.keys.iter().map(|k| k.field.as_str()).collect();
        let directions: Vec<&str> = sort.keys.iter().map(|k| k.direction.as_str()).collect();
        params.insert(PARAM_ORDER_BY.into(), fields.join(","));
        params.insert(PARAM_SORTED_BY.into(), directions.join(","));
    }

    // Loads and counts share one list so their relative order survives.
    if let Some(include) = &spec.include {
        let paths: Vec<String> = include
            .paths
            .iter()
            .map(|p| match p.kind {
                IncludeKind::Load => p.path.clone(),
                IncludeKind::Count => format!("{}{COUNT_SUFFIX}", p.path),
            })
            .collect();
        params.insert(PARAM_INCLUDE.into(), paths.join(","));
    }

    if !spec.group_by.is_empty() {
        params.insert(PARAM_GROUP_BY.into(), spec.group_by.join(","));
    }

    if !spec.compare.is_empty() {
        let entries: Vec<String> = spec
            .compare
            .iter()
            .map(|c| format!("{}:{}:{}", c.left, c.operator.token(), c.right))
            .collect();
        params.insert(PARAM_COMPARE.into(), entries.join(";"));
    }

    if spec.skip_cache {
        params.insert(PARAM_SKIP_CACHE.into(), "true".into());
    }

    params
}

fn write_conditions(spec: &SearchSpec) -> String {
    spec.term
        .iter()
        .cloned()
        .chain(spec.conditions.iter().map(write_condition))
        .collect::<Vec<_>>()
        .join(";")
}

fn write_condition(filter: &FilterSpec) -> String {
    let values: Vec<String> = filter.values.iter().map(Scalar::render).collect();
    format!(
        "{}:{}:{}",
        filter.field,
        filter.operator.token(),
        values.join(",")
    )
}
