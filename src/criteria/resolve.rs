//! Apply-time resolution: opaque-id decoding and bare search term expansion.

use std::sync::Arc;

use tracing::debug;

use super::criterion::Criterion;
use crate::constants::PARAM_SEARCH;
use crate::dsl::parser::parse_values;
use crate::dsl::{FilterSpec, Operator, QuerySpec, Scalar, SearchSpec};
use crate::identity::{DecodeError, DecodePolicy, IdTranscoder, NumericTranscoder};

/// Rewrites criteria into the form the store executes.
///
/// Decoding runs here rather than in the parser so that a malformed request and an
/// undecodable id stay distinguishable.
#[derive(Clone)]
pub struct CriteriaResolver {
    transcoder: Arc<dyn IdTranscoder>,
    policy: DecodePolicy,
    searchable: Vec<(String, Operator)>,
}

impl std::fmt::Debug for CriteriaResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CriteriaResolver")
            .field("policy", &self.policy)
            .field("searchable", &self.searchable)
            .finish_non_exhaustive()
    }
}

impl Default for CriteriaResolver {
    fn default() -> Self {
        Self::new(Arc::new(NumericTranscoder), DecodePolicy::default())
    }
}

impl CriteriaResolver {
    pub fn new(transcoder: Arc<dyn IdTranscoder>, policy: DecodePolicy) -> Self {
        Self {
            transcoder,
            policy,
            searchable: Vec::new(),
        }
    }

    /// Fields a bare search term is expanded over, each with its operator.
    pub fn with_searchable(mut self, fields: Vec<(String, Operator)>) -> Self {
        self.searchable = fields;
        self
    }

    pub fn policy(&self) -> DecodePolicy {
        self.policy
    }

    pub fn transcoder(&self) -> &dyn IdTranscoder {
        self.transcoder.as_ref()
    }

    pub fn resolve(&self, criterion: Criterion) -> Criterion {
        match criterion {
            Criterion::Request(spec) => Criterion::Request(self.resolve_request(spec)),
            Criterion::Where(filter) => Criterion::Where(self.resolve_filter(filter)),
            Criterion::Filter(search) => Criterion::Filter(self.resolve_search(search)),
            other => other,
        }
    }

    fn resolve_request(&self, spec: QuerySpec) -> QuerySpec {
        QuerySpec {
            search: spec.search.map(|s| self.resolve_search(s)),
            filter: spec.filter.map(|s| self.resolve_search(s)),
            having: spec.having.map(|s| self.resolve_search(s)),
            ..spec
        }
    }

    fn resolve_search(&self, mut search: SearchSpec) -> SearchSpec {
        if let Some(term) = search.term.take() {
            search.conditions.extend(self.expand_term(&term, &search));
        }
        search.conditions = search
            .conditions
            .into_iter()
            .map(|c| self.resolve_filter(c))
            .collect();
        search
    }

    fn expand_term(&self, term: &str, search: &SearchSpec) -> Vec<FilterSpec> {
        if self.searchable.is_empty() {
            debug!(term, "No searchable fields declared, dropping bare search term");
        }
        self.searchable
            .iter()
            .filter_map(|(field, op)| match parse_values(PARAM_SEARCH, field, *op, term) {
                Ok(values) => Some(FilterSpec::new(field, *op, values, search.join)),
                Err(e) => {
                    debug!(field = %field, error = %e, "Search term does not fit field, skipping");
                    None
                }
            })
            .collect()
    }

    fn resolve_filter(&self, mut filter: FilterSpec) -> FilterSpec {
        if !filter.maybe_encoded_id || !decodes_values(filter.operator) {
            return filter;
        }

        let mut unmatchable = false;
        filter.values = std::mem::take(&mut filter.values)
            .into_iter()
            .map(|value| match value {
                Scalar::Text(token) => match self.transcoder.decode(&token) {
                    Some(id) => Scalar::Int(id),
                    None => {
                        let err = DecodeError {
                            field: filter.field.clone(),
                            token,
                        };
                        debug!(error = %err, policy = %self.policy, "Opaque id decode failed");
                        match self.policy {
                            DecodePolicy::NoMatch => {
                                unmatchable = true;
                                Scalar::Text(err.token)
                            }
                            DecodePolicy::Literal => literal(err.token),
                        }
                    }
                },
                other => other,
            })
            .collect();

        filter.maybe_encoded_id = false;
        filter.unmatchable = unmatchable;
        filter
    }
}

/// Operators whose values are ids rather than patterns, dates or flags.
fn decodes_values(operator: Operator) -> bool {
    !matches!(
        operator,
        Operator::Like
            | Operator::IsNull
            | Operator::IsNotNull
            | Operator::DateEquals
            | Operator::DateBetween
    )
}

pub(crate) fn literal(token: String) -> Scalar {
    match token.trim().parse::<i64>() {
        Ok(n) => Scalar::Int(n),
        Err(_) => Scalar::Text(token),
    }
}
