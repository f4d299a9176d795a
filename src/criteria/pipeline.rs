use super::criterion::Criterion;
use super::resolve::CriteriaResolver;
use crate::dsl::QuerySpec;
use crate::query::QueryBuilder;

/// Ordered criteria owned by a single repository call.
///
/// The consuming forms (`pushed`, `popped`, `cleared`, `skipped`) return a new
/// pipeline and are the usual way to thread one through a call; the `&mut` forms
/// exist for callers building one up in place. Order is significant: nothing is
/// reordered or de-duplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CriteriaPipeline {
    criteria: Vec<Criterion>,
    skip: bool,
    skip_cache: bool,
}

impl CriteriaPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles a parsed request into a pipeline holding exactly one request
    /// criterion. The request's `skipCache` flag carries over.
    pub fn from_request(spec: QuerySpec) -> Self {
        let skip_cache = spec.skip_cache;
        Self {
            criteria: vec![Criterion::Request(spec)],
            skip: false,
            skip_cache,
        }
    }

    #[must_use]
    pub fn pushed(mut self, criterion: impl Into<Criterion>) -> Self {
        self.push(criterion);
        self
    }

    #[must_use]
    pub fn popped(mut self, criterion: &Criterion) -> Self {
        self.pop(criterion);
        self
    }

    #[must_use]
    pub fn cleared(mut self) -> Self {
        self.clear();
        self
    }

    #[must_use]
    pub fn skipped(mut self, skip: bool) -> Self {
        self.skip(skip);
        self
    }

    /// Marks the call as bypassing the result cache.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }

    pub fn push(&mut self, criterion: impl Into<Criterion>) {
        self.criteria.push(criterion.into());
    }

    /// Removes the first criterion structurally equal to `criterion`.
    /// Returns `false` if none matched.
    pub fn pop(&mut self, criterion: &Criterion) -> bool {
        match self.criteria.iter().position(|c| c == criterion) {
            Some(index) => {
                self.criteria.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.criteria.clear();
    }

    pub fn skip(&mut self, skip: bool) {
        self.skip = skip;
    }

    pub fn is_skipped(&self) -> bool {
        self.skip
    }

    pub fn skip_cache(&self) -> bool {
        self.skip_cache
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    /// Criteria that `apply_all` will actually apply (none when skipped).
    pub fn applied(&self) -> &[Criterion] {
        if self.skip { &[] } else { &self.criteria }
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Folds every criterion over `builder`, left to right.
    pub fn apply_all<B: QueryBuilder>(&self, builder: B) -> B {
        self.applied()
            .iter()
            .fold(builder, |builder, criterion| criterion.apply(builder))
    }

    /// The applied criteria followed by `extra`, as an unskipped pipeline. Used by
    /// reads that must add their own constraints even to a skipped pipeline.
    #[must_use]
    pub fn extended(&self, extra: impl IntoIterator<Item = Criterion>) -> Self {
        Self {
            criteria: self.applied().iter().cloned().chain(extra).collect(),
            skip: false,
            skip_cache: self.skip_cache,
        }
    }

    /// Decodes opaque ids and expands bare search terms.
    #[must_use]
    pub fn resolve(self, resolver: &CriteriaResolver) -> Self {
        Self {
            criteria: self
                .criteria
                .into_iter()
                .map(|c| resolver.resolve(c))
                .collect(),
            ..self
        }
    }
}

impl FromIterator<Criterion> for CriteriaPipeline {
    fn from_iter<T: IntoIterator<Item = Criterion>>(iter: T) -> Self {
        Self {
            criteria: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}
