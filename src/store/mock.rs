//! In-memory entity store over JSON rows.
//!
//! Replays the calls captured by a [`RecordingBuilder`] against its rows, which is
//! enough to exercise the full read path in tests. Relations are not modelled:
//! `with`, `with_count` and `group_by` are accepted and ignored, and `having` groups
//! filter rows like `filter` groups do.

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;

use super::error::{StoreError, StoreResult};
use super::{Attributes, EntityStore};
use crate::dsl::{FieldComparison, JoinType, Operator, Scalar, SortDirection};
use crate::query::{BuilderCall, Predicate, PredicateGroup, RecordingBuilder};

#[derive(Clone)]
pub struct MockEntityStore {
    entity_type: String,
    latency: Duration,
    state: Arc<MockState>,
}

struct MockState {
    rows: RwLock<Vec<Value>>,
    next_id: AtomicI64,
    offline: AtomicBool,
    fetches: AtomicU64,
    counts: AtomicU64,
}

impl MockEntityStore {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            latency: Duration::ZERO,
            state: Arc::new(MockState {
                rows: RwLock::new(Vec::new()),
                next_id: AtomicI64::new(1),
                offline: AtomicBool::new(false),
                fetches: AtomicU64::new(0),
                counts: AtomicU64::new(0),
            }),
        }
    }

    /// Seeds rows. Each row should carry an integer `id`.
    pub fn with_rows(self, rows: impl IntoIterator<Item = Value>) -> Self {
        {
            let mut stored = self.state.rows.write();
            stored.extend(rows);
            let max_id = stored
                .iter()
                .filter_map(|row| row.get(self.primary_key()).and_then(Value::as_i64))
                .max()
                .unwrap_or(0);
            self.state.next_id.store(max_id + 1, Ordering::SeqCst);
        }
        self
    }

    /// Delays every call, to widen race windows in concurrency tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `fetch` executions so far.
    pub fn fetch_calls(&self) -> u64 {
        self.state.fetches.load(Ordering::SeqCst)
    }

    pub fn count_calls(&self) -> u64 {
        self.state.counts.load(Ordering::SeqCst)
    }

    pub fn rows(&self) -> Vec<Value> {
        self.state.rows.read().clone()
    }

    async fn simulate(&self) -> StoreResult<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.state.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("mock store offline".to_string()));
        }
        Ok(())
    }

    fn matches_id(&self, row: &Value, id: &Scalar) -> bool {
        lookup(row, self.primary_key()).and_then(|v| compare_scalar(v, id))
            == Some(CmpOrdering::Equal)
    }
}

impl std::fmt::Debug for MockEntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEntityStore")
            .field("entity_type", &self.entity_type)
            .field("rows", &self.state.rows.read().len())
            .finish_non_exhaustive()
    }
}

impl EntityStore for MockEntityStore {
    type Builder = RecordingBuilder;
    type Record = Value;

    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn record_id(&self, record: &Value) -> Option<Scalar> {
        match record.get(self.primary_key())? {
            Value::Number(n) => n.as_i64().map(Scalar::Int),
            Value::String(s) => Some(Scalar::Text(s.clone())),
            _ => None,
        }
    }

    fn query(&self) -> RecordingBuilder {
        RecordingBuilder::new()
    }

    async fn fetch(&self, query: RecordingBuilder) -> StoreResult<Vec<Value>> {
        self.state.fetches.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        let rows = self.state.rows.read().clone();
        Ok(evaluate(rows, &query.calls))
    }

    async fn count(&self, query: RecordingBuilder) -> StoreResult<u64> {
        self.state.counts.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        let rows = self.state.rows.read().clone();
        Ok(evaluate(rows, &query.calls).len() as u64)
    }

    async fn insert(&self, attributes: Attributes) -> StoreResult<Value> {
        self.simulate().await?;
        let mut row = attributes;
        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst);
        row.insert(self.primary_key().to_string(), Value::from(id));
        let row = Value::Object(row);
        self.state.rows.write().push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: &Scalar, attributes: Attributes) -> StoreResult<Value> {
        self.simulate().await?;
        let mut rows = self.state.rows.write();
        let Some(row) = rows.iter_mut().find(|row| self.matches_id(row, id)) else {
            return Err(StoreError::NotFound {
                entity: self.entity_type.clone(),
                id: id.render(),
            });
        };
        let Value::Object(columns) = &mut *row else {
            return Err(StoreError::InvalidRecord(format!(
                "{} row is not an object",
                self.entity_type
            )));
        };
        for (column, value) in attributes {
            if column != self.primary_key() {
                columns.insert(column, value);
            }
        }
        Ok(row.clone())
    }

    async fn delete(&self, id: &Scalar) -> StoreResult<bool> {
        self.simulate().await?;
        let mut rows = self.state.rows.write();
        let before = rows.len();
        rows.retain(|row| !self.matches_id(row, id));
        Ok(rows.len() != before)
    }
}

fn evaluate(mut rows: Vec<Value>, calls: &[BuilderCall]) -> Vec<Value> {
    let mut sort: Vec<(&str, SortDirection)> = Vec::new();
    let mut limit = None;
    let mut offset = 0;

    for call in calls {
        match call {
            BuilderCall::Filter(group) | BuilderCall::Having(group) => {
                rows.retain(|row| group_matches(row, group));
            }
            BuilderCall::WhereColumn(comparison) => {
                rows.retain(|row| columns_match(row, comparison));
            }
            BuilderCall::OrderBy(field, direction) => sort.push((field.as_str(), *direction)),
            BuilderCall::Limit(n) => limit = Some(*n as usize),
            BuilderCall::Offset(n) => offset = *n as usize,
            BuilderCall::With(_) | BuilderCall::WithCount(_) | BuilderCall::GroupBy(_) => {}
        }
    }

    if !sort.is_empty() {
        rows.sort_by(|a, b| {
            for (field, direction) in &sort {
                let ord = compare_nullable(lookup(a, field), lookup(b, field));
                let ord = match direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                };
                if ord != CmpOrdering::Equal {
                    return ord;
                }
            }
            CmpOrdering::Equal
        });
    }

    rows.into_iter()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

fn group_matches(row: &Value, group: &PredicateGroup) -> bool {
    if group.is_empty() {
        return true;
    }
    match group.join {
        JoinType::And => group.predicates.iter().all(|p| predicate_matches(row, p)),
        JoinType::Or => group.predicates.iter().any(|p| predicate_matches(row, p)),
    }
}

fn predicate_matches(row: &Value, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Never => false,
        Predicate::Field {
            field,
            operator,
            values,
        } => field_matches(present(lookup(row, field)), *operator, values),
    }
}

fn field_matches(value: Option<&Value>, operator: Operator, values: &[Scalar]) -> bool {
    let first = values.first();
    let equals = |s: &Scalar| value.and_then(|v| compare_scalar(v, s)) == Some(CmpOrdering::Equal);
    let flag = first.and_then(Scalar::as_flag).unwrap_or(true);

    match operator {
        Operator::Eq => first.is_some_and(equals),
        Operator::Neq => !first.is_some_and(equals),
        Operator::Like => match (value, first) {
            (Some(Value::String(text)), Some(Scalar::Text(pattern))) => like(text, pattern),
            _ => false,
        },
        Operator::In => values.iter().any(equals),
        Operator::NotIn => !values.iter().any(equals),
        Operator::Between => within(value, values),
        Operator::NotBetween => !within(value, values),
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => satisfies(
            operator,
            value.zip(first).and_then(|(v, s)| compare_scalar(v, s)),
        ),
        Operator::IsNull => value.is_none() == flag,
        Operator::IsNotNull => value.is_some() == flag,
        Operator::DateEquals => match (date_of(value), first.and_then(Scalar::as_text)) {
            (Some(date), Some(wanted)) => date == wanted,
            _ => false,
        },
        Operator::DateBetween => match (date_of(value), values) {
            (Some(date), [Scalar::Text(from), Scalar::Text(to)]) => {
                from.as_str() <= date && date <= to.as_str()
            }
            _ => false,
        },
    }
}

fn columns_match(row: &Value, comparison: &FieldComparison) -> bool {
    let left = present(lookup(row, &comparison.left));
    let right = present(lookup(row, &comparison.right));
    satisfies(
        comparison.operator,
        left.zip(right).and_then(|(l, r)| compare_json(l, r)),
    )
}

fn satisfies(operator: Operator, ord: Option<CmpOrdering>) -> bool {
    use CmpOrdering::{Equal, Greater, Less};
    matches!(
        (operator, ord),
        (Operator::Eq, Some(Equal))
            | (Operator::Neq, Some(Less | Greater))
            | (Operator::Gt, Some(Greater))
            | (Operator::Gte, Some(Greater | Equal))
            | (Operator::Lt, Some(Less))
            | (Operator::Lte, Some(Less | Equal))
    )
}

fn within(value: Option<&Value>, bounds: &[Scalar]) -> bool {
    let (Some(value), [low, high]) = (value, bounds) else {
        return false;
    };
    matches!(
        compare_scalar(value, low),
        Some(CmpOrdering::Greater | CmpOrdering::Equal)
    ) && matches!(
        compare_scalar(value, high),
        Some(CmpOrdering::Less | CmpOrdering::Equal)
    )
}

/// Case-insensitive SQL `LIKE`. Without a `%` the pattern matches as a substring.
fn like(text: &str, pattern: &str) -> bool {
    let text = text.to_lowercase();
    let pattern = pattern.to_lowercase();
    if !pattern.contains('%') {
        return text.contains(&pattern);
    }

    let parts: Vec<&str> = pattern.split('%').collect();
    let last = parts.len() - 1;
    let mut rest = text.as_str();
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(tail) => rest = tail,
                None => return false,
            }
        } else if i == last {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

fn lookup<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(row, |value, segment| value.get(segment))
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn date_of(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) => s.get(..10),
        _ => None,
    }
}

fn compare_nullable(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (present(a), present(b)) {
        (None, None) => CmpOrdering::Equal,
        (None, Some(_)) => CmpOrdering::Less,
        (Some(_), None) => CmpOrdering::Greater,
        (Some(a), Some(b)) => compare_json(a, b).unwrap_or(CmpOrdering::Equal),
    }
}

fn compare_json(a: &Value, b: &Value) -> Option<CmpOrdering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Compares a stored value with a parsed one. Parsed values are mostly text, so
/// numeric columns coerce the text side.
fn compare_scalar(value: &Value, scalar: &Scalar) -> Option<CmpOrdering> {
    match (value, scalar) {
        (Value::Number(n), Scalar::Int(i)) => match n.as_i64() {
            Some(n) => Some(n.cmp(i)),
            None => n.as_f64()?.partial_cmp(&(*i as f64)),
        },
        (Value::Number(n), Scalar::Text(t)) => n.as_f64()?.partial_cmp(&t.trim().parse().ok()?),
        (Value::String(s), Scalar::Text(t)) => Some(s.as_str().cmp(t.as_str())),
        (Value::String(s), Scalar::Int(i)) => Some(s.as_str().cmp(i.to_string().as_str())),
        (Value::Bool(b), s) => Some(b.cmp(&s.as_flag()?)),
        (Value::Null, Scalar::Null) => Some(CmpOrdering::Equal),
        _ => None,
    }
}
