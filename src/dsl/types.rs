//! Structured query specification produced by the parser.

use serde::{Deserialize, Serialize};

/// A single literal value carried by a filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Scalar {
    /// Returns the value rendered the way it appears in tags and request strings.
    pub fn render(&self) -> String {
        match self {
            Scalar::Null => "null".to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }

    /// Returns the raw text if this is a [`Scalar::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interprets the value as a boolean literal (`true|false|1|0`).
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            Scalar::Int(1) => Some(true),
            Scalar::Int(0) => Some(false),
            Scalar::Text(s) => parse_flag(s),
            _ => None,
        }
    }
}

pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Eq,
    Neq,
    Like,
    In,
    NotIn,
    Between,
    NotBetween,
    Gt,
    Gte,
    Lt,
    Lte,
    IsNull,
    IsNotNull,
    DateEquals,
    DateBetween,
}

impl Operator {
    /// Resolves an operator token (case-insensitive). Returns `None` for anything that
    /// is not a recognised operator keyword or symbol.
    pub fn from_token(token: &str) -> Option<Self> {
        let op = match token.trim().to_ascii_lowercase().as_str() {
            "=" | "eq" => Operator::Eq,
            "<>" | "!=" | "neq" => Operator::Neq,
            "like" | "ilike" => Operator::Like,
            "in" => Operator::In,
            "notin" | "not_in" => Operator::NotIn,
            "between" => Operator::Between,
            "notbetween" | "not_between" => Operator::NotBetween,
            ">" | "gt" => Operator::Gt,
            ">=" | "gte" => Operator::Gte,
            "<" | "lt" => Operator::Lt,
            "<=" | "lte" => Operator::Lte,
            "null" | "is_null" | "isnull" => Operator::IsNull,
            "notnull" | "not_null" | "is_not_null" | "isnotnull" => Operator::IsNotNull,
            "date" | "date_equals" => Operator::DateEquals,
            "date_between" => Operator::DateBetween,
            _ => return None,
        };
        Some(op)
    }

    /// Canonical token used when serializing back to request parameters.
    pub fn token(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Neq => "<>",
            Operator::Like => "like",
            Operator::In => "in",
            Operator::NotIn => "notin",
            Operator::Between => "between",
            Operator::NotBetween => "notbetween",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::IsNull => "is_null",
            Operator::IsNotNull => "is_not_null",
            Operator::DateEquals => "date",
            Operator::DateBetween => "date_between",
        }
    }

    /// Operators whose value is a comma-separated list.
    pub fn is_multi_value(&self) -> bool {
        matches!(
            self,
            Operator::In
                | Operator::NotIn
                | Operator::Between
                | Operator::NotBetween
                | Operator::DateBetween
        )
    }

    /// Number of values the operator requires: `(min, Some(max))`, or unbounded max.
    pub fn arity(&self) -> (usize, Option<usize>) {
        match self {
            Operator::Between | Operator::NotBetween | Operator::DateBetween => (2, Some(2)),
            Operator::In | Operator::NotIn => (1, None),
            _ => (1, Some(1)),
        }
    }

    /// Operators allowed between two columns in a `compare` condition.
    pub fn is_column_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Eq
                | Operator::Neq
                | Operator::Gt
                | Operator::Gte
                | Operator::Lt
                | Operator::Lte
        )
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// How conditions of one spec are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    And,
    Or,
}

impl JoinType {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "and" => Some(JoinType::And),
            "or" => Some(JoinType::Or),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::And => "and",
            JoinType::Or => "or",
        }
    }
}

/// One `field operator values` condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSpec {
    pub field: String,
    pub operator: Operator,
    pub values: Vec<Scalar>,
    pub join: JoinType,
    /// Set for `id` / `*_id` fields: the values may be opaque identifiers that the
    /// transcoder decodes when the criterion is resolved.
    pub maybe_encoded_id: bool,
    /// Set by id resolution when a value failed to decode under the no-match policy.
    #[serde(default)]
    pub unmatchable: bool,
}

impl FilterSpec {
    /// Builds a filter, flagging id-like fields for opaque-id decoding.
    pub fn new(
        field: impl Into<String>,
        operator: Operator,
        values: Vec<Scalar>,
        join: JoinType,
    ) -> Self {
        let field = field.into();
        let maybe_encoded_id = is_id_field(&field);
        Self {
            field,
            operator,
            values,
            join,
            maybe_encoded_id,
            unmatchable: false,
        }
    }

    /// Shorthand for an AND-joined `eq` filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self::new(field, Operator::Eq, vec![value.into()], JoinType::And)
    }

    /// Shorthand for an AND-joined `in` filter.
    pub fn one_of(field: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self::new(field, Operator::In, values, JoinType::And)
    }
}

/// Returns `true` when the last dot-segment of `field` is `id` or ends in `_id`.
pub fn is_id_field(field: &str) -> bool {
    let last = field.rsplit('.').next().unwrap_or(field);
    last == "id" || last.ends_with("_id")
}

/// Ordered conditions with a shared join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchSpec {
    pub conditions: Vec<FilterSpec>,
    pub join: JoinType,
    /// A bare search term with no field, expanded against the searchable fields.
    pub term: Option<String>,
}

impl SearchSpec {
    pub fn new(join: JoinType) -> Self {
        Self {
            conditions: Vec::new(),
            join,
            term: None,
        }
    }

    /// Appends `condition`, joined with this spec's join type.
    pub fn with_condition(mut self, mut condition: FilterSpec) -> Self {
        condition.join = self.join;
        self.conditions.push(condition);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.term.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Sort keys in caller priority order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SortSpec {
    pub keys: Vec<SortKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeKind {
    /// Eagerly load the relation.
    Load,
    /// Attach a derived count column for the relation.
    Count,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncludePath {
    /// Relation path with any `_count` suffix already stripped.
    pub path: String,
    pub kind: IncludeKind,
}

/// Relations to attach, in first-seen order without duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct IncludeSpec {
    pub paths: Vec<IncludePath>,
}

impl IncludeSpec {
    /// Adds `path`, ignoring exact duplicates.
    pub fn insert(&mut self, path: IncludePath) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Same-row comparison between two columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldComparison {
    pub left: String,
    pub operator: Operator,
    pub right: String,
}

/// Everything a request asked for, as parsed from its raw parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct QuerySpec {
    pub search: Option<SearchSpec>,
    pub filter: Option<SearchSpec>,
    pub sort: Option<SortSpec>,
    pub include: Option<IncludeSpec>,
    pub group_by: Vec<String>,
    pub having: Option<SearchSpec>,
    pub compare: Vec<FieldComparison>,
    pub skip_cache: bool,
}

impl QuerySpec {
    /// Returns `true` if the spec transforms nothing.
    pub fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.filter.is_none()
            && self.sort.is_none()
            && self.include.is_none()
            && self.group_by.is_empty()
            && self.having.is_none()
            && self.compare.is_empty()
    }
}
