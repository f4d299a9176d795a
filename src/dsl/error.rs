//! Request DSL error types.

use thiserror::Error;

/// Reason a request parameter was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// A condition has no field name (`:active`).
    #[error("empty field name")]
    EmptyField,

    /// A condition has a field and operator but no value (`status:`).
    #[error("missing value for field '{field}'")]
    MissingValue { field: String },

    /// A multi-value list has an empty element (`in:1,` or `in:,3`).
    #[error("unterminated value list for field '{field}'")]
    UnterminatedList { field: String },

    /// An operator received the wrong number of values.
    #[error("operator '{operator}' on field '{field}' expects {expected} value(s), got {got}")]
    Arity {
        field: String,
        operator: String,
        expected: &'static str,
        got: usize,
    },

    /// The operator position holds a token that is not an operator.
    #[error("unknown operator '{token}' for field '{field}'")]
    UnknownOperator { field: String, token: String },

    /// An operator keyword appeared where a field name was expected.
    #[error("operator keyword '{token}' used where a field name was expected")]
    OperatorAsField { token: String },

    /// A join parameter is neither `and` nor `or`.
    #[error("invalid join '{value}': expected 'and' or 'or'")]
    InvalidJoin { value: String },

    /// A sort direction is neither `asc` nor `desc`.
    #[error("invalid sort direction '{value}': expected 'asc' or 'desc'")]
    InvalidDirection { value: String },

    /// A `compare` entry is not `fieldA:operator:fieldB` with a column operator.
    #[error("malformed comparison '{value}'")]
    MalformedCompare { value: String },

    /// A boolean parameter is not `true|false|1|0`.
    #[error("invalid boolean '{value}'")]
    InvalidFlag { value: String },

    /// A date operator received something that is not `YYYY-MM-DD`.
    #[error("invalid date '{value}' for field '{field}'")]
    InvalidDate { field: String, value: String },
}

/// A rejected request parameter together with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid '{param}' parameter: {kind}")]
pub struct ParseError {
    /// Name of the offending raw parameter (`filter`, `orderBy`, ...).
    pub param: String,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(param: impl Into<String>, kind: ParseErrorKind) -> Self {
        Self {
            param: param.into(),
            kind,
        }
    }
}

/// Convenience result type for DSL parsing.
pub type ParseResult<T> = Result<T, ParseError>;
