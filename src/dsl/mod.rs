//! Request DSL: raw query parameters to a structured [`QuerySpec`] and back.
//!
//! ```text
//! filter=status:active;role_id:in:3,7&filterJoin=and
//! search=name:like:john;email:doe&searchJoin=or
//! orderBy=created_at,name&sortedBy=desc
//! include=posts,comments_count
//! compare=updated_at:>:created_at
//! ```

pub mod error;
pub mod parser;
pub mod serialize;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use parser::parse;
pub use serialize::{RequestParams, to_params};
pub use types::{
    FieldComparison, FilterSpec, IncludeKind, IncludePath, IncludeSpec, JoinType, Operator,
    QuerySpec, Scalar, SearchSpec, SortDirection, SortKey, SortSpec, is_id_field,
};
