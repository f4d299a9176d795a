//! Request parameter parser.
//!
//! Pure and total: every input produces either a complete [`QuerySpec`] or a
//! [`ParseError`] naming the offending parameter. Opaque-id decoding is not done
//! here; id-like fields are only flagged.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::error::{ParseError, ParseErrorKind, ParseResult};
use super::types::{
    FieldComparison, FilterSpec, IncludeKind, IncludePath, IncludeSpec, JoinType, Operator,
    QuerySpec, Scalar, SearchSpec, SortDirection, SortKey, SortSpec, parse_flag,
};
use crate::constants::{
    CONDITION_SEPARATOR, COUNT_SUFFIX, DATE_FORMAT, LIST_SEPARATOR, PARAM_COMPARE, PARAM_FILTER,
    PARAM_FILTER_JOIN, PARAM_GROUP_BY, PARAM_HAVING, PARAM_HAVING_JOIN, PARAM_INCLUDE,
    PARAM_ORDER_BY, PARAM_SEARCH, PARAM_SEARCH_FIELDS, PARAM_SEARCH_JOIN, PARAM_SKIP_CACHE,
    PARAM_SORTED_BY, PARAM_WITH, PART_SEPARATOR,
};

/// Parses raw request parameters into a [`QuerySpec`].
///
/// Unrecognised parameter names are ignored so callers can pass the full query
/// string (pagination and so on). When a name repeats, the last value wins.
pub fn parse<I, K, V>(params: I) -> ParseResult<QuerySpec>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let raw: BTreeMap<String, String> = params
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
        .collect();
    let get = |name: &str| raw.get(name).map(String::as_str);

    let search = match get(PARAM_SEARCH) {
        Some(value) => {
            let join = parse_join(PARAM_SEARCH_JOIN, get(PARAM_SEARCH_JOIN), JoinType::Or)?;
            let fields = get(PARAM_SEARCH_FIELDS)
                .map(parse_search_fields)
                .transpose()?;
            parse_search(value, join, fields.as_deref())?
        }
        None => None,
    };

    let filter = match get(PARAM_FILTER) {
        Some(value) => {
            let join = parse_join(PARAM_FILTER_JOIN, get(PARAM_FILTER_JOIN), JoinType::And)?;
            parse_conditions(PARAM_FILTER, value, join)?
        }
        None => None,
    };

    let having = match get(PARAM_HAVING) {
        Some(value) => {
            let join = parse_join(PARAM_HAVING_JOIN, get(PARAM_HAVING_JOIN), JoinType::And)?;
            parse_conditions(PARAM_HAVING, value, join)?
        }
        None => None,
    };

    let sort = match get(PARAM_ORDER_BY) {
        Some(order_by) => parse_sort(order_by, get(PARAM_SORTED_BY))?,
        None => None,
    };

    let include = parse_include(get(PARAM_INCLUDE), get(PARAM_WITH))?;
    let group_by = get(PARAM_GROUP_BY).map(split_list).unwrap_or_default();
    let compare = get(PARAM_COMPARE)
        .map(parse_compare)
        .transpose()?
        .unwrap_or_default();

    let skip_cache = match get(PARAM_SKIP_CACHE) {
        Some(value) => parse_flag(value).ok_or_else(|| {
            ParseError::new(
                PARAM_SKIP_CACHE,
                ParseErrorKind::InvalidFlag {
                    value: value.to_string(),
                },
            )
        })?,
        None => false,
    };

    Ok(QuerySpec {
        search,
        filter,
        sort,
        include,
        group_by,
        having,
        compare,
        skip_cache,
    })
}

/// A `searchFields` entry: the field allowed in search and its operator override.
type SearchField = (String, Option<Operator>);

fn parse_join(param: &str, raw: Option<&str>, default: JoinType) -> ParseResult<JoinType> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => JoinType::from_token(value).ok_or_else(|| {
            ParseError::new(
                param,
                ParseErrorKind::InvalidJoin {
                    value: value.to_string(),
                },
            )
        }),
    }
}

fn segments(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(CONDITION_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Symbolic operators and list keywords can never name a column.
fn is_reserved_field(token: &str) -> bool {
    matches!(
        token.to_ascii_lowercase().as_str(),
        "=" | "<>"
            | "!="
            | ">"
            | ">="
            | "<"
            | "<="
            | "like"
            | "ilike"
            | "in"
            | "notin"
            | "not_in"
            | "between"
            | "notbetween"
            | "not_between"
            | "date_between"
            | "is_null"
            | "is_not_null"
    )
}

fn check_field(param: &str, field: &str) -> ParseResult<()> {
    if field.is_empty() {
        return Err(ParseError::new(param, ParseErrorKind::EmptyField));
    }
    if is_reserved_field(field) {
        return Err(ParseError::new(
            param,
            ParseErrorKind::OperatorAsField {
                token: field.to_string(),
            },
        ));
    }
    Ok(())
}

/// Splits one `field:value` / `field:operator:value` condition.
///
/// Returns the field, the explicit operator (if any) and the raw value.
fn split_condition<'a>(
    param: &str,
    condition: &'a str,
) -> ParseResult<(&'a str, Option<Operator>, &'a str)> {
    let Some((field, rest)) = condition.split_once(PART_SEPARATOR) else {
        return Err(ParseError::new(
            param,
            ParseErrorKind::MissingValue {
                field: condition.to_string(),
            },
        ));
    };
    let field = field.trim();
    check_field(param, field)?;

    match rest.split_once(PART_SEPARATOR) {
        Some((head, value)) => match Operator::from_token(head) {
            Some(op) => Ok((field, Some(op), value)),
            None => Err(ParseError::new(
                param,
                ParseErrorKind::UnknownOperator {
                    field: field.to_string(),
                    token: head.trim().to_string(),
                },
            )),
        },
        None => Ok((field, None, rest)),
    }
}

/// Turns a raw value into the operator's value list and checks arity.
pub(crate) fn parse_values(
    param: &str,
    field: &str,
    operator: Operator,
    raw: &str,
) -> ParseResult<Vec<Scalar>> {
    if raw.trim().is_empty() {
        return Err(ParseError::new(
            param,
            ParseErrorKind::MissingValue {
                field: field.to_string(),
            },
        ));
    }

    let values: Vec<Scalar> = if operator.is_multi_value() {
        let parts: Vec<&str> = raw.split(LIST_SEPARATOR).map(str::trim).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(ParseError::new(
                param,
                ParseErrorKind::UnterminatedList {
                    field: field.to_string(),
                },
            ));
        }
        parts.into_iter().map(Scalar::from).collect()
    } else {
        vec![Scalar::from(raw)]
    };

    let (min, max) = operator.arity();
    if values.len() < min || max.is_some_and(|max| values.len() > max) {
        let expected = match (min, max) {
            (2, Some(2)) => "exactly 2",
            (_, None) => "at least 1",
            _ => "exactly 1",
        };
        return Err(ParseError::new(
            param,
            ParseErrorKind::Arity {
                field: field.to_string(),
                operator: operator.token().to_string(),
                expected,
                got: values.len(),
            },
        ));
    }

    match operator {
        Operator::IsNull | Operator::IsNotNull => {
            for value in &values {
                if value.as_flag().is_none() {
                    return Err(ParseError::new(
                        param,
                        ParseErrorKind::InvalidFlag {
                            value: value.render(),
                        },
                    ));
                }
            }
        }
        Operator::DateEquals | Operator::DateBetween => {
            for value in &values {
                let text = value.render();
                if NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).is_err() {
                    return Err(ParseError::new(
                        param,
                        ParseErrorKind::InvalidDate {
                            field: field.to_string(),
                            value: text,
                        },
                    ));
                }
            }
        }
        _ => {}
    }

    Ok(values)
}

/// Parses the `filter` / `having` grammar. Returns `None` if no condition remains.
fn parse_conditions(param: &str, raw: &str, join: JoinType) -> ParseResult<Option<SearchSpec>> {
    let mut spec = SearchSpec::new(join);
    for condition in segments(raw) {
        let (field, op, value) = split_condition(param, condition)?;
        let op = op.unwrap_or(Operator::Eq);
        let values = parse_values(param, field, op, value)?;
        spec.conditions.push(FilterSpec::new(field, op, values, join));
    }
    Ok((!spec.is_empty()).then_some(spec))
}

fn parse_search_fields(raw: &str) -> ParseResult<Vec<SearchField>> {
    segments(raw)
        .map(|entry| match entry.split_once(PART_SEPARATOR) {
            Some((field, op)) => {
                let field = field.trim();
                check_field(PARAM_SEARCH_FIELDS, field)?;
                let op = Operator::from_token(op).ok_or_else(|| {
                    ParseError::new(
                        PARAM_SEARCH_FIELDS,
                        ParseErrorKind::UnknownOperator {
                            field: field.to_string(),
                            token: op.trim().to_string(),
                        },
                    )
                })?;
                Ok((field.to_string(), Some(op)))
            }
            None => {
                check_field(PARAM_SEARCH_FIELDS, entry)?;
                Ok((entry.to_string(), None))
            }
        })
        .collect()
}

/// Parses `search`. A segment with no `:` is a bare term: with `searchFields` it is
/// expanded right away, otherwise it is kept for resolve time. At most one bare
/// term is allowed.
fn parse_search(
    raw: &str,
    join: JoinType,
    fields: Option<&[SearchField]>,
) -> ParseResult<Option<SearchSpec>> {
    let mut spec = SearchSpec::new(join);

    for condition in segments(raw) {
        if !condition.contains(PART_SEPARATOR) {
            match fields {
                Some(fields) => {
                    for (field, op) in fields {
                        let op = op.unwrap_or(Operator::Like);
                        let values = parse_values(PARAM_SEARCH, field, op, condition)?;
                        spec.conditions.push(FilterSpec::new(field, op, values, join));
                    }
                }
                None if spec.term.is_none() => spec.term = Some(condition.to_string()),
                None => {
                    return Err(ParseError::new(
                        PARAM_SEARCH,
                        ParseErrorKind::MissingValue {
                            field: condition.to_string(),
                        },
                    ));
                }
            }
            continue;
        }

        let (field, explicit, value) = split_condition(PARAM_SEARCH, condition)?;
        let op = match fields {
            Some(fields) => match fields.iter().find(|(name, _)| name == field) {
                Some((_, listed)) => explicit.or(*listed).unwrap_or(Operator::Like),
                None => continue,
            },
            None => explicit.unwrap_or(Operator::Like),
        };
        let values = parse_values(PARAM_SEARCH, field, op, value)?;
        spec.conditions.push(FilterSpec::new(field, op, values, join));
    }
    Ok((!spec.is_empty()).then_some(spec))
}

/// Pairs `orderBy` with `sortedBy` element-wise; missing directions default to asc
/// and surplus directions are ignored.
fn parse_sort(order_by: &str, sorted_by: Option<&str>) -> ParseResult<Option<SortSpec>> {
    let directions: Vec<SortDirection> = match sorted_by {
        Some(raw) => raw
            .split(LIST_SEPARATOR)
            .map(str::trim)
            .map(|token| {
                if token.is_empty() {
                    return Ok(SortDirection::Asc);
                }
                SortDirection::from_token(token).ok_or_else(|| {
                    ParseError::new(
                        PARAM_SORTED_BY,
                        ParseErrorKind::InvalidDirection {
                            value: token.to_string(),
                        },
                    )
                })
            })
            .collect::<ParseResult<_>>()?,
        None => Vec::new(),
    };

    let keys: Vec<SortKey> = split_list(order_by)
        .into_iter()
        .enumerate()
        .map(|(i, field)| {
            check_field(PARAM_ORDER_BY, &field)?;
            let direction = directions.get(i).copied().unwrap_or_default();
            Ok(SortKey::new(field, direction))
        })
        .collect::<ParseResult<_>>()?;

    Ok((!keys.is_empty()).then_some(SortSpec { keys }))
}

fn parse_include(include: Option<&str>, with: Option<&str>) -> ParseResult<Option<IncludeSpec>> {
    let mut spec = IncludeSpec::default();
    for (param, raw) in [(PARAM_INCLUDE, include), (PARAM_WITH, with)] {
        let Some(raw) = raw else { continue };
        for entry in split_list(raw) {
            let path = match entry.strip_suffix(COUNT_SUFFIX) {
                Some(base) => IncludePath {
                    path: base.to_string(),
                    kind: IncludeKind::Count,
                },
                None => IncludePath {
                    path: entry,
                    kind: IncludeKind::Load,
                },
            };
            if path.path.is_empty() || path.path.split('.').any(str::is_empty) {
                return Err(ParseError::new(param, ParseErrorKind::EmptyField));
            }
            spec.insert(path);
        }
    }
    Ok((!spec.is_empty()).then_some(spec))
}

fn parse_compare(raw: &str) -> ParseResult<Vec<FieldComparison>> {
    segments(raw)
        .map(|entry| {
            let malformed = || {
                ParseError::new(
                    PARAM_COMPARE,
                    ParseErrorKind::MalformedCompare {
                        value: entry.to_string(),
                    },
                )
            };
            let parts: Vec<&str> = entry.split(PART_SEPARATOR).map(str::trim).collect();
            let [left, op, right] = parts.as_slice() else {
                return Err(malformed());
            };
            check_field(PARAM_COMPARE, left)?;
            check_field(PARAM_COMPARE, right)?;
            let operator = Operator::from_token(op)
                .filter(Operator::is_column_comparison)
                .ok_or_else(malformed)?;
            Ok(FieldComparison {
                left: left.to_string(),
                operator,
                right: right.to_string(),
            })
        })
        .collect()
}
