use super::*;

fn p(pairs: &[(&str, &str)]) -> ParseResult<QuerySpec> {
    parse(pairs.iter().copied())
}

fn text(values: &[&str]) -> Vec<Scalar> {
    values.iter().map(|v| Scalar::from(*v)).collect()
}

fn kind(result: ParseResult<QuerySpec>) -> ParseErrorKind {
    result.expect_err("should fail").kind
}

#[test]
fn test_filter_defaults_to_eq_and_and_join() {
    let spec = p(&[("filter", "status:active;role_id:in:3,7"), ("filterJoin", "and")])
        .expect("should parse");

    let filter = spec.filter.expect("filter present");
    assert_eq!(filter.join, JoinType::And);
    assert_eq!(filter.conditions.len(), 2);

    let status = &filter.conditions[0];
    assert_eq!(status.field, "status");
    assert_eq!(status.operator, Operator::Eq);
    assert_eq!(status.values, text(&["active"]));
    assert!(!status.maybe_encoded_id);

    let role = &filter.conditions[1];
    assert_eq!(role.field, "role_id");
    assert_eq!(role.operator, Operator::In);
    assert_eq!(role.values, text(&["3", "7"]));
    assert!(role.maybe_encoded_id);
}

#[test]
fn test_search_defaults_to_like_and_or_join() {
    let spec = p(&[("search", "name:like:john;email:doe"), ("searchJoin", "or")])
        .expect("should parse");

    let search = spec.search.expect("search present");
    assert_eq!(search.join, JoinType::Or);
    assert_eq!(search.conditions[0].operator, Operator::Like);
    assert_eq!(search.conditions[0].values, text(&["john"]));
    assert_eq!(search.conditions[1].field, "email");
    assert_eq!(search.conditions[1].operator, Operator::Like);
    assert!(search.term.is_none());
}

#[test]
fn test_search_join_default_is_or() {
    let spec = p(&[("search", "name:john")]).expect("should parse");
    assert_eq!(spec.search.expect("search").join, JoinType::Or);
}

#[test]
fn test_join_is_case_insensitive() {
    let spec = p(&[("filter", "a:1"), ("filterJoin", "OR")]).expect("should parse");
    assert_eq!(spec.filter.expect("filter").join, JoinType::Or);
}

#[test]
fn test_invalid_join() {
    assert_eq!(
        kind(p(&[("filter", "a:1"), ("filterJoin", "xor")])),
        ParseErrorKind::InvalidJoin {
            value: "xor".into()
        }
    );
}

#[test]
fn test_value_may_contain_colon_after_operator() {
    let spec = p(&[("filter", "created_at:>=:2024-01-01T10:00")]).expect("should parse");
    let cond = &spec.filter.expect("filter").conditions[0];
    assert_eq!(cond.operator, Operator::Gte);
    assert_eq!(cond.values, text(&["2024-01-01T10:00"]));
}

#[test]
fn test_single_value_operator_keeps_commas() {
    let spec = p(&[("filter", "title:like:hello, world")]).expect("should parse");
    let cond = &spec.filter.expect("filter").conditions[0];
    assert_eq!(cond.values, text(&["hello, world"]));
}

#[test]
fn test_operator_tokens_are_case_insensitive() {
    let spec = p(&[("filter", "a:NOTIN:1,2;b:Between:1,5;c:<>:x;d:ILIKE:y")])
        .expect("should parse");
    let ops: Vec<Operator> = spec
        .filter
        .expect("filter")
        .conditions
        .iter()
        .map(|c| c.operator)
        .collect();
    assert_eq!(
        ops,
        vec![
            Operator::NotIn,
            Operator::Between,
            Operator::Neq,
            Operator::Like
        ]
    );
}

#[test]
fn test_trailing_separator_is_ignored() {
    let spec = p(&[("filter", "status:active;")]).expect("should parse");
    assert_eq!(spec.filter.expect("filter").conditions.len(), 1);
}

#[test]
fn test_empty_filter_is_absent() {
    let spec = p(&[("filter", " ; ")]).expect("should parse");
    assert!(spec.filter.is_none());
    assert!(spec.is_empty());
}

#[test]
fn test_empty_field() {
    assert_eq!(kind(p(&[("filter", ":active")])), ParseErrorKind::EmptyField);
}

#[test]
fn test_missing_value() {
    assert_eq!(
        kind(p(&[("filter", "status:")])),
        ParseErrorKind::MissingValue {
            field: "status".into()
        }
    );
    assert_eq!(
        kind(p(&[("filter", "status")])),
        ParseErrorKind::MissingValue {
            field: "status".into()
        }
    );
}

#[test]
fn test_unterminated_list() {
    assert_eq!(
        kind(p(&[("filter", "role_id:in:3,")])),
        ParseErrorKind::UnterminatedList {
            field: "role_id".into()
        }
    );
}

#[test]
fn test_between_arity() {
    let err = p(&[("filter", "age:between:1,2,3")]).expect_err("should fail");
    assert_eq!(err.param, "filter");
    assert!(matches!(err.kind, ParseErrorKind::Arity { got: 3, .. }));

    assert!(matches!(
        kind(p(&[("filter", "age:between:1")])),
        ParseErrorKind::Arity { got: 1, .. }
    ));
}

#[test]
fn test_unknown_operator() {
    assert_eq!(
        kind(p(&[("filter", "status:approx:active")])),
        ParseErrorKind::UnknownOperator {
            field: "status".into(),
            token: "approx".into()
        }
    );
}

#[test]
fn test_operator_as_field() {
    assert_eq!(
        kind(p(&[("filter", "in:1,2")])),
        ParseErrorKind::OperatorAsField { token: "in".into() }
    );
    assert_eq!(
        kind(p(&[("filter", ">=:5")])),
        ParseErrorKind::OperatorAsField { token: ">=".into() }
    );
}

#[test]
fn test_is_null_takes_flag() {
    let spec = p(&[("filter", "deleted_at:is_null:true")]).expect("should parse");
    let cond = &spec.filter.expect("filter").conditions[0];
    assert_eq!(cond.operator, Operator::IsNull);
    assert_eq!(cond.values[0].as_flag(), Some(true));

    assert_eq!(
        kind(p(&[("filter", "deleted_at:is_null:maybe")])),
        ParseErrorKind::InvalidFlag {
            value: "maybe".into()
        }
    );
}

#[test]
fn test_date_operators_validate_format() {
    let spec = p(&[("filter", "created_at:date_between:2024-01-01,2024-02-01")])
        .expect("should parse");
    assert_eq!(
        spec.filter.expect("filter").conditions[0].values,
        text(&["2024-01-01", "2024-02-01"])
    );

    assert!(matches!(
        kind(p(&[("filter", "created_at:date:yesterday")])),
        ParseErrorKind::InvalidDate { .. }
    ));
}

#[test]
fn test_id_fields_are_flagged() {
    assert!(is_id_field("id"));
    assert!(is_id_field("role_id"));
    assert!(is_id_field("author.id"));
    assert!(is_id_field("posts.author_id"));
    assert!(!is_id_field("identity"));
    assert!(!is_id_field("id.name"));
    assert!(!is_id_field("paid"));
}

#[test]
fn test_bare_search_term_without_fields() {
    let spec = p(&[("search", "john")]).expect("should parse");
    let search = spec.search.expect("search");
    assert_eq!(search.term.as_deref(), Some("john"));
    assert!(search.conditions.is_empty());
}

#[test]
fn test_bare_search_term_expands_over_search_fields() {
    let spec = p(&[("search", "john"), ("searchFields", "name;email:=")]).expect("should parse");
    let search = spec.search.expect("search");
    assert!(search.term.is_none());
    assert_eq!(search.conditions.len(), 2);
    assert_eq!(search.conditions[0].field, "name");
    assert_eq!(search.conditions[0].operator, Operator::Like);
    assert_eq!(search.conditions[1].field, "email");
    assert_eq!(search.conditions[1].operator, Operator::Eq);
}

#[test]
fn test_search_fields_restrict_and_retype() {
    let spec = p(&[
        ("search", "name:john;email:doe;secret:x;age:>:30"),
        ("searchFields", "name;email:=;age"),
    ])
    .expect("should parse");

    let search = spec.search.expect("search");
    let fields: Vec<(&str, Operator)> = search
        .conditions
        .iter()
        .map(|c| (c.field.as_str(), c.operator))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("name", Operator::Like),
            ("email", Operator::Eq),
            ("age", Operator::Gt)
        ]
    );
}

#[test]
fn test_second_bare_term_is_rejected() {
    assert!(matches!(
        kind(p(&[("search", "john;doe")])),
        ParseErrorKind::MissingValue { .. }
    ));
}

#[test]
fn test_sort_pairs_directions() {
    let spec = p(&[("orderBy", "created_at,name,id"), ("sortedBy", "desc")])
        .expect("should parse");
    let keys = spec.sort.expect("sort").keys;
    assert_eq!(
        keys,
        vec![
            SortKey::new("created_at", SortDirection::Desc),
            SortKey::new("name", SortDirection::Asc),
            SortKey::new("id", SortDirection::Asc),
        ]
    );
}

#[test]
fn test_sort_ignores_surplus_directions() {
    let spec = p(&[("orderBy", "name"), ("sortedBy", "desc,asc,desc")]).expect("should parse");
    assert_eq!(spec.sort.expect("sort").keys.len(), 1);
}

#[test]
fn test_sort_invalid_direction() {
    let err = p(&[("orderBy", "name"), ("sortedBy", "down")]).expect_err("should fail");
    assert_eq!(err.param, "sortedBy");
    assert_eq!(
        err.kind,
        ParseErrorKind::InvalidDirection {
            value: "down".into()
        }
    );
}

#[test]
fn test_include_and_with_merge_in_order() {
    let spec = p(&[
        ("include", "posts,comments_count,posts"),
        ("with", "author.profile,posts"),
    ])
    .expect("should parse");

    let paths = spec.include.expect("include").paths;
    assert_eq!(
        paths,
        vec![
            IncludePath {
                path: "posts".into(),
                kind: IncludeKind::Load
            },
            IncludePath {
                path: "comments".into(),
                kind: IncludeKind::Count
            },
            IncludePath {
                path: "author.profile".into(),
                kind: IncludeKind::Load
            },
        ]
    );
}

#[test]
fn test_include_rejects_bare_count_suffix() {
    assert_eq!(kind(p(&[("include", "_count")])), ParseErrorKind::EmptyField);
}

#[test]
fn test_compare_and_group_by() {
    let spec = p(&[
        ("compare", "updated_at:>:created_at;a:eq:b"),
        ("groupBy", "status, role_id"),
    ])
    .expect("should parse");

    assert_eq!(
        spec.compare,
        vec![
            FieldComparison {
                left: "updated_at".into(),
                operator: Operator::Gt,
                right: "created_at".into()
            },
            FieldComparison {
                left: "a".into(),
                operator: Operator::Eq,
                right: "b".into()
            },
        ]
    );
    assert_eq!(spec.group_by, vec!["status", "role_id"]);
}

#[test]
fn test_compare_rejects_value_operators() {
    assert!(matches!(
        kind(p(&[("compare", "a:like:b")])),
        ParseErrorKind::MalformedCompare { .. }
    ));
    assert!(matches!(
        kind(p(&[("compare", "a:b")])),
        ParseErrorKind::MalformedCompare { .. }
    ));
}

#[test]
fn test_having_uses_filter_grammar() {
    let spec = p(&[("having", "total:>:10;total:between:1,100")]).expect("should parse");
    let having = spec.having.expect("having");
    assert_eq!(having.join, JoinType::And);
    assert_eq!(having.conditions[0].operator, Operator::Gt);
    assert_eq!(having.conditions[1].values.len(), 2);
}

#[test]
fn test_skip_cache_flag() {
    assert!(p(&[("skipCache", "1")]).expect("parse").skip_cache);
    assert!(!p(&[("skipCache", "false")]).expect("parse").skip_cache);
    assert!(matches!(
        kind(p(&[("skipCache", "nope")])),
        ParseErrorKind::InvalidFlag { .. }
    ));
}

#[test]
fn test_unknown_params_are_ignored() {
    let spec = p(&[("page", "2"), ("per_page", "15")]).expect("should parse");
    assert_eq!(spec, QuerySpec::default());
}

#[test]
fn test_error_display_names_param() {
    let err = p(&[("filter", "status:approx:x")]).expect_err("should fail");
    assert_eq!(
        err.to_string(),
        "invalid 'filter' parameter: unknown operator 'approx' for field 'status'"
    );
}

#[test]
fn test_round_trip_is_stable() {
    let inputs: Vec<Vec<(&str, &str)>> = vec![
        vec![("filter", "status:active;role_id:in:3,7"), ("filterJoin", "and")],
        vec![("search", "name:like:john;email:doe"), ("searchJoin", "OR")],
        vec![("search", "john"), ("searchFields", "name;email:=")],
        vec![("search", "john;name:x")],
        vec![
            ("filter", "created_at:>=:2024-01-01T10:00;title:hello, world"),
            ("orderBy", "created_at,name"),
            ("sortedBy", "desc"),
        ],
        vec![
            ("include", "posts,comments_count"),
            ("with", "author"),
            ("groupBy", "status"),
            ("having", "total:>:10"),
            ("havingJoin", "or"),
        ],
        vec![
            ("compare", "updated_at:>=:created_at"),
            ("filter", "deleted_at:is_not_null:0;d:date:2024-03-01"),
            ("skipCache", "true"),
        ],
    ];

    for input in inputs {
        let first = p(&input).expect("should parse");
        let params = to_params(&first);
        let second = parse(&params).expect("serialized params should parse");
        assert_eq!(first, second, "round trip changed {input:?} via {params:?}");
    }
}
