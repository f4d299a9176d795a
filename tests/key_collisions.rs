//! Integration tests for cache key derivation.

use std::collections::HashSet;

use quarry::{
    CriteriaPipeline, Criterion, FilterSpec, Scalar, SortDirection, SortKey, derive_key, parse,
};
use serde_json::{Value, json};

#[test]
fn test_keys_are_unique_across_ten_thousand_inputs() {
    let mut keys = HashSet::new();

    for i in 0..10_000_i64 {
        let criteria = [
            Criterion::where_eq("status", format!("s{}", i % 100)),
            Criterion::Limit {
                limit: (i / 100) as u64,
                offset: 0,
            },
        ];
        let key = derive_key("user", "all", &[], &criteria).expect("derive");
        assert!(keys.insert(key.as_str().to_string()), "collision at input {i}");
    }

    assert_eq!(keys.len(), 10_000);
}

#[test]
fn test_keys_are_stable_for_equal_inputs() {
    let build = || {
        let spec = parse([("filter", "status:active;age:>:30"), ("orderBy", "name")])
            .expect("parse");
        CriteriaPipeline::from_request(spec).pushed(Criterion::where_eq("role_id", 3_i64))
    };

    let a = derive_key("user", "all", &[], build().applied()).expect("derive");
    let b = derive_key("user", "all", &[], build().applied()).expect("derive");

    assert_eq!(a, b);
    assert!(a.as_str().starts_with("user:all:"));
}

#[test]
fn test_criteria_order_changes_the_key() {
    let sort = Criterion::OrderBy(SortKey::new("name", SortDirection::Asc));
    let filter = Criterion::where_eq("status", "active");

    let forward =
        derive_key("user", "all", &[], &[sort.clone(), filter.clone()]).expect("derive");
    let reversed = derive_key("user", "all", &[], &[filter, sort]).expect("derive");

    assert_ne!(forward, reversed);
}

#[test]
fn test_argument_shape_changes_the_key() {
    let cases: Vec<Vec<Value>> = vec![
        vec![],
        vec![json!(1)],
        vec![json!("1")],
        vec![json!([1])],
        vec![json!(1), json!(2)],
        vec![json!([1, 2])],
        vec![json!("a:b")],
        vec![json!("a"), json!("b")],
    ];

    let keys: HashSet<String> = cases
        .iter()
        .map(|args| {
            derive_key("user", "find", args, &[])
                .expect("derive")
                .to_string()
        })
        .collect();

    assert_eq!(keys.len(), cases.len());
}

#[test]
fn test_scalar_kinds_do_not_collide() {
    let values = [
        Scalar::Int(1),
        Scalar::Text("1".into()),
        Scalar::Bool(true),
        Scalar::Text("true".into()),
        Scalar::Null,
        Scalar::Text("null".into()),
    ];

    let keys: HashSet<String> = values
        .iter()
        .map(|v| {
            let criteria = [Criterion::Where(FilterSpec::eq("flag", v.clone()))];
            derive_key("user", "all", &[], &criteria)
                .expect("derive")
                .to_string()
        })
        .collect();

    assert_eq!(keys.len(), values.len());
}

#[test]
fn test_entity_and_operation_namespace_keys() {
    let criteria = [Criterion::where_eq("status", "active")];

    let keys: HashSet<String> = [("user", "all"), ("user", "count"), ("post", "all")]
        .iter()
        .map(|(entity, op)| {
            derive_key(entity, op, &[], &criteria)
                .expect("derive")
                .to_string()
        })
        .collect();

    assert_eq!(keys.len(), 3);
}
