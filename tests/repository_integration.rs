//! Integration tests for the repository over the in-memory tag store.

mod common;

use common::fixtures::{
    ENTITY, attributes, generate_users, ids, memory_repository, request, user_store,
};
use quarry::{
    CacheCoordinator, Config, CriteriaPipeline, MemoryTagStore, Repository, Scalar,
    tags_for_entity,
};
use serde_json::json;

#[tokio::test]
async fn test_filter_and_sort_request() {
    let repo = memory_repository(user_store(generate_users(30)));
    let pipeline = request(
        &repo,
        &[
            ("filter", "status:active;age:>:40"),
            ("filterJoin", "and"),
            ("orderBy", "age"),
            ("sortedBy", "desc"),
        ],
    );

    let users = repo.all(&pipeline).await.expect("all");
    assert_eq!(ids(&users), vec![28, 25, 22]);
}

#[tokio::test]
async fn test_id_list_filter_is_decoded() {
    let repo = memory_repository(user_store(generate_users(30)));
    let pipeline = request(&repo, &[("filter", "role_id:in:1,2")]);

    assert_eq!(repo.count(&pipeline).await.expect("count"), 20);
}

#[tokio::test]
async fn test_paginated_request() {
    let repo = memory_repository(user_store(generate_users(30)));
    let pipeline = request(&repo, &[("filter", "status:pending"), ("orderBy", "id")]);

    let page = repo.paginate(2, Some(4), &pipeline).await.expect("paginate");

    assert_eq!(ids(&page.items), vec![15, 18, 21, 24]);
    assert_eq!(page.total, 10);
    assert_eq!(page.last_page(), 3);
    assert!(page.has_more());
}

#[tokio::test]
async fn test_bare_search_term_matches_any_searchable_field() {
    let repo = memory_repository(user_store(generate_users(30)));
    let pipeline = request(&repo, &[("search", "user-2")]);

    let users = repo.all(&pipeline).await.expect("all");
    assert_eq!(users.len(), 11);
}

#[tokio::test]
async fn test_write_evicts_tagged_queries() {
    let repo = memory_repository(user_store(generate_users(30)));
    let pipeline = request(&repo, &[("filter", "status:active")]);

    assert_eq!(repo.count(&pipeline).await.expect("count"), 10);
    let cached = repo.cache().store().keys_for_tag("user:status:active");
    assert_eq!(cached.len(), 1);
    assert_eq!(repo.cache().store().keys_for_tag("user:field:status"), cached);

    repo.update(2_i64, attributes(json!({"status": "active"})))
        .await
        .expect("update");
    assert!(repo.cache().store().keys_for_tag("user:status:active").is_empty());

    assert_eq!(repo.count(&pipeline).await.expect("count"), 11);
    assert_eq!(repo.store().count_calls(), 2);
}

#[tokio::test]
async fn test_field_tag_invalidation_leaves_other_fields() {
    let repo = memory_repository(user_store(generate_users(30)));
    let store = repo.cache().store();

    repo.count(&request(&repo, &[("filter", "status:active")]))
        .await
        .expect("count");
    repo.count(&request(&repo, &[("filter", "age:>:40")]))
        .await
        .expect("count");
    assert_eq!(store.indexed_keys(), 2);

    // A write that only touched status, addressed without the entity tag.
    let mut tags = tags_for_entity(ENTITY, &Scalar::Int(42), &["status"]);
    tags.remove(ENTITY);
    repo.cache().invalidate(&tags).await.expect("invalidate");

    assert!(store.keys_for_tag("user:field:status").is_empty());
    assert_eq!(store.keys_for_tag("user:field:age").len(), 1);
}

#[tokio::test]
async fn test_date_filter_after_update() {
    let repo = memory_repository(user_store(generate_users(10)));
    let pipeline = request(&repo, &[("filter", "created_at:date:2024-03-01")]);

    assert!(repo.all(&pipeline).await.expect("all").is_empty());

    repo.update(5_i64, attributes(json!({"created_at": "2024-03-01"})))
        .await
        .expect("update");

    assert_eq!(ids(&repo.all(&pipeline).await.expect("all")), vec![5]);
}

#[tokio::test]
async fn test_create_find_delete_lifecycle() {
    let repo = memory_repository(user_store(generate_users(3)));
    let empty = CriteriaPipeline::new();

    assert!(repo.find(4_i64, &empty).await.expect("find").is_none());

    let created = repo
        .create(attributes(json!({"name": "Zoe", "status": "pending"})))
        .await
        .expect("create");
    assert_eq!(created["id"], json!(4));

    let found = repo.find(4_i64, &empty).await.expect("find");
    assert_eq!(found.map(|r| r["name"].clone()), Some(json!("Zoe")));

    assert!(repo.delete(4_i64).await.expect("delete"));
    assert!(repo.find(4_i64, &empty).await.expect("find").is_none());
    assert_eq!(repo.count(&empty).await.expect("count"), 3);
}

#[tokio::test]
async fn test_repository_from_default_config() {
    let config = Config::default();
    config.validate().expect("defaults are valid");

    let cache = CacheCoordinator::with_config(
        MemoryTagStore::with_config(config.memory_store_config()),
        config.coordinator_config(),
    );
    let repo = Repository::new(user_store(generate_users(5)), cache)
        .with_config(config.repository_config());

    let pipeline = CriteriaPipeline::new();
    repo.all(&pipeline).await.expect("all");
    repo.all(&pipeline).await.expect("all");

    assert_eq!(repo.store().fetch_calls(), 1);
    assert_eq!(repo.cache().stats().hits, 1);
}
