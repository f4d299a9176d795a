//! Test fixtures for integration tests.

use std::time::Duration;

use quarry::{
    Attributes, CacheCoordinator, CoordinatorConfig, CriteriaPipeline, MemoryStoreConfig,
    MemoryTagStore, MockEntityStore, Operator, Repository, RepositoryConfig,
};
use serde_json::{Value, json};

pub const ENTITY: &str = "user";

pub const FIXED_CREATED_AT: &str = "2024-01-15";

pub const STATUSES: [&str; 3] = ["active", "inactive", "pending"];

pub type MemoryRepository = Repository<MockEntityStore, MemoryTagStore>;

#[derive(Default)]
pub struct UserRowBuilder {
    id: Option<i64>,
    name: Option<String>,
    email: Option<String>,
    status: Option<String>,
    age: Option<i64>,
    role_id: Option<i64>,
    created_at: Option<String>,
}

impl UserRowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn age(mut self, age: i64) -> Self {
        self.age = Some(age);
        self
    }

    pub fn role_id(mut self, role_id: i64) -> Self {
        self.role_id = Some(role_id);
        self
    }

    pub fn created_at(mut self, date: &str) -> Self {
        self.created_at = Some(date.to_string());
        self
    }

    pub fn build(self) -> Value {
        let id = self.id.unwrap_or(1);
        let name = self.name.unwrap_or_else(|| format!("user-{id}"));
        json!({
            "id": id,
            "email": self.email.unwrap_or_else(|| format!("{}@example.com", name.to_lowercase())),
            "name": name,
            "status": self.status.unwrap_or_else(|| "active".to_string()),
            "age": self.age.unwrap_or(30),
            "role_id": self.role_id.unwrap_or(1),
            "created_at": self.created_at.unwrap_or_else(|| FIXED_CREATED_AT.to_string()),
        })
    }
}

/// `count` rows with ids `1..=count`, cycling through [`STATUSES`] and roles 1 to 3.
pub fn generate_users(count: i64) -> Vec<Value> {
    (1..=count)
        .map(|id| {
            UserRowBuilder::new()
                .id(id)
                .status(STATUSES[(id as usize - 1) % STATUSES.len()])
                .age(20 + id % 40)
                .role_id(id % 3 + 1)
                .build()
        })
        .collect()
}

pub fn user_store(rows: Vec<Value>) -> MockEntityStore {
    MockEntityStore::new(ENTITY).with_rows(rows)
}

pub fn memory_repository(store: MockEntityStore) -> MemoryRepository {
    let cache = CacheCoordinator::with_config(
        MemoryTagStore::with_config(MemoryStoreConfig::default().with_capacity(1_000)),
        CoordinatorConfig::default().with_backoff(Duration::from_millis(1)),
    );
    Repository::new(store, cache)
        .with_config(RepositoryConfig::default().with_ttl(Duration::from_secs(60)))
        .with_searchable([("name", Operator::Like), ("email", Operator::Like)])
}

pub fn request(repo: &MemoryRepository, pairs: &[(&str, &str)]) -> CriteriaPipeline {
    repo.pipeline_from_params(pairs.iter().copied())
        .expect("request should parse")
}

pub fn attributes(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

pub fn ids(records: &[Value]) -> Vec<i64> {
    records.iter().filter_map(|r| r["id"].as_i64()).collect()
}
