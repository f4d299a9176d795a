//! Cross-cutting, shared constants.
//!
//! Request parameter names follow the conventional repository query grammar. Tag
//! formats are shared between query-time and write-time derivation and must stay in
//! lockstep, so both sides read them from here.

pub const PARAM_SEARCH: &str = "search";
pub const PARAM_SEARCH_FIELDS: &str = "searchFields";
pub const PARAM_SEARCH_JOIN: &str = "searchJoin";
pub const PARAM_FILTER: &str = "filter";
pub const PARAM_FILTER_JOIN: &str = "filterJoin";
pub const PARAM_ORDER_BY: &str = "orderBy";
pub const PARAM_SORTED_BY: &str = "sortedBy";
pub const PARAM_INCLUDE: &str = "include";
pub const PARAM_WITH: &str = "with";
pub const PARAM_COMPARE: &str = "compare";
pub const PARAM_HAVING: &str = "having";
pub const PARAM_HAVING_JOIN: &str = "havingJoin";
pub const PARAM_GROUP_BY: &str = "groupBy";
pub const PARAM_SKIP_CACHE: &str = "skipCache";

/// Separates conditions inside `search`, `filter`, `having` and `compare`.
pub const CONDITION_SEPARATOR: char = ';';
/// Separates field, operator and value inside one condition.
pub const PART_SEPARATOR: char = ':';
/// Separates list elements (`in`, `between`, `orderBy`, `include`, ...).
pub const LIST_SEPARATOR: char = ',';

/// Date format accepted by `date` and `date_between` filters.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Suffix marking an aggregate include (`comments_count`).
pub const COUNT_SUFFIX: &str = "_count";

/// Separator used inside cache tags and cache keys.
pub const TAG_SEPARATOR: &str = ":";
/// Middle segment of a field-generic tag (`user:field:status`).
pub const FIELD_TAG_SEGMENT: &str = "field";
/// Middle segment of an identity tag (`user:id:42`).
pub const ID_TAG_SEGMENT: &str = "id";

pub const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 60;
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;
pub const DEFAULT_INVALIDATION_RETRIES: u32 = 2;
pub const INVALIDATION_BACKOFF_MS: u64 = 10;

/// Number of digest bytes kept per hashed key segment (128 bits).
pub const KEY_DIGEST_BYTES: usize = 16;

pub const METHOD_ALL: &str = "all";
pub const METHOD_FIRST: &str = "first";
pub const METHOD_FIND: &str = "find";
pub const METHOD_FIND_BY_FIELD: &str = "find_by_field";
pub const METHOD_FIND_MANY: &str = "find_many";
pub const METHOD_PAGINATE: &str = "paginate";
pub const METHOD_COUNT: &str = "count";

/// Read methods that go through the cache and may appear in `cache_only` / `cache_except`.
pub const CACHEABLE_METHODS: [&str; 7] = [
    METHOD_ALL,
    METHOD_FIRST,
    METHOD_FIND,
    METHOD_FIND_BY_FIELD,
    METHOD_FIND_MANY,
    METHOD_PAGINATE,
    METHOD_COUNT,
];

pub const DEFAULT_PER_PAGE: u64 = 15;
