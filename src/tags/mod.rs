//! Invalidation tag derivation.
//!
//! Query tags are value-specific (`user:status:active`) while write tags are
//! field-generic (`user:field:status`): a write cannot know which value bucket it
//! left, so it invalidates every query that filtered on the field. Both sides
//! share the entity tag and the `entity:id:<id>` identity tag.

use std::collections::BTreeSet;

use crate::constants::{FIELD_TAG_SEGMENT, ID_TAG_SEGMENT, TAG_SEPARATOR};
use crate::criteria::Criterion;
use crate::dsl::{Operator, Scalar};

/// Ordered, de-duplicated tag set.
pub type TagSet = BTreeSet<String>;

#[inline]
pub fn entity_tag(entity_type: &str) -> String {
    entity_type.to_string()
}

/// `entity:field:<field>`
pub fn field_tag(entity_type: &str, field: &str) -> String {
    [entity_type, FIELD_TAG_SEGMENT, field].join(TAG_SEPARATOR)
}

/// `entity:<field>:<value>`
pub fn value_tag(entity_type: &str, field: &str, value: &Scalar) -> String {
    [entity_type, field, value.render().as_str()].join(TAG_SEPARATOR)
}

/// `entity:id:<id>`
pub fn id_tag(entity_type: &str, id: &Scalar) -> String {
    value_tag(entity_type, ID_TAG_SEGMENT, id)
}

/// Tags for a read under `criteria`.
///
/// Always contains the entity tag. Each filtered field adds its field tag, and each
/// single-valued `eq` filter adds the matching value tag. Filters that can match
/// nothing contribute only their field tag.
pub fn tags_for_query(entity_type: &str, criteria: &[Criterion]) -> TagSet {
    let mut tags = TagSet::new();
    tags.insert(entity_tag(entity_type));

    for filter in criteria.iter().flat_map(Criterion::filters) {
        tags.insert(field_tag(entity_type, &filter.field));
        if filter.operator == Operator::Eq
            && !filter.unmatchable
            && let [value] = filter.values.as_slice()
        {
            tags.insert(value_tag(entity_type, &filter.field, value));
        }
    }

    tags
}

/// Tags a write to entity `id` must invalidate.
pub fn tags_for_entity<S: AsRef<str>>(
    entity_type: &str,
    id: &Scalar,
    changed_fields: &[S],
) -> TagSet {
    let mut tags = TagSet::new();
    tags.insert(entity_tag(entity_type));
    tags.insert(id_tag(entity_type, id));
    for field in changed_fields {
        tags.insert(field_tag(entity_type, field.as_ref()));
    }
    tags
}
