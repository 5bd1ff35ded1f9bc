//! Property-based testing utilities using proptest.

use proptest::prelude::*;
use serde_json::{Map, Value};

/// Any JSON scalar an event payload may carry.
pub fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[a-z0-9 ]{0,12}".prop_map(Value::String),
    ]
}

/// A flat JSON object with up to `max_fields` scalar fields.
pub fn flat_payload(max_fields: usize) -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-z]{1,8}", scalar(), 0..=max_fields)
        .prop_map(|fields| Value::Object(fields.into_iter().collect::<Map<String, Value>>()))
}

/// Entity ids that are valid stream key components.
pub fn entity_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,7}"
}
