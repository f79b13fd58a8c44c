//! Bulk assignment and clearing.
//!
//! Assignment runs in two passes: `check_*` walks the value against the
//! target shape and fails without touching anything, then `apply_*` writes.
//! Callers wrap the write pass in a batch.

use serde_json::Value;
use trellis_model::{Entity, EntityEntry};

use crate::error::{StoreError, StoreResult};
use crate::list::ListNode;
use crate::node::Node;
use crate::object::ObjectNode;

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(path: &str, expected: &'static str, found: &Value) -> StoreError {
    StoreError::TypeMismatch {
        path: if path.is_empty() { "$".to_string() } else { path.to_string() },
        expected,
        found: kind(found),
    }
}

fn unknown(entity: &Entity, property: &str) -> StoreError {
    StoreError::UnknownProperty {
        entity: entity.name().to_string(),
        property: property.to_string(),
    }
}

/// Checks a value against an existing object node, computed fields
/// included.
pub(crate) fn check_object(node: &ObjectNode, value: &Value, path: &str) -> StoreResult<()> {
    let map = match value {
        Value::Null => return Ok(()),
        Value::Object(map) => map,
        other => return Err(mismatch(path, "object", other)),
    };
    for (key, item) in map {
        let child = node.child(key).ok_or_else(|| unknown(node.entity(), key))?;
        let path = join(path, key);
        match child {
            Node::Field(_) => {}
            Node::Object(object) => check_object(&object, item, &path)?,
            Node::List(list) => check_list(list.entity(), item, &path)?,
        }
    }
    Ok(())
}

/// Checks a value for a list of `entity` elements.
pub(crate) fn check_list(entity: &Entity, value: &Value, path: &str) -> StoreResult<()> {
    let items = match value {
        Value::Null => return Ok(()),
        Value::Array(items) => items,
        other => return Err(mismatch(path, "array", other)),
    };
    for (i, item) in items.iter().enumerate() {
        check_element(entity, item, &format!("{path}[{i}]"))?;
    }
    Ok(())
}

/// Checks a value for a node that does not exist yet.
pub(crate) fn check_element(entity: &Entity, value: &Value, path: &str) -> StoreResult<()> {
    let map = match value {
        Value::Null => return Ok(()),
        Value::Object(map) => map,
        other => return Err(mismatch(path, "object", other)),
    };
    for (key, item) in map {
        let entry = entity.entry(key).ok_or_else(|| unknown(entity, key))?;
        let path = join(path, key);
        match entry {
            EntityEntry::Field(_) => {}
            EntityEntry::Object(object) => check_element(&object.entity, item, &path)?,
            EntityEntry::List(list) => check_list(&list.entity, item, &path)?,
        }
    }
    Ok(())
}

/// Writes a checked value into an object node. Computed fields are
/// skipped.
pub(crate) fn apply_object(node: &ObjectNode, value: &Value) {
    match value {
        Value::Null => clear_object(node),
        Value::Object(map) => {
            for (key, item) in map {
                match node.child(key) {
                    Some(Node::Field(field)) => field.store(item.clone()),
                    Some(Node::Object(object)) => apply_object(&object, item),
                    Some(Node::List(list)) => apply_list(&list, item),
                    None => {}
                }
            }
        }
        _ => {}
    }
}

/// Replaces a list's elements with new ones seeded from a checked array.
/// Elements of a form list built this way have no source.
pub(crate) fn apply_list(list: &ListNode, value: &Value) {
    let items = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                let element = list.new_element(None);
                apply_object(&element, item);
                element
            })
            .collect(),
        _ => Vec::new(),
    };
    list.replace_items(items);
}

pub(crate) fn clear_object(node: &ObjectNode) {
    for (_, child) in node.children() {
        match child {
            Node::Field(field) => field.clear(),
            Node::Object(object) => clear_object(&object),
            Node::List(list) => list.replace_items(Vec::new()),
        }
    }
}
