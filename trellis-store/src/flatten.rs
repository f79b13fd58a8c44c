//! Plain snapshots of node trees.

use serde_json::{Map, Value};

use crate::node::Node;
use crate::object::ObjectNode;

/// Extracts the plain values of a node tree.
///
/// Objects become JSON objects in entity order, lists become arrays and
/// fields their value. Computed fields and form state are left out.
/// Every read is tracked, so calling this inside a reaction's expression
/// subscribes to the whole tree.
pub fn to_flat_values(node: &Node) -> Value {
    match node {
        Node::Field(field) => field.value(),
        Node::Object(object) => flatten_object(object),
        Node::List(list) => Value::Array(list.items().iter().map(flatten_object).collect()),
    }
}

pub(crate) fn flatten_object(node: &ObjectNode) -> Value {
    let mut map = Map::new();
    for (name, child) in node.children() {
        if matches!(&child, Node::Field(field) if field.is_computed()) {
            continue;
        }
        map.insert(name, to_flat_values(&child));
    }
    Value::Object(map)
}
