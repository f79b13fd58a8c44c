//! Node identity and the closed set of node kinds.

use std::fmt;
use std::rc::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use crate::error::StoreResult;
use crate::field::EntityField;
use crate::list::{ListInner, ListNode};
use crate::object::{ObjectInner, ObjectNode};

/// Identity of an object or list node.
///
/// Ids are never reused within a process; form list elements are matched
/// to their source elements by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of a store or form tree. The kind is fixed by the entity entry
/// the node was built from.
#[derive(Debug, Clone)]
pub enum Node {
    Field(EntityField),
    Object(ObjectNode),
    List(ListNode),
}

impl Node {
    pub fn as_field(&self) -> Option<&EntityField> {
        match self {
            Self::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListNode> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    /// Identity of object and list nodes. Fields have none.
    pub fn id(&self) -> Option<NodeId> {
        match self {
            Self::Field(_) => None,
            Self::Object(object) => Some(object.id()),
            Self::List(list) => Some(list.id()),
        }
    }

    pub fn is_form(&self) -> bool {
        match self {
            Self::Field(field) => field.is_form(),
            Self::Object(object) => object.is_form(),
            Self::List(list) => list.is_form(),
        }
    }

    /// Reactive validity of the subtree.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Field(field) => field.is_valid(),
            Self::Object(object) => object.is_valid(),
            Self::List(list) => list.is_valid(),
        }
    }

    /// The subtree's shape with each field replaced by its error or `Null`.
    pub fn errors(&self) -> Value {
        match self {
            Self::Field(field) => field.error().map_or(Value::Null, Value::String),
            Self::Object(object) => object.errors(),
            Self::List(list) => list.errors(),
        }
    }

    /// Assigns a plain value to the node.
    pub fn set(&self, value: &Value) -> StoreResult<()> {
        match self {
            Self::Field(field) => field.set_value(value.clone()),
            Self::Object(object) => object.set(value),
            Self::List(list) => list.set(value),
        }
    }

    pub fn clear(&self) {
        match self {
            Self::Field(field) => field.clear(),
            Self::Object(object) => object.clear(),
            Self::List(list) => list.clear(),
        }
    }
}

impl From<EntityField> for Node {
    fn from(field: EntityField) -> Self {
        Self::Field(field)
    }
}

impl From<ObjectNode> for Node {
    fn from(object: ObjectNode) -> Self {
        Self::Object(object)
    }
}

impl From<ListNode> for Node {
    fn from(list: ListNode) -> Self {
        Self::List(list)
    }
}

/// Non-owning link from a form node to the node it was derived from.
#[derive(Clone)]
pub(crate) struct SourceRef {
    id: NodeId,
    node: WeakNode,
}

#[derive(Clone)]
enum WeakNode {
    Object(Weak<ObjectInner>),
    List(Weak<ListInner>),
}

impl SourceRef {
    pub(crate) fn object(node: &ObjectNode) -> Self {
        Self {
            id: node.id(),
            node: WeakNode::Object(node.downgrade()),
        }
    }

    pub(crate) fn list(node: &ListNode) -> Self {
        Self {
            id: node.id(),
            node: WeakNode::List(node.downgrade()),
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    /// The source node, if it is still alive.
    pub(crate) fn upgrade(&self) -> Option<Node> {
        match &self.node {
            WeakNode::Object(weak) => weak
                .upgrade()
                .map(|inner| Node::Object(ObjectNode::from_inner(inner))),
            WeakNode::List(weak) => weak
                .upgrade()
                .map(|inner| Node::List(ListNode::from_inner(inner))),
        }
    }
}

impl fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRef")
            .field("id", &self.id)
            .field("alive", &self.upgrade().is_some())
            .finish()
    }
}
