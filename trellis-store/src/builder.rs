//! Builds observable trees from entity metadata.

use std::sync::Arc;

use indexmap::IndexMap;
use trellis_model::{Entity, EntityEntry};

use crate::field::EntityField;
use crate::form::{FormSeed, FormState};
use crate::list::ListNode;
use crate::node::{Node, SourceRef};
use crate::object::ObjectNode;

/// Builds a store node for `entity`. Every field starts out `Null` and
/// every list empty.
pub fn build_node(entity: &Arc<Entity>) -> ObjectNode {
    build_object(entity, None, None)
}

/// Builds a store list whose elements are `entity` nodes.
pub fn build_list_node(entity: &Arc<Entity>) -> ListNode {
    build_list(entity, None, None)
}

/// Builds an object node. With a seed, the node and its whole subtree are
/// form nodes; nested nodes inherit the node's edit state. A form built
/// from `source` links every nested object and list to its counterpart
/// below `source`.
pub(crate) fn build_object(
    entity: &Arc<Entity>,
    seed: Option<FormSeed>,
    source: Option<&ObjectNode>,
) -> ObjectNode {
    let form = seed.map(FormState::new);
    let mut children = IndexMap::with_capacity(entity.len());
    for entry in entity.entries() {
        let name = entry.name();
        let child = match entry {
            EntityEntry::Field(field) => {
                Node::Field(EntityField::stored(field, form.as_ref().map(|f| &f.is_edit)))
            }
            EntityEntry::Object(object) => {
                let from = source.and_then(|source| source.object(name));
                Node::Object(build_object(
                    &object.entity,
                    form.as_ref().map(FormSeed::nested),
                    from.as_ref(),
                ))
            }
            EntityEntry::List(list) => {
                let from = source.and_then(|source| source.list(name));
                Node::List(build_list(
                    &list.entity,
                    form.as_ref().map(FormSeed::nested),
                    from.as_ref(),
                ))
            }
        };
        children.insert(name.to_string(), child);
    }
    ObjectNode::new(entity, children, form, source.map(SourceRef::object))
}

pub(crate) fn build_list(
    entity: &Arc<Entity>,
    seed: Option<FormSeed>,
    source: Option<&ListNode>,
) -> ListNode {
    ListNode::new(entity, seed.map(FormState::new), source.map(SourceRef::list))
}
