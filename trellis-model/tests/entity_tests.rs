use std::sync::Arc;

use pretty_assertions::assert_eq;
use trellis_model::{Domain, Entity, EntityEntry, FieldEntry, FieldType, ModelError};

fn text() -> Arc<Domain> {
    Arc::new(Domain::new("DO_TEXT", FieldType::Text))
}

// ── Builder ──────────────────────────────────────────────────────

#[test]
fn builder_keeps_declaration_order() {
    let d = text();
    let address = Entity::builder("address")
        .field(FieldEntry::new("city", &d))
        .build()
        .unwrap();
    let contact = Entity::builder("contact")
        .field(FieldEntry::new("name", &d).required().with_label("contact.name"))
        .object("address", &address)
        .list("previous", &address)
        .build()
        .unwrap();

    let names: Vec<&str> = contact.entries().iter().map(EntityEntry::name).collect();
    assert_eq!(names, vec!["name", "address", "previous"]);
    assert_eq!(contact.len(), 3);
    assert_eq!(contact.name(), "contact");
}

#[test]
fn field_lookup() {
    let d = text();
    let e = Entity::builder("e")
        .field(FieldEntry::new("a", &d).required())
        .build()
        .unwrap();
    let a = e.field("a").unwrap();
    assert!(a.is_required);
    assert!(e.field("missing").is_none());
}

#[test]
fn nested_entities_are_shared() {
    let d = text();
    let inner = Entity::builder("inner")
        .field(FieldEntry::new("x", &d))
        .build()
        .unwrap();
    let outer = Entity::builder("outer")
        .object("one", &inner)
        .list("many", &inner)
        .build()
        .unwrap();

    let (EntityEntry::Object(one), EntityEntry::List(many)) =
        (outer.entry("one").unwrap(), outer.entry("many").unwrap())
    else {
        panic!("unexpected entry kinds");
    };
    assert!(Arc::ptr_eq(&one.entity, &inner));
    assert!(Arc::ptr_eq(&many.entity, &inner));
}

#[test]
fn duplicate_entry_rejected() {
    let d = text();
    let err = Entity::builder("dup")
        .field(FieldEntry::new("a", &d))
        .field(FieldEntry::new("a", &d))
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        ModelError::DuplicateEntry { ref entity, ref entry } if entity == "dup" && entry == "a"
    ));
}

#[test]
fn field_entry_defaults() {
    let d = text();
    let f = FieldEntry::new("comment", &d).with_comment("free text");
    assert!(!f.is_required);
    assert_eq!(f.label, None);
    assert_eq!(f.comment.as_deref(), Some("free text"));
    assert!(Arc::ptr_eq(&f.domain, &d));
}
