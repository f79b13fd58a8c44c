mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value, json};
use trellis_model::FieldEntry;
use trellis_reactive::Reaction;
use trellis_store::{Node, StoreError, build_list_node, build_node, to_flat_values};

// ── Builder ──────────────────────────────────────────────────────

#[test]
fn build_node_mirrors_entity() {
    let node = build_node(&contact_entity());
    let names: Vec<String> = node.children().into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["id", "name", "email", "address", "phones"]);

    assert!(matches!(node.child("id"), Some(Node::Field(_))));
    assert!(matches!(node.child("address"), Some(Node::Object(_))));
    assert!(matches!(node.child("phones"), Some(Node::List(_))));
    assert!(!node.is_form());
    assert_eq!(node.entity().name(), "contact");
}

#[test]
fn fresh_node_is_all_null() {
    let node = build_node(&contact_entity());
    assert_eq!(
        to_flat_values(&Node::Object(node)),
        json!({
            "id": null,
            "name": null,
            "email": null,
            "address": { "city": null, "zip": null },
            "phones": []
        })
    );
}

#[test]
fn list_node_exposes_element_entity() {
    let list = build_list_node(&phone_entity());
    assert_eq!(list.entity().name(), "phone");
    assert!(list.is_empty());
}

#[test]
fn node_ids_are_unique() {
    let a = build_node(&address_entity());
    let b = build_node(&address_entity());
    assert_ne!(a.id(), b.id());
    assert_eq!(a, a.clone());
    assert_ne!(a, b);
}

// ── Set ──────────────────────────────────────────────────────────

#[test]
fn round_trip() {
    let node = build_node(&contact_entity());
    node.set(&sample_contact()).unwrap();
    assert_eq!(to_flat_values(&Node::Object(node)), sample_contact());
}

#[test]
fn absent_keys_are_left_untouched() {
    let node = build_node(&contact_entity());
    node.set(&sample_contact()).unwrap();
    node.set(&json!({ "name": "Grace" })).unwrap();

    assert_eq!(node.field("name").unwrap().value(), json!("Grace"));
    assert_eq!(node.field("email").unwrap().value(), json!("ada@example.com"));
    assert_eq!(node.list("phones").unwrap().len(), 2);
}

#[test]
fn null_clears_nested_object_and_list() {
    let node = build_node(&contact_entity());
    node.set(&sample_contact()).unwrap();
    node.set(&json!({ "address": null, "phones": null })).unwrap();

    let address = node.object("address").unwrap();
    assert_eq!(address.field("city").unwrap().value(), Value::Null);
    assert!(node.list("phones").unwrap().is_empty());
    assert_eq!(node.field("name").unwrap().value(), json!("Ada"));
}

#[test]
fn unknown_property_fails_before_any_write() {
    let node = build_node(&contact_entity());
    node.set(&sample_contact()).unwrap();

    let err = node
        .set(&json!({ "name": "Grace", "nickname": "G" }))
        .unwrap_err();
    match err {
        StoreError::UnknownProperty { entity, property } => {
            assert_eq!(entity, "contact");
            assert_eq!(property, "nickname");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(node.field("name").unwrap().value(), json!("Ada"));
}

#[test]
fn unknown_property_inside_list_element() {
    let node = build_node(&contact_entity());
    let err = node
        .set(&json!({ "phones": [{ "id": 1 }, { "id": 2, "fax": "x" }] }))
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::UnknownProperty { ref entity, ref property } if entity == "phone" && property == "fax"
    ));
    assert!(node.list("phones").unwrap().is_empty());
}

#[test]
fn wrong_value_kind_is_a_type_mismatch() {
    let node = build_node(&contact_entity());
    let err = node.set(&json!({ "phones": "555" })).unwrap_err();
    match err {
        StoreError::TypeMismatch {
            path,
            expected,
            found,
        } => {
            assert_eq!(path, "phones");
            assert_eq!(expected, "array");
            assert_eq!(found, "string");
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = node.set(&json!(42)).unwrap_err();
    assert_eq!(err.to_string(), "expected object at `$`, got number");

    let err = node
        .set(&json!({ "phones": [{ "id": 1 }, 7] }))
        .unwrap_err();
    assert!(matches!(err, StoreError::TypeMismatch { ref path, .. } if path == "phones[1]"));
}

#[test]
fn set_from_copies_another_node() {
    let a = build_node(&contact_entity());
    a.set(&sample_contact()).unwrap();
    let b = build_node(&contact_entity());
    b.set_from(&Node::Object(a.clone())).unwrap();

    assert_eq!(
        to_flat_values(&Node::Object(b.clone())),
        to_flat_values(&Node::Object(a.clone()))
    );
    // Copies, not shared elements.
    assert_ne!(
        a.list("phones").unwrap().get(0),
        b.list("phones").unwrap().get(0)
    );
}

#[test]
fn set_runs_dependent_reactions_once() {
    let node = build_node(&contact_entity());
    let runs = Rc::new(Cell::new(0));
    let watched = Node::Object(node.clone());
    let _reaction = Reaction::new(
        "watch-contact",
        move || to_flat_values(&watched),
        {
            let runs = Rc::clone(&runs);
            move |_| runs.set(runs.get() + 1)
        },
    );

    node.set(&sample_contact()).unwrap();
    assert_eq!(runs.get(), 1);
}

// ── Clear ────────────────────────────────────────────────────────

#[test]
fn clear_resets_fields_and_lists() {
    let node = build_node(&contact_entity());
    node.set(&sample_contact()).unwrap();
    node.clear();
    assert_eq!(
        to_flat_values(&Node::Object(node)),
        json!({
            "id": null,
            "name": null,
            "email": null,
            "address": { "city": null, "zip": null },
            "phones": []
        })
    );
}

#[test]
fn clear_is_idempotent() {
    let node = build_node(&contact_entity());
    node.set(&sample_contact()).unwrap();
    node.clear();
    let once = to_flat_values(&Node::Object(node.clone()));

    let runs = Rc::new(Cell::new(0));
    let watched = Node::Object(node.clone());
    let _reaction = Reaction::new("watch", move || to_flat_values(&watched), {
        let runs = Rc::clone(&runs);
        move |_| runs.set(runs.get() + 1)
    });

    node.clear();
    assert_eq!(to_flat_values(&Node::Object(node)), once);
    assert_eq!(runs.get(), 0, "second clear must not notify");
}

// ── Lists ────────────────────────────────────────────────────────

#[test]
fn list_mutators() {
    let list = build_list_node(&phone_entity());
    list.set(&json!([phone(1), phone(2), phone(3)])).unwrap();
    assert_eq!(ids(&list), vec![json!(1), json!(2), json!(3)]);

    let pushed = list.push_node(&phone(4)).unwrap();
    assert_eq!(list.len(), 4);
    assert_eq!(list.position(&pushed), Some(3));

    let removed = list.splice(1, 1, &[phone(20), phone(21)]).unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].field("id").unwrap().value(), json!(2));
    assert_eq!(ids(&list), vec![json!(1), json!(20), json!(21), json!(3), json!(4)]);

    assert!(list.remove(&pushed));
    assert!(!list.remove(&pushed));
    let first = list.remove_at(0).unwrap();
    assert_eq!(first.field("id").unwrap().value(), json!(1));
    assert!(list.remove_at(10).is_none());
    assert_eq!(ids(&list), vec![json!(20), json!(21), json!(3)]);

    assert_eq!(list.get(2).unwrap().field("id").unwrap().value(), json!(3));
    assert!(list.get(3).is_none());

    list.clear();
    assert!(list.is_empty());
}

#[test]
fn splice_clamps_out_of_range_bounds() {
    let list = build_list_node(&phone_entity());
    list.set(&json!([phone(1), phone(2)])).unwrap();

    let removed = list.splice(5, 3, &[phone(3)]).unwrap();
    assert!(removed.is_empty());
    assert_eq!(ids(&list), vec![json!(1), json!(2), json!(3)]);

    let removed = list.splice(1, usize::MAX, &[]).unwrap();
    assert_eq!(removed.len(), 2);
    assert_eq!(ids(&list), vec![json!(1)]);
}

#[test]
fn list_set_rebuilds_every_element() {
    let list = build_list_node(&phone_entity());
    list.set(&json!([phone(1)])).unwrap();
    let before = list.get(0).unwrap();
    list.set(&json!([phone(1)])).unwrap();
    assert_ne!(list.get(0).unwrap(), before);
}

#[test]
fn push_checks_the_element_shape() {
    let list = build_list_node(&phone_entity());
    assert!(matches!(
        list.push_node(&json!({ "extension": 12 })),
        Err(StoreError::UnknownProperty { .. })
    ));
    assert!(matches!(
        list.splice(0, 0, &[json!([1])]),
        Err(StoreError::TypeMismatch { .. })
    ));
    assert!(list.is_empty());
}

// ── Validation ───────────────────────────────────────────────────

#[test]
fn required_zero_is_valid() {
    let node = build_node(&phone_entity());
    let id = node.field("id").unwrap();
    assert_eq!(id.error().as_deref(), Some("validation.required"));

    id.set_value(json!(0)).unwrap();
    assert_eq!(id.error(), None);
    assert!(node.is_valid());
}

#[test]
fn store_validity_follows_fields() {
    let node = build_node(&contact_entity());
    assert!(!node.is_valid());

    node.set(&sample_contact()).unwrap();
    assert!(node.is_valid());

    node.list("phones")
        .unwrap()
        .push_node(&json!({ "number": "555" }))
        .unwrap();
    assert!(!node.is_valid());
}

#[test]
fn errors_mirror_the_node_shape() {
    let node = build_node(&contact_entity());
    node.set(&json!({
        "id": -1,
        "email": "nope",
        "phones": [{ "id": 3 }]
    }))
    .unwrap();

    assert_eq!(
        node.errors(),
        json!({
            "id": "validation.number.min",
            "name": "validation.required",
            "email": "validation.email",
            "address": { "city": null, "zip": null },
            "phones": [{ "id": null, "number": null }]
        })
    );
}

// ── Computed fields ──────────────────────────────────────────────

#[test]
fn computed_field_derives_and_is_read_only() {
    let node = build_node(&contact_entity());
    let label = node
        .add_computed_field(FieldEntry::new("label", &text_domain()), |node| {
            let name = node.field("name").unwrap().value();
            let email = node.field("email").unwrap().value();
            match (name.as_str(), email.as_str()) {
                (Some(name), Some(email)) => json!(format!("{name} <{email}>")),
                (Some(name), None) => json!(name),
                _ => Value::Null,
            }
        })
        .unwrap();

    assert!(label.is_computed());
    assert_eq!(label.value(), Value::Null);

    node.set(&json!({ "name": "Ada", "label": "ignored" })).unwrap();
    assert_eq!(label.value(), json!("Ada"));

    node.field("email")
        .unwrap()
        .set_value(json!("ada@example.com"))
        .unwrap();
    assert_eq!(label.value(), json!("Ada <ada@example.com>"));

    assert!(matches!(
        label.set_value(json!("x")),
        Err(StoreError::ReadOnlyField(ref name)) if name == "label"
    ));

    let flat = to_flat_values(&Node::Object(node.clone()));
    assert!(flat.get("label").is_none());
    assert_eq!(node.child("label").map(|child| child.is_form()), Some(false));
}

#[test]
fn computed_field_name_must_be_free() {
    let node = build_node(&contact_entity());
    let err = node
        .add_computed_field(FieldEntry::new("name", &text_domain()), |_| Value::Null)
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateField { .. }));
}

#[test]
fn required_computed_field_takes_part_in_validity() {
    let node = build_node(&phone_entity());
    node.set(&json!({ "id": 1 })).unwrap();
    assert!(node.is_valid());

    node.add_computed_field(
        FieldEntry::new("digits", &text_domain()).required(),
        |node| node.field("number").unwrap().value(),
    )
    .unwrap();
    assert!(!node.is_valid());

    node.set(&json!({ "number": "555" })).unwrap();
    assert!(node.is_valid());
}

// ── Display ──────────────────────────────────────────────────────

#[test]
fn display_value_uses_the_domain_format() {
    let node = build_node(&phone_entity());
    let number = node.field("number").unwrap();
    number.set_value(json!("555")).unwrap();
    assert_eq!(number.display_value(), "555");
    number.clear();
    assert_eq!(number.display_value(), "");
}

// ── Properties ───────────────────────────────────────────────────

fn contact_value() -> impl Strategy<Value = Value> {
    (
        0i64..10_000,
        "[A-Za-z ]{0,16}",
        proptest::option::of("[a-z]{1,8}"),
        prop::collection::vec((0i64..1000, "[0-9-]{0,12}"), 0..6),
    )
        .prop_map(|(id, name, city, phones)| {
            json!({
                "id": id,
                "name": name,
                "email": null,
                "address": { "city": city, "zip": null },
                "phones": phones
                    .into_iter()
                    .map(|(id, number)| json!({ "id": id, "number": number }))
                    .collect::<Vec<_>>()
            })
        })
}

proptest! {
    /// Setting a complete value then flattening yields the value.
    #[test]
    fn set_then_flatten_round_trips(value in contact_value()) {
        let node = build_node(&contact_entity());
        node.set(&value).unwrap();
        prop_assert_eq!(to_flat_values(&Node::Object(node)), value);
    }

    /// Clearing twice equals clearing once.
    #[test]
    fn clear_is_idempotent_for_any_value(value in contact_value()) {
        let node = build_node(&contact_entity());
        node.set(&value).unwrap();
        node.clear();
        let once = to_flat_values(&Node::Object(node.clone()));
        node.clear();
        prop_assert_eq!(to_flat_values(&Node::Object(node)), once);
    }
}
