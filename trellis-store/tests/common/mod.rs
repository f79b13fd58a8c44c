//! Shared fixtures for store and form tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Value, json};
use trellis_model::{Domain, Entity, FieldEntry, FieldType, Validator};
use trellis_store::ListNode;

pub fn id_domain() -> Arc<Domain> {
    Arc::new(
        Domain::new("DO_ID", FieldType::Number)
            .with_validator(Validator::number(Some(0.0), None, Some(0))),
    )
}

pub fn text_domain() -> Arc<Domain> {
    Arc::new(Domain::new("DO_TEXT", FieldType::Text))
}

pub fn email_domain() -> Arc<Domain> {
    Arc::new(Domain::new("DO_EMAIL", FieldType::Text).with_validator(Validator::email()))
}

/// `phone { id*, number }`
pub fn phone_entity() -> Arc<Entity> {
    Entity::builder("phone")
        .field(FieldEntry::new("id", &id_domain()).required())
        .field(FieldEntry::new("number", &text_domain()))
        .build()
        .unwrap()
}

/// `address { city, zip }`
pub fn address_entity() -> Arc<Entity> {
    Entity::builder("address")
        .field(FieldEntry::new("city", &text_domain()))
        .field(FieldEntry::new("zip", &text_domain()))
        .build()
        .unwrap()
}

/// `contact { id*, name*, email, address: address, phones: phone[] }`
pub fn contact_entity() -> Arc<Entity> {
    Entity::builder("contact")
        .field(FieldEntry::new("id", &id_domain()).required())
        .field(FieldEntry::new("name", &text_domain()).required())
        .field(FieldEntry::new("email", &email_domain()))
        .object("address", &address_entity())
        .list("phones", &phone_entity())
        .build()
        .unwrap()
}

pub fn sample_contact() -> Value {
    json!({
        "id": 1,
        "name": "Ada",
        "email": "ada@example.com",
        "address": { "city": "London", "zip": "N1" },
        "phones": [
            { "id": 10, "number": "555-0100" },
            { "id": 11, "number": "555-0101" }
        ]
    })
}

/// The `id` field of every element, in list order.
pub fn ids(list: &ListNode) -> Vec<Value> {
    list.items()
        .iter()
        .map(|item| item.field("id").unwrap().value())
        .collect()
}

pub fn phone(id: i64) -> Value {
    json!({ "id": id, "number": format!("555-{id:04}") })
}
