use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::validator::validate_field;
use crate::Domain;

/// An immutable, named description of a data shape.
///
/// Entities compose each other through [`ObjectEntry`] and [`ListEntry`];
/// composed entities are shared, never copied.
#[derive(Debug)]
pub struct Entity {
    name: String,
    entries: Vec<EntityEntry>,
}

impl Entity {
    /// Starts building an entity.
    pub fn builder(name: &str) -> EntityBuilder {
        EntityBuilder {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[EntityEntry] {
        &self.entries
    }

    /// Looks up an entry by name.
    pub fn entry(&self, name: &str) -> Option<&EntityEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    /// Looks up a scalar field entry by name.
    pub fn field(&self, name: &str) -> Option<&Arc<FieldEntry>> {
        match self.entry(name)? {
            EntityEntry::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One member of an [`Entity`].
#[derive(Debug, Clone)]
pub enum EntityEntry {
    Field(Arc<FieldEntry>),
    Object(ObjectEntry),
    List(ListEntry),
}

impl EntityEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Field(field) => &field.name,
            Self::Object(object) => &object.name,
            Self::List(list) => &list.name,
        }
    }
}

/// A scalar field. Has no default value: a fresh field holds `Null`.
#[derive(Debug, Clone)]
pub struct FieldEntry {
    pub name: String,
    pub domain: Arc<Domain>,
    pub is_required: bool,
    /// Translation key of the field's label.
    pub label: Option<String>,
    pub comment: Option<String>,
}

impl FieldEntry {
    /// An optional field of the given domain.
    pub fn new(name: &str, domain: &Arc<Domain>) -> Self {
        Self {
            name: name.into(),
            domain: Arc::clone(domain),
            is_required: false,
            label: None,
            comment: None,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// The error for `value`, if any. See [`validate_field`].
    pub fn validate(&self, value: &Value) -> Option<String> {
        validate_field(self, value)
    }
}

/// A nested object of another entity.
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub name: String,
    pub entity: Arc<Entity>,
}

/// A list whose elements are all of one entity.
#[derive(Debug, Clone)]
pub struct ListEntry {
    pub name: String,
    pub entity: Arc<Entity>,
}

/// Builder for [`Entity`]. Duplicate entry names are rejected on
/// [`build`](EntityBuilder::build).
#[derive(Debug)]
pub struct EntityBuilder {
    name: String,
    entries: Vec<EntityEntry>,
}

impl EntityBuilder {
    #[must_use]
    pub fn field(mut self, field: FieldEntry) -> Self {
        self.entries.push(EntityEntry::Field(Arc::new(field)));
        self
    }

    #[must_use]
    pub fn object(mut self, name: &str, entity: &Arc<Entity>) -> Self {
        self.entries.push(EntityEntry::Object(ObjectEntry {
            name: name.into(),
            entity: Arc::clone(entity),
        }));
        self
    }

    #[must_use]
    pub fn list(mut self, name: &str, entity: &Arc<Entity>) -> Self {
        self.entries.push(EntityEntry::List(ListEntry {
            name: name.into(),
            entity: Arc::clone(entity),
        }));
        self
    }

    pub fn build(self) -> ModelResult<Arc<Entity>> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.name()) {
                return Err(ModelError::DuplicateEntry {
                    entity: self.name.clone(),
                    entry: entry.name().to_string(),
                });
            }
        }
        Ok(Arc::new(Entity {
            name: self.name,
            entries: self.entries,
        }))
    }
}
