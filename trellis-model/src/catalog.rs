//! Declarative entity catalogs.
//!
//! A catalog document lists domains and entities by name; entities refer to
//! domains and to each other by name. Loading resolves every reference into
//! a shared [`Entity`] graph, failing on anything that does not resolve.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::{Domain, Entity, FieldEntry};

/// The serialized form of a catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub domains: Vec<Domain>,
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    pub fields: Vec<EntryConfig>,
}

/// One entry of an [`EntityConfig`], tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryConfig {
    Field {
        name: String,
        domain: String,
        #[serde(default)]
        required: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comment: Option<String>,
    },
    Object {
        name: String,
        entity: String,
    },
    List {
        name: String,
        entity: String,
    },
}

/// Resolved domains and entities, looked up by name.
#[derive(Debug, Default)]
pub struct EntityCatalog {
    domains: HashMap<String, Arc<Domain>>,
    entities: HashMap<String, Arc<Entity>>,
}

impl EntityCatalog {
    /// Parses and resolves a JSON catalog document.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let config: CatalogConfig = serde_json::from_str(json)?;
        Self::from_config(config)
    }

    /// Resolves a catalog configuration.
    pub fn from_config(config: CatalogConfig) -> ModelResult<Self> {
        let mut domains = HashMap::new();
        for domain in config.domains {
            let name = domain.name.clone();
            if domains.insert(name.clone(), Arc::new(domain)).is_some() {
                return Err(ModelError::DuplicateDomain(name));
            }
        }

        let mut configs = HashMap::new();
        for entity in &config.entities {
            if configs.insert(entity.name.as_str(), entity).is_some() {
                return Err(ModelError::DuplicateEntity(entity.name.clone()));
            }
        }

        let mut resolver = Resolver {
            domains: &domains,
            configs: &configs,
            resolved: HashMap::new(),
            stack: Vec::new(),
        };
        for entity in &config.entities {
            resolver.resolve(&entity.name, None)?;
        }
        let entities = resolver.resolved;

        debug!(
            domains = domains.len(),
            entities = entities.len(),
            "Entity catalog loaded"
        );
        Ok(Self { domains, entities })
    }

    /// Looks up an entity.
    pub fn entity(&self, name: &str) -> Option<Arc<Entity>> {
        self.entities.get(name).cloned()
    }

    /// Looks up an entity, failing if it is missing.
    pub fn require(&self, name: &str) -> ModelResult<Arc<Entity>> {
        self.entity(name)
            .ok_or_else(|| ModelError::EntityNotFound(name.to_string()))
    }

    pub fn domain(&self, name: &str) -> Option<Arc<Domain>> {
        self.domains.get(name).cloned()
    }

    /// Entity names, in no particular order.
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

struct Resolver<'a> {
    domains: &'a HashMap<String, Arc<Domain>>,
    configs: &'a HashMap<&'a str, &'a EntityConfig>,
    resolved: HashMap<String, Arc<Entity>>,
    /// Entities currently being resolved, outermost first.
    stack: Vec<String>,
}

impl Resolver<'_> {
    fn resolve(&mut self, name: &str, referenced_by: Option<&str>) -> ModelResult<Arc<Entity>> {
        if let Some(entity) = self.resolved.get(name) {
            return Ok(Arc::clone(entity));
        }
        if self.stack.iter().any(|n| n == name) {
            let mut path = self.stack.clone();
            path.push(name.to_string());
            return Err(ModelError::CyclicEntity(path.join(" -> ")));
        }
        let config = match self.configs.get(name) {
            Some(config) => *config,
            None => {
                return Err(ModelError::UnknownEntity {
                    entity: name.to_string(),
                    referenced_by: referenced_by.unwrap_or("catalog").to_string(),
                });
            }
        };

        self.stack.push(name.to_string());
        let mut builder = Entity::builder(name);
        for entry in &config.fields {
            builder = match entry {
                EntryConfig::Field {
                    name: field,
                    domain,
                    required,
                    label,
                    comment,
                } => {
                    let resolved = self.domains.get(domain).ok_or_else(|| {
                        ModelError::UnknownDomain {
                            entity: name.to_string(),
                            field: field.clone(),
                            domain: domain.clone(),
                        }
                    })?;
                    let mut entry = FieldEntry::new(field, resolved);
                    entry.is_required = *required;
                    entry.label = label.clone();
                    entry.comment = comment.clone();
                    builder.field(entry)
                }
                EntryConfig::Object {
                    name: object,
                    entity,
                } => {
                    let nested = self.resolve(entity, Some(name))?;
                    builder.object(object, &nested)
                }
                EntryConfig::List { name: list, entity } => {
                    let nested = self.resolve(entity, Some(name))?;
                    builder.list(list, &nested)
                }
            };
        }
        let entity = builder.build()?;
        self.stack.pop();

        self.resolved.insert(name.to_string(), Arc::clone(&entity));
        Ok(entity)
    }
}
