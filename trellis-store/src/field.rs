//! Scalar fields.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;
use trellis_model::FieldEntry;
use trellis_reactive::{Computed, Observable};

use crate::error::{StoreError, StoreResult};

enum FieldValue {
    Stored(Observable<Value>),
    Derived(Computed<Value>),
}

impl FieldValue {
    fn get(&self) -> Value {
        match self {
            Self::Stored(value) => value.get(),
            Self::Derived(value) => value.get(),
        }
    }

    fn get_untracked(&self) -> Value {
        match self {
            Self::Stored(value) => value.get_untracked(),
            Self::Derived(value) => value.get_untracked(),
        }
    }
}

/// Edit state carried by fields of a form node.
struct FieldForm {
    local_edit: Observable<bool>,
    is_edit: Computed<bool>,
}

struct FieldInner {
    entry: Arc<FieldEntry>,
    value: FieldValue,
    error: Computed<Option<String>>,
    form: Option<FieldForm>,
}

/// A scalar leaf holding one observable JSON value.
///
/// `Null` is the only empty value. Handles are cheap to clone and share
/// the same underlying value.
#[derive(Clone)]
pub struct EntityField {
    inner: Rc<FieldInner>,
}

impl EntityField {
    /// A stored field. `parent_edit` is the owning form node's edit state;
    /// store fields have none.
    pub(crate) fn stored(entry: &Arc<FieldEntry>, parent_edit: Option<&Computed<bool>>) -> Self {
        let value = Observable::new(Value::Null);
        let error = {
            let entry = Arc::clone(entry);
            let value = value.clone();
            Computed::new(move || value.with(|v| entry.validate(v)))
        };
        let form = parent_edit.map(|parent| {
            let local_edit = Observable::new(true);
            let is_edit = {
                let local = local_edit.clone();
                let parent = parent.clone();
                Computed::new(move || local.get() && parent.get())
            };
            FieldForm {
                local_edit,
                is_edit,
            }
        });
        Self {
            inner: Rc::new(FieldInner {
                entry: Arc::clone(entry),
                value: FieldValue::Stored(value),
                error,
                form,
            }),
        }
    }

    /// A read-only field whose value is derived by `compute`.
    pub(crate) fn derived(entry: Arc<FieldEntry>, compute: impl Fn() -> Value + 'static) -> Self {
        let value = Computed::new(compute);
        let error = {
            let entry = Arc::clone(&entry);
            let value = value.clone();
            Computed::new(move || entry.validate(&value.get()))
        };
        Self {
            inner: Rc::new(FieldInner {
                entry,
                value: FieldValue::Derived(value),
                error,
                form: None,
            }),
        }
    }

    pub fn entry(&self) -> &Arc<FieldEntry> {
        &self.inner.entry
    }

    pub fn name(&self) -> &str {
        &self.inner.entry.name
    }

    /// Current value. Tracked.
    pub fn value(&self) -> Value {
        self.inner.value.get()
    }

    pub fn value_untracked(&self) -> Value {
        self.inner.value.get_untracked()
    }

    /// The value formatted by the field's domain.
    pub fn display_value(&self) -> String {
        self.inner.entry.domain.format_value(&self.value())
    }

    /// Assigns a new value. Computed fields reject assignment.
    pub fn set_value(&self, value: Value) -> StoreResult<()> {
        match &self.inner.value {
            FieldValue::Stored(stored) => {
                stored.set(value);
                Ok(())
            }
            FieldValue::Derived(_) => Err(StoreError::ReadOnlyField(self.name().to_string())),
        }
    }

    /// Resets a stored field to `Null`. No-op on computed fields.
    pub fn clear(&self) {
        self.store(Value::Null);
    }

    /// Assignment used by bulk set and sync, which skip computed fields.
    pub(crate) fn store(&self, value: Value) {
        if let FieldValue::Stored(stored) = &self.inner.value {
            stored.set(value);
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self.inner.value, FieldValue::Derived(_))
    }

    pub fn is_form(&self) -> bool {
        self.inner.form.is_some()
    }

    /// Translation key of the first failing rule, if any.
    pub fn error(&self) -> Option<String> {
        self.inner.error.get()
    }

    /// Local flag and owning node's edit state. Always `false` outside forms.
    pub fn is_edit(&self) -> bool {
        self.inner.form.as_ref().is_some_and(|form| form.is_edit.get())
    }

    pub fn set_edit(&self, edit: bool) -> StoreResult<()> {
        let form = self
            .inner
            .form
            .as_ref()
            .ok_or_else(|| StoreError::NotAForm(format!("field `{}`", self.name())))?;
        form.local_edit.set(edit);
        Ok(())
    }

    /// Form fields count as valid while not in edit mode.
    pub fn is_valid(&self) -> bool {
        match &self.inner.form {
            Some(form) if !form.is_edit.get() => true,
            _ => self.error().is_none(),
        }
    }

    /// Whether both handles refer to the same field.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for EntityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityField")
            .field("name", &self.name())
            .field("value", &self.value_untracked())
            .field("computed", &self.is_computed())
            .field("form", &self.is_form())
            .finish()
    }
}
