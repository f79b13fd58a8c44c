use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validator::Validator;

/// Formatting and validation rules shared by every field of a kind
/// (e.g. "an identifier", "an email address", "an amount").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    /// Applied in order; the first failure wins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
    #[serde(default)]
    pub display: DisplayFormat,
}

impl Domain {
    /// A domain with no validators and plain display.
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            validators: Vec::new(),
            display: DisplayFormat::Plain,
        }
    }

    /// Appends a validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    #[must_use]
    pub fn with_display(mut self, display: DisplayFormat) -> Self {
        self.display = display;
        self
    }

    /// Renders a value for read-only display. `Null` renders as an empty
    /// string.
    #[must_use]
    pub fn format_value(&self, value: &Value) -> String {
        match (value, &self.display) {
            (Value::Null, _) => String::new(),
            (Value::String(s), DisplayFormat::Uppercase) => s.to_uppercase(),
            (Value::String(s), DisplayFormat::Lowercase) => s.to_lowercase(),
            (Value::String(s), _) => s.clone(),
            (Value::Number(n), DisplayFormat::Fixed { decimals }) => match n.as_f64() {
                Some(f) => format!("{f:.decimals$}"),
                None => n.to_string(),
            },
            (other, _) => other.to_string(),
        }
    }
}

/// The kind of value a domain holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Boolean,
    Date,
    Json,
}

/// How a domain's values are shown when not being edited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayFormat {
    #[default]
    Plain,
    Fixed {
        decimals: usize,
    },
    Uppercase,
    Lowercase,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fixed_display_rounds() {
        let d = Domain::new("DO_AMOUNT", FieldType::Number)
            .with_display(DisplayFormat::Fixed { decimals: 2 });
        assert_eq!(d.format_value(&json!(3.14159)), "3.14");
        assert_eq!(d.format_value(&json!(2)), "2.00");
    }

    #[test]
    fn null_displays_empty() {
        let d = Domain::new("DO_TEXT", FieldType::Text);
        assert_eq!(d.format_value(&Value::Null), "");
    }

    #[test]
    fn case_display() {
        let d = Domain::new("DO_CODE", FieldType::Text).with_display(DisplayFormat::Uppercase);
        assert_eq!(d.format_value(&json!("ab")), "AB");
        assert_eq!(d.format_value(&json!(true)), "true");
    }
}
