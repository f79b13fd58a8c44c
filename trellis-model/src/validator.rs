//! Field validation.
//!
//! Validation never fails as an error: it yields a translation key (or a
//! caller-supplied message) describing what is wrong, or `None`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::FieldEntry;

/// Default translation keys for validation failures.
pub mod messages {
    pub const REQUIRED: &str = "validation.required";
    pub const REGEX: &str = "validation.regex";
    pub const EMAIL: &str = "validation.email";
    pub const STRING_INVALID: &str = "validation.string.invalid";
    pub const STRING_MIN_LENGTH: &str = "validation.string.min_length";
    pub const STRING_MAX_LENGTH: &str = "validation.string.max_length";
    pub const NUMBER_INVALID: &str = "validation.number.invalid";
    pub const NUMBER_MIN: &str = "validation.number.min";
    pub const NUMBER_MAX: &str = "validation.number.max";
    pub const NUMBER_MAX_DECIMALS: &str = "validation.number.max_decimals";
    pub const DATE: &str = "validation.date";
}

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

thread_local! {
    static EMAIL_REGEX: Option<Regex> = Regex::new(EMAIL_PATTERN).ok();

    /// Compiled `regex` validator patterns. `None` marks a pattern that
    /// failed to compile.
    static PATTERNS: RefCell<HashMap<String, Option<Regex>>> = RefCell::new(HashMap::new());
}

/// Whether `text` matches `pattern`, compiling each pattern once per
/// thread. `None` if the pattern is invalid; the failure is logged on
/// first use only.
fn pattern_matches(pattern: &str, text: &str, field: &str) -> Option<bool> {
    PATTERNS.with(|patterns| {
        let mut patterns = patterns.borrow_mut();
        let regex = patterns
            .entry(pattern.to_string())
            .or_insert_with(|| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!(field, pattern, error = %e, "Invalid regex validator, treating values as valid");
                    None
                }
            });
        regex.as_ref().map(|regex| regex.is_match(text))
    })
}

/// A single validation rule of a [`Domain`](crate::Domain).
///
/// Rules only run on non-null values; absence is handled by the field's
/// required flag. Every rule accepts an optional `message` that replaces the
/// default translation key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Validator {
    Regex {
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Email {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    #[serde(rename = "string")]
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_decimals: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Date {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// A rule implemented in code. Cannot be loaded from configuration.
    #[serde(skip)]
    Custom(CustomValidator),
    /// A rule type this version does not know. Treated as valid.
    #[serde(other)]
    Unknown,
}

impl Validator {
    /// A regex rule.
    pub fn regex(pattern: &str) -> Self {
        Self::Regex {
            pattern: pattern.into(),
            message: None,
        }
    }

    pub fn email() -> Self {
        Self::Email { message: None }
    }

    /// A string length rule.
    pub fn length(min_length: Option<usize>, max_length: Option<usize>) -> Self {
        Self::Text {
            min_length,
            max_length,
            message: None,
        }
    }

    /// A numeric range rule.
    pub fn number(min: Option<f64>, max: Option<f64>, max_decimals: Option<usize>) -> Self {
        Self::Number {
            min,
            max,
            max_decimals,
            message: None,
        }
    }

    pub fn date() -> Self {
        Self::Date { message: None }
    }

    /// A rule backed by a closure returning an error message on failure.
    pub fn custom(
        name: &str,
        check: impl Fn(&Value) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self::Custom(CustomValidator {
            name: name.into(),
            check: Arc::new(check),
        })
    }

    /// Replaces the failure message. No effect on custom and unknown rules.
    #[must_use]
    pub fn with_message(mut self, text: &str) -> Self {
        match &mut self {
            Self::Regex { message, .. }
            | Self::Email { message }
            | Self::Text { message, .. }
            | Self::Number { message, .. }
            | Self::Date { message } => *message = Some(text.into()),
            Self::Custom(_) | Self::Unknown => {}
        }
        self
    }

    /// Checks a non-null value. `field` is only used for diagnostics.
    pub fn check(&self, value: &Value, field: &str) -> Option<String> {
        match self {
            Self::Regex { pattern, message } => {
                let text = as_text(value);
                let valid = pattern_matches(pattern, &text, field).unwrap_or(true);
                (!valid).then(|| fail(message, messages::REGEX))
            }
            Self::Email { message } => {
                let text = as_text(value);
                let valid = EMAIL_REGEX.with(|regex| match regex {
                    Some(regex) => regex.is_match(&text),
                    None => true,
                });
                (!valid).then(|| fail(message, messages::EMAIL))
            }
            Self::Text {
                min_length,
                max_length,
                message,
            } => {
                let Some(text) = value.as_str() else {
                    return Some(fail(message, messages::STRING_INVALID));
                };
                let len = text.chars().count();
                if min_length.is_some_and(|min| len < min) {
                    return Some(fail(message, messages::STRING_MIN_LENGTH));
                }
                if max_length.is_some_and(|max| len > max) {
                    return Some(fail(message, messages::STRING_MAX_LENGTH));
                }
                None
            }
            Self::Number {
                min,
                max,
                max_decimals,
                message,
            } => {
                let Some(number) = value.as_f64() else {
                    return Some(fail(message, messages::NUMBER_INVALID));
                };
                if min.is_some_and(|min| number < min) {
                    return Some(fail(message, messages::NUMBER_MIN));
                }
                if max.is_some_and(|max| number > max) {
                    return Some(fail(message, messages::NUMBER_MAX));
                }
                if max_decimals.is_some_and(|max| decimal_places(value) > max) {
                    return Some(fail(message, messages::NUMBER_MAX_DECIMALS));
                }
                None
            }
            Self::Date { message } => {
                let valid = value.as_str().is_some_and(|s| {
                    DateTime::parse_from_rfc3339(s).is_ok()
                        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                });
                (!valid).then(|| fail(message, messages::DATE))
            }
            Self::Custom(custom) => (custom.check)(value),
            Self::Unknown => {
                // TODO: promote to a catalog load error once existing configs are migrated.
                warn!(field, "Unknown validator type, treating value as valid");
                None
            }
        }
    }
}

/// A validation rule implemented in code.
#[derive(Clone)]
pub struct CustomValidator {
    pub name: String,
    check: Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>,
}

impl fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValidator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Computes a field's error for `value`.
///
/// `Null` is the only "empty" value: `0`, `false` and `""` are present. A
/// required field holding `Null` yields [`messages::REQUIRED`]; otherwise the
/// domain's validators run in order on non-null values and the first failure
/// is returned.
pub fn validate_field(entry: &FieldEntry, value: &Value) -> Option<String> {
    if value.is_null() {
        return entry.is_required.then(|| messages::REQUIRED.to_string());
    }
    entry
        .domain
        .validators
        .iter()
        .find_map(|validator| validator.check(value, &entry.name))
}

fn fail(message: &Option<String>, default: &str) -> String {
    message.clone().unwrap_or_else(|| default.to_string())
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn decimal_places(value: &Value) -> usize {
    let repr = value.to_string();
    match repr.split_once('.') {
        Some((_, fraction)) => fraction
            .chars()
            .take_while(char::is_ascii_digit)
            .count(),
        None => 0,
    }
}
