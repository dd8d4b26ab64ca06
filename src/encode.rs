//! Cell representation and fingerprint value encoding.
//!
//! Every dataset cell is a [`Cell`]. Trainers only ever see the wire form:
//! the missing-value sentinel, plain text, or `*STRINGIFIED*` followed by the
//! canonical JSON text of a non-string value.

use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::constants::capture::{MIME_TYPES_KEY, PLUGINS_DATA_KEY, PLUGINS_KEY};
use crate::constants::tokens::{MISSING_VALUE_TOKEN, STRINGIFIED_PREFIX};
use crate::types::AttributeName;

/// JSON kind of a structurally encoded cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueTag {
    /// JSON number.
    Number,
    /// JSON boolean.
    Bool,
    /// JSON array.
    Array,
    /// JSON object.
    Object,
}

impl ValueTag {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Number(_) => Some(Self::Number),
            Value::Bool(_) => Some(Self::Bool),
            Value::Array(_) => Some(Self::Array),
            Value::Object(_) => Some(Self::Object),
            Value::Null | Value::String(_) => None,
        }
    }
}

/// One dataset cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cell {
    /// Absent, null, or empty value.
    Missing,
    /// Plain text passed through unchanged.
    Plain(String),
    /// Non-string value kept as canonical JSON text.
    Encoded {
        /// JSON kind of the payload.
        tag: ValueTag,
        /// Canonical JSON text.
        payload: String,
    },
}

impl Cell {
    /// Encode an arbitrary JSON value.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Missing,
            Value::String(text) if text.is_empty() => Self::Missing,
            Value::String(text) => Self::Plain(text.clone()),
            other => match ValueTag::of(other) {
                Some(tag) => Self::Encoded {
                    tag,
                    payload: other.to_string(),
                },
                None => Self::Missing,
            },
        }
    }

    /// Parse a wire string back into a cell.
    ///
    /// The wire form is not injective: a captured string equal to the
    /// missing sentinel reads back as `Missing`, and a captured string that
    /// is `*STRINGIFIED*` followed by valid non-string JSON reads back as
    /// `Encoded`.
    pub fn from_wire(text: &str) -> Self {
        if text == MISSING_VALUE_TOKEN {
            return Self::Missing;
        }
        if let Some(payload) = text.strip_prefix(STRINGIFIED_PREFIX)
            && let Ok(value) = serde_json::from_str::<Value>(payload)
            && let Some(tag) = ValueTag::of(&value)
        {
            return Self::Encoded {
                tag,
                payload: payload.to_string(),
            };
        }
        Self::Plain(text.to_string())
    }

    /// Plain-text cell, or `Missing` for empty text.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            Self::Missing
        } else {
            Self::Plain(text)
        }
    }

    /// True for the missing-value cell.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Wire form consumed by trainers.
    pub fn to_wire(&self) -> String {
        match self {
            Self::Missing => MISSING_VALUE_TOKEN.to_string(),
            Self::Plain(text) => text.clone(),
            Self::Encoded { payload, .. } => format!("{STRINGIFIED_PREFIX}{payload}"),
        }
    }

    /// Decode the original JSON value (`Null` for `Missing`).
    pub fn decode(&self) -> Value {
        match self {
            Self::Missing => Value::Null,
            Self::Plain(text) => Value::String(text.clone()),
            Self::Encoded { payload, .. } => {
                serde_json::from_str(payload).unwrap_or_else(|_| Value::String(payload.clone()))
            }
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// Encode a raw fingerprint attribute map into cells.
///
/// `plugins` and `mimeTypes` are folded into `pluginsData`; every other
/// attribute keeps its position.
pub fn encode_fingerprint_attributes(
    attributes: &IndexMap<AttributeName, Value>,
) -> IndexMap<AttributeName, Cell> {
    let mut attributes = attributes.clone();
    extract_plugins(&mut attributes);
    attributes
        .iter()
        .map(|(name, value)| (name.clone(), Cell::from_value(value)))
        .collect()
}

/// Move non-empty `plugins`/`mimeTypes` into a nested `pluginsData` object.
///
/// The top-level keys are always removed. When neither is non-empty,
/// `pluginsData` becomes null so it encodes to the sentinel.
pub fn extract_plugins(attributes: &mut IndexMap<AttributeName, Value>) {
    let mut plugins_data = Map::new();
    for key in [PLUGINS_KEY, MIME_TYPES_KEY] {
        if let Some(value) = attributes.shift_remove(key)
            && !is_empty_value(&value)
        {
            plugins_data.insert(key.to_string(), value);
        }
    }
    let value = if plugins_data.is_empty() {
        Value::Null
    } else {
        Value::Object(plugins_data)
    };
    attributes.insert(PLUGINS_DATA_KEY.to_string(), value);
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_round_trips_through_tagged_wire_form() {
        let cell = Cell::from_value(&json!(42));
        assert_eq!(
            cell,
            Cell::Encoded {
                tag: ValueTag::Number,
                payload: "42".into()
            }
        );
        let wire = cell.to_wire();
        assert_eq!(wire, "*STRINGIFIED*42");
        assert_eq!(Cell::from_wire(&wire).decode(), json!(42));
    }

    #[test]
    fn strings_pass_through_and_empties_become_sentinel() {
        assert_eq!(Cell::from_value(&json!("foo")).to_wire(), "foo");
        assert_eq!(Cell::from_value(&Value::Null).to_wire(), MISSING_VALUE_TOKEN);
        assert_eq!(Cell::from_value(&json!("")).to_wire(), MISSING_VALUE_TOKEN);
        assert_eq!(Cell::from_wire(MISSING_VALUE_TOKEN), Cell::Missing);
        assert_eq!(Cell::text(""), Cell::Missing);
    }

    #[test]
    fn structured_values_keep_their_shape() {
        let value = json!({ "width": 1920, "height": 1080 });
        let cell = Cell::from_value(&value);
        assert!(cell.to_wire().starts_with(STRINGIFIED_PREFIX));
        assert_eq!(Cell::from_wire(&cell.to_wire()), cell);
        assert_eq!(cell.decode(), value);

        let flag = Cell::from_value(&json!(false));
        assert_eq!(flag.to_wire(), "*STRINGIFIED*false");
    }

    #[test]
    fn plain_text_that_only_looks_tagged_stays_plain() {
        let cell = Cell::from_wire("*STRINGIFIED*not json");
        assert_eq!(cell, Cell::Plain("*STRINGIFIED*not json".into()));
    }

    #[test]
    fn reserved_looking_captured_strings_do_not_survive_the_wire() {
        let sentinel = Cell::from_value(&json!(MISSING_VALUE_TOKEN));
        assert_eq!(sentinel, Cell::Plain(MISSING_VALUE_TOKEN.into()));
        assert_eq!(Cell::from_wire(&sentinel.to_wire()), Cell::Missing);

        let tagged = Cell::from_value(&json!("*STRINGIFIED*7"));
        assert_eq!(
            Cell::from_wire(&tagged.to_wire()),
            Cell::Encoded {
                tag: ValueTag::Number,
                payload: "7".into()
            }
        );
    }

    #[test]
    fn plugins_move_into_plugins_data() {
        let mut attributes: IndexMap<AttributeName, Value> = IndexMap::new();
        attributes.insert("userAgent".into(), json!("ua"));
        attributes.insert("plugins".into(), json!([{ "name": "PDF Viewer" }]));
        attributes.insert("mimeTypes".into(), json!([]));
        attributes.insert("language".into(), json!("en-US"));

        let encoded = encode_fingerprint_attributes(&attributes);
        assert!(!encoded.contains_key("plugins"));
        assert!(!encoded.contains_key("mimeTypes"));
        assert_eq!(
            encoded.get("pluginsData").map(Cell::decode),
            Some(json!({ "plugins": [{ "name": "PDF Viewer" }] }))
        );
        assert_eq!(encoded.get("language"), Some(&Cell::Plain("en-US".into())));
    }

    #[test]
    fn missing_plugins_yield_sentinel_plugins_data() {
        let mut attributes: IndexMap<AttributeName, Value> = IndexMap::new();
        attributes.insert("plugins".into(), json!(null));
        let encoded = encode_fingerprint_attributes(&attributes);
        assert_eq!(encoded.get("pluginsData"), Some(&Cell::Missing));
        assert_eq!(encoded.len(), 1);
    }
}
