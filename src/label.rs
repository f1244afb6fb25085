//! Display labels resolved from loosely typed model output.
//!
//! The language model is asked for strings but regularly answers with numbers,
//! `null`, or small objects such as `{"name": "Sales Cloud"}`. Every value that
//! ends up inside diagram text is resolved into a [`Label`] when the JSON is
//! deserialized, so renderers only ever deal with text or an explicit
//! "missing" marker and never print a raw object.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Object properties probed, in order, when a label arrives as an object.
pub const PROBED_KEYS: &[&str] = &[
    "name",
    "description",
    "text",
    "value",
    "product",
    "benefit",
    "capability",
    "initiative",
];

/// A value destined for a text label.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Label {
    Text(String),
    Number(serde_json::Number),
    #[default]
    Missing,
}

impl Label {
    /// Resolve an arbitrary JSON value.
    ///
    /// Strings pass through, numbers stringify, objects are probed with
    /// [`PROBED_KEYS`] (first non-empty string or number wins). Anything else
    /// is [`Label::Missing`].
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Label::Text(s.clone()),
            Value::Number(n) => Label::Number(n.clone()),
            Value::Object(map) => PROBED_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(|v| match v {
                    Value::String(s) if !s.is_empty() => Some(Label::Text(s.clone())),
                    Value::Number(n) => Some(Label::Number(n.clone())),
                    _ => None,
                })
                .unwrap_or(Label::Missing),
            _ => Label::Missing,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Label::Text(s.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Label::Missing)
    }

    /// True when the label would render as an empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            Label::Text(s) => s.trim().is_empty(),
            Label::Number(_) => false,
            Label::Missing => true,
        }
    }

    /// Rendered text, or `fallback` when missing.
    pub fn or<'a>(&'a self, fallback: &'a str) -> std::borrow::Cow<'a, str> {
        match self {
            Label::Text(s) => std::borrow::Cow::Borrowed(s.as_str()),
            Label::Number(n) => std::borrow::Cow::Owned(n.to_string()),
            Label::Missing => std::borrow::Cow::Borrowed(fallback),
        }
    }

    /// Rendered text with an empty fallback.
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        self.or("")
    }

    /// `self` unless blank, otherwise `other`.
    pub fn or_label<'a>(&'a self, other: &'a Label) -> &'a Label {
        if self.is_blank() {
            other
        } else {
            self
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Label::Text(s) => s,
            Label::Number(n) => n.to_string(),
            Label::Missing => String::new(),
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::Text(s.to_string())
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label::Text(s)
    }
}

impl From<i64> for Label {
    fn from(n: i64) -> Self {
        Label::Number(n.into())
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Label::from_value(&value))
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Label::Text(s) => serializer.serialize_str(s),
            Label::Number(n) => n.serialize(serializer),
            Label::Missing => serializer.serialize_none(),
        }
    }
}

/// Deserialize a plain `String` field through [`Label`] resolution.
pub fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Label::deserialize(deserializer)?.into_string())
}

/// Deserialize a list, dropping elements of the wrong shape.
///
/// `null` or a non-array value becomes an empty list.
pub fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Deserialize an optional section; wrong shapes count as absent.
pub fn lenient_option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}
