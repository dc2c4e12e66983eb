//! Field-level patches for application records.
//!
//! Update requests need three states per field: leave it alone, clear it, or
//! overwrite it. On the wire a missing key or `""` means "leave it", JSON
//! `null` (or the legacy string `"null"`) means "clear", and anything else is
//! a new value.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Legacy string clients send to clear a field.
pub const CLEAR_SENTINEL: &str = "null";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldPatch {
    /// Not provided; keep the stored value.
    #[default]
    Unset,
    /// Explicitly clear the stored value.
    Clear,
    /// Overwrite with a new value.
    Set(String),
}

impl FieldPatch {
    /// Interpret a raw wire string.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "" => FieldPatch::Unset,
            CLEAR_SENTINEL => FieldPatch::Clear,
            value => FieldPatch::Set(value.to_string()),
        }
    }

    pub fn set(value: impl Into<String>) -> Self {
        FieldPatch::Set(value.into())
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, FieldPatch::Unset)
    }

    /// Apply this patch to a stored field.
    pub fn apply_to(&self, field: &mut String) {
        match self {
            FieldPatch::Unset => {}
            FieldPatch::Clear => field.clear(),
            FieldPatch::Set(value) => value.clone_into(field),
        }
    }

    /// Value for a freshly created record; `Unset` and `Clear` both mean empty.
    pub fn initial_value(&self) -> String {
        match self {
            FieldPatch::Set(value) => value.clone(),
            FieldPatch::Unset | FieldPatch::Clear => String::new(),
        }
    }
}

impl Serialize for FieldPatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldPatch::Unset => serializer.serialize_str(""),
            FieldPatch::Clear => serializer.serialize_none(),
            FieldPatch::Set(value) => serializer.serialize_str(value),
        }
    }
}

impl<'de> Deserialize<'de> for FieldPatch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw {
            None => FieldPatch::Clear,
            Some(raw) => FieldPatch::from_wire(&raw),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    struct Body {
        #[serde(default, skip_serializing_if = "FieldPatch::is_unset")]
        builder: FieldPatch,
    }

    fn parse(json: &str) -> FieldPatch {
        serde_json::from_str::<Body>(json).unwrap().builder
    }

    #[test]
    fn wire_states() {
        assert_eq!(parse("{}"), FieldPatch::Unset);
        assert_eq!(parse(r#"{"builder": ""}"#), FieldPatch::Unset);
        assert_eq!(parse(r#"{"builder": null}"#), FieldPatch::Clear);
        assert_eq!(parse(r#"{"builder": "null"}"#), FieldPatch::Clear);
        assert_eq!(
            parse(r#"{"builder": "heroku/builder:22"}"#),
            FieldPatch::Set("heroku/builder:22".to_string())
        );
    }

    #[test]
    fn apply_keeps_clears_and_sets() {
        let mut field = "paketo".to_string();
        FieldPatch::Unset.apply_to(&mut field);
        assert_eq!(field, "paketo");

        FieldPatch::set("heroku").apply_to(&mut field);
        assert_eq!(field, "heroku");

        FieldPatch::Clear.apply_to(&mut field);
        assert_eq!(field, "");
    }

    #[test]
    fn initial_value_ignores_clear() {
        assert_eq!(FieldPatch::Clear.initial_value(), "");
        assert_eq!(FieldPatch::Unset.initial_value(), "");
        assert_eq!(FieldPatch::set("main").initial_value(), "main");
    }

    #[test]
    fn unset_is_omitted_when_serialized() {
        let json = serde_json::to_string(&Body {
            builder: FieldPatch::Unset,
        })
        .unwrap();
        assert_eq!(json, "{}");

        let json = serde_json::to_string(&Body {
            builder: FieldPatch::Clear,
        })
        .unwrap();
        assert_eq!(json, r#"{"builder":null}"#);
    }
}
