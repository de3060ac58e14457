use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

use crate::utils::PamsError;

/// A single survey answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SurveyValue {
    Text(String),
    List(Vec<String>),
}

/// The booker's profile and preference answers.
///
/// Fields are kept in sorted order so that the serialized form is canonical:
/// two surveys with the same answers always serialize to the same string,
/// which is what the recommendation cache keys on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurveyInput {
    fields: BTreeMap<String, SurveyValue>,
}

impl SurveyInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style text answer
    pub fn with_text(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(field.into(), SurveyValue::Text(value.into()));
        self
    }

    /// Builder-style multi-choice answer
    pub fn with_list<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.fields.insert(field.into(), SurveyValue::List(values));
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: SurveyValue) {
        self.fields.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&SurveyValue> {
        self.fields.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse a survey from a JSON object
    pub fn from_json(json: &str) -> Result<Self, PamsError> {
        serde_json::from_str(json).map_err(|e| {
            PamsError::SurveyError(format!(
                "survey must be a JSON object of strings or string arrays: {}",
                e
            ))
        })
    }

    /// Load a survey from a file, or treat the argument as inline JSON
    /// when it starts with `{`
    pub fn load(source: &str) -> Result<Self, PamsError> {
        if source.trim_start().starts_with('{') {
            return Self::from_json(source);
        }
        let content = std::fs::read_to_string(Path::new(source))?;
        Self::from_json(&content)
    }

    /// Canonical JSON form, used as the request payload
    pub fn serialize(&self) -> String {
        // A map of strings and string arrays always serializes
        serde_json::to_string(&self.fields).unwrap_or_else(|_| "{}".to_string())
    }

    /// SHA-256 of the canonical form, used as the cache identity
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.serialize().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_serialization_is_order_independent() {
        let a = SurveyInput::from_json(r#"{"firstName":"Kim","genres":["dance","music"]}"#).unwrap();
        let b = SurveyInput::from_json(r#"{"genres":["dance","music"],"firstName":"Kim"}"#).unwrap();

        assert_eq!(a.serialize(), b.serialize());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.serialize(), r#"{"firstName":"Kim","genres":["dance","music"]}"#);
    }

    #[test]
    fn test_any_field_change_changes_fingerprint() {
        let base = SurveyInput::new().with_text("firstName", "Kim");
        let changed = SurveyInput::new().with_text("firstName", "Lee");
        let extra = base.clone().with_list("genres", ["dance"]);

        assert_ne!(base.fingerprint(), changed.fingerprint());
        assert_ne!(base.fingerprint(), extra.fingerprint());
        assert_eq!(base.fingerprint().len(), 64);
    }

    #[test]
    fn test_list_order_is_significant() {
        let a = SurveyInput::new().with_list("genres", ["dance", "music"]);
        let b = SurveyInput::new().with_list("genres", ["music", "dance"]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_rejects_non_string_values() {
        assert!(SurveyInput::from_json(r#"{"age": 42}"#).is_err());
        assert!(SurveyInput::from_json(r#"["not", "an", "object"]"#).is_err());
    }

    #[test]
    fn test_load_inline_json() {
        let survey = SurveyInput::load(r#" {"performanceStyle":"experimental"}"#).unwrap();
        assert_eq!(
            survey.get("performanceStyle"),
            Some(&SurveyValue::Text("experimental".to_string()))
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("survey.json");
        std::fs::write(&path, r#"{"culturalThemes":["tradition"]}"#).unwrap();

        let survey = SurveyInput::load(path.to_str().unwrap()).unwrap();
        assert!(!survey.is_empty());
    }
}
