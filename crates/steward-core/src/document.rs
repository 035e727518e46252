//! Generic resource documents.
//!
//! A [`Resource`] is a semi-structured tree (maps with string keys, ordered
//! lists, scalars) with no fixed schema. The engine only ever navigates it
//! by path and reads the small identity envelope every document carries:
//! `apiVersion`, `kind`, `metadata.name`, `metadata.namespace`,
//! `metadata.labels`, `metadata.resourceVersion`.

use crate::error::{Result, StewardError};
use crate::path::Path;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// TypeRef
// ---------------------------------------------------------------------------

/// Resource type descriptor: the store resolves a per-type client from this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeRef {
    pub api_version: String,
    pub kind: String,
}

impl TypeRef {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version, self.kind)
    }
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// A single observed or desired state document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(Map<String, Value>);

impl Resource {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value; anything but an object is an invalid document.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StewardError::InvalidDocument(format!(
                "expected a mapping at the document root, got {}",
                type_name(&other)
            ))),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text)?;
        Self::from_value(value)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    // -----------------------------------------------------------------------
    // Identity envelope
    // -----------------------------------------------------------------------

    pub fn api_version(&self) -> &str {
        str_at(&self.0, "apiVersion")
    }

    pub fn kind(&self) -> &str {
        str_at(&self.0, "kind")
    }

    pub fn type_ref(&self) -> TypeRef {
        TypeRef::new(self.api_version(), self.kind())
    }

    pub fn name(&self) -> &str {
        self.metadata().map_or("", |m| str_at(m, "name"))
    }

    pub fn namespace(&self) -> &str {
        self.metadata().map_or("", |m| str_at(m, "namespace"))
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.metadata()?.get("resourceVersion")?.as_str()
    }

    pub fn set_resource_version(&mut self, version: &str) {
        self.metadata_mut()
            .insert("resourceVersion".into(), Value::String(version.into()));
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        if let Some(Value::Object(map)) = self.metadata().and_then(|m| m.get("labels")) {
            for (key, value) in map {
                if let Value::String(s) = value {
                    labels.insert(key.clone(), s.clone());
                }
            }
        }
        labels
    }

    pub fn set_labels(&mut self, labels: &BTreeMap<String, String>) {
        let map: Map<String, Value> = labels
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        self.metadata_mut()
            .insert("labels".into(), Value::Object(map));
    }

    fn metadata(&self) -> Option<&Map<String, Value>> {
        self.0.get("metadata")?.as_object()
    }

    fn metadata_mut(&mut self) -> &mut Map<String, Value> {
        let entry = self
            .0
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        entry.as_object_mut().unwrap()
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// Descend the document along `path`. Missing keys, out-of-range indices,
    /// and non-container intermediates all resolve to `None`.
    pub fn nested(&self, path: &Path) -> Option<&Value> {
        path.resolve(&self.0)
    }
}

fn str_at<'a>(map: &'a Map<String, Value>, key: &str) -> &'a str {
    map.get(key).and_then(Value::as_str).unwrap_or("")
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Resource {
        Resource::from_yaml(
            r#"
apiVersion: dao.steward.io/v1
kind: Pool
metadata:
  name: p1
  namespace: default
  labels:
    app: storage
status:
  state: Online
"#,
        )
        .unwrap()
    }

    #[test]
    fn identity_accessors() {
        let r = pool();
        assert_eq!(r.api_version(), "dao.steward.io/v1");
        assert_eq!(r.kind(), "Pool");
        assert_eq!(r.name(), "p1");
        assert_eq!(r.namespace(), "default");
        assert_eq!(r.type_ref().to_string(), "dao.steward.io/v1/Pool");
    }

    #[test]
    fn missing_identity_fields_default_to_empty() {
        let r = Resource::from_yaml("spec:\n  replicas: 3\n").unwrap();
        assert_eq!(r.api_version(), "");
        assert_eq!(r.name(), "");
        assert_eq!(r.namespace(), "");
        assert!(r.resource_version().is_none());
    }

    #[test]
    fn labels_roundtrip() {
        let mut r = pool();
        assert_eq!(r.labels().get("app").map(String::as_str), Some("storage"));

        let mut labels = r.labels();
        labels.insert("tier".into(), "hot".into());
        r.set_labels(&labels);
        assert_eq!(r.labels().len(), 2);
        assert_eq!(r.labels().get("tier").map(String::as_str), Some("hot"));
    }

    #[test]
    fn set_labels_creates_metadata() {
        let mut r = Resource::new();
        let mut labels = BTreeMap::new();
        labels.insert("a".to_string(), "1".to_string());
        r.set_labels(&labels);
        assert_eq!(r.labels().get("a").map(String::as_str), Some("1"));
    }

    #[test]
    fn resource_version_roundtrip() {
        let mut r = pool();
        assert!(r.resource_version().is_none());
        r.set_resource_version("7");
        assert_eq!(r.resource_version(), Some("7"));
    }

    #[test]
    fn scalar_root_is_rejected() {
        assert!(Resource::from_yaml("42").is_err());
        assert!(Resource::from_yaml("- a\n- b").is_err());
    }

    #[test]
    fn nested_lookup() {
        let r = pool();
        let path = Path::parse("status.state").unwrap();
        assert_eq!(r.nested(&path), Some(&Value::String("Online".into())));
        let missing = Path::parse("status.reason").unwrap();
        assert_eq!(r.nested(&missing), None);
    }
}
