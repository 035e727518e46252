//! File-backed resource store.
//!
//! One YAML document per file under
//! `<root>/<api_version>/<kind>/<namespace>/<name>.yaml` (the `/` in a
//! grouped api version is flattened to `_`; an empty namespace stores under
//! `_cluster`). Writes are atomic and bump `metadata.resourceVersion`, so
//! concurrent writers hit the same conflict semantics as a networked store.

use crate::document::{Resource, TypeRef};
use crate::error::{Result, StewardError};
use crate::io::atomic_write;
use crate::store::{merge_document, ResourceClient, ResourceStore, Selector};
use std::path::{Path, PathBuf};

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn sanitize(part: &str) -> String {
    part.replace('/', "_")
}

fn namespace_dir(namespace: &str) -> &str {
    if namespace.is_empty() {
        "_cluster"
    } else {
        namespace
    }
}

impl ResourceStore for FsStore {
    fn client_for(&self, type_ref: &TypeRef) -> Result<Box<dyn ResourceClient + '_>> {
        if type_ref.api_version.is_empty() || type_ref.kind.is_empty() {
            return Err(StewardError::UnknownResourceType(type_ref.to_string()));
        }
        Ok(Box::new(FsClient {
            type_dir: self
                .root
                .join(sanitize(&type_ref.api_version))
                .join(&type_ref.kind),
        }))
    }
}

#[derive(Debug)]
struct FsClient {
    type_dir: PathBuf,
}

impl FsClient {
    fn doc_path(&self, namespace: &str, name: &str) -> PathBuf {
        self.type_dir
            .join(namespace_dir(namespace))
            .join(format!("{name}.yaml"))
    }

    fn read_doc(&self, path: &Path) -> Result<Resource> {
        let text = std::fs::read_to_string(path)?;
        Resource::from_yaml(&text)
    }

    fn write_doc(&self, resource: &Resource) -> Result<()> {
        let path = self.doc_path(resource.namespace(), resource.name());
        let text = serde_yaml::to_string(resource)?;
        atomic_write(&path, text.as_bytes())
    }
}

impl ResourceClient for FsClient {
    fn list(&self, namespace: &str, selector: &Selector) -> Result<Vec<Resource>> {
        let dir = self.type_dir.join(namespace_dir(namespace));
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut items = Vec::new();
        let mut entries: Vec<_> = std::fs::read_dir(&dir)?
            .collect::<std::io::Result<_>>()?;
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let resource = self.read_doc(&path)?;
            if selector.matches(&resource.labels()) {
                items.push(resource);
            }
        }
        Ok(items)
    }

    fn get(&self, namespace: &str, name: &str) -> Result<Option<Resource>> {
        let path = self.doc_path(namespace, name);
        if !path.exists() {
            return Ok(None);
        }
        self.read_doc(&path).map(Some)
    }

    fn update(&self, desired: &Resource) -> Result<Resource> {
        if desired.name().is_empty() {
            return Err(StewardError::InvalidDocument(
                "document has no metadata.name".to_string(),
            ));
        }
        let existing = self
            .get(desired.namespace(), desired.name())?
            .ok_or_else(|| {
                StewardError::NotFound(format!("{}/{}", desired.namespace(), desired.name()))
            })?;
        if let (Some(want), Some(have)) = (desired.resource_version(), existing.resource_version())
        {
            if want != have {
                return Err(StewardError::Conflict(format!(
                    "resource version {want} is stale (current {have})"
                )));
            }
        }
        let mut stored = desired.clone();
        bump_version(&mut stored, existing.resource_version());
        self.write_doc(&stored)?;
        Ok(stored)
    }

    fn create_or_merge(&self, desired: &Resource) -> Result<Resource> {
        if desired.name().is_empty() {
            return Err(StewardError::InvalidDocument(
                "document has no metadata.name".to_string(),
            ));
        }
        let stored = match self.get(desired.namespace(), desired.name())? {
            Some(existing) => {
                let mut map = existing.as_map().clone();
                merge_document(&mut map, desired.as_map());
                let mut merged = Resource::from_value(serde_json::Value::Object(map))?;
                bump_version(&mut merged, existing.resource_version());
                merged
            }
            None => {
                let mut created = desired.clone();
                created.set_resource_version("1");
                created
            }
        };
        self.write_doc(&stored)?;
        Ok(stored)
    }
}

fn bump_version(resource: &mut Resource, current: Option<&str>) {
    let next = current.and_then(|v| v.parse::<u64>().ok()).unwrap_or(0) + 1;
    resource.set_resource_version(&next.to_string());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
