use crate::output;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use steward_core::document::Resource;
use steward_core::store::{FsStore, ResourceStore};

pub fn run(doc_path: &Path, store_dir: &Path, json: bool) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(doc_path)
        .with_context(|| format!("reading documents {}", doc_path.display()))?;

    let store = FsStore::new(store_dir);
    let mut seeded = Vec::new();
    for deserializer in serde_yaml::Deserializer::from_str(&text) {
        let value = serde_json::Value::deserialize(deserializer)
            .with_context(|| format!("parsing documents {}", doc_path.display()))?;
        if value.is_null() {
            continue;
        }
        let resource = Resource::from_value(value)?;
        let client = store.client_for(&resource.type_ref())?;
        let stored = client.create_or_merge(&resource)?;
        seeded.push(SeededDoc {
            type_ref: stored.type_ref().to_string(),
            namespace: stored.namespace().to_string(),
            name: stored.name().to_string(),
            version: stored.resource_version().unwrap_or("").to_string(),
        });
    }

    if json {
        output::print_json(&seeded)?;
    } else {
        for doc in &seeded {
            println!(
                "seeded {} {}/{} at version {}",
                doc.type_ref, doc.namespace, doc.name, doc.version
            );
        }
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct SeededDoc {
    type_ref: String,
    namespace: String,
    name: String,
    version: String,
}
