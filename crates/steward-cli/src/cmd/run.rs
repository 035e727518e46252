use crate::output;
use anyhow::Context;
use std::path::Path;
use steward_core::recipe::{Recipe, RecipeRunner};
use steward_core::store::FsStore;
use steward_core::types::Phase;

pub fn run(recipe_path: &Path, store_dir: &Path, json: bool) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(recipe_path)
        .with_context(|| format!("reading recipe {}", recipe_path.display()))?;
    let recipe: Recipe = serde_yaml::from_str(&text)
        .with_context(|| format!("parsing recipe {}", recipe_path.display()))?;

    let store = FsStore::new(store_dir);
    let result = RecipeRunner::new(&store, &recipe).run()?;

    if json {
        output::print_json(&result)?;
    } else {
        output::print_recipe(&result);
    }

    if result.phase == Phase::Failed {
        anyhow::bail!("recipe '{}' failed", result.name);
    }
    Ok(())
}
