use serde::Serialize;
use steward_core::recipe::RecipeResult;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// One line per step, then a recipe summary.
pub fn print_recipe(result: &RecipeResult) {
    for step in &result.steps {
        println!(
            "{:7}  {} ({}): {}",
            step.phase.as_str(),
            step.name,
            step.action,
            step.message
        );
        if !step.verbose.is_empty() {
            println!("         {}", step.verbose);
        }
    }
    let elapsed = (result.completed_at - result.started_at).num_milliseconds();
    println!();
    println!("recipe '{}' {} in {}ms", result.name, result.phase, elapsed);
}
