use std::path::Path;

use anyhow::{Context, Result};
use subsys_core::model::SubsystemName;
use subsys_core::registry::SubsystemRegistry;

/// Print the subsystem registry ordered by id.
pub fn registry_info_command(registry_path: &Path, json: bool) -> Result<()> {
    let registry = SubsystemRegistry::load(registry_path);
    if json {
        println!("{}", registry.to_json_pretty()?);
        return Ok(());
    }

    println!("Registry: {}", registry_path.display());
    println!("Subsystems: {}", registry.len());
    for (key, entry) in registry.by_id() {
        println!("  {:>4}  {:<40} {}", entry.id, key, entry.long_name);
    }
    Ok(())
}

/// Append subsystem names to the registry, writing it only when something was added.
pub fn update_registry_command(registry_path: &Path, names: &[String]) -> Result<()> {
    let mut registry = SubsystemRegistry::load(registry_path);
    let names: Vec<SubsystemName> = names.iter().map(SubsystemName::new).collect();
    let added = registry.merge(&names);
    if added.is_empty() {
        println!("No new subsystems; {} left unchanged.", registry_path.display());
        return Ok(());
    }

    registry
        .save(registry_path)
        .with_context(|| format!("Failed to save registry {}", registry_path.display()))?;
    for key in &added {
        if let Some(entry) = registry.get(key) {
            println!("Added {} as {}", key, entry.id);
        }
    }
    Ok(())
}
