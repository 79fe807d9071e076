use std::collections::BTreeSet;
use std::fs;

use subsys_core::model::{SubsystemKey, SubsystemName};
use subsys_core::registry::SubsystemRegistry;
use tempfile::tempdir;

fn names(list: &[&str]) -> Vec<SubsystemName> {
    list.iter().map(|n| SubsystemName::new(*n)).collect()
}

fn ids(registry: &SubsystemRegistry) -> BTreeSet<u32> {
    registry.iter().map(|(_, e)| e.id).collect()
}

#[test]
fn load_missing_file_yields_empty_registry() {
    let dir = tempdir().unwrap();
    let registry = SubsystemRegistry::load(&dir.path().join("subsys.json"));
    assert!(registry.is_empty());
}

#[test]
fn load_malformed_file_yields_empty_registry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("subsys.json");
    fs::write(&path, "{ this is not json").unwrap();
    assert!(SubsystemRegistry::load(&path).is_empty());

    fs::write(&path, r#"{"VFS": {"id": "zero"}}"#).unwrap();
    assert!(SubsystemRegistry::load(&path).is_empty());
}

#[test]
fn merge_assigns_dense_ids_in_sorted_name_order() {
    let mut registry = SubsystemRegistry::new();
    let added = registry.merge(&names(&["VFS", "Block layer", "MEMORY MANAGEMENT"]));
    assert_eq!(added.len(), 3);

    let block = registry.get(&SubsystemKey::from_name("Block layer")).unwrap();
    assert_eq!(block.id, 0);
    assert_eq!(block.long_name, "Block layer");
    assert_eq!(block.short_name, "BLOCKLAYER");
    assert_eq!(registry.get(&SubsystemKey::from_name("MEMORY MANAGEMENT")).unwrap().id, 1);
    assert_eq!(registry.get(&SubsystemKey::from_name("VFS")).unwrap().id, 2);
    assert_eq!(ids(&registry), (0..3).collect());
}

#[test]
fn merge_is_idempotent() {
    let set = names(&["NETWORKING [GENERAL]", "SCHEDULER", "Block layer"]);
    let mut once = SubsystemRegistry::new();
    once.merge(&set);
    let mut twice = once.clone();
    let added = twice.merge(&set);
    assert!(added.is_empty());
    assert_eq!(once, twice);
    assert_eq!(once.to_json_pretty().unwrap(), twice.to_json_pretty().unwrap());
}

#[test]
fn merge_treats_punctuation_variants_as_one_subsystem() {
    let mut registry = SubsystemRegistry::new();
    registry.merge(&names(&["Block layer", "BLOCK-LAYER"]));
    assert_eq!(registry.len(), 1);
    registry.merge(&names(&["block layer!"]));
    assert_eq!(registry.len(), 1);
}

#[test]
fn existing_ids_never_change_across_merges() {
    let mut registry = SubsystemRegistry::new();
    registry.merge(&names(&["VFS", "SCHEDULER"]));
    let vfs_id = registry.get(&SubsystemKey::from_name("VFS")).unwrap().id;
    let sched_id = registry.get(&SubsystemKey::from_name("SCHEDULER")).unwrap().id;

    // "AAA" sorts before everything but still gets the next id.
    registry.merge(&names(&["AAA", "VFS", "ZSWAP"]));
    assert_eq!(registry.get(&SubsystemKey::from_name("VFS")).unwrap().id, vfs_id);
    assert_eq!(registry.get(&SubsystemKey::from_name("SCHEDULER")).unwrap().id, sched_id);
    assert_eq!(registry.get(&SubsystemKey::from_name("AAA")).unwrap().id, 2);
    assert_eq!(registry.get(&SubsystemKey::from_name("ZSWAP")).unwrap().id, 3);
    assert_eq!(ids(&registry), (0..4).collect());
}

#[test]
fn save_then_load_round_trips_and_appends_incrementally() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("subsys.json");

    let mut first = SubsystemRegistry::load(&path);
    first.merge(&names(&["VFS", "SCHEDULER"]));
    first.save(&path).unwrap();

    let mut second = SubsystemRegistry::load(&path);
    assert_eq!(second, first);
    second.merge(&names(&["MEMORY MANAGEMENT"]));
    second.save(&path).unwrap();

    let reloaded = SubsystemRegistry::load(&path);
    assert_eq!(reloaded.get(&SubsystemKey::from_name("MEMORY MANAGEMENT")).unwrap().id, 2);
    assert_eq!(reloaded.get(&SubsystemKey::from_name("SCHEDULER")).unwrap().id, 0);
    assert_eq!(reloaded.get(&SubsystemKey::from_name("VFS")).unwrap().id, 1);
}

#[test]
fn save_writes_keys_in_ascending_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("subsys.json");
    let mut registry = SubsystemRegistry::new();
    registry.merge(&names(&["ZSWAP"]));
    registry.merge(&names(&["ALSA"]));
    registry.save(&path).unwrap();

    let body = fs::read_to_string(&path).unwrap();
    let alsa = body.find("\"ALSA\"").unwrap();
    let zswap = body.find("\"ZSWAP\"").unwrap();
    assert!(alsa < zswap);
    assert!(body.contains("\"long_name\": \"Zswap\""));
    assert!(body.contains("\"short_name\": \"ZSWAP\""));
    assert!(body.contains("\"id\": 1"));

    // Only the registry itself is left behind.
    let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
}

#[test]
fn hand_edited_names_survive_a_merge() {
    let body = r#"{
  "VFS": { "id": 0, "long_name": "Virtual file system", "short_name": "VFS" }
}"#;
    let mut registry = SubsystemRegistry::parse(body).unwrap();
    registry.merge(&names(&["vfs", "SCHEDULER"]));
    let vfs = registry.get(&SubsystemKey::from_name("VFS")).unwrap();
    assert_eq!(vfs.long_name, "Virtual file system");
    assert_eq!(registry.by_id().last().unwrap().0.as_str(), "SCHEDULER");
}
