use std::fs;

use subsys_core::config::RecordSite;
use subsys_discovery::{
    apply_blacklist_file, canonicalize_or_current, load_discovery_config, parse_hex_u64,
    sha256_file,
};
use tempfile::tempdir;

#[test]
fn canonicalize_or_current_handles_dot_and_missing_paths() {
    let cwd = std::env::current_dir().unwrap();
    assert_eq!(canonicalize_or_current(".").unwrap(), cwd);
    assert_eq!(canonicalize_or_current("").unwrap(), cwd);
    let missing = canonicalize_or_current("no/such/linux/tree").unwrap();
    assert!(missing.is_absolute());
    assert!(missing.ends_with("no/such/linux/tree"));
}

#[test]
fn sha256_file_matches_known_digest() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("vmlinux");
    fs::write(&path, b"abc").unwrap();
    assert_eq!(
        sha256_file(&path).unwrap(),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert!(sha256_file(&temp.path().join("missing")).is_err());
}

#[test]
fn config_and_blacklist_file_combine() {
    let temp = tempdir().unwrap();
    let config_path = temp.path().join("discovery.yaml");
    fs::write(&config_path, "record_site: caller\nblacklist: [printk]\n").unwrap();
    let blacklist_path = temp.path().join("fn_blacklist.txt");
    fs::write(&blacklist_path, "kfree\n\n  mutex_lock  \n").unwrap();

    let mut config = load_discovery_config(Some(&config_path)).unwrap();
    apply_blacklist_file(&mut config, &blacklist_path).unwrap();
    assert_eq!(config.record_site, RecordSite::Caller);
    assert!(config.is_blacklisted("printk"));
    assert!(config.is_blacklisted("kfree"));
    assert!(config.is_blacklisted("mutex_lock"));
    assert!(!config.is_blacklisted(""));

    let defaults = load_discovery_config(None).unwrap();
    assert!(defaults.blacklist.is_empty());
    assert!(apply_blacklist_file(&mut config, &temp.path().join("nope")).is_err());
}

#[test]
fn parse_hex_u64_accepts_optional_prefix() {
    assert_eq!(parse_hex_u64("ffffffff00000000").unwrap(), 0xffff_ffff_0000_0000);
    assert_eq!(parse_hex_u64("0x10").unwrap(), 16);
    assert!(parse_hex_u64("zz").is_err());
}
