mod common;

use common::{call, fn_entry, FakeKernel};
use subsys_core::config::DiscoveryConfig;
use subsys_core::model::{Address, CrossingKind, SubsystemKey};
use subsys_core::registry::SubsystemRegistry;
use subsys_core::services::{DiscoveryRunner, FunctionPointerScan, FunctionPointerTarget};
use subsys_core::table::{ProbeTable, TableError};

const VFS_READ: u64 = 0xffff_ffff_8120_0000;
const SYS_READ: u64 = 0xffff_ffff_8120_1000;
const TCP_SENDMSG: u64 = 0xffff_ffff_8150_0000;
const EXT4_READ: u64 = 0xffff_ffff_8130_0000;
const UNOWNED: u64 = 0xffff_ffff_8190_0000;

fn kernel() -> FakeKernel {
    FakeKernel::new()
        .place(VFS_READ, "fs/read_write.c", "FILESYSTEMS (VFS and infrastructure)")
        .place(SYS_READ, "fs/read_write.c", "FILESYSTEMS (VFS and infrastructure)")
        .place(EXT4_READ, "fs/ext4/file.c", "EXT4 FILE SYSTEM")
        .place(TCP_SENDMSG, "net/ipv4/tcp.c", "NETWORKING [TCP]")
}

fn listing() -> String {
    [
        fn_entry(SYS_READ, "SyS_read"),
        call(SYS_READ + 0x20, VFS_READ, "vfs_read"),
        fn_entry(VFS_READ, "vfs_read"),
        call(VFS_READ + 0x40, EXT4_READ, "ext4_file_read_iter"),
        call(VFS_READ + 0x60, EXT4_READ, "ext4_file_read_iter"),
    ]
    .join("\n")
}

fn rodata_scan() -> FunctionPointerScan {
    FunctionPointerScan {
        targets: vec![
            FunctionPointerTarget {
                address: Address(TCP_SENDMSG),
                name: Some("tcp_sendmsg".into()),
            },
            FunctionPointerTarget { address: Address(EXT4_READ), name: None },
            FunctionPointerTarget { address: Address(UNOWNED), name: Some("mystery".into()) },
        ],
        words_scanned: 64,
        matched_words: 6,
    }
}

#[test]
fn empty_inputs_produce_an_empty_map_and_no_registry_changes() {
    let dir = tempfile::tempdir().unwrap();
    let registry_path = dir.path().join("subsys.json");
    let config = DiscoveryConfig::default();
    let kernel = kernel();

    let mut runner = DiscoveryRunner::new(&config, kernel.classifier());
    let outcome = runner.run("".as_bytes(), Some(&FunctionPointerScan::default())).unwrap();
    assert!(outcome.boundaries.is_empty());
    assert_eq!(outcome.function_pointer_targets, Some(0));

    let mut registry = SubsystemRegistry::load(&registry_path);
    let added = registry.merge(&outcome.boundaries.names());
    assert!(added.is_empty());
    assert!(!registry_path.exists());
    assert_eq!(kernel.addr2line_calls.get(), 0);
}

#[test]
fn both_passes_accumulate_into_one_structure() {
    let config = DiscoveryConfig::default();
    let kernel = kernel();
    let mut runner = DiscoveryRunner::new(&config, kernel.classifier());
    let scan = rodata_scan();

    let outcome = runner.run(listing().as_bytes(), Some(&scan)).unwrap();
    assert_eq!(outcome.function_pointer_targets, Some(3));
    assert_eq!(outcome.unclassified_targets, 1);

    let order: Vec<&str> = outcome.boundaries.iter().map(|s| s.key().as_str()).collect();
    assert_eq!(order, vec!["FILESYSTEMSVFSANDINFRASTRUCTURE", "EXTFILESYSTEM", "NETWORKINGTCP"]);

    let ext4 = outcome.boundaries.get(&SubsystemKey::from_name("EXT4 FILE SYSTEM")).unwrap();
    let kinds: Vec<CrossingKind> = ext4.entries().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![CrossingKind::DirectCall, CrossingKind::FunctionPointerTarget]);
    // The rodata target has no symbol name; the disassembly pass never entered it either.
    assert_eq!(ext4.entries()[1].name, None);

    let net = outcome.boundaries.get(&SubsystemKey::from_name("NETWORKING [TCP]")).unwrap();
    assert_eq!(net.entries()[0].name.as_deref(), Some("tcp_sendmsg"));
}

#[test]
fn function_pointer_pass_can_be_disabled() {
    let config = DiscoveryConfig { scan_function_pointers: false, ..DiscoveryConfig::default() };
    let kernel = kernel();
    let mut runner = DiscoveryRunner::new(&config, kernel.classifier());
    let outcome = runner.run(listing().as_bytes(), Some(&rodata_scan())).unwrap();
    assert_eq!(outcome.function_pointer_targets, None);
    assert!(outcome.boundaries.get(&SubsystemKey::from_name("NETWORKING [TCP]")).is_none());
}

#[test]
fn function_pointer_names_fall_back_to_disassembly_entries() {
    let config = DiscoveryConfig::default();
    let kernel = kernel();
    let mut runner = DiscoveryRunner::new(&config, kernel.classifier());
    let listing = [fn_entry(VFS_READ, "vfs_read"), fn_entry(EXT4_READ, "ext4_file_read_iter")]
        .join("\n");
    let scan = FunctionPointerScan {
        targets: vec![FunctionPointerTarget { address: Address(EXT4_READ), name: None }],
        ..FunctionPointerScan::default()
    };

    let outcome = runner.run(listing.as_bytes(), Some(&scan)).unwrap();
    let ext4 = outcome.boundaries.get(&SubsystemKey::from_name("EXT4 FILE SYSTEM")).unwrap();
    assert_eq!(ext4.entries()[0].name.as_deref(), Some("ext4_file_read_iter"));
}

#[test]
fn seeded_subsystems_appear_without_entries() {
    let config = DiscoveryConfig {
        seed_subsystems: vec!["USERSPACE_XEN".into()],
        ..DiscoveryConfig::default()
    };
    let kernel = kernel();
    let mut runner = DiscoveryRunner::new(&config, kernel.classifier());
    let outcome = runner.run("".as_bytes(), None).unwrap();
    assert_eq!(outcome.boundaries.len(), 1);
    let seeded = outcome.boundaries.get(&SubsystemKey::from_name("USERSPACE_XEN")).unwrap();
    assert!(seeded.is_empty());
}

#[test]
fn probe_table_orders_subsystems_by_registry_id() {
    let config = DiscoveryConfig::default();
    let kernel = kernel();
    let mut runner = DiscoveryRunner::new(&config, kernel.classifier());
    let outcome = runner.run(listing().as_bytes(), Some(&rodata_scan())).unwrap();

    let mut registry = SubsystemRegistry::new();
    registry.merge(&outcome.boundaries.names());
    let table = ProbeTable::build(&outcome.boundaries, &registry).unwrap();

    let ids: Vec<u32> = table.subsystems.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(table.subsystems[0].key, "EXTFILESYSTEM");
    assert_eq!(table.subsystems[0].long_name, "Ext4 file system");
    assert_eq!(table.num_probes, outcome.boundaries.total_entries());

    let vfs =
        table.subsystems.iter().find(|s| s.key == "FILESYSTEMSVFSANDINFRASTRUCTURE").unwrap();
    assert_eq!(vfs.entries[0].address, format!("{SYS_READ:016x}"));
    assert_eq!(vfs.entries[0].kind, CrossingKind::UserSyscallEntry);
    assert_eq!(vfs.entries[0].probe_code, 2);

    let json = serde_json::to_value(&table).unwrap();
    assert_eq!(json["num_probes"], table.num_probes);
    assert!(json["subsystems"][0]["entries"].is_array());
}

#[test]
fn probe_table_requires_registered_subsystems() {
    let config = DiscoveryConfig::default();
    let kernel = kernel();
    let mut runner = DiscoveryRunner::new(&config, kernel.classifier());
    let outcome = runner.run(listing().as_bytes(), None).unwrap();
    let err = ProbeTable::build(&outcome.boundaries, &SubsystemRegistry::new()).unwrap_err();
    assert!(matches!(err, TableError::UnregisteredSubsystem(_)));
}
