use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use subsys_core::services::FunctionPointerScan;

#[derive(Serialize)]
pub struct FnPointerTargetInfo {
    pub address: String,
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct FnPointerReport {
    pub binary: String,
    pub words_scanned: usize,
    pub matched_words: usize,
    pub targets: Vec<FnPointerTargetInfo>,
}

/// Run only the `.rodata` function-pointer pass and list its targets.
pub fn fn_pointers_command(vmlinux: &Path, address_prefix: u64, json: bool) -> Result<()> {
    let scan = FunctionPointerScan::scan_file(vmlinux, address_prefix)
        .with_context(|| format!("Failed to scan {} for function pointers", vmlinux.display()))?;
    let report = FnPointerReport {
        binary: vmlinux.display().to_string(),
        words_scanned: scan.words_scanned,
        matched_words: scan.matched_words,
        targets: scan
            .targets
            .iter()
            .map(|t| FnPointerTargetInfo { address: t.address.to_hex(), name: t.name.clone() })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("Binary: {}", report.binary);
    println!("Words scanned: {}", report.words_scanned);
    println!("Function pointer targets: {}", report.targets.len());
    for t in &report.targets {
        println!("  {} {}", t.address, t.name.as_deref().unwrap_or("?"));
    }
    Ok(())
}
