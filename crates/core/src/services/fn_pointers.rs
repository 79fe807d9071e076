//! Function-pointer pass over `.rodata`.
//!
//! Kernel subsystems expose entry points through `const` structs of function
//! pointers (`struct file_operations` and friends) which live in `.rodata`. The
//! call-instruction pass cannot see those targets, so this pass scans `.rodata`
//! one 32-bit word at a time and keeps every word that, extended with the kernel's
//! high address half, names a known function.
//!
//! This is a heuristic: a target is only reported once it has been seen at least
//! twice, so single-reference pointers are missed and unrelated data that happens
//! to repeat a function address twice is reported.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use goblin::elf::{self, Elf};
use log::{info, warn};
use thiserror::Error;

use crate::model::Address;

const RODATA: &str = ".rodata";
const WORD: usize = 4;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to read binary {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("Failed to parse ELF: {0}")]
    Parse(#[from] goblin::error::Error),
    #[error("Binary has no {0} section")]
    MissingSection(&'static str),
    #[error("Binary has no function symbols")]
    NoFunctionSymbols,
}

/// A `.rodata` word that points at a function at least twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionPointerTarget {
    pub address: Address,
    /// First function symbol at this address.
    pub name: Option<String>,
}

/// Result of a function-pointer pass, targets in the order they crossed the
/// two-sighting threshold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionPointerScan {
    pub targets: Vec<FunctionPointerTarget>,
    pub words_scanned: usize,
    /// Words that matched a function address at all (including single sightings).
    pub matched_words: usize,
}

impl FunctionPointerScan {
    pub fn scan_file(path: &Path, address_prefix: u64) -> Result<Self, ScanError> {
        let bytes = fs::read(path)
            .map_err(|source| ScanError::Read { path: path.to_path_buf(), source })?;
        Self::scan_elf(&bytes, address_prefix)
    }

    /// [`FunctionPointerScan::scan_file`] for a run that can go on without this pass.
    ///
    /// A binary without `.rodata` or function symbols gives `Ok(None)` and a
    /// warning. Unreadable or non-ELF input is still an error.
    pub fn scan_file_if_present(
        path: &Path,
        address_prefix: u64,
    ) -> Result<Option<Self>, ScanError> {
        match Self::scan_file(path, address_prefix) {
            Ok(scan) => Ok(Some(scan)),
            Err(e @ (ScanError::MissingSection(_) | ScanError::NoFunctionSymbols)) => {
                warn!("{}: {e}; skipping function-pointer pass", path.display());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn scan_elf(bytes: &[u8], address_prefix: u64) -> Result<Self, ScanError> {
        let elf = Elf::parse(bytes)?;
        let functions = function_symbols(&elf);
        if functions.is_empty() {
            return Err(ScanError::NoFunctionSymbols);
        }
        let rodata = section_data(&elf, bytes, RODATA).ok_or(ScanError::MissingSection(RODATA))?;
        info!(
            "scanning {} bytes of {RODATA} against {} function symbols",
            rodata.len(),
            functions.len()
        );
        let scan = scan_words(rodata, elf.little_endian, address_prefix, &functions);
        info!(
            "function-pointer pass done: {} words, {} matches, {} targets",
            scan.words_scanned,
            scan.matched_words,
            scan.targets.len()
        );
        Ok(scan)
    }
}

/// Address -> first name of every `STT_FUNC` symbol in `.symtab`.
pub fn function_symbols(elf: &Elf) -> HashMap<u64, String> {
    let mut functions = HashMap::new();
    for sym in &elf.syms {
        if !sym.is_function() || sym.st_shndx == elf::section_header::SHN_UNDEF as usize {
            continue;
        }
        let name = elf.strtab.get_at(sym.st_name).unwrap_or("").to_string();
        functions.entry(sym.st_value).or_insert(name);
    }
    functions
}

fn section_data<'a>(elf: &Elf, bytes: &'a [u8], name: &str) -> Option<&'a [u8]> {
    let shdr = elf
        .section_headers
        .iter()
        .find(|sh| elf.shdr_strtab.get_at(sh.sh_name) == Some(name))?;
    let range = shdr.file_range()?;
    bytes.get(range)
}

/// Scan `data` in 4-byte words, converting each from storage order and widening it
/// with `address_prefix`. A function address becomes a target on its second sighting.
pub fn scan_words(
    data: &[u8],
    little_endian: bool,
    address_prefix: u64,
    functions: &HashMap<u64, String>,
) -> FunctionPointerScan {
    let mut seen_once: HashSet<u64> = HashSet::new();
    let mut reported: HashSet<u64> = HashSet::new();
    let mut scan = FunctionPointerScan::default();

    for chunk in data.chunks_exact(WORD) {
        scan.words_scanned += 1;
        let bytes = [chunk[0], chunk[1], chunk[2], chunk[3]];
        let word =
            if little_endian { u32::from_le_bytes(bytes) } else { u32::from_be_bytes(bytes) };
        let candidate = address_prefix | u64::from(word);
        let Some(name) = functions.get(&candidate) else {
            continue;
        };
        scan.matched_words += 1;
        if !seen_once.insert(candidate) && reported.insert(candidate) {
            scan.targets.push(FunctionPointerTarget {
                address: Address(candidate),
                name: Some(name.clone()).filter(|n| !n.is_empty()),
            });
        }
    }
    scan
}
