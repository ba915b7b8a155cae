//! # Program Module
//!
//! Provides [`Program`], the orchestrator that ties an
//! [`crate::format::ExecutableFormat`] adapter, the per-section
//! [`crate::engine::GadgetEngine`] scan, and the
//! [`crate::fgkaslr::AddressBlocker`] together into the public surface the
//! CLI drives (spec §4.4, §4.5, §6 "Program contract").

use std::path::Path;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::{info, warn};

use crate::disassemble::{CpuMode, Syntax, X86Disassembler};
use crate::engine::GadgetEngine;
use crate::errors::{GadgetError, Result};
use crate::fgkaslr::AddressBlocker;
use crate::format::object::ObjectFormat;
use crate::format::raw::RawFormat;
use crate::format::{ExecutableFormat, ParsedExecutable};
use crate::gadget::Gadget;

/// Orchestrates a full gadget scan of one executable.
///
/// Holds the parsed executable's sections and named regions; the original
/// file buffer is dropped once parsing completes (spec §9: "manual buffer
/// ownership ... becomes owned byte containers").
pub struct Program {
    parsed: ParsedExecutable,
    syntax: Syntax,
}

impl Program {
    /// Opens `path` as an ELF/PE/Mach-O executable, using
    /// [`ObjectFormat`] to parse it.
    ///
    /// # Errors
    ///
    /// Returns [`GadgetError::ExecutableDoesNotExist`] or
    /// [`GadgetError::ExecutableIsNotAFile`] if `path` is unusable, or any
    /// error [`ObjectFormat::parse`] returns.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_format(path, &ObjectFormat::new(), Syntax::Intel)
    }

    /// Opens `path` as a headerless buffer at `base_va`, decoded as `cpu`.
    ///
    /// # Errors
    ///
    /// Returns [`GadgetError::ExecutableDoesNotExist`] or
    /// [`GadgetError::ExecutableIsNotAFile`] if `path` is unusable.
    pub fn open_raw(path: impl AsRef<Path>, cpu: CpuMode, base_va: u64) -> Result<Self> {
        Self::open_with_format(path, &RawFormat::new(cpu, base_va), Syntax::Intel)
    }

    /// Opens `path` using an arbitrary [`ExecutableFormat`] adapter and
    /// assembly syntax.
    ///
    /// # Errors
    ///
    /// Returns [`GadgetError::ExecutableDoesNotExist`] or
    /// [`GadgetError::ExecutableIsNotAFile`] if `path` is unusable, or any
    /// error the given `format` returns while parsing.
    pub fn open_with_format(
        path: impl AsRef<Path>,
        format: &dyn ExecutableFormat,
        syntax: Syntax,
    ) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|_| GadgetError::ExecutableDoesNotExist)?;
        if !metadata.is_file() {
            return Err(GadgetError::ExecutableIsNotAFile);
        }
        let data = std::fs::read(path)?;
        let parsed = format.parse(&data)?;

        if parsed.sections.is_empty() {
            warn!(path = %path.display(), "no executable sections found");
        }

        Ok(Self { parsed, syntax })
    }

    /// Scans every section and returns the deduplicated, sorted multiset of
    /// gadgets with up to `depth` bytes of preamble (spec §4.4, "standard
    /// mode").
    ///
    /// Each section is scanned independently, in parallel (spec §5:
    /// "sharded merge-then-reduce"); the per-section results are then
    /// reduced sequentially, in section order, into one map before being
    /// sorted by [`Gadget::sort_key`].
    #[must_use]
    pub fn find_gadgets(&self, depth: u64) -> Vec<Gadget> {
        let shards: Vec<FxHashMap<String, Gadget>> = self
            .parsed
            .sections
            .par_iter()
            .map(|section| {
                let mut engine = GadgetEngine::new(
                    X86Disassembler::new(self.parsed.cpu, self.syntax),
                    depth as usize + 1,
                );
                engine.scan(section, depth)
            })
            .collect();

        let mut merged: FxHashMap<String, Gadget> = FxHashMap::default();
        for shard in shards {
            for (key, gadget) in shard {
                match merged.get_mut(&key) {
                    Some(existing) => existing.merge(gadget),
                    None => {
                        merged.insert(key, gadget);
                    }
                }
            }
        }

        let mut gadgets: Vec<Gadget> = merged.into_values().collect();
        gadgets.sort_unstable_by(|a, b| a.sort_key().cmp(b.sort_key()));
        gadgets
    }

    /// Scans every section and filters out occurrences that fall inside a
    /// named `.text.*` sub-region (spec §4.5, "FGKASLR mode").
    ///
    /// Gadgets that lose every occurrence are dropped entirely. The
    /// remaining gadgets are not re-sorted or re-merged: filtering
    /// preserves both dedup and sort order.
    #[must_use]
    pub fn find_fgkaslr_compatible_gadgets(&self, depth: u64) -> Vec<Gadget> {
        let blocker = AddressBlocker::from_named_regions(&self.parsed.named_regions);
        if blocker.is_empty() {
            warn!("no `.text.*` named regions available; FGKASLR filtering has nothing to do");
            return Vec::new();
        }

        let mut gadgets = self.find_gadgets(depth);
        gadgets.retain_mut(|gadget| {
            gadget.filter_occurrences(|va| blocker.contains(va));
            !gadget.is_empty()
        });
        gadgets
    }

    /// Searches every section for a literal byte pattern, returning every
    /// match as `(section_name, absolute_va)`.
    ///
    /// # Errors
    ///
    /// Returns [`GadgetError::EmptyPattern`] if `pattern` is empty.
    pub fn search_and_display(&self, pattern: &[u8]) -> Result<Vec<(String, u64)>> {
        if pattern.is_empty() {
            return Err(GadgetError::EmptyPattern);
        }
        let mut hits = Vec::new();
        for section in &self.parsed.sections {
            for offset in section.search_in_memory(pattern) {
                let va = section.vaddr() + offset;
                info!(section = section.name(), va = format!("{va:#018x}"), "match");
                hits.push((section.name().to_string(), va));
            }
        }
        Ok(hits)
    }

    /// Returns a human-readable summary of the parsed executable.
    ///
    /// At verbosity 0, only the top-level summary is included; at
    /// verbosity ≥ 1, every section's name, address and size is appended.
    #[must_use]
    pub fn display_information(&self, verbosity: u8) -> String {
        let mut out = self.parsed.summary.clone();
        if verbosity >= 1 {
            for section in &self.parsed.sections {
                out.push_str(&format!(
                    "\n  {:<20} {:#018x} ({} bytes)",
                    section.name(),
                    section.vaddr(),
                    section.size()
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn write_temp_file(bytes: &[u8]) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("ropgadget-test-{:p}", bytes.as_ptr()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn open_nonexistent_file_errors() {
        let err = Program::open("/nonexistent/path/to/nowhere").unwrap_err();
        assert!(matches!(err, GadgetError::ExecutableDoesNotExist));
    }

    #[test]
    fn raw_program_finds_gadgets() {
        let path = write_temp_file(&[0x90, 0xc3]);
        let program = Program::open_raw(&path, CpuMode::X64, 0x1000).unwrap();
        let gadgets = program.find_gadgets(5);
        assert_eq!(gadgets.len(), 2);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn raw_program_has_no_fgkaslr_regions() {
        let path = write_temp_file(&[0x90, 0xc3]);
        let program = Program::open_raw(&path, CpuMode::X64, 0x1000).unwrap();
        assert!(program.find_fgkaslr_compatible_gadgets(5).is_empty());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn search_and_display_rejects_empty_pattern() {
        let path = write_temp_file(&[0x90, 0xc3]);
        let program = Program::open_raw(&path, CpuMode::X64, 0x1000).unwrap();
        assert!(matches!(
            program.search_and_display(&[]),
            Err(GadgetError::EmptyPattern)
        ));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn search_and_display_finds_matches() {
        let path = write_temp_file(&[0x90, 0xc3, 0x90, 0xc3]);
        let program = Program::open_raw(&path, CpuMode::X64, 0x1000).unwrap();
        let hits = program.search_and_display(&[0x90, 0xc3]).unwrap();
        assert_eq!(hits, vec![("<raw>".to_string(), 0x1000), ("<raw>".to_string(), 0x1002)]);
        std::fs::remove_file(path).ok();
    }
}
