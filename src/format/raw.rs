//! # Raw ExecutableFormat
//!
//! Provides [`RawFormat`], mirroring `rp++`'s `Raw` format: the entire
//! input buffer is treated as a single executable section at a
//! caller-supplied base virtual address, with no named regions at all
//! (spec §4.6). Used for shellcode, firmware dumps, and other headerless
//! blobs passed via `--raw`.

use crate::disassemble::CpuMode;
use crate::errors::Result;
use crate::format::{ExecutableFormat, ParsedExecutable};
use crate::section::Section;

/// Treats its input as one headerless executable section.
#[derive(Debug, Clone, Copy)]
pub struct RawFormat {
    cpu: CpuMode,
    base_va: u64,
}

impl RawFormat {
    /// Builds a new raw format adapter for the given CPU mode and base
    /// virtual address.
    #[must_use]
    pub fn new(cpu: CpuMode, base_va: u64) -> Self {
        Self { cpu, base_va }
    }
}

impl ExecutableFormat for RawFormat {
    fn parse(&self, data: &[u8]) -> Result<ParsedExecutable> {
        let summary = format!(
            "raw {} image, {} byte(s) at {:#018x}",
            self.cpu,
            data.len(),
            self.base_va
        );
        Ok(ParsedExecutable {
            sections: vec![Section::new("<raw>", self.base_va, data.to_vec())],
            named_regions: Vec::new(),
            cpu: self.cpu,
            summary,
        })
    }

    fn class_name(&self) -> &'static str {
        "raw"
    }
}
