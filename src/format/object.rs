//! # Object-Backed ExecutableFormat
//!
//! Provides [`ObjectFormat`], an [`ExecutableFormat`] implementation
//! wrapping the [`object`] crate, covering ELF, PE and Mach-O binaries
//! (spec §4.6).

use object::{Architecture, Object, ObjectSection, SectionKind};

use crate::disassemble::CpuMode;
use crate::errors::{GadgetError, Result};
use crate::format::{ExecutableFormat, ParsedExecutable};
use crate::section::{NamedRegion, Section};

/// Parses ELF/PE/Mach-O executables via [`object::File`].
///
/// Executable sections are those `object` classifies as
/// [`SectionKind::Text`], a format-independent judgment `object` already
/// makes, sparing this adapter from per-format branching. Every section
/// (not only the executable ones) is also exposed as a candidate named
/// region, so ELF `-ffunction-sections` output (`.text.foo`) is visible to
/// [`crate::fgkaslr::AddressBlocker`]; PE and Mach-O binaries simply
/// contribute no `.text.`-prefixed names, which is the correct behaviour:
/// those formats have no per-function text sections in the FGKASLR sense.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectFormat;

impl ObjectFormat {
    /// Builds a new `object`-backed format adapter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ExecutableFormat for ObjectFormat {
    fn parse(&self, data: &[u8]) -> Result<ParsedExecutable> {
        let file = object::File::parse(data)?;

        let cpu = cpu_mode_for(file.architecture())?;

        let mut sections = Vec::new();
        let mut named_regions = Vec::new();
        for section in file.sections() {
            let name = section.name().unwrap_or("<unnamed>").to_string();
            let vaddr = section.address();
            let Ok(data) = section.data() else {
                continue;
            };
            if data.is_empty() {
                continue;
            }

            named_regions.push(NamedRegion::new(
                name.clone(),
                section.file_range().map_or(0, |(offset, _)| offset),
                vaddr,
                data.to_vec(),
            ));

            if section.kind() == SectionKind::Text {
                sections.push(Section::new(name, vaddr, data.to_vec()));
            }
        }

        let summary = format!(
            "{:?} image, architecture {:?}, {} section(s), {} executable",
            file.format(),
            file.architecture(),
            named_regions.len(),
            sections.len(),
        );

        Ok(ParsedExecutable {
            sections,
            named_regions,
            cpu,
            summary,
        })
    }

    fn class_name(&self) -> &'static str {
        "object"
    }
}

fn cpu_mode_for(architecture: Architecture) -> Result<CpuMode> {
    match architecture {
        Architecture::I386 => Ok(CpuMode::X86),
        Architecture::X86_64 => Ok(CpuMode::X64),
        other => Err(GadgetError::UnsupportedArchitecture(other)),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unsupported_architecture_is_rejected() {
        assert!(cpu_mode_for(Architecture::Aarch64).is_err());
    }

    #[test]
    fn x86_64_maps_to_x64() {
        assert_eq!(cpu_mode_for(Architecture::X86_64).unwrap(), CpuMode::X64);
    }

    #[test]
    fn i386_maps_to_x86() {
        assert_eq!(cpu_mode_for(Architecture::I386).unwrap(), CpuMode::X86);
    }
}
