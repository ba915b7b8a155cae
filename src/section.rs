//! # Section Module
//!
//! Provides the owned [`Section`] and [`NamedRegion`] types produced by a
//! [`crate::format::ExecutableFormat`] adapter and consumed by
//! [`crate::engine::GadgetEngine`] and [`crate::fgkaslr::AddressBlocker`].
//!
//! Both types own their byte buffers outright (spec §9: "manual buffer
//! ownership ... becomes owned byte containers") rather than borrowing from
//! a parsed `object::File`, so a [`crate::program::Program`] can drop the
//! underlying parser immediately after extraction and hand sections off to
//! parallel workers without any lifetime entanglement.

/// An executable region of a binary: a byte buffer plus the virtual address
/// its first byte would occupy at runtime.
///
/// See spec §6, "Section contract (consumed)".
#[derive(Debug, Clone)]
pub struct Section {
    name: String,
    vaddr: u64,
    buffer: Vec<u8>,
}

impl Section {
    /// Builds a new section from an owned buffer.
    #[must_use]
    pub fn new(name: impl Into<String>, vaddr: u64, buffer: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            vaddr,
            buffer,
        }
    }

    /// The section's name, e.g. `.text`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The virtual address of `self.buffer()[0]`.
    pub fn vaddr(&self) -> u64 {
        self.vaddr
    }

    /// The section's size in bytes. Always equal to `self.buffer().len()`.
    pub fn size(&self) -> u64 {
        self.buffer.len() as u64
    }

    /// Borrows the section's raw bytes.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Finds every byte offset at which `pattern` occurs literally within
    /// this section, used by the auxiliary `--search-hexa` path.
    #[must_use]
    pub fn search_in_memory(&self, pattern: &[u8]) -> Vec<u64> {
        if pattern.is_empty() || pattern.len() > self.buffer.len() {
            return Vec::new();
        }
        self.buffer
            .windows(pattern.len())
            .enumerate()
            .filter(|(_, window)| *window == pattern)
            .map(|(offset, _)| offset as u64)
            .collect()
    }
}

/// A named sub-region of a binary, exposed independently of top-level
/// executable [`Section`]s, typically an ELF `-ffunction-sections`
/// per-function section such as `.text.foo`.
///
/// See spec §6, "NamedRegion contract (consumed)", and
/// [`crate::fgkaslr::AddressBlocker`] for its primary consumer.
#[derive(Debug, Clone)]
pub struct NamedRegion {
    name: String,
    offset: u64,
    vaddr: u64,
    buffer: Vec<u8>,
}

impl NamedRegion {
    /// Builds a new named region from an owned buffer.
    #[must_use]
    pub fn new(name: impl Into<String>, offset: u64, vaddr: u64, buffer: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            offset,
            vaddr,
            buffer,
        }
    }

    /// The region's name, e.g. `.text.foo`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The region's file offset. Unused by the FGKASLR blocker; kept for
    /// parity with the contract and for `dump`.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The region's virtual address.
    pub fn vaddr(&self) -> u64 {
        self.vaddr
    }

    /// The region's size in bytes.
    pub fn size(&self) -> u64 {
        self.buffer.len() as u64
    }

    /// Writes this region's bytes to `writer`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error encountered while writing.
    pub fn dump(&self, writer: &mut impl std::io::Write) -> std::io::Result<()> {
        writer.write_all(&self.buffer)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn search_in_memory_finds_every_occurrence() {
        let section = Section::new(".text", 0x1000, vec![0x90, 0xc3, 0x90, 0xc3]);
        assert_eq!(section.search_in_memory(&[0x90, 0xc3]), vec![0, 2]);
    }

    #[test]
    fn search_in_memory_empty_pattern_finds_nothing() {
        let section = Section::new(".text", 0x1000, vec![0x90, 0xc3]);
        assert!(section.search_in_memory(&[]).is_empty());
    }

    #[test]
    fn named_region_dumps_its_bytes() {
        let region = NamedRegion::new(".text.foo", 0x40, 0x1000, vec![1, 2, 3]);
        let mut out = Vec::new();
        region.dump(&mut out).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }
}
