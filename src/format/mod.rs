//! # ExecutableFormat Module
//!
//! Provides the [`ExecutableFormat`] contract (spec §6) and its two
//! implementations: [`object::ObjectFormat`] for ELF/PE/Mach-O via the
//! [`object`] crate, and [`raw::RawFormat`] for headerless buffers.

pub mod object;
pub mod raw;

use crate::disassemble::CpuMode;
use crate::errors::Result;
use crate::section::{NamedRegion, Section};

/// A parser that turns a raw executable buffer into the [`Section`]s and
/// [`NamedRegion`]s the gadget-discovery core consumes.
///
/// Implementations do all of their parsing up front in
/// [`ExecutableFormat::parse`]; nothing here borrows from the input buffer
/// past that call, so a [`crate::program::Program`] can free the original
/// buffer immediately after.
pub trait ExecutableFormat {
    /// Parses `data`, returning every executable section, every named
    /// sub-region, and the CPU mode gadgets should be decoded for.
    ///
    /// # Errors
    ///
    /// Returns [`crate::errors::GadgetError::Object`] if the parser rejects
    /// the buffer, or
    /// [`crate::errors::GadgetError::UnsupportedArchitecture`] if the
    /// detected architecture has no corresponding [`CpuMode`].
    fn parse(&self, data: &[u8]) -> Result<ParsedExecutable>;

    /// A short human-readable name for this format, e.g. `"ELF64"` or
    /// `"raw"`.
    fn class_name(&self) -> &'static str;
}

/// The result of parsing an executable: its sections, named regions, CPU
/// mode, and a one-line description for `display_information`.
pub struct ParsedExecutable {
    /// Every section the engine should scan for gadgets.
    pub sections: Vec<Section>,
    /// Every named sub-region available for FGKASLR filtering. May be
    /// empty.
    pub named_regions: Vec<NamedRegion>,
    /// The CPU mode to decode `sections` with.
    pub cpu: CpuMode,
    /// A human-readable summary, shown by `display_information`.
    pub summary: String,
}
