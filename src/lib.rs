//! # ropgadget
//!
//! A return-oriented-programming gadget finder for ELF, PE, Mach-O and raw
//! executables.
//!
//! ## Core Features
//!
//! - **Format-independent parsing**: ELF, PE and Mach-O via [`object`], plus
//!   a headerless "raw" mode for shellcode and firmware dumps.
//! - **Gadget discovery**: backwards-growing scan from every terminator
//!   instruction (`ret`, `syscall`, indirect `jmp`/`call`, ...) up to a
//!   configurable byte depth.
//! - **Deduplication**: gadgets with identical disassembly text are merged,
//!   keeping every occurrence's address.
//! - **FGKASLR-aware filtering**: gadgets whose occurrence address falls
//!   inside a named `.text.*` sub-section can be dropped, mirroring the
//!   kernel's fine-grained KASLR function reordering.
//!
//! ## Architecture
//!
//! The crate is built around a small set of collaborating components:
//!
//! - [`disassemble`]: a pluggable per-CPU [`disassemble::Disassembler`], with
//!   an `iced-x86`-backed x86/x64 implementation.
//! - [`engine`]: the [`engine::GadgetEngine`] scanning algorithm, generic
//!   over any [`disassemble::Disassembler`].
//! - [`format`]: [`format::ExecutableFormat`] adapters that turn a byte
//!   buffer into executable sections and named sub-regions.
//! - [`fgkaslr`]: the [`fgkaslr::AddressBlocker`] used to filter gadgets that
//!   only exist because of address-independent code layout.
//! - [`program`]: [`program::Program`], the orchestrator that ties the
//!   above together into a single scan across an entire executable.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ropgadget::program::Program;
//!
//! fn main() -> ropgadget::errors::Result<()> {
//!     let program = Program::open("/bin/ls")?;
//!     let gadgets = program.find_gadgets(6)?;
//!     for gadget in gadgets.iter().take(5) {
//!         println!("{gadget}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod addr;
pub mod disassemble;
pub mod engine;
pub mod errors;
pub mod fgkaslr;
pub mod format;
pub mod gadget;
pub mod instruction;
pub mod program;
pub mod section;
