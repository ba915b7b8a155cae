//! # Instruction Module
//!
//! Provides the [`Instruction`] type: a single, immutable, disassembled
//! instruction as produced by a [`crate::disassemble::Disassembler`].
//!
//! An [`Instruction`] is deliberately dumb data: it carries exactly what
//! the gadget engine and the dedup/sort machinery need (mnemonic, operand
//! text, raw bytes, length, address) and nothing that would tie it to a
//! particular decoder backend.

use serde::Serialize;
use std::fmt::{self, Display};

use crate::addr::Addr;

/// A single disassembled instruction.
///
/// Immutable after construction; see spec §3 ("Instruction").
///
/// # Examples
///
/// ```
/// use ropgadget::addr::Addr;
/// use ropgadget::instruction::Instruction;
///
/// let instr = Instruction::new(
///     "ret".to_string(),
///     String::new(),
///     vec![0xc3],
///     Addr::from(0x1000u64),
/// );
/// assert_eq!(instr.length(), 1);
/// assert_eq!(format!("{instr}"), "ret");
/// ```

/// The specific kind of control transfer a terminating instruction performs.
///
/// Produced by a [`crate::disassemble::Disassembler`] backend for every
/// instruction it decodes; the [`crate::engine`] uses it to find gadget
/// endpoints without needing to know anything about the underlying ISA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Terminator {
    /// `ret` / `ret imm16`
    Return,
    /// `retf` / `retf imm16`
    FarReturn,
    /// `syscall`
    Syscall,
    /// `sysenter`
    Sysenter,
    /// `int 0x80`
    Interrupt,
    /// `jmp reg`
    IndirectJump,
    /// `call reg`
    IndirectCall,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Instruction {
    mnemonic: String,
    operands: String,
    bytes: Vec<u8>,
    address: Addr,
    terminator: Option<Terminator>,
    unconditional_transfer: bool,
}

impl Instruction {
    /// Creates a new instruction that is not a gadget terminator and does
    /// not unconditionally transfer control (the common case: arithmetic,
    /// data movement, conditional branches, ...).
    #[must_use]
    pub fn new(mnemonic: String, operands: String, bytes: Vec<u8>, address: Addr) -> Self {
        Self {
            mnemonic,
            operands,
            bytes,
            address,
            terminator: None,
            unconditional_transfer: false,
        }
    }

    /// Creates a new instruction carrying explicit terminator/flow
    /// classification, as produced by a [`crate::disassemble::Disassembler`]
    /// backend.
    #[must_use]
    pub fn with_flow(
        mnemonic: String,
        operands: String,
        bytes: Vec<u8>,
        address: Addr,
        terminator: Option<Terminator>,
        unconditional_transfer: bool,
    ) -> Self {
        Self {
            mnemonic,
            operands,
            bytes,
            address,
            terminator,
            unconditional_transfer,
        }
    }

    /// If this instruction can end a gadget, says which kind of terminator
    /// it is.
    pub fn terminator(&self) -> Option<Terminator> {
        self.terminator
    }

    /// Whether this instruction unconditionally transfers control away from
    /// the next sequential address, either because it's a terminator, or
    /// because it's a direct/indirect jump or call this engine doesn't
    /// accept as a gadget ending (spec §4.3: "an unconditional
    /// control-transfer that would sever the chain").
    pub fn is_unconditional_transfer(&self) -> bool {
        self.unconditional_transfer
    }

    /// The instruction's mnemonic, e.g. `"ret"` or `"mov"`.
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// The instruction's formatted operands, e.g. `"rax, rbx"`. Empty for
    /// instructions that take none.
    pub fn operands(&self) -> &str {
        &self.operands
    }

    /// The raw bytes that make up this instruction.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The length of the instruction in bytes.
    pub fn length(&self) -> usize {
        self.bytes.len()
    }

    /// The virtual address at which this instruction would execute.
    pub fn address(&self) -> Addr {
        self.address
    }

    /// The canonical textual form of this instruction, used as part of a
    /// [`crate::gadget::Gadget`]'s dedup key.
    ///
    /// Mnemonic and operands, separated by a single space if there are
    /// operands, with no trailing separator. The gadget assembles the
    /// `" ; "`-joined form from these.
    #[must_use]
    pub fn canonical_text(&self) -> String {
        if self.operands.is_empty() {
            self.mnemonic.clone()
        } else {
            format!("{} {}", self.mnemonic, self.operands)
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_text())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn canonical_text_without_operands() {
        let i = Instruction::new("ret".into(), String::new(), vec![0xc3], Addr::from(0u64));
        assert_eq!(i.canonical_text(), "ret");
    }

    #[test]
    fn canonical_text_with_operands() {
        let i = Instruction::new(
            "jmp".into(),
            "rax".into(),
            vec![0xff, 0xe0],
            Addr::from(0u64),
        );
        assert_eq!(i.canonical_text(), "jmp rax");
    }
}
