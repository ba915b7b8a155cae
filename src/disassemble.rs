//! # Disassembly Module
//!
//! Provides the [`Disassembler`] trait and its `iced-x86`-backed x86/x64
//! implementation.
//!
//! This module is the only place that knows about a concrete decoder
//! library; everything above it ([`crate::engine`], [`crate::gadget`],
//! [`crate::program`]) only ever sees [`crate::instruction::Instruction`].
//! That boundary is the "pluggable per-CPU backend" the spec describes:
//! another ISA would be added here, as another `impl Disassembler`,
//! without touching the scanning algorithm at all.

use std::fmt::Display;
use std::str::FromStr;

use iced_x86::{Decoder, DecoderOptions, Formatter, GasFormatter, IntelFormatter};

use crate::addr::Addr;
use crate::instruction::{Instruction, Terminator};

/// The CPU mode a [`Disassembler`] decodes for.
///
/// Only the two modes `iced-x86` itself supports are implemented; see
/// `SPEC_FULL.md` for the reasoning and the corresponding Open Question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuMode {
    /// 32-bit x86
    X86,
    /// 64-bit x86 (AMD64/Intel 64)
    X64,
}

impl CpuMode {
    fn bitness(self) -> u32 {
        match self {
            CpuMode::X86 => 32,
            CpuMode::X64 => 64,
        }
    }
}

impl FromStr for CpuMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x86" | "i386" | "ia32" => Ok(CpuMode::X86),
            "x64" | "x86_64" | "amd64" => Ok(CpuMode::X64),
            other => Err(format!("unsupported raw CPU mode: {other}")),
        }
    }
}

impl Display for CpuMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CpuMode::X86 => write!(f, "x86"),
            CpuMode::X64 => write!(f, "x64"),
        }
    }
}

/// The assembly syntax used when formatting instruction text.
///
/// Affects [`Instruction::canonical_text`] (and thus
/// [`crate::gadget::Gadget::disassembly`]) but never affects terminator
/// classification (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    /// NASM-style Intel syntax, e.g. `mov rax, rbx`
    Intel,
    /// AT&T syntax, e.g. `mov %rbx, %rax`
    Att,
}

impl FromStr for Syntax {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "intel" => Ok(Syntax::Intel),
            "att" | "at&t" | "gas" => Ok(Syntax::Att),
            other => Err(format!("unsupported syntax: {other}")),
        }
    }
}

/// A pluggable per-CPU decoder back-end.
///
/// Contract (spec §4.1): `decode_one` looks at exactly the bytes starting
/// at `offset` within `buffer`, interprets `base_va` as the virtual address
/// of `buffer[0]`, and is deterministic and pure, repeated calls with the
/// same arguments always produce the same result. On failure (the byte at
/// `offset` does not begin a legal instruction) it returns `None`; this is
/// the only failure mode, and per spec §7 it is never surfaced as a
/// `GadgetError`, callers treat it as "this offset doesn't start an
/// instruction" and move on.
///
/// Implementations may hold mutable scratch state (e.g. a formatter) and
/// must be instantiated once per worker that scans concurrently (spec §5).
pub trait Disassembler: Send {
    /// Attempts to decode exactly one instruction starting at `offset`.
    fn decode_one(&mut self, buffer: &[u8], offset: usize, base_va: u64) -> Option<Instruction>;

    /// Creates an independent clone of this disassembler, for handing one
    /// instance to each parallel worker.
    fn clone_box(&self) -> Box<dyn Disassembler>;
}

impl Clone for Box<dyn Disassembler> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// An `iced-x86`-backed [`Disassembler`] for the x86 instruction family.
pub struct X86Disassembler {
    mode: CpuMode,
    syntax: Syntax,
    formatter: Box<dyn Formatter + Send>,
}

impl X86Disassembler {
    /// Builds a new decoder for the given CPU mode and assembly syntax.
    #[must_use]
    pub fn new(mode: CpuMode, syntax: Syntax) -> Self {
        Self {
            mode,
            syntax,
            formatter: build_formatter(syntax),
        }
    }
}

fn build_formatter(syntax: Syntax) -> Box<dyn Formatter + Send> {
    let mut formatter: Box<dyn Formatter + Send> = match syntax {
        Syntax::Intel => Box::new(IntelFormatter::new()),
        Syntax::Att => Box::new(GasFormatter::new()),
    };
    formatter.options_mut().set_hex_prefix("0x");
    formatter.options_mut().set_hex_suffix("");
    formatter.options_mut().set_uppercase_hex(false);
    formatter.options_mut().set_space_after_operand_separator(true);
    formatter
}

impl Disassembler for X86Disassembler {
    fn decode_one(&mut self, buffer: &[u8], offset: usize, base_va: u64) -> Option<Instruction> {
        if offset >= buffer.len() {
            return None;
        }
        let ip = base_va.checked_add(offset as u64)?;
        let mut decoder =
            Decoder::with_ip(self.mode.bitness(), &buffer[offset..], ip, DecoderOptions::NONE);
        if !decoder.can_decode() {
            return None;
        }
        let iced_instr = decoder.decode();
        if iced_instr.is_invalid() {
            return None;
        }
        let len = iced_instr.len();
        if offset + len > buffer.len() {
            return None;
        }

        let mut formatted = String::new();
        self.formatter.format(&iced_instr, &mut formatted);
        let (mnemonic, operands) = match formatted.split_once(' ') {
            Some((mnemonic, operands)) => (mnemonic.to_string(), operands.trim().to_string()),
            None => (formatted, String::new()),
        };

        let (terminator, unconditional_transfer) = classify(&iced_instr);

        Some(Instruction::with_flow(
            mnemonic,
            operands,
            buffer[offset..offset + len].to_vec(),
            Addr::from(ip),
            terminator,
            unconditional_transfer,
        ))
    }

    fn clone_box(&self) -> Box<dyn Disassembler> {
        Box::new(X86Disassembler::new(self.mode, self.syntax))
    }
}

/// Classifies a decoded `iced-x86` instruction into the spec's terminator
/// set (spec §4.3) and decides whether it unconditionally transfers
/// control away, which also covers direct jumps/calls that aren't
/// themselves accepted gadget terminators but still sever a gadget
/// preamble (spec §4.3 edge cases).
fn classify(instr: &iced_x86::Instruction) -> (Option<Terminator>, bool) {
    use iced_x86::{FlowControl, Mnemonic, OpKind};

    let terminator = match instr.mnemonic() {
        Mnemonic::Ret => Some(Terminator::Return),
        Mnemonic::Retf => Some(Terminator::FarReturn),
        Mnemonic::Syscall => Some(Terminator::Syscall),
        Mnemonic::Sysenter => Some(Terminator::Sysenter),
        Mnemonic::Int if instr.op0_kind() == OpKind::Immediate8 && instr.immediate8() == 0x80 => {
            Some(Terminator::Interrupt)
        }
        Mnemonic::Jmp if instr.op0_kind() == OpKind::Register => Some(Terminator::IndirectJump),
        Mnemonic::Call if instr.op0_kind() == OpKind::Register => Some(Terminator::IndirectCall),
        _ => None,
    };

    let unconditional = terminator.is_some()
        || matches!(
            instr.flow_control(),
            FlowControl::UnconditionalBranch
                | FlowControl::IndirectBranch
                | FlowControl::Call
                | FlowControl::IndirectCall
                | FlowControl::Return
                | FlowControl::Interrupt
                | FlowControl::XbeginXabortXend
                | FlowControl::Exception
        );

    (terminator, unconditional)
}

#[cfg(test)]
mod test {
    use super::*;

    fn decoder() -> X86Disassembler {
        X86Disassembler::new(CpuMode::X64, Syntax::Intel)
    }

    #[test]
    fn decodes_a_bare_ret() {
        let mut d = decoder();
        let instr = d.decode_one(&[0xc3], 0, 0x1000).unwrap();
        assert_eq!(instr.mnemonic(), "ret");
        assert_eq!(instr.length(), 1);
        assert_eq!(instr.terminator(), Some(Terminator::Return));
        assert!(instr.is_unconditional_transfer());
    }

    #[test]
    fn decodes_nop_then_ret() {
        let mut d = decoder();
        let nop = d.decode_one(&[0x90, 0xc3], 0, 0x1000).unwrap();
        assert_eq!(nop.mnemonic(), "nop");
        assert_eq!(nop.terminator(), None);
        assert!(!nop.is_unconditional_transfer());

        let ret = d.decode_one(&[0x90, 0xc3], 1, 0x1000).unwrap();
        assert_eq!(ret.mnemonic(), "ret");
        assert_eq!(ret.address().u64(), 0x1001);
    }

    #[test]
    fn invalid_byte_decodes_to_none() {
        let mut d = decoder();
        // 0x0f alone with no following opcode byte in a 1-byte buffer
        // cannot be decoded.
        assert!(d.decode_one(&[0x0f], 0, 0x1000).is_none());
    }

    #[test]
    fn jmp_register_is_indirect_jump_terminator() {
        let mut d = decoder();
        // ff e0 => jmp rax
        let instr = d.decode_one(&[0xff, 0xe0], 0, 0x1000).unwrap();
        assert_eq!(instr.mnemonic(), "jmp");
        assert_eq!(instr.terminator(), Some(Terminator::IndirectJump));
    }

    #[test]
    fn call_register_is_indirect_call_terminator() {
        let mut d = decoder();
        // ff d0 => call rax
        let instr = d.decode_one(&[0xff, 0xd0], 0, 0x1000).unwrap();
        assert_eq!(instr.mnemonic(), "call");
        assert_eq!(instr.terminator(), Some(Terminator::IndirectCall));
    }

    #[test]
    fn int_0x80_is_interrupt_terminator() {
        let mut d = decoder();
        // cd 80 => int 0x80
        let instr = d.decode_one(&[0xcd, 0x80], 0, 0x1000).unwrap();
        assert_eq!(instr.mnemonic(), "int");
        assert_eq!(instr.terminator(), Some(Terminator::Interrupt));
    }

    #[test]
    fn direct_jmp_severs_but_is_not_a_terminator() {
        let mut d = decoder();
        // eb fe => jmp $ (short jump, direct)
        let instr = d.decode_one(&[0xeb, 0xfe], 0, 0x1000).unwrap();
        assert_eq!(instr.mnemonic(), "jmp");
        assert_eq!(instr.terminator(), None);
        assert!(instr.is_unconditional_transfer());
    }

    #[test]
    fn att_syntax_changes_operand_formatting() {
        let mut d = X86Disassembler::new(CpuMode::X64, Syntax::Att);
        // 48 89 d8 => mov rax, rbx (intel) / mov %rbx,%rax (at&t)
        let instr = d.decode_one(&[0x48, 0x89, 0xd8], 0, 0x1000).unwrap();
        assert!(instr.operands().contains('%'));
    }
}
