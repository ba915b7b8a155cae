//! # GadgetEngine Module
//!
//! Provides [`GadgetEngine`], the backwards-growing scan algorithm that
//! turns one executable [`crate::section::Section`] into a deduplicated set
//! of [`Gadget`]s (spec §4.3).
//!
//! The engine is generic over any [`Disassembler`], so it carries no
//! ISA-specific knowledge at all; terminator classification is entirely
//! delegated to the [`Instruction`]s the disassembler hands back.

use rustc_hash::FxHashMap;

use crate::disassemble::Disassembler;
use crate::gadget::Gadget;
use crate::instruction::Instruction;
use crate::section::Section;

/// Scans one section for gadgets up to `depth` bytes of preamble.
pub struct GadgetEngine<D: Disassembler> {
    disassembler: D,
    /// Maximum number of instructions accepted in a single gadget,
    /// including its terminator. Spec §4.3: "typically depth+1".
    max_instructions: usize,
}

impl<D: Disassembler> GadgetEngine<D> {
    /// Builds a new engine around the given disassembler.
    ///
    /// `max_instructions` bounds how many instructions a single gadget may
    /// contain; pass `depth + 1` to match the spec's default.
    #[must_use]
    pub fn new(disassembler: D, max_instructions: usize) -> Self {
        Self {
            disassembler,
            max_instructions,
        }
    }

    /// Scans `section` for every gadget with at most `depth` bytes of
    /// preamble before a terminator, returning the section's deduplicated
    /// working set keyed by [`Gadget::disassembly`].
    ///
    /// Implements the algorithm of spec §4.3 steps 1-8: for every offset at
    /// which a terminator decodes, every preamble length from 0 to `depth`
    /// is tried; a preamble is accepted only if it disassembles cleanly,
    /// lands exactly on the terminator's start, and contains no severing
    /// instruction before the terminator itself.
    #[must_use]
    pub fn scan(&mut self, section: &Section, depth: u64) -> FxHashMap<String, Gadget> {
        let buffer = section.buffer();
        let base_va = section.vaddr();
        let mut gadgets: FxHashMap<String, Gadget> = FxHashMap::default();

        for t in 0..buffer.len() {
            let Some(terminator) = self.disassembler.decode_one(buffer, t, base_va) else {
                continue;
            };
            if terminator.terminator().is_none() {
                continue;
            }
            let t_end = t + terminator.length();

            for pre_len in 0..=depth as usize {
                if pre_len > t {
                    break;
                }
                let start = t - pre_len;
                if let Some(instructions) = self.try_window(buffer, start, t_end, base_va) {
                    let gadget = Gadget::new(instructions, base_va, start as u64);
                    match gadgets.get_mut(gadget.disassembly()) {
                        Some(existing) => existing.merge(gadget),
                        None => {
                            gadgets.insert(gadget.disassembly().to_string(), gadget);
                        }
                    }
                }
            }
        }

        gadgets
    }

    /// Attempts to decode exactly the byte range `[start, t_end)` as an
    /// unbroken instruction sequence ending precisely at `t_end`, with the
    /// terminator as its sole final instruction.
    fn try_window(
        &mut self,
        buffer: &[u8],
        start: usize,
        t_end: usize,
        base_va: u64,
    ) -> Option<Vec<Instruction>> {
        let mut instructions = Vec::new();
        let mut pos = start;

        while pos < t_end {
            let instr = self.disassembler.decode_one(buffer, pos, base_va)?;
            let len = instr.length();
            if len == 0 || pos + len > t_end {
                return None;
            }
            let is_last = pos + len == t_end;
            if !is_last && (instr.terminator().is_some() || instr.is_unconditional_transfer()) {
                return None;
            }
            pos += len;
            instructions.push(instr);
            if instructions.len() > self.max_instructions {
                return None;
            }
        }

        if pos != t_end {
            return None;
        }
        let last = instructions.last()?;
        if last.terminator().is_none() {
            return None;
        }
        Some(instructions)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::disassemble::{CpuMode, Syntax, X86Disassembler};

    fn engine(depth: u64) -> GadgetEngine<X86Disassembler> {
        GadgetEngine::new(
            X86Disassembler::new(CpuMode::X64, Syntax::Intel),
            depth as usize + 1,
        )
    }

    /// Scenario 1: `c3` at VA 0x1000, depth 0 → one gadget "ret ; " at (0x1000, 0).
    #[test]
    fn bare_ret_yields_single_gadget() {
        let section = Section::new(".text", 0x1000, vec![0xc3]);
        let gadgets = engine(0).scan(&section, 0);
        assert_eq!(gadgets.len(), 1);
        let g = &gadgets["ret ; "];
        assert_eq!(g.offsets(), &[0]);
        assert_eq!(g.va_sections(), &[0x1000]);
    }

    /// Scenario 2: `90 c3` at VA 0x1000, depth 5 → "ret ; " at offset 1 and
    /// "nop ; ret ; " at offset 0.
    #[test]
    fn nop_then_ret_yields_two_gadgets() {
        let section = Section::new(".text", 0x1000, vec![0x90, 0xc3]);
        let gadgets = engine(5).scan(&section, 5);
        assert_eq!(gadgets.len(), 2);
        assert_eq!(gadgets["ret ; "].offsets(), &[1]);
        assert_eq!(gadgets["nop ; ret ; "].offsets(), &[0]);
    }

    /// Scenario 3: `c3 c3` → two occurrences of "ret ; " merged into one gadget.
    #[test]
    fn overlapping_terminators_merge_into_one_gadget() {
        let section = Section::new(".text", 0x1000, vec![0xc3, 0xc3]);
        let gadgets = engine(0).scan(&section, 0);
        assert_eq!(gadgets.len(), 1);
        assert_eq!(gadgets["ret ; "].offsets(), &[0, 1]);
    }

    /// Scenario 6: a lone `ff` byte matches no terminator and yields nothing.
    #[test]
    fn invalid_terminator_byte_yields_no_gadgets() {
        let section = Section::new(".text", 0x1000, vec![0xff]);
        let gadgets = engine(5).scan(&section, 5);
        assert!(gadgets.is_empty());
    }

    #[test]
    fn terminator_at_offset_zero_with_preamble_is_skipped() {
        // a single ret at the very start of the section: no preamble fits.
        let section = Section::new(".text", 0x1000, vec![0xc3]);
        let gadgets = engine(5).scan(&section, 5);
        assert_eq!(gadgets.len(), 1);
        assert_eq!(gadgets["ret ; "].offsets(), &[0]);
    }

    #[test]
    fn preamble_itself_a_terminator_is_rejected() {
        // c3 c3 c3: for the final ret, the two-byte preamble "ret ; ret" is
        // rejected (non-final terminator), but the one-byte preamble
        // "ret ; " from the middle ret is accepted.
        let section = Section::new(".text", 0x1000, vec![0xc3, 0xc3, 0xc3]);
        let gadgets = engine(2).scan(&section, 2);
        let ret = &gadgets["ret ; "];
        assert_eq!(ret.offsets(), &[0, 1, 2]);
        assert!(!gadgets.contains_key("ret ; ret ; "));
    }

    #[test]
    fn depth_monotonicity_holds() {
        let section = Section::new(".text", 0x1000, vec![0x90, 0x90, 0xc3]);
        let small = engine(1).scan(&section, 1);
        let large = engine(5).scan(&section, 5);
        for key in small.keys() {
            assert!(large.contains_key(key));
        }
    }

    #[test]
    fn empty_section_yields_no_gadgets() {
        let section = Section::new(".text", 0x1000, vec![]);
        assert!(engine(5).scan(&section, 5).is_empty());
    }
}
