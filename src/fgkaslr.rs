//! # FGKASLR Module
//!
//! Provides [`AddressBlocker`], the fine-grained KASLR address filter (spec
//! §4.5, §9). It derives a blocked-address set from named sub-regions whose
//! name begins with the literal prefix `.text.`, the convention the Linux
//! kernel uses for per-function sections produced by
//! `-ffunction-sections`, and answers point-membership queries against it.
//!
//! The reference implementation keys a dense map by every individual
//! address in every blocked region (spec §9: "poor density"). This instead
//! merges blocked regions into a sorted, non-overlapping interval list and
//! answers membership with a binary search via `partition_point`, giving
//! O(log n) lookups regardless of how many bytes are covered.

use crate::section::NamedRegion;

/// A sorted, merged set of blocked virtual-address ranges.
#[derive(Debug, Clone, Default)]
pub struct AddressBlocker {
    /// Sorted, non-overlapping, half-open `[start, end)` ranges.
    ranges: Vec<(u64, u64)>,
}

impl AddressBlocker {
    /// Builds a blocker from a set of named regions, keeping only those
    /// whose name starts with the literal prefix `.text.` (spec §9: a
    /// region named exactly `.text` is not blocked).
    #[must_use]
    pub fn from_named_regions(regions: &[NamedRegion]) -> Self {
        let mut bounds: Vec<(u64, u64)> = regions
            .iter()
            .filter(|r| r.name().starts_with(".text."))
            .map(|r| (r.vaddr(), r.vaddr() + r.size()))
            .collect();
        bounds.sort_unstable();

        let mut ranges: Vec<(u64, u64)> = Vec::with_capacity(bounds.len());
        for (start, end) in bounds {
            if start >= end {
                continue;
            }
            match ranges.last_mut() {
                Some((_, last_end)) if start <= *last_end => {
                    *last_end = (*last_end).max(end);
                }
                _ => ranges.push((start, end)),
            }
        }

        Self { ranges }
    }

    /// Whether this blocker has no ranges at all, i.e. there were no
    /// `.text.*` named regions to block against (spec §4.5: "If no named
    /// regions exist, emit a user-visible warning and return an empty
    /// result").
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Whether `va` falls inside any blocked range.
    #[must_use]
    pub fn contains(&self, va: u64) -> bool {
        let idx = self.ranges.partition_point(|&(start, _)| start <= va);
        idx > 0 && va < self.ranges[idx - 1].1
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn region(name: &str, vaddr: u64, size: u64) -> NamedRegion {
        NamedRegion::new(name, 0, vaddr, vec![0u8; size as usize])
    }

    #[test]
    fn only_dot_text_dot_prefixed_regions_are_blocked() {
        let blocker = AddressBlocker::from_named_regions(&[
            region(".text", 0x1000, 0x100),
            region(".text.foo", 0x2000, 0x100),
        ]);
        assert!(!blocker.contains(0x1000));
        assert!(blocker.contains(0x2000));
        assert!(blocker.contains(0x20ff));
        assert!(!blocker.contains(0x2100));
    }

    #[test]
    fn adjacent_and_overlapping_regions_merge() {
        let blocker = AddressBlocker::from_named_regions(&[
            region(".text.a", 0x1000, 0x100),
            region(".text.b", 0x1080, 0x100),
        ]);
        assert!(blocker.contains(0x1000));
        assert!(blocker.contains(0x1090));
        assert!(blocker.contains(0x117f));
        assert!(!blocker.contains(0x1180));
    }

    #[test]
    fn no_named_regions_yields_empty_blocker() {
        let blocker = AddressBlocker::from_named_regions(&[]);
        assert!(blocker.is_empty());
        assert!(!blocker.contains(0x1000));
    }

    /// Scenario 5: a gadget found in standard mode is dropped once its
    /// entry VA falls inside a blocked `.text.*` region.
    #[test]
    fn gadget_occurrence_inside_blocked_region_is_filtered() {
        use crate::gadget::Gadget;
        use crate::instruction::Instruction;
        use crate::addr::Addr;

        let blocker = AddressBlocker::from_named_regions(&[region(".text.foo", 0x1000, 2)]);
        let nop = Instruction::new("nop".into(), String::new(), vec![0x90], Addr::from(0u64));
        let mut gadget = Gadget::new(vec![nop], 0x1000, 0);
        gadget.filter_occurrences(|va| blocker.contains(va));
        assert!(gadget.is_empty());
    }

    /// Spec §9 open question, preserved for parity: only the gadget's own
    /// start VA is checked, not its full byte span, so an occurrence that
    /// starts outside a blocked region but spans into one is retained.
    #[test]
    fn only_the_occurrence_start_address_is_checked() {
        use crate::gadget::Gadget;
        use crate::instruction::Instruction;
        use crate::addr::Addr;

        // blocked range is [0x1001, 0x1002); the gadget starts at 0x1000
        // and its (hypothetical, multi-byte) body spans into it.
        let blocker = AddressBlocker::from_named_regions(&[region(".text.foo", 0x1001, 1)]);
        let instr = Instruction::new(
            "ret".into(),
            String::new(),
            vec![0xc3],
            Addr::from(0x1000u64),
        );
        let mut gadget = Gadget::new(vec![instr], 0x1000, 0);
        gadget.filter_occurrences(|va| blocker.contains(va));
        assert!(!gadget.is_empty());
    }
}
