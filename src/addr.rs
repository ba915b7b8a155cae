//! # Address Module
//!
//! Provides the core [`Addr`] type used throughout the crate for virtual
//! address arithmetic.
//!
//! Every address in this crate (a section's base VA, an instruction's
//! entry point, a gadget occurrence, a blocked FGKASLR range) flows
//! through this single newtype so that byte offsets and virtual addresses
//! can never be silently mixed up.

use std::fmt::Display;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::Serialize;

/// A virtual address.
///
/// Always 64-bit regardless of host pointer width: the binaries being
/// scanned may be a different bitness than the process doing the scanning.
///
/// # Examples
///
/// ```
/// use ropgadget::addr::Addr;
///
/// let addr = Addr::from(0x1000u64);
/// let offset_addr = addr + 0x100u64;
/// assert_eq!(offset_addr.u64(), 0x1100);
/// assert_eq!(format!("{}", addr), "0x0000000000001000");
/// ```
#[derive(Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Addr(u64);

impl Addr {
    /// Returns the address as a `u64` value.
    pub fn u64(&self) -> u64 {
        self.0
    }

    /// Returns the address as a `usize` value.
    pub fn usize(&self) -> usize {
        self.0 as usize
    }
}

impl Display for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", { self.0 })
    }
}

impl std::fmt::Debug for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

impl Add for Addr {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Add<u64> for Addr {
    type Output = Self;
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for Addr {
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

impl Sub for Addr {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Sub<u64> for Addr {
    type Output = Self;
    fn sub(self, rhs: u64) -> Self::Output {
        Self(self.0 - rhs)
    }
}

impl SubAssign<u64> for Addr {
    fn sub_assign(&mut self, rhs: u64) {
        self.0 -= rhs;
    }
}

impl From<u64> for Addr {
    fn from(value: u64) -> Self {
        Addr(value)
    }
}

impl From<usize> for Addr {
    fn from(value: usize) -> Self {
        Addr(value as u64)
    }
}

impl From<Addr> for u64 {
    fn from(value: Addr) -> Self {
        value.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_addr_arithmetic() {
        let a = Addr::from(100u64);
        let b = Addr::from(50u64);
        assert_eq!((a + b).u64(), 150);
        assert_eq!((a - b).u64(), 50);
    }

    #[test]
    fn test_addr_conversions() {
        let a = Addr::from(0x1234u64);
        assert_eq!(a.u64(), 0x1234u64);
        assert_eq!(format!("{}", a), "0x0000000000001234");
    }
}
