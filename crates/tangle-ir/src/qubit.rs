//! Qubit and classical bit identifiers.
//!
//! Wires are addressed by flat indices into the circuit. Register names
//! live on the circuit itself (declaration order), so identifiers stay
//! `Copy` and instructions stay small.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a qubit wire within a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QubitId(pub u32);

impl QubitId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(id)
    }
}

impl From<usize> for QubitId {
    fn from(id: usize) -> Self {
        QubitId(u32::try_from(id).expect("QubitId overflow: exceeds u32::MAX"))
    }
}

/// Unique identifier for a classical bit wire within a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClbitId(pub u32);

impl ClbitId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClbitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl From<u32> for ClbitId {
    fn from(id: u32) -> Self {
        ClbitId(id)
    }
}

impl From<usize> for ClbitId {
    fn from(id: usize) -> Self {
        ClbitId(u32::try_from(id).expect("ClbitId overflow: exceeds u32::MAX"))
    }
}

/// A named register of quantum or classical wires.
///
/// Registers are declared once at circuit construction; their flat wire
/// range is `[start, start + size)` in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    pub name: String,
    pub size: u32,
    /// First flat wire index covered by this register.
    pub start: u32,
}

impl Register {
    pub fn new(name: impl Into<String>, size: u32, start: u32) -> Self {
        Self {
            name: name.into(),
            size,
            start,
        }
    }

    /// Whether the flat index falls inside this register.
    pub fn contains(&self, flat: u32) -> bool {
        flat >= self.start && flat < self.start + self.size
    }
}

/// Resolve a flat wire index to `(register name, offset)` against a
/// declaration-ordered register list.
pub fn locate(registers: &[Register], flat: u32) -> Option<(&str, u32)> {
    registers
        .iter()
        .find(|r| r.contains(flat))
        .map(|r| (r.name.as_str(), flat - r.start))
}
