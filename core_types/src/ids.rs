//! Unique identifiers for simulated entities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a simulated process
///
/// Pids are assigned by the simulation in admission order, starting at 1.
/// A pid is never reused within a simulation, even after the process
/// finishes and is retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pid(u32);

impl Pid {
    /// Creates a pid from a raw value
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Process({})", self.0)
    }
}

/// Index of an exclusive resource in the fixed resource table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(u32);

impl ResourceId {
    /// Creates a resource id from a raw table index
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw table index
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource({})", self.0)
    }
}
