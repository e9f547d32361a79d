//! # Core Types
//!
//! This crate defines the fundamental types used throughout Quanta.
//!
//! ## Philosophy
//!
//! Core types are designed with these principles:
//! - **Explicit over implicit**: A tick count, a priority, and a process id
//!   are different things and cannot be confused.
//! - **Determinism first**: Identifiers are assigned by the simulation in
//!   admission order; nothing here draws on randomness or wall-clock time.
//! - **Type safety first**: The type system prevents misuse at compile time.
//!
//! ## Key Types
//!
//! - [`Pid`]: Unique identifier for a simulated process
//! - [`ResourceId`]: Index of an exclusive resource in the resource table
//! - [`Priority`]: Scheduling priority (higher values are more important)
//! - [`Ticks`]: A count of discrete simulated time units

pub mod ids;
pub mod priority;
pub mod time;

pub use ids::{Pid, ResourceId};
pub use priority::Priority;
pub use time::Ticks;
