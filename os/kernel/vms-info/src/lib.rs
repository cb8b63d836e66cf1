//! # Simulator Configuration
//!
//! This crate is the single source of truth for the constants that shape the
//! emulated machine and for the way the process leaves when something goes
//! irrecoverably wrong.
//!
//! ## Modules
//!
//! ### Memory Layout ([`memory`])
//! Frame size, pool capacity, page-table geometry and the bit layout of a
//! page-table entry. Everything is a `const`; invalid combinations fail the
//! build through `const` assertions.
//!
//! ### Process Exit ([`exit`])
//! The three exit conditions of the simulator (bad address, out of memory,
//! initialization failure) and [`exit::terminate`], the only place that ends
//! the process.
//!
//! ## Address Geometry
//!
//! ```text
//! | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  L2   |  L1   |  L0   | Offset |
//! ```
//!
//! Three 9-bit indices select one of 512 entries at each level; the 12-bit
//! offset selects the byte inside the 4 KiB frame. That is 39 usable bits.

#![deny(unsafe_code)]

pub mod exit;
pub mod memory;
