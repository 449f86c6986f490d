//! CPU emulation.
//!
//! This module implements the complete machine:
//! - 512 twenty-bit main-store cells and a fixed initial order store
//! - Counter, eight B-registers, the M:L accumulator, D, S, C and V
//! - A single-address order code with B-modification and a one-shot modifier

pub mod accumulator;
pub mod decode;
pub mod execute;
pub mod hooks;
pub mod initial;
pub mod memory;
pub mod registers;
pub mod status;

pub use decode::{Opcode, Order};
pub use execute::{Fault, Machine, MachineConfig, MachineError, Snapshot, StoreOp};
pub use hooks::{Observer, Output, Peripheral, Recorder, Tape, Unconnected, VecTape};
pub use memory::{MemoryError, ReadingStore, Store};
pub use registers::Registers;
pub use status::{Status, StopReason};
