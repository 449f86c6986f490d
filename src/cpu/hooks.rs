//! Collaborators the machine drives: the tape reader, the output channel,
//! the wire (audio) peripheral and an observer of each order.
//!
//! Every one is injected into [`Machine`](crate::cpu::Machine) as a boxed
//! trait object. [`Unconnected`] does nothing, [`VecTape`] plays a fixed
//! code sequence and [`Recorder`] logs every call for tests.

use std::cell::{Ref, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::cpu::decode::Order;
use crate::cpu::registers::Registers;
use crate::cpu::status::{Status, StopReason};

/// Mask for a five-bit tape code.
pub const TAPE_CODE_MASK: u8 = 0x1F;

/// A paper-tape reader.
pub trait Tape {
    /// The next five-bit code, or 0 once the tape has run out.
    fn read(&mut self) -> u8;
}

/// Receives values emitted by order 20.
pub trait Output {
    fn output(&mut self, value: i64);
}

/// The wire output driven by orders 28 and 29.
pub trait Peripheral {
    fn connect(&mut self, channel: u8, frequency: i64);
    fn disconnect(&mut self, channel: u8);
}

/// Watches the machine from outside.
pub trait Observer {
    /// Called after every order with the state it left behind.
    fn order_executed(&mut self, _order: &Order, _regs: &Registers, _status: &Status) {}

    /// Called when an order raises a stop reason.
    fn stopped(&mut self, _reason: StopReason) {}
}

/// A collaborator with nothing attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconnected;

impl Tape for Unconnected {
    fn read(&mut self) -> u8 {
        0
    }
}

impl Output for Unconnected {
    fn output(&mut self, _value: i64) {}
}

impl Peripheral for Unconnected {
    fn connect(&mut self, _channel: u8, _frequency: i64) {}
    fn disconnect(&mut self, _channel: u8) {}
}

impl Observer for Unconnected {}

/// A tape holding a fixed list of codes.
#[derive(Debug, Clone, Default)]
pub struct VecTape {
    codes: VecDeque<u8>,
}

impl VecTape {
    pub fn new(codes: impl IntoIterator<Item = u8>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }

    /// Codes not yet read.
    pub fn remaining(&self) -> usize {
        self.codes.len()
    }
}

impl Tape for VecTape {
    fn read(&mut self) -> u8 {
        self.codes.pop_front().map_or(0, |code| code & TAPE_CODE_MASK)
    }
}

/// Calls seen by a [`Recorder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Log {
    pub outputs: Vec<i64>,
    pub connects: Vec<(u8, i64)>,
    pub disconnects: Vec<u8>,
    pub orders: Vec<Order>,
    pub stops: Vec<StopReason>,
}

/// A test double for every collaborator.
///
/// Clones share one log, so keep a clone and hand the others to the
/// machine.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: Rc<RefCell<Log>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Ref<'_, Log> {
        self.log.borrow()
    }
}

impl Output for Recorder {
    fn output(&mut self, value: i64) {
        self.log.borrow_mut().outputs.push(value);
    }
}

impl Peripheral for Recorder {
    fn connect(&mut self, channel: u8, frequency: i64) {
        self.log.borrow_mut().connects.push((channel, frequency));
    }

    fn disconnect(&mut self, channel: u8) {
        self.log.borrow_mut().disconnects.push(channel);
    }
}

impl Observer for Recorder {
    fn order_executed(&mut self, order: &Order, _regs: &Registers, _status: &Status) {
        self.log.borrow_mut().orders.push(*order);
    }

    fn stopped(&mut self, reason: StopReason) {
        self.log.borrow_mut().stops.push(reason);
    }
}
