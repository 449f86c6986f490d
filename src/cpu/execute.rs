//! Execution engine.
//!
//! Implements the fetch-modify-decode-execute cycle and every order.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{event, Level};

use crate::cpu::accumulator::{self, Shift, ShiftOverflow};
use crate::cpu::decode::{self, Opcode, Order, ADDRESS_WIDTH};
use crate::cpu::hooks::{Observer, Output, Peripheral, Tape, Unconnected, TAPE_CODE_MASK};
use crate::cpu::initial::initial_store;
use crate::cpu::memory::{MemoryError, ReadingStore, Store};
use crate::cpu::registers::{Registers, B_REGISTERS};
use crate::cpu::status::{Status, StopReason};
use crate::word::bits;
use crate::word::Word;

/// Host-settable switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// When set, a stop-check order with a non-zero register field stops.
    pub optional_stop: bool,
}

/// How a value is combined into a store cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// The cell takes the value.
    Assign,
    /// The cell takes its signed reading plus the value.
    Add,
    /// The cell takes its signed reading minus the value.
    Subtract,
}

/// What the engine still has to do once an order's handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    None,
    /// Put back the status saved before the order.
    Preserve,
    Output(i64),
    Connect { channel: u8, frequency: i64 },
    Disconnect(u8),
}

/// The machine: registers, stores, status and attached collaborators.
pub struct Machine {
    /// Registers.
    pub regs: Registers,
    /// Main store.
    pub store: Store,
    /// Store orders are currently fetched from.
    pub reading: ReadingStore,
    /// Status left by the last order.
    pub status: Status,
    /// Host switches.
    pub config: MachineConfig,
    initial: Vec<Word>,
    orders_executed: u64,
    last_order: Option<Order>,
    tape: Box<dyn Tape>,
    output: Box<dyn Output>,
    peripheral: Box<dyn Peripheral>,
    observer: Box<dyn Observer>,
}

impl Machine {
    /// A machine at power-on: counter 0, fetching from the initial orders,
    /// nothing attached.
    pub fn new(config: MachineConfig) -> Self {
        Self {
            regs: Registers::new(),
            store: Store::new(),
            reading: ReadingStore::Bootstrap,
            status: Status::default(),
            config,
            initial: initial_store(),
            orders_executed: 0,
            last_order: None,
            tape: Box::new(Unconnected),
            output: Box::new(Unconnected),
            peripheral: Box::new(Unconnected),
            observer: Box::new(Unconnected),
        }
    }

    pub fn with_tape(mut self, tape: impl Tape + 'static) -> Self {
        self.tape = Box::new(tape);
        self
    }

    pub fn with_output(mut self, output: impl Output + 'static) -> Self {
        self.output = Box::new(output);
        self
    }

    pub fn with_peripheral(mut self, peripheral: impl Peripheral + 'static) -> Self {
        self.peripheral = Box::new(peripheral);
        self
    }

    pub fn with_observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Put the registers, status and reading store back to power-on.
    /// The main store keeps its contents.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.reading = ReadingStore::Bootstrap;
        self.status = Status::default();
        self.orders_executed = 0;
        self.last_order = None;
    }

    /// Reset and zero the main store, as after switching the machine on.
    pub fn power_on(&mut self) {
        self.reset();
        self.store.clear();
    }

    /// Copy a program into the main store at `origin`, switch fetching to
    /// the main store and point the counter at `origin`.
    pub fn load_program(&mut self, origin: u16, program: &[u64]) -> Result<(), MemoryError> {
        self.store.load_program(origin as usize, program)?;
        self.reading = ReadingStore::Main;
        self.regs.jump(origin);
        self.status = Status::default();
        Ok(())
    }

    /// The initial order store.
    pub fn initial_orders(&self) -> &[Word] {
        &self.initial
    }

    /// Read a main-store cell, passing it through S.
    pub fn read_store(&mut self, addr: u16) -> Result<Word, Fault> {
        let cell = *self
            .store
            .cell(addr as usize)
            .map_err(|_| Fault::AddressOutOfRange(addr))?;
        self.regs.s.assign(&cell, None);
        Ok(cell)
    }

    /// Combine `value` into a main-store cell. The word written passes
    /// through S, so S keeps its overflow digit after an add or subtract.
    ///
    /// Returns the cell's previous contents.
    pub fn write_store(&mut self, addr: u16, value: &Word, op: StoreOp) -> Result<Word, Fault> {
        let cell = self
            .store
            .cell_mut(addr as usize)
            .map_err(|_| Fault::AddressOutOfRange(addr))?;
        let previous = *cell;
        match op {
            StoreOp::Assign => self.regs.s.assign(value, None),
            StoreOp::Add => {
                self.regs.s.assign(&previous, None);
                self.regs.s.add(value);
            }
            StoreOp::Subtract => {
                self.regs.s.assign(&previous, None);
                self.regs.s.subtract(value);
            }
        }
        cell.assign(&self.regs.s, None);
        Ok(previous)
    }

    /// Obey one order.
    ///
    /// Faults inside the order become stop reasons. An error is returned
    /// only when no order was obeyed: the machine is stopped fatally, or
    /// the counter points outside the reading store.
    pub fn execute_next_order(&mut self) -> Result<Order, MachineError> {
        self.step().map(|(order, _)| order)
    }

    /// Obey orders until one raises a stop that should pause the host or
    /// `limit` orders have run.
    ///
    /// Returns the number of orders obeyed. If the counter leaves the
    /// reading store the error from that fetch is returned instead.
    pub fn run(&mut self, limit: u64) -> Result<u64, MachineError> {
        if let Some(reason) = self.fatal_stop() {
            return Err(MachineError::Stopped(reason));
        }

        let mut executed = 0;
        while executed < limit {
            let (_, raised) = self.step()?;
            executed += 1;
            if raised.is_some_and(StopReason::halts_run) {
                break;
            }
        }

        Ok(executed)
    }

    fn fatal_stop(&self) -> Option<StopReason> {
        self.status.stop_reason.filter(|reason| reason.is_fatal())
    }

    fn fetch(&self, counter: usize) -> Option<Word> {
        match self.reading {
            ReadingStore::Bootstrap => self.initial.get(counter).copied(),
            ReadingStore::Main => self.store.cell(counter).ok().copied(),
        }
    }

    /// One full cycle. Also reports the stop reason the order raised.
    fn step(&mut self) -> Result<(Order, Option<StopReason>), MachineError> {
        if let Some(reason) = self.fatal_stop() {
            return Err(MachineError::Stopped(reason));
        }

        let saved = self.status;
        self.status = Status::default();

        let counter = self.regs.counter.raw() as u16;
        let Some(word) = self.fetch(counter as usize) else {
            let fault = Fault::CounterOutOfRange {
                counter,
                store: self.reading,
            };
            event!(Level::WARN, %fault, "cannot fetch order");
            self.status.stop_reason = Some(fault.stop_reason());
            self.observer.stopped(StopReason::Absolute);
            return Err(MachineError::Stopped(StopReason::Absolute));
        };

        self.regs.s.assign(&word, None);
        self.regs.c.assign(&word, None);
        if let Some(modifier) = self.regs.apply_modifier() {
            event!(Level::DEBUG, modifier, "modifier consumed");
        }
        let order = decode::decode(self.regs.c.raw());
        self.regs.advance_counter();

        let effect = match self.dispatch(order, saved) {
            Ok(effect) => effect,
            Err(fault) => {
                event!(Level::WARN, counter, %order, %fault, "order faulted");
                self.status.stop_reason = Some(fault.stop_reason());
                Effect::None
            }
        };

        let raised = if effect == Effect::Preserve {
            self.status = saved;
            None
        } else {
            self.status.stop_reason
        };

        self.orders_executed += 1;
        self.last_order = Some(order);
        event!(
            Level::TRACE,
            counter,
            %order,
            accumulator = self.regs.accumulator(),
            "order executed"
        );

        self.observer.order_executed(&order, &self.regs, &self.status);
        match effect {
            Effect::Output(value) => self.output.output(value),
            Effect::Connect { channel, frequency } => self.peripheral.connect(channel, frequency),
            Effect::Disconnect(channel) => self.peripheral.disconnect(channel),
            Effect::None | Effect::Preserve => {}
        }
        if let Some(reason) = raised {
            event!(Level::INFO, counter, %reason, "machine stopped");
            self.observer.stopped(reason);
        }

        Ok((order, raised))
    }

    /// Obey a decoded order.
    fn dispatch(&mut self, order: Order, saved: Status) -> Result<Effect, Fault> {
        let Order {
            opcode,
            register,
            address: n,
        } = order;
        let b = register as usize % B_REGISTERS;
        let addr = self.regs.effective_address(register, n);

        match opcode {
            // ==================== B-registers ====================
            Opcode::STOP => return Ok(self.stop_check(register, n)),

            Opcode::STORE_B => {
                let value = self.regs.b[b];
                self.write_store(n, &value, StoreOp::Assign)?;
            }

            Opcode::LOAD_B => {
                let cell = self.read_store(n)?;
                self.regs.b[b].assign(&cell, None);
            }

            Opcode::ADD_B => {
                let cell = self.read_store(n)?;
                self.regs.b[b].add(&cell);
            }

            Opcode::SUB_B => {
                let cell = self.read_store(n)?;
                self.regs.b[b].subtract(&cell);
            }

            Opcode::SET_B => self.regs.b[b].set(n as i64),
            Opcode::INC_B => self.regs.b[b].add(n),
            Opcode::DEC_B => self.regs.b[b].subtract(n),

            Opcode::AND_B => {
                let cell = self.read_store(n)?;
                self.regs.b[b].and(&cell);
            }

            Opcode::EXCHANGE_B => {
                let old = self.regs.b[b];
                let cell = self.write_store(n, &old, StoreOp::Assign)?;
                self.regs.b[b].assign(&cell, None);
            }

            Opcode::READ_TAPE => {
                let code = self.tape.read() & TAPE_CODE_MASK;
                let word = Word::unsigned(5).with_raw(code as u64);
                self.write_store(n, &word, StoreOp::Assign)?;
                self.regs.b[b].assign(&word, None);
            }

            Opcode::JUMP_B_POSITIVE => {
                if self.regs.b[b].to_number_as(true) > 0 {
                    self.regs.jump(n);
                }
            }

            Opcode::JUMP_B_NONZERO => {
                if !self.regs.b[b].is_zero() {
                    self.regs.jump(n);
                }
            }

            Opcode::COUNT_1 | Opcode::COUNT_2 => {
                let step: i64 = if opcode == Opcode::COUNT_1 { 1 } else { 2 };
                self.regs.b[b].subtract(step);
                if !self.regs.b[b].is_zero() {
                    self.regs.jump(n);
                }
            }

            // ==================== Modifiers ====================
            Opcode::MODIFY => {
                self.regs.set_modifier(addr as u64);
                event!(Level::DEBUG, modifier = addr, "modifier set");
                return Ok(Effect::Preserve);
            }

            Opcode::MODIFY_FROM_STORE => {
                let cell = self.read_store(addr)?;
                self.regs.set_modifier(cell.raw());
                event!(Level::DEBUG, modifier = cell.raw(), "modifier set from store");
                return Ok(Effect::Preserve);
            }

            // ==================== Control ====================
            Opcode::OUTPUT => {
                let cell = self.read_store(addr)?;
                return Ok(Effect::Output(cell.to_number_as(true)));
            }

            Opcode::JUMP_NEGATIVE => {
                if self.regs.accumulator() < 0 {
                    self.regs.jump(addr);
                }
            }

            Opcode::JUMP_POSITIVE => {
                if self.regs.accumulator() > 0 {
                    self.regs.jump(addr);
                }
            }

            Opcode::JUMP_NONZERO => {
                if self.regs.accumulator() != 0 {
                    self.regs.jump(addr);
                }
            }

            Opcode::JUMP_UNDERFLOW => {
                if saved.underflowed {
                    self.regs.jump(addr);
                }
            }

            Opcode::JUMP_OVERFLOW => {
                if saved.overflowed {
                    self.regs.jump(addr);
                }
            }

            Opcode::JUMP => self.regs.jump(addr),

            Opcode::JUMP_SWITCH_STORE => {
                self.reading = self.reading.toggled();
                event!(Level::DEBUG, reading = ?self.reading, target = addr, "switched reading store");
                self.regs.jump(addr);
            }

            Opcode::WIRE_CONNECT => {
                let frequency = self.read_store(addr)?.to_number_as(true);
                return Ok(Effect::Connect {
                    channel: (addr & 1) as u8,
                    frequency,
                });
            }

            Opcode::WIRE_DISCONNECT => return Ok(Effect::Disconnect((addr & 1) as u8)),

            // ==================== Accumulator ====================
            Opcode::STORE_L => {
                let l = self.regs.l;
                self.write_store(addr, &l, StoreOp::Assign)?;
            }

            Opcode::LOAD_ACCUMULATOR => {
                let cell = self.read_store(addr)?;
                accumulator::set_value(
                    &mut self.regs.m,
                    &mut self.regs.l,
                    cell.to_number_as(true) as i128,
                );
            }

            Opcode::ADD_DOUBLE => {
                let cell = self.read_store(addr)?;
                let overflowed = accumulator::add_double(&mut self.regs.m, &mut self.regs.l, &cell);
                self.status.record_recoverable(overflowed, false);
            }

            Opcode::SUB_DOUBLE => {
                let cell = self.read_store(addr)?;
                let underflowed =
                    accumulator::subtract_double(&mut self.regs.m, &mut self.regs.l, &cell);
                self.status.record_recoverable(false, underflowed);
            }

            Opcode::NORMALISE | Opcode::DIVIDE => return Err(Fault::Unspecified(opcode)),

            Opcode::ARITH_LEFT..=Opcode::LOGICAL_RIGHT => {
                let kind = Shift::from_opcode(opcode).ok_or(Fault::InvalidOpcode(opcode))?;
                let count = bits::interpret_signed(addr as u64, ADDRESS_WIDTH);
                match accumulator::shift(&mut self.regs.m, &mut self.regs.l, kind, count) {
                    Some(ShiftOverflow::Recoverable) => self.status.record_recoverable(true, false),
                    Some(ShiftOverflow::Irrecoverable) => self.status.record_irrecoverable(),
                    None => {}
                }
            }

            Opcode::CLEAR_ACCUMULATOR => {
                self.read_store(addr)?;
                self.regs.m.clear();
                self.regs.l.clear();
            }

            Opcode::LOAD_M | Opcode::REPLACE_M => {
                let cell = self.read_store(addr)?;
                self.regs.m.assign(&cell, None);
            }

            Opcode::ADD_M | Opcode::SUB_M => {
                let operand = self.read_store(addr)?.to_number_as(true);
                let before = self.regs.m.to_number();
                let result = if opcode == Opcode::ADD_M {
                    before + operand
                } else {
                    before - operand
                };
                self.regs.m.set(result);
                if self.regs.m.has_overflowed() {
                    self.status.record_recoverable(result > 0, result < 0);
                }
            }

            Opcode::ADD_TO_STORE | Opcode::SUB_FROM_STORE => {
                let op = if opcode == Opcode::ADD_TO_STORE {
                    StoreOp::Add
                } else {
                    StoreOp::Subtract
                };
                let m = self.regs.m;
                self.write_store(addr, &m, op)?;
                if self.regs.s.has_overflowed() {
                    self.status.record_irrecoverable();
                }
            }

            Opcode::XOR_M => {
                let cell = self.read_store(addr)?;
                self.regs.m.xor(&cell);
            }

            Opcode::AND_M => {
                let cell = self.read_store(addr)?;
                self.regs.m.and(&cell);
            }

            Opcode::EXCHANGE_M => {
                let m = self.regs.m;
                let cell = self.write_store(addr, &m, StoreOp::Assign)?;
                if self.regs.s.has_overflowed() {
                    self.status.record_irrecoverable();
                }
                self.regs.m.assign(&cell, None);
            }

            // ==================== D and V ====================
            Opcode::STORE_D => {
                let d = self.regs.d;
                self.write_store(addr, &d, StoreOp::Assign)?;
            }

            Opcode::LOAD_D => {
                let cell = self.read_store(addr)?;
                self.regs.d.assign(&cell, None);
            }

            Opcode::ADD_D | Opcode::SUB_D => {
                let operand = self.read_store(addr)?.to_number_as(true);
                let before = self.regs.d.to_number();
                let result = if opcode == Opcode::ADD_D {
                    before + operand
                } else {
                    before - operand
                };
                self.regs.d.set(result);
                if self.regs.d.has_overflowed() {
                    self.status.record_recoverable(result > 0, result < 0);
                }
            }

            Opcode::SET_D => self.regs.d.set(addr as i64),

            Opcode::MULTIPLY => {
                let cell = self.read_store(addr)?;
                let overflowed = accumulator::multiply(
                    &mut self.regs.m,
                    &mut self.regs.l,
                    &cell,
                    &self.regs.d,
                );
                self.status.record_recoverable(overflowed, false);
            }

            Opcode::EXCHANGE_M_D => self.regs.m.swap(&mut self.regs.d),

            Opcode::LOAD_V => {
                let cell = self.read_store(addr)?;
                self.regs.v.assign(&cell, None);
            }

            _ => return Err(Fault::InvalidOpcode(opcode)),
        }

        Ok(Effect::None)
    }

    /// Order 0. With no register, address 0 is an absolute stop and any
    /// other address a normal stop. With a register it stops only when the
    /// optional-stop switch is on, and otherwise leaves the status alone.
    fn stop_check(&mut self, register: u8, n: u16) -> Effect {
        let reason = match (register, n) {
            (0, 0) => StopReason::Absolute,
            (0, _) => StopReason::Normal,
            _ if self.config.optional_stop => StopReason::Normal,
            _ => return Effect::Preserve,
        };
        self.status.stop_reason = Some(reason);
        Effect::None
    }

    /// Orders obeyed since power-on or the last reset.
    pub fn orders_executed(&self) -> u64 {
        self.orders_executed
    }

    /// The most recently obeyed order.
    pub fn last_order(&self) -> Option<Order> {
        self.last_order
    }

    /// Whether the machine will accept another order.
    pub fn is_running(&self) -> bool {
        self.fatal_stop().is_none()
    }

    /// A serialisable copy of the visible state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            counter: self.regs.counter.raw() as u16,
            reading: self.reading,
            b: std::array::from_fn(|i| self.regs.b[i].raw() as u16),
            m: self.regs.m.to_number(),
            l: self.regs.l.raw(),
            accumulator: self.regs.accumulator(),
            d: self.regs.d.to_number(),
            s: self.regs.s.to_number(),
            c: decode::decode(self.regs.c.raw()),
            v: self.regs.v.to_number(),
            modifier: self.regs.modifier.map(|m| m.raw() as u16),
            status: self.status,
            orders_executed: self.orders_executed,
            store: self.store.non_zero(),
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(MachineConfig::default())
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("reading", &self.reading)
            .field("status", &self.status)
            .field("orders_executed", &self.orders_executed)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Serialisable view of a machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub counter: u16,
    pub reading: ReadingStore,
    pub b: [u16; B_REGISTERS],
    pub m: i64,
    pub l: u64,
    pub accumulator: i64,
    pub d: i64,
    pub s: i64,
    pub c: Order,
    pub v: i64,
    pub modifier: Option<u16>,
    pub status: Status,
    pub orders_executed: u64,
    /// Non-zero main-store cells as (address, word).
    pub store: Vec<(usize, u64)>,
}

/// A fault raised while obeying an order. Turned into a stop reason at
/// the end of the order; never seen by the host as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("store address {0} outside the main store")]
    AddressOutOfRange(u16),

    #[error("counter {counter} outside the {store:?} store")]
    CounterOutOfRange { counter: u16, store: ReadingStore },

    #[error("invalid opcode {0}")]
    InvalidOpcode(u8),

    #[error("opcode {0} has no specified behaviour")]
    Unspecified(u8),
}

impl Fault {
    /// The stop this fault leaves the machine in.
    pub fn stop_reason(&self) -> StopReason {
        match self {
            Fault::Unspecified(_) => StopReason::Unspecified,
            _ => StopReason::Absolute,
        }
    }
}

/// Errors returned to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("machine stopped: {0}")]
    Stopped(StopReason),
}
