//! Signal declarations, the per-cycle value store and the read/write views
//! components get of it.

use intmap::IntMap;
use std::fmt;

use crate::value::{Width, Word};

/// Which side drives a signal. `Input` signals are DUT inputs driven by the
/// testbench; `Output` signals are driven by the DUT and only sampled.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

/// Handle to a declared signal. Cheap to copy, like a simulator object handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Signal {
    pub(crate) handle: u64,
    width: Width,
    direction: Direction,
}

impl Signal {
    pub fn width(&self) -> Width {
        self.width
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// Declared signals of one DUT boundary and their names.
#[derive(Debug, Default, Clone)]
pub struct SignalTable {
    names: Vec<String>,
    signals: Vec<Signal>,
}

impl SignalTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&mut self, name: impl Into<String>, width: Width) -> Signal {
        self.declare(name.into(), width, Direction::Input)
    }

    pub fn output(&mut self, name: impl Into<String>, width: Width) -> Signal {
        self.declare(name.into(), width, Direction::Output)
    }

    fn declare(&mut self, name: String, width: Width, direction: Direction) -> Signal {
        let signal = Signal {
            handle: self.signals.len() as u64,
            width,
            direction,
        };
        self.names.push(name);
        self.signals.push(signal);
        signal
    }

    pub fn lookup(&self, name: &str) -> Option<Signal> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.signals[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = Signal> + '_ {
        self.signals.iter().copied()
    }

    pub fn inputs(&self) -> impl Iterator<Item = Signal> + '_ {
        self.iter().filter(|s| s.direction == Direction::Input)
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

/// Current value of every declared signal. Only the executor mutates the bus,
/// and only between phases; components see it through a [`Snapshot`].
pub struct SignalBus {
    values: IntMap<Word>,
    cycle: u64,
}

impl SignalBus {
    /// All signals start at 0.
    pub fn new(table: &SignalTable) -> Self {
        let mut values = IntMap::new();
        for signal in table.iter() {
            values.insert(signal.handle, 0);
        }
        Self { values, cycle: 0 }
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            cycle: self.cycle,
            values: &self.values,
        }
    }

    pub fn value(&self, signal: Signal) -> Word {
        self.values.get(signal.handle).copied().unwrap_or(0)
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub(crate) fn advance(&mut self) {
        self.cycle += 1;
    }

    /// Applies collected assignments in order, truncating to signal width.
    /// Later assignments to the same signal win.
    pub fn apply(&mut self, assignments: Assignments) {
        for (signal, value) in assignments.0 {
            self.values.insert(signal.handle, signal.width.truncate(value));
        }
    }
}

impl fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBus")
            .field("cycle", &self.cycle)
            .field("signals", &self.values.len())
            .finish()
    }
}

/// Immutable view of the bus for one phase of one clock cycle.
#[derive(Clone, Copy)]
pub struct Snapshot<'a> {
    cycle: u64,
    values: &'a IntMap<Word>,
}

impl<'a> Snapshot<'a> {
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    #[inline]
    pub fn get(&self, signal: Signal) -> Word {
        self.values.get(signal.handle).copied().unwrap_or(0)
    }

    #[inline]
    pub fn high(&self, signal: Signal) -> bool {
        self.get(signal) != 0
    }

    #[inline]
    pub fn low(&self, signal: Signal) -> bool {
        !self.high(signal)
    }
}

impl fmt::Debug for Snapshot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot").field("cycle", &self.cycle).finish()
    }
}

/// Next-cycle signal values a component intends to drive.
#[derive(Debug, Default, Clone)]
pub struct Assignments(Vec<(Signal, Word)>);

impl Assignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, signal: Signal, value: Word) {
        self.0.push((signal, value));
    }

    pub fn set_bool(&mut self, signal: Signal, value: bool) {
        self.set(signal, value as Word);
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Signal, Word)> {
        self.0.iter()
    }

    /// Value this batch drives onto `signal`, if any.
    pub fn get(&self, signal: Signal) -> Option<Word> {
        self.0
            .iter()
            .rev()
            .find(|(s, _)| *s == signal)
            .map(|(_, v)| *v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
