//! Deterministic single-clock executor.
//!
//! Every stimulus task is a [`Driver`] that is handed an immutable snapshot of
//! the bus once per rising edge and answers with the values it wants driven
//! for the next cycle. One call to [`Executor::tick`] is one clock cycle and
//! always runs the same phases:
//!
//! 1. the DUT settles its outputs for the inputs driven last cycle,
//! 2. the snapshot is sampled (monitors, golden model, scoreboard),
//! 3. drivers compute next-cycle assignments from that same snapshot,
//! 4. the DUT clocks on that same snapshot,
//! 5. driver assignments are applied and the cycle counter advances.
//!
//! Nothing runs in parallel and no component can observe a value assigned
//! later in the same cycle.

use std::fmt;

use crate::dut::Dut;
use crate::signal::{Assignments, Direction, SignalBus, SignalTable, Snapshot};

/// Result of one driver step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The driver wants to be ticked again.
    Pending,
    /// The driver has finished; it will not be ticked again.
    Done,
}

pub trait Driver {
    fn name(&self) -> &str;

    /// Called once at spawn time to drive initial values.
    fn start(&mut self, _next: &mut Assignments) {}

    /// Called once per rising edge with the sampled snapshot.
    fn on_tick(&mut self, snap: &Snapshot<'_>, next: &mut Assignments) -> Step;

    /// Called once when the task is cancelled. Must drive the signals this
    /// driver owns to their idle value.
    fn cancel(&mut self, next: &mut Assignments);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Done,
    Cancelled,
}

struct Task {
    driver: Box<dyn Driver>,
    state: TaskState,
}

/// Handle to a spawned driver, used to cancel or query it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle(usize);

pub struct Executor<D: Dut> {
    dut: D,
    table: SignalTable,
    bus: SignalBus,
    tasks: Vec<Task>,
}

impl<D: Dut> Executor<D> {
    pub fn new(dut: D, table: SignalTable) -> Self {
        let bus = SignalBus::new(&table);
        Self {
            dut,
            table,
            bus,
            tasks: Vec::new(),
        }
    }

    pub fn table(&self) -> &SignalTable {
        &self.table
    }

    pub fn cycle(&self) -> u64 {
        self.bus.cycle()
    }

    /// Tasks are ticked in spawn order. Initial values take effect for the
    /// coming cycle.
    pub fn spawn(&mut self, mut driver: Box<dyn Driver>) -> TaskHandle {
        let mut initial = Assignments::new();
        driver.start(&mut initial);
        self.drive(initial);
        self.tasks.push(Task {
            driver,
            state: TaskState::Pending,
        });
        TaskHandle(self.tasks.len() - 1)
    }

    pub fn state(&self, handle: TaskHandle) -> TaskState {
        self.tasks[handle.0].state
    }

    /// Cancels a pending task between two cycles. The driver's idle values
    /// take effect immediately and override whatever it had scheduled for the
    /// coming cycle. Done or already cancelled tasks are left alone.
    pub fn cancel(&mut self, handle: TaskHandle) {
        let task = &mut self.tasks[handle.0];
        if task.state != TaskState::Pending {
            return;
        }
        let mut idle = Assignments::new();
        task.driver.cancel(&mut idle);
        task.state = TaskState::Cancelled;
        tracing::debug!(task = task.driver.name(), cycle = self.bus.cycle(), "task cancelled");
        self.drive(idle);
    }

    /// Drives input signals directly, outside any task. Used for reset and
    /// for idle defaults.
    pub fn drive(&mut self, assignments: Assignments) {
        debug_assert!(assignments
            .iter()
            .all(|(s, _)| s.direction() == Direction::Input));
        self.bus.apply(assignments);
    }

    /// Runs one clock cycle. `sample` is called in the sampling phase with the
    /// snapshot the DUT is about to clock on; its return value is passed back.
    pub fn tick<F, R>(&mut self, sample: F) -> R
    where
        F: FnOnce(&Snapshot<'_>) -> R,
    {
        let mut outputs = Assignments::new();
        self.dut.settle(&self.bus.snapshot(), &mut outputs);
        debug_assert!(outputs
            .iter()
            .all(|(s, _)| s.direction() == Direction::Output));
        self.bus.apply(outputs);

        let snap = self.bus.snapshot();
        let result = sample(&snap);

        let mut next = Assignments::new();
        for task in self.tasks.iter_mut() {
            if task.state != TaskState::Pending {
                continue;
            }
            if task.driver.on_tick(&snap, &mut next) == Step::Done {
                task.state = TaskState::Done;
            }
        }
        self.dut.clock(&snap);

        self.bus.apply(next);
        self.bus.advance();
        result
    }

    /// Runs `n` cycles without sampling.
    pub fn clock_cycles(&mut self, n: u32) {
        for _ in 0..n {
            self.tick(|_| ());
        }
    }
}

impl<D: Dut> fmt::Debug for Executor<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("cycle", &self.bus.cycle())
            .field("tasks", &self.tasks.len())
            .finish()
    }
}
