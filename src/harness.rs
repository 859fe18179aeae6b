//! Run orchestration: reset, randomized stimulus up to a target, bounded
//! drain, verdict.

use std::fmt;

use num_format::{Locale, ToFormattedString};

use crate::config::RunParams;
use crate::dut::Dut;
use crate::executor::{Driver, Executor, TaskHandle};
use crate::golden::{Accepted, GoldenModel, ModelStats};
use crate::monitor::Monitor;
use crate::scoreboard::{Item, Leftover, Mismatch, Ordering, Scoreboard};
use crate::signal::{Assignments, Signal, SignalTable, Snapshot};

/// When the stimulus phase ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// This many input words accepted.
    Events(u64),
    /// This many packets resolved (released or aborted).
    Packets(u64),
}

impl Target {
    pub fn reached(&self, stats: &ModelStats) -> bool {
        match *self {
            Target::Events(n) => stats.accepted >= n,
            Target::Packets(n) => stats.resolved() >= n,
        }
    }
}

/// Input-side tasks are cancelled when the target is reached; output-side
/// tasks (ready, read enable) keep running until the DUT has drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Input,
    Output,
}

impl Side {
    pub fn task(self, driver: impl Driver + 'static) -> (Side, Box<dyn Driver>) {
        (self, Box::new(driver))
    }
}

/// One protocol variant wired up for the harness.
pub trait Testbench {
    type Item: Item;
    type Monitor: Monitor<Item = Self::Item>;

    fn name(&self) -> &str;

    fn table(&self) -> &SignalTable;

    fn params(&self) -> &RunParams;

    fn reset(&self) -> Signal;

    /// A fresh golden model for one run.
    fn golden(&self) -> GoldenModel;

    fn ordering(&self) -> Ordering {
        Ordering::InOrder
    }

    fn target(&self) -> Target;

    /// Drivers for one run, in the order they are ticked.
    fn stimulus(&self) -> Vec<(Side, Box<dyn Driver>)>;

    /// Input words the DUT accepts on this edge.
    fn accepted(&self, snap: &Snapshot<'_>, out: &mut Vec<Accepted>);

    /// Output monitor for one run.
    fn monitor(&self) -> Self::Monitor;

    /// The DUT holds nothing more to emit.
    fn idle(&self, snap: &Snapshot<'_>) -> bool;
}

/// Counters of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub name: String,
    pub cycles: u64,
    pub accepted: u64,
    pub released: u64,
    pub aborted: u64,
    pub dropped_words: u64,
    pub expected: u64,
    pub observed: u64,
    pub matched: u64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = |v: u64| v.to_formatted_string(&Locale::en);
        write!(
            f,
            "{}: cycles={}, accepted={}, released={}, aborted={}, dropped={}, expected={}, observed={}, matched={}",
            self.name,
            n(self.cycles),
            n(self.accepted),
            n(self.released),
            n(self.aborted),
            n(self.dropped_words),
            n(self.expected),
            n(self.observed),
            n(self.matched),
        )
    }
}

/// Why a run failed. Reported once, at the earliest point it was detected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    #[error("cycle {cycle}: {mismatch}")]
    Mismatch { cycle: u64, mismatch: Mismatch },

    #[error("stimulus stalled: target not reached after {cycles} cycles ({accepted} words accepted)")]
    StimulusStalled { cycles: u64, accepted: u64 },

    #[error("drain timeout: DUT not idle after {cycles} cycles, {expected} expected items unmatched")]
    DrainTimeout { cycles: u64, expected: usize },

    #[error("drain incomplete: {expected} expected items unmatched, {backlog} observed words never delimited")]
    DrainIncomplete { expected: usize, backlog: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass(RunSummary),
    Fail(Failure, RunSummary),
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Pass(_))
    }

    pub fn summary(&self) -> &RunSummary {
        match self {
            Verdict::Pass(s) | Verdict::Fail(_, s) => s,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Verdict::Pass(_) => None,
            Verdict::Fail(f, _) => Some(f),
        }
    }

    pub fn into_result(self) -> Result<RunSummary, Failure> {
        match self {
            Verdict::Pass(s) => Ok(s),
            Verdict::Fail(f, _) => Err(f),
        }
    }
}

/// Per-run state that the sampling phase mutates.
struct Checker<B: Testbench> {
    golden: GoldenModel,
    monitor: B::Monitor,
    scoreboard: Scoreboard<B::Item>,
    accepted: Vec<Accepted>,
}

impl<B: Testbench> Checker<B> {
    /// Sampling phase: feed accepted words to the golden model first, then
    /// compare whatever the monitor saw on the same edge.
    fn sample(&mut self, bench: &B, snap: &Snapshot<'_>) -> Result<(), Mismatch> {
        bench.accepted(snap, &mut self.accepted);
        for ev in self.accepted.drain(..) {
            if let Some(release) = self.golden.on_accept(ev) {
                for item in <B::Item as Item>::split(release.words) {
                    self.scoreboard.add_exp(release.source, item);
                }
            }
        }
        match self.monitor.sample(snap) {
            Some(item) => self.scoreboard.add_recv(item),
            None => Ok(()),
        }
    }

    fn summary(&self, name: &str, cycles: u64) -> RunSummary {
        let stats = self.golden.stats();
        RunSummary {
            name: name.to_string(),
            cycles,
            accepted: stats.accepted,
            released: stats.released,
            aborted: stats.aborted,
            dropped_words: stats.dropped_words,
            expected: self.scoreboard.expected(),
            observed: self.monitor.observed(),
            matched: self.scoreboard.matched(),
        }
    }
}

/// Runs one randomized conformance test of `bench` against `dut`.
pub fn run<B: Testbench, D: Dut>(bench: &B, dut: D) -> Verdict {
    let params = bench.params().clone();
    let mut ex = Executor::new(dut, bench.table().clone());
    tracing::info!(test = bench.name(), seed = params.seed, target = ?bench.target(), "starting run");

    reset(&mut ex, bench.reset(), &params);

    let mut inputs: Vec<TaskHandle> = Vec::new();
    for (side, driver) in bench.stimulus() {
        let handle = ex.spawn(driver);
        if side == Side::Input {
            inputs.push(handle);
        }
    }

    let mut checker = Checker::<B> {
        golden: bench.golden(),
        monitor: bench.monitor(),
        scoreboard: Scoreboard::new(bench.ordering()),
        accepted: Vec::new(),
    };
    let start = ex.cycle();
    let elapsed = |ex: &Executor<D>| ex.cycle() - start;
    let fail = |failure: Failure, checker: &Checker<B>, cycles: u64| {
        tracing::error!(test = bench.name(), %failure, "run failed");
        Verdict::Fail(failure, checker.summary(bench.name(), cycles))
    };

    // stimulus
    let target = bench.target();
    while !target.reached(&checker.golden.stats()) {
        if elapsed(&ex) >= params.max_cycles {
            let failure = Failure::StimulusStalled {
                cycles: elapsed(&ex),
                accepted: checker.golden.stats().accepted,
            };
            return fail(failure, &checker, elapsed(&ex));
        }
        let cycle = ex.cycle();
        if let Err(mismatch) = ex.tick(|snap| checker.sample(bench, snap)) {
            return fail(Failure::Mismatch { cycle, mismatch }, &checker, elapsed(&ex));
        }
    }
    for handle in inputs {
        ex.cancel(handle);
    }
    let dropped = checker.golden.discard_pending();
    if dropped > 0 {
        tracing::warn!(test = bench.name(), words = dropped, "discarded unresolved words at end of stimulus");
    }

    // drain
    for _ in 0..params.drain_settle_cycles {
        let cycle = ex.cycle();
        if let Err(mismatch) = ex.tick(|snap| checker.sample(bench, snap)) {
            return fail(Failure::Mismatch { cycle, mismatch }, &checker, elapsed(&ex));
        }
    }
    let drain_start = ex.cycle();
    loop {
        let cycle = ex.cycle();
        if cycle - drain_start >= params.drain_timeout {
            tracing::warn!(test = bench.name(), cycles = params.drain_timeout, "DUT did not drain");
            let failure = Failure::DrainTimeout {
                cycles: params.drain_timeout,
                expected: checker.scoreboard.pending(),
            };
            return fail(failure, &checker, elapsed(&ex));
        }
        let sampled = ex.tick(|snap| -> Result<bool, Mismatch> {
            checker.sample(bench, snap)?;
            Ok(bench.idle(snap) && checker.golden.drain_complete())
        });
        match sampled {
            Ok(true) => break,
            Ok(false) => {}
            Err(mismatch) => {
                return fail(Failure::Mismatch { cycle, mismatch }, &checker, elapsed(&ex));
            }
        }
    }

    let cycles = elapsed(&ex);
    if let Err(leftover) = checker.scoreboard.finalize(checker.monitor.backlog()) {
        let Leftover { expected, backlog } = leftover;
        return fail(Failure::DrainIncomplete { expected, backlog }, &checker, cycles);
    }
    let summary = checker.summary(bench.name(), cycles);
    tracing::info!(%summary, "run passed");
    Verdict::Pass(summary)
}

/// All inputs low, reset high for `reset_cycles` edges, then two edges with
/// reset released.
fn reset<D: Dut>(ex: &mut Executor<D>, rst: Signal, params: &RunParams) {
    let mut idle = Assignments::new();
    for signal in ex.table().inputs() {
        idle.set(signal, 0);
    }
    idle.set(rst, 1);
    ex.drive(idle);
    ex.clock_cycles(params.reset_cycles);
    let mut release = Assignments::new();
    release.set(rst, 0);
    ex.drive(release);
    ex.clock_cycles(2);
}
