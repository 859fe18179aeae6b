//! Behavioral DUT models for the integration tests, plus deliberately broken
//! variants that the harness must catch.
#![allow(dead_code)]

use std::collections::VecDeque;

use hstb::biased_mux::BiasedMuxPorts;
use hstb::commit_fifo::CommitFifoPorts;
use hstb::dut::Dut;
use hstb::fifo::FifoPorts;
use hstb::fwd_pipe::FwdPipePorts;
use hstb::signal::{Assignments, Snapshot};
use hstb::value::Word;

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

/// Small run sizes so each integration test stays fast.
pub fn small_config(seed: u64) -> hstb::config::HarnessConfig {
    let mut config = hstb::config::HarnessConfig::default();
    config.run.seed = seed;
    config.run.events = 2_000;
    config.run.packets = 100;
    config.run.drain_timeout = 10_000;
    config.run.max_cycles = 1_000_000;
    config
}

/// Plain synchronous FIFO. `data_out` shows the head entry; a read pops it.
#[derive(Debug)]
pub struct FifoModel {
    ports: FifoPorts,
    depth: usize,
    mem: VecDeque<Word>,
    /// Every `drop_every`-th write is acknowledged but not stored.
    drop_every: Option<u64>,
    /// Reports empty while one entry is still held.
    hold_last: bool,
    writes: u64,
}

impl FifoModel {
    pub fn new(ports: FifoPorts, depth: usize) -> Self {
        Self {
            ports,
            depth,
            mem: VecDeque::new(),
            drop_every: None,
            hold_last: false,
            writes: 0,
        }
    }

    pub fn dropping_every(mut self, n: u64) -> Self {
        self.drop_every = Some(n);
        self
    }

    pub fn holding_last(mut self) -> Self {
        self.hold_last = true;
        self
    }

    fn empty(&self) -> bool {
        if self.hold_last {
            self.mem.len() <= 1
        } else {
            self.mem.is_empty()
        }
    }
}

impl Dut for FifoModel {
    fn settle(&self, _inputs: &Snapshot<'_>, outputs: &mut Assignments) {
        let p = &self.ports;
        outputs.set_bool(p.full, self.mem.len() == self.depth);
        outputs.set_bool(p.empty, self.empty());
        outputs.set(p.data_out, self.mem.front().copied().unwrap_or(0));
    }

    fn clock(&mut self, s: &Snapshot<'_>) {
        let p = &self.ports;
        if s.high(p.rst) {
            self.mem.clear();
            self.writes = 0;
            return;
        }
        if s.high(p.rd_en) && s.low(p.empty) {
            self.mem.pop_front();
        }
        if s.high(p.wr_en) && s.low(p.full) {
            self.writes += 1;
            let dropped = self.drop_every.is_some_and(|n| self.writes % n == 0);
            if !dropped {
                self.mem.push_back(s.get(p.data_in));
            }
        }
    }
}

/// FIFO whose writes become visible on commit. A packet that overflowed on
/// any of its writes is rolled back at its commit.
#[derive(Debug)]
pub struct CommitFifoModel {
    ports: CommitFifoPorts,
    depth: usize,
    committed: VecDeque<Word>,
    staged: Vec<Word>,
    overflow: bool,
    /// Commits whatever was stored even after an overflow.
    ignore_overflow: bool,
}

impl CommitFifoModel {
    pub fn new(ports: CommitFifoPorts, depth: usize) -> Self {
        Self {
            ports,
            depth,
            committed: VecDeque::new(),
            staged: Vec::new(),
            overflow: false,
            ignore_overflow: false,
        }
    }

    pub fn ignoring_overflow(mut self) -> Self {
        self.ignore_overflow = true;
        self
    }

    fn occupancy(&self) -> usize {
        self.committed.len() + self.staged.len()
    }
}

impl Dut for CommitFifoModel {
    fn settle(&self, _inputs: &Snapshot<'_>, outputs: &mut Assignments) {
        let p = &self.ports.fifo;
        outputs.set_bool(p.full, self.occupancy() >= self.depth);
        outputs.set_bool(p.empty, self.committed.is_empty());
        outputs.set(p.data_out, self.committed.front().copied().unwrap_or(0));
    }

    fn clock(&mut self, s: &Snapshot<'_>) {
        let p = &self.ports.fifo;
        if s.high(p.rst) {
            self.committed.clear();
            self.staged.clear();
            self.overflow = false;
            return;
        }
        if s.high(p.rd_en) && s.low(p.empty) {
            self.committed.pop_front();
        }
        if s.high(p.wr_en) {
            if s.high(p.full) {
                self.overflow = true;
            } else {
                self.staged.push(s.get(p.data_in));
            }
            if s.high(self.ports.commit) {
                if !self.overflow || self.ignore_overflow {
                    self.committed.extend(self.staged.drain(..));
                }
                self.staged.clear();
                self.overflow = false;
            }
        }
    }
}

/// Packet mux with a one-entry output register. The lowest-numbered valid
/// source wins a free output; once granted, a source keeps the output until
/// its `last` word.
#[derive(Debug)]
pub struct BiasedMuxModel {
    ports: BiasedMuxPorts,
    out: Option<(Word, bool)>,
    locked: Option<usize>,
    /// Re-arbitrates on every word instead of holding the grant.
    no_lock: bool,
}

impl BiasedMuxModel {
    pub fn new(ports: BiasedMuxPorts) -> Self {
        Self {
            ports,
            out: None,
            locked: None,
            no_lock: false,
        }
    }

    pub fn without_packet_lock(mut self) -> Self {
        self.no_lock = true;
        self
    }

    fn grant(&self, s: &Snapshot<'_>) -> Option<usize> {
        self.locked.or_else(|| {
            self.ports
                .sources
                .iter()
                .position(|src| s.high(src.valid))
        })
    }

    fn can_load(&self, s: &Snapshot<'_>) -> bool {
        self.out.is_none() || s.high(self.ports.ready_out)
    }
}

impl Dut for BiasedMuxModel {
    fn settle(&self, s: &Snapshot<'_>, outputs: &mut Assignments) {
        let grant = if self.can_load(s) { self.grant(s) } else { None };
        for (i, src) in self.ports.sources.iter().enumerate() {
            outputs.set_bool(src.ready, grant == Some(i));
        }
        let (data, last) = self.out.unwrap_or((0, false));
        outputs.set_bool(self.ports.valid_out, self.out.is_some());
        outputs.set(self.ports.data_out, data);
        outputs.set_bool(self.ports.last_out, last);
    }

    fn clock(&mut self, s: &Snapshot<'_>) {
        if s.high(self.ports.rst) {
            self.out = None;
            self.locked = None;
            return;
        }
        if s.high(self.ports.valid_out) && s.high(self.ports.ready_out) {
            self.out = None;
        }
        for (i, src) in self.ports.sources.iter().enumerate() {
            if s.high(src.valid) && s.high(src.ready) {
                let last = s.high(src.last);
                self.out = Some((s.get(src.data), last));
                self.locked = if last || self.no_lock { None } else { Some(i) };
            }
        }
    }
}

/// Single register slice between `*_in` and `*_out`.
#[derive(Debug)]
pub struct FwdPipeModel {
    ports: FwdPipePorts,
    out: Option<Word>,
}

impl FwdPipeModel {
    pub fn new(ports: FwdPipePorts) -> Self {
        Self { ports, out: None }
    }
}

impl Dut for FwdPipeModel {
    fn settle(&self, s: &Snapshot<'_>, outputs: &mut Assignments) {
        let p = &self.ports;
        outputs.set_bool(p.ready_in, self.out.is_none() || s.high(p.ready_out));
        outputs.set_bool(p.valid_out, self.out.is_some());
        outputs.set(p.data_out, self.out.unwrap_or(0));
    }

    fn clock(&mut self, s: &Snapshot<'_>) {
        let p = &self.ports;
        if s.high(p.rst) {
            self.out = None;
            return;
        }
        if s.high(p.valid_out) && s.high(p.ready_out) {
            self.out = None;
        }
        if s.high(p.valid_in) && s.high(p.ready_in) {
            self.out = Some(s.get(p.data_in));
        }
    }
}

/// Packet mux that buffers every source separately and sends complete
/// packets highest source first. Packets leave whole and in per-source
/// order, but not in the order they completed.
#[derive(Debug)]
pub struct ReorderingMuxModel {
    ports: BiasedMuxPorts,
    partial: Vec<Vec<Word>>,
    complete: Vec<VecDeque<Vec<Word>>>,
    /// Packet on the output and the index of its current word.
    current: Option<(Vec<Word>, usize)>,
}

impl ReorderingMuxModel {
    /// Complete packets a source may have buffered before it is stalled.
    const SLOTS: usize = 2;

    pub fn new(ports: BiasedMuxPorts) -> Self {
        let n = ports.sources.len();
        Self {
            ports,
            partial: vec![Vec::new(); n],
            complete: vec![VecDeque::new(); n],
            current: None,
        }
    }
}

impl Dut for ReorderingMuxModel {
    fn settle(&self, _inputs: &Snapshot<'_>, outputs: &mut Assignments) {
        for (i, src) in self.ports.sources.iter().enumerate() {
            outputs.set_bool(src.ready, self.complete[i].len() < Self::SLOTS);
        }
        let (data, last) = match &self.current {
            Some((pkt, idx)) => (pkt[*idx], idx + 1 == pkt.len()),
            None => (0, false),
        };
        outputs.set_bool(self.ports.valid_out, self.current.is_some());
        outputs.set(self.ports.data_out, data);
        outputs.set_bool(self.ports.last_out, last);
    }

    fn clock(&mut self, s: &Snapshot<'_>) {
        if s.high(self.ports.rst) {
            self.partial.iter_mut().for_each(Vec::clear);
            self.complete.iter_mut().for_each(VecDeque::clear);
            self.current = None;
            return;
        }
        if s.high(self.ports.valid_out) && s.high(self.ports.ready_out) {
            let sent = match &mut self.current {
                Some((pkt, idx)) => {
                    *idx += 1;
                    *idx == pkt.len()
                }
                None => false,
            };
            if sent {
                self.current = None;
            }
        }
        for (i, src) in self.ports.sources.iter().enumerate() {
            if s.high(src.valid) && s.high(src.ready) {
                self.partial[i].push(s.get(src.data));
                if s.high(src.last) {
                    let pkt = std::mem::take(&mut self.partial[i]);
                    self.complete[i].push_back(pkt);
                }
            }
        }
        if self.current.is_none() {
            if let Some(q) = self.complete.iter_mut().rev().find(|q| !q.is_empty()) {
                self.current = q.pop_front().map(|pkt| (pkt, 0));
            }
        }
    }
}
