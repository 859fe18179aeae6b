//! Commit FIFO: a FIFO whose writes become readable only once the packet's
//! `commit` word is written. A packet that saw `full` on any of its writes
//! is dropped by the DUT when it commits.

use crate::config::{HarnessConfig, RunParams};
use crate::error::ConfigError;
use crate::executor::Driver;
use crate::fifo::FifoPorts;
use crate::golden::{Accepted, GoldenModel};
use crate::harness::{Side, Target, Testbench};
use crate::monitor::WordMonitor;
use crate::signal::{Signal, SignalTable, Snapshot};
use crate::stimulus::{derive_seed, BitSequence, CommitWriter};
use crate::value::{Width, Word};

#[derive(Debug, Clone, Copy)]
pub struct CommitFifoPorts {
    pub fifo: FifoPorts,
    pub commit: Signal,
}

impl CommitFifoPorts {
    pub fn declare(table: &mut SignalTable, width: Width) -> Self {
        let fifo = FifoPorts::declare(table, width);
        Self {
            fifo,
            commit: table.input("commit", Width::BIT),
        }
    }
}

pub struct CommitFifoTb {
    table: SignalTable,
    pub ports: CommitFifoPorts,
    width: Width,
    params: RunParams,
}

impl CommitFifoTb {
    /// Fails if `config` does not validate.
    pub fn new(config: &HarnessConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut table = SignalTable::new();
        let width = config.dut.width()?;
        let ports = CommitFifoPorts::declare(&mut table, width);
        Ok(Self {
            table,
            ports,
            width,
            params: config.run.clone(),
        })
    }
}

impl Testbench for CommitFifoTb {
    type Item = Word;
    type Monitor = WordMonitor;

    fn name(&self) -> &str {
        "commit_fifo"
    }

    fn table(&self) -> &SignalTable {
        &self.table
    }

    fn params(&self) -> &RunParams {
        &self.params
    }

    fn reset(&self) -> Signal {
        self.ports.fifo.rst
    }

    fn golden(&self) -> GoldenModel {
        GoldenModel::transactional()
    }

    fn target(&self) -> Target {
        Target::Packets(self.params.packets)
    }

    fn stimulus(&self) -> Vec<(Side, Box<dyn Driver>)> {
        let seed = self.params.seed;
        let p = &self.ports;
        vec![
            Side::Input.task(BitSequence::random(
                "wr_en",
                p.fifo.wr_en,
                derive_seed(seed, 0),
                self.params.valid_probability,
            )),
            Side::Input.task(CommitWriter::new(
                p.fifo.wr_en,
                p.fifo.data_in,
                p.commit,
                derive_seed(seed, 1),
                self.width,
                self.params.packet_size.range(),
            )),
            Side::Output.task(BitSequence::random(
                "rd_en",
                p.fifo.rd_en,
                derive_seed(seed, 2),
                self.params.ready_probability,
            )),
        ]
    }

    /// Every write counts, full or not; `full` only decides the
    /// transaction's fate.
    fn accepted(&self, snap: &Snapshot<'_>, out: &mut Vec<Accepted>) {
        let p = &self.ports;
        if snap.high(p.fifo.wr_en) {
            out.push(
                Accepted::new(0, snap.get(p.fifo.data_in))
                    .full(snap.high(p.fifo.full))
                    .end(snap.high(p.commit)),
            );
        }
    }

    fn monitor(&self) -> WordMonitor {
        WordMonitor::new(self.ports.fifo.read(), self.ports.fifo.data_out)
    }

    fn idle(&self, snap: &Snapshot<'_>) -> bool {
        snap.high(self.ports.fifo.empty)
    }
}
