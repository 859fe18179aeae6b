//! Plain FIFO: `wr_en`/`full` on the write side, `rd_en`/`empty` on the
//! read side.

use crate::config::{HarnessConfig, RunParams};
use crate::error::ConfigError;
use crate::executor::Driver;
use crate::golden::{Accepted, GoldenModel};
use crate::harness::{Side, Target, Testbench};
use crate::monitor::{Handshake, WordMonitor};
use crate::signal::{Signal, SignalTable, Snapshot};
use crate::stimulus::{derive_seed, BitSequence, DataDriver, WordSource};
use crate::value::{Width, Word};

#[derive(Debug, Clone, Copy)]
pub struct FifoPorts {
    pub rst: Signal,
    pub wr_en: Signal,
    pub rd_en: Signal,
    pub data_in: Signal,
    pub full: Signal,
    pub empty: Signal,
    pub data_out: Signal,
}

impl FifoPorts {
    pub fn declare(table: &mut SignalTable, width: Width) -> Self {
        Self {
            rst: table.input("rst", Width::BIT),
            wr_en: table.input("wr_en", Width::BIT),
            rd_en: table.input("rd_en", Width::BIT),
            data_in: table.input("data_in", width),
            full: table.output("full", Width::BIT),
            empty: table.output("empty", Width::BIT),
            data_out: table.output("data_out", width),
        }
    }

    pub fn write(&self) -> Handshake {
        Handshake::EnableUnless {
            enable: self.wr_en,
            blocked: self.full,
        }
    }

    pub fn read(&self) -> Handshake {
        Handshake::EnableUnless {
            enable: self.rd_en,
            blocked: self.empty,
        }
    }
}

pub struct FifoTb {
    table: SignalTable,
    pub ports: FifoPorts,
    width: Width,
    params: RunParams,
}

impl FifoTb {
    /// Fails if `config` does not validate.
    pub fn new(config: &HarnessConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut table = SignalTable::new();
        let width = config.dut.width()?;
        let ports = FifoPorts::declare(&mut table, width);
        Ok(Self {
            table,
            ports,
            width,
            params: config.run.clone(),
        })
    }
}

impl Testbench for FifoTb {
    type Item = Word;
    type Monitor = WordMonitor;

    fn name(&self) -> &str {
        "fifo"
    }

    fn table(&self) -> &SignalTable {
        &self.table
    }

    fn params(&self) -> &RunParams {
        &self.params
    }

    fn reset(&self) -> Signal {
        self.ports.rst
    }

    fn golden(&self) -> GoldenModel {
        GoldenModel::queue()
    }

    fn target(&self) -> Target {
        Target::Events(self.params.events)
    }

    fn stimulus(&self) -> Vec<(Side, Box<dyn Driver>)> {
        let seed = self.params.seed;
        vec![
            Side::Input.task(BitSequence::random(
                "wr_en",
                self.ports.wr_en,
                derive_seed(seed, 0),
                self.params.valid_probability,
            )),
            Side::Input.task(DataDriver::new(
                "data_in",
                self.ports.write(),
                self.ports.data_in,
                WordSource::new(derive_seed(seed, 1), self.width),
            )),
            Side::Output.task(BitSequence::random(
                "rd_en",
                self.ports.rd_en,
                derive_seed(seed, 2),
                self.params.ready_probability,
            )),
        ]
    }

    fn accepted(&self, snap: &Snapshot<'_>, out: &mut Vec<Accepted>) {
        if self.ports.write().fired(snap) {
            out.push(Accepted::new(0, snap.get(self.ports.data_in)));
        }
    }

    fn monitor(&self) -> WordMonitor {
        WordMonitor::new(self.ports.read(), self.ports.data_out)
    }

    fn idle(&self, snap: &Snapshot<'_>) -> bool {
        snap.high(self.ports.empty)
    }
}
