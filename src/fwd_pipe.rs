//! Forward valid/ready pipeline stage: words go in on `valid_in`/`ready_in`
//! and come out on `valid_out`/`ready_out`, unchanged and in order.

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
pub struct FwdPipePorts {
    pub rst: Signal,
    pub valid_in: Signal,
    pub ready_in: Signal,
    pub data_in: Signal,
    pub valid_out: Signal,
    pub ready_out: Signal,
    pub data_out: Signal,
}

impl FwdPipePorts {
    pub fn declare(table: &mut SignalTable, width: Width) -> Self {
        Self {
            rst: table.input("rst", Width::BIT),
            valid_in: table.input("valid_in", Width::BIT),
            ready_in: table.output("ready_in", Width::BIT),
            data_in: table.input("data_in", width),
            valid_out: table.output("valid_out", Width::BIT),
            ready_out: table.input("ready_out", Width::BIT),
            data_out: table.output("data_out", width),
        }
    }

    pub fn input(&self) -> Handshake {
        Handshake::ValidReady {
            valid: self.valid_in,
            ready: self.ready_in,
        }
    }

    pub fn output(&self) -> Handshake {
        Handshake::ValidReady {
            valid: self.valid_out,
            ready: self.ready_out,
        }
    }
}

pub struct FwdPipeTb {
    table: SignalTable,
    pub ports: FwdPipePorts,
    width: Width,
    params: RunParams,
}

impl FwdPipeTb {
    /// Fails if `config` does not validate.
    pub fn new(config: &HarnessConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut table = SignalTable::new();
        let width = config.dut.width()?;
        let ports = FwdPipePorts::declare(&mut table, width);
        Ok(Self {
            table,
            ports,
            width,
            params: config.run.clone(),
        })
    }
}

impl Testbench for FwdPipeTb {
    type Item = Word;
    type Monitor = WordMonitor;

    fn name(&self) -> &str {
        "fwd_pipe"
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
                "valid_in",
                self.ports.valid_in,
                derive_seed(seed, 0),
                self.params.valid_probability,
            )),
            Side::Input.task(DataDriver::new(
                "data_in",
                self.ports.input(),
                self.ports.data_in,
                WordSource::new(derive_seed(seed, 1), self.width),
            )),
            Side::Output.task(BitSequence::random(
                "ready_out",
                self.ports.ready_out,
                derive_seed(seed, 2),
                self.params.ready_probability,
            )),
        ]
    }

    fn accepted(&self, snap: &Snapshot<'_>, out: &mut Vec<Accepted>) {
        if self.ports.input().fired(snap) {
            out.push(Accepted::new(0, snap.get(self.ports.data_in)));
        }
    }

    fn monitor(&self) -> WordMonitor {
        WordMonitor::new(self.ports.output(), self.ports.data_out)
    }

    fn idle(&self, snap: &Snapshot<'_>) -> bool {
        snap.low(self.ports.valid_out)
    }
}
