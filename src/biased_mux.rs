//! Packet multiplexer: several valid/ready/last sources share one output.
//! Once a source's first word is granted the mux must stay with that source
//! until its last word; which source goes next is the DUT's business.

use crate::config::{HarnessConfig, RunParams};
use crate::error::ConfigError;
use crate::executor::Driver;
use crate::golden::{Accepted, GoldenModel};
use crate::harness::{Side, Target, Testbench};
use crate::monitor::{Handshake, PacketMonitor};
use crate::scoreboard::Ordering;
use crate::signal::{Signal, SignalTable, Snapshot};
use crate::stimulus::{derive_seed, BitSequence, PacketPorts, PacketSource};
use crate::value::{Packet, Width};

#[derive(Debug, Clone)]
pub struct BiasedMuxPorts {
    pub rst: Signal,
    pub sources: Vec<PacketPorts>,
    pub valid_out: Signal,
    pub ready_out: Signal,
    pub last_out: Signal,
    pub data_out: Signal,
}

impl BiasedMuxPorts {
    pub fn declare(table: &mut SignalTable, width: Width, sources: usize) -> Self {
        let rst = table.input("rst", Width::BIT);
        let sources = (0..sources)
            .map(|i| PacketPorts {
                valid: table.input(format!("valid_in_{i}"), Width::BIT),
                ready: table.output(format!("ready_in_{i}"), Width::BIT),
                last: table.input(format!("last_in_{i}"), Width::BIT),
                data: table.input(format!("data_in_{i}"), width),
            })
            .collect();
        Self {
            rst,
            sources,
            valid_out: table.output("valid_out", Width::BIT),
            ready_out: table.input("ready_out", Width::BIT),
            last_out: table.output("last_out", Width::BIT),
            data_out: table.output("data_out", width),
        }
    }

    pub fn output(&self) -> Handshake {
        Handshake::ValidReady {
            valid: self.valid_out,
            ready: self.ready_out,
        }
    }
}

pub struct BiasedMuxTb {
    table: SignalTable,
    pub ports: BiasedMuxPorts,
    width: Width,
    params: RunParams,
    ordering: Ordering,
}

impl BiasedMuxTb {
    /// Fails if `config` does not validate.
    pub fn new(config: &HarnessConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut table = SignalTable::new();
        let width = config.dut.width()?;
        let ports = BiasedMuxPorts::declare(&mut table, width, config.dut.sources);
        Ok(Self {
            table,
            ports,
            width,
            params: config.run.clone(),
            ordering: Ordering::Interleaved,
        })
    }

    /// Require packets to leave in the order their last words were accepted,
    /// instead of any per-source-ordered interleaving.
    pub fn completion_order(mut self) -> Self {
        self.ordering = Ordering::InOrder;
        self
    }

    pub fn sources(&self) -> usize {
        self.ports.sources.len()
    }
}

impl Testbench for BiasedMuxTb {
    type Item = Packet;
    type Monitor = PacketMonitor;

    fn name(&self) -> &str {
        "biased_mux"
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
        GoldenModel::arbiter(self.sources())
    }

    fn ordering(&self) -> Ordering {
        self.ordering
    }

    /// Every source sends `packets` packets.
    fn target(&self) -> Target {
        Target::Packets(self.params.packets * self.sources() as u64)
    }

    fn stimulus(&self) -> Vec<(Side, Box<dyn Driver>)> {
        let seed = self.params.seed;
        let mut tasks: Vec<(Side, Box<dyn Driver>)> = self
            .ports
            .sources
            .iter()
            .enumerate()
            .map(|(i, ports)| {
                Side::Input.task(PacketSource::new(
                    format!("source_{i}"),
                    *ports,
                    derive_seed(seed, i as u64),
                    self.width,
                    self.params.packet_size.range(),
                    self.params.gap.range(),
                    self.params.packets,
                ))
            })
            .collect();
        tasks.push(Side::Output.task(BitSequence::random(
            "ready_out",
            self.ports.ready_out,
            derive_seed(seed, self.sources() as u64),
            self.params.ready_probability,
        )));
        tasks
    }

    fn accepted(&self, snap: &Snapshot<'_>, out: &mut Vec<Accepted>) {
        for (i, p) in self.ports.sources.iter().enumerate() {
            if snap.high(p.valid) && snap.high(p.ready) {
                out.push(Accepted::new(i, snap.get(p.data)).end(snap.high(p.last)));
            }
        }
    }

    fn monitor(&self) -> PacketMonitor {
        PacketMonitor::new(self.ports.output(), self.ports.data_out, self.ports.last_out)
    }

    fn idle(&self, snap: &Snapshot<'_>) -> bool {
        snap.low(self.ports.valid_out)
    }
}
