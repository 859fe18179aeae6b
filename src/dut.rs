//! Boundary to the device under test.
//!
//! The harness never looks inside a DUT. It sees one only through the
//! signals of its [`SignalTable`](crate::signal::SignalTable): once per clock
//! cycle the DUT settles its outputs for the currently driven inputs, and on
//! the rising edge it latches new state from the very snapshot the testbench
//! sampled. A simulator binding, a cycle-accurate model or a hand-written
//! behavioral model all fit behind this trait.

use crate::signal::{Assignments, Snapshot};

pub trait Dut {
    /// Combinational settle: drive every output signal for the current
    /// state and the inputs in `inputs`. Only output signals may be assigned.
    fn settle(&self, inputs: &Snapshot<'_>, outputs: &mut Assignments);

    /// Rising clock edge: update internal state from the settled snapshot.
    /// Reset is an ordinary input and is handled here.
    fn clock(&mut self, settled: &Snapshot<'_>);
}

impl<D: Dut + ?Sized> Dut for Box<D> {
    fn settle(&self, inputs: &Snapshot<'_>, outputs: &mut Assignments) {
        (**self).settle(inputs, outputs)
    }

    fn clock(&mut self, settled: &Snapshot<'_>) {
        (**self).clock(settled)
    }
}

impl<D: Dut + ?Sized> Dut for &mut D {
    fn settle(&self, inputs: &Snapshot<'_>, outputs: &mut Assignments) {
        (**self).settle(inputs, outputs)
    }

    fn clock(&mut self, settled: &Snapshot<'_>) {
        (**self).clock(settled)
    }
}
