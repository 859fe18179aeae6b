//! Bus monitors: sample a handshake on every edge and report what was
//! transferred, word by word or as `last`-delimited packets.

use crate::signal::{Signal, Snapshot};
use crate::value::{Packet, Word};

/// The "a transfer happened on this edge" predicate of a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handshake {
    /// `valid && ready`.
    ValidReady { valid: Signal, ready: Signal },
    /// `enable && !blocked`: a FIFO write (`wr_en`, `full`) or read
    /// (`rd_en`, `empty`).
    EnableUnless { enable: Signal, blocked: Signal },
}

impl Handshake {
    #[inline]
    pub fn fired(&self, snap: &Snapshot<'_>) -> bool {
        match *self {
            Handshake::ValidReady { valid, ready } => snap.high(valid) && snap.high(ready),
            Handshake::EnableUnless { enable, blocked } => snap.high(enable) && snap.low(blocked),
        }
    }
}

/// Samples a bus once per edge and reports what was transferred.
pub trait Monitor {
    type Item;

    fn sample(&mut self, snap: &Snapshot<'_>) -> Option<Self::Item>;

    /// Words seen on the bus but not yet reported.
    fn backlog(&self) -> usize {
        0
    }

    /// Number of items reported so far.
    fn observed(&self) -> u64;
}

/// Reports one word per transfer.
#[derive(Debug, Clone)]
pub struct WordMonitor {
    transfer: Handshake,
    data: Signal,
    observed: u64,
}

impl WordMonitor {
    pub fn new(transfer: Handshake, data: Signal) -> Self {
        Self {
            transfer,
            data,
            observed: 0,
        }
    }
}

impl Monitor for WordMonitor {
    type Item = Word;

    fn sample(&mut self, snap: &Snapshot<'_>) -> Option<Word> {
        if !self.transfer.fired(snap) {
            return None;
        }
        self.observed += 1;
        Some(snap.get(self.data))
    }

    fn observed(&self) -> u64 {
        self.observed
    }
}

/// Collects transferred words and reports them as one packet on the
/// transfer that carries `last`.
#[derive(Debug, Clone)]
pub struct PacketMonitor {
    transfer: Handshake,
    data: Signal,
    last: Signal,
    buf: Packet,
    observed: u64,
}

impl PacketMonitor {
    pub fn new(transfer: Handshake, data: Signal, last: Signal) -> Self {
        Self {
            transfer,
            data,
            last,
            buf: Vec::new(),
            observed: 0,
        }
    }
}

impl Monitor for PacketMonitor {
    type Item = Packet;

    fn sample(&mut self, snap: &Snapshot<'_>) -> Option<Packet> {
        if !self.transfer.fired(snap) {
            return None;
        }
        self.buf.push(snap.get(self.data));
        if snap.low(self.last) {
            return None;
        }
        self.observed += 1;
        Some(std::mem::take(&mut self.buf))
    }

    fn backlog(&self) -> usize {
        self.buf.len()
    }

    fn observed(&self) -> u64 {
        self.observed
    }
}
