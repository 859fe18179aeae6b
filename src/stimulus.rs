//! Randomized stimulus drivers.
//!
//! Every driver owns its signals and its own seeded random stream, so two
//! runs with the same seed drive identical waveforms and no driver's
//! sequence depends on how often another one was polled.

use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::executor::{Driver, Step};
use crate::monitor::Handshake;
use crate::signal::{Assignments, Signal, Snapshot};
use crate::value::{Width, Word};

/// Derives an independent stream seed from a run seed (splitmix64).
pub fn derive_seed(seed: u64, stream: u64) -> u64 {
    let mut z = seed
        .wrapping_add(stream.wrapping_add(1).wrapping_mul(0x9e37_79b9_7f4a_7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Unbounded Bernoulli bit sequence.
#[derive(Debug, Clone)]
pub struct BernoulliBits {
    rng: StdRng,
    p: f64,
}

impl BernoulliBits {
    pub fn new(seed: u64, p: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            p: p.clamp(0.0, 1.0),
        }
    }
}

impl Iterator for BernoulliBits {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        Some(self.rng.gen_bool(self.p))
    }
}

/// Random words of a fixed width.
#[derive(Debug, Clone)]
pub struct WordSource {
    rng: StdRng,
    width: Width,
}

impl WordSource {
    pub fn new(seed: u64, width: Width) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            width,
        }
    }

    pub fn next_word(&mut self) -> Word {
        self.width.truncate(self.rng.gen::<u64>())
    }
}

/// Assigns one value of a bit sequence to a signal every cycle. Finishes when
/// the sequence ends; idles the signal low when done or cancelled.
pub struct BitSequence {
    name: String,
    signal: Signal,
    bits: Box<dyn Iterator<Item = bool>>,
}

impl BitSequence {
    pub fn new(
        name: impl Into<String>,
        signal: Signal,
        bits: impl Iterator<Item = bool> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            signal,
            bits: Box::new(bits),
        }
    }

    pub fn random(name: impl Into<String>, signal: Signal, seed: u64, p: f64) -> Self {
        Self::new(name, signal, BernoulliBits::new(seed, p))
    }
}

impl Driver for BitSequence {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_tick(&mut self, _snap: &Snapshot<'_>, next: &mut Assignments) -> Step {
        match self.bits.next() {
            Some(bit) => {
                next.set_bool(self.signal, bit);
                Step::Pending
            }
            None => {
                next.set(self.signal, 0);
                Step::Done
            }
        }
    }

    fn cancel(&mut self, next: &mut Assignments) {
        next.set(self.signal, 0);
    }
}

/// Drives a fresh random word onto `data` after every accepted transfer, so
/// the data bus only changes once the DUT has taken the current word.
pub struct DataDriver {
    name: String,
    accept: Handshake,
    data: Signal,
    words: WordSource,
}

impl DataDriver {
    pub fn new(name: impl Into<String>, accept: Handshake, data: Signal, words: WordSource) -> Self {
        Self {
            name: name.into(),
            accept,
            data,
            words,
        }
    }
}

impl Driver for DataDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self, next: &mut Assignments) {
        next.set(self.data, self.words.next_word());
    }

    fn on_tick(&mut self, snap: &Snapshot<'_>, next: &mut Assignments) -> Step {
        if self.accept.fired(snap) {
            next.set(self.data, self.words.next_word());
        }
        Step::Pending
    }

    fn cancel(&mut self, _next: &mut Assignments) {}
}

/// Drives data and the commit marker of a transactional writer. Packet sizes
/// are drawn from `size`; `commit` is high together with the final word of
/// each packet. A write counts towards the packet whenever the write enable
/// is high, full or not.
pub struct CommitWriter {
    name: String,
    wr_en: Signal,
    data: Signal,
    commit: Signal,
    words: WordSource,
    rng: StdRng,
    size: RangeInclusive<u32>,
    pkt_size: u32,
    pkt_cnt: u32,
}

impl CommitWriter {
    pub fn new(
        wr_en: Signal,
        data: Signal,
        commit: Signal,
        seed: u64,
        width: Width,
        size: RangeInclusive<u32>,
    ) -> Self {
        Self {
            name: "commit_writer".to_string(),
            wr_en,
            data,
            commit,
            words: WordSource::new(derive_seed(seed, 0), width),
            rng: StdRng::seed_from_u64(derive_seed(seed, 1)),
            size,
            pkt_size: 0,
            pkt_cnt: 0,
        }
    }

    fn new_packet(&mut self) {
        self.pkt_size = self.rng.gen_range(self.size.clone());
        self.pkt_cnt = 0;
    }

    fn drive_word(&mut self, next: &mut Assignments) {
        next.set(self.data, self.words.next_word());
        next.set_bool(self.commit, self.pkt_cnt + 1 == self.pkt_size);
    }
}

impl Driver for CommitWriter {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self, next: &mut Assignments) {
        self.new_packet();
        self.drive_word(next);
    }

    fn on_tick(&mut self, snap: &Snapshot<'_>, next: &mut Assignments) -> Step {
        if snap.high(self.wr_en) {
            self.pkt_cnt += 1;
            if self.pkt_cnt == self.pkt_size {
                self.new_packet();
            }
            self.drive_word(next);
        }
        Step::Pending
    }

    fn cancel(&mut self, next: &mut Assignments) {
        next.set(self.commit, 0);
    }
}

/// Ports of one packet source on a valid/ready/last bus.
#[derive(Debug, Clone, Copy)]
pub struct PacketPorts {
    pub valid: Signal,
    pub ready: Signal,
    pub last: Signal,
    pub data: Signal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceState {
    Gap { remaining: u32, size: u32 },
    Sending { cnt: u32, size: u32 },
    Finished,
}

/// Sends `packets` packets: an idle gap with valid low, then every word held
/// on the bus until the sink is ready, `last` on the final word.
pub struct PacketSource {
    name: String,
    ports: PacketPorts,
    words: WordSource,
    rng: StdRng,
    size: RangeInclusive<u32>,
    gap: RangeInclusive<u32>,
    packets: u64,
    sent: u64,
    state: SourceState,
}

impl PacketSource {
    pub fn new(
        name: impl Into<String>,
        ports: PacketPorts,
        seed: u64,
        width: Width,
        size: RangeInclusive<u32>,
        gap: RangeInclusive<u32>,
        packets: u64,
    ) -> Self {
        Self {
            name: name.into(),
            ports,
            words: WordSource::new(derive_seed(seed, 0), width),
            rng: StdRng::seed_from_u64(derive_seed(seed, 1)),
            size,
            gap,
            packets,
            sent: 0,
            state: SourceState::Finished,
        }
    }

    pub fn packets_sent(&self) -> u64 {
        self.sent
    }

    fn idle(&self, next: &mut Assignments) {
        next.set(self.ports.valid, 0);
        next.set(self.ports.last, 0);
    }

    fn begin_packet(&mut self, next: &mut Assignments) -> Step {
        if self.sent == self.packets {
            self.state = SourceState::Finished;
            self.idle(next);
            return Step::Done;
        }
        let size = self.rng.gen_range(self.size.clone());
        let gap = self.rng.gen_range(self.gap.clone());
        if gap == 0 {
            self.send_word(0, size, next);
        } else {
            self.state = SourceState::Gap {
                remaining: gap,
                size,
            };
            self.idle(next);
        }
        Step::Pending
    }

    fn send_word(&mut self, cnt: u32, size: u32, next: &mut Assignments) {
        self.state = SourceState::Sending { cnt, size };
        next.set(self.ports.valid, 1);
        next.set(self.ports.data, self.words.next_word());
        next.set_bool(self.ports.last, cnt + 1 == size);
    }
}

impl Driver for PacketSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self, next: &mut Assignments) {
        self.begin_packet(next);
    }

    fn on_tick(&mut self, snap: &Snapshot<'_>, next: &mut Assignments) -> Step {
        match self.state {
            SourceState::Gap { remaining, size } => {
                if remaining <= 1 {
                    self.send_word(0, size, next);
                } else {
                    self.state = SourceState::Gap {
                        remaining: remaining - 1,
                        size,
                    };
                }
                Step::Pending
            }
            SourceState::Sending { cnt, size } => {
                if snap.low(self.ports.ready) {
                    return Step::Pending;
                }
                if cnt + 1 < size {
                    self.send_word(cnt + 1, size, next);
                    return Step::Pending;
                }
                self.sent += 1;
                self.begin_packet(next)
            }
            SourceState::Finished => Step::Done,
        }
    }

    fn cancel(&mut self, next: &mut Assignments) {
        self.state = SourceState::Finished;
        self.idle(next);
    }
}
