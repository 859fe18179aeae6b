//! Ordered comparison of predicted against observed bus traffic.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;

use crate::value::{Packet, Word};

/// Something a scoreboard can compare and report.
pub trait Item: PartialEq + fmt::Debug + Clone {
    /// Cuts a released group into the items a monitor will report for it.
    fn split(words: Packet) -> Vec<Self>;

    fn words(&self) -> Packet;
}

impl Item for Word {
    fn split(words: Packet) -> Vec<Self> {
        words
    }

    fn words(&self) -> Packet {
        vec![*self]
    }
}

impl Item for Packet {
    fn split(words: Packet) -> Vec<Self> {
        vec![words]
    }

    fn words(&self) -> Packet {
        self.clone()
    }
}

/// How observed items may be ordered relative to the expected stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ordering {
    /// Strict FIFO: every observed item must equal the oldest expected item.
    #[default]
    InOrder,
    /// Every observed item must equal the oldest pending item of *some*
    /// source. Each source's own order is strict; sources may interleave at
    /// item granularity. Ambiguous matches stay open until later items
    /// decide them.
    Interleaved,
}

/// First divergence between prediction and observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Index of the offending observed item, counting from 0.
    pub position: u64,
    /// Oldest expected item at that point, `None` if nothing was expected.
    pub expected: Option<Packet>,
    pub actual: Packet,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expected {
            Some(exp) => write!(
                f,
                "mismatch at item {}: expected {:x?}, got {:x?}",
                self.position, exp, self.actual
            ),
            None => write!(
                f,
                "unexpected item {} with nothing expected: got {:x?}",
                self.position, self.actual
            ),
        }
    }
}

/// What was still outstanding when the run was finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leftover {
    pub expected: usize,
    pub backlog: usize,
}

#[derive(Debug, Clone)]
struct Pending<T> {
    /// Release order across all sources.
    seq: u64,
    item: T,
}

/// Compares observed items against per-source expected streams.
///
/// With several sources an observation can be ambiguous: two sources may
/// have equal items at their heads. Instead of guessing, the scoreboard keeps
/// every consumption state still consistent with what was observed (how many
/// items of each source have come out) and only fails once no state is left.
#[derive(Debug, Clone)]
pub struct Scoreboard<T: Item> {
    ordering: Ordering,
    streams: Vec<VecDeque<Pending<T>>>,
    states: BTreeSet<Vec<usize>>,
    expected: u64,
    received: u64,
    matched: u64,
    failure: Option<Mismatch>,
}

impl<T: Item> Scoreboard<T> {
    pub fn new(ordering: Ordering) -> Self {
        Self {
            ordering,
            streams: Vec::new(),
            states: BTreeSet::from([Vec::new()]),
            expected: 0,
            received: 0,
            matched: 0,
            failure: None,
        }
    }

    pub fn in_order() -> Self {
        Self::new(Ordering::InOrder)
    }

    pub fn interleaved() -> Self {
        Self::new(Ordering::Interleaved)
    }

    pub fn ordering(&self) -> Ordering {
        self.ordering
    }

    /// Appends a predicted item from `source` to the tail of its stream.
    /// In-order scoreboards keep a single stream.
    pub fn add_exp(&mut self, source: usize, item: T) {
        let stream = match self.ordering {
            Ordering::InOrder => 0,
            Ordering::Interleaved => source,
        };
        if stream >= self.streams.len() {
            self.streams.resize_with(stream + 1, VecDeque::new);
            self.states = std::mem::take(&mut self.states)
                .into_iter()
                .map(|mut state| {
                    state.resize(stream + 1, 0);
                    state
                })
                .collect();
        }
        self.streams[stream].push_back(Pending {
            seq: self.expected,
            item,
        });
        self.expected += 1;
    }

    /// Compares an observed item against the expected streams. The first
    /// failure is latched: once failed, every later call returns it again and
    /// nothing more is compared.
    pub fn add_recv(&mut self, item: T) -> Result<(), Mismatch> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        let position = self.received;
        self.received += 1;

        let mut next = BTreeSet::new();
        for state in &self.states {
            for (s, stream) in self.streams.iter().enumerate() {
                if stream.get(state[s]).is_some_and(|p| p.item == item) {
                    let mut advanced = state.clone();
                    advanced[s] += 1;
                    next.insert(advanced);
                }
            }
        }
        if next.is_empty() {
            let mismatch = Mismatch {
                position,
                expected: self.oldest_pending().map(T::words),
                actual: item.words(),
            };
            tracing::error!(%mismatch, "scoreboard mismatch");
            self.failure = Some(mismatch.clone());
            return Err(mismatch);
        }
        self.states = next;
        self.matched += 1;
        self.retire();
        Ok(())
    }

    /// Drops items every remaining state has consumed.
    fn retire(&mut self) {
        for s in 0..self.streams.len() {
            let done = self.states.iter().map(|st| st[s]).min().unwrap_or(0);
            if done == 0 {
                continue;
            }
            self.streams[s].drain(..done);
            self.states = std::mem::take(&mut self.states)
                .into_iter()
                .map(|mut st| {
                    st[s] -= done;
                    st
                })
                .collect();
        }
    }

    /// Oldest unmatched item under the first remaining state.
    fn oldest_pending(&self) -> Option<&T> {
        let state = self.states.iter().next()?;
        self.streams
            .iter()
            .enumerate()
            .filter_map(|(s, stream)| stream.get(state[s]))
            .min_by_key(|p| p.seq)
            .map(|p| &p.item)
    }

    /// Expected items not yet matched.
    pub fn pending(&self) -> usize {
        (self.expected - self.matched) as usize
    }

    pub fn failure(&self) -> Option<&Mismatch> {
        self.failure.as_ref()
    }

    /// Final check after drain. `backlog` is what the monitor saw but never
    /// reported, e.g. a packet without its last word.
    pub fn finalize(&self, backlog: usize) -> Result<(), Leftover> {
        let expected = self.pending();
        if expected == 0 && backlog == 0 {
            Ok(())
        } else {
            Err(Leftover { expected, backlog })
        }
    }

    pub fn expected(&self) -> u64 {
        self.expected
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn matched(&self) -> u64 {
        self.matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_matches_and_drains() {
        let mut sb = Scoreboard::<Word>::in_order();
        for w in [1, 2, 3, 4] {
            sb.add_exp(0, w);
        }
        sb.add_recv(1).unwrap();
        sb.add_recv(2).unwrap();
        assert_eq!(sb.pending(), 2);
        assert_eq!(
            sb.finalize(0),
            Err(Leftover {
                expected: 2,
                backlog: 0
            })
        );
        sb.add_recv(3).unwrap();
        sb.add_recv(4).unwrap();
        assert_eq!(sb.finalize(0), Ok(()));
        assert_eq!(sb.matched(), 4);
    }

    #[test]
    fn wrong_value_is_reported_with_position() {
        let mut sb = Scoreboard::<Word>::in_order();
        sb.add_exp(0, 1);
        sb.add_exp(0, 2);
        sb.add_recv(1).unwrap();
        let err = sb.add_recv(3).unwrap_err();
        assert_eq!(
            err,
            Mismatch {
                position: 1,
                expected: Some(vec![2]),
                actual: vec![3],
            }
        );
        assert_eq!(err.to_string(), "mismatch at item 1: expected [2], got [3]");
    }

    #[test]
    fn unexpected_item_fails() {
        let mut sb = Scoreboard::<Word>::in_order();
        let err = sb.add_recv(0xab).unwrap_err();
        assert_eq!(err.expected, None);
        assert!(err.to_string().starts_with("unexpected item 0"));
    }

    #[test]
    fn first_failure_is_latched() {
        let mut sb = Scoreboard::<Word>::in_order();
        sb.add_exp(0, 5);
        let first = sb.add_recv(6).unwrap_err();
        // a later correct item does not un-fail the run
        assert_eq!(sb.add_recv(5).unwrap_err(), first);
        assert_eq!(sb.failure(), Some(&first));
        assert_eq!(sb.received(), 1);
    }

    #[test]
    fn reordering_fails_in_order() {
        let mut sb = Scoreboard::<Packet>::in_order();
        sb.add_exp(0, vec![10, 11]);
        sb.add_exp(1, vec![20]);
        assert!(sb.add_recv(vec![20]).is_err());
    }

    #[test]
    fn interleaved_allows_either_packet_order() {
        for order in [[0usize, 1], [1, 0]] {
            let pkts = [vec![10, 11], vec![20]];
            let mut sb = Scoreboard::<Packet>::interleaved();
            sb.add_exp(0, pkts[0].clone());
            sb.add_exp(1, pkts[1].clone());
            for i in order {
                sb.add_recv(pkts[i].clone()).unwrap();
            }
            assert_eq!(sb.finalize(0), Ok(()));
        }
    }

    #[test]
    fn interleaved_rejects_split_packet() {
        let mut sb = Scoreboard::<Packet>::interleaved();
        sb.add_exp(0, vec![10, 11]);
        sb.add_exp(1, vec![20]);
        // [10, 20, 11] as seen by a last-delimited monitor
        let err = sb.add_recv(vec![10, 20, 11]).unwrap_err();
        assert_eq!(err.expected, Some(vec![10, 11]));
    }

    #[test]
    fn interleaved_keeps_per_source_order() {
        let mut sb = Scoreboard::<Packet>::interleaved();
        sb.add_exp(0, vec![1]);
        sb.add_exp(0, vec![2]);
        sb.add_exp(1, vec![3]);
        // source 0's second packet may not overtake its first
        assert!(sb.add_recv(vec![2]).is_err());
    }

    #[test]
    fn duplicate_heads_keep_both_sources_open() {
        let mut sb = Scoreboard::<Packet>::interleaved();
        sb.add_exp(0, vec![7]);
        sb.add_exp(1, vec![7]);
        sb.add_exp(0, vec![8]);
        sb.add_recv(vec![7]).unwrap();
        // source 0 was consumed, so its next packet is now at its head
        sb.add_recv(vec![8]).unwrap();
        sb.add_recv(vec![7]).unwrap();
        assert_eq!(sb.finalize(0), Ok(()));
    }

    #[test]
    fn equal_heads_resolved_by_later_items() {
        // completion order s0:[7] s1:[7] s1:[8] s0:[9]; the DUT sent all of
        // source 1 first, which only later items can tell apart
        let mut sb = Scoreboard::<Packet>::interleaved();
        sb.add_exp(0, vec![7]);
        sb.add_exp(1, vec![7]);
        sb.add_exp(1, vec![8]);
        sb.add_exp(0, vec![9]);
        for pkt in [vec![7], vec![8], vec![7], vec![9]] {
            sb.add_recv(pkt).unwrap();
        }
        assert_eq!(sb.finalize(0), Ok(()));
        assert_eq!(sb.matched(), 4);
    }

    #[test]
    fn ambiguity_fails_once_no_order_fits() {
        let mut sb = Scoreboard::<Word>::interleaved();
        sb.add_exp(0, 1);
        sb.add_exp(1, 1);
        sb.add_exp(0, 2);
        sb.add_exp(1, 3);
        sb.add_recv(1).unwrap();
        sb.add_recv(1).unwrap();
        assert_eq!(sb.pending(), 2);
        let err = sb.add_recv(4).unwrap_err();
        assert_eq!(err.position, 2);
        assert_eq!(err.expected, Some(vec![2]));
        assert_eq!(sb.pending(), 2);
    }

    #[test]
    fn in_order_ignores_source_tags() {
        let mut sb = Scoreboard::<Word>::in_order();
        sb.add_exp(1, 5);
        sb.add_exp(0, 6);
        assert!(sb.add_recv(6).is_err());
    }

    #[test]
    fn backlog_fails_finalize() {
        let sb = Scoreboard::<Packet>::interleaved();
        assert_eq!(
            sb.finalize(3),
            Err(Leftover {
                expected: 0,
                backlog: 3
            })
        );
    }
}
