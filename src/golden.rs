//! Golden reference models.
//!
//! A golden model sees exactly the input words the DUT accepted, with the
//! flags sampled on the same edge, and predicts which words must come out
//! and in what groups. It knows nothing about the DUT's internals.

use crate::value::{Packet, Word};

/// One input word accepted by the DUT on some edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    pub source: usize,
    pub word: Word,
    /// The full/overflow condition on the accepting edge.
    pub full: bool,
    /// The end-of-packet marker (`commit` or `last`) on the accepting edge.
    pub end: bool,
}

impl Accepted {
    pub fn new(source: usize, word: Word) -> Self {
        Self {
            source,
            word,
            full: false,
            end: false,
        }
    }

    pub fn full(mut self, full: bool) -> Self {
        self.full = full;
        self
    }

    pub fn end(mut self, end: bool) -> Self {
        self.end = end;
        self
    }
}

/// Words a model releases to the expected stream as one atomic group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub source: usize,
    pub words: Packet,
}

/// Counters kept by every model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelStats {
    pub accepted: u64,
    /// Groups released to the expected stream.
    pub released: u64,
    /// Groups dropped without release (aborted transactions).
    pub aborted: u64,
    /// Words dropped without release.
    pub dropped_words: u64,
}

impl ModelStats {
    /// Groups that reached a final state, released or aborted.
    pub fn resolved(&self) -> u64 {
        self.released + self.aborted
    }
}

/// Plain ordered queue: every accepted word is expected at the output, in
/// acceptance order.
#[derive(Debug, Clone, Default)]
pub struct QueueModel {
    stats: ModelStats,
}

impl QueueModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_accept(&mut self, ev: Accepted) -> Release {
        self.stats.accepted += 1;
        self.stats.released += 1;
        Release {
            source: ev.source,
            words: vec![ev.word],
        }
    }
}

/// Commit/abort queue. Words of a transaction become visible only when its
/// commit word is accepted, and only if the queue never reported full while
/// the transaction was being written, the commit word included.
#[derive(Debug, Clone, Default)]
pub struct TransactionalModel {
    pending: Packet,
    aborted: bool,
    stats: ModelStats,
}

impl TransactionalModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_accept(&mut self, ev: Accepted) -> Option<Release> {
        self.stats.accepted += 1;
        self.pending.push(ev.word);
        // sticky until the transaction resolves
        if ev.full {
            self.aborted = true;
        }
        if !ev.end {
            return None;
        }
        let words = std::mem::take(&mut self.pending);
        let aborted = std::mem::replace(&mut self.aborted, false);
        if aborted {
            tracing::debug!(words = words.len(), "transaction aborted");
            self.stats.aborted += 1;
            self.stats.dropped_words += words.len() as u64;
            None
        } else {
            tracing::debug!(words = words.len(), "transaction committed");
            self.stats.released += 1;
            Some(Release {
                source: ev.source,
                words,
            })
        }
    }
}

/// Packet arbiter over several sources. Each source is a plain queue of its
/// own words; a packet is released whole, at the moment its last word is
/// accepted, so packets enter the expected stream in completion order and
/// are never split. No grant policy is assumed beyond that.
#[derive(Debug, Clone)]
pub struct ArbiterModel {
    pending: Vec<Packet>,
    stats: ModelStats,
}

impl ArbiterModel {
    pub fn new(sources: usize) -> Self {
        Self {
            pending: vec![Vec::new(); sources],
            stats: ModelStats::default(),
        }
    }

    pub fn sources(&self) -> usize {
        self.pending.len()
    }

    /// A source is locked between the first and the last word of a packet.
    pub fn locked(&self, source: usize) -> bool {
        self.pending.get(source).is_some_and(|p| !p.is_empty())
    }

    pub fn on_accept(&mut self, ev: Accepted) -> Option<Release> {
        if ev.source >= self.pending.len() {
            self.pending.resize(ev.source + 1, Vec::new());
        }
        self.stats.accepted += 1;
        let buf = &mut self.pending[ev.source];
        buf.push(ev.word);
        if !ev.end {
            return None;
        }
        let words = std::mem::take(buf);
        tracing::debug!(source = ev.source, words = words.len(), "packet complete");
        self.stats.released += 1;
        Some(Release {
            source: ev.source,
            words,
        })
    }
}

/// The reference model of one protocol variant.
#[derive(Debug, Clone)]
pub enum GoldenModel {
    Queue(QueueModel),
    Transactional(TransactionalModel),
    Arbiter(ArbiterModel),
}

impl GoldenModel {
    pub fn queue() -> Self {
        GoldenModel::Queue(QueueModel::new())
    }

    pub fn transactional() -> Self {
        GoldenModel::Transactional(TransactionalModel::new())
    }

    pub fn arbiter(sources: usize) -> Self {
        GoldenModel::Arbiter(ArbiterModel::new(sources))
    }

    /// Feeds one accepted word; returns the group it completes, if any.
    pub fn on_accept(&mut self, ev: Accepted) -> Option<Release> {
        match self {
            GoldenModel::Queue(m) => Some(m.on_accept(ev)),
            GoldenModel::Transactional(m) => m.on_accept(ev),
            GoldenModel::Arbiter(m) => m.on_accept(ev),
        }
    }

    /// True when no group is half-way through; every accepted word has either
    /// been released or dropped.
    pub fn drain_complete(&self) -> bool {
        self.pending_words() == 0
    }

    pub fn pending_words(&self) -> usize {
        match self {
            GoldenModel::Queue(_) => 0,
            GoldenModel::Transactional(m) => m.pending.len(),
            GoldenModel::Arbiter(m) => m.pending.iter().map(Vec::len).sum(),
        }
    }

    /// Drops unresolved groups at the end of stimulus. Their words were never
    /// committed and must not be expected. Returns the number of dropped words.
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.pending_words();
        match self {
            GoldenModel::Queue(_) => {}
            GoldenModel::Transactional(m) => {
                m.pending.clear();
                m.aborted = false;
            }
            GoldenModel::Arbiter(m) => m.pending.iter_mut().for_each(Vec::clear),
        }
        if dropped > 0 {
            self.stats_mut().dropped_words += dropped as u64;
        }
        dropped
    }

    pub fn stats(&self) -> ModelStats {
        match self {
            GoldenModel::Queue(m) => m.stats,
            GoldenModel::Transactional(m) => m.stats,
            GoldenModel::Arbiter(m) => m.stats,
        }
    }

    fn stats_mut(&mut self) -> &mut ModelStats {
        match self {
            GoldenModel::Queue(m) => &mut m.stats,
            GoldenModel::Transactional(m) => &mut m.stats,
            GoldenModel::Arbiter(m) => &mut m.stats,
        }
    }

    /// A model of the same variant in its initial state.
    pub fn fresh(&self) -> Self {
        match self {
            GoldenModel::Queue(_) => GoldenModel::queue(),
            GoldenModel::Transactional(_) => GoldenModel::transactional(),
            GoldenModel::Arbiter(m) => GoldenModel::arbiter(m.sources()),
        }
    }

    /// Runs `events` through a fresh model of this variant and returns every
    /// release in order.
    pub fn replay<I>(&self, events: I) -> Vec<Release>
    where
        I: IntoIterator<Item = Accepted>,
    {
        let mut model = self.fresh();
        events
            .into_iter()
            .filter_map(|ev| model.on_accept(ev))
            .collect()
    }
}
