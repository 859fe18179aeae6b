//! Word and width primitives.

/// A data word as seen on a bus. Words are opaque fixed-width integers;
/// nothing in the harness interprets their bits.
pub type Word = u64;

/// An ordered, non-empty group of words closed by an end-of-packet marker.
pub type Packet = Vec<Word>;

/// Bit width of a signal, 1..=64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Width(u32);

impl Width {
    pub const BIT: Width = Width(1);
    pub const MAX: u32 = 64;

    /// Returns `None` for widths outside 1..=64.
    pub fn new(bits: u32) -> Option<Self> {
        if (1..=Self::MAX).contains(&bits) {
            Some(Width(bits))
        } else {
            None
        }
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    #[inline]
    pub fn mask(&self) -> Word {
        if self.0 == Self::MAX {
            Word::MAX
        } else {
            (1 << self.0) - 1
        }
    }

    /// Truncates `value` to this width, the way a simulator truncates an
    /// over-wide assignment.
    #[inline]
    pub fn truncate(&self, value: Word) -> Word {
        value & self.mask()
    }
}
