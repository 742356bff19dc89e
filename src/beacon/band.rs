//! Band Selection
//!
//! Holds the operator's band choice among the configured dial frequencies.

use heapless::Vec;

use crate::config::MAX_BANDS;
use crate::types::Frequency;

/// Current band among a fixed list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BandState {
    frequencies: Vec<Frequency, MAX_BANDS>,
    index: usize,
}

impl BandState {
    /// Create the band state
    ///
    /// Returns None if the list is empty or `index` is out of range.
    #[must_use]
    pub fn new(frequencies: Vec<Frequency, MAX_BANDS>, index: usize) -> Option<Self> {
        if index < frequencies.len() {
            Some(Self { frequencies, index })
        } else {
            None
        }
    }

    /// Step to the next band, wrapping to the first
    /// Returns the new index
    pub fn advance(&mut self) -> usize {
        self.index = (self.index + 1) % self.frequencies.len();
        self.index
    }

    /// Dial frequency of the current band
    #[must_use]
    pub fn current(&self) -> Frequency {
        self.frequencies[self.index]
    }

    /// Current index (0-based)
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Current position counted from 1, as shown to the operator
    #[must_use]
    pub const fn ordinal(&self) -> usize {
        self.index + 1
    }

    /// Number of bands
    #[must_use]
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// Never true for a constructed state
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for BandState {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "band {}/{} {}",
            self.ordinal(),
            self.frequencies.len(),
            self.current()
        );
    }
}
