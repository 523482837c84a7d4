//! Resynchronizing scanner for frame boundaries.
//!
//! A receiver that lost track of frame boundaries (garbage on the wire, a
//! malformed frame skipped halfway) finds the next frame by looking for the
//! magic bytes one byte at a time. The scan is a state machine:
//! - `NeedMagic0`: waiting for `F`
//! - `NeedMagic1`: have `F`, waiting for `T`
//! - `NeedMagic2`: have `FT`, waiting for `S`
//! - `NeedMagic3`: have `FTS`, waiting for `S`
//! - `Synced`: all four magic bytes seen, the header remainder follows
//!
//! On a mismatch the partial match is dropped. The mismatching byte is then
//! re-examined as a fresh start, so `FFTSS` still synchronizes.
//!
//! # Example
//!
//! ```
//! use ftss_net::protocol::{MagicScanner, ScanStep};
//!
//! let mut scanner = MagicScanner::new();
//! let steps: Vec<ScanStep> = b"xFTSS".iter().map(|&b| scanner.feed(b)).collect();
//! assert_eq!(steps.last(), Some(&ScanStep::Synced));
//! ```

use super::header::MAGIC;

/// Scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    NeedMagic0,
    NeedMagic1,
    NeedMagic2,
    NeedMagic3,
    Synced,
}

/// Outcome of feeding one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStep {
    /// The byte (and any partial match before it) was discarded.
    Discarded,
    /// The byte extended a partial match.
    Partial,
    /// The byte completed the magic sequence.
    Synced,
}

/// Byte-at-a-time magic sequence detector.
#[derive(Debug, Clone)]
pub struct MagicScanner {
    state: ScanState,
    discarded: usize,
}

impl MagicScanner {
    /// Create a scanner waiting for the first magic byte.
    pub fn new() -> Self {
        Self {
            state: ScanState::NeedMagic0,
            discarded: 0,
        }
    }

    /// Feed one byte from the stream.
    ///
    /// Once `Synced` is returned the scanner stays synced until [`reset`](Self::reset).
    pub fn feed(&mut self, byte: u8) -> ScanStep {
        let matched = match self.state {
            ScanState::NeedMagic0 => 0,
            ScanState::NeedMagic1 => 1,
            ScanState::NeedMagic2 => 2,
            ScanState::NeedMagic3 => 3,
            ScanState::Synced => return ScanStep::Synced,
        };

        if byte == MAGIC[matched] {
            self.state = match matched {
                0 => ScanState::NeedMagic1,
                1 => ScanState::NeedMagic2,
                2 => ScanState::NeedMagic3,
                _ => ScanState::Synced,
            };
            return if self.state == ScanState::Synced {
                ScanStep::Synced
            } else {
                ScanStep::Partial
            };
        }

        // Drop the partial match; the mismatching byte may open a new one.
        if byte == MAGIC[0] {
            self.discarded += matched;
            self.state = ScanState::NeedMagic1;
            ScanStep::Partial
        } else {
            self.discarded += matched + 1;
            self.state = ScanState::NeedMagic0;
            ScanStep::Discarded
        }
    }

    /// Current state.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Bytes dropped since creation or the last reset.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Go back to waiting for the first magic byte.
    pub fn reset(&mut self) {
        self.state = ScanState::NeedMagic0;
        self.discarded = 0;
    }
}

impl Default for MagicScanner {
    fn default() -> Self {
        Self::new()
    }
}
