//! Time windows over the CIR sequence of a file

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    error::{Result, StorageError},
    ids::CirIndex,
};

/// Time window `[start_time_s, start_time_s + length_s)`
///
/// A `length_s` of zero means "to the end of the file", not an empty window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Window {
    /// Start of the window in seconds
    pub start_time_s: f64,
    /// Length of the window in seconds, 0 = to end of file
    pub length_s: f64,
}

impl Window {
    /// Create a window
    pub const fn new(start_time_s: f64, length_s: f64) -> Self {
        Self {
            start_time_s,
            length_s,
        }
    }

    /// The whole file
    pub const fn full() -> Self {
        Self::new(0.0, 0.0)
    }

    /// From `start_time_s` to the end of the file
    pub const fn from_start(start_time_s: f64) -> Self {
        Self::new(start_time_s, 0.0)
    }

    /// Whether this window runs to the end of the file
    pub fn is_open_ended(&self) -> bool {
        self.length_s == 0.0
    }

    /// Convert to CIR indices for a file of `nof_cirs` CIRs at `cir_rate_hz`
    ///
    /// Indices are `floor(start * rate)` and `floor((start + length) * rate)`.
    /// A window that ends after the last CIR is a range error; ending exactly
    /// at the file length is allowed.
    pub fn resolve(&self, nof_cirs: u64, cir_rate_hz: f64) -> Result<CirRange> {
        let available_s = nof_cirs as f64 / cir_rate_hz;
        let range_error = || StorageError::Range {
            start_s: self.start_time_s,
            length_s: self.length_s,
            available_s,
        };

        if !(self.start_time_s.is_finite() && self.start_time_s >= 0.0)
            || !(self.length_s.is_finite() && self.length_s >= 0.0)
        {
            return Err(range_error());
        }

        // Absorbs rounding in sums such as 0.1 + 0.2, far below one CIR interval.
        let tolerance = available_s * 4.0 * f64::EPSILON;

        let end = if self.is_open_ended() {
            if self.start_time_s > available_s + tolerance {
                return Err(range_error());
            }
            nof_cirs
        } else {
            let end_s = self.start_time_s + self.length_s;
            if end_s > available_s + tolerance {
                return Err(range_error());
            }
            ((end_s * cir_rate_hz).floor() as u64).min(nof_cirs)
        };
        let start = ((self.start_time_s * cir_rate_hz).floor() as u64).min(end);

        Ok(CirRange { start, end })
    }
}

/// Half-open range of CIR indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CirRange {
    /// First index in the range
    pub start: u64,
    /// One past the last index
    pub end: u64,
}

impl CirRange {
    /// Number of CIRs in the range
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Whether the range holds no CIR
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Indices in the range
    pub fn indices(&self) -> impl Iterator<Item = CirIndex> {
        (self.start..self.end).map(CirIndex::new)
    }

    /// Time of every CIR in the range
    pub fn times(&self, cir_rate_hz: f64) -> Vec<f64> {
        self.indices().map(|n| n.time_s(cir_rate_hz)).collect()
    }

    /// Apply `f` to every index, in parallel when the `parallel` feature is on
    ///
    /// Results keep index order. The first error aborts the whole call.
    pub fn try_map<T, F>(&self, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(CirIndex) -> Result<T> + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        {
            (self.start..self.end)
                .into_par_iter()
                .map(|n| f(CirIndex::new(n)))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            self.indices().map(f).collect()
        }
    }
}
