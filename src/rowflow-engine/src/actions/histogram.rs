//! Histogram contract used by `histo1d`.
//!
//! The engine does not build histograms itself: it clones a model object per
//! slot, fills each copy with the values its slot accepts, and merges the
//! copies after the traversal. [`Histogram1D`] is a plain fixed-bin
//! implementation of the contract.

use common_error::{FlowError, FlowResult};
use serde::{Deserialize, Serialize};

/// A histogram the engine can fill and merge.
pub trait HistogramModel: Clone + Send + Sync + 'static {
    /// Add one entry.
    fn fill(&mut self, value: f64);

    /// Add the entries of another copy of the same model.
    fn merge(&mut self, other: &Self) -> FlowResult<()>;
}

/// Fixed-width one-dimensional histogram with under/overflow bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHistogram1D")]
pub struct Histogram1D {
    name: String,
    low: f64,
    high: f64,
    counts: Vec<u64>,
    underflow: u64,
    overflow: u64,
    sum: f64,
}

impl Histogram1D {
    /// Create an empty histogram with `bins` bins over `[low, high)`.
    pub fn new(name: impl Into<String>, bins: usize, low: f64, high: f64) -> FlowResult<Self> {
        if bins == 0 {
            return Err(FlowError::config("histogram needs at least one bin"));
        }
        if !(low < high) {
            return Err(FlowError::config(format!(
                "histogram range [{low}, {high}) is empty"
            )));
        }
        Ok(Self {
            name: name.into(),
            low,
            high,
            counts: vec![0; bins],
            underflow: 0,
            overflow: 0,
            sum: 0.0,
        })
    }

    /// Histogram name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of regular bins.
    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// Contents of the regular bins.
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Entries below the range.
    pub fn underflow(&self) -> u64 {
        self.underflow
    }

    /// Entries at or above the upper edge.
    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    /// Total number of fills, including under/overflow.
    pub fn entries(&self) -> u64 {
        self.counts.iter().sum::<u64>() + self.underflow + self.overflow
    }

    /// Mean of all filled values.
    pub fn mean(&self) -> f64 {
        let n = self.entries();
        if n == 0 {
            0.0
        } else {
            self.sum / n as f64
        }
    }

    /// Bin holding `value`, if it is within range.
    pub fn find_bin(&self, value: f64) -> Option<usize> {
        if value < self.low || value >= self.high || value.is_nan() {
            return None;
        }
        let width = (self.high - self.low) / self.counts.len() as f64;
        let bin = ((value - self.low) / width) as usize;
        self.counts.len().checked_sub(1).map(|last| bin.min(last))
    }

    fn same_binning(&self, other: &Self) -> bool {
        self.counts.len() == other.counts.len() && self.low == other.low && self.high == other.high
    }
}

#[derive(Deserialize)]
struct RawHistogram1D {
    name: String,
    low: f64,
    high: f64,
    counts: Vec<u64>,
    underflow: u64,
    overflow: u64,
    sum: f64,
}

impl TryFrom<RawHistogram1D> for Histogram1D {
    type Error = FlowError;

    fn try_from(raw: RawHistogram1D) -> Result<Self, Self::Error> {
        let empty = Self::new(raw.name, raw.counts.len(), raw.low, raw.high)?;
        Ok(Self {
            counts: raw.counts,
            underflow: raw.underflow,
            overflow: raw.overflow,
            sum: raw.sum,
            ..empty
        })
    }
}

impl HistogramModel for Histogram1D {
    fn fill(&mut self, value: f64) {
        match self.find_bin(value) {
            Some(bin) => self.counts[bin] += 1,
            None if value < self.low => self.underflow += 1,
            None => self.overflow += 1,
        }
        self.sum += value;
    }

    fn merge(&mut self, other: &Self) -> FlowResult<()> {
        if !self.same_binning(other) {
            return Err(FlowError::value_error(format!(
                "cannot merge histogram {:?} with a different binning",
                self.name
            )));
        }
        for (mine, theirs) in self.counts.iter_mut().zip(&other.counts) {
            *mine += theirs;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.sum += other.sum;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill() {
        let mut h = Histogram1D::new("x", 4, 0.0, 4.0).unwrap();
        for v in [0.0, 0.5, 1.0, 3.99, 4.0, -1.0] {
            h.fill(v);
        }
        assert_eq!(h.counts(), &[2, 1, 0, 1]);
        assert_eq!(h.underflow(), 1);
        assert_eq!(h.overflow(), 1);
        assert_eq!(h.entries(), 6);
    }

    #[test]
    fn test_merge() {
        let model = Histogram1D::new("x", 2, 0.0, 2.0).unwrap();
        let mut a = model.clone();
        let mut b = model;
        a.fill(0.5);
        b.fill(1.5);
        b.fill(1.5);
        a.merge(&b).unwrap();
        assert_eq!(a.counts(), &[1, 2]);
        assert!((a.mean() - 3.5 / 3.0).abs() < 1e-12);

        let other = Histogram1D::new("y", 3, 0.0, 2.0).unwrap();
        assert!(a.merge(&other).is_err());
    }

    #[test]
    fn test_invalid_binning() {
        assert!(Histogram1D::new("x", 0, 0.0, 1.0).is_err());
        assert!(Histogram1D::new("x", 10, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_deserialize_checks_binning() {
        let mut h = Histogram1D::new("x", 2, 0.0, 2.0).unwrap();
        h.fill(1.5);
        let json = serde_json::to_string(&h).unwrap();
        let back: Histogram1D = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);

        let no_bins = r#"{"name":"x","low":0.0,"high":1.0,"counts":[],"underflow":0,"overflow":0,"sum":0.0}"#;
        assert!(serde_json::from_str::<Histogram1D>(no_bins).is_err());
        let empty_range = r#"{"name":"x","low":1.0,"high":1.0,"counts":[0],"underflow":0,"overflow":0,"sum":0.0}"#;
        assert!(serde_json::from_str::<Histogram1D>(empty_range).is_err());
    }
}
