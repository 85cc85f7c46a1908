//! Score Interval Model - bucketed similarity scores
//!
//! Similarity scores are persisted as half-open buckets `[lower, upper)`
//! rather than raw floats. Only `lower` (the confidence floor) takes part in
//! ranking; `upper` is carried for reporting.

use crate::error::{NexusError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

lazy_static! {
    static ref INTERVAL_PATTERN: Regex =
        Regex::new(r"^\s*(-?\d+(?:\.\d+)?)_(-?\d+(?:\.\d+)?)\s*$").unwrap();
}

/// Cosine similarities may overshoot 1.0 by float noise.
const SCORE_OVERSHOOT: f64 = 1e-9;

/// Round `value` to `precision` decimal digits.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10_f64.powi(precision as i32);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ScoreInterval {
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(NexusError::Score(format!(
                "bounds must be finite, got [{}, {})",
                lower, upper
            )));
        }
        if lower > upper {
            return Err(NexusError::Score(format!(
                "lower bound {} exceeds upper bound {}",
                lower, upper
            )));
        }
        Ok(Self { lower, upper })
    }

    /// Bucket a raw similarity score.
    ///
    /// Returns `Ok(None)` when `score` falls below `threshold`: such scores are
    /// never candidates. The bucket is `[T + k*w, T + (k+1)*w)` for the smallest
    /// `k` with `score < T + (k+1)*w`, where every bound is rounded to
    /// `precision` digits before it is compared against `score`.
    pub fn from_raw(score: f64, threshold: f64, width: f64, precision: u32) -> Result<Option<Self>> {
        if !score.is_finite() {
            return Err(NexusError::Score(format!("score is not a finite number: {}", score)));
        }
        if score > 1.0 + SCORE_OVERSHOOT {
            return Err(NexusError::Score(format!("score {} is above 1.0", score)));
        }
        if !width.is_finite() || width <= 0.0 {
            return Err(NexusError::Score(format!("bucket width must be positive, got {}", width)));
        }
        let score = score.min(1.0);
        if score < threshold {
            return Ok(None);
        }

        let bound = |k: u64| round_to(threshold + k as f64 * width, precision);

        let mut k = ((score - threshold) / width).floor().max(0.0) as u64;
        while k > 0 && score < bound(k) {
            k -= 1;
        }
        while score >= bound(k + 1) {
            k += 1;
        }

        Ok(Some(Self {
            lower: bound(k),
            upper: bound(k + 1),
        }))
    }

    /// Parse a bucket identifier such as `0.85_0.86` or `http://value/0.85_0.86`.
    pub fn parse_identifier(raw: &str, precision: u32) -> Result<Self> {
        let trimmed = raw.trim().trim_start_matches('<').trim_end_matches('>');
        let segment = trimmed.rsplit('/').next().unwrap_or(trimmed);

        let caps = INTERVAL_PATTERN
            .captures(segment)
            .ok_or_else(|| NexusError::Score(format!("not a score interval identifier: {}", raw)))?;

        let lower: f64 = caps[1]
            .parse()
            .map_err(|e| NexusError::Score(format!("bad lower bound in {}: {}", raw, e)))?;
        let upper: f64 = caps[2]
            .parse()
            .map_err(|e| NexusError::Score(format!("bad upper bound in {}: {}", raw, e)))?;

        Self::new(round_to(lower, precision), round_to(upper, precision))
    }

    pub fn to_identifier(&self, precision: u32) -> String {
        let p = precision as usize;
        format!("{:.*}_{:.*}", p, self.lower, p, self.upper)
    }

    /// Compare two intervals by confidence floor only.
    pub fn cmp_floor(&self, other: &Self) -> Ordering {
        self.lower.total_cmp(&other.lower)
    }

    pub fn contains(&self, score: f64) -> bool {
        score >= self.lower && score < self.upper
    }
}

impl fmt::Display for ScoreInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.lower, self.upper)
    }
}
