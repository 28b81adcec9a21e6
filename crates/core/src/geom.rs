use anyhow::{bail, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Absolute screen coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Axis-aligned screen region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Uniform point inside the rect, inclusive of all edges.
    /// Zero or negative extents are treated as 1 so sampling never fails.
    pub fn random_point(&self, rng: &mut impl Rng) -> Point {
        Point {
            x: rng.gen_range(self.x..=self.x + self.width.max(1) - 1),
            y: rng.gen_range(self.y..=self.y + self.height.max(1) - 1),
        }
    }
}

/// Allowed bounds for `DelayRange`, in milliseconds.
pub const DELAY_MIN_MS: u64 = 10;
pub const DELAY_MAX_MS: u64 = 5000;

/// Bounded inclusive delay range. The only construction-validated value in
/// the whole data model: both bounds must fall within 10..=5000 ms and
/// min must not exceed max. Deserialization goes through the same check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDelayRange")]
pub struct DelayRange {
    min_ms: u64,
    max_ms: u64,
}

#[derive(Deserialize)]
struct RawDelayRange {
    min_ms: u64,
    max_ms: u64,
}

impl TryFrom<RawDelayRange> for DelayRange {
    type Error = anyhow::Error;

    fn try_from(raw: RawDelayRange) -> Result<Self> {
        DelayRange::new(raw.min_ms, raw.max_ms)
    }
}

impl DelayRange {
    pub fn new(min_ms: u64, max_ms: u64) -> Result<Self> {
        let bounds = DELAY_MIN_MS..=DELAY_MAX_MS;
        if !bounds.contains(&min_ms) || !bounds.contains(&max_ms) {
            bail!(
                "delay range {}..{} ms outside {}..{} ms",
                min_ms,
                max_ms,
                DELAY_MIN_MS,
                DELAY_MAX_MS
            );
        }
        if min_ms > max_ms {
            bail!("delay range min {} ms exceeds max {} ms", min_ms, max_ms);
        }
        Ok(Self { min_ms, max_ms })
    }

    pub fn min_ms(&self) -> u64 {
        self.min_ms
    }

    pub fn max_ms(&self) -> u64 {
        self.max_ms
    }

    /// Uniform delay in `min_ms..=max_ms`.
    pub fn sample(&self, rng: &mut impl Rng) -> u64 {
        rng.gen_range(self.min_ms..=self.max_ms)
    }
}
