use std::collections::BTreeMap;

use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};

use crate::telemetry::TelemetrySample;

/// Number of equal-width distance segments a lap is split into.
pub const MINISECTOR_COUNT: u8 = 25;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MiniSector {
    /// 1-based segment index, 1..=MINISECTOR_COUNT
    pub index: u8,
    pub lap_number: u32,
    pub driver_id: String,
    pub avg_speed: f64,
}

/// Equal-width partition of an observed distance range.
///
/// Bins are half-open `[lo, hi)` except the last one, which also holds the
/// maximum. Values below the range fall into bin 1, values above it into the
/// last bin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MiniSectorBins {
    min: f64,
    max: f64,
    count: u8,
}

impl MiniSectorBins {
    pub fn new(min: f64, max: f64, count: u8) -> Self {
        Self {
            min,
            max,
            count: count.max(1),
        }
    }

    /// Bins spanning the finite distances of every sample given.
    pub fn from_samples<'a>(samples: impl IntoIterator<Item = &'a TelemetrySample>) -> Option<Self> {
        let range = samples
            .into_iter()
            .map(|s| s.distance)
            .filter(|d| d.is_finite())
            .minmax_by(|a, b| a.total_cmp(b));
        match range {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(d) => Some(Self::new(d, d, MINISECTOR_COUNT)),
            MinMaxResult::MinMax(min, max) => Some(Self::new(min, max, MINISECTOR_COUNT)),
        }
    }

    pub fn width(&self) -> f64 {
        (self.max - self.min) / self.count as f64
    }

    /// Distance range `[lo, hi)` covered by a 1-based bin.
    pub fn bounds(&self, index: u8) -> (f64, f64) {
        let width = self.width();
        let lo = self.min + width * (index.saturating_sub(1)) as f64;
        let hi = if index >= self.count {
            self.max
        } else {
            self.min + width * index as f64
        };
        (lo, hi)
    }

    /// 1-based bin for a distance value.
    pub fn index_of(&self, distance: f64) -> u8 {
        let width = self.width();
        if width <= 0. || distance <= self.min {
            return 1;
        }
        let bin = ((distance - self.min) / width).floor() as i64 + 1;
        bin.clamp(1, self.count as i64) as u8
    }
}

/// Average speed per (lap, mini-sector, driver) over the samples given.
///
/// The mini-sector partition spans the distance range of the whole input, not
/// of each lap. Combinations without samples are left out. The result is
/// ordered by lap, then mini-sector, then driver.
pub fn aggregate_minisectors<'a>(
    samples: impl IntoIterator<Item = &'a TelemetrySample> + Clone,
) -> Vec<MiniSector> {
    let Some(bins) = MiniSectorBins::from_samples(samples.clone()) else {
        return Vec::new();
    };

    let mut groups: BTreeMap<(u32, u8, &str), (f64, usize)> = BTreeMap::new();
    for sample in samples.into_iter().filter(|s| s.distance.is_finite()) {
        let entry = groups
            .entry((
                sample.lap_number,
                bins.index_of(sample.distance),
                sample.driver_id.as_str(),
            ))
            .or_insert((0., 0));
        entry.0 += sample.speed;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|((lap_number, index, driver_id), (sum, count))| MiniSector {
            index,
            lap_number,
            driver_id: driver_id.to_string(),
            avg_speed: sum / count as f64,
        })
        .collect()
}
