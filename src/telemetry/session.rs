use itertools::Itertools;

use crate::errors::InsightsError;

use super::{EventInfo, LapRecord, TelemetrySample};

#[derive(Clone, Debug, Default)]
pub struct Lap {
    pub record: LapRecord,
    /// Samples sorted by ascending distance
    pub telemetry: Vec<TelemetrySample>,
}

impl Lap {
    pub fn new(record: LapRecord) -> Self {
        Self {
            record,
            telemetry: Vec::new(),
        }
    }

    pub fn driver_id(&self) -> &str {
        &self.record.driver_id
    }

    pub fn lap_number(&self) -> u32 {
        self.record.lap_number
    }

    pub fn lap_time_s(&self) -> Option<f64> {
        self.record.lap_time_s.filter(|t| t.is_finite() && *t > 0.)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Session {
    pub info: EventInfo,
    pub laps: Vec<Lap>,
}

impl Session {
    /// All laps recorded for `driver_id`, in lap order.
    pub fn laps_for<'a>(&'a self, driver_id: &str) -> impl Iterator<Item = &'a Lap> + use<'a> {
        // sorted_by_key collects, so the iterator does not borrow driver_id
        self.laps
            .iter()
            .filter(|lap| lap.driver_id() == driver_id)
            .sorted_by_key(|lap| lap.lap_number())
    }

    /// Telemetry for a single lap, sorted by ascending distance.
    pub fn lap_telemetry(
        &self,
        driver_id: &str,
        lap_number: u32,
    ) -> Result<&[TelemetrySample], InsightsError> {
        let lap = self
            .laps_for(driver_id)
            .find(|lap| lap.lap_number() == lap_number)
            .ok_or_else(|| InsightsError::NoLapData {
                driver: driver_id.to_string(),
                lap: lap_number,
            })?;
        if lap.telemetry.is_empty() {
            return Err(InsightsError::NoLapData {
                driver: driver_id.to_string(),
                lap: lap_number,
            });
        }
        Ok(&lap.telemetry)
    }

    /// The lap with the lowest valid lap time for `driver_id`.
    pub fn fastest_lap(&self, driver_id: &str) -> Option<&Lap> {
        self.laps_for(driver_id)
            .filter_map(|lap| lap.lap_time_s().map(|t| (lap, t)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(lap, _)| lap)
    }

    /// Every sample of `driver_id` across all laps.
    pub fn samples_for<'a>(
        &'a self,
        driver_id: &str,
    ) -> impl Iterator<Item = &'a TelemetrySample> + use<'a> {
        self.laps_for(driver_id).flat_map(|lap| lap.telemetry.iter())
    }
}
