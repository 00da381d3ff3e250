// Reference datasets that populate the selectors: venues and drivers per
// season, and the number of laps run at each venue.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, warn};

use crate::errors::InsightsError;

pub const SELECT_LAP: &str = "Select Lap";
pub const NO_LAPS_FOUND: &str = "No Laps Found";

const EVENTS_FILE: &str = "events.csv";
const DRIVERS_FILE: &str = "drivers.csv";
const LAPS_FILE: &str = "laps.csv";

/// Columns of a season table, keyed by header.
#[derive(Debug, Default, Clone, PartialEq)]
struct SeasonTable {
    headers: Vec<String>,
    columns: HashMap<String, Vec<String>>,
}

impl SeasonTable {
    fn column(&self, season: u32) -> Vec<String> {
        self.columns
            .get(&season.to_string())
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReferenceData {
    events: SeasonTable,
    drivers: SeasonTable,
    laps: HashMap<String, u32>,
}

impl ReferenceData {
    /// Load the three datasets from `dir`. A dataset that cannot be read is
    /// left empty so the matching selectors simply have no options.
    pub fn load(dir: &Path) -> Self {
        let events = read_season_table(&dir.join(EVENTS_FILE)).unwrap_or_else(|e| {
            warn!("{}", e);
            SeasonTable::default()
        });
        let drivers = read_season_table(&dir.join(DRIVERS_FILE)).unwrap_or_else(|e| {
            warn!("{}", e);
            SeasonTable::default()
        });
        let laps = read_lap_counts(&dir.join(LAPS_FILE)).unwrap_or_else(|e| {
            warn!("{}", e);
            HashMap::new()
        });
        debug!(
            "Loaded reference data: {} seasons, {} venues with lap counts",
            events.headers.len(),
            laps.len()
        );
        Self {
            events,
            drivers,
            laps,
        }
    }

    /// Seasons in the order of the events table columns.
    pub fn seasons(&self) -> Vec<u32> {
        self.events
            .headers
            .iter()
            .filter_map(|header| header.trim().parse().ok())
            .collect()
    }

    pub fn venues(&self, season: u32) -> Vec<String> {
        self.events.column(season)
    }

    pub fn drivers(&self, season: u32) -> Vec<String> {
        self.drivers.column(season)
    }

    pub fn lap_count(&self, venue: &str) -> Option<u32> {
        self.laps.get(venue.trim()).copied()
    }

    /// Entries of the lap selector for `venue`.
    pub fn lap_options(&self, venue: &str) -> Vec<String> {
        match self.lap_count(venue) {
            Some(laps) => std::iter::once(SELECT_LAP.to_string())
                .chain((1..=laps).map(|lap| lap.to_string()))
                .collect(),
            None => vec![NO_LAPS_FOUND.to_string()],
        }
    }
}

fn reference_error(path: &Path, e: impl ToString) -> InsightsError {
    InsightsError::ReferenceDataError {
        path: format!("{:?}", path),
        reason: e.to_string(),
    }
}

/// First column is a row index, every other column is a season.
fn read_season_table(path: &Path) -> Result<SeasonTable, InsightsError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| reference_error(path, e))?;

    let headers = reader
        .headers()
        .map_err(|e| reference_error(path, e))?
        .iter()
        .skip(1)
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();

    let mut columns: HashMap<String, Vec<String>> = HashMap::new();
    for record in reader.records() {
        let record = record.map_err(|e| reference_error(path, e))?;
        for (header, cell) in headers.iter().zip(record.iter().skip(1)) {
            let cell = cell.trim();
            if !cell.is_empty() {
                columns.entry(header.clone()).or_default().push(cell.to_string());
            }
        }
    }
    Ok(SeasonTable { headers, columns })
}

fn read_lap_counts(path: &Path) -> Result<HashMap<String, u32>, InsightsError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| reference_error(path, e))?;
    let headers = reader
        .headers()
        .map_err(|e| reference_error(path, e))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (Some(event_idx), Some(laps_idx)) = (column("event"), column("laps")) else {
        return Err(reference_error(path, "expected `event` and `laps` columns"));
    };

    let mut laps = HashMap::new();
    for record in reader.records() {
        let record = record.map_err(|e| reference_error(path, e))?;
        let (Some(event), Some(count)) = (record.get(event_idx), record.get(laps_idx)) else {
            continue;
        };
        match parse_lap_count(count) {
            // the first row wins for repeated venues
            Some(count) => {
                laps.entry(event.trim().to_string()).or_insert(count);
            }
            None => warn!("Ignoring lap count {:?} for {}", count, event),
        }
    }
    Ok(laps)
}

// Counts written by spreadsheet tools can come out as `58.0`
fn parse_lap_count(value: &str) -> Option<u32> {
    let value = value.trim();
    value.parse::<u32>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0. && v.fract() == 0.)
            .map(|v| v as u32)
    })
}
