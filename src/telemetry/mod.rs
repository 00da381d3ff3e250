pub mod provider;
pub mod session;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use provider::{CachedSessionProvider, TelemetryProvider};
pub use session::{Lap, Session};

/// The timed track activities a session file can describe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum SessionType {
    Race,
    Qualifying,
    #[value(name = "fp1")]
    FP1,
    #[value(name = "fp2")]
    FP2,
    #[value(name = "fp3")]
    FP3,
}

impl SessionType {
    pub const ALL: [SessionType; 5] = [
        SessionType::Race,
        SessionType::Qualifying,
        SessionType::FP1,
        SessionType::FP2,
        SessionType::FP3,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Race => "Race",
            Self::Qualifying => "Qualifying",
            Self::FP1 => "FP1",
            Self::FP2 => "FP2",
            Self::FP3 => "FP3",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifies one session in the cache.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub season: u32,
    pub venue: String,
    pub session_type: SessionType,
}

impl SessionKey {
    pub fn new(season: u32, venue: impl Into<String>, session_type: SessionType) -> Self {
        Self {
            season,
            venue: venue.into(),
            session_type,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySample {
    /// Meters traveled from the start of the lap
    pub distance: f64,
    /// Seconds elapsed since the start of the lap
    #[serde(default)]
    pub time_s: f64,
    /// Car speed in km/h
    pub speed: f64,
    /// Track-relative position
    pub x: f64,
    pub y: f64,
    /// Throttle use. 0=off throttle to 100=full throttle
    pub throttle: f64,
    pub brake: bool,
    pub rpm: f64,
    pub gear: i32,
    pub lap_number: u32,
    pub driver_id: String,
}

impl Default for TelemetrySample {
    fn default() -> Self {
        Self {
            distance: 0.,
            time_s: 0.,
            speed: 0.,
            x: 0.,
            y: 0.,
            throttle: 0.,
            brake: false,
            rpm: 0.,
            gear: 0,
            lap_number: 0,
            driver_id: String::new(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct LapRecord {
    pub driver_id: String,
    pub lap_number: u32,
    /// Missing for laps without a valid time (in/out laps, red flags)
    #[serde(default)]
    pub lap_time_s: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EventInfo {
    pub season: u32,
    pub venue: String,
    pub session_type: SessionType,
    /// Official event name, e.g. "Italian Grand Prix"
    pub event_name: String,
}

impl Default for EventInfo {
    fn default() -> Self {
        Self {
            season: 0,
            venue: "Unknown".to_string(),
            session_type: SessionType::Race,
            event_name: "Unknown".to_string(),
        }
    }
}

/// One line of a cached session file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SessionRecord {
    Event(EventInfo),
    Lap(LapRecord),
    Sample(TelemetrySample),
}
