pub mod delta;
pub mod minisectors;
pub mod plots;
pub mod sector_battle;

use std::fmt;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::InsightsError;
use crate::render::{Figure, FigureSize};
use crate::telemetry::{SessionKey, SessionType, TelemetryProvider};

pub use minisectors::{MINISECTOR_COUNT, MiniSector, MiniSectorBins, aggregate_minisectors};
pub use sector_battle::{SectorPairing, SectorResult, resolve_sector_battle};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum AnalysisMode {
    LapTime,
    FastestLap,
    FastestSectors,
    FullTelemetry,
}

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 4] = [
        AnalysisMode::LapTime,
        AnalysisMode::FastestLap,
        AnalysisMode::FastestSectors,
        AnalysisMode::FullTelemetry,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::LapTime => "Lap Time",
            Self::FastestLap => "Fastest Lap",
            Self::FastestSectors => "Fastest Sectors",
            Self::FullTelemetry => "Full Telemetry",
        }
    }

    /// Output resolution of the rendered image.
    pub fn dpi(&self) -> u32 {
        match self {
            Self::FastestLap => 700,
            Self::LapTime | Self::FastestSectors | Self::FullTelemetry => 200,
        }
    }

    pub fn figure_size(&self) -> FigureSize {
        match self {
            Self::FastestSectors => FigureSize::new(6.25, 4.70),
            _ => FigureSize::DEFAULT,
        }
    }

    pub fn requires_lap(&self) -> bool {
        matches!(self, Self::FastestSectors)
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A driver as picked in a selector, e.g. `VER Max Verstappen`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverSelection {
    pub label: String,
}

impl DriverSelection {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into().trim().to_string(),
        }
    }

    /// Driver identifier used in the session data: the first word of the label.
    pub fn code(&self) -> &str {
        self.label.split_whitespace().next().unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub season: u32,
    pub venue: String,
    pub session_type: SessionType,
    pub driver1: DriverSelection,
    pub driver2: DriverSelection,
    pub mode: AnalysisMode,
    /// Only used by the mini-sector map
    pub lap: Option<u32>,
    #[serde(default)]
    pub pairing: SectorPairing,
}

impl AnalysisRequest {
    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(self.season, self.venue.clone(), self.session_type)
    }

    /// Check the selection before any data is loaded.
    ///
    /// `known_seasons` comes from the reference datasets; when it is empty the
    /// season is not checked against it.
    pub fn validate(&self, known_seasons: &[u32]) -> Result<(), InsightsError> {
        if !known_seasons.is_empty() && !known_seasons.contains(&self.season) {
            return Err(invalid_input(
                "season",
                format!("{} is not an available season", self.season),
            ));
        }
        if self.venue.trim().is_empty() {
            return Err(invalid_input("venue", "a venue must be selected"));
        }
        if self.driver1.code().is_empty() {
            return Err(invalid_input("driver1", "a first driver must be selected"));
        }
        if self.driver2.code().is_empty() {
            return Err(invalid_input("driver2", "a second driver must be selected"));
        }
        if self.mode.requires_lap() {
            match self.lap {
                None => {
                    return Err(invalid_input(
                        "lap",
                        format!("{} needs a lap number", self.mode),
                    ));
                }
                Some(0) => return Err(invalid_input("lap", "laps are numbered from 1")),
                Some(_) => {}
            }
        }
        Ok(())
    }
}

fn invalid_input(field: &str, reason: impl Into<String>) -> InsightsError {
    InsightsError::InvalidUserInput {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Result of a completed analysis run.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisOutput {
    pub plot_path: PathBuf,
    pub mode: AnalysisMode,
    pub pixel_size: (u32, u32),
    /// Mini-sector winners, only filled by the mini-sector map
    pub sector_results: Vec<SectorResult>,
}

/// Load the session, draw the requested comparison and write it to `plot_path`.
pub fn run_analysis(
    provider: &dyn TelemetryProvider,
    request: &AnalysisRequest,
    plot_path: &Path,
) -> Result<AnalysisOutput, InsightsError> {
    info!(
        "Running {} analysis for {} vs {} at {} {} {}",
        request.mode,
        request.driver1.code(),
        request.driver2.code(),
        request.season,
        request.venue,
        request.session_type
    );
    let session = provider.load(&request.session_key())?;

    // every run draws on its own figure
    let mut figure = Figure::new(request.mode.figure_size(), request.mode.dpi());
    let mut sector_results = Vec::new();
    match request.mode {
        AnalysisMode::LapTime => plots::compare_lap_times(&mut figure, &session, request),
        AnalysisMode::FastestLap => plots::compare_fastest_laps(&mut figure, &session, request),
        AnalysisMode::FastestSectors => {
            let lap = request.lap.ok_or_else(|| invalid_input("lap", "missing lap number"))?;
            sector_results = plots::visualize_fastest_sectors(&mut figure, &session, request, lap);
        }
        AnalysisMode::FullTelemetry => {
            plots::compare_full_telemetry(&mut figure, &session, request)
        }
    }

    figure.save(plot_path)?;
    info!("Wrote {} plot to {:?}", request.mode, plot_path);
    Ok(AnalysisOutput {
        plot_path: plot_path.to_path_buf(),
        mode: request.mode,
        pixel_size: figure.pixel_size(),
        sector_results,
    })
}
