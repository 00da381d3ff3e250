// Error types for race-insights

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum InsightsError {
    // Session data access errors
    #[snafu(display("No session data for {season} {venue} {session}"))]
    SessionNotFound {
        season: u32,
        venue: String,
        session: String,
    },
    #[snafu(display("No telemetry for driver {driver} on lap {lap}"))]
    NoLapData { driver: String, lap: u32 },
    #[snafu(display("Error loading session file"))]
    SessionLoaderError { source: io::Error },
    #[snafu(display("Invalid session file {path}: {reason}"))]
    InvalidSessionFile { path: String, reason: String },
    #[snafu(display("Upstream request to {url} failed: {reason}"))]
    UpstreamFetchError { url: String, reason: String },
    #[snafu(display("Error writing session cache"))]
    CacheWriteError { source: io::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error accessing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // Reference dataset errors
    #[snafu(display("Reference dataset {path} could not be read: {reason}"))]
    ReferenceDataError { path: String, reason: String },

    // User input validation errors
    #[snafu(display("Invalid user input: {field} - {reason}"))]
    InvalidUserInput { field: String, reason: String },

    // Rendering and output errors
    #[snafu(display("Plot rendering failed: {reason}"))]
    RenderError { reason: String },
    #[snafu(display("Error writing plot file"))]
    PlotWriteError { source: io::Error },
    #[snafu(display("No plot has been generated yet at {path}"))]
    NoPlotToExport { path: String },
    #[snafu(display("Error exporting plot file"))]
    ExportError { source: io::Error },

    // Background analysis errors
    #[snafu(display("Analysis worker stopped before reporting a result"))]
    WorkerDisconnected,
}
