// Library interface for race-insights
// The binary and the integration tests both go through these modules.

pub mod analysis;
pub mod config;
pub mod errors;
pub mod export;
pub mod reference;
pub mod render;
pub mod telemetry;
pub mod worker;

// Re-export commonly used types
pub use analysis::{
    AnalysisMode, AnalysisOutput, AnalysisRequest, DriverSelection, SectorPairing, SectorResult,
    run_analysis,
};
pub use config::AppConfig;
pub use errors::InsightsError;
pub use reference::ReferenceData;
pub use telemetry::{CachedSessionProvider, Session, SessionKey, SessionType, TelemetryProvider};
pub use worker::{AnalysisTask, spawn_analysis};
