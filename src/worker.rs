// Runs an analysis on its own thread so the caller (the GUI event loop in
// particular) stays responsive. The outcome comes back over a channel.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use log::debug;

use crate::analysis::{AnalysisOutput, AnalysisRequest, run_analysis};
use crate::config::AppConfig;
use crate::errors::InsightsError;
use crate::telemetry::{CachedSessionProvider, TelemetryProvider};

pub type AnalysisResult = Result<AnalysisOutput, InsightsError>;

/// Handle to an analysis running in the background.
pub struct AnalysisTask {
    result_rx: Receiver<AnalysisResult>,
}

impl AnalysisTask {
    /// The outcome if the worker has finished, `None` while it is still running.
    pub fn try_result(&self) -> Option<AnalysisResult> {
        match self.result_rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(InsightsError::WorkerDisconnected)),
        }
    }

    /// Block until the worker reports.
    pub fn wait(self) -> AnalysisResult {
        self.result_rx
            .recv()
            .map_err(|_| InsightsError::WorkerDisconnected)?
    }
}

/// Start an analysis against the session cache described by `config`.
pub fn spawn_analysis(request: AnalysisRequest, config: &AppConfig) -> AnalysisTask {
    let provider = CachedSessionProvider::new(config.cache_dir.clone())
        .with_upstream(config.upstream_url.clone());
    spawn_analysis_with(provider, request, config.plot_path())
}

pub fn spawn_analysis_with<P>(provider: P, request: AnalysisRequest, plot_path: PathBuf) -> AnalysisTask
where
    P: TelemetryProvider + Send + 'static,
{
    let (result_tx, result_rx) = mpsc::channel::<AnalysisResult>();
    thread::spawn(move || {
        let result = run_analysis(&provider, &request, &plot_path);
        if result_tx.send(result).is_err() {
            debug!("Analysis finished after its task handle was dropped");
        }
    });
    AnalysisTask { result_rx }
}
