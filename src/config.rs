use std::fs::{self, File};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::InsightsError;

const APP_DIR_NAME: &str = "race-insights";
const CONFIG_FILE_NAME: &str = "config.json";
const PLOT_FILE_NAME: &str = "plot.png";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the session cache
    pub cache_dir: PathBuf,
    /// Directory holding events.csv, drivers.csv and laps.csv
    pub reference_dir: PathBuf,
    pub plot_dir: PathBuf,
    /// Export destination, the desktop when unset
    pub export_dir: Option<PathBuf>,
    /// Base URL of a mirror serving session files with the cache layout
    pub upstream_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: dirs::cache_dir()
                .map(|dir| dir.join(APP_DIR_NAME).join("sessions"))
                .unwrap_or_else(|| PathBuf::from("cache")),
            reference_dir: PathBuf::from("data"),
            plot_dir: PathBuf::from("plot"),
            export_dir: None,
            upstream_url: None,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Read the config at `path`, or at the default location when `None`.
    /// A missing file gives the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, InsightsError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        if !config_path.exists() {
            debug!("No config file at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }
        let file =
            File::open(&config_path).map_err(|e| InsightsError::ConfigIOError { source: e })?;
        serde_json::from_reader(file).map_err(|e| InsightsError::ConfigSerializeError { source: e })
    }

    pub fn save(&self, path: Option<&Path>) -> Result<(), InsightsError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path().ok_or(InsightsError::NoConfigDir)?,
        };

        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| InsightsError::ConfigIOError { source: e })?;
        }

        let file =
            File::create(config_path).map_err(|e| InsightsError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| InsightsError::ConfigSerializeError { source: e })
    }

    /// Every run overwrites the image at this path.
    pub fn plot_path(&self) -> PathBuf {
        self.plot_dir.join(PLOT_FILE_NAME)
    }
}
