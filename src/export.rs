use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::errors::InsightsError;

/// The user's desktop, or the home directory on systems without one.
pub fn default_export_dir() -> Option<PathBuf> {
    dirs::desktop_dir().or_else(dirs::home_dir)
}

/// Copy the last rendered plot, byte for byte, to `destination`.
///
/// An existing directory receives a file with the plot's own name; any other
/// path is used as the target file. Returns the path written.
pub fn export_plot(plot_path: &Path, destination: &Path) -> Result<PathBuf, InsightsError> {
    if !plot_path.is_file() {
        return Err(InsightsError::NoPlotToExport {
            path: format!("{:?}", plot_path),
        });
    }

    let target = if destination.is_dir() {
        match plot_path.file_name() {
            Some(name) => destination.join(name),
            None => destination.join("plot.png"),
        }
    } else {
        destination.to_path_buf()
    };

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| InsightsError::ExportError { source: e })?;
    }
    fs::copy(plot_path, &target).map_err(|e| InsightsError::ExportError { source: e })?;
    info!("Exported plot to {:?}", target);
    Ok(target)
}
