// Desktop window: selectors, run button, plot view and export.

use egui::{Align, Color32, ComboBox, Frame, Image, Layout, Margin, RichText, Ui};
use log::{error, info};

use race_insights::analysis::{AnalysisMode, AnalysisOutput, AnalysisRequest, DriverSelection};
use race_insights::config::AppConfig;
use race_insights::export::{default_export_dir, export_plot};
use race_insights::reference::ReferenceData;
use race_insights::telemetry::SessionType;
use race_insights::worker::{AnalysisTask, spawn_analysis};

pub(crate) const PALETTE_BLACK: Color32 = Color32::from_rgb(12, 12, 12);
pub(crate) const PALETTE_ORANGE: Color32 = Color32::from_rgb(242, 97, 63);

const SELECT_YEAR: &str = "Select Year";
const SELECT_VENUE: &str = "Select";
const PLOT_VIEW_WIDTH: f32 = 640.;

enum RunStatus {
    Idle,
    InvalidYear,
    Running { task: AnalysisTask },
    Finished { output: AnalysisOutput },
    Failed { message: String },
}

pub(crate) struct RaceInsightsApp {
    config: AppConfig,
    reference: ReferenceData,

    year: String,
    venue: String,
    session_type: SessionType,
    driver1: String,
    driver2: String,
    mode: AnalysisMode,
    lap: String,

    venues: Vec<String>,
    drivers: Vec<String>,
    lap_options: Vec<String>,

    status: RunStatus,
    has_run: bool,
    export_message: Option<String>,
}

impl RaceInsightsApp {
    pub(crate) fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        reference: ReferenceData,
    ) -> Self {
        // PNG and file:// support for the plot view
        egui_extras::install_image_loaders(&cc.egui_ctx);

        Self {
            config,
            reference,
            year: SELECT_YEAR.to_string(),
            venue: SELECT_VENUE.to_string(),
            session_type: SessionType::Race,
            driver1: String::new(),
            driver2: String::new(),
            mode: AnalysisMode::LapTime,
            lap: String::new(),
            venues: Vec::new(),
            drivers: Vec::new(),
            lap_options: Vec::new(),
            status: RunStatus::Idle,
            has_run: false,
            export_message: None,
        }
    }

    fn year_options(&self) -> Vec<String> {
        std::iter::once(SELECT_YEAR.to_string())
            .chain(self.reference.seasons().iter().map(|s| s.to_string()))
            .collect()
    }

    fn update_dropdowns(&mut self) {
        let Ok(season) = self.year.parse::<u32>() else {
            return;
        };
        self.venues = self.reference.venues(season);
        self.drivers = self.reference.drivers(season);
        self.venue = self.venues.first().cloned().unwrap_or_default();
        self.driver1 = self.drivers.first().cloned().unwrap_or_default();
        self.driver2 = self.drivers.first().cloned().unwrap_or_default();
        self.update_lap_selector();
    }

    fn update_lap_selector(&mut self) {
        self.lap_options = if self.venue.is_empty() || self.venue == SELECT_VENUE {
            Vec::new()
        } else {
            self.reference.lap_options(&self.venue)
        };
        self.lap = self.lap_options.first().cloned().unwrap_or_default();
    }

    fn is_running(&self) -> bool {
        matches!(self.status, RunStatus::Running { .. })
    }

    fn run_button_text(&self) -> &'static str {
        match self.status {
            RunStatus::Running { .. } => "Running...",
            RunStatus::InvalidYear => "⚠ Select Valid Year",
            _ if self.has_run => "▶ RUN NEW ANALYSIS",
            _ => "▶ START ANALYSIS",
        }
    }

    fn plot_uri(&self) -> String {
        format!("file://{}", self.config.plot_path().display())
    }

    fn start_analysis(&mut self, ctx: &egui::Context) {
        let Ok(season) = self.year.parse::<u32>() else {
            self.status = RunStatus::InvalidYear;
            return;
        };
        let request = AnalysisRequest {
            season,
            venue: self.venue.clone(),
            session_type: self.session_type,
            driver1: DriverSelection::new(self.driver1.as_str()),
            driver2: DriverSelection::new(self.driver2.as_str()),
            mode: self.mode,
            lap: self.lap.parse().ok(),
            pairing: Default::default(),
        };
        if let Err(e) = request.validate(&self.reference.seasons()) {
            self.status = RunStatus::Failed {
                message: e.to_string(),
            };
            return;
        }

        // the plot file is rewritten in place, drop the cached texture
        ctx.forget_image(&self.plot_uri());
        self.export_message = None;
        self.status = RunStatus::Running {
            task: spawn_analysis(request, &self.config),
        };
    }

    fn poll_worker(&mut self) {
        let RunStatus::Running { task } = &self.status else {
            return;
        };
        if let Some(result) = task.try_result() {
            self.has_run = true;
            self.status = match result {
                Ok(output) => {
                    info!("Analysis finished, plot at {:?}", output.plot_path);
                    RunStatus::Finished { output }
                }
                Err(e) => {
                    error!("Analysis failed: {}", e);
                    RunStatus::Failed {
                        message: e.to_string(),
                    }
                }
            };
        }
    }

    fn export(&mut self) {
        let mut dialog = rfd::FileDialog::new();
        if let Some(dir) = self.config.export_dir.clone().or_else(default_export_dir) {
            dialog = dialog.set_directory(dir);
        }
        let Some(destination) = dialog.pick_folder() else {
            return;
        };
        self.export_message = Some(match export_plot(&self.config.plot_path(), &destination) {
            Ok(path) => format!("Saved to {}", path.display()),
            Err(e) => format!("Export failed: {}", e),
        });
    }

    fn show_selectors(&mut self, ui: &mut Ui) {
        let year_options = self.year_options();
        if selector(ui, "year_selector", "Year", &mut self.year, &year_options) {
            if matches!(self.status, RunStatus::InvalidYear) {
                self.status = RunStatus::Idle;
            }
            self.update_dropdowns();
        }

        let venues = self.venues.clone();
        if selector(ui, "venue_selector", "Venue", &mut self.venue, &venues) {
            self.update_lap_selector();
        }

        ui.label(RichText::new("Session").color(Color32::WHITE));
        ComboBox::from_id_salt("session_selector")
            .selected_text(self.session_type.label())
            .show_ui(ui, |ui| {
                for session_type in SessionType::ALL {
                    ui.selectable_value(&mut self.session_type, session_type, session_type.label());
                }
            });

        let drivers = self.drivers.clone();
        selector(ui, "driver1_selector", "Driver 1", &mut self.driver1, &drivers);
        selector(ui, "driver2_selector", "Driver 2", &mut self.driver2, &drivers);

        ui.label(RichText::new("Analysis").color(Color32::WHITE));
        ComboBox::from_id_salt("mode_selector")
            .selected_text(self.mode.label())
            .show_ui(ui, |ui| {
                for mode in AnalysisMode::ALL {
                    ui.selectable_value(&mut self.mode, mode, mode.label());
                }
            });

        if self.mode.requires_lap() {
            let lap_options = self.lap_options.clone();
            selector(ui, "lap_selector", "Lap", &mut self.lap, &lap_options);
        }
    }

    fn show_plot(&self, ui: &mut Ui) {
        match &self.status {
            RunStatus::Running { .. } => {
                ui.with_layout(Layout::top_down(Align::Center), |ui| {
                    ui.spinner();
                    ui.label(RichText::new("Loading session data...").color(Color32::WHITE));
                });
            }
            RunStatus::Finished { output } => {
                ui.add(Image::new(self.plot_uri()).max_width(PLOT_VIEW_WIDTH));
                if !output.sector_results.is_empty() {
                    let driver1 = DriverSelection::new(self.driver1.as_str());
                    let wins = output
                        .sector_results
                        .iter()
                        .filter(|r| r.fastest_driver_id == driver1.code())
                        .count();
                    ui.label(
                        RichText::new(format!(
                            "{} won {} of {} mini-sectors",
                            self.driver1,
                            wins,
                            output.sector_results.len()
                        ))
                        .color(Color32::WHITE),
                    );
                }
            }
            RunStatus::Failed { message } => {
                ui.label(RichText::new(message).color(Color32::RED).strong());
            }
            RunStatus::Idle | RunStatus::InvalidYear => {
                ui.label(RichText::new("Pick a session and start an analysis").color(Color32::GRAY));
            }
        }
    }
}

/// A combo box over string options. Returns true when the selection changed.
fn selector(ui: &mut Ui, id: &str, label: &str, selected: &mut String, options: &[String]) -> bool {
    let mut changed = false;
    ui.label(RichText::new(label).color(Color32::WHITE));
    ComboBox::from_id_salt(id)
        .selected_text(selected.clone())
        .show_ui(ui, |ui| {
            for option in options {
                changed |= ui
                    .selectable_value(selected, option.clone(), option.as_str())
                    .changed();
            }
        });
    changed
}

impl eframe::App for RaceInsightsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_worker();

        egui::SidePanel::left("Selectors")
            .frame(Frame::default().fill(PALETTE_BLACK).inner_margin(Margin::same(8)))
            .resizable(false)
            .min_width(220.)
            .show(ctx, |ui| {
                ui.add_enabled_ui(!self.is_running(), |ui| self.show_selectors(ui));
                ui.separator();

                let run = egui::Button::new(
                    RichText::new(self.run_button_text()).color(Color32::WHITE).strong(),
                )
                .fill(PALETTE_ORANGE);
                if ui.add_enabled(!self.is_running(), run).clicked() {
                    self.start_analysis(ctx);
                }

                let has_plot = matches!(self.status, RunStatus::Finished { .. });
                if ui.add_enabled(has_plot, egui::Button::new("💾 Export Plot")).clicked() {
                    self.export();
                }
                if let Some(message) = &self.export_message {
                    ui.label(RichText::new(message).color(Color32::WHITE).small());
                }
            });

        egui::CentralPanel::default()
            .frame(Frame::default().inner_margin(Margin::same(8)))
            .show(ctx, |ui| {
                egui::ScrollArea::both().show(ui, |ui| self.show_plot(ui));
            });

        if self.is_running() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}
