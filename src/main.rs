mod ui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use egui::Vec2;
use log::{error, info, warn};

use race_insights::analysis::{AnalysisMode, AnalysisOutput, AnalysisRequest, DriverSelection, SectorPairing};
use race_insights::config::AppConfig;
use race_insights::errors::InsightsError;
use race_insights::export::{default_export_dir, export_plot};
use race_insights::reference::ReferenceData;
use race_insights::telemetry::SessionType;
use race_insights::worker::spawn_analysis;
use ui::RaceInsightsApp;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Config file, defaults to the user config directory
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare two drivers and render the plot
    Analyze {
        #[arg(short, long)]
        year: u32,

        #[arg(short, long)]
        venue: String,

        #[arg(short, long, value_enum, default_value_t = SessionType::Race)]
        session: SessionType,

        #[arg(long)]
        driver1: String,

        #[arg(long)]
        driver2: String,

        #[arg(short, long, value_enum, default_value_t = AnalysisMode::LapTime)]
        mode: AnalysisMode,

        /// Lap shown on the mini-sector map
        #[arg(short, long)]
        lap: Option<u32>,

        /// How mini-sector averages of the two drivers are matched
        #[arg(long, value_enum, default_value_t = SectorPairing::Positional)]
        pairing: SectorPairing,
    },
    /// List selector options from the reference datasets
    Options {
        #[arg(short, long)]
        year: Option<u32>,

        #[arg(short, long)]
        venue: Option<String>,
    },
    /// Copy the last rendered plot
    Export {
        /// Directory or file, the desktop when omitted
        destination: Option<PathBuf>,
    },
    /// Open the desktop window
    Gui,
}

fn analyze(config: &AppConfig, request: AnalysisRequest) -> Result<AnalysisOutput, InsightsError> {
    let reference = ReferenceData::load(&config.reference_dir);
    request.validate(&reference.seasons())?;
    spawn_analysis(request, config).wait()
}

fn print_summary(request: &AnalysisRequest, output: &AnalysisOutput) {
    let (width, height) = output.pixel_size;
    println!(
        "{} plot written to {} ({}x{} px)",
        output.mode,
        output.plot_path.display(),
        width,
        height
    );
    if output.sector_results.is_empty() {
        return;
    }
    for driver in [&request.driver1, &request.driver2] {
        let wins = output
            .sector_results
            .iter()
            .filter(|r| r.fastest_driver_id == driver.code())
            .count();
        println!(
            "{}: fastest in {} of {} mini-sectors",
            driver.label,
            wins,
            output.sector_results.len()
        );
    }
}

fn options(config: &AppConfig, year: Option<u32>, venue: Option<&str>) {
    let reference = ReferenceData::load(&config.reference_dir);
    match year {
        None => {
            let seasons = reference.seasons();
            if seasons.is_empty() {
                warn!("No seasons found in {:?}", config.reference_dir);
            }
            for season in seasons {
                println!("{}", season);
            }
        }
        Some(year) => {
            println!("Venues:");
            for venue in reference.venues(year) {
                println!("  {}", venue);
            }
            println!("Drivers:");
            for driver in reference.drivers(year) {
                println!("  {}", driver);
            }
        }
    }
    if let Some(venue) = venue {
        println!("Laps at {}: {}", venue, reference.lap_options(venue).join(", "));
    }
}

fn export(config: &AppConfig, destination: Option<PathBuf>) -> Result<PathBuf, InsightsError> {
    let destination = destination
        .or_else(|| config.export_dir.clone())
        .or_else(default_export_dir)
        .ok_or_else(|| InsightsError::InvalidUserInput {
            field: "destination".to_string(),
            reason: "no desktop or home directory, pass a destination".to_string(),
        })?;
    export_plot(&config.plot_path(), &destination)
}

fn gui(config: AppConfig) {
    let reference = ReferenceData::load(&config.reference_dir);
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options.viewport.with_inner_size(Vec2::new(960., 720.));

    if let Err(e) = eframe::run_native(
        "Race Insights",
        native_options,
        Box::new(|cc| Ok(Box::new(RaceInsightsApp::new(cc, config, reference)))),
    ) {
        error!("Could not start app: {}", e);
    }
}

fn main() {
    colog::init();

    let cli = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .unwrap_or_else(|e| warn!("Could not set Ctrl-C handler: {}", e));

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Could not read config: {}", e);
            std::process::exit(1);
        }
    };
    info!("Using session cache {:?}", config.cache_dir);

    let result = match cli.command {
        Commands::Analyze {
            year,
            venue,
            session,
            driver1,
            driver2,
            mode,
            lap,
            pairing,
        } => {
            let request = AnalysisRequest {
                season: year,
                venue,
                session_type: session,
                driver1: DriverSelection::new(driver1),
                driver2: DriverSelection::new(driver2),
                mode,
                lap,
                pairing,
            };
            analyze(&config, request.clone()).map(|output| print_summary(&request, &output))
        }
        Commands::Options { year, venue } => {
            options(&config, year, venue.as_deref());
            Ok(())
        }
        Commands::Export { destination } => {
            export(&config, destination).map(|path| println!("Plot exported to {}", path.display()))
        }
        Commands::Gui => {
            gui(config);
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
