// The four comparison plots. Each one clears the figure it is given before drawing.

use std::collections::HashMap;

use log::{debug, warn};

use super::delta::delta_time;
use super::minisectors::{MiniSectorBins, aggregate_minisectors};
use super::sector_battle::{SectorResult, resolve_sector_battle};
use super::{AnalysisMode, AnalysisRequest};
use crate::render::{Color, Figure, LegendPosition, Segment, TickFormat, driver_pair_colors};
use crate::telemetry::{Session, TelemetrySample};

fn prepare(figure: &mut Figure, mode: AnalysisMode) {
    figure.clear();
    figure.set_size(mode.figure_size());
    figure.set_dpi(mode.dpi());
}

fn driver_colors(request: &AnalysisRequest) -> (Color, Color) {
    driver_pair_colors(&request.driver1.label, &request.driver2.label)
}

fn session_caption(session: &Session, request: &AnalysisRequest) -> String {
    format!(
        "{} {} {}",
        request.season, session.info.event_name, request.session_type
    )
}

fn series(
    telemetry: &[TelemetrySample],
    value: impl Fn(&TelemetrySample) -> f64,
) -> Vec<(f64, f64)> {
    telemetry.iter().map(|s| (s.distance, value(s))).collect()
}

fn fastest_lap_telemetry<'a>(session: &'a Session, driver_id: &str) -> &'a [TelemetrySample] {
    match session.fastest_lap(driver_id) {
        Some(lap) => &lap.telemetry,
        None => {
            warn!("No timed lap for driver {}, plotting an empty series", driver_id);
            &[]
        }
    }
}

/// Lap time against lap number for both drivers.
pub fn compare_lap_times(figure: &mut Figure, session: &Session, request: &AnalysisRequest) {
    prepare(figure, AnalysisMode::LapTime);
    let (c1, c2) = driver_colors(request);
    let caption = session_caption(session, request);

    let axes = figure.single_axes();
    for (driver, color) in [(&request.driver1, c1), (&request.driver2, c2)] {
        let points = session
            .laps_for(driver.code())
            .filter_map(|lap| lap.lap_time_s().map(|t| (lap.lap_number() as f64, t)))
            .collect::<Vec<_>>();
        if points.is_empty() {
            warn!("No timed laps for driver {}", driver.code());
        }
        axes.plot(points, color).label(driver.label.clone());
    }
    axes.set_xlabel("Lap");
    axes.set_ylabel("Time");
    axes.set_y_format(TickFormat::LapTime);
    axes.legend(LegendPosition::UpperRight);

    figure.suptitle(format!("Lap Time Comparison\n{}", caption));
}

/// Speed against distance on each driver's fastest lap.
pub fn compare_fastest_laps(figure: &mut Figure, session: &Session, request: &AnalysisRequest) {
    prepare(figure, AnalysisMode::FastestLap);
    let (c1, c2) = driver_colors(request);
    let caption = session_caption(session, request);

    let axes = figure.single_axes();
    for (driver, color) in [(&request.driver1, c1), (&request.driver2, c2)] {
        let telemetry = fastest_lap_telemetry(session, driver.code());
        axes.plot(series(telemetry, |s| s.speed), color)
            .label(driver.label.clone());
    }
    axes.set_xlabel("Distance (m)");
    axes.set_ylabel("Speed (km/h)");
    axes.legend(LegendPosition::UpperRight);

    figure.suptitle(format!("Fastest Lap Comparison\n{}", caption));
}

/// Track map of one lap colored by the driver who won each mini-sector.
///
/// Mini-sectors are computed over every lap of both drivers; the map shows
/// the outline of `lap_number` from the first driver's position data, or the
/// second driver's when the first has none. Returns the resolved winners.
pub fn visualize_fastest_sectors(
    figure: &mut Figure,
    session: &Session,
    request: &AnalysisRequest,
    lap_number: u32,
) -> Vec<SectorResult> {
    prepare(figure, AnalysisMode::FastestSectors);
    let (c1, c2) = driver_colors(request);
    let (d1, d2) = (request.driver1.code(), request.driver2.code());

    let samples = session
        .samples_for(d1)
        .chain(session.samples_for(d2))
        .collect::<Vec<_>>();
    let minisectors = aggregate_minisectors(samples.iter().copied());
    let results = resolve_sector_battle(&minisectors, d1, d2, request.pairing);
    debug!(
        "Resolved {} mini-sectors out of {} averages",
        results.len(),
        minisectors.len()
    );

    let winners: HashMap<(u32, u8), Color> = results
        .iter()
        .map(|r| {
            let color = if r.fastest_driver_id == d1 { c1 } else { c2 };
            ((r.lap_number, r.minisector_index), color)
        })
        .collect();

    let lap_samples: &[TelemetrySample] = match session
        .lap_telemetry(d1, lap_number)
        .or_else(|_| session.lap_telemetry(d2, lap_number))
    {
        Ok(samples) => samples,
        Err(e) => {
            warn!("{}, drawing an empty track map", e);
            &[]
        }
    };

    let segments = match MiniSectorBins::from_samples(samples.iter().copied()) {
        Some(bins) => {
            let colored = lap_samples
                .iter()
                .filter_map(|s| {
                    winners
                        .get(&(s.lap_number, bins.index_of(s.distance)))
                        .map(|color| ((s.x, s.y), *color))
                })
                .collect::<Vec<_>>();
            colored
                .windows(2)
                .map(|pair| Segment {
                    from: pair[0].0,
                    to: pair[1].0,
                    color: pair[0].1,
                })
                .collect::<Vec<_>>()
        }
        None => Vec::new(),
    };

    let caption = session_caption(session, request);
    let axes = figure.single_axes();
    axes.add_segments(segments, 2.);
    axes.set_equal_aspect();
    axes.hide_axis();
    axes.legend_with_entries(
        vec![
            (request.driver1.label.clone(), c1),
            (request.driver2.label.clone(), c2),
        ],
        LegendPosition::UpperRight,
        10.,
    );
    figure.suptitle(format!(
        "Fastest Minisectors (Lap {})\n{}",
        lap_number, caption
    ));
    results
}

/// Six stacked channels on both fastest laps: delta, speed, throttle, brake, RPM, gear.
pub fn compare_full_telemetry(figure: &mut Figure, session: &Session, request: &AnalysisRequest) {
    prepare(figure, AnalysisMode::FullTelemetry);
    let (c1, c2) = driver_colors(request);
    let caption = session_caption(session, request);
    let tel1 = fastest_lap_telemetry(session, request.driver1.code());
    let tel2 = fastest_lap_telemetry(session, request.driver2.code());
    let delta = delta_time(tel1, tel2);

    let axes = figure.subplots(6, true);
    axes[0].plot(delta, c2).width(0.8);
    for (telemetry, color) in [(tel1, c1), (tel2, c2)] {
        axes[1].plot(series(telemetry, |s| s.speed), color);
        axes[2].plot(series(telemetry, |s| s.throttle), color);
        axes[3].plot(series(telemetry, |s| if s.brake { 1. } else { 0. }), color);
        axes[4].plot(series(telemetry, |s| s.rpm), color);
        axes[5].plot(series(telemetry, |s| s.gear as f64), color);
    }
    let labels = ["Delta (s)", "Speed", "Throttle", "Brake", "RPM", "Gear"];
    for (ax, label) in axes.iter_mut().zip(labels) {
        ax.set_ylabel(label);
    }
    axes[5].set_xlabel("Distance (m)");
    axes[0].legend_with_entries(
        vec![
            (request.driver1.label.clone(), c1),
            (request.driver2.label.clone(), c2),
        ],
        LegendPosition::LowerRight,
        6.,
    );

    figure.suptitle(format!(
        "Telemetry Comparison\n{} vs {} - {}",
        request.driver1.label, request.driver2.label, caption
    ));
}
