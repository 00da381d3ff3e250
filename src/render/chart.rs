// Figure drawing on plotters drawing areas

use std::error::Error;

use log::{debug, warn};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use plotters_backend::text_anchor::{HPos, Pos, VPos};

use super::{Axes, Figure, LegendPosition, TickFormat};

const TITLE_FONT_PT: f64 = 12.;
const TITLE_LINE_SPACING: f64 = 1.2;
const AXES_MARGIN_PT: f64 = 4.;
const LEGEND_LINE_PT: f64 = 1.5;
/// Data margin added on each side of the plotted range
const DATA_MARGIN: f64 = 0.05;

type DrawResult = Result<(), Box<dyn Error>>;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Range {
    min: f64,
    max: f64,
}

impl Range {
    fn span(&self) -> f64 {
        self.max - self.min
    }

    fn include(&mut self, v: f64) {
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }

    fn padded(&self) -> Range {
        let pad = if self.span() > 0. {
            self.span() * DATA_MARGIN
        } else if self.min == 0. {
            0.5
        } else {
            self.min.abs() * DATA_MARGIN
        };
        Range {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    fn widened_to(&self, span: f64) -> Range {
        let center = (self.min + self.max) / 2.;
        Range {
            min: center - span / 2.,
            max: center + span / 2.,
        }
    }
}

fn data_ranges(axes: &Axes) -> (Option<Range>, Option<Range>) {
    let mut x_range: Option<Range> = None;
    let mut y_range: Option<Range> = None;
    let points = axes
        .lines()
        .iter()
        .flat_map(|line| line.points.iter().copied())
        .chain(
            axes.segments()
                .iter()
                .flat_map(|segment| [segment.from, segment.to]),
        );
    for (x, y) in points.filter(|(x, y)| x.is_finite() && y.is_finite()) {
        x_range.get_or_insert(Range { min: x, max: x }).include(x);
        y_range.get_or_insert(Range { min: y, max: y }).include(y);
    }
    (x_range, y_range)
}

fn points_to_px(pt: f64, px_per_pt: f64) -> u32 {
    (pt * px_per_pt).round().max(1.) as u32
}

fn font(size_px: f64) -> FontDesc<'static> {
    FontDesc::new(FontFamily::SansSerif, size_px, FontStyle::Normal)
}

/// Seconds as `m:ss.sss`.
fn format_lap_time(seconds: f64) -> String {
    let minutes = (seconds / 60.).floor();
    format!("{}:{:06.3}", minutes as i64, seconds - minutes * 60.)
}

pub(super) fn draw_figure<DB>(root: &DrawingArea<DB, Shift>, figure: &Figure) -> DrawResult
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let px_per_pt = figure.dpi() as f64 / 72.;
    let (width, height) = root.dim_in_pixel();
    root.fill(&WHITE)?;

    let title_font = TITLE_FONT_PT * px_per_pt;
    let title_lines = figure
        .title()
        .map(|title| title.lines().collect::<Vec<_>>())
        .unwrap_or_default();
    let title_height = if title_lines.is_empty() {
        0.04 * height as f64
    } else {
        (title_lines.len() as f64 * TITLE_LINE_SPACING + 0.8) * title_font
    };
    let (title_area, body) = root.split_vertically(title_height.round() as u32);

    let title_style = TextStyle::from(font(title_font)).pos(Pos::new(HPos::Center, VPos::Top));
    for (i, line) in title_lines.iter().enumerate() {
        let y = (0.4 + i as f64 * TITLE_LINE_SPACING) * title_font;
        title_area.draw_text(line, &title_style, (width as i32 / 2, y.round() as i32))?;
    }

    let axes_count = figure.axes().len();
    if axes_count > 0 {
        let shared_x = if figure.share_x {
            figure
                .axes()
                .iter()
                .filter_map(|axes| data_ranges(axes).0)
                .reduce(|mut acc, r| {
                    acc.include(r.min);
                    acc.include(r.max);
                    acc
                })
        } else {
            None
        };
        let font_pt = if axes_count > 2 { 6. } else { 9. };
        let areas = body.split_evenly((axes_count, 1));
        for (i, (axes, area)) in figure.axes().iter().zip(&areas).enumerate() {
            let layout = AxesLayout {
                id: i,
                shared_x,
                show_x_labels: !figure.share_x || i + 1 == axes_count,
                font_px: font_pt * px_per_pt,
                px_per_pt,
            };
            draw_axes(area, axes, &layout)?;
        }
    }

    root.present()?;
    debug!("Drew {}x{} figure with {} axes", width, height, axes_count);
    Ok(())
}

struct AxesLayout {
    id: usize,
    shared_x: Option<Range>,
    show_x_labels: bool,
    font_px: f64,
    px_per_pt: f64,
}

fn draw_axes<DB>(area: &DrawingArea<DB, Shift>, axes: &Axes, layout: &AxesLayout) -> DrawResult
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (x_data, y_data) = data_ranges(axes);
    if x_data.is_none() && y_data.is_none() {
        warn!("Axes {} has no finite data to plot", layout.id);
    }
    let empty = Range { min: 0., max: 1. };
    let mut x = layout.shared_x.or(x_data).map(|r| r.padded()).unwrap_or(empty);
    let mut y = y_data.map(|r| r.padded()).unwrap_or(empty);

    let margin = points_to_px(AXES_MARGIN_PT, layout.px_per_pt);
    let (left_size, bottom_size) = match (axes.axis_visible, layout.show_x_labels) {
        (false, _) => (0, 0),
        (true, true) => ((layout.font_px * 7.) as u32, (layout.font_px * 3.2) as u32),
        (true, false) => ((layout.font_px * 7.) as u32, (layout.font_px * 0.8) as u32),
    };

    if axes.equal_aspect {
        let (w, h) = area.dim_in_pixel();
        let plot_w = w.saturating_sub(2 * margin + left_size).max(1) as f64;
        let plot_h = h.saturating_sub(2 * margin + bottom_size).max(1) as f64;
        let px_per_unit = (plot_w / x.span()).min(plot_h / y.span());
        x = x.widened_to(plot_w / px_per_unit);
        y = y.widened_to(plot_h / px_per_unit);
    }

    let mut chart = ChartBuilder::on(area)
        .margin(margin)
        .set_label_area_size(LabelAreaPosition::Left, left_size)
        .set_label_area_size(LabelAreaPosition::Bottom, bottom_size)
        .build_cartesian_2d(x.min..x.max, y.min..y.max)?;

    if axes.axis_visible {
        let hidden = |_: &f64| String::new();
        let lap_time = |v: &f64| format_lap_time(*v);
        let mut mesh = chart.configure_mesh();
        mesh.disable_mesh()
            .label_style(font(layout.font_px))
            .axis_desc_style(font(layout.font_px * 1.1));
        if let Some(label) = axes.x_label.as_deref().filter(|_| layout.show_x_labels) {
            mesh.x_desc(label);
        }
        if let Some(label) = axes.y_label.as_deref() {
            mesh.y_desc(label);
        }
        if !layout.show_x_labels {
            mesh.x_label_formatter(&hidden);
        }
        if axes.y_format == TickFormat::LapTime {
            mesh.y_label_formatter(&lap_time);
        }
        mesh.draw()?;
    }

    let segment_width = points_to_px(axes.segment_width_pt, layout.px_per_pt);
    chart.draw_series(
        axes.segments()
            .iter()
            .filter(|s| [s.from.0, s.from.1, s.to.0, s.to.1].iter().all(|v| v.is_finite()))
            .map(|s| {
                PathElement::new(
                    vec![s.from, s.to],
                    RGBColor::from(s.color).stroke_width(segment_width),
                )
            }),
    )?;

    for line in axes.lines() {
        let width = points_to_px(line.width_pt, layout.px_per_pt);
        let style = RGBColor::from(line.color).stroke_width(width);
        // non-finite values break the line into separate runs
        for run in line
            .points
            .split(|(px, py)| !px.is_finite() || !py.is_finite())
            .filter(|run| !run.is_empty())
        {
            chart.draw_series(LineSeries::new(run.iter().copied(), style))?;
        }
    }

    let Some(legend) = &axes.legend else {
        return Ok(());
    };
    let entries = axes.legend_entries();
    if entries.is_empty() {
        return Ok(());
    }
    let legend_font = legend.font_pt * layout.px_per_pt;
    let sample_len = (2. * legend_font).round() as i32;
    let sample_width = points_to_px(LEGEND_LINE_PT, layout.px_per_pt);
    // entries are attached to empty series so a driver without data keeps its key
    for (label, color) in entries {
        let style = RGBColor::from(color).stroke_width(sample_width);
        chart
            .draw_series(std::iter::empty::<PathElement<(f64, f64)>>())?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + sample_len, y)], style));
    }
    chart
        .configure_series_labels()
        .position(match legend.position {
            LegendPosition::UpperRight => SeriesLabelPosition::UpperRight,
            LegendPosition::LowerRight => SeriesLabelPosition::LowerRight,
        })
        .legend_area_size(sample_len + (0.5 * legend_font).round() as i32)
        .margin(points_to_px(AXES_MARGIN_PT, layout.px_per_pt))
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK.mix(0.3))
        .label_font(font(legend_font).color(&BLACK))
        .draw()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_handles_flat_ranges() {
        let flat = Range { min: 0., max: 0. }.padded();
        assert_eq!(flat, Range { min: -0.5, max: 0.5 });
        let flat = Range { min: 200., max: 200. }.padded();
        assert_eq!(flat, Range { min: 190., max: 210. });
        let wide = Range { min: 0., max: 100. }.padded();
        assert_eq!(wide, Range { min: -5., max: 105. });
    }

    #[test]
    fn test_widening_keeps_the_center() {
        let widened = Range { min: 10., max: 20. }.widened_to(30.);
        assert_eq!(widened, Range { min: 0., max: 30. });
    }

    #[test]
    fn test_lap_time_labels() {
        assert_eq!(format_lap_time(83.5), "1:23.500");
        assert_eq!(format_lap_time(90.), "1:30.000");
        assert_eq!(format_lap_time(59.25), "0:59.250");
    }

    #[test]
    fn test_data_ranges_skip_non_finite_points() {
        let mut axes = Axes::default();
        axes.plot(
            vec![(0., 1.), (f64::NAN, 50.), (10., f64::INFINITY), (4., 3.)],
            crate::render::Color::BLACK,
        );
        let (x, y) = data_ranges(&axes);
        assert_eq!(x, Some(Range { min: 0., max: 4. }));
        assert_eq!(y, Some(Range { min: 1., max: 3. }));
        assert_eq!(data_ranges(&Axes::default()), (None, None));
    }
}
