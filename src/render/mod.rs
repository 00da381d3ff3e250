// Plot model rendered to PNG images with plotters
// A `Figure` is the drawing context of one analysis run: plot procedures
// receive it by mutable reference, clear it, and fill it with axes.

mod backend;
mod chart;
pub mod colors;

use std::fs;
use std::path::Path;

use log::debug;
use plotters::coord::Shift;
use plotters::prelude::{BitMapBackend, DrawingArea, IntoDrawingArea};
use plotters_backend::DrawingBackend;

use crate::errors::InsightsError;
use backend::TextSafeBackend;

pub use colors::{Color, driver_color, driver_pair_colors};

/// Figure dimensions in inches, multiplied by the DPI to get pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FigureSize {
    pub width_in: f64,
    pub height_in: f64,
}

impl FigureSize {
    pub const DEFAULT: FigureSize = FigureSize {
        width_in: 6.4,
        height_in: 4.8,
    };

    pub const fn new(width_in: f64, height_in: f64) -> Self {
        Self {
            width_in,
            height_in,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TickFormat {
    #[default]
    Number,
    /// Seconds shown as `m:ss.sss`
    LapTime,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LegendPosition {
    #[default]
    UpperRight,
    LowerRight,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Legend {
    /// Explicit entries; when empty the labelled lines of the axes are used
    pub entries: Vec<(String, Color)>,
    pub position: LegendPosition,
    pub font_pt: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LineSeries {
    pub points: Vec<(f64, f64)>,
    pub color: Color,
    pub label: Option<String>,
    pub width_pt: f64,
}

impl LineSeries {
    pub fn label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = Some(label.into());
        self
    }

    pub fn width(&mut self, width_pt: f64) -> &mut Self {
        self.width_pt = width_pt;
        self
    }
}

/// A straight colored piece of a line collection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Axes {
    lines: Vec<LineSeries>,
    segments: Vec<Segment>,
    segment_width_pt: f64,
    x_label: Option<String>,
    y_label: Option<String>,
    y_format: TickFormat,
    legend: Option<Legend>,
    equal_aspect: bool,
    axis_visible: bool,
}

impl Default for Axes {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            segments: Vec::new(),
            segment_width_pt: 2.,
            x_label: None,
            y_label: None,
            y_format: TickFormat::Number,
            legend: None,
            equal_aspect: false,
            axis_visible: true,
        }
    }
}

impl Axes {
    pub fn plot(&mut self, points: Vec<(f64, f64)>, color: Color) -> &mut LineSeries {
        let idx = self.lines.len();
        self.lines.push(LineSeries {
            points,
            color,
            label: None,
            width_pt: 1.5,
        });
        &mut self.lines[idx]
    }

    pub fn add_segments(&mut self, segments: impl IntoIterator<Item = Segment>, width_pt: f64) {
        self.segments.extend(segments);
        self.segment_width_pt = width_pt;
    }

    pub fn set_xlabel(&mut self, label: impl Into<String>) {
        self.x_label = Some(label.into());
    }

    pub fn set_ylabel(&mut self, label: impl Into<String>) {
        self.y_label = Some(label.into());
    }

    pub fn set_y_format(&mut self, format: TickFormat) {
        self.y_format = format;
    }

    /// Legend built from the labelled lines.
    pub fn legend(&mut self, position: LegendPosition) {
        self.legend = Some(Legend {
            entries: Vec::new(),
            position,
            font_pt: 10.,
        });
    }

    pub fn legend_with_entries(
        &mut self,
        entries: Vec<(String, Color)>,
        position: LegendPosition,
        font_pt: f64,
    ) {
        self.legend = Some(Legend {
            entries,
            position,
            font_pt,
        });
    }

    pub fn set_equal_aspect(&mut self) {
        self.equal_aspect = true;
    }

    pub fn hide_axis(&mut self) {
        self.axis_visible = false;
    }

    pub fn lines(&self) -> &[LineSeries] {
        &self.lines
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn legend_entries(&self) -> Vec<(String, Color)> {
        match &self.legend {
            Some(legend) if !legend.entries.is_empty() => legend.entries.clone(),
            Some(_) => self
                .lines
                .iter()
                .filter_map(|line| line.label.clone().map(|label| (label, line.color)))
                .collect(),
            None => Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Figure {
    size: FigureSize,
    dpi: u32,
    title: Option<String>,
    axes: Vec<Axes>,
    share_x: bool,
}

impl Figure {
    pub fn new(size: FigureSize, dpi: u32) -> Self {
        Self {
            size,
            dpi: dpi.max(1),
            title: None,
            axes: Vec::new(),
            share_x: false,
        }
    }

    /// Remove everything drawn so far, keeping size and resolution.
    pub fn clear(&mut self) {
        self.title = None;
        self.axes.clear();
        self.share_x = false;
    }

    pub fn set_size(&mut self, size: FigureSize) {
        self.size = size;
    }

    pub fn set_dpi(&mut self, dpi: u32) {
        self.dpi = dpi.max(1);
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn size(&self) -> FigureSize {
        self.size
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.size.width_in * self.dpi as f64).round() as u32,
            (self.size.height_in * self.dpi as f64).round() as u32,
        )
    }

    /// Replace the figure content with `rows` stacked axes.
    pub fn subplots(&mut self, rows: usize, share_x: bool) -> &mut [Axes] {
        self.axes = vec![Axes::default(); rows.max(1)];
        self.share_x = share_x;
        &mut self.axes
    }

    /// Replace the figure content with a single axes.
    pub fn single_axes(&mut self) -> &mut Axes {
        &mut self.subplots(1, false)[0]
    }

    pub fn suptitle(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn axes(&self) -> &[Axes] {
        &self.axes
    }

    fn drawable_size(&self) -> Result<(u32, u32), InsightsError> {
        match self.pixel_size() {
            (0, _) | (_, 0) => Err(InsightsError::RenderError {
                reason: format!("Figure has no drawable area: {:?}", self.pixel_size()),
            }),
            size => Ok(size),
        }
    }

    /// Draw the figure onto any plotters drawing area.
    pub fn draw_on<DB>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), InsightsError>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        chart::draw_figure(root, self).map_err(|e| InsightsError::RenderError {
            reason: e.to_string(),
        })
    }

    /// Render and write the figure as a PNG, overwriting any previous file.
    pub fn save(&self, path: &Path) -> Result<(), InsightsError> {
        let (width, height) = self.drawable_size()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| InsightsError::PlotWriteError { source: e })?;
        }
        let backend = BitMapBackend::new(path, (width, height));
        let root = TextSafeBackend::new(backend).into_drawing_area();
        self.draw_on(&root)?;
        debug!("Saved {}x{} plot to {:?}", width, height, path);
        Ok(())
    }

    /// Render into an in-memory RGB buffer.
    #[cfg(test)]
    pub(crate) fn render_rgb(&self) -> Result<Vec<u8>, InsightsError> {
        let (width, height) = self.drawable_size()?;
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let backend = BitMapBackend::with_buffer(&mut buffer, (width, height));
            let root = TextSafeBackend::new(backend).into_drawing_area();
            self.draw_on(&root)?;
        }
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_size_follows_dpi() {
        let figure = Figure::new(FigureSize::DEFAULT, 200);
        assert_eq!(figure.pixel_size(), (1280, 960));
        let figure = Figure::new(FigureSize::DEFAULT, 700);
        assert_eq!(figure.pixel_size(), (4480, 3360));
    }

    #[test]
    fn test_clear_resets_content() {
        let mut figure = Figure::new(FigureSize::DEFAULT, 100);
        figure.suptitle("Old");
        figure.single_axes().plot(vec![(0., 1.)], Color::BLACK);
        figure.clear();
        assert!(figure.title().is_none());
        assert!(figure.axes().is_empty());
    }

    #[test]
    fn test_legend_entries_fall_back_to_line_labels() {
        let mut axes = Axes::default();
        axes.plot(vec![(0., 1.)], Color::BLACK).label("VER");
        axes.plot(vec![(0., 2.)], Color::WHITE);
        assert!(axes.legend_entries().is_empty());
        axes.legend(LegendPosition::UpperRight);
        assert_eq!(axes.legend_entries(), vec![("VER".to_string(), Color::BLACK)]);
        axes.legend_with_entries(
            vec![("HAM".to_string(), Color::GRAY)],
            LegendPosition::LowerRight,
            6.,
        );
        assert_eq!(axes.legend_entries(), vec![("HAM".to_string(), Color::GRAY)]);
    }

    fn count_pixels(buffer: &[u8], color: Color) -> usize {
        buffer
            .chunks_exact(3)
            .filter(|px| px == &[color.r, color.g, color.b])
            .count()
    }

    #[test]
    fn test_render_line_chart() {
        let ver = Color::rgb(6, 0, 239);
        let ham = Color::rgb(0, 210, 190);
        let mut figure = Figure::new(FigureSize::DEFAULT, 100);
        figure.suptitle("Fastest Lap Comparison\n2023 Italian Grand Prix Race");
        let axes = figure.single_axes();
        axes.plot(vec![(0., 100.), (100., 200.)], ver).label("VER");
        // the NaN point splits the second series in two runs
        axes.plot(
            vec![(0., 110.), (40., 150.), (f64::NAN, 1.), (60., 160.), (100., 190.)],
            ham,
        )
        .label("HAM");
        axes.set_xlabel("Distance (m)");
        axes.set_y_format(TickFormat::LapTime);
        axes.legend(LegendPosition::UpperRight);

        let buffer = figure.render_rgb().unwrap();
        assert_eq!(buffer.len(), 640 * 480 * 3);
        assert!(count_pixels(&buffer, ver) > 100);
        assert!(count_pixels(&buffer, ham) > 0);
        assert!(count_pixels(&buffer, Color::WHITE) > 640 * 480 / 2);
    }

    #[test]
    fn test_render_segments_without_axis() {
        let mut figure = Figure::new(FigureSize::new(6.25, 4.7), 50);
        let axes = figure.single_axes();
        axes.add_segments(
            vec![
                Segment {
                    from: (0., 0.),
                    to: (1., 0.),
                    color: Color::rgb(220, 0, 0),
                },
                Segment {
                    from: (1., 0.),
                    to: (1., 1.),
                    color: Color::GRAY,
                },
            ],
            2.,
        );
        axes.set_equal_aspect();
        axes.hide_axis();

        let buffer = figure.render_rgb().unwrap();
        assert!(count_pixels(&buffer, Color::rgb(220, 0, 0)) > 0);
        assert!(count_pixels(&buffer, Color::GRAY) > 0);
        // no frame or tick marks
        assert_eq!(count_pixels(&buffer, Color::BLACK), 0);
    }

    #[test]
    fn test_legend_keeps_drivers_without_data() {
        let missing = Color::rgb(255, 127, 14);
        let mut figure = Figure::new(FigureSize::DEFAULT, 100);
        let axes = figure.single_axes();
        axes.plot(vec![(0., 1.), (1., 2.)], Color::rgb(6, 0, 239)).label("VER");
        axes.plot(Vec::new(), missing).label("LEC");
        axes.legend(LegendPosition::UpperRight);
        assert!(count_pixels(&figure.render_rgb().unwrap(), missing) > 0);
    }

    #[test]
    fn test_render_empty_axes() {
        let mut figure = Figure::new(FigureSize::DEFAULT, 72);
        figure.subplots(3, true);
        assert!(figure.render_rgb().is_ok());
    }

    #[test]
    fn test_zero_sized_figure_is_rejected() {
        let figure = Figure::new(FigureSize::new(0., 4.), 100);
        assert!(matches!(
            figure.render_rgb(),
            Err(InsightsError::RenderError { .. })
        ));
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("plot.png");
        assert!(figure.save(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_save_writes_png_of_pixel_size() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("plot.png");
        let mut figure = Figure::new(FigureSize::new(2., 1.5), 100);
        figure.single_axes().plot(vec![(0., 0.), (1., 1.)], Color::BLACK);
        figure.save(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
        let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
        assert_eq!((width, height), (200, 150));
    }
}
