use serde::{Deserialize, Serialize};

use alignment_engine::DerivedSeries;
use sentiment_core::map_range;

/// Bounded plot area inside a chart's view box, in view-box units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PlotRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

// --- coordinate transforms ---------------------------------------------------

/// X position of a series index: domain `[0, count-1]` across the rect width.
/// A single-point series degenerates to the left edge (zero-width domain).
pub fn index_to_x(idx: usize, count: usize, rect: &PlotRect) -> f64 {
    let last = count.saturating_sub(1) as f64;
    map_range(idx as f64, 0.0, last, rect.left(), rect.right())
}

/// Y position of a value: larger values plot higher, so the domain minimum
/// maps to the rect bottom. Values are expected pre-clamped to the domain.
pub fn value_to_y(value: f64, domain_min: f64, domain_max: f64, rect: &PlotRect) -> f64 {
    map_range(value, domain_min, domain_max, rect.bottom(), rect.top())
}

// --- path building -----------------------------------------------------------

/// Build an SVG polyline path ("M" then "L" per point, in order) for a series
/// with optional gaps. Missing values position at 0 rather than breaking the
/// line, keeping visual continuity. Empty input yields an empty path; a
/// single point yields a lone "M" (callers add a marker if it must be seen).
pub fn polyline_path(
    series: &[Option<f64>],
    domain_min: f64,
    domain_max: f64,
    rect: &PlotRect,
) -> String {
    let mut path = String::new();
    for (idx, value) in series.iter().enumerate() {
        let v = value.unwrap_or(0.0);
        let x = index_to_x(idx, series.len(), rect);
        let y = value_to_y(v, domain_min, domain_max, rect);
        if idx == 0 {
            path.push_str(&format!("M{x},{y}"));
        } else {
            path.push_str(&format!(" L{x},{y}"));
        }
    }
    path
}

/// `polyline_path` over a dense series.
pub fn dense_polyline_path(
    series: &[f64],
    domain_min: f64,
    domain_max: f64,
    rect: &PlotRect,
) -> String {
    let mut path = String::new();
    for (idx, &v) in series.iter().enumerate() {
        let x = index_to_x(idx, series.len(), rect);
        let y = value_to_y(v, domain_min, domain_max, rect);
        if idx == 0 {
            path.push_str(&format!("M{x},{y}"));
        } else {
            path.push_str(&format!(" L{x},{y}"));
        }
    }
    path
}

// --- misalignment map assembly ----------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: String,
    pub width: f64,
}

impl StrokeStyle {
    fn new(color: &str, width: f64) -> Self {
        Self {
            color: color.to_string(),
            width,
        }
    }
}

/// One gridline/label position on a value axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisTick {
    pub value: f64,
    pub y: f64,
}

/// A labeled polyline ready for an SVG surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartLine {
    pub label: String,
    pub path: String,
    pub style: StrokeStyle,
}

/// One plot pane: a rect, its value domain, gridline ticks, and its lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pane {
    pub plot: PlotRect,
    pub domain_min: f64,
    pub domain_max: f64,
    pub ticks: Vec<AxisTick>,
    pub lines: Vec<ChartLine>,
}

impl Pane {
    fn new(plot: PlotRect, domain_min: f64, domain_max: f64, tick_values: &[f64]) -> Self {
        let ticks = tick_values
            .iter()
            .map(|&value| AxisTick {
                value,
                y: value_to_y(value, domain_min, domain_max, &plot),
            })
            .collect();
        Self {
            plot,
            domain_min,
            domain_max,
            ticks,
            lines: Vec::new(),
        }
    }

    fn with_line(mut self, label: &str, series: &[f64], style: StrokeStyle) -> Self {
        self.lines.push(ChartLine {
            label: label.to_string(),
            path: dense_polyline_path(series, self.domain_min, self.domain_max, &self.plot),
            style,
        });
        self
    }
}

/// The complete misalignment map: the normalized sentiment-vs-price pane and
/// the stacked alignment/volume panes, plus the shared date axis endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MisalignmentMap {
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    /// "Sentiment vs Price (normalized)", 640x360 view box.
    pub sentiment_price: Pane,
    /// Alignment strength, top half of the 640x380 view box.
    pub alignment: Pane,
    /// Normalized trade volume, bottom strip of the 640x380 view box.
    pub volume: Pane,
}

const SENTIMENT_PRICE_RECT: PlotRect = PlotRect::new(48.0, 20.0, 560.0, 280.0);
const ALIGNMENT_RECT: PlotRect = PlotRect::new(56.0, 20.0, 552.0, 160.0);
const VOLUME_RECT: PlotRect = PlotRect::new(56.0, 220.0, 552.0, 120.0);

const SENTIMENT_COLOR: &str = "#26a69a";
const PRICE_COLOR: &str = "#ff7043";
const VOLUME_COLOR: &str = "#ffb74d";

/// Assemble the two-panel misalignment map from a derived-series bundle.
/// Empty input produces panes with empty paths, never an error.
pub fn build_misalignment_map(series: &DerivedSeries) -> MisalignmentMap {
    let sentiment_price = Pane::new(SENTIMENT_PRICE_RECT, -2.0, 2.0, &[2.0, 1.0, 0.0, -1.0, -2.0])
        .with_line("Sentiment", &series.sentiment, StrokeStyle::new(SENTIMENT_COLOR, 3.0))
        .with_line("Price (2% = 1.0)", &series.price_norm, StrokeStyle::new(PRICE_COLOR, 3.0));

    let alignment = Pane::new(ALIGNMENT_RECT, -1.0, 1.0, &[1.0, 0.5, 0.0, -0.5, -1.0]).with_line(
        "Alignment",
        &series.alignment,
        StrokeStyle::new(SENTIMENT_COLOR, 3.0),
    );

    let volume = Pane::new(VOLUME_RECT, 0.0, 1.0, &[0.0, 0.5, 1.0]).with_line(
        "Trade volume (normalized)",
        &series.volume_norm,
        StrokeStyle::new(VOLUME_COLOR, 3.0),
    );

    MisalignmentMap {
        first_date: series.dates.first().cloned(),
        last_date: series.dates.last().cloned(),
        sentiment_price,
        alignment,
        volume,
    }
}
