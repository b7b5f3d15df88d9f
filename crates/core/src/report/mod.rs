//! Report Renderer: draws an [`Aggregation`] as a bar chart and encodes it as PNG.
//!
//! Output depends only on the input; no timestamp or text chunks are written, so two
//! renders of the same aggregation are byte-identical.

pub mod glyphs;

use crate::aggregate::Aggregation;
use crate::error::{DashboardError, Result};
use image::{Rgba, RgbaImage};

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 600;

pub const CONTENT_TYPE: &str = "image/png";
pub const ATTACHMENT_FILENAME: &str = "dashboard_report.png";

const MARGIN_LEFT: u32 = 110;
const MARGIN_RIGHT: u32 = 30;
const MARGIN_TOP: u32 = 70;
const MARGIN_BOTTOM: u32 = 100;
const TICKS: u32 = 5;
/// Narrowest horizontal slot a bar may get, in pixels.
const MIN_BAR_SLOT: u32 = 3;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: Rgba<u8> = Rgba([33, 37, 41, 255]);
const GRID: Rgba<u8> = Rgba([222, 226, 230, 255]);
const PALETTE: [Rgba<u8>; 6] = [
    Rgba([31, 119, 180, 255]),
    Rgba([255, 127, 14, 255]),
    Rgba([44, 160, 44, 255]),
    Rgba([214, 39, 40, 255]),
    Rgba([148, 103, 189, 255]),
    Rgba([140, 86, 75, 255]),
];

#[derive(Debug, Clone)]
pub struct ChartLabels {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
}

impl ChartLabels {
    /// Labels of the emailed round-lot summary.
    pub fn round_lot_report() -> Self {
        Self {
            title: "Avg Round Lot Size by Exchange".to_string(),
            x_label: "Exchange".to_string(),
            y_label: "Round Lot Size".to_string(),
        }
    }
}

/// Encoded report image. Lives only as long as one dispatch.
#[derive(Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    bytes: Vec<u8>,
}

impl ReportArtifact {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    pub fn filename(&self) -> &'static str {
        ATTACHMENT_FILENAME
    }
}

impl std::fmt::Debug for ReportArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportArtifact")
            .field("content_type", &CONTENT_TYPE)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Scale {
    lo: f64,
    hi: f64,
}

impl Scale {
    fn for_values(values: impl Iterator<Item = f64>) -> Self {
        let (mut lo, mut hi) = (0.0_f64, 0.0_f64);
        for v in values {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        if hi > 0.0 {
            hi = nice_ceiling(hi);
        }
        if lo < 0.0 {
            lo = -nice_ceiling(-lo);
        }
        if hi == lo {
            hi = lo + 1.0;
        }
        Self { lo, hi }
    }

    /// Pixel row for `v` inside `plot`.
    fn y(&self, v: f64, plot: Rect) -> u32 {
        let t = ((v - self.lo) / (self.hi - self.lo)).clamp(0.0, 1.0);
        let from_bottom = (t * plot.h as f64).round() as u32;
        plot.y + plot.h - from_bottom
    }
}

/// Smallest 1, 2, 2.5 or 5 times a power of ten that is >= `v`.
fn nice_ceiling(v: f64) -> f64 {
    let exp = v.log10().floor();
    let base = 10f64.powf(exp);
    for step in [1.0, 2.0, 2.5, 5.0, 10.0] {
        if step * base >= v {
            return step * base;
        }
    }
    10.0 * base
}

fn plot_area() -> Rect {
    Rect {
        x: MARGIN_LEFT,
        y: MARGIN_TOP,
        w: WIDTH - MARGIN_LEFT - MARGIN_RIGHT,
        h: HEIGHT - MARGIN_TOP - MARGIN_BOTTOM,
    }
}

/// Largest bar count that still leaves every bar a visible slot.
pub fn max_bars() -> usize {
    (plot_area().w / MIN_BAR_SLOT) as usize
}

fn bar_rects(values: &[f64], scale: Scale, plot: Rect) -> Vec<Rect> {
    let n = values.len() as u32;
    let slot = plot.w / n.max(1);
    let bar_w = (slot * 3 / 5).max(1);
    let zero_y = scale.y(0.0, plot);

    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let x = plot.x + i as u32 * slot + slot.saturating_sub(bar_w) / 2;
            let top = scale.y(v, plot);
            let (y, h) = if top <= zero_y {
                (top, zero_y - top)
            } else {
                (zero_y, top - zero_y)
            };
            Rect { x, y, w: bar_w, h }
        })
        .collect()
}

pub fn format_value(v: f64) -> String {
    let abs = v.abs();
    let (scaled, suffix) = if abs >= 1e12 {
        (v / 1e12, "T")
    } else if abs >= 1e9 {
        (v / 1e9, "B")
    } else if abs >= 1e6 {
        (v / 1e6, "M")
    } else if abs >= 1e4 {
        (v / 1e3, "K")
    } else {
        (v, "")
    };
    if scaled.fract() == 0.0 {
        format!("{scaled:.0}{suffix}")
    } else {
        format!("{scaled:.1}{suffix}")
    }
}

/// Renders one bar per exchange with bar height equal to the exchange's mean.
pub fn render_bar_chart(aggregation: &Aggregation, labels: &ChartLabels) -> Result<ReportArtifact> {
    if aggregation.is_empty() {
        return Err(DashboardError::Render(
            "no exchanges to chart after filtering".to_string(),
        ));
    }
    if let Some((exchange, _)) = aggregation.means.iter().find(|(_, v)| !v.is_finite()) {
        return Err(DashboardError::Render(format!(
            "mean for {exchange} is not a finite number"
        )));
    }
    let limit = max_bars();
    if aggregation.len() > limit {
        return Err(DashboardError::Render(format!(
            "too many exchanges to chart ({} > {limit})",
            aggregation.len()
        )));
    }

    let values: Vec<f64> = aggregation.means.values().copied().collect();
    let plot = plot_area();
    let scale = Scale::for_values(values.iter().copied());

    let mut image = RgbaImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);

    draw_grid_and_ticks(&mut image, scale, plot);

    let bars = bar_rects(&values, scale, plot);
    let slot = plot.w / bars.len() as u32;
    let max_label_chars = (slot / 12).max(1) as usize;
    for (i, ((exchange, &mean), bar)) in aggregation.means.iter().zip(&bars).enumerate() {
        fill_rect(&mut image, *bar, PALETTE[i % PALETTE.len()]);

        let value_label = format_value(mean);
        let vw = glyphs::text_width(&value_label, 2);
        let vx = (bar.x + bar.w / 2).saturating_sub(vw / 2);
        let vy = bar.y.saturating_sub(glyphs::GLYPH_HEIGHT * 2 + 4);
        glyphs::draw_text(&mut image, vx, vy, &value_label, 2, INK);

        let name: String = exchange.chars().take(max_label_chars).collect();
        let nw = glyphs::text_width(&name, 2);
        let nx = (bar.x + bar.w / 2).saturating_sub(nw / 2);
        glyphs::draw_text(&mut image, nx, plot.y + plot.h + 10, &name, 2, INK);
    }

    // Axes over the bars.
    fill_rect(&mut image, Rect { x: plot.x, y: plot.y, w: 2, h: plot.h + 1 }, INK);
    let zero_y = scale.y(0.0, plot);
    fill_rect(&mut image, Rect { x: plot.x, y: zero_y, w: plot.w, h: 2 }, INK);

    let tw = glyphs::text_width(&labels.title, 3);
    glyphs::draw_text(
        &mut image,
        (WIDTH.saturating_sub(tw)) / 2,
        24,
        &labels.title,
        3,
        INK,
    );

    let xw = glyphs::text_width(&labels.x_label, 2);
    glyphs::draw_text(
        &mut image,
        plot.x + plot.w.saturating_sub(xw) / 2,
        HEIGHT - 40,
        &labels.x_label,
        2,
        INK,
    );

    let yw = glyphs::text_width(&labels.y_label, 2);
    glyphs::draw_text_vertical(
        &mut image,
        16,
        plot.y + plot.h - plot.h.saturating_sub(yw) / 2,
        &labels.y_label,
        2,
        INK,
    );

    let bytes = encode_png(image)?;
    tracing::debug!(bars = bars.len(), bytes = bytes.len(), "rendered report chart");
    Ok(ReportArtifact { bytes })
}

fn draw_grid_and_ticks(image: &mut RgbaImage, scale: Scale, plot: Rect) {
    for i in 0..=TICKS {
        let v = scale.lo + (scale.hi - scale.lo) * i as f64 / TICKS as f64;
        let y = scale.y(v, plot);
        fill_rect(image, Rect { x: plot.x, y, w: plot.w, h: 1 }, GRID);
        fill_rect(image, Rect { x: plot.x.saturating_sub(6), y, w: 6, h: 1 }, INK);

        let label = format_value(v);
        let lw = glyphs::text_width(&label, 2);
        let lx = plot.x.saturating_sub(10 + lw);
        let ly = y.saturating_sub(glyphs::GLYPH_HEIGHT);
        glyphs::draw_text(image, lx, ly, &label, 2, INK);
    }
}

fn fill_rect(image: &mut RgbaImage, r: Rect, color: Rgba<u8>) {
    let x_end = (r.x + r.w).min(image.width());
    let y_end = (r.y + r.h).min(image.height());
    for y in r.y..y_end {
        for x in r.x..x_end {
            image.put_pixel(x, y, color);
        }
    }
}

fn encode_png(image: RgbaImage) -> Result<Vec<u8>> {
    let (width, height) = image.dimensions();
    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buffer, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder
            .write_header()
            .map_err(|err| DashboardError::Render(err.to_string()))?
            .write_image_data(&image.into_raw())
            .map_err(|err| DashboardError::Render(err.to_string()))?;
    }
    Ok(buffer)
}
