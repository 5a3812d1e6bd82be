use crate::layout::{MosaicLayout, Rect};
use crate::model::Orientation;

/// Pixel metrics and colors for the rendered figure.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartStyle {
    /// Side of the square plot area.
    pub plot_px: f64,
    pub pad_px: f64,
    pub font_size: f64,
    pub tick_px: f64,
    pub swatch_px: f64,
    pub background: String,
    pub ink: String,
    pub grid: String,
}

impl Default for ChartStyle {
    fn default() -> Self {
        ChartStyle {
            plot_px: 640.0,
            pad_px: 16.0,
            font_size: 16.0,
            tick_px: 6.0,
            swatch_px: 18.0,
            background: "#ffffff".to_string(),
            ink: "#333333".to_string(),
            grid: "#808080".to_string(),
        }
    }
}

impl ChartStyle {
    // Rough advance width of one glyph; enough to size margins.
    fn char_w(&self) -> f64 {
        self.font_size * 0.62
    }

    fn text_w(&self, s: &str) -> f64 {
        s.chars().count() as f64 * self.char_w()
    }
}

/// A finished SVG document with its pixel size.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartSvg {
    pub svg: String,
    pub width: u32,
    pub height: u32,
}

fn svg_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn percent_label(i: u32) -> String {
    format!("{}%", i * 10)
}

/// Compose the mosaic, its axes and the legend as an SVG document.
pub fn build_chart_svg(layout: &MosaicLayout, style: &ChartStyle) -> ChartSvg {
    let plot = style.plot_px;
    let fs = style.font_size;
    let gap = fs * 0.4;
    let tick = style.tick_px;

    let value_w = style.text_w(&percent_label(10));
    let category_w = layout
        .ticks
        .iter()
        .map(|t| style.text_w(&t.label))
        .fold(0.0, f64::max);
    let (left_w, bottom_h) = match layout.orientation {
        Orientation::CategoriesOnX => (value_w, fs),
        Orientation::CategoriesOnY => (category_w, fs),
    };
    let plot_left = style.pad_px + left_w + gap + tick;
    let plot_top = style.pad_px + fs / 2.0;
    let plot_bottom = plot_top + plot;
    let plot_right = plot_left + plot;

    let legend_left = plot_right + fs * 1.5;
    let legend_row_h = fs * 1.6;
    let legend_text_w = layout
        .legend
        .iter()
        .map(|m| style.text_w(&m.name))
        .fold(0.0, f64::max);
    let legend_right = legend_left + style.swatch_px + gap + legend_text_w;
    let legend_bottom = plot_top + legend_row_h * layout.legend.len() as f64;

    let total_w = legend_right + style.pad_px;
    let total_h = (plot_bottom + tick + gap + bottom_h).max(legend_bottom) + style.pad_px;
    let w_px = total_w.ceil() as u32;
    let h_px = total_h.ceil() as u32;

    // Unit space is y-up; SVG is y-down.
    let to_px = |u: f64, v: f64| (plot_left + u * plot, plot_top + (1.0 - v) * plot);

    let background = svg_escape(&style.background);
    let ink = svg_escape(&style.ink);
    let grid = svg_escape(&style.grid);

    let mut s = String::new();
    s.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    s.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"0 0 {} {}\" font-family=\"sans-serif\" font-size=\"{}\">\n",
        w_px, h_px, w_px, h_px, fs
    ));
    s.push_str(&format!(
        "<rect x=\"0\" y=\"0\" width=\"100%\" height=\"100%\" fill=\"{}\"/>\n",
        background
    ));

    for seg in &layout.segments {
        if seg.rect.area() <= 0.0 {
            continue;
        }
        s.push_str(&rect_element(&seg.rect, &seg.color.to_string(), &to_px, plot));
    }

    // Dotted major grid over the bars, every 10% on both axes.
    for i in 0..=10 {
        let t = i as f64 / 10.0;
        let (x, y0) = to_px(t, 0.0);
        let (_x, y1) = to_px(t, 1.0);
        s.push_str(&format!(
            "<path d=\"M {:.2} {:.2} L {:.2} {:.2}\" stroke=\"{}\" stroke-width=\"1\" stroke-dasharray=\"1 3\"/>\n",
            x, y0, x, y1, grid
        ));
        let (x0, y) = to_px(0.0, t);
        let (x1, _y) = to_px(1.0, t);
        s.push_str(&format!(
            "<path d=\"M {:.2} {:.2} L {:.2} {:.2}\" stroke=\"{}\" stroke-width=\"1\" stroke-dasharray=\"1 3\"/>\n",
            x0, y, x1, y, grid
        ));
    }
    s.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1\"/>\n",
        plot_left, plot_top, plot, plot, ink
    ));

    // Ticks along the bottom and the left spine.
    let value_ticks: Vec<(f64, String)> = (0..=10)
        .map(|i| (i as f64 / 10.0, percent_label(i)))
        .collect();
    let category_ticks: Vec<(f64, String)> = layout
        .ticks
        .iter()
        .map(|t| (t.position, t.label.clone()))
        .collect();
    let (bottom_ticks, left_ticks) = match layout.orientation {
        Orientation::CategoriesOnX => (category_ticks, value_ticks),
        Orientation::CategoriesOnY => (value_ticks, category_ticks),
    };
    for (pos, label) in &bottom_ticks {
        let (x, y) = to_px(*pos, 0.0);
        s.push_str(&format!(
            "<path d=\"M {:.2} {:.2} L {:.2} {:.2}\" stroke=\"{}\" stroke-width=\"1\"/>\n",
            x,
            y,
            x,
            y + tick,
            ink
        ));
        s.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" fill=\"{}\">{}</text>\n",
            x,
            y + tick + gap + fs * 0.8,
            ink,
            svg_escape(label)
        ));
    }
    for (pos, label) in &left_ticks {
        let (x, y) = to_px(0.0, *pos);
        s.push_str(&format!(
            "<path d=\"M {:.2} {:.2} L {:.2} {:.2}\" stroke=\"{}\" stroke-width=\"1\"/>\n",
            x - tick,
            y,
            x,
            y,
            ink
        ));
        s.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"end\" fill=\"{}\">{}</text>\n",
            x - tick - gap,
            y + fs * 0.35,
            ink,
            svg_escape(label)
        ));
    }

    // Legend: swatch + name per mode, no frame, aligned with the plot top.
    for (i, mode) in layout.legend.iter().enumerate() {
        let top = plot_top + legend_row_h * i as f64;
        s.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>\n",
            legend_left,
            top,
            style.swatch_px,
            style.swatch_px,
            mode.color
        ));
        s.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" fill=\"{}\">{}</text>\n",
            legend_left + style.swatch_px + gap,
            top + style.swatch_px / 2.0 + fs * 0.35,
            ink,
            svg_escape(&mode.name)
        ));
    }

    s.push_str("</svg>\n");
    ChartSvg {
        svg: s,
        width: w_px,
        height: h_px,
    }
}

fn rect_element<F>(r: &Rect, fill: &str, to_px: &F, plot: f64) -> String
where
    F: Fn(f64, f64) -> (f64, f64),
{
    // Top-left corner in SVG space is the rect's (x, y + height) in unit space.
    let (x, y) = to_px(r.x, r.y + r.height);
    format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" stroke=\"none\"/>\n",
        x,
        y,
        r.width * plot,
        r.height * plot,
        fill
    )
}
