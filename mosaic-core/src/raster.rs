use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use png::{BitDepth, ColorType, Compression, Encoder, FilterType};
use tracing::{debug, warn};

use crate::chart::ChartSvg;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("could not read font {path:?}: {source}")]
    Font {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("SVG parse error: {0}")]
    Svg(#[from] usvg::Error),
    #[error("pixmap alloc failed for {width}x{height}")]
    Pixmap { width: u32, height: u32 },
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),
}

// Preferred stand-ins for the generic 'sans-serif' family, in order.
const SANS_FAMILIES: [&str; 5] = [
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Arial",
    "Helvetica",
];

/// Turns chart SVG into PNG bytes. Holds the font database so it is loaded
/// once per process rather than once per chart.
#[derive(Clone)]
pub struct Rasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl Rasterizer {
    pub fn new(font_path: Option<&Path>) -> Result<Self, RenderError> {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();
        let system_faces = fontdb.len();
        if let Some(path) = font_path {
            let data = fs::read(path).map_err(|source| RenderError::Font {
                path: path.to_path_buf(),
                source,
            })?;
            fontdb.load_font_data(data);
        }

        // An explicitly supplied font wins; otherwise pick a known family,
        // falling back to whatever face came first.
        let family_name = fontdb
            .faces()
            .nth(system_faces)
            .and_then(|face| face.families.first().map(|(n, _)| n.clone()))
            .or_else(|| {
                SANS_FAMILIES.iter().find_map(|want| {
                    fontdb
                        .faces()
                        .flat_map(|face| face.families.iter())
                        .find(|(n, _)| n.as_str() == *want)
                        .map(|(n, _)| n.clone())
                })
            })
            .or_else(|| {
                fontdb
                    .faces()
                    .next()
                    .and_then(|face| face.families.first().map(|(n, _)| n.clone()))
            });
        match family_name {
            Some(name) => {
                debug!(family = %name, faces = fontdb.len(), "font database ready");
                fontdb.set_sans_serif_family(name);
            }
            None => warn!("no fonts found; chart text will not be drawn"),
        }
        Ok(Rasterizer {
            fontdb: Arc::new(fontdb),
        })
    }

    /// Render to PNG. Deterministic: the same SVG always yields the same bytes.
    pub fn render_png(&self, chart: &ChartSvg) -> Result<Vec<u8>, RenderError> {
        let mut opt = usvg::Options::default();
        opt.fontdb = Arc::clone(&self.fontdb);
        let tree = usvg::Tree::from_str(&chart.svg, &opt)?;
        let mut pixmap =
            tiny_skia::Pixmap::new(chart.width, chart.height).ok_or(RenderError::Pixmap {
                width: chart.width,
                height: chart.height,
            })?;
        pixmap.fill(tiny_skia::Color::WHITE);
        let mut pm = pixmap.as_mut();
        resvg::render(&tree, tiny_skia::Transform::identity(), &mut pm);
        Ok(encode_rgba_to_png_bytes(
            pixmap.width(),
            pixmap.height(),
            pixmap.data(),
        )?)
    }
}

// RGBA -> PNG bytes with fixed filter and compression so output is stable.
pub fn encode_rgba_to_png_bytes(
    width: u32,
    height: u32,
    rgba: &[u8],
) -> Result<Vec<u8>, png::EncodingError> {
    let mut buf = Vec::new();
    {
        let mut enc = Encoder::new(&mut buf, width, height);
        enc.set_color(ColorType::Rgba);
        enc.set_depth(BitDepth::Eight);
        enc.set_filter(FilterType::NoFilter);
        enc.set_compression(Compression::Default);
        let mut writer = enc.write_header()?;
        writer.write_image_data(rgba)?;
    }
    Ok(buf)
}
