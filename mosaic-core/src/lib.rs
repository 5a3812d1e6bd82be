pub mod chart;
pub mod layout;
pub mod model;
pub mod palette;
pub mod raster;
pub mod sheet;

pub use chart::{ChartStyle, ChartSvg, build_chart_svg};
pub use layout::{Band, LayoutError, MosaicLayout, Rect, Segment, Tick, build_layout};
pub use model::{
    CategoryRow, Cell, Color, Columns, LayoutConfig, Mode, Orientation, SurveyTable,
};
pub use raster::{RenderError, Rasterizer};
pub use sheet::{SheetError, read_table, table_from_grid};

#[derive(Debug, thiserror::Error)]
pub enum MosaicError {
    #[error(transparent)]
    Sheet(#[from] SheetError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl MosaicError {
    /// True when the uploaded data, not the service, is at fault.
    pub fn is_input_error(&self) -> bool {
        matches!(self, MosaicError::Sheet(_) | MosaicError::Layout(_))
    }
}

/// Layout plus the SVG it was drawn into, before rasterisation.
#[derive(Clone, Debug)]
pub struct Composed {
    pub layout: MosaicLayout,
    pub chart: ChartSvg,
}

#[derive(Clone, Debug)]
pub struct RenderedChart {
    pub layout: MosaicLayout,
    pub png: Vec<u8>,
}

/// Sheet bytes -> table -> layout -> SVG.
pub fn compose(
    bytes: &[u8],
    file_name: &str,
    config: &LayoutConfig,
    style: &ChartStyle,
) -> Result<Composed, MosaicError> {
    let table = read_table(bytes, file_name, config)?;
    let layout = build_layout(&table, config)?;
    let chart = build_chart_svg(&layout, style);
    Ok(Composed { layout, chart })
}

/// The full pipeline used by the upload endpoint and the CLI.
pub fn render_mosaic(
    bytes: &[u8],
    file_name: &str,
    config: &LayoutConfig,
    style: &ChartStyle,
    rasterizer: &Rasterizer,
) -> Result<RenderedChart, MosaicError> {
    let Composed { layout, chart } = compose(bytes, file_name, config, style)?;
    let png = rasterizer.render_png(&chart)?;
    Ok(RenderedChart { layout, png })
}
