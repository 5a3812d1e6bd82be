use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::{Color, LayoutConfig, Mode, Orientation, SurveyTable};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("{categories} category rows but {splits} sub-split rows; rows must align by position")]
    RowMismatch { categories: usize, splits: usize },
    #[error("sub-split row {row} has {found} values, expected {expected}")]
    SplitWidth {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("unknown sub-split {0:?}: no color configured for it")]
    UnknownMode(String),
    #[error("row {row}, column {column:?}: magnitude {value} is not a finite non-negative number")]
    InvalidMagnitude {
        row: usize,
        column: String,
        value: f64,
    },
    #[error("no category rows with both a name and a total")]
    Empty,
    #[error("category totals sum to zero, nothing to normalize against")]
    ZeroTotal,
    #[error("invalid chart configuration: {0}")]
    Config(String),
}

/// Axis-aligned rectangle in unit space, origin bottom-left.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// The primary-axis extent of one category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub label: String,
    /// Normalized share of the full extent, before spacing.
    pub share: f64,
    pub offset: f64,
    /// Drawn extent: `share - spacing`, clamped at zero.
    pub span: f64,
    pub center: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Index into `MosaicLayout::bands`.
    pub category: usize,
    pub mode: String,
    /// Share of the category, before spacing.
    pub share: f64,
    pub rect: Rect,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub position: f64,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MosaicLayout {
    pub orientation: Orientation,
    pub bands: Vec<Band>,
    pub segments: Vec<Segment>,
    pub ticks: Vec<Tick>,
    pub legend: Vec<Mode>,
}

impl MosaicLayout {
    pub fn segments_of(&self, category: usize) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(move |s| s.category == category)
    }
}

impl Orientation {
    /// Map band (primary) and segment (secondary) extents onto x/y.
    fn place(self, p0: f64, p_len: f64, s0: f64, s_len: f64) -> Rect {
        match self {
            Orientation::CategoriesOnX => Rect {
                x: p0,
                y: s0,
                width: p_len,
                height: s_len,
            },
            Orientation::CategoriesOnY => Rect {
                x: s0,
                y: p0,
                width: s_len,
                height: p_len,
            },
        }
    }
}

struct ModeColumn<'a> {
    name: &'a str,
    column: usize,
    color: Color,
}

fn check_magnitude(value: f64, row: usize, column: &str) -> Result<f64, LayoutError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(LayoutError::InvalidMagnitude {
            row,
            column: column.to_string(),
            value,
        })
    }
}

/// Lay out the table as a mosaic: one band per named category, each band
/// split into one segment per mode, areas proportional to the magnitudes.
pub fn build_layout(
    table: &SurveyTable,
    config: &LayoutConfig,
) -> Result<MosaicLayout, LayoutError> {
    config.validate()?;
    if table.splits.len() != table.categories.len() {
        return Err(LayoutError::RowMismatch {
            categories: table.categories.len(),
            splits: table.splits.len(),
        });
    }
    for (row, split) in table.splits.iter().enumerate() {
        if split.len() != table.modes.len() {
            return Err(LayoutError::SplitWidth {
                row,
                found: split.len(),
                expected: table.modes.len(),
            });
        }
    }

    // Resolve colors up front and walk modes in the configured order,
    // whatever order the sheet had them in.
    let mut order: Vec<(usize, ModeColumn)> = Vec::with_capacity(table.modes.len());
    for (column, name) in table.modes.iter().enumerate() {
        let idx = config
            .position_of(name)
            .ok_or_else(|| LayoutError::UnknownMode(name.clone()))?;
        order.push((
            idx,
            ModeColumn {
                name,
                column,
                color: config.modes[idx].color,
            },
        ));
    }
    order.sort_by_key(|(idx, _)| *idx);
    let order: Vec<ModeColumn> = order.into_iter().map(|(_, m)| m).collect();

    let mut rows: Vec<(usize, &str, f64)> = Vec::new();
    for (row, cat) in table.categories.iter().enumerate() {
        if let (Some(name), Some(total)) = (&cat.name, cat.total) {
            let total = check_magnitude(total, row, &config.columns.total)?;
            for m in &order {
                check_magnitude(table.splits[row][m.column], row, m.name)?;
            }
            rows.push((row, name.as_str(), total));
        }
    }
    if rows.is_empty() {
        return Err(LayoutError::Empty);
    }
    let grand_total: f64 = rows.iter().map(|(_, _, t)| t).sum();
    if grand_total <= 0.0 {
        return Err(LayoutError::ZeroTotal);
    }

    let spacing = config.spacing;
    let mut bands = Vec::with_capacity(rows.len());
    let mut ticks = Vec::with_capacity(rows.len());
    let mut segments = Vec::with_capacity(rows.len() * order.len());
    let mut offset = 0.0;
    for (band_idx, (row, label, total)) in rows.iter().enumerate() {
        let share = total / grand_total;
        let span = (share - spacing).max(0.0);
        let center = offset + share / 2.0;

        let split = &table.splits[*row];
        let split_total: f64 = order.iter().map(|m| split[m.column]).sum();
        if split_total <= 0.0 && share > 0.0 {
            warn!(category = %label, "all sub-splits are zero; band left empty");
        }
        let mut inner = 0.0;
        for m in &order {
            let mode_share = if split_total > 0.0 {
                split[m.column] / split_total
            } else {
                0.0
            };
            let extent = (mode_share - spacing).max(0.0);
            segments.push(Segment {
                category: band_idx,
                mode: m.name.to_string(),
                share: mode_share,
                rect: config.orientation.place(offset, span, inner, extent),
                color: m.color,
            });
            inner += mode_share;
        }

        bands.push(Band {
            label: label.to_string(),
            share,
            offset,
            span,
            center,
        });
        ticks.push(Tick {
            position: center,
            label: label.to_string(),
        });
        // Advance by the full share so the spacing shows up as a gap.
        offset += share;
    }
    debug!(
        bands = bands.len(),
        segments = segments.len(),
        orientation = %config.orientation,
        "mosaic layout built"
    );

    Ok(MosaicLayout {
        orientation: config.orientation,
        bands,
        segments,
        ticks,
        legend: config.modes.clone(),
    })
}
