use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::layout::LayoutError;
use crate::palette::{CATEGORY_COLUMN, MODE_SPACING, TOTAL_COLUMN, default_modes};

/// One cell of an ingested sheet, reduced to what the layout cares about.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Parse raw text the way a spreadsheet would display it: blank is empty,
    /// anything numeric is a number, everything else stays text.
    pub fn parse(raw: &str) -> Cell {
        let s = raw.trim();
        if s.is_empty() {
            return Cell::Empty;
        }
        match s.parse::<f64>() {
            Ok(v) => Cell::Number(v),
            Err(_) => Cell::Text(s.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// A distance class row. Rows missing either field are not laid out.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub name: Option<String>,
    pub total: Option<f64>,
}

/// Category rows plus the per-row sub-split magnitudes, aligned by position.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyTable {
    pub categories: Vec<CategoryRow>,
    pub modes: Vec<String>,
    pub splits: Vec<Vec<f64>>,
}

impl SurveyTable {
    pub fn push_row(&mut self, name: Option<String>, total: Option<f64>, split: Vec<f64>) {
        self.categories.push(CategoryRow { name, total });
        self.splits.push(split);
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid color {0:?}, expected #rrggbb")]
pub struct ColorError(String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    pub fn from_hex(s: &str) -> Result<Self, ColorError> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ColorError(s.to_string()))
        };
        Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

/// A transport mode: sheet header, legend label and fill color in one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mode {
    pub name: String,
    pub color: Color,
}

/// Which axis carries the distance classes. The other axis stacks the modes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    #[serde(rename = "x", alias = "categories_on_x")]
    CategoriesOnX,
    #[serde(rename = "y", alias = "categories_on_y")]
    CategoriesOnY,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown orientation {0:?}, expected \"x\" or \"y\"")]
pub struct ParseOrientationError(String);

impl FromStr for Orientation {
    type Err = ParseOrientationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" | "categories_on_x" | "vertical" => Ok(Orientation::CategoriesOnX),
            "y" | "categories_on_y" | "horizontal" => Ok(Orientation::CategoriesOnY),
            _ => Err(ParseOrientationError(s.to_string())),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::CategoriesOnX => f.write_str("x"),
            Orientation::CategoriesOnY => f.write_str("y"),
        }
    }
}

/// Sheet headers for the two category columns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Columns {
    pub category: String,
    pub total: String,
}

impl Default for Columns {
    fn default() -> Self {
        Columns {
            category: CATEGORY_COLUMN.to_string(),
            total: TOTAL_COLUMN.to_string(),
        }
    }
}

/// Everything the layout needs besides the data. Loaded from JSON or defaulted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub spacing: f64,
    pub modes: Vec<Mode>,
    pub orientation: Orientation,
    pub columns: Columns,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            spacing: MODE_SPACING,
            modes: default_modes(),
            orientation: Orientation::default(),
            columns: Columns::default(),
        }
    }
}

impl LayoutConfig {
    pub fn from_json_str(txt: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(txt)
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn mode_names(&self) -> Vec<String> {
        self.modes.iter().map(|m| m.name.clone()).collect()
    }

    pub fn position_of(&self, mode: &str) -> Option<usize> {
        self.modes.iter().position(|m| m.name == mode)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if !self.spacing.is_finite() || !(0.0..0.5).contains(&self.spacing) {
            return Err(LayoutError::Config(format!(
                "spacing must be in [0, 0.5), got {}",
                self.spacing
            )));
        }
        if self.modes.is_empty() {
            return Err(LayoutError::Config("no modes configured".to_string()));
        }
        let mut seen = HashSet::new();
        for m in &self.modes {
            if !seen.insert(m.name.as_str()) {
                return Err(LayoutError::Config(format!("duplicate mode {:?}", m.name)));
            }
        }
        Ok(())
    }
}
