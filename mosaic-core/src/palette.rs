use crate::model::{Color, Mode};

/// Gap reserved between adjacent bands and between segments, in unit space.
pub const MODE_SPACING: f64 = 0.005;

/// Header of the column holding the distance class name.
pub const CATEGORY_COLUMN: &str = "Afstandsklasse";
/// Header of the column holding the distance class total.
pub const TOTAL_COLUMN: &str = "Totaal";

pub fn default_modes() -> Vec<Mode> {
    // Canonical stacking order, bottom to top. Names double as sheet headers.
    const PALETTE: [(&str, Color); 4] = [
        ("Te voet", Color::rgb(0x70, 0xc2, 0x82)),        // green
        ("Fiets", Color::rgb(0xe6, 0x2d, 0x73)),          // pink
        ("OV", Color::rgb(0xff, 0xd4, 0x03)),             // yellow
        ("Auto (+overig)", Color::rgb(0x03, 0x8a, 0xa1)), // teal
    ];
    PALETTE
        .iter()
        .map(|(name, color)| Mode {
            name: (*name).to_string(),
            color: *color,
        })
        .collect()
}
