//! RGB phenotype colours and camouflage distance.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Largest possible Euclidean distance between two RGB colours.
const MAX_RGB_DISTANCE: f32 = 441.672_96; // sqrt(3) * 255

/// An 8-bit RGB triple, serialized as `[r, g, b]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    /// Normalized Euclidean distance to another colour, in [0, 1].
    #[inline]
    pub fn distance(self, other: Rgb) -> f32 {
        color_distance(self, other)
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Rgb(240, 240, 240)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.0, self.1, self.2)
    }
}

/// Error returned when a colour string cannot be parsed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid colour `{0}`: expected `r,g,b` or `#rrggbb`")]
pub struct ParseRgbError(String);

impl FromStr for Rgb {
    type Err = ParseRgbError;

    /// Accepts `"r,g,b"`, `"#rrggbb"` and the short `"#rgb"` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRgbError(s.to_string());
        let trimmed = s.trim();

        if let Some(hex) = trimmed.strip_prefix('#') {
            if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(err());
            }
            let expanded: String = if hex.len() == 3 {
                hex.chars().flat_map(|c| [c, c]).collect()
            } else {
                hex.to_string()
            };
            if expanded.len() != 6 {
                return Err(err());
            }
            let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| err());
            return Ok(Rgb(channel(0)?, channel(2)?, channel(4)?));
        }

        let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(err());
        }
        let channel = |p: &str| p.parse::<u8>().map_err(|_| err());
        Ok(Rgb(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?))
    }
}

/// Euclidean RGB distance divided by `sqrt(3) * 255`, so the result is in [0, 1].
pub fn color_distance(a: Rgb, b: Rgb) -> f32 {
    let dr = a.0 as f32 - b.0 as f32;
    let dg = a.1 as f32 - b.1 as f32;
    let db = a.2 as f32 - b.2 as f32;
    ((dr * dr + dg * dg + db * db).sqrt() / MAX_RGB_DISTANCE).clamp(0.0, 1.0)
}

/// Bacterial pigment derived from the colour gene.
///
/// Each channel follows a sine of the gene at a different frequency, which keeps
/// the palette in natural-looking pastel tones.
pub fn bacteria_color(color_gene: f32) -> Rgb {
    let channel = |freq: f32| to_channel(150.0 + 100.0 * (color_gene * PI * freq).sin());
    Rgb(channel(1.0), channel(1.7), channel(2.3))
}

/// Phagocyte membrane colour: redder when aggressive, greener when sensitive.
pub fn phagocyte_color(aggression: f32, sensitivity: f32) -> Rgb {
    Rgb(
        to_channel(100.0 + 155.0 * aggression),
        to_channel(100.0 + 100.0 * sensitivity),
        to_channel(200.0 - 100.0 * aggression),
    )
}

#[inline]
fn to_channel(value: f32) -> u8 {
    // `as` saturates and maps NaN to 0
    value.clamp(0.0, 255.0) as u8
}
