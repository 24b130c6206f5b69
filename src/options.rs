//! Print-finishing options.
//!
//! Four independent enumerated fields make up [`FinishingOptions`]. No field
//! constrains another, so all 2 × 2 × 3 × 2 = 24 combinations are valid and
//! each produces a defined result.
//!
//! Each enum parses from the string a form or a CLI flag would carry. Both the
//! snake_case form tokens (`black_and_white`, `two_holes`, `no_staple`) and
//! their camelCase spellings (`blackAndWhite`, `twoHoles`) are accepted, case
//! insensitively. Anything else is an [`PreviewError::InvalidOption`]; there
//! is no silent fallback to a default.

use crate::error::PreviewError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Copy colour: keep the page in colour or reduce it to grayscale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    #[default]
    Color,
    BlackAndWhite,
}

/// Page orientation. Landscape rotates the page 90° counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Paper punch along the left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Punch {
    #[default]
    None,
    TwoHoles,
    ThreeHoles,
}

/// Paper binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    #[default]
    None,
    CornerStaple,
}

/// Lower-case a form value and strip `_`/`-` so `black_and_white`,
/// `blackAndWhite` and `Black-And-White` all compare equal.
fn fold(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl FromStr for ColorMode {
    type Err = PreviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold(s).as_str() {
            "color" | "colour" => Ok(ColorMode::Color),
            "blackandwhite" | "grayscale" | "greyscale" => Ok(ColorMode::BlackAndWhite),
            _ => Err(PreviewError::InvalidOption {
                field: "color_mode",
                value: s.to_string(),
                expected: "color, black_and_white",
            }),
        }
    }
}

impl FromStr for Orientation {
    type Err = PreviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold(s).as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            _ => Err(PreviewError::InvalidOption {
                field: "orientation",
                value: s.to_string(),
                expected: "portrait, landscape",
            }),
        }
    }
}

impl FromStr for Punch {
    type Err = PreviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold(s).as_str() {
            "none" | "nohole" | "noholes" => Ok(Punch::None),
            "twoholes" => Ok(Punch::TwoHoles),
            "threeholes" => Ok(Punch::ThreeHoles),
            _ => Err(PreviewError::InvalidOption {
                field: "punch",
                value: s.to_string(),
                expected: "no_hole, two_holes, three_holes",
            }),
        }
    }
}

impl FromStr for Binding {
    type Err = PreviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold(s).as_str() {
            "none" | "nostaple" => Ok(Binding::None),
            "cornerstaple" => Ok(Binding::CornerStaple),
            _ => Err(PreviewError::InvalidOption {
                field: "binding",
                value: s.to_string(),
                expected: "no_staple, corner_staple",
            }),
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColorMode::Color => "color",
            ColorMode::BlackAndWhite => "black_and_white",
        })
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        })
    }
}

impl fmt::Display for Punch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Punch::None => "no_hole",
            Punch::TwoHoles => "two_holes",
            Punch::ThreeHoles => "three_holes",
        })
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Binding::None => "no_staple",
            Binding::CornerStaple => "corner_staple",
        })
    }
}

/// The four finishing choices applied to every page of one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FinishingOptions {
    pub color_mode: ColorMode,
    pub orientation: Orientation,
    pub punch: Punch,
    pub binding: Binding,
}

impl FinishingOptions {
    pub fn new(color_mode: ColorMode, orientation: Orientation, punch: Punch, binding: Binding) -> Self {
        Self {
            color_mode,
            orientation,
            punch,
            binding,
        }
    }

    /// Parse all four raw values, failing on the first one out of domain.
    pub fn parse(form: &FormFields) -> Result<Self, PreviewError> {
        Ok(Self {
            color_mode: form.color_mode.parse()?,
            orientation: form.orientation.parse()?,
            punch: form.punch.parse()?,
            binding: form.binding.parse()?,
        })
    }

    /// Every valid combination, in a stable order.
    pub fn all() -> Vec<FinishingOptions> {
        let mut out = Vec::with_capacity(24);
        for color_mode in [ColorMode::Color, ColorMode::BlackAndWhite] {
            for orientation in [Orientation::Portrait, Orientation::Landscape] {
                for punch in [Punch::None, Punch::TwoHoles, Punch::ThreeHoles] {
                    for binding in [Binding::None, Binding::CornerStaple] {
                        out.push(FinishingOptions::new(color_mode, orientation, punch, binding));
                    }
                }
            }
        }
        out
    }
}

impl fmt::Display for FinishingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.color_mode, self.orientation, self.punch, self.binding
        )
    }
}

/// Unvalidated option values exactly as they arrived from a form or CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormFields {
    pub color_mode: String,
    pub orientation: String,
    pub punch: String,
    pub binding: String,
}

impl FormFields {
    pub fn new(
        color_mode: impl Into<String>,
        orientation: impl Into<String>,
        punch: impl Into<String>,
        binding: impl Into<String>,
    ) -> Self {
        Self {
            color_mode: color_mode.into(),
            orientation: orientation.into(),
            punch: punch.into(),
            binding: binding.into(),
        }
    }
}
