use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Size presets understood by the generation provider.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImageSize {
    #[default]
    SquareHd,
    Square,
    #[serde(rename = "portrait_4_3")]
    Portrait4x3,
    #[serde(rename = "portrait_16_9")]
    Portrait16x9,
    #[serde(rename = "landscape_4_3")]
    Landscape4x3,
    #[serde(rename = "landscape_16_9")]
    Landscape16x9,
}

impl Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size = match self {
            ImageSize::SquareHd => "square_hd",
            ImageSize::Square => "square",
            ImageSize::Portrait4x3 => "portrait_4_3",
            ImageSize::Portrait16x9 => "portrait_16_9",
            ImageSize::Landscape4x3 => "landscape_4_3",
            ImageSize::Landscape16x9 => "landscape_16_9",
        };
        write!(f, "{}", size)
    }
}

impl ImageSize {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "square_hd" => Some(ImageSize::SquareHd),
            "square" => Some(ImageSize::Square),
            "portrait_4_3" => Some(ImageSize::Portrait4x3),
            "portrait_16_9" => Some(ImageSize::Portrait16x9),
            "landscape_4_3" => Some(ImageSize::Landscape4x3),
            "landscape_16_9" => Some(ImageSize::Landscape16x9),
            _ => None,
        }
    }
}
