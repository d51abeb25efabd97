use serde::{Deserialize, Serialize};
use std::fmt;

/// Ratios offered by the aspect chooser, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    FourThree,
    #[serde(rename = "3:2")]
    ThreeTwo,
    #[serde(rename = "16:9")]
    SixteenNine,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 4] = [
        AspectRatio::Square,
        AspectRatio::FourThree,
        AspectRatio::ThreeTwo,
        AspectRatio::SixteenNine,
    ];

    pub fn ratio(&self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1, 1),
            AspectRatio::FourThree => (4, 3),
            AspectRatio::ThreeTwo => (3, 2),
            AspectRatio::SixteenNine => (16, 9),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::FourThree => "4:3",
            AspectRatio::ThreeTwo => "3:2",
            AspectRatio::SixteenNine => "16:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Crop rectangle in source pixel coordinates, as drawn in the cropper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize, Clone)]
pub struct AspectOption {
    pub label: &'static str,
    pub ratio: AspectRatio,
}
