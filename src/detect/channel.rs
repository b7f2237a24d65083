use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{ensure_dimensions, VisionError};

/// Colour channel used as the detection signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorChannel {
    #[default]
    Red,
    Green,
    Blue,
}

impl ColorChannel {
    /// Offset of this channel inside an RGB pixel.
    pub fn index(self) -> usize {
        match self {
            ColorChannel::Red => 0,
            ColorChannel::Green => 1,
            ColorChannel::Blue => 2,
        }
    }

    pub fn parse(value: &str) -> Result<Self, VisionError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "red" | "r" => Ok(ColorChannel::Red),
            "green" | "g" => Ok(ColorChannel::Green),
            "blue" | "b" => Ok(ColorChannel::Blue),
            other => Err(VisionError::InvalidConfig(format!(
                "unknown colour channel '{other}'"
            ))),
        }
    }
}

/// Copy one channel of `frame` into `plane`.
///
/// `plane` must have the frame's dimensions.
pub fn extract_channel(
    frame: &RgbImage,
    channel: ColorChannel,
    plane: &mut GrayImage,
) -> Result<(), VisionError> {
    ensure_dimensions(frame.dimensions(), plane.dimensions())?;
    let offset = channel.index();
    for (dst, px) in plane.iter_mut().zip(frame.as_raw().chunks_exact(3)) {
        *dst = px[offset];
    }
    Ok(())
}
