use image::{GrayImage, RgbImage};
use imageproc::edges::canny;

/// Canny edge plane of `frame`'s luma.
pub fn edge_plane(frame: &RgbImage, low: f32, high: f32) -> GrayImage {
    let gray = image::imageops::grayscale(frame);
    canny(&gray, low, high)
}
