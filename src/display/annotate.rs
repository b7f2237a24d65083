use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_circle_mut;

use crate::detect::Detection;

/// Stroke colour on the colour preview.
pub const MARKER_RGB: Rgb<u8> = Rgb([255, 255, 255]);
/// Stroke value on the edge plane.
pub const MARKER_LUMA: Luma<u8> = Luma([255]);

/// Draw the detection marker on both display buffers. No-op without a detection.
pub fn annotate(detection: Option<&Detection>, preview: &mut RgbImage, edges: &mut GrayImage) {
    let Some(detection) = detection else {
        return;
    };
    let center = detection.center.to_pixel();
    let radius = detection.marker_radius as i32;
    draw_hollow_circle_mut(preview, center, radius, MARKER_RGB);
    draw_hollow_circle_mut(edges, center, radius, MARKER_LUMA);
}
