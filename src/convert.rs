//! Pixel format conversion between capture, processing and display buffers.
//!
//! Every conversion is a side-effect-free per-row transform. Rows are
//! handed to rayon workers; each worker writes only its own output row, so
//! no locking is needed and row order does not matter.

use image::{GrayImage, RgbImage, RgbaImage};
use rayon::prelude::*;

use crate::error::{ensure_dimensions, VisionError};

/// Alpha written into display buffers.
pub const DISPLAY_ALPHA: u8 = 255;

/// Capture pixel layouts accepted by [`to_frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 4 bytes per pixel, R G B A (texture readback).
    Rgba32,
    /// 3 bytes per pixel, R G B (V4L2 `RGB3`).
    Rgb24,
    /// Packed 4:2:2, Y0 U Y1 V per pixel pair (V4L2 `YUYV`).
    Yuyv,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba32 => 4,
            PixelFormat::Rgb24 => 3,
            PixelFormat::Yuyv => 2,
        }
    }
}

/// Convert a capture buffer into `dst`, which must already be `width x height`.
pub fn to_frame(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
    dst: &mut RgbImage,
) -> Result<(), VisionError> {
    match format {
        PixelFormat::Rgba32 => texels_to_frame(pixels, width, height, dst),
        PixelFormat::Rgb24 => rgb24_to_frame(pixels, width, height, dst),
        PixelFormat::Yuyv => yuyv_to_frame(pixels, width, height, dst),
    }
}

/// RGBA32 texels to RGB frame. Alpha is dropped.
pub fn texels_to_frame(
    texels: &[u8],
    width: u32,
    height: u32,
    dst: &mut RgbImage,
) -> Result<(), VisionError> {
    check_source(texels, width, height, PixelFormat::Rgba32)?;
    ensure_dimensions((width, height), dst.dimensions())?;
    if width == 0 || height == 0 {
        return Ok(());
    }

    let w = width as usize;
    let out: &mut [u8] = dst;
    out.par_chunks_exact_mut(w * 3)
        .zip(texels.par_chunks_exact(w * 4))
        .for_each(|(dst_row, src_row)| {
            for (d, s) in dst_row.chunks_exact_mut(3).zip(src_row.chunks_exact(4)) {
                d.copy_from_slice(&s[..3]);
            }
        });
    Ok(())
}

/// RGB24 device buffer to RGB frame.
pub fn rgb24_to_frame(
    pixels: &[u8],
    width: u32,
    height: u32,
    dst: &mut RgbImage,
) -> Result<(), VisionError> {
    check_source(pixels, width, height, PixelFormat::Rgb24)?;
    ensure_dimensions((width, height), dst.dimensions())?;
    if width == 0 || height == 0 {
        return Ok(());
    }

    let w = width as usize;
    let out: &mut [u8] = dst;
    out.par_chunks_exact_mut(w * 3)
        .zip(pixels.par_chunks_exact(w * 3))
        .for_each(|(dst_row, src_row)| dst_row.copy_from_slice(src_row));
    Ok(())
}

/// YUYV (BT.601, full range) to RGB frame. `width` must be even.
pub fn yuyv_to_frame(
    pixels: &[u8],
    width: u32,
    height: u32,
    dst: &mut RgbImage,
) -> Result<(), VisionError> {
    if width % 2 != 0 {
        return Err(VisionError::InvalidConfig(format!(
            "YUYV frames need an even width (got {width})"
        )));
    }
    check_source(pixels, width, height, PixelFormat::Yuyv)?;
    ensure_dimensions((width, height), dst.dimensions())?;
    if width == 0 || height == 0 {
        return Ok(());
    }

    let w = width as usize;
    let out: &mut [u8] = dst;
    out.par_chunks_exact_mut(w * 3)
        .zip(pixels.par_chunks_exact(w * 2))
        .for_each(|(dst_row, src_row)| {
            for (d, s) in dst_row.chunks_exact_mut(6).zip(src_row.chunks_exact(4)) {
                let u = s[1] as f32 - 128.0;
                let v = s[3] as f32 - 128.0;
                write_yuv(&mut d[..3], s[0] as f32, u, v);
                write_yuv(&mut d[3..], s[2] as f32, u, v);
            }
        });
    Ok(())
}

fn write_yuv(dst: &mut [u8], y: f32, u: f32, v: f32) {
    let r = y + 1.402_f32 * v;
    let g = y - 0.344_136_f32 * u - 0.714_136_f32 * v;
    let b = y + 1.772_f32 * u;
    dst[0] = clamp_to_u8(r);
    dst[1] = clamp_to_u8(g);
    dst[2] = clamp_to_u8(b);
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Single-channel plane to grey RGBA for display.
pub fn plane_to_rgba(plane: &GrayImage, dst: &mut RgbaImage) -> Result<(), VisionError> {
    ensure_dimensions(plane.dimensions(), dst.dimensions())?;
    let w = plane.width() as usize;
    if w == 0 || plane.height() == 0 {
        return Ok(());
    }

    let src: &[u8] = plane;
    let out: &mut [u8] = dst;
    out.par_chunks_exact_mut(w * 4)
        .zip(src.par_chunks_exact(w))
        .for_each(|(dst_row, src_row)| {
            for (d, &v) in dst_row.chunks_exact_mut(4).zip(src_row) {
                d.copy_from_slice(&[v, v, v, DISPLAY_ALPHA]);
            }
        });
    Ok(())
}

/// RGB frame to opaque RGBA for display.
pub fn frame_to_rgba(frame: &RgbImage, dst: &mut RgbaImage) -> Result<(), VisionError> {
    ensure_dimensions(frame.dimensions(), dst.dimensions())?;
    let w = frame.width() as usize;
    if w == 0 || frame.height() == 0 {
        return Ok(());
    }

    let src: &[u8] = frame;
    let out: &mut [u8] = dst;
    out.par_chunks_exact_mut(w * 4)
        .zip(src.par_chunks_exact(w * 3))
        .for_each(|(dst_row, src_row)| {
            for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(3)) {
                d.copy_from_slice(&[s[0], s[1], s[2], DISPLAY_ALPHA]);
            }
        });
    Ok(())
}

fn check_source(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<(), VisionError> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(format.bytes_per_pixel()))
        .ok_or_else(|| VisionError::InvalidConfig("frame dimensions overflow".to_string()))?;
    if pixels.len() != expected {
        return Err(VisionError::buffer_len(expected, pixels.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, Rgba};

    #[test]
    fn texels_drop_alpha() -> Result<(), VisionError> {
        // 2x2, each texel distinct
        let texels = vec![
            10, 20, 30, 0, 11, 21, 31, 7, //
            12, 22, 32, 255, 13, 23, 33, 1,
        ];
        let mut frame = RgbImage::new(2, 2);
        texels_to_frame(&texels, 2, 2, &mut frame)?;
        assert_eq!(frame.get_pixel(0, 0), &Rgb([10, 20, 30]));
        assert_eq!(frame.get_pixel(1, 0), &Rgb([11, 21, 31]));
        assert_eq!(frame.get_pixel(0, 1), &Rgb([12, 22, 32]));
        assert_eq!(frame.get_pixel(1, 1), &Rgb([13, 23, 33]));
        Ok(())
    }

    #[test]
    fn texels_reject_short_buffer() {
        let mut frame = RgbImage::new(2, 2);
        let err = texels_to_frame(&[0u8; 15], 2, 2, &mut frame).unwrap_err();
        assert_eq!(err, VisionError::buffer_len(16, 15));
    }

    #[test]
    fn rgb24_rejects_wrong_destination() {
        let mut frame = RgbImage::new(3, 2);
        let err = rgb24_to_frame(&[0u8; 12], 2, 2, &mut frame).unwrap_err();
        assert_eq!(err, VisionError::dimensions((2, 2), (3, 2)));
    }

    #[test]
    fn rgb24_copies_rows() -> Result<(), VisionError> {
        let pixels: Vec<u8> = (0u8..18).collect();
        let mut frame = RgbImage::new(3, 2);
        to_frame(&pixels, 3, 2, PixelFormat::Rgb24, &mut frame)?;
        assert_eq!(frame.as_raw(), &pixels);
        Ok(())
    }

    #[test]
    fn yuyv_neutral_chroma_is_grey() -> Result<(), VisionError> {
        let pixels = vec![128u8, 128, 60, 128, 10, 128, 200, 128];
        let mut frame = RgbImage::new(2, 2);
        yuyv_to_frame(&pixels, 2, 2, &mut frame)?;
        assert_eq!(frame.get_pixel(0, 0), &Rgb([128, 128, 128]));
        assert_eq!(frame.get_pixel(1, 0), &Rgb([60, 60, 60]));
        assert_eq!(frame.get_pixel(1, 1), &Rgb([200, 200, 200]));
        Ok(())
    }

    #[test]
    fn yuyv_rejects_odd_width() {
        let mut frame = RgbImage::new(3, 1);
        assert!(yuyv_to_frame(&[0u8; 6], 3, 1, &mut frame).is_err());
    }

    #[test]
    fn plane_becomes_opaque_grey() -> Result<(), VisionError> {
        let mut plane = GrayImage::new(3, 1);
        plane.put_pixel(1, 0, Luma([200]));
        let mut rgba = RgbaImage::new(3, 1);
        plane_to_rgba(&plane, &mut rgba)?;
        assert_eq!(rgba.get_pixel(0, 0), &Rgba([0, 0, 0, DISPLAY_ALPHA]));
        assert_eq!(rgba.get_pixel(1, 0), &Rgba([200, 200, 200, DISPLAY_ALPHA]));
        Ok(())
    }

    #[test]
    fn frame_to_rgba_keeps_channel_order() -> Result<(), VisionError> {
        let mut frame = RgbImage::new(1, 2);
        frame.put_pixel(0, 1, Rgb([250, 5, 9]));
        let mut rgba = RgbaImage::new(1, 2);
        frame_to_rgba(&frame, &mut rgba)?;
        assert_eq!(rgba.get_pixel(0, 1), &Rgba([250, 5, 9, DISPLAY_ALPHA]));
        Ok(())
    }
}
