//! Blob isolation: threshold, Gaussian blur, re-threshold.
//!
//! The blur merges near-adjacent active pixels and pushes isolated noise
//! pixels below `mask_level`. The final re-threshold maps the blurred plane
//! back onto {0, 255}, so no intermediate value can leave the u8 range.

use image::GrayImage;

use crate::error::{ensure_dimensions, VisionError};

/// Active pixel value in thresholded planes and masks.
pub const ACTIVE: u8 = 255;
/// Inactive pixel value.
pub const INACTIVE: u8 = 0;
/// Largest accepted Gaussian kernel size.
pub const MAX_BLUR_KERNEL: usize = 99;

/// Blob isolation parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct BlobParams {
    /// Channel intensity at or above which a pixel is active.
    pub threshold: u8,
    /// Gaussian kernel width and height (odd).
    pub blur_kernel: usize,
    /// Gaussian standard deviation in pixels.
    pub blur_sigma: f64,
    /// Blurred intensity at or above which a pixel stays in the mask.
    pub mask_level: u8,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            threshold: 240,
            blur_kernel: 5,
            blur_sigma: 1.0,
            mask_level: 128,
        }
    }
}

impl BlobParams {
    pub fn validate(&self) -> Result<(), VisionError> {
        gaussian_kernel(self.blur_kernel, self.blur_sigma)?;
        if self.mask_level == 0 {
            return Err(VisionError::InvalidConfig(
                "mask_level must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Single-channel mask whose pixels are only ever [`ACTIVE`] or [`INACTIVE`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMask(GrayImage);

impl BinaryMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self(GrayImage::new(width, height))
    }

    /// Binarise an arbitrary plane: values `>= level` become active.
    pub fn from_gray(mut plane: GrayImage, level: u8) -> Self {
        binarize(&mut plane, level);
        Self(plane)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn is_active(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y)[0] == ACTIVE
    }

    pub fn active_count(&self) -> usize {
        self.0.iter().filter(|&&v| v == ACTIVE).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.0
    }
}

/// Caller-owned buffers reused across [`isolate_blobs`] calls.
#[derive(Debug)]
pub struct BlobScratch {
    thresholded: GrayImage,
    row_pass: Vec<f32>,
    kernel: Vec<f32>,
    kernel_key: (usize, u64),
}

impl BlobScratch {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            thresholded: GrayImage::new(width, height),
            row_pass: vec![0.0; width as usize * height as usize],
            kernel: Vec::new(),
            kernel_key: (0, 0),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.thresholded.dimensions()
    }

    fn ensure_kernel(&mut self, size: usize, sigma: f64) -> Result<(), VisionError> {
        let key = (size, sigma.to_bits());
        if self.kernel.is_empty() || self.kernel_key != key {
            self.kernel = gaussian_kernel(size, sigma)?;
            self.kernel_key = key;
        }
        Ok(())
    }
}

/// Threshold, blur and re-threshold `plane` into `mask`.
///
/// `plane` is left untouched. `scratch` and `mask` must match its dimensions.
pub fn isolate_blobs(
    plane: &GrayImage,
    params: &BlobParams,
    scratch: &mut BlobScratch,
    mask: &mut BinaryMask,
) -> Result<(), VisionError> {
    ensure_dimensions(plane.dimensions(), scratch.dimensions())?;
    ensure_dimensions(plane.dimensions(), mask.dimensions())?;
    if params.mask_level == 0 {
        return Err(VisionError::InvalidConfig(
            "mask_level must be at least 1".to_string(),
        ));
    }

    scratch.thresholded.copy_from_slice(plane);
    threshold_in_place(&mut scratch.thresholded, params.threshold);

    scratch.ensure_kernel(params.blur_kernel, params.blur_sigma)?;
    let BlobScratch {
        thresholded,
        row_pass,
        kernel,
        ..
    } = scratch;
    gaussian_blur_into(thresholded, kernel, row_pass, &mut mask.0)?;

    binarize(&mut mask.0, params.mask_level);
    Ok(())
}

/// Hard cutoff: `>= threshold` becomes [`ACTIVE`], everything else [`INACTIVE`].
pub fn threshold_in_place(plane: &mut GrayImage, threshold: u8) {
    binarize(plane, threshold);
}

fn binarize(plane: &mut GrayImage, level: u8) {
    for v in plane.iter_mut() {
        *v = if *v >= level { ACTIVE } else { INACTIVE };
    }
}

/// Normalised 1D Gaussian taps, `exp(-x^2 / 2 sigma^2)` for `x` in `-size/2..=size/2`.
pub fn gaussian_kernel(size: usize, sigma: f64) -> Result<Vec<f32>, VisionError> {
    validate_kernel(size, sigma)?;
    let half = (size / 2) as f64;
    let denom = 2.0 * sigma * sigma;
    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let x = i as f64 - half;
            (-(x * x) / denom).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    if !(sum.is_finite() && sum > 0.0) {
        return Err(VisionError::InvalidConfig(format!(
            "blur sigma {sigma} does not give a usable kernel"
        )));
    }
    Ok(raw.into_iter().map(|w| (w / sum) as f32).collect())
}

fn validate_kernel(size: usize, sigma: f64) -> Result<(), VisionError> {
    if size == 0 || size % 2 == 0 || size > MAX_BLUR_KERNEL {
        return Err(VisionError::InvalidConfig(format!(
            "blur kernel must be an odd size in 1..={MAX_BLUR_KERNEL} (got {size})"
        )));
    }
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(VisionError::InvalidConfig(format!(
            "blur sigma must be positive (got {sigma})"
        )));
    }
    Ok(())
}

/// Separable convolution of `src` with `kernel` along both axes.
///
/// Borders reflect without repeating the edge pixel (`gfedcb|abcdefgh|gfedcba`).
/// `row_pass` must hold `width * height` values; `dst` must match `src`.
pub fn gaussian_blur_into(
    src: &GrayImage,
    kernel: &[f32],
    row_pass: &mut [f32],
    dst: &mut GrayImage,
) -> Result<(), VisionError> {
    ensure_dimensions(src.dimensions(), dst.dimensions())?;
    let (w, h) = (src.width() as usize, src.height() as usize);
    if row_pass.len() != w * h {
        return Err(VisionError::buffer_len(w * h, row_pass.len()));
    }
    if w == 0 || h == 0 {
        return Ok(());
    }
    let half = kernel.len() as isize / 2;
    let input: &[u8] = src;

    // Horizontal pass.
    for y in 0..h {
        let row = &input[y * w..(y + 1) * w];
        let out = &mut row_pass[y * w..(y + 1) * w];
        for (x, acc_out) in out.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for (k, &kv) in kernel.iter().enumerate() {
                let sx = reflect_101(x as isize + k as isize - half, w);
                acc += row[sx] as f32 * kv;
            }
            *acc_out = acc;
        }
    }

    // Vertical pass.
    let output: &mut [u8] = dst;
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, &kv) in kernel.iter().enumerate() {
                let sy = reflect_101(y as isize + k as isize - half, h);
                acc += row_pass[sy * w + x] * kv;
            }
            output[y * w + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }
    Ok(())
}

fn reflect_101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    let period = 2 * (n - 1);
    let mut i = i.rem_euclid(period);
    if i >= n {
        i = period - i;
    }
    i as usize
}
