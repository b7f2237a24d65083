//! Connected-component labelling with per-region statistics.
//!
//! Background (every inactive pixel) is always region 0 and carries an explicit
//! [`RegionKind::Background`] tag. Foreground regions are numbered 1..=n in
//! raster order of their first pixel, which is stable for a given mask but
//! says nothing about size or position across frames.

use image::{ImageBuffer, Luma};
use imageproc::region_labelling::{connected_components, Connectivity as LabelConnectivity};
use serde::{Deserialize, Serialize};

use super::blob::{BinaryMask, INACTIVE};
use super::result::{Bounds, Point};
use crate::error::VisionError;

/// Pixel adjacency used when growing regions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Four,
    #[default]
    Eight,
}

impl Connectivity {
    pub fn parse(value: &str) -> Result<Self, VisionError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "four" | "4" => Ok(Connectivity::Four),
            "eight" | "8" => Ok(Connectivity::Eight),
            other => Err(VisionError::InvalidConfig(format!(
                "unknown connectivity '{other}'"
            ))),
        }
    }

    fn to_imageproc(self) -> LabelConnectivity {
        match self {
            Connectivity::Four => LabelConnectivity::Four,
            Connectivity::Eight => LabelConnectivity::Eight,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    Background,
    Foreground,
}

/// One labelled region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: u32,
    pub kind: RegionKind,
    /// Pixel count.
    pub area: u32,
    pub bounds: Bounds,
    /// Mean pixel coordinate. `(0, 0)` for an empty background.
    pub centroid: Point,
}

impl Region {
    pub fn is_foreground(&self) -> bool {
        self.kind == RegionKind::Foreground
    }
}

/// All regions of one mask. `regions[0]` is always the background.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabeledRegions {
    pub width: u32,
    pub height: u32,
    regions: Vec<Region>,
}

impl LabeledRegions {
    pub fn background(&self) -> &Region {
        &self.regions[0]
    }

    pub fn foreground(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(|r| r.is_foreground())
    }

    pub fn foreground_count(&self) -> usize {
        self.regions.len() - 1
    }

    /// Total number of regions, background included.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn has_foreground(&self) -> bool {
        self.foreground_count() > 0
    }

    pub fn get(&self, id: u32) -> Option<&Region> {
        self.regions.get(id as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }
}

#[derive(Clone, Copy)]
struct Accumulator {
    area: u32,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    sum_x: u64,
    sum_y: u64,
}

impl Accumulator {
    fn empty() -> Self {
        Self {
            area: 0,
            min_x: u32::MAX,
            min_y: u32::MAX,
            max_x: 0,
            max_y: 0,
            sum_x: 0,
            sum_y: 0,
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.area += 1;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.sum_x += x as u64;
        self.sum_y += y as u64;
    }

    fn into_region(self, id: u32, kind: RegionKind) -> Region {
        if self.area == 0 {
            return Region {
                id,
                kind,
                area: 0,
                bounds: Bounds::default(),
                centroid: Point::default(),
            };
        }
        let n = self.area as f64;
        Region {
            id,
            kind,
            area: self.area,
            bounds: Bounds {
                left: self.min_x,
                top: self.min_y,
                width: self.max_x - self.min_x + 1,
                height: self.max_y - self.min_y + 1,
            },
            centroid: Point::new(self.sum_x as f64 / n, self.sum_y as f64 / n),
        }
    }
}

/// Label `mask` and compute area, bounds and centroid for every region.
pub fn label_regions(mask: &BinaryMask, connectivity: Connectivity) -> LabeledRegions {
    let (width, height) = mask.dimensions();
    // imageproc's union-find needs at least two pixels.
    let labels = if u64::from(width) * u64::from(height) < 2 {
        ImageBuffer::from_fn(width, height, |x, y| Luma([u32::from(mask.is_active(x, y))]))
    } else {
        connected_components(
            mask.as_image(),
            connectivity.to_imageproc(),
            Luma([INACTIVE]),
        )
    };

    let mut background = Accumulator::empty();
    // Raw label -> dense id (0 = not yet seen).
    let mut dense: Vec<u32> = Vec::new();
    let mut foreground: Vec<Accumulator> = Vec::new();

    for (x, y, px) in labels.enumerate_pixels() {
        let raw = px[0] as usize;
        if raw == 0 {
            background.add(x, y);
            continue;
        }
        if raw >= dense.len() {
            dense.resize(raw + 1, 0);
        }
        if dense[raw] == 0 {
            foreground.push(Accumulator::empty());
            dense[raw] = foreground.len() as u32;
        }
        foreground[dense[raw] as usize - 1].add(x, y);
    }

    let mut regions = Vec::with_capacity(foreground.len() + 1);
    regions.push(background.into_region(0, RegionKind::Background));
    regions.extend(
        foreground
            .into_iter()
            .enumerate()
            .map(|(i, acc)| acc.into_region(i as u32 + 1, RegionKind::Foreground)),
    );

    LabeledRegions {
        width,
        height,
        regions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    fn mask_from(rows: &[&str]) -> BinaryMask {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let plane = GrayImage::from_fn(width, height, |x, y| {
            let c = rows[y as usize].as_bytes()[x as usize];
            Luma([if c == b'#' { 255 } else { 0 }])
        });
        BinaryMask::from_gray(plane, 1)
    }

    #[test]
    fn empty_mask_has_only_background() {
        let regions = label_regions(&mask_from(&["....", "...."]), Connectivity::Eight);
        assert_eq!(regions.region_count(), 1);
        assert!(!regions.has_foreground());
        assert_eq!(regions.background().kind, RegionKind::Background);
        assert_eq!(regions.background().area, 8);
        assert_eq!(regions.background().centroid, Point::new(1.5, 0.5));
    }

    #[test]
    fn single_pixel_masks_are_labelled() {
        let lit = label_regions(&mask_from(&["#"]), Connectivity::Eight);
        assert_eq!(lit.foreground_count(), 1);
        assert_eq!(lit.background().area, 0);
        assert_eq!(lit.get(1).map(|r| r.centroid), Some(Point::new(0.0, 0.0)));

        let dark = label_regions(&mask_from(&["."]), Connectivity::Four);
        assert!(!dark.has_foreground());
        assert_eq!(dark.background().area, 1);
    }

    #[test]
    fn full_mask_keeps_empty_background() {
        let regions = label_regions(&mask_from(&["##", "##"]), Connectivity::Eight);
        assert_eq!(regions.region_count(), 2);
        assert_eq!(regions.background().area, 0);
        assert_eq!(regions.get(1).map(|r| r.area), Some(4));
    }

    #[test]
    fn diagonal_pixels_join_only_with_eight_connectivity() {
        let mask = mask_from(&["#...", ".#..", "...."]);
        assert_eq!(label_regions(&mask, Connectivity::Eight).foreground_count(), 1);
        assert_eq!(label_regions(&mask, Connectivity::Four).foreground_count(), 2);
    }

    #[test]
    fn ids_follow_raster_first_appearance() {
        let mask = mask_from(&[
            "......##", //
            "#.....##", //
            "#.......", //
        ]);
        let regions = label_regions(&mask, Connectivity::Eight);
        assert_eq!(regions.foreground_count(), 2);
        let first = regions.get(1).unwrap();
        let second = regions.get(2).unwrap();
        assert_eq!(first.bounds.left, 6);
        assert_eq!(first.area, 4);
        assert_eq!(second.bounds.left, 0);
        assert_eq!(second.area, 2);
    }

    #[test]
    fn stats_cover_bounds_and_centroid() {
        let mask = mask_from(&[
            ".....", //
            ".###.", //
            ".###.", //
            ".....", //
        ]);
        let regions = label_regions(&mask, Connectivity::Eight);
        let blob = regions.get(1).unwrap();
        assert_eq!(blob.kind, RegionKind::Foreground);
        assert_eq!(blob.area, 6);
        assert_eq!(
            blob.bounds,
            Bounds {
                left: 1,
                top: 1,
                width: 3,
                height: 2
            }
        );
        assert_eq!(blob.centroid, Point::new(2.0, 1.5));
    }

    #[test]
    fn border_touching_blob_is_foreground() {
        let mask = mask_from(&["##...", "##...", "....."]);
        let regions = label_regions(&mask, Connectivity::Eight);
        assert_eq!(regions.foreground_count(), 1);
        let blob = regions.foreground().next().unwrap();
        assert_eq!(blob.bounds.left, 0);
        assert_eq!(blob.bounds.top, 0);
        assert_eq!(regions.background().area, 11);
    }

    #[test]
    fn parse_accepts_digits() {
        assert_eq!(Connectivity::parse("8").unwrap(), Connectivity::Eight);
        assert_eq!(Connectivity::parse("Four").unwrap(), Connectivity::Four);
        assert!(Connectivity::parse("six").is_err());
    }
}
