use serde::{Deserialize, Serialize};

use super::label::{LabeledRegions, Region};
use crate::error::VisionError;

/// Which foreground region becomes the detection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Largest pixel count; ties go to the lowest id.
    #[default]
    LargestArea,
    /// Whatever region got id 1. Depends on label order, so a stray
    /// reflection above the dot wins. Kept for parity with older setups.
    FirstLabel,
}

impl SelectionPolicy {
    pub fn parse(value: &str) -> Result<Self, VisionError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "largest_area" | "largest" => Ok(SelectionPolicy::LargestArea),
            "first_label" | "first" => Ok(SelectionPolicy::FirstLabel),
            other => Err(VisionError::InvalidConfig(format!(
                "unknown selection policy '{other}'"
            ))),
        }
    }

    /// Pick at most one foreground region. Background is never a candidate.
    pub fn select<'a>(&self, regions: &'a LabeledRegions) -> Option<&'a Region> {
        match self {
            SelectionPolicy::LargestArea => regions.foreground().fold(None, |best, r| match best {
                Some(b) if b.area >= r.area => Some(b),
                _ => Some(r),
            }),
            SelectionPolicy::FirstLabel => regions.foreground().next(),
        }
    }
}
