//! Laser-dot detection stages.
//!
//! Channel extraction → blob isolation → connected components → selection.
//! Each stage is a plain function over caller-owned buffers; nothing here
//! remembers previous frames.

pub mod blob;
pub mod channel;
pub mod label;
mod result;
pub mod select;

pub use blob::{isolate_blobs, BinaryMask, BlobParams, BlobScratch, ACTIVE, INACTIVE};
pub use channel::{extract_channel, ColorChannel};
pub use label::{label_regions, Connectivity, LabeledRegions, Region, RegionKind};
pub use result::{Bounds, Detection, Point};
pub use select::SelectionPolicy;
