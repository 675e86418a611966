pub mod hsv;
pub mod stats;

pub use hsv::{classify, rgb_to_hsv, ColorDescriptor, ColorName, Hsv};
pub use stats::{compute_region_stats, ColorMask, RegionStats};
