pub mod color;
pub mod error;
pub mod geometry;
pub mod video;

pub use error::ScanError;
