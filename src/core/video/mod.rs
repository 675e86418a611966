pub mod frame;

pub use frame::{Frame, FrameInfo, RawFrame};
