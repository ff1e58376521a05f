pub mod frame;
pub mod sequence;

pub use frame::{Frame, RawFrame};
pub use sequence::FrameSequence;
