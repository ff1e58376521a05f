pub mod batch;
pub mod inference;
pub mod pulse;
pub mod signal;
pub mod video;
