//! Training Module - local sample retention and update computation

pub mod buffer;
pub mod gradient;

pub use buffer::{BufferStatus, TrainingBatch, TrainingBuffer, TrainingEntry};
pub use gradient::{GradientComputer, GradientUpdate};
