//! Features Module - on-device biometric feature extraction
//!
//! - `embedding` - fixed 128-dimensional embedding and `FeatureSample`
//! - `extractor` - detector capability, lazy model handle, confidence gate

pub mod embedding;
pub mod extractor;

pub use embedding::{Embedding, FeatureSample};
pub use extractor::{Detection, DetectorError, FaceDetector, FeatureExtractor, ImageFrame, ModelHandle};
