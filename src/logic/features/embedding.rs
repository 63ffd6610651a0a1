//! Embedding - fixed-dimension face descriptor
//!
//! The detector hands back a loosely sized `Vec<f32>`; everything past the
//! extractor works on `[f32; EMBEDDING_DIMENSION]` so a wrong dimension can
//! only surface in one place.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{EMBEDDING_DIMENSION, MIN_DETECTION_CONFIDENCE};
use crate::error::{BiometricError, BiometricResult};

// ============================================================================
// FIXED ARRAY SERDE
// ============================================================================

/// Serde adapter for `[T; EMBEDDING_DIMENSION]` (serde only covers arrays up to 32)
pub(crate) mod fixed_array {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::constants::EMBEDDING_DIMENSION;

    pub fn serialize<S, T>(values: &[T; EMBEDDING_DIMENSION], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        serializer.collect_seq(values.iter())
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<[T; EMBEDDING_DIMENSION], D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let values = Vec::<T>::deserialize(deserializer)?;
        let len = values.len();
        values
            .try_into()
            .map_err(|_| D::Error::invalid_length(len, &"exactly 128 components"))
    }
}

// ============================================================================
// EMBEDDING
// ============================================================================

/// 128-dimensional face embedding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(#[serde(with = "fixed_array")] [f32; EMBEDDING_DIMENSION]);

impl Embedding {
    pub fn from_array(values: [f32; EMBEDDING_DIMENSION]) -> Self {
        Self(values)
    }

    /// Build from a detector output; `None` unless the length is exactly 128
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        let array: [f32; EMBEDDING_DIMENSION] = values.try_into().ok()?;
        Some(Self(array))
    }

    /// Every component set to `value`
    pub fn filled(value: f32) -> Self {
        Self([value; EMBEDDING_DIMENSION])
    }

    pub fn as_array(&self) -> &[f32; EMBEDDING_DIMENSION] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.0.iter()
    }
}

// ============================================================================
// FEATURE SAMPLE
// ============================================================================

/// Output of a successful extraction. Only ever exists with confidence >= 0.5.
///
/// `timestamp` is the wall-clock capture time sent on the wire as epoch
/// milliseconds. Ordering and age checks use `captured_at`, a monotonic
/// instant that never leaves the process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSample {
    embedding: Embedding,
    confidence: f32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
    #[serde(skip)]
    captured_at: Instant,
    model_version: String,
}

impl FeatureSample {
    /// Create a sample stamped with the current time
    pub fn new(embedding: Embedding, confidence: f32, model_version: impl Into<String>) -> BiometricResult<Self> {
        Self::with_timestamp(embedding, confidence, Utc::now(), model_version)
    }

    pub fn with_timestamp(
        embedding: Embedding,
        confidence: f32,
        timestamp: DateTime<Utc>,
        model_version: impl Into<String>,
    ) -> BiometricResult<Self> {
        if !confidence.is_finite() || confidence > 1.0 {
            return Err(BiometricError::ModelContractViolation(format!(
                "confidence {} outside [0, 1]",
                confidence
            )));
        }
        if confidence < MIN_DETECTION_CONFIDENCE {
            return Err(BiometricError::LowConfidence { confidence });
        }

        Ok(Self {
            embedding,
            confidence,
            timestamp,
            captured_at: Instant::now(),
            model_version: model_version.into(),
        })
    }

    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Time since capture, unaffected by wall-clock adjustments
    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_from_slice_requires_exact_dimension() {
        assert!(Embedding::from_slice(&[0.1; 128]).is_some());
        assert!(Embedding::from_slice(&[0.1; 127]).is_none());
        assert!(Embedding::from_slice(&[0.1; 129]).is_none());
        assert!(Embedding::from_slice(&[]).is_none());
    }

    #[test]
    fn test_embedding_rejects_wrong_length_json() {
        let json = serde_json::to_string(&vec![0.5f32; 64]).unwrap();
        let result: Result<Embedding, _> = serde_json::from_str(&json);
        assert!(result.is_err());

        let json = serde_json::to_string(&Embedding::filled(0.25)).unwrap();
        let parsed: Embedding = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Embedding::filled(0.25));
    }

    #[test]
    fn test_sample_requires_confidence() {
        let low = FeatureSample::new(Embedding::filled(0.0), 0.49, "v1");
        assert!(matches!(low, Err(BiometricError::LowConfidence { .. })));

        let nan = FeatureSample::new(Embedding::filled(0.0), f32::NAN, "v1");
        assert!(matches!(nan, Err(BiometricError::ModelContractViolation(_))));

        let ok = FeatureSample::new(Embedding::filled(0.0), 0.5, "v1").unwrap();
        assert_eq!(ok.confidence(), 0.5);
        assert_eq!(ok.model_version(), "v1");
    }

    #[test]
    fn test_sample_serializes_timestamp_as_millis() {
        let ts = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_123).unwrap();
        let sample = FeatureSample::with_timestamp(Embedding::filled(0.0), 0.9, ts, "v1.0.0").unwrap();
        let value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value["timestamp"], 1_700_000_000_123i64);
        assert_eq!(value["model_version"], "v1.0.0");
        assert_eq!(value["embedding"].as_array().unwrap().len(), 128);
    }

    #[test]
    fn test_capture_instant_is_monotonic_and_local() {
        let first = FeatureSample::new(Embedding::filled(0.0), 0.9, "v1").unwrap();
        let second = FeatureSample::new(Embedding::filled(0.0), 0.9, "v1").unwrap();
        assert!(second.captured_at() >= first.captured_at());
        assert!(first.age() >= second.age());

        // A backdated wall-clock stamp does not change the local capture instant
        let backdated = DateTime::<Utc>::from_timestamp_millis(0).unwrap();
        let old = FeatureSample::with_timestamp(Embedding::filled(0.0), 0.9, backdated, "v1").unwrap();
        assert!(old.captured_at() >= second.captured_at());

        let value = serde_json::to_value(&first).unwrap();
        assert!(value.get("captured_at").is_none());
    }
}
