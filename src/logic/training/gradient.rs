//! Gradient Computer - simplified local update
//!
//! The "gradient" is the per-dimension mean of the buffered embeddings and the
//! loss is their mean squared deviation from it (a variance proxy). This is
//! not backpropagation and must not be mistaken for it.

use serde::Serialize;

use super::buffer::TrainingEntry;
use crate::constants::{EMBEDDING_DIMENSION, MIN_TRAINING_SAMPLES};
use crate::logic::features::embedding::fixed_array;

/// Local model update derived from buffered samples
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradientUpdate {
    #[serde(with = "fixed_array")]
    pub weights: [f64; EMBEDDING_DIMENSION],
    pub loss: f64,
    pub num_samples: usize,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GradientComputer;

impl GradientComputer {
    pub fn new() -> Self {
        Self
    }

    /// Compute the update. `None` below the five-sample minimum.
    pub fn compute(&self, samples: &[TrainingEntry]) -> Option<GradientUpdate> {
        if samples.len() < MIN_TRAINING_SAMPLES {
            return None;
        }

        let n = samples.len() as f64;

        // Accumulate offsets from the first sample so identical inputs give
        // back exactly that sample.
        let anchor = samples[0].embedding;
        let mut offset = [0.0f64; EMBEDDING_DIMENSION];
        for sample in samples {
            for ((acc, value), base) in offset.iter_mut().zip(sample.embedding.iter()).zip(anchor.iter()) {
                *acc += f64::from(*value) - f64::from(*base);
            }
        }
        let mut mean = [0.0f64; EMBEDDING_DIMENSION];
        for ((m, acc), base) in mean.iter_mut().zip(offset.iter()).zip(anchor.iter()) {
            *m = f64::from(*base) + acc / n;
        }

        let squared_deviation: f64 = samples
            .iter()
            .flat_map(|sample| {
                sample
                    .embedding
                    .iter()
                    .zip(mean.iter())
                    .map(|(value, m)| (f64::from(*value) - m).powi(2))
            })
            .sum();
        let loss = squared_deviation / (n * EMBEDDING_DIMENSION as f64);

        log::debug!("Local gradient computed from {} samples (loss {:.6})", samples.len(), loss);

        Some(GradientUpdate {
            weights: mean,
            loss,
            num_samples: samples.len(),
        })
    }
}
