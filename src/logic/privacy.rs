//! Differential privacy for gradient updates
//!
//! Laplace mechanism: each weight independently gets noise with location 0
//! and scale `sensitivity / epsilon`. A [`NoisedGradient`] can only be built
//! here, and it is the only thing the transport accepts for submission.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PRIVACY_EPSILON, EMBEDDING_DIMENSION, PRIVACY_SENSITIVITY};
use crate::logic::training::GradientUpdate;

/// Privacy budget configuration (fixed per deployment)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrivacyParameters {
    pub epsilon: f64,
    pub sensitivity: f64,
}

impl Default for PrivacyParameters {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_PRIVACY_EPSILON,
            sensitivity: PRIVACY_SENSITIVITY,
        }
    }
}

impl PrivacyParameters {
    /// Parameters with the given epsilon; non-positive values fall back to the default
    pub fn with_epsilon(epsilon: f64) -> Self {
        if epsilon > 0.0 && epsilon.is_finite() {
            Self {
                epsilon,
                ..Default::default()
            }
        } else {
            log::warn!("Invalid privacy epsilon {}, using {}", epsilon, DEFAULT_PRIVACY_EPSILON);
            Self::default()
        }
    }

    /// Laplace scale b
    pub fn scale(&self) -> f64 {
        self.sensitivity / self.epsilon
    }
}

/// Gradient update that has passed through the privacy engine
#[derive(Debug, Clone, PartialEq)]
pub struct NoisedGradient {
    weights: [f64; EMBEDDING_DIMENSION],
    loss: f64,
    num_samples: usize,
    noise_scale: f64,
}

impl NoisedGradient {
    pub fn weights(&self) -> &[f64; EMBEDDING_DIMENSION] {
        &self.weights
    }

    pub fn loss(&self) -> f64 {
        self.loss
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn noise_scale(&self) -> f64 {
        self.noise_scale
    }
}

pub struct PrivacyEngine {
    rng: Mutex<StdRng>,
}

impl Default for PrivacyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PrivacyEngine {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic engine (for testing)
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// One Laplace(0, scale) draw via the inverse CDF
    pub fn laplace_noise(&self, scale: f64) -> f64 {
        let mut rng = self.rng.lock();
        sample_laplace(&mut *rng, scale)
    }

    /// Add calibrated noise to every weight. Loss passes through unchanged.
    pub fn apply_noise(&self, update: GradientUpdate, params: &PrivacyParameters) -> NoisedGradient {
        let scale = params.scale();
        log::info!("Applying differential privacy (epsilon={})...", params.epsilon);

        let mut weights = update.weights;
        {
            let mut rng = self.rng.lock();
            for w in weights.iter_mut() {
                *w += sample_laplace(&mut *rng, scale);
            }
        }

        NoisedGradient {
            weights,
            loss: update.loss,
            num_samples: update.num_samples,
            noise_scale: scale,
        }
    }
}

/// `u` uniform on the open interval (-0.5, 0.5); noise = -b * sign(u) * ln(1 - 2|u|)
fn sample_laplace<R: Rng + ?Sized>(rng: &mut R, scale: f64) -> f64 {
    let u = loop {
        let u = rng.gen::<f64>() - 0.5;
        if u > -0.5 {
            break u;
        }
    };
    -scale * u.signum() * (1.0 - 2.0 * u.abs()).ln()
}
