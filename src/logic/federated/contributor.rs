//! Federated Contributor
//!
//! Idle -> Buffering -> ThresholdCheck -> (Computing -> Noising -> Transmitting) -> Idle
//!
//! Failures never escape: they are logged and the buffer is left as it was
//! for the next opportunity. Only one pass runs ThresholdCheck..Transmitting
//! at a time; samples appended while it is in flight wait for the next pass.
//! On acknowledgment exactly the submitted entries are released. A flow
//! dropped mid-way (host going away) leaves the buffer untouched and the
//! state back at Idle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;

use crate::constants::MIN_TRAINING_SAMPLES;
use crate::logic::consent::ConsentState;
use crate::logic::features::FeatureSample;
use crate::logic::privacy::{PrivacyEngine, PrivacyParameters};
use crate::logic::training::{GradientComputer, TrainingBuffer};
use crate::logic::transport::{BiometricTransport, GradientSubmission};

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContributionState {
    Idle,
    Buffering,
    ThresholdCheck,
    Computing,
    Noising,
    Transmitting,
}

/// Result of one pass through the state machine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ContributionOutcome {
    /// Consent not granted; nothing buffered
    ConsentWithheld,
    /// Not enough samples yet
    Waiting { buffered: usize, required: usize },
    /// Gradients acknowledged, buffer cleared
    Contributed { num_samples: usize },
    /// Transmission failed, buffer retained
    Failed { reason: String },
}

/// Resets the shared state to Idle when a pass ends, however it ends
struct StateGuard<'a> {
    state: &'a Mutex<ContributionState>,
}

impl<'a> StateGuard<'a> {
    fn enter(state: &'a Mutex<ContributionState>) -> Self {
        Self { state }
    }

    fn transition(&self, next: ContributionState) {
        let mut state = self.state.lock();
        log::debug!("Federated contribution: {:?} -> {:?}", *state, next);
        *state = next;
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock() = ContributionState::Idle;
    }
}

// ============================================================================
// CONTRIBUTOR
// ============================================================================

pub struct FederatedContributor {
    consent: ConsentState,
    buffer: Arc<TrainingBuffer>,
    computer: GradientComputer,
    privacy: PrivacyEngine,
    params: PrivacyParameters,
    transport: Arc<dyn BiometricTransport>,
    state: Mutex<ContributionState>,
    pass: AsyncMutex<()>,
    contribution_count: AtomicU64,
}

impl FederatedContributor {
    pub fn new(
        consent: ConsentState,
        buffer: Arc<TrainingBuffer>,
        privacy: PrivacyEngine,
        params: PrivacyParameters,
        transport: Arc<dyn BiometricTransport>,
    ) -> Self {
        Self {
            consent,
            buffer,
            computer: GradientComputer::new(),
            privacy,
            params,
            transport,
            state: Mutex::new(ContributionState::Idle),
            pass: AsyncMutex::new(()),
            contribution_count: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> ContributionState {
        *self.state.lock()
    }

    pub fn buffer(&self) -> &Arc<TrainingBuffer> {
        &self.buffer
    }

    /// Successful submissions since construction
    pub fn contribution_count(&self) -> u64 {
        self.contribution_count.load(Ordering::Relaxed)
    }

    /// Run after a successful authentication with the sample that was used
    pub async fn contribute(&self, sample: &FeatureSample, model_version: &str) -> ContributionOutcome {
        if !self.consent.get() {
            log::info!("User has not consented to federated training");
            return ContributionOutcome::ConsentWithheld;
        }

        if !self.buffer.append(sample) {
            // Consent revoked between the check and the append
            return ContributionOutcome::ConsentWithheld;
        }

        let _pass = self.pass.lock().await;
        let guard = StateGuard::enter(&self.state);
        guard.transition(ContributionState::Buffering);
        self.run_from_threshold(&guard, model_version).await
    }

    /// Retry with what is already buffered, without adding a sample
    pub async fn flush(&self, model_version: &str) -> ContributionOutcome {
        let _pass = self.pass.lock().await;
        let guard = StateGuard::enter(&self.state);
        self.run_from_threshold(&guard, model_version).await
    }

    async fn run_from_threshold(&self, guard: &StateGuard<'_>, model_version: &str) -> ContributionOutcome {
        if !self.consent.get() {
            return ContributionOutcome::ConsentWithheld;
        }

        guard.transition(ContributionState::ThresholdCheck);
        let batch = self.buffer.batch();
        if batch.entries.len() < MIN_TRAINING_SAMPLES {
            log::debug!("{} of {} samples buffered, waiting for more", batch.entries.len(), MIN_TRAINING_SAMPLES);
            return ContributionOutcome::Waiting {
                buffered: batch.entries.len(),
                required: MIN_TRAINING_SAMPLES,
            };
        }

        guard.transition(ContributionState::Computing);
        log::info!("Computing local gradients for federated learning...");
        let update = match self.computer.compute(&batch.entries) {
            Some(update) => update,
            None => {
                return ContributionOutcome::Waiting {
                    buffered: batch.entries.len(),
                    required: MIN_TRAINING_SAMPLES,
                }
            }
        };

        guard.transition(ContributionState::Noising);
        let noised = self.privacy.apply_noise(update, &self.params);
        let submission = GradientSubmission::new(&noised, model_version);

        guard.transition(ContributionState::Transmitting);
        log::info!("Sending differential-privacy protected gradients to server...");
        match self.transport.submit_gradients(&submission).await {
            Ok(()) => {
                let released = self.buffer.release(&batch);
                self.contribution_count.fetch_add(1, Ordering::Relaxed);
                log::info!(
                    "Federated training contribution successful ({} samples, {} released)",
                    submission.num_samples,
                    released
                );
                ContributionOutcome::Contributed {
                    num_samples: submission.num_samples,
                }
            }
            Err(e) => {
                log::error!("Federated training failed: {}", e);
                ContributionOutcome::Failed { reason: e.to_string() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::Embedding;
    use crate::logic::storage::MemoryStore;
    use crate::logic::testing::FakeTransport;

    fn setup(consent_granted: bool) -> (FederatedContributor, ConsentState, Arc<FakeTransport>) {
        let consent = ConsentState::new(Arc::new(MemoryStore::new()));
        consent.set(consent_granted).unwrap();
        let buffer = Arc::new(TrainingBuffer::new(consent.clone()));
        let transport = FakeTransport::new();
        let contributor = FederatedContributor::new(
            consent.clone(),
            buffer,
            PrivacyEngine::with_seed(3),
            PrivacyParameters::default(),
            transport.clone(),
        );
        (contributor, consent, transport)
    }

    fn sample() -> FeatureSample {
        FeatureSample::new(Embedding::filled(0.3), 0.9, "v1.0.0").unwrap()
    }

    #[tokio::test]
    async fn test_consent_withheld() {
        let (contributor, _, transport) = setup(false);
        let outcome = contributor.contribute(&sample(), "v1.0.0").await;

        assert_eq!(outcome, ContributionOutcome::ConsentWithheld);
        assert_eq!(contributor.buffer().size(), 0);
        assert_eq!(transport.gradient_calls(), 0);
    }

    #[tokio::test]
    async fn test_waits_until_threshold_then_contributes() {
        let (contributor, _, transport) = setup(true);

        for i in 1..MIN_TRAINING_SAMPLES {
            let outcome = contributor.contribute(&sample(), "v1.0.0").await;
            assert_eq!(outcome, ContributionOutcome::Waiting { buffered: i, required: MIN_TRAINING_SAMPLES });
            assert_eq!(contributor.state(), ContributionState::Idle);
        }

        let outcome = contributor.contribute(&sample(), "v1.0.0").await;
        assert_eq!(outcome, ContributionOutcome::Contributed { num_samples: MIN_TRAINING_SAMPLES });
        assert_eq!(contributor.buffer().size(), 0);
        assert_eq!(contributor.state(), ContributionState::Idle);
        assert_eq!(contributor.contribution_count(), 1);

        let submissions = transport.gradient_submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].num_samples, MIN_TRAINING_SAMPLES);
        assert_eq!(submissions[0].model_version, "v1.0.0");
        // Noise was applied: no weight equals the raw mean
        assert!(submissions[0].gradients.iter().all(|w| *w != f64::from(0.3f32)));
        assert_eq!(submissions[0].loss, 0.0);
    }

    #[tokio::test]
    async fn test_failed_transmission_keeps_buffer() {
        let (contributor, _, transport) = setup(true);
        transport.fail_gradients(true);

        for _ in 0..MIN_TRAINING_SAMPLES {
            contributor.contribute(&sample(), "v1.0.0").await;
        }
        assert_eq!(contributor.buffer().size(), MIN_TRAINING_SAMPLES);
        assert_eq!(transport.gradient_calls(), 1);

        transport.fail_gradients(false);
        let outcome = contributor.flush("v1.0.0").await;
        assert_eq!(outcome, ContributionOutcome::Contributed { num_samples: MIN_TRAINING_SAMPLES });
        assert_eq!(contributor.buffer().size(), 0);
    }

    #[tokio::test]
    async fn test_revoked_consent_keeps_buffered_samples() {
        let (contributor, consent, transport) = setup(true);
        for _ in 0..3 {
            contributor.contribute(&sample(), "v1.0.0").await;
        }

        consent.set(false).unwrap();
        for _ in 0..3 {
            let outcome = contributor.contribute(&sample(), "v1.0.0").await;
            assert_eq!(outcome, ContributionOutcome::ConsentWithheld);
        }
        assert_eq!(contributor.buffer().size(), 3);
        assert_eq!(transport.gradient_calls(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_flow_leaves_buffer_intact() {
        let (contributor, _, transport) = setup(true);
        for _ in 0..MIN_TRAINING_SAMPLES - 1 {
            contributor.contribute(&sample(), "v1.0.0").await;
        }

        transport.hang_gradients(true);
        let sample = sample();
        let pending = contributor.contribute(&sample, "v1.0.0");
        let result = tokio::time::timeout(std::time::Duration::from_millis(50), pending).await;
        assert!(result.is_err());

        assert_eq!(contributor.state(), ContributionState::Idle);
        assert_eq!(contributor.buffer().size(), MIN_TRAINING_SAMPLES);
    }

    #[tokio::test]
    async fn test_concurrent_passes_never_resend_samples() {
        let (contributor, _, transport) = setup(true);
        transport.yield_gradients(true);
        for _ in 0..MIN_TRAINING_SAMPLES - 1 {
            contributor.contribute(&sample(), "v1.0.0").await;
        }

        let (a, b) = (sample(), sample());
        let (first, second) = tokio::join!(contributor.contribute(&a, "v1.0.0"), contributor.contribute(&b, "v1.0.0"));

        assert_eq!(first, ContributionOutcome::Contributed { num_samples: MIN_TRAINING_SAMPLES });
        assert_eq!(second, ContributionOutcome::Waiting { buffered: 1, required: MIN_TRAINING_SAMPLES });

        let submissions = transport.gradient_submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].num_samples, MIN_TRAINING_SAMPLES);
        // The sample appended while the first pass was in flight is kept
        assert_eq!(contributor.buffer().size(), 1);
        assert_eq!(contributor.state(), ContributionState::Idle);
    }
}
