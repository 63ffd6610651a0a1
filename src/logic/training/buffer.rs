//! Training Buffer - locally retained samples for federated contribution
//!
//! Keeps only embedding + timestamp, at most 10 entries, oldest evicted first.
//! Appends are dropped while consent is withheld. Revoking consent does not
//! clear what was already buffered; only a successful contribution (which
//! releases exactly the entries it sent) or an explicit `clear()` does.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::constants::{MIN_TRAINING_SAMPLES, TRAINING_BUFFER_CAPACITY};
use crate::logic::consent::ConsentState;
use crate::logic::features::{Embedding, FeatureSample};

/// Buffered training entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingEntry {
    pub embedding: Embedding,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl From<&FeatureSample> for TrainingEntry {
    fn from(sample: &FeatureSample) -> Self {
        Self {
            embedding: *sample.embedding(),
            timestamp: sample.timestamp(),
        }
    }
}

/// Entries taken for one contribution, up to and including `through`
#[derive(Debug, Clone)]
pub struct TrainingBatch {
    pub entries: Vec<TrainingEntry>,
    through: u64,
}

struct Slot {
    sequence: u64,
    entry: TrainingEntry,
}

struct Slots {
    items: VecDeque<Slot>,
    next_sequence: u64,
}

pub struct TrainingBuffer {
    consent: ConsentState,
    slots: RwLock<Slots>,
}

impl TrainingBuffer {
    pub fn new(consent: ConsentState) -> Self {
        Self {
            consent,
            slots: RwLock::new(Slots {
                items: VecDeque::with_capacity(TRAINING_BUFFER_CAPACITY + 1),
                next_sequence: 1,
            }),
        }
    }

    /// Append a sample. Returns `false` (no-op) without consent.
    pub fn append(&self, sample: &FeatureSample) -> bool {
        if !self.consent.get() {
            log::debug!("Consent withheld, sample not buffered");
            return false;
        }

        let mut slots = self.slots.write();
        let sequence = slots.next_sequence;
        slots.next_sequence += 1;
        slots.items.push_back(Slot {
            sequence,
            entry: TrainingEntry::from(sample),
        });
        while slots.items.len() > TRAINING_BUFFER_CAPACITY {
            slots.items.pop_front();
        }
        true
    }

    pub fn snapshot(&self) -> Vec<TrainingEntry> {
        self.slots.read().items.iter().map(|slot| slot.entry.clone()).collect()
    }

    /// Everything currently buffered, tagged so it can be released later
    pub fn batch(&self) -> TrainingBatch {
        let slots = self.slots.read();
        TrainingBatch {
            entries: slots.items.iter().map(|slot| slot.entry.clone()).collect(),
            through: slots.items.back().map_or(0, |slot| slot.sequence),
        }
    }

    /// Drop the entries of `batch` still present. Later appends stay.
    pub fn release(&self, batch: &TrainingBatch) -> usize {
        let mut slots = self.slots.write();
        let before = slots.items.len();
        slots.items.retain(|slot| slot.sequence > batch.through);
        before - slots.items.len()
    }

    pub fn clear(&self) {
        self.slots.write().items.clear();
    }

    pub fn size(&self) -> usize {
        self.slots.read().items.len()
    }

    pub fn status(&self) -> BufferStatus {
        let size = self.size();
        BufferStatus {
            current_size: size,
            capacity: TRAINING_BUFFER_CAPACITY,
            required_size: MIN_TRAINING_SAMPLES,
            is_ready: size >= MIN_TRAINING_SAMPLES,
        }
    }
}

/// Buffer status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferStatus {
    pub current_size: usize,
    pub capacity: usize,
    pub required_size: usize,
    pub is_ready: bool,
}
