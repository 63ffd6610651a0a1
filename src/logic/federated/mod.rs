//! Federated Module - privacy-preserving training contribution

pub mod contributor;

pub use contributor::{ContributionOutcome, ContributionState, FederatedContributor};
