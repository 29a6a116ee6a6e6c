//! Cooperative, queue-based instance removal: warning, drain, terminate.
//! Keeps hosts schedulable right up until their tasks have somewhere else
//! to go, rather than terminating instances out from under live work.

pub mod action;
pub mod client;
pub mod error;
pub mod queue;

pub use action::{DrainAction, KubernetesDrainAction, KubernetesDrainApi, MesosDrainAction, MesosDrainApi};
pub use client::{DrainingClient, DrainingConfig, InstanceTerminator};
pub use error::DrainError;
pub use queue::{DrainQueueKind, DrainQueueStore, DrainReason, HostKey, HostRecord, InMemoryDrainQueueStore};
