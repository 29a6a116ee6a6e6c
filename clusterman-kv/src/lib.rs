//! # Clusterman KV
//!
//! Accessors onto the external `clusterman_cluster_state` key-value table
//! (spec.md §6.3): the pause flag, the temporary capacity offset a
//! migration worker's prescaling step writes, and the per-pool setpoint
//! override. Every accessor treats a record past its
//! `expiration_timestamp` as absent, matching DynamoDB's own
//! `ConsistentRead` semantics upstream relies on.
//!
//! The store itself is out of scope per spec.md §1 ("the persisted
//! key-value store... specified as interfaces"); [`KvStore`] is that
//! narrow interface, with [`InMemoryKvStore`] as the in-process
//! implementation used by tests and the simulator.

pub mod error;
pub mod offset;
pub mod pause;
pub mod setpoint;
pub mod store;

pub use error::KvError;
pub use store::{entity_key, InMemoryKvStore, KvRecord, KvStore, StateKind};
