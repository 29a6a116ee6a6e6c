//! Signal evaluation: the pluggable bit of logic each pool uses to turn
//! cluster state into a capacity request. Supports out-of-process signals
//! over the framed Unix-socket protocol in [`protocol`] as well as a small
//! built-in registry ([`registry`]) for pools that don't ship their own.

pub mod context;
pub mod error;
pub mod pending_pods;
pub mod protocol;
pub mod registry;
pub mod subprocess;
pub mod utilization;

pub use context::EvaluationContext;
pub use error::SignalError;
pub use pending_pods::PendingPodsSignal;
pub use registry::{BuiltinSignal, SignalOutcome};
pub use subprocess::{BoxedConnect, SubprocessSignal};
pub use utilization::{constrain_cluster_delta, ClusterOverutilizedSignal, ClusterUnderutilizedSignal};
