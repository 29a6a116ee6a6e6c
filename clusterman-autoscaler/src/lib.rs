//! Control-loop orchestration: turns a signal's resource request into a
//! pool target-capacity change, one tick at a time. Ties together
//! `clusterman-connector`, `clusterman-resourcegroup` (via `clusterman-pool`),
//! `clusterman-signal`, and `clusterman-kv`.

pub mod autoscaler;
pub mod error;
pub mod signal_adapter;
pub mod status;
pub mod target;

pub use autoscaler::{Autoscaler, AutoscalerConfig, TickOutcome};
pub use error::AutoscalerError;
pub use signal_adapter::{BuiltinTickSignal, SubprocessTickSignal, TickSignal};
pub use status::{MonitoringSink, Severity, StatusCheck, TracingMonitoringSink};
