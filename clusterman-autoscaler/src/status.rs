//! Structured tick status checks, per spec.md §7 "User-visible behaviour":
//! every tick emits one of these, keyed by `(cluster, pool, app)`, to a
//! monitoring sink. The metrics/time-series client itself is out of scope
//! (spec.md §1); [`MonitoringSink`] is the narrow interface a real backend
//! would implement, with a `tracing`-backed default so the crate is
//! runnable without one.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Ok,
    Warning,
    Critical,
}

#[derive(Debug, Clone)]
pub struct StatusCheck {
    pub severity: Severity,
    pub cluster: String,
    pub pool: String,
    pub app: String,
    pub output: String,
}

impl StatusCheck {
    pub fn new(severity: Severity, cluster: impl Into<String>, pool: impl Into<String>, app: impl Into<String>, output: impl Into<String>) -> Self {
        Self { severity, cluster: cluster.into(), pool: pool.into(), app: app.into(), output: output.into() }
    }
}

pub trait MonitoringSink: Send + Sync {
    fn emit(&self, check: &StatusCheck);
}

/// Logs the status check at the level matching its severity. The default
/// sink for pools that don't wire up a real monitoring backend.
#[derive(Debug, Default)]
pub struct TracingMonitoringSink;

impl MonitoringSink for TracingMonitoringSink {
    fn emit(&self, check: &StatusCheck) {
        match check.severity {
            Severity::Ok => tracing::info!(cluster = %check.cluster, pool = %check.pool, app = %check.app, "{}", check.output),
            Severity::Warning => tracing::warn!(cluster = %check.cluster, pool = %check.pool, app = %check.app, "{}", check.output),
            Severity::Critical => tracing::error!(cluster = %check.cluster, pool = %check.pool, app = %check.app, "{}", check.output),
        }
    }
}
