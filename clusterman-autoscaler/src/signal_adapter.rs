//! Unifies the two signal shapes (subprocess IPC vs. in-process builtin)
//! behind one `async` vocabulary the autoscaler tick can call uniformly,
//! per spec.md §9 "Control-flow exceptions used for flow": `evaluate`
//! returns a `Result` the caller switches on, rather than raising.

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncRead, AsyncWrite};

use clusterman_signal::context::EvaluationContext;
use clusterman_signal::error::SignalError;
use clusterman_signal::registry::{BuiltinSignal, SignalOutcome};
use clusterman_signal::subprocess::SubprocessSignal;

/// What the autoscaler tick holds for a pool's configured signal, whether
/// it's a subprocess or one of the in-process builtins.
#[async_trait]
pub trait TickSignal: Send {
    async fn evaluate(&mut self, ctx: &EvaluationContext, target_capacity_margin: f64) -> Result<SignalOutcome, SignalError>;
}

/// Always succeeds — there's no IPC to fail. Used both for pools that
/// configure a builtin signal directly and as the tick loop's fallback
/// when a subprocess signal errors.
pub struct BuiltinTickSignal(pub BuiltinSignal);

#[async_trait]
impl TickSignal for BuiltinTickSignal {
    async fn evaluate(&mut self, ctx: &EvaluationContext, target_capacity_margin: f64) -> Result<SignalOutcome, SignalError> {
        Ok(self.0.evaluate(ctx, target_capacity_margin))
    }
}

/// Wraps a [`SubprocessSignal`], translating its raw JSON `Resources`
/// payload into a [`SignalOutcome::Request`]. The metrics payload sent to
/// the child is built from the evaluation context rather than a real
/// time-series client, since that client is out of scope per spec.md §1 —
/// a production deployment wires a real metrics snapshot in here without
/// touching the autoscaler above this adapter.
pub struct SubprocessTickSignal<S> {
    pub inner: SubprocessSignal<S>,
}

#[async_trait]
impl<S> TickSignal for SubprocessTickSignal<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn evaluate(&mut self, ctx: &EvaluationContext, _target_capacity_margin: f64) -> Result<SignalOutcome, SignalError> {
        let metrics = serde_json::json!({
            "current_allocation": ctx.current_allocation,
            "total_resources": ctx.total_resources,
            "pending_pod_count": ctx.pending_pod_requests.len(),
        });
        let value = self.inner.evaluate(&metrics, ctx.timestamp).await?;
        let request = serde_json::from_value(value)
            .map_err(|e| SignalError::Evaluation(format!("malformed resource request: {e}")))?;
        Ok(SignalOutcome::Request(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterman_core::resources::ClustermanResources;
    use clusterman_signal::pending_pods::PendingPodsSignal;

    fn ctx() -> EvaluationContext {
        EvaluationContext {
            timestamp: Utc::now(),
            current_allocation: ClustermanResources::new(5.0, 0.0, 0.0, 0.0),
            total_resources: ClustermanResources::default(),
            pending_pod_requests: vec![],
            current_target_capacity: 5.0,
            average_cpu_utilization: None,
        }
    }

    #[tokio::test]
    async fn builtin_tick_signal_always_succeeds() {
        let mut signal = BuiltinTickSignal(BuiltinSignal::PendingPods(PendingPodsSignal::default()));
        let outcome = signal.evaluate(&ctx(), 0.1).await.unwrap();
        matches!(outcome, SignalOutcome::Request(_));
    }
}
