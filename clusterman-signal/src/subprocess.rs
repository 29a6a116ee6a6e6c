//! The `Signal` subprocess client: one reconnect-and-retry on a broken
//! pipe per evaluation, per spec.md §4.3. The actual subprocess spawn and
//! socket bind are injected via `connect`, so tests exercise the framing
//! and retry logic against an in-process `UnixStream::pair()` instead of a
//! real child process.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;

use crate::error::SignalError;
use crate::protocol::{evaluate_over_stream, send_parameters, SOCKET_TIMEOUT_SECONDS};

pub type BoxedConnect<S> = Box<dyn Fn() -> Pin<Box<dyn Future<Output = Result<S, SignalError>> + Send>> + Send + Sync>;

pub struct SubprocessSignal<S> {
    pub name: String,
    pub period_minutes: u32,
    parameters: Value,
    connect: BoxedConnect<S>,
    stream: Option<S>,
}

impl<S> SubprocessSignal<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(name: impl Into<String>, period_minutes: u32, parameters: Value, connect: BoxedConnect<S>) -> Self {
        Self { name: name.into(), period_minutes, parameters, connect, stream: None }
    }

    async fn ensure_connected(&mut self) -> Result<(), SignalError> {
        if self.stream.is_none() {
            let mut stream = (self.connect)().await?;
            send_parameters(&mut stream, &self.parameters).await?;
            self.stream = Some(stream);
        }
        Ok(())
    }

    async fn try_evaluate_once(&mut self, metrics: &Value, timestamp: i64) -> Result<Value, SignalError> {
        self.ensure_connected().await?;
        let stream = self.stream.as_mut().expect("just connected");
        timeout(Duration::from_secs(SOCKET_TIMEOUT_SECONDS), evaluate_over_stream(stream, metrics, timestamp))
            .await
            .map_err(|_| SignalError::Evaluation("signal socket timed out".to_string()))?
    }

    /// Evaluate the signal against `metrics`. On a connection failure,
    /// drops the stream and reconnects exactly once before giving up.
    pub async fn evaluate(&mut self, metrics: &Value, timestamp: DateTime<Utc>) -> Result<Value, SignalError> {
        match self.try_evaluate_once(metrics, timestamp.timestamp()).await {
            Ok(resources) => Ok(resources),
            Err(first_err) => {
                tracing::warn!(signal = %self.name, error = %first_err, "signal connection failed, reconnecting once");
                self.stream = None;
                self.try_evaluate_once(metrics, timestamp.timestamp()).await.map_err(|second_err| {
                    tracing::error!(signal = %self.name, error = %second_err, "signal failed after reconnect");
                    second_err
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixStream;

    fn counting_connect(attempts: Arc<AtomicUsize>, fail_first: bool) -> BoxedConnect<UnixStream> {
        Box::new(move || {
            let attempts = attempts.clone();
            Box::pin(async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                let (parent, child) = UnixStream::pair().map_err(|e| SignalError::Connection(e.to_string()))?;
                if fail_first && n == 0 {
                    // Simulate a dead subprocess: drop the child end immediately.
                    drop(child);
                } else {
                    tokio::spawn(async move {
                        let mut child = child;
                        let mut params_buf = [0u8; 256];
                        let _ = child.read(&mut params_buf).await;
                        let mut len_buf = [0u8; 4];
                        if child.read_exact(&mut len_buf).await.is_err() {
                            return;
                        }
                        let _ = child.write_all(&[crate::protocol::ACK]).await;
                        let len = u32::from_be_bytes(len_buf) as usize;
                        let mut body = vec![0u8; len];
                        let _ = child.read_exact(&mut body).await;
                        let mut reply = vec![crate::protocol::ACK];
                        reply.extend_from_slice(br#"{"Resources": {"cpus": 2.0}}"#);
                        let _ = child.write_all(&reply).await;
                    });
                }
                Ok(parent)
            })
        })
    }

    #[tokio::test]
    async fn reconnects_once_after_a_dead_subprocess() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let mut signal = SubprocessSignal::new("test", 5, serde_json::json!({}), counting_connect(attempts.clone(), true));
        let resources = signal.evaluate(&serde_json::json!({}), Utc::now()).await.unwrap();
        assert_eq!(resources["cpus"], 2.0);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn succeeds_first_try_without_reconnecting() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let mut signal = SubprocessSignal::new("test", 5, serde_json::json!({}), counting_connect(attempts.clone(), false));
        signal.evaluate(&serde_json::json!({}), Utc::now()).await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
