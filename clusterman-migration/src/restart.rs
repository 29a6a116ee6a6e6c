//! Supervised task restart, ported from `migration/worker.py`'s
//! `RestartableDaemonProcess`. Rust async tasks are the idiomatic analogue
//! to the original's `multiprocessing.Process` supervision: a panic or an
//! unexpected early return restarts the inner future, up to a bounded
//! count, rather than respawning an OS process.

use std::future::Future;

#[derive(Debug, Clone, Copy)]
pub struct RestartPolicy {
    pub max_restarts: u32,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self { max_restarts: 5 }
    }
}

/// Run `make_task()` to completion, restarting it from scratch if it
/// panics, until `policy.max_restarts` consecutive failures are reached.
/// Returns `Ok(())` once a run completes without panicking, or `Err(())`
/// once the restart budget is exhausted.
pub async fn run_supervised<F, Fut>(name: &str, policy: RestartPolicy, make_task: F) -> Result<(), ()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut restarts = 0;
    loop {
        let handle = tokio::spawn(make_task());
        match handle.await {
            Ok(()) => return Ok(()),
            Err(join_err) => {
                restarts += 1;
                tracing::error!(worker = name, restarts, %join_err, "migration worker task panicked");
                if restarts > policy.max_restarts {
                    tracing::error!(worker = name, "exceeded max restarts, giving up");
                    return Err(());
                }
            }
        }
    }
}
