//! Tracing setup and request-scoped trace IDs.
//!
//! The subscriber is installed once per process, formatted per
//! `log_format` (JSON by default, pretty for local work), with `log::`
//! macro output bridged into tracing. Handlers run inside a task-local
//! [`TraceContext`] so error responses can carry the request's trace ID.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::task_local;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::AppConfig;

/// Correlation metadata for one request.
#[derive(Debug, Clone)]
pub struct TraceContext {
    pub trace_id: String,
}

task_local! {
    static CURRENT_TRACE: TraceContext;
}

/// Errors that can occur while initializing global telemetry.
#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("failed to install log bridge: {0}")]
    LogBridge(#[from] log::SetLoggerError),
}

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Installs the log bridge and the global tracing subscriber exactly once.
///
/// The filter honors `RUST_LOG` when set and falls back to the configured
/// `log_level`. Repeat calls are no-ops, and a subscriber already installed
/// by a test harness is left in effect.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    LogTracer::init()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let format = match config.log_format.as_str() {
        "pretty" => fmt::layer().pretty().boxed(),
        _ => fmt::layer().json().boxed(),
    };

    if tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .try_init()
        .is_err()
    {
        INSTALLED.store(false, Ordering::SeqCst);
        tracing::debug!("tracing subscriber already installed, keeping the existing one");
    }

    Ok(())
}

/// Runs `future` with `context` as the task's active trace context.
pub async fn with_trace_context<Fut, R>(context: TraceContext, future: Fut) -> R
where
    Fut: std::future::Future<Output = R>,
{
    CURRENT_TRACE.scope(context, future).await
}

/// The trace ID of the running task, if one was set.
pub fn current_trace_id() -> Option<String> {
    CURRENT_TRACE.try_with(|ctx| ctx.trace_id.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trace_id_is_scoped_to_the_wrapped_future() {
        assert!(current_trace_id().is_none());

        let seen = with_trace_context(
            TraceContext {
                trace_id: "trace-1".to_string(),
            },
            async { current_trace_id() },
        )
        .await;
        assert_eq!(seen.as_deref(), Some("trace-1"));

        assert!(current_trace_id().is_none());
    }
}
