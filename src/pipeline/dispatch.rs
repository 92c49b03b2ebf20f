// src/pipeline/dispatch.rs

//! Dispatch pipeline: wire the gateway, audit sink and notifier together
//! and run a coordinator over a change feed.

use std::sync::Arc;

use crate::error::Result;
use crate::models::Config;
use crate::services::{ChangeFeed, Coordinator, DispatchStats, HttpGateway, Notifier, PushGateway};
use crate::storage::{AuditSink, FileAuditSink, LogAuditSink};
use crate::utils::log;

/// Run the dispatcher against the configured HTTP gateway.
pub async fn run_dispatch(config: &Config, feed: &mut dyn ChangeFeed) -> Result<DispatchStats> {
    let gateway = Arc::new(HttpGateway::new(&config.gateway)?);
    log::sub_item(&format!("Gateway: {}", gateway.endpoint()));
    run_dispatch_with(config, gateway, feed).await
}

/// Run the dispatcher with an arbitrary gateway.
///
/// The audit file, when enabled, is flushed before returning on every path
/// except a fatal admission failure.
pub async fn run_dispatch_with(
    config: &Config,
    gateway: Arc<dyn PushGateway>,
    feed: &mut dyn ChangeFeed,
) -> Result<DispatchStats> {
    log::header("Dispatching change events");
    if config.notifier.dry_run {
        log::sub_item("Dry run: the gateway validates messages without delivering them");
    }

    let file_sink = if config.audit.enabled {
        let sink = FileAuditSink::open(&config.audit.path, config.audit.capacity).await?;
        log::sub_item(&format!("Audit trail: {}", sink.path().display()));
        Some(Arc::new(sink))
    } else {
        None
    };
    let audit: Arc<dyn AuditSink> = match &file_sink {
        Some(sink) => Arc::clone(sink) as Arc<dyn AuditSink>,
        None => Arc::new(LogAuditSink),
    };

    let notifier = Arc::new(Notifier::from_config(&config.notifier, gateway, audit));
    let mut coordinator = Coordinator::new(&config.dispatch, notifier);
    let result = coordinator.run(feed).await;

    if matches!(&result, Err(e) if e.is_fatal()) {
        return result;
    }

    // Tasks are drained, so the coordinator holds the last notifier reference.
    drop(coordinator);
    if let Some(sink) = file_sink.and_then(Arc::into_inner) {
        sink.close().await;
    }

    let stats = result?;
    log::summary(
        "Dispatch",
        &[
            ("Received", stats.received.to_string()),
            ("Dispatched", stats.dispatched.to_string()),
            ("Dropped", stats.dropped.to_string()),
            ("Delivered", stats.delivered.to_string()),
            ("Rejected", stats.rejected.to_string()),
            ("Exhausted", stats.exhausted.to_string()),
            ("Failed", stats.failed.to_string()),
            ("Probes", stats.probes.to_string()),
            ("Reconnects", stats.reconnects.to_string()),
        ],
    );
    Ok(stats)
}
