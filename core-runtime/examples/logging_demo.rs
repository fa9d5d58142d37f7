//! Logging system demonstration
//!
//! This example shows how to use the logging infrastructure in different modes.
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run --example logging_demo
//!
//! # JSON format
//! cargo run --example logging_demo -- json
//!
//! # Compact format
//! cargo run --example logging_demo -- compact
//!
//! # With custom filter
//! cargo run --example logging_demo -- pretty "core_runtime=trace"
//! ```

use core_runtime::logging::{
    init_logging, redact_if_sensitive, strip_path, LogFormat, LogLevel, LoggingConfig,
};
use std::env;
use tracing::{debug, error, info, instrument, span, trace, warn, Level};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let format = if args.len() > 1 {
        match args[1].as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Pretty,
        }
    } else {
        LogFormat::default()
    };

    let filter = args.get(2).cloned();

    // Initialize logging
    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_spans(true)
        .with_target(true);

    if let Some(f) = filter {
        config = config.with_filter(f);
    }

    init_logging(&config).expect("Failed to initialize logging");

    info!("=== Logging System Demo ===");
    info!(format = ?format, "Logging initialized");

    // Demonstrate different log levels
    demo_log_levels();

    // Demonstrate structured logging
    demo_structured_logging();

    // Demonstrate spans for tracing
    demo_spans().await;

    // Demonstrate credential redaction
    demo_redaction();

    // Demonstrate instrumentation
    demo_instrumentation().await;

    info!("=== Demo Complete ===");
}

fn demo_log_levels() {
    let span = span!(Level::INFO, "log_levels");
    let _enter = span.enter();

    trace!("This is a TRACE level log");
    debug!("This is a DEBUG level log");
    info!("This is an INFO level log");
    warn!("This is a WARN level log");
    error!("This is an ERROR level log");
}

fn demo_structured_logging() {
    let span = span!(Level::INFO, "structured_logging");
    let _enter = span.enter();

    info!("Simple message without fields");

    info!(
        volume_id = 42,
        name = "vault-b0042.zvol",
        size = 52_428_800_i64,
        "Volume information"
    );

    info!(
        requests_processed = 150,
        cached_volumes = 3,
        cache_hit_rate = 0.95,
        "Downloader statistics"
    );
}

async fn demo_spans() {
    let span = span!(Level::INFO, "restore_operation", operation = "op-demo");
    let _enter = span.enter();

    info!("Starting restore operation");

    {
        let inner_span = span!(Level::DEBUG, "metadata_lookup");
        let _inner = inner_span.enter();

        debug!(volume_id = 7, "Resolved volume metadata");
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    }

    {
        let inner_span = span!(Level::DEBUG, "volume_download");
        let _inner = inner_span.enter();

        debug!(downloaded = 50, total = 150, "Downloading volumes");
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    }

    info!(volumes_fetched = 150, "Restore operation completed");
}

fn demo_redaction() {
    let span = span!(Level::INFO, "redaction");
    let _enter = span.enter();

    // These values will be redacted by our helper
    let passphrase = "correct horse battery staple";
    let token = "secret_backend_token_12345";
    let path = "/home/user/private/documents/taxes.pdf";

    info!(
        passphrase = %redact_if_sensitive("passphrase", passphrase),
        token = %redact_if_sensitive("backend_token", token),
        file = %strip_path(path),
        "Sensitive data example"
    );

    // Best practice: Don't log sensitive values at all
    info!("Backend authenticated");
    // Instead of: info!(passphrase = user_passphrase, "Backend authenticated")
}

#[instrument]
async fn demo_instrumentation() {
    info!("Instrumented function automatically creates spans");

    let volumes = vec![1_i64, 2, 3];
    process_volumes(&volumes).await;
}

#[instrument(fields(count = volumes.len()))]
async fn process_volumes(volumes: &[i64]) {
    debug!("Processing volumes");

    for volume in volumes {
        process_volume(*volume).await;
    }

    info!("All volumes processed");
}

#[instrument]
async fn process_volume(volume: i64) {
    trace!(volume_id = volume, "Processing individual volume");
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
}
