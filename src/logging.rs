//! # Structured Logging Module
//!
//! Environment-aware structured logging that outputs to both console and files
//! for following concurrent bookings, completions and rematches.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);

        let pid = process::id();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let log_dir = PathBuf::from("log");
        let log_filename = format!("{environment}.{pid}.{timestamp}.log");

        // File output is best effort; console logging still works without a writable log dir
        let file_layer = match fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let file_appender = tracing_appender::rolling::never(&log_dir, &log_filename);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                // Keep the writer thread alive for the life of the process
                std::mem::forget(guard);

                Some(
                    fmt::layer()
                        .with_writer(file_writer)
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_level(true)
                        .with_ansi(false)
                        .json()
                        .with_filter(build_filter(&log_level)),
                )
            }
            Err(_) => None,
        };
        let file_enabled = file_layer.is_some();

        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(true)
                    .with_filter(build_filter(&log_level)),
            )
            .with(file_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_file = %log_dir.join(&log_filename).display(),
            file_enabled = file_enabled,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// `RUST_LOG` wins over the environment default
fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("DISPATCH_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for ride operations
pub fn log_ride_operation(
    operation: &str,
    ride_id: Option<i64>,
    driver_id: Option<i64>,
    port: Option<u16>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        ride_id = ride_id,
        driver_id = driver_id,
        port = port,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🚕 RIDE_OPERATION"
    );
}

/// Log structured data for driver operations
pub fn log_driver_operation(
    operation: &str,
    driver_id: Option<i64>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        driver_id = driver_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🧑‍✈️ DRIVER_OPERATION"
    );
}

/// Log structured data for port pool operations
pub fn log_port_operation(operation: &str, port: Option<u16>, in_use: usize, details: Option<&str>) {
    tracing::debug!(
        operation = %operation,
        port = port,
        in_use = in_use,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🔌 PORT_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_detection() {
        std::env::set_var("DISPATCH_ENV", "test_override");
        let env = get_environment();
        assert_eq!(env, "test_override");
        std::env::remove_var("DISPATCH_ENV");
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }
}
