//! Logging prelude module for convenient access to tracing macros.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("crawl started");
//! warn!("rate limited");
//! debug!("unit issued");
//! ```

pub use tracing::{debug, error, info, trace, warn};

use crate::config::LogFormat;

/// Initialize the tracing subscriber with environment filter support.
///
/// Logs go to stderr so stdout stays free for the tree output. `RUST_LOG`
/// wins over `level` when set:
///
/// ```bash
/// RUST_LOG=debug cloudscan crawl --fixture drive.json5
/// RUST_LOG=cloudscan::engine=trace cloudscan crawl --fixture drive.json5
/// ```
pub fn init_tracing(level: &str, format: LogFormat) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
	let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

	match format {
		LogFormat::Pretty => builder.pretty().init(),
		LogFormat::Compact => builder.compact().init(),
	}
}

// vim: ts=4
