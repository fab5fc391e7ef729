//! Error types for cloudscan operations

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::io;

/// Failure reported by a listing transport
///
/// This is the raw, backend-specific shape of a failed `list_page` call.
/// Adapters turn it into an [`ErrorClass`] before the crawl reacts to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderError {
	/// HTTP status, if the request got that far
	#[serde(default)]
	pub status: Option<u16>,

	/// Provider-specific error code (e.g. "userRateLimitExceeded")
	#[serde(default)]
	pub code: Option<String>,

	/// Human readable message
	#[serde(default)]
	pub message: String,
}

impl ProviderError {
	/// Error carrying an HTTP status
	pub fn http(status: u16, message: impl Into<String>) -> Self {
		ProviderError { status: Some(status), code: None, message: message.into() }
	}

	/// Error that never produced a response (DNS, reset, timeout)
	pub fn network(message: impl Into<String>) -> Self {
		ProviderError { status: None, code: None, message: message.into() }
	}

	/// Attach a provider-specific error code
	pub fn with_code(mut self, code: impl Into<String>) -> Self {
		self.code = Some(code.into());
		self
	}

	/// True for any 5xx status
	pub fn is_server_error(&self) -> bool {
		matches!(self.status, Some(500..=599))
	}
}

impl fmt::Display for ProviderError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match (&self.status, &self.code) {
			(Some(status), Some(code)) => write!(f, "HTTP {} ({}): {}", status, code, self.message),
			(Some(status), None) => write!(f, "HTTP {}: {}", status, self.message),
			(None, Some(code)) => write!(f, "{}: {}", code, self.message),
			(None, None) => write!(f, "{}", self.message),
		}
	}
}

impl Error for ProviderError {}

/// Normalized outcome of a failed listing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
	/// Throttled: pause, cool down, retry the same unit
	RateLimited,
	/// Temporary failure: report and drop the unit
	Transient,
	/// Permanent failure: report and drop the unit
	Fatal,
}

impl fmt::Display for ErrorClass {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ErrorClass::RateLimited => write!(f, "rate-limited"),
			ErrorClass::Transient => write!(f, "transient"),
			ErrorClass::Fatal => write!(f, "fatal"),
		}
	}
}

/// Main error type for crawl operations
#[derive(Debug)]
pub enum CrawlError {
	/// Listing was throttled; the unit is retried after a cooldown
	RateLimited { target: String, source: ProviderError },

	/// Listing failed temporarily; the unit was dropped
	Transient { target: String, source: ProviderError },

	/// Listing failed permanently; the unit was dropped
	Fatal { target: String, source: ProviderError },

	/// Invalid configuration
	InvalidConfig { message: String },

	/// Recorded listing could not be loaded
	Fixture { path: String, message: String },

	/// I/O error
	Io(io::Error),

	/// The orchestrator task has shut down
	EngineStopped,
}

impl CrawlError {
	/// Wrap a provider failure according to its classification
	pub fn classified(class: ErrorClass, target: impl Into<String>, source: ProviderError) -> Self {
		let target = target.into();
		match class {
			ErrorClass::RateLimited => CrawlError::RateLimited { target, source },
			ErrorClass::Transient => CrawlError::Transient { target, source },
			ErrorClass::Fatal => CrawlError::Fatal { target, source },
		}
	}

	/// Classification of a listing failure, `None` for non-listing errors
	pub fn class(&self) -> Option<ErrorClass> {
		match self {
			CrawlError::RateLimited { .. } => Some(ErrorClass::RateLimited),
			CrawlError::Transient { .. } => Some(ErrorClass::Transient),
			CrawlError::Fatal { .. } => Some(ErrorClass::Fatal),
			_ => None,
		}
	}

	/// Returns true if the failed unit will be issued again
	pub fn is_retried(&self) -> bool {
		matches!(self, CrawlError::RateLimited { .. })
	}
}

impl fmt::Display for CrawlError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CrawlError::RateLimited { target, source } => {
				write!(f, "Rate limited while listing {}: {}", target, source)
			}
			CrawlError::Transient { target, source } => {
				write!(f, "Temporary failure listing {}: {}", target, source)
			}
			CrawlError::Fatal { target, source } => {
				write!(f, "Failed to list {}: {}", target, source)
			}
			CrawlError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			CrawlError::Fixture { path, message } => {
				write!(f, "Cannot load listing fixture {}: {}", path, message)
			}
			CrawlError::Io(e) => write!(f, "I/O error: {}", e),
			CrawlError::EngineStopped => write!(f, "Crawl engine has stopped"),
		}
	}
}

impl Error for CrawlError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			CrawlError::RateLimited { source, .. }
			| CrawlError::Transient { source, .. }
			| CrawlError::Fatal { source, .. } => Some(source),
			CrawlError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for CrawlError {
	fn from(e: io::Error) -> Self {
		CrawlError::Io(e)
	}
}

impl From<toml::de::Error> for CrawlError {
	fn from(e: toml::de::Error) -> Self {
		CrawlError::InvalidConfig { message: e.to_string() }
	}
}

impl From<json5::Error> for CrawlError {
	fn from(e: json5::Error) -> Self {
		CrawlError::InvalidConfig { message: e.to_string() }
	}
}

impl From<String> for CrawlError {
	fn from(e: String) -> Self {
		CrawlError::InvalidConfig { message: e }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_provider_error_display() {
		let err = ProviderError::http(429, "Too Many Requests");
		assert_eq!(err.to_string(), "HTTP 429: Too Many Requests");

		let err = ProviderError::http(403, "quota").with_code("userRateLimitExceeded");
		assert_eq!(err.to_string(), "HTTP 403 (userRateLimitExceeded): quota");

		let err = ProviderError::network("connection reset");
		assert_eq!(err.to_string(), "connection reset");
	}

	#[test]
	fn test_classified_roundtrips_class() {
		for class in [ErrorClass::RateLimited, ErrorClass::Transient, ErrorClass::Fatal] {
			let err = CrawlError::classified(class, "/Photos", ProviderError::http(500, "x"));
			assert_eq!(err.class(), Some(class));
		}
		assert_eq!(CrawlError::EngineStopped.class(), None);
	}

	#[test]
	fn test_only_rate_limited_is_retried() {
		let src = ProviderError::http(429, "slow down");
		assert!(CrawlError::classified(ErrorClass::RateLimited, "/", src.clone()).is_retried());
		assert!(!CrawlError::classified(ErrorClass::Transient, "/", src.clone()).is_retried());
		assert!(!CrawlError::classified(ErrorClass::Fatal, "/", src).is_retried());
	}

	#[test]
	fn test_error_source_chain() {
		let err = CrawlError::classified(ErrorClass::Fatal, "/a", ProviderError::http(404, "gone"));
		let source = err.source().expect("listing errors carry their provider error");
		assert_eq!(source.to_string(), "HTTP 404: gone");
	}

	#[test]
	fn test_provider_error_deserializes_partial() {
		let err: ProviderError = json5::from_str("{ status: 503 }").unwrap();
		assert_eq!(err.status, Some(503));
		assert!(err.is_server_error());
		assert!(err.code.is_none());
	}
}

// vim: ts=4
