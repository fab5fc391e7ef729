//! Configuration for cloudscan
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (Config::default())
//! 2. Config file (`.toml`, or `.json` / `.json5`)
//! 3. Environment variables (CLOUDSCAN_* prefix)
//! 4. CLI flags (highest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CrawlError;
use crate::provider::ProviderKind;

// ============================================================================
// MAIN CONFIGURATION STRUCT
// ============================================================================

/// Settings for one crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	/// Backend whose listing is crawled
	pub provider: ProviderKind,

	/// Directory the crawl starts from
	pub root: String,

	/// Attach ".FreeSpace" / ".Trash" entries when crawling from "/"
	pub synthetic_entries: bool,

	/// Recorded listing to replay
	#[serde(skip_serializing_if = "Option::is_none")]
	pub fixture: Option<PathBuf>,

	// ========================================================================
	// OUTPUT & LOGGING
	// ========================================================================
	/// Log level (trace, debug, info, warn, error)
	pub log_level: String,

	/// Log format (Pretty, Compact)
	pub log_format: LogFormat,

	/// How the finished tree is printed
	pub output: OutputMode,

	// ========================================================================
	// PACING
	// ========================================================================
	pub pacing: PacingConfig,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			provider: ProviderKind::Dropbox,
			root: "/".to_string(),
			synthetic_entries: true,
			fixture: None,
			log_level: "info".to_string(),
			log_format: LogFormat::Pretty,
			output: OutputMode::Text,
			pacing: PacingConfig::default(),
		}
	}
}

impl Config {
	/// Load a config file, picking the format from its extension
	pub fn from_file(path: &Path) -> Result<Self, CrawlError> {
		let text = std::fs::read_to_string(path)?;
		match path.extension().and_then(|e| e.to_str()) {
			Some("toml") => Self::from_toml_str(&text),
			Some("json") | Some("json5") => Self::from_json5_str(&text),
			_ => Err(CrawlError::InvalidConfig {
				message: format!("unsupported config file type: {}", path.display()),
			}),
		}
	}

	pub fn from_toml_str(text: &str) -> Result<Self, CrawlError> {
		Ok(toml::from_str(text)?)
	}

	pub fn from_json5_str(text: &str) -> Result<Self, CrawlError> {
		Ok(json5::from_str(text)?)
	}

	/// Apply `CLOUDSCAN_*` overrides from the process environment
	pub fn apply_env(&mut self) -> Result<(), CrawlError> {
		self.apply_env_from(|key| std::env::var(key).ok())
	}

	/// Apply `CLOUDSCAN_*` overrides from any key lookup
	pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), CrawlError>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(root) = lookup("CLOUDSCAN_ROOT") {
			self.root = root;
		}
		if let Some(provider) = lookup("CLOUDSCAN_PROVIDER") {
			self.provider = provider.parse::<ProviderKind>()?;
		}
		if let Some(ms) = lookup("CLOUDSCAN_INTERVAL_MS") {
			self.pacing.interval_ms = parse_millis("CLOUDSCAN_INTERVAL_MS", &ms)?;
		}
		if let Some(ms) = lookup("CLOUDSCAN_COOLDOWN_MS") {
			self.pacing.cooldown_ms = parse_millis("CLOUDSCAN_COOLDOWN_MS", &ms)?;
		}
		if let Some(level) = lookup("CLOUDSCAN_LOG_LEVEL") {
			self.log_level = level;
		}
		Ok(())
	}

	/// Reject settings the crawl cannot run with
	pub fn validate(&self) -> Result<(), CrawlError> {
		if self.root.is_empty() {
			return Err(CrawlError::InvalidConfig { message: "root must not be empty".to_string() });
		}
		self.pacing.validate()
	}

	/// Effective configuration rendered as TOML
	pub fn to_toml(&self) -> Result<String, CrawlError> {
		toml::to_string(self).map_err(|e| CrawlError::InvalidConfig { message: e.to_string() })
	}
}

fn parse_millis(key: &str, value: &str) -> Result<u64, CrawlError> {
	value.trim().parse().map_err(|_| CrawlError::InvalidConfig {
		message: format!("{} must be a number of milliseconds, got {:?}", key, value),
	})
}

// ============================================================================
// NESTED CONFIGURATION STRUCTS
// ============================================================================

/// Request pacing and throttling recovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PacingConfig {
	/// Minimum spacing between two issued requests
	pub interval_ms: u64,

	/// Pause after a rate-limit signal
	pub cooldown_ms: u64,
}

impl Default for PacingConfig {
	fn default() -> Self {
		PacingConfig { interval_ms: 10, cooldown_ms: 3000 }
	}
}

impl PacingConfig {
	pub fn new(interval: Duration, cooldown: Duration) -> Self {
		PacingConfig { interval_ms: interval.as_millis() as u64, cooldown_ms: cooldown.as_millis() as u64 }
	}

	pub fn interval(&self) -> Duration {
		Duration::from_millis(self.interval_ms)
	}

	pub fn cooldown(&self) -> Duration {
		Duration::from_millis(self.cooldown_ms)
	}

	pub fn validate(&self) -> Result<(), CrawlError> {
		if self.interval_ms == 0 {
			return Err(CrawlError::InvalidConfig { message: "pacing interval must be greater than 0".to_string() });
		}
		if self.cooldown_ms == 0 {
			return Err(CrawlError::InvalidConfig { message: "cooldown must be greater than 0".to_string() });
		}
		if self.cooldown_ms < self.interval_ms {
			return Err(CrawlError::InvalidConfig {
				message: format!(
					"cooldown ({} ms) must not be shorter than the pacing interval ({} ms)",
					self.cooldown_ms, self.interval_ms
				),
			});
		}
		Ok(())
	}
}

// ============================================================================
// ENUMERATIONS
// ============================================================================

/// Output display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
	/// Indented tree listing
	#[default]
	Text,
	/// Machine-readable JSON
	Json,
	/// Summary only
	Quiet,
}

/// Log format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
	#[default]
	Pretty,
	Compact,
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	#[test]
	fn test_config_default() {
		let config = Config::default();
		assert_eq!(config.root, "/");
		assert_eq!(config.pacing.interval(), Duration::from_millis(10));
		assert_eq!(config.pacing.cooldown(), Duration::from_millis(3000));
		assert!(config.synthetic_entries);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_partial_toml_keeps_defaults() {
		let config = Config::from_toml_str("provider = \"drive\"\n[pacing]\ncooldownMs = 500\n").unwrap();
		assert_eq!(config.provider, ProviderKind::Drive);
		assert_eq!(config.pacing.cooldown_ms, 500);
		assert_eq!(config.pacing.interval_ms, 10);
		assert_eq!(config.root, "/");
	}

	#[test]
	fn test_json5_config() {
		let config = Config::from_json5_str("{ root: '/Photos', output: 'json', logFormat: 'compact' }").unwrap();
		assert_eq!(config.root, "/Photos");
		assert_eq!(config.output, OutputMode::Json);
		assert_eq!(config.log_format, LogFormat::Compact);
	}

	#[test]
	fn test_env_overrides() {
		let env: HashMap<&str, &str> = [
			("CLOUDSCAN_ROOT", "/Music"),
			("CLOUDSCAN_PROVIDER", "webdav"),
			("CLOUDSCAN_INTERVAL_MS", "25"),
			("CLOUDSCAN_LOG_LEVEL", "debug"),
		]
		.into_iter()
		.collect();

		let mut config = Config::default();
		config.apply_env_from(|k| env.get(k).map(|v| v.to_string())).unwrap();
		assert_eq!(config.root, "/Music");
		assert_eq!(config.provider, ProviderKind::Webdav);
		assert_eq!(config.pacing.interval_ms, 25);
		assert_eq!(config.pacing.cooldown_ms, 3000);
		assert_eq!(config.log_level, "debug");
	}

	#[test]
	fn test_env_rejects_garbage() {
		let mut config = Config::default();
		let result = config.apply_env_from(|k| (k == "CLOUDSCAN_COOLDOWN_MS").then(|| "soon".to_string()));
		assert!(matches!(result, Err(CrawlError::InvalidConfig { .. })));
	}

	#[test]
	fn test_validate_pacing() {
		let mut config = Config::default();
		config.pacing.interval_ms = 0;
		assert!(config.validate().is_err());

		config.pacing = PacingConfig { interval_ms: 100, cooldown_ms: 50 };
		let err = config.validate().unwrap_err();
		assert!(err.to_string().contains("shorter than the pacing interval"));

		config.pacing = PacingConfig { interval_ms: 10, cooldown_ms: 0 };
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_validate_root() {
		let config = Config { root: String::new(), ..Default::default() };
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_config_serialization() {
		let config = Config { fixture: Some(PathBuf::from("listing.json5")), ..Default::default() };
		let text = config.to_toml().unwrap();
		let back = Config::from_toml_str(&text).unwrap();
		assert_eq!(config, back);
	}
}

// vim: ts=4
