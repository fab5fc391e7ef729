//! Recorded listing transport
//!
//! Serves pages from an in-memory map, optionally loaded from a JSON5
//! document. Used by the CLI to replay an account listing and by tests as
//! the transport behind every adapter.
//!
//! Document shape:
//!
//! ```json5
//! {
//!   account: { quota: 1000, used: 400 },
//!   latencyMs: 25,
//!   pages: {
//!     "/": { items: [ ... ], next: "t1" },
//!     "t1": { items: [ ... ] },
//!   },
//!   failures: {
//!     "/Photos": [ { status: 429, message: "slow down" } ],
//!   },
//! }
//! ```
//!
//! Keys are the directory path, the continuation token, or `""` for the
//! first page of a flat listing.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use super::traits::*;
use super::types::*;
use crate::error::{CrawlError, ProviderError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "R: DeserializeOwned"))]
struct FixtureDocument<R> {
	#[serde(default)]
	account: Option<AccountInfo>,

	#[serde(default)]
	latency_ms: u64,

	#[serde(default)]
	pages: HashMap<String, Page<R>>,

	#[serde(default)]
	failures: HashMap<String, Vec<ProviderError>>,
}

/// Listing transport replaying recorded pages
pub struct FixtureClient<R> {
	pages: HashMap<String, Page<R>>,
	failures: Mutex<HashMap<String, VecDeque<ProviderError>>>,
	requests: Mutex<Vec<String>>,
	latency: Duration,
	account: Option<AccountInfo>,
}

impl<R> Default for FixtureClient<R> {
	fn default() -> Self {
		FixtureClient {
			pages: HashMap::new(),
			failures: Mutex::new(HashMap::new()),
			requests: Mutex::new(Vec::new()),
			latency: Duration::ZERO,
			account: None,
		}
	}
}

impl<R> FixtureClient<R> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Serve `page` for `key`
	pub fn with_page(mut self, key: impl Into<String>, page: Page<R>) -> Self {
		self.pages.insert(key.into(), page);
		self
	}

	/// Fail the next request for `key` with `error` before serving its page
	///
	/// Calling it several times for one key queues the failures in order.
	pub fn with_failure(self, key: impl Into<String>, error: ProviderError) -> Self {
		self.failures.lock().unwrap_or_else(|e| e.into_inner()).entry(key.into()).or_default().push_back(error);
		self
	}

	/// Delay every response by `latency`
	pub fn with_latency(mut self, latency: Duration) -> Self {
		self.latency = latency;
		self
	}

	pub fn with_account(mut self, account: AccountInfo) -> Self {
		self.account = Some(account);
		self
	}

	/// Account details recorded alongside the listing
	pub fn account(&self) -> Option<&AccountInfo> {
		self.account.as_ref()
	}

	/// Every requested key, in request order
	pub fn requests(&self) -> Vec<String> {
		self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
	}

	/// Number of requests made for `key`
	pub fn request_count(&self, key: &str) -> usize {
		self.requests.lock().unwrap_or_else(|e| e.into_inner()).iter().filter(|k| *k == key).count()
	}

	fn take_failure(&self, key: &str) -> Option<ProviderError> {
		let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
		failures.get_mut(key).and_then(VecDeque::pop_front)
	}
}

impl<R: DeserializeOwned> FixtureClient<R> {
	/// Parse a JSON5 fixture document
	pub fn from_json5(text: &str) -> Result<Self, CrawlError> {
		Self::parse(text, "<inline>")
	}

	/// Load a JSON5 fixture document from disk
	pub fn from_file(path: &Path) -> Result<Self, CrawlError> {
		let text = std::fs::read_to_string(path).map_err(|e| CrawlError::Fixture {
			path: path.display().to_string(),
			message: e.to_string(),
		})?;
		Self::parse(&text, &path.display().to_string())
	}

	fn parse(text: &str, origin: &str) -> Result<Self, CrawlError> {
		let doc: FixtureDocument<R> = json5::from_str(text)
			.map_err(|e| CrawlError::Fixture { path: origin.to_string(), message: e.to_string() })?;

		let failures = doc.failures.into_iter().map(|(k, v)| (k, VecDeque::from(v))).collect();
		Ok(FixtureClient {
			pages: doc.pages,
			failures: Mutex::new(failures),
			requests: Mutex::new(Vec::new()),
			latency: Duration::from_millis(doc.latency_ms),
			account: doc.account,
		})
	}
}

#[async_trait]
impl<R: Clone + Send + Sync> ListingClient<R> for FixtureClient<R> {
	async fn fetch(&self, target: &PageTarget) -> ProviderResult<Page<R>> {
		let key = target.key().to_string();
		self.requests.lock().unwrap_or_else(|e| e.into_inner()).push(key.clone());

		if !self.latency.is_zero() {
			tokio::time::sleep(self.latency).await;
		}

		if let Some(error) = self.take_failure(&key) {
			return Err(error);
		}
		self.pages.get(&key).cloned().ok_or_else(|| ProviderError::http(404, format!("not found: {}", target)))
	}
}


// vim: ts=4
