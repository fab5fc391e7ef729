//! Core provider traits defining the listing interface
//!
//! All storage backends implement [`ProviderAdapter`] to give the crawl
//! engine one listing/pagination/error contract. The engine depends only
//! on this trait, never on a specific backend.

use async_trait::async_trait;

use super::types::*;
use crate::error::{ErrorClass, ProviderError};

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Already-authenticated transport able to fetch one raw listing page
///
/// Implemented by whatever owns the backend session (HTTP client, SDK,
/// recorded fixture). The crawl never authenticates on its own.
#[async_trait]
pub trait ListingClient<R>: Send + Sync {
	/// Fetch one page for `target`
	async fn fetch(&self, target: &PageTarget) -> ProviderResult<Page<R>>;
}

/// Backend adapter consumed by the crawl engine
///
/// Hides how a backend addresses directories, paginates and signals
/// throttling. One adapter instance serves one crawl engine.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + 'static {
	/// Raw listing record type
	type Raw: Send + 'static;

	/// Short backend name, used for logging
	fn name(&self) -> &str;

	/// Hierarchical or flat/id-referenced listing
	fn style(&self) -> ListingStyle;

	/// Fetch one page of raw records
	async fn list_page(&self, target: &PageTarget) -> ProviderResult<Page<Self::Raw>>;

	/// Normalize a failed request into retry / drop decisions
	fn classify_error(&self, error: &ProviderError) -> ErrorClass;

	/// Normalize one raw record
	fn to_entry(&self, raw: &Self::Raw) -> Entry;

	/// Request that starts a crawl at `root`
	fn root_target(&self, root: &str) -> PageTarget {
		match self.style() {
			ListingStyle::Hierarchical => PageTarget::Path(root.to_string()),
			ListingStyle::Flat => PageTarget::Start,
		}
	}

	/// Backend id of the root folder, for flat listings
	fn root_identity(&self) -> Option<&str> {
		None
	}
}


// vim: ts=4
