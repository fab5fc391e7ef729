//! Dropbox-style hierarchical backend
//!
//! Listings are requested per directory path and return the directory's
//! direct contents. Throttling is signalled with HTTP 429.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::traits::*;
use super::types::*;
use crate::error::{ErrorClass, ProviderError};

/// One record of a directory metadata listing
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DropboxMetadata {
	pub path: String,
	pub is_dir: bool,
	pub bytes: u64,
	pub mime_type: Option<String>,
	pub icon: Option<String>,
	pub is_deleted: bool,
}

impl DropboxMetadata {
	pub fn file(path: impl Into<String>, bytes: u64) -> Self {
		DropboxMetadata { path: path.into(), bytes, ..Default::default() }
	}

	pub fn dir(path: impl Into<String>) -> Self {
		DropboxMetadata { path: path.into(), is_dir: true, icon: Some("folder".into()), ..Default::default() }
	}
}

/// Adapter for Dropbox-style path listings
pub struct DropboxAdapter {
	client: Arc<dyn ListingClient<DropboxMetadata>>,
}

impl DropboxAdapter {
	pub fn new(client: Arc<dyn ListingClient<DropboxMetadata>>) -> Self {
		DropboxAdapter { client }
	}
}

#[async_trait]
impl ProviderAdapter for DropboxAdapter {
	type Raw = DropboxMetadata;

	fn name(&self) -> &str {
		"dropbox"
	}

	fn style(&self) -> ListingStyle {
		ListingStyle::Hierarchical
	}

	async fn list_page(&self, target: &PageTarget) -> ProviderResult<Page<DropboxMetadata>> {
		self.client.fetch(target).await
	}

	fn classify_error(&self, error: &ProviderError) -> ErrorClass {
		match error.status {
			Some(429) => ErrorClass::RateLimited,
			None => ErrorClass::Transient,
			Some(_) if error.is_server_error() => ErrorClass::Transient,
			Some(_) => ErrorClass::Fatal,
		}
	}

	fn to_entry(&self, raw: &DropboxMetadata) -> Entry {
		let mut entry = Entry::at_path(leaf_name(&raw.path), raw.path.clone(), raw.is_dir, raw.bytes);
		entry.kind = raw.mime_type.clone();
		entry.icon = raw.icon.clone();
		entry.trashed = raw.is_deleted;
		entry
	}
}


// vim: ts=4
