//! WebDAV hierarchical backend (PROPFIND, depth 1)
//!
//! A depth-1 listing returns the requested collection itself followed by
//! its members. Collections carry a trailing slash in their href. The
//! server answers 503 when the client is going too fast.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::traits::*;
use super::types::*;
use crate::error::{ErrorClass, ProviderError};

/// One `<D:response>` element of a multistatus reply
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DavResponse {
	/// Decoded href of the resource
	pub href: String,
	pub is_collection: bool,
	pub content_length: Option<u64>,
	pub content_type: Option<String>,
}

impl DavResponse {
	pub fn collection(href: impl Into<String>) -> Self {
		DavResponse { href: href.into(), is_collection: true, ..Default::default() }
	}

	pub fn resource(href: impl Into<String>, length: u64, content_type: &str) -> Self {
		DavResponse {
			href: href.into(),
			content_length: Some(length),
			content_type: Some(content_type.to_string()),
			..Default::default()
		}
	}
}

pub struct WebDavAdapter {
	client: Arc<dyn ListingClient<DavResponse>>,
}

impl WebDavAdapter {
	pub fn new(client: Arc<dyn ListingClient<DavResponse>>) -> Self {
		WebDavAdapter { client }
	}
}

#[async_trait]
impl ProviderAdapter for WebDavAdapter {
	type Raw = DavResponse;

	fn name(&self) -> &str {
		"webdav"
	}

	fn style(&self) -> ListingStyle {
		ListingStyle::Hierarchical
	}

	async fn list_page(&self, target: &PageTarget) -> ProviderResult<Page<DavResponse>> {
		self.client.fetch(target).await
	}

	fn classify_error(&self, error: &ProviderError) -> ErrorClass {
		match error.status {
			Some(503) => ErrorClass::RateLimited,
			None => ErrorClass::Transient,
			Some(_) if error.is_server_error() => ErrorClass::Transient,
			Some(_) => ErrorClass::Fatal,
		}
	}

	fn to_entry(&self, raw: &DavResponse) -> Entry {
		let size = if raw.is_collection { 0 } else { raw.content_length.unwrap_or(0) };
		let mut entry = Entry::at_path(leaf_name(&raw.href), raw.href.clone(), raw.is_collection, size);
		if !raw.is_collection {
			entry.kind = raw.content_type.clone();
		}
		entry
	}
}


// vim: ts=4
