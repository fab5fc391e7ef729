//! Drive-style flat backend
//!
//! The listing walks the whole account page by page. Items reference
//! their parent folder by id, so the hierarchy has to be rebuilt as
//! records arrive, in whatever order the backend returns them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::traits::*;
use super::types::*;
use crate::error::{ErrorClass, ProviderError};

/// MIME type the backend uses for folders
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DriveParent {
	pub id: String,
	pub is_root: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveLabels {
	pub trashed: bool,
}

/// One item of a files listing
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DriveItem {
	pub id: String,
	pub title: String,
	pub mime_type: String,

	/// Decimal string, as the API sends it
	pub quota_bytes_used: Option<String>,

	pub parents: Vec<DriveParent>,
	pub labels: DriveLabels,
	pub icon_link: Option<String>,
}

impl DriveItem {
	pub fn folder(id: &str, title: &str, parent: &str) -> Self {
		DriveItem {
			id: id.into(),
			title: title.into(),
			mime_type: FOLDER_MIME.into(),
			parents: vec![DriveParent { id: parent.into(), is_root: false }],
			..Default::default()
		}
	}

	pub fn file(id: &str, title: &str, parent: &str, bytes: u64) -> Self {
		DriveItem {
			id: id.into(),
			title: title.into(),
			mime_type: "application/octet-stream".into(),
			quota_bytes_used: Some(bytes.to_string()),
			parents: vec![DriveParent { id: parent.into(), is_root: false }],
			..Default::default()
		}
	}

	pub fn is_folder(&self) -> bool {
		self.mime_type == FOLDER_MIME
	}

	/// Parsed byte count; missing or malformed values count as zero
	pub fn bytes(&self) -> u64 {
		self.quota_bytes_used.as_deref().and_then(|s| s.trim().parse().ok()).unwrap_or(0)
	}
}

pub struct DriveAdapter {
	client: Arc<dyn ListingClient<DriveItem>>,
	root_identity: Option<String>,
}

impl DriveAdapter {
	pub fn new(client: Arc<dyn ListingClient<DriveItem>>) -> Self {
		DriveAdapter { client, root_identity: None }
	}

	/// Id of the account's root folder
	pub fn with_root_identity(mut self, id: impl Into<String>) -> Self {
		self.root_identity = Some(id.into());
		self
	}
}

#[async_trait]
impl ProviderAdapter for DriveAdapter {
	type Raw = DriveItem;

	fn name(&self) -> &str {
		"drive"
	}

	fn style(&self) -> ListingStyle {
		ListingStyle::Flat
	}

	async fn list_page(&self, target: &PageTarget) -> ProviderResult<Page<DriveItem>> {
		self.client.fetch(target).await
	}

	fn classify_error(&self, error: &ProviderError) -> ErrorClass {
		let throttle_code =
			matches!(error.code.as_deref(), Some("rateLimitExceeded") | Some("userRateLimitExceeded"));
		match error.status {
			Some(429) => ErrorClass::RateLimited,
			Some(403) if throttle_code => ErrorClass::RateLimited,
			None => ErrorClass::Transient,
			Some(_) if error.is_server_error() => ErrorClass::Transient,
			Some(_) => ErrorClass::Fatal,
		}
	}

	fn to_entry(&self, raw: &DriveItem) -> Entry {
		// Only the first parent is used; multi-parent items appear once
		let parent_ref = raw.parents.first().map(|p| p.id.clone());
		let mut entry = Entry::with_identity(raw.title.clone(), raw.id.clone(), parent_ref, raw.is_folder(), raw.bytes());
		if !raw.mime_type.is_empty() {
			entry.kind = Some(raw.mime_type.clone());
		}
		entry.icon = raw.icon_link.clone();
		entry.trashed = raw.labels.trashed;
		entry.parent_is_root = raw.parents.first().is_some_and(|p| p.is_root);
		entry
	}

	fn root_identity(&self) -> Option<&str> {
		self.root_identity.as_deref()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::provider::fixture::FixtureClient;

	fn adapter() -> DriveAdapter {
		DriveAdapter::new(Arc::new(FixtureClient::<DriveItem>::new())).with_root_identity("root-id")
	}

	#[test]
	fn test_classify() {
		let a = adapter();
		assert_eq!(a.classify_error(&ProviderError::http(429, "")), ErrorClass::RateLimited);
		assert_eq!(
			a.classify_error(&ProviderError::http(403, "").with_code("userRateLimitExceeded")),
			ErrorClass::RateLimited
		);
		assert_eq!(
			a.classify_error(&ProviderError::http(403, "").with_code("rateLimitExceeded")),
			ErrorClass::RateLimited
		);
		assert_eq!(a.classify_error(&ProviderError::http(403, "").with_code("forbidden")), ErrorClass::Fatal);
		assert_eq!(a.classify_error(&ProviderError::http(500, "")), ErrorClass::Transient);
		assert_eq!(a.classify_error(&ProviderError::network("offline")), ErrorClass::Transient);
	}

	#[test]
	fn test_to_entry() {
		let mut raw = DriveItem::file("f1", "notes.txt", "p1", 120);
		raw.icon_link = Some("icon.png".into());
		let entry = adapter().to_entry(&raw);
		assert_eq!(entry.identity.as_deref(), Some("f1"));
		assert_eq!(entry.parent_ref.as_deref(), Some("p1"));
		assert_eq!(entry.size, 120);
		assert!(!entry.is_dir);
		assert!(entry.path.is_none());
		assert_eq!(entry.icon.as_deref(), Some("icon.png"));
	}

	#[test]
	fn test_folder_and_trash() {
		let mut raw = DriveItem::folder("d1", "Docs", "root-id");
		raw.labels.trashed = true;
		let entry = adapter().to_entry(&raw);
		assert!(entry.is_dir);
		assert!(entry.trashed);
		assert_eq!(entry.kind.as_deref(), Some(FOLDER_MIME));
	}

	#[test]
	fn test_root_parent_flag() {
		let mut raw = DriveItem::file("f1", "a.txt", "0AAroot", 1);
		raw.parents[0].is_root = true;
		let entry = adapter().to_entry(&raw);
		assert!(entry.parent_is_root);
		assert!(!adapter().to_entry(&DriveItem::file("f2", "b.txt", "p1", 1)).parent_is_root);
	}

	#[test]
	fn test_bytes_parsing() {
		let mut raw = DriveItem::default();
		assert_eq!(raw.bytes(), 0);
		raw.quota_bytes_used = Some("not a number".into());
		assert_eq!(raw.bytes(), 0);
		raw.quota_bytes_used = Some("4096".into());
		assert_eq!(raw.bytes(), 4096);
	}

	#[test]
	fn test_orphan_has_no_parent_ref() {
		let raw = DriveItem { id: "x".into(), title: "x".into(), ..Default::default() };
		assert!(adapter().to_entry(&raw).parent_ref.is_none());
	}

	#[test]
	fn test_flat_root_target() {
		let a = adapter();
		assert_eq!(a.root_target("/"), PageTarget::Start);
		assert_eq!(a.root_identity(), Some("root-id"));
	}
}

// vim: ts=4
