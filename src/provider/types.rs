//! Backend-neutral listing types

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a single listing request asks for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageTarget {
	/// First page of a flat, account-wide listing
	Start,
	/// First page of a directory, addressed by path
	Path(String),
	/// Continuation of an earlier page
	Token(String),
}

impl PageTarget {
	/// Stable lookup key (path, token, or "" for `Start`)
	pub fn key(&self) -> &str {
		match self {
			PageTarget::Start => "",
			PageTarget::Path(path) => path,
			PageTarget::Token(token) => token,
		}
	}

	pub fn is_continuation(&self) -> bool {
		matches!(self, PageTarget::Token(_))
	}
}

impl fmt::Display for PageTarget {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PageTarget::Start => write!(f, "<start>"),
			PageTarget::Path(path) => write!(f, "{}", path),
			PageTarget::Token(token) => write!(f, "<page {}>", token),
		}
	}
}

/// One batch of raw listing records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<R> {
	#[serde(default = "Vec::new")]
	pub items: Vec<R>,

	/// Continuation token; `None` ends this listing
	#[serde(default)]
	pub next: Option<String>,
}

impl<R> Page<R> {
	pub fn new(items: Vec<R>) -> Self {
		Page { items, next: None }
	}

	pub fn with_next(mut self, token: impl Into<String>) -> Self {
		self.next = Some(token.into());
		self
	}
}

/// How a backend addresses its hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingStyle {
	/// Each listing is scoped to one directory path
	Hierarchical,
	/// Items carry an explicit parent id; the tree is rebuilt from edges
	Flat,
}

/// Normalized listing record
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entry {
	pub name: String,

	/// Full path, for hierarchical backends
	pub path: Option<String>,

	/// Backend id, for flat backends
	pub identity: Option<String>,

	/// Parent's backend id, for flat backends
	pub parent_ref: Option<String>,

	pub is_dir: bool,
	pub size: u64,
	pub kind: Option<String>,
	pub icon: Option<String>,

	/// Soft-deleted on the backend
	pub trashed: bool,

	/// `parent_ref` is known to be the account's root folder
	pub parent_is_root: bool,
}

impl Entry {
	/// Entry addressed by path
	pub fn at_path(name: impl Into<String>, path: impl Into<String>, is_dir: bool, size: u64) -> Self {
		Entry { name: name.into(), path: Some(path.into()), is_dir, size, ..Default::default() }
	}

	/// Entry addressed by backend id
	pub fn with_identity(
		name: impl Into<String>,
		identity: impl Into<String>,
		parent_ref: Option<String>,
		is_dir: bool,
		size: u64,
	) -> Self {
		Entry {
			name: name.into(),
			identity: Some(identity.into()),
			parent_ref,
			is_dir,
			size,
			..Default::default()
		}
	}
}

/// Account details from the authentication collaborator
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccountInfo {
	pub display_name: Option<String>,

	/// Total quota in bytes
	pub quota: u64,

	/// Bytes in use
	pub used: u64,

	/// Bytes held by trashed items, if the backend reports it
	pub used_in_trash: Option<u64>,

	/// Backend id of the root folder, for flat backends
	pub root_identity: Option<String>,
}

impl AccountInfo {
	pub fn free_bytes(&self) -> u64 {
		self.quota.saturating_sub(self.used)
	}
}

/// `path` without one trailing slash; "/" stays as it is
pub fn normalize_path(path: &str) -> &str {
	match path.strip_suffix('/') {
		Some("") | None => path,
		Some(trimmed) => trimmed,
	}
}

/// Whether two paths name the same location, ignoring one trailing slash
pub fn same_path(a: &str, b: &str) -> bool {
	normalize_path(a) == normalize_path(b)
}

/// Last path segment, ignoring one trailing slash
pub fn leaf_name(path: &str) -> &str {
	let trimmed = path.strip_suffix('/').unwrap_or(path);
	match trimmed.rfind('/') {
		Some(pos) => &trimmed[pos + 1..],
		None => trimmed,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_leaf_name() {
		assert_eq!(leaf_name("/Photos/2014/beach.jpg"), "beach.jpg");
		assert_eq!(leaf_name("/Photos/"), "Photos");
		assert_eq!(leaf_name("/"), "");
		assert_eq!(leaf_name("plain"), "plain");
	}

	#[test]
	fn test_same_path_ignores_trailing_slash() {
		assert!(same_path("/Music", "/Music/"));
		assert!(same_path("/Music/", "/Music/"));
		assert!(same_path("/", "/"));
		assert!(!same_path("/Music", "/Musical"));
		assert_eq!(normalize_path("/"), "/");
		assert_eq!(normalize_path("/Docs/"), "/Docs");
	}

	#[test]
	fn test_target_keys() {
		assert_eq!(PageTarget::Start.key(), "");
		assert_eq!(PageTarget::Path("/a".into()).key(), "/a");
		assert_eq!(PageTarget::Token("t1".into()).key(), "t1");
		assert!(PageTarget::Token("t1".into()).is_continuation());
	}

	#[test]
	fn test_page_defaults() {
		let page: Page<u32> = json5::from_str("{ }").unwrap();
		assert!(page.items.is_empty());
		assert!(page.next.is_none());
	}

	#[test]
	fn test_free_bytes_saturates() {
		let account = AccountInfo { quota: 10, used: 15, ..Default::default() };
		assert_eq!(account.free_bytes(), 0);
	}
}

// vim: ts=4
