//! Provider abstraction layer
//!
//! Every storage backend is reached through [`ProviderAdapter`], which
//! hides how the backend addresses directories, paginates and signals
//! throttling. The crawl engine depends only on the trait.
//!
//! # Example Usage
//!
//! ```ignore
//! use cloudscan::provider::{DropboxAdapter, FixtureClient};
//!
//! let client = Arc::new(FixtureClient::from_file(path)?);
//! let adapter = DropboxAdapter::new(client);
//! let page = adapter.list_page(&adapter.root_target("/")).await?;
//! ```

pub mod drive;
pub mod dropbox;
pub mod fixture;
pub mod traits;
pub mod types;
pub mod webdav;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export public API
pub use drive::{DriveAdapter, DriveItem, DriveLabels, DriveParent, FOLDER_MIME};
pub use dropbox::{DropboxAdapter, DropboxMetadata};
pub use fixture::FixtureClient;
pub use traits::{ListingClient, ProviderAdapter, ProviderResult};
pub use types::{leaf_name, normalize_path, same_path, AccountInfo, Entry, ListingStyle, Page, PageTarget};
pub use webdav::{DavResponse, WebDavAdapter};

/// Closed set of supported backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
	#[default]
	Dropbox,
	Webdav,
	Drive,
}

impl ProviderKind {
	pub fn style(self) -> ListingStyle {
		match self {
			Self::Dropbox | Self::Webdav => ListingStyle::Hierarchical,
			Self::Drive => ListingStyle::Flat,
		}
	}
}

impl FromStr for ProviderKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"dropbox" => Ok(Self::Dropbox),
			"webdav" | "yandex" => Ok(Self::Webdav),
			"drive" | "gdrive" | "google-drive" => Ok(Self::Drive),
			_ => Err(format!("Unknown provider: {}. Valid options: dropbox, webdav, drive", s)),
		}
	}
}

impl fmt::Display for ProviderKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Dropbox => write!(f, "dropbox"),
			Self::Webdav => write!(f, "webdav"),
			Self::Drive => write!(f, "drive"),
		}
	}
}


// vim: ts=4
