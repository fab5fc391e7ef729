//! # cloudscan - Rate-Limited Remote Tree Crawler
//!
//! cloudscan discovers the full file/directory tree of a remote storage
//! account through its paginated listing API. Requests are issued at a
//! fixed pace, throttling signals pause the crawl for a cooldown and the
//! throttled unit is retried in its original discovery order. Flat,
//! id-referenced listings are reassembled into a tree no matter in which
//! order parents and children arrive.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cloudscan::{Crawler, DropboxAdapter, FixtureClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FixtureClient::from_file("listing.json5".as_ref())?;
//!     let handle = Crawler::new(DropboxAdapter::new(Arc::new(client))).spawn();
//!     handle.run("/").await?;
//!     handle.wait_idle().await?;
//!     println!("{} nodes", handle.tree().await?.count());
//!     Ok(())
//! }
//! ```
//!
//! ## Observing a crawl
//!
//! ```rust,ignore
//! use cloudscan::sink::SinkBuilder;
//!
//! let sink = SinkBuilder::new()
//!     .on_waiting_begin(|| eprintln!("throttled"))
//!     .on_tree_changed(|tree| eprintln!("{} nodes", tree.len()))
//!     .build();
//! let handle = Crawler::new(adapter).with_sink(sink).spawn();
//! ```

pub mod assembler;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod node;
pub mod progress;
pub mod provider;
pub mod queue;
pub mod sink;
pub mod tree;

// Re-export commonly used types and functions
pub use config::{Config, PacingConfig};
pub use engine::{CrawlHandle, CrawlPhase, Crawler};
pub use error::{CrawlError, ErrorClass, ProviderError};
pub use node::{Node, NodeId, SeqId};
pub use provider::{
	AccountInfo, DriveAdapter, DropboxAdapter, FixtureClient, ListingStyle, Page, PageTarget, ProviderAdapter,
	ProviderKind, WebDavAdapter,
};
pub use sink::{CrawlSink, NoSink, SinkBuilder};
pub use tree::{NodeSnapshot, Tree};

// vim: ts=4
