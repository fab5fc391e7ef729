//! Tree entity records
//!
//! Nodes live in a [`Tree`](crate::tree::Tree) table and refer to each other
//! by [`NodeId`]. A node is created when a listing item is first observed,
//! or earlier as a placeholder when another item names it as its parent.

use std::fmt;

/// Discovery-order index, doubles as retry priority key
pub type SeqId = u64;

/// Index of a node inside its tree table
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
	/// Position in the owning table
	pub fn index(self) -> usize {
		self.0
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// A file or directory discovered during a crawl
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
	/// Display name (last path segment)
	pub name: String,

	/// Full logical path; empty while an id-referenced node is unresolved
	pub path: String,

	/// Depth from the crawl root (root = 0)
	pub level: u32,

	/// Directories may gain children over time, files never do
	pub is_dir: bool,

	/// Remote byte size, or logical size (quota) for directories
	pub size: u64,

	/// Assigned at discovery time, `None` until then
	pub seq_id: Option<SeqId>,

	/// Opaque backend id, only used by flat listings
	pub identity: Option<String>,

	/// MIME or backend type label
	pub kind: Option<String>,

	/// Backend icon reference
	pub icon: Option<String>,

	pub(crate) children: Option<Vec<NodeId>>,
	pub(crate) attached: bool,
}

impl Node {
	/// Create a node with a known name and path
	pub fn new(name: impl Into<String>, path: impl Into<String>, level: u32, is_dir: bool) -> Self {
		Node {
			name: name.into(),
			path: path.into(),
			level,
			is_dir,
			size: 0,
			seq_id: None,
			identity: None,
			kind: None,
			icon: None,
			children: None,
			attached: false,
		}
	}

	/// Stand-in for an id seen only as a parent reference so far
	pub fn placeholder(identity: impl Into<String>, seq_id: SeqId) -> Self {
		let mut node = Node::new("", "", 1, false);
		node.identity = Some(identity.into());
		node.seq_id = Some(seq_id);
		node
	}

	pub fn with_size(mut self, size: u64) -> Self {
		self.size = size;
		self
	}

	pub fn with_seq_id(mut self, seq_id: SeqId) -> Self {
		self.seq_id = Some(seq_id);
		self
	}

	pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
		self.identity = Some(identity.into());
		self
	}

	pub fn with_kind(mut self, kind: Option<String>) -> Self {
		self.kind = kind;
		self
	}

	pub fn with_icon(mut self, icon: Option<String>) -> Self {
		self.icon = icon;
		self
	}

	/// Child ids in discovery order; `None` until the first child or listing
	pub fn children(&self) -> Option<&[NodeId]> {
		self.children.as_deref()
	}

	/// Whether the node has been linked under a parent
	pub fn is_attached(&self) -> bool {
		self.attached
	}

	/// Still waiting for its own listing record
	pub fn is_placeholder(&self) -> bool {
		self.name.is_empty() && self.identity.is_some()
	}

	/// Files with no bytes are kept out of the visible tree
	pub fn is_empty_file(&self) -> bool {
		!self.is_dir && self.size == 0
	}
}


// vim: ts=4
