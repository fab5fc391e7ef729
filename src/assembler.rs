//! Tree assembly
//!
//! Folds normalized listing entries into the node table.
//!
//! Hierarchical listings are scoped to the directory that was requested,
//! so children go straight under that directory with their path and level
//! known up front.
//!
//! Flat listings name each item's parent by backend id, and items can
//! arrive before their parent's own record. The assembler keeps an
//! identity index; an id seen only as a parent gets a placeholder node
//! which is filled in when its record shows up. Every linking step is
//! followed by a full top-down re-path from the root.

use std::collections::HashMap;

use crate::node::{Node, NodeId};
use crate::provider::{same_path, Entry, ListingStyle};
use crate::queue::SequenceSource;
use crate::tree::Tree;

/// Why an entry did not end up in the visible tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
	/// Backend marked the item deleted
	Trashed,
	/// File with no bytes
	EmptyFile,
	/// Listing included the requested directory itself
	SelfReference,
	/// Entry carried neither the path nor the id its backend needs
	Unaddressable,
}

/// Outcome of folding one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folded {
	/// Linked into the tree
	Attached(NodeId),
	/// Directory linked into the tree; its own listing must be queued
	Directory(NodeId),
	/// Known node updated in place, no new link
	Described(NodeId),
	Skipped(SkipReason),
}

/// Builds a [`Tree`] from listing entries
#[derive(Debug)]
pub struct TreeAssembler {
	style: ListingStyle,
	index: HashMap<String, NodeId>,
}

impl TreeAssembler {
	pub fn new(style: ListingStyle) -> Self {
		TreeAssembler { style, index: HashMap::new() }
	}

	pub fn style(&self) -> ListingStyle {
		self.style
	}

	/// Map a backend id to an existing node (e.g. the root folder)
	pub fn register(&mut self, identity: impl Into<String>, id: NodeId) {
		self.index.insert(identity.into(), id);
	}

	pub fn lookup(&self, identity: &str) -> Option<NodeId> {
		self.index.get(identity).copied()
	}

	/// Map `identity` to the root unless it already names a node
	///
	/// Lets a flat run find its root folder from the parent references of
	/// items filed directly under it.
	fn learn_root(&mut self, tree: &mut Tree, identity: &str) {
		if self.index.contains_key(identity) {
			return;
		}
		let root = tree.root();
		self.index.insert(identity.to_string(), root);
		tree.get_mut(root).identity.get_or_insert_with(|| identity.to_string());
	}

	/// Forget every id; used when a new run starts
	pub fn reset(&mut self) {
		self.index.clear();
	}

	/// Fold one entry listed under `dir`
	pub fn fold<S: SequenceSource>(&mut self, tree: &mut Tree, dir: NodeId, entry: &Entry, seq: &mut S) -> Folded {
		match self.style {
			ListingStyle::Hierarchical => fold_hierarchical(tree, dir, entry, seq),
			ListingStyle::Flat => self.fold_flat(tree, entry, seq),
		}
	}

	fn fold_flat<S: SequenceSource>(&mut self, tree: &mut Tree, entry: &Entry, seq: &mut S) -> Folded {
		if entry.parent_is_root {
			if let Some(parent_key) = entry.parent_ref.as_deref() {
				self.learn_root(tree, parent_key);
			}
		}
		if entry.trashed {
			return Folded::Skipped(SkipReason::Trashed);
		}
		let Some(identity) = entry.identity.as_deref() else {
			return Folded::Skipped(SkipReason::Unaddressable);
		};
		if self.lookup(identity) == Some(tree.root()) {
			return Folded::Skipped(SkipReason::SelfReference);
		}

		let parent_key = entry.parent_ref.as_deref().unwrap_or(identity);
		let parent = match self.lookup(parent_key) {
			Some(id) => id,
			None => {
				let id = tree.insert(Node::placeholder(parent_key, seq.next_sequence_id()));
				self.index.insert(parent_key.to_string(), id);
				id
			}
		};

		// Parentless item: its record only describes itself
		if parent_key == identity {
			let node = tree.get_mut(parent);
			node.name = entry.name.clone();
			node.path = entry.name.clone();
			node.is_dir |= entry.is_dir;
			return Folded::Described(parent);
		}

		tree.ensure_children(parent);
		let parent_level = {
			let node = tree.get_mut(parent);
			node.is_dir = true;
			node.level
		};

		let child = match self.lookup(identity) {
			Some(id) => id,
			None => {
				let node = Node::new(entry.name.clone(), entry.name.clone(), parent_level + 1, entry.is_dir)
					.with_seq_id(seq.next_sequence_id())
					.with_identity(identity);
				let id = tree.insert(node);
				self.index.insert(identity.to_string(), id);
				id
			}
		};

		let already_attached = {
			let node = tree.get_mut(child);
			// A placeholder that already gathered children stays a directory
			let is_dir = entry.is_dir || node.children.as_ref().is_some_and(|c| !c.is_empty());
			node.name = entry.name.clone();
			node.kind = entry.kind.clone();
			node.icon = entry.icon.clone();
			// Attached nodes never turn into empty files; children only grow
			if !(node.attached && !is_dir && entry.size == 0) {
				node.size = entry.size;
				node.is_dir = is_dir;
			}
			if !node.attached {
				node.level = parent_level + 1;
			}
			node.attached
		};

		let outcome = if already_attached {
			Folded::Described(child)
		} else if tree.attach(parent, child) {
			Folded::Attached(child)
		} else {
			Folded::Skipped(SkipReason::EmptyFile)
		};
		tree.repath();
		outcome
	}
}

fn fold_hierarchical<S: SequenceSource>(tree: &mut Tree, dir: NodeId, entry: &Entry, seq: &mut S) -> Folded {
	tree.ensure_children(dir);
	if entry.trashed {
		return Folded::Skipped(SkipReason::Trashed);
	}
	let Some(path) = entry.path.as_deref() else {
		return Folded::Skipped(SkipReason::Unaddressable);
	};
	if same_path(path, &tree.get(dir).path) {
		return Folded::Skipped(SkipReason::SelfReference);
	}

	let level = tree.get(dir).level + 1;
	let mut node = Node::new(entry.name.clone(), path, level, entry.is_dir)
		.with_size(entry.size)
		.with_kind(entry.kind.clone())
		.with_icon(entry.icon.clone());

	if entry.is_dir {
		// Sequence id comes from the queue when its listing is enqueued
		let id = tree.insert(node);
		tree.attach(dir, id);
		return Folded::Directory(id);
	}

	node.seq_id = Some(seq.next_sequence_id());
	if node.is_empty_file() {
		return Folded::Skipped(SkipReason::EmptyFile);
	}
	let id = tree.insert(node);
	tree.attach(dir, id);
	Folded::Attached(id)
}


// vim: ts=4
