//! Id-indexed node table for one crawl run
//!
//! The table owns every node created during a run, reachable or not.
//! Detached nodes (placeholders and subtrees whose parent record has not
//! arrived yet) stay in the table until a later [`Tree::attach`] links them.

use serde::Serialize;

use crate::node::{Node, NodeId, SeqId};

/// Node table rooted at the crawl root
#[derive(Debug, Clone)]
pub struct Tree {
	nodes: Vec<Node>,
	root: NodeId,
}

impl Tree {
	/// Create a table holding only the root. The root is level 0.
	pub fn new(mut root: Node) -> Self {
		root.level = 0;
		root.attached = true;
		Tree { nodes: vec![root], root: NodeId(0) }
	}

	pub fn root(&self) -> NodeId {
		self.root
	}

	/// Total nodes in the table, including detached ones
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Look up a node by id
	///
	/// # Panics
	/// Panics if `id` was not produced by this table.
	pub fn get(&self, id: NodeId) -> &Node {
		&self.nodes[id.0]
	}

	pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node {
		&mut self.nodes[id.0]
	}

	/// Child ids of `id` in discovery order
	pub fn children(&self, id: NodeId) -> &[NodeId] {
		self.nodes[id.0].children.as_deref().unwrap_or(&[])
	}

	/// Add a detached node to the table
	pub fn insert(&mut self, node: Node) -> NodeId {
		self.nodes.push(node);
		NodeId(self.nodes.len() - 1)
	}

	/// Create the children sequence of `id` if it does not exist yet
	pub fn ensure_children(&mut self, id: NodeId) {
		let node = &mut self.nodes[id.0];
		if node.children.is_none() {
			node.children = Some(Vec::new());
		}
	}

	/// Link `child` under `parent`
	///
	/// Returns `false` without changing anything if the child is already
	/// attached, is an empty file, or is the root. A successful attach turns
	/// the parent into a directory and sets the child's level.
	pub fn attach(&mut self, parent: NodeId, child: NodeId) -> bool {
		if child == self.root || parent == child {
			return false;
		}
		{
			let node = &self.nodes[child.0];
			if node.attached || node.is_empty_file() {
				return false;
			}
		}

		let parent_level = {
			let p = &mut self.nodes[parent.0];
			p.is_dir = true;
			p.children.get_or_insert_with(Vec::new).push(child);
			p.level
		};

		let c = &mut self.nodes[child.0];
		c.attached = true;
		c.level = parent_level + 1;
		true
	}

	/// Recompute `path` and `level` for everything reachable from the root
	///
	/// Full top-down pass: `path = parentPath + "/" + name`. Nodes seen
	/// twice (a malformed parent cycle) are visited only once.
	pub fn repath(&mut self) {
		let mut visited = vec![false; self.nodes.len()];
		let root = self.root;
		visited[root.0] = true;
		self.nodes[root.0].level = 0;

		let mut stack = vec![root];
		while let Some(id) = stack.pop() {
			let (prefix, level, children) = {
				let node = &self.nodes[id.0];
				let children = node.children.clone().unwrap_or_default();
				(path_prefix(node, id == root), node.level, children)
			};
			for child in children.into_iter().rev() {
				if visited[child.0] {
					continue;
				}
				visited[child.0] = true;
				let node = &mut self.nodes[child.0];
				node.level = level + 1;
				node.path = format!("{}/{}", prefix, node.name);
				stack.push(child);
			}
		}
	}

	/// Iterate reachable node ids depth-first, parents before children
	pub fn walk(&self) -> Walk<'_> {
		Walk { tree: self, stack: vec![self.root], seen: vec![false; self.nodes.len()] }
	}

	/// Number of nodes reachable from the root, root included
	pub fn reachable_count(&self) -> usize {
		self.walk().count()
	}

	/// Owned nested copy of the reachable tree
	pub fn snapshot(&self) -> NodeSnapshot {
		self.snapshot_of(self.root, &mut vec![false; self.nodes.len()])
	}

	fn snapshot_of(&self, id: NodeId, seen: &mut Vec<bool>) -> NodeSnapshot {
		seen[id.0] = true;
		let node = &self.nodes[id.0];
		let children = node.children.as_ref().map(|ids| {
			let mut out = Vec::with_capacity(ids.len());
			for child in ids {
				if !seen[child.0] {
					out.push(self.snapshot_of(*child, seen));
				}
			}
			out
		});
		NodeSnapshot {
			name: node.name.clone(),
			path: node.path.clone(),
			level: node.level,
			is_dir: node.is_dir,
			size: node.size,
			seq_id: node.seq_id,
			identity: node.identity.clone(),
			kind: node.kind.clone(),
			icon: node.icon.clone(),
			children,
		}
	}
}

// The root "/" contributes no segment of its own
fn path_prefix(node: &Node, is_root: bool) -> String {
	if is_root {
		node.path.trim_end_matches('/').to_string()
	} else {
		node.path.clone()
	}
}

/// Depth-first iterator over reachable node ids
pub struct Walk<'a> {
	tree: &'a Tree,
	stack: Vec<NodeId>,
	seen: Vec<bool>,
}

impl Iterator for Walk<'_> {
	type Item = NodeId;

	fn next(&mut self) -> Option<NodeId> {
		while let Some(id) = self.stack.pop() {
			if self.seen[id.0] {
				continue;
			}
			self.seen[id.0] = true;
			for child in self.tree.children(id).iter().rev() {
				self.stack.push(*child);
			}
			return Some(id);
		}
		None
	}
}

/// Owned nested view of a crawl tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
	pub name: String,
	pub path: String,
	pub level: u32,
	pub is_dir: bool,
	pub size: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub seq_id: Option<SeqId>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub identity: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub kind: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub icon: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub children: Option<Vec<NodeSnapshot>>,
}

impl NodeSnapshot {
	/// Children in discovery order (empty if never listed)
	pub fn children(&self) -> &[NodeSnapshot] {
		self.children.as_deref().unwrap_or(&[])
	}

	/// Find a descendant (or self) by full path
	pub fn find(&self, path: &str) -> Option<&NodeSnapshot> {
		if self.path == path {
			return Some(self);
		}
		self.children().iter().find_map(|c| c.find(path))
	}

	/// Find a direct child by name
	pub fn child(&self, name: &str) -> Option<&NodeSnapshot> {
		self.children().iter().find(|c| c.name == name)
	}

	/// Nodes in this subtree, self included
	pub fn count(&self) -> usize {
		1 + self.children().iter().map(NodeSnapshot::count).sum::<usize>()
	}

	/// Sum of file sizes in this subtree
	pub fn file_bytes(&self) -> u64 {
		if self.is_dir {
			self.children().iter().map(NodeSnapshot::file_bytes).sum()
		} else {
			self.size
		}
	}

	/// Visit every node in this subtree, parents first
	pub fn visit<F: FnMut(&NodeSnapshot)>(&self, f: &mut F) {
		f(self);
		for child in self.children() {
			child.visit(f);
		}
	}
}


// vim: ts=4
