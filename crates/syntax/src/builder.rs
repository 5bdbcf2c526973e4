use crate::kind::SyntaxKind;
use crate::tree::{NodeId, SyntaxTree};

/// Bottom-up tree construction for parsers.
///
/// Nodes are opened with [`start_node`](Self::start_node), filled with
/// [`token`](Self::token)s and closed with [`finish_node`](Self::finish_node).
/// Building records no change events.
#[derive(Debug)]
pub struct TreeBuilder {
	tree: SyntaxTree,
	root_children: Vec<NodeId>,
	open: Vec<(SyntaxKind, Vec<NodeId>)>,
}

impl TreeBuilder {
	pub fn new(root_kind: SyntaxKind) -> Self {
		Self {
			tree: SyntaxTree::new(root_kind),
			root_children: Vec::new(),
			open: Vec::new(),
		}
	}

	pub fn start_node(&mut self, kind: SyntaxKind) {
		self.open.push((kind, Vec::new()));
	}

	pub fn token(&mut self, kind: SyntaxKind, text: &str) {
		let leaf = self.tree.new_leaf(kind, text);
		self.push(leaf);
	}

	/// Closes the innermost open node. Does nothing if none is open.
	pub fn finish_node(&mut self) {
		if let Some((kind, children)) = self.open.pop() {
			let node = self.tree.alloc_composite(kind, children);
			self.push(node);
		}
	}

	/// Closes any nodes still open and returns the tree.
	pub fn finish(mut self) -> SyntaxTree {
		while !self.open.is_empty() {
			self.finish_node();
		}
		self.tree.set_root_children(self.root_children);
		self.tree
	}

	fn push(&mut self, node: NodeId) {
		match self.open.last_mut() {
			Some((_, children)) => children.push(node),
			None => self.root_children.push(node),
		}
	}
}
