//! Per-document bookkeeping between a tree edit and the formatting run.

use reflow_syntax::{Node, NodeId, SyntaxTree};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::error::Originator;

/// Edit-scoped node annotations.
///
/// Stored beside the tree rather than on its nodes; the table is dropped once
/// the document's postponed work has run.
#[derive(Debug, Default)]
pub struct NodeMarks {
	generated: FxHashSet<NodeId>,
	old_indent: FxHashMap<NodeId, usize>,
	reformat_before: FxHashSet<NodeId>,
	reformat_self: FxHashSet<NodeId>,
}

impl NodeMarks {
	pub fn is_generated(&self, node: NodeId) -> bool {
		self.generated.contains(&node)
	}

	pub fn set_generated(&mut self, node: NodeId, generated: bool) {
		if generated {
			self.generated.insert(node);
		} else {
			self.generated.remove(&node);
		}
	}

	/// Clears the generated flag, returning whether it was set.
	pub fn take_generated(&mut self, node: NodeId) -> bool {
		self.generated.remove(&node)
	}

	/// Indentation width the node had before it was moved or copied.
	pub fn old_indent(&self, node: NodeId) -> Option<usize> {
		self.old_indent.get(&node).copied()
	}

	pub fn set_old_indent(&mut self, node: NodeId, indent: Option<usize>) {
		match indent {
			Some(width) => self.old_indent.insert(node, width),
			None => self.old_indent.remove(&node),
		};
	}

	pub fn take_old_indent(&mut self, node: NodeId) -> Option<usize> {
		self.old_indent.remove(&node)
	}

	/// Requests a reformat of the whitespace in front of `node`.
	pub fn mark_reformat_before(&mut self, node: NodeId) {
		self.reformat_before.insert(node);
	}

	/// Requests a reformat of `node` including its leading whitespace.
	pub fn mark_reformat(&mut self, node: NodeId) {
		self.reformat_self.insert(node);
	}

	pub fn has_reformat_markers(&self) -> bool {
		!self.reformat_before.is_empty() || !self.reformat_self.is_empty()
	}

	/// Consumes both markers of `node`, returning `(before, self)`.
	pub fn take_reformat_markers(&mut self, node: NodeId) -> (bool, bool) {
		(self.reformat_before.remove(&node), self.reformat_self.remove(&node))
	}
}

/// State accumulated for one document until its postponed work runs.
#[derive(Debug, Default)]
pub struct DocumentContext {
	/// Nodes queued by the observer, in recording order, without duplicates.
	pending: Vec<NodeId>,
	/// Parents whose edge child may have vanished.
	raise_candidates: SmallVec<[NodeId; 4]>,
	/// The tree may no longer match a fresh parse of the text.
	reparse_pending: bool,
	/// Changes were recorded since the last run.
	updated: bool,
	pub(crate) marks: NodeMarks,
	originator: Option<Originator>,
}

impl DocumentContext {
	/// Queues `node`, capturing the originator on the first queued node.
	pub fn queue(&mut self, node: NodeId, capture_originator: bool) {
		if self.pending.is_empty() && capture_originator {
			self.originator = Some(Originator::capture());
		}
		if !self.pending.contains(&node) {
			self.pending.push(node);
		}
	}

	pub fn pending(&self) -> &[NodeId] {
		&self.pending
	}

	pub fn has_pending(&self) -> bool {
		!self.pending.is_empty()
	}

	/// Returns true if a queued node is still part of `tree`.
	pub fn has_attached_pending(&self, tree: &SyntaxTree) -> bool {
		self.pending.iter().any(|&id| is_attached(tree, id))
	}

	/// Drops queued nodes that are no longer part of `tree`.
	pub fn retain_attached(&mut self, tree: &SyntaxTree) {
		self.pending.retain(|&id| is_attached(tree, id));
	}

	/// Hands the queued nodes to a formatting run.
	pub(crate) fn take_pending(&mut self) -> Vec<NodeId> {
		std::mem::take(&mut self.pending)
	}

	pub fn add_raise_candidate(&mut self, parent: NodeId) {
		if !self.raise_candidates.contains(&parent) {
			self.raise_candidates.push(parent);
		}
	}

	pub fn raise_candidates(&self) -> &[NodeId] {
		&self.raise_candidates
	}

	pub fn set_reparse_pending(&mut self) {
		self.reparse_pending = true;
	}

	pub fn reparse_pending(&self) -> bool {
		self.reparse_pending
	}

	pub(crate) fn clear_reparse_pending(&mut self) {
		self.reparse_pending = false;
	}

	pub fn mark_updated(&mut self) {
		self.updated = true;
	}

	pub fn is_updated(&self) -> bool {
		self.updated
	}

	pub fn marks(&self) -> &NodeMarks {
		&self.marks
	}

	pub fn originator(&self) -> Option<&Originator> {
		self.originator.as_ref()
	}

	/// Lists up to five queued nodes as `kind[start..end)`.
	pub fn dump_pending(&self, tree: &SyntaxTree) -> String {
		const SHOWN: usize = 5;

		let attached: Vec<Node<'_>> = self
			.pending
			.iter()
			.filter_map(|&id| tree.node(id).ok())
			.filter(Node::is_attached)
			.collect();
		let mut out = String::new();
		for (count, node) in attached.iter().enumerate() {
			if count >= SHOWN {
				out.push_str(&format!(" and {} more.", attached.len() - count));
				break;
			}
			if !out.is_empty() {
				out.push_str(", ");
			}
			out.push_str(&format!("{}{}", node.kind(), node.text_range()));
		}
		out
	}
}

fn is_attached(tree: &SyntaxTree, id: NodeId) -> bool {
	tree.node(id).is_ok_and(|node| node.is_attached())
}
