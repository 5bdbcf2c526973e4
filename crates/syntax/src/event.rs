//! Change batches emitted by tree mutation.
//!
//! Every mutation of an attached node appends one [`ChildChange`] to the
//! [`TreeChange`] of its parent. The first time a parent is touched in a batch
//! its child list is snapshotted, so consumers can ask which children were at
//! the edges before anything moved.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::tree::NodeId;

/// What happened to a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
	Added,
	Removed,
	Replaced,
	/// The child itself stayed, but text somewhere inside it changed.
	ContentsChanged,
}

/// One child-level change under a parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildChange {
	pub kind: ChangeKind,
	/// Child before the change. `None` for additions.
	pub old: Option<NodeId>,
	/// Child after the change. `None` for removals.
	pub new: Option<NodeId>,
	/// Position in the parent's child list at the time of the change.
	pub index: usize,
	/// Sibling preceding the change position when it happened.
	pub prev_sibling: Option<NodeId>,
}

impl ChildChange {
	/// The node this change is about: the new child if there is one.
	pub fn affected(&self) -> Option<NodeId> {
		self.new.or(self.old)
	}
}

/// All changes made directly under one parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeChange {
	pub parent: NodeId,
	/// Child list of `parent` before the first change in the batch.
	pub initial_children: SmallVec<[NodeId; 8]>,
	pub children: Vec<ChildChange>,
}

impl TreeChange {
	/// Returns true if `node` was the first or last child before the batch.
	pub fn was_edge_child(&self, node: Option<NodeId>) -> bool {
		let Some(node) = node else {
			return false;
		};
		self.initial_children.first() == Some(&node) || self.initial_children.last() == Some(&node)
	}
}

/// One atomic batch of mutations on a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeChangeEvent {
	changes: Vec<TreeChange>,
	by_parent: FxHashMap<NodeId, usize>,
}

impl TreeChangeEvent {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.changes.is_empty()
	}

	/// Per-parent changes in the order parents were first touched.
	pub fn changes(&self) -> &[TreeChange] {
		&self.changes
	}

	/// Changes recorded under `parent`, if any.
	pub fn change_for(&self, parent: NodeId) -> Option<&TreeChange> {
		self.by_parent.get(&parent).map(|&i| &self.changes[i])
	}

	/// Returns true if `parent` already has an entry in this batch.
	pub fn has_parent(&self, parent: NodeId) -> bool {
		self.by_parent.contains_key(&parent)
	}

	/// Opens the entry for `parent`, snapshotting its children on first use.
	pub(crate) fn touch(&mut self, parent: NodeId, children: impl FnOnce() -> SmallVec<[NodeId; 8]>) -> &mut TreeChange {
		let index = *self.by_parent.entry(parent).or_insert_with(|| {
			self.changes.push(TreeChange {
				parent,
				initial_children: children(),
				children: Vec::new(),
			});
			self.changes.len() - 1
		});
		&mut self.changes[index]
	}

	/// Records `change` under `parent` for batches assembled outside a
	/// [`SyntaxTree`](crate::SyntaxTree), such as changes reported by an
	/// incremental reparse. `initial_children` is only used the first time
	/// `parent` is seen.
	pub fn push_change(&mut self, parent: NodeId, initial_children: &[NodeId], change: ChildChange) {
		self.touch(parent, || initial_children.iter().copied().collect()).children.push(change);
	}

	/// Appends `other` after this batch's changes.
	pub fn extend(&mut self, other: TreeChangeEvent) {
		for change in other.changes {
			match self.by_parent.get(&change.parent) {
				Some(&i) => self.changes[i].children.extend(change.children),
				None => {
					self.by_parent.insert(change.parent, self.changes.len());
					self.changes.push(change);
				}
			}
		}
	}
}
