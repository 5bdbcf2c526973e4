//! Arena-backed syntax tree.
//!
//! Nodes live in a flat arena owned by [`SyntaxTree`] and are addressed by
//! [`NodeId`]. Every tree gets a fresh generation when it is built, so ids
//! from a previous parse are rejected instead of silently resolving to an
//! unrelated node.
//!
//! Leaves own their text. Composites cache the text length of their subtree;
//! start offsets are derived on demand from parent and sibling lengths.
//!
//! Detached nodes (built with [`SyntaxTree::new_leaf`] and friends, or removed
//! from their parent) stay in the arena and can be attached again. Mutating an
//! attached node records a [`ChildChange`] in the pending [`TreeChangeEvent`],
//! drained with [`SyntaxTree::take_changes`].

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use reflow_primitives::{CharIdx, CharLen, TextRange};
use smallvec::SmallVec;

use crate::error::{Result, TreeError};
use crate::event::{ChangeKind, ChildChange, TreeChangeEvent};
use crate::kind::SyntaxKind;


static NEXT_GENERATION: AtomicU32 = AtomicU32::new(1);

/// Handle to a node: arena slot plus the generation of the owning tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
	generation: u32,
	index: u32,
}

impl NodeId {
	pub fn generation(&self) -> u32 {
		self.generation
	}

	pub fn index(&self) -> u32 {
		self.index
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}@{}", self.index, self.generation)
	}
}

#[derive(Debug, Clone)]
struct NodeData {
	kind: SyntaxKind,
	parent: Option<u32>,
	children: Vec<u32>,
	/// `Some` exactly for leaves.
	text: Option<String>,
	len: CharLen,
}

/// A syntax tree and every node ever allocated for it.
#[derive(Debug)]
pub struct SyntaxTree {
	generation: u32,
	nodes: Vec<NodeData>,
	root: u32,
	pending: TreeChangeEvent,
}

impl SyntaxTree {
	/// Creates a tree holding an empty composite root of `root_kind`.
	pub fn new(root_kind: SyntaxKind) -> Self {
		Self {
			generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
			nodes: vec![NodeData {
				kind: root_kind,
				parent: None,
				children: Vec::new(),
				text: None,
				len: 0,
			}],
			root: 0,
			pending: TreeChangeEvent::new(),
		}
	}

	pub fn generation(&self) -> u32 {
		self.generation
	}

	pub fn root(&self) -> NodeId {
		self.id(self.root)
	}

	/// Returns true if `id` was allocated by this tree generation.
	pub fn contains(&self, id: NodeId) -> bool {
		self.slot(id).is_ok()
	}

	/// Resolves `id` to a navigable view.
	pub fn node(&self, id: NodeId) -> Result<Node<'_>> {
		let index = self.slot(id)?;
		Ok(Node { tree: self, index })
	}

	/// Root as a navigable view.
	pub fn root_node(&self) -> Node<'_> {
		Node {
			tree: self,
			index: self.root,
		}
	}

	/// Full text of the tree.
	pub fn text(&self) -> String {
		self.root_node().text()
	}

	/// Text length of the whole tree.
	pub fn len(&self) -> CharLen {
		self.nodes[self.root as usize].len
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Allocates a detached leaf.
	pub fn new_leaf(&mut self, kind: SyntaxKind, text: impl Into<String>) -> NodeId {
		let text = text.into();
		let len = text.chars().count();
		self.alloc(NodeData {
			kind,
			parent: None,
			children: Vec::new(),
			text: Some(text),
			len,
		})
	}

	/// Allocates a detached composite adopting `children`, which must all be
	/// detached.
	pub fn new_composite(&mut self, kind: SyntaxKind, children: &[NodeId]) -> Result<NodeId> {
		let slots = children.iter().map(|&c| self.detached_slot(c)).collect::<Result<Vec<_>>>()?;
		for (i, slot) in slots.iter().enumerate() {
			if slots[..i].contains(slot) {
				return Err(TreeError::AlreadyAttached(self.id(*slot)));
			}
		}

		Ok(self.alloc_composite(kind, children.to_vec()))
	}

	/// Copies the subtree under `id` into a new detached subtree.
	pub fn deep_copy(&mut self, id: NodeId) -> Result<NodeId> {
		let slot = self.slot(id)?;
		Ok(self.copy_slot(slot))
	}

	fn copy_slot(&mut self, slot: u32) -> NodeId {
		let data = &self.nodes[slot as usize];
		let (kind, text, len) = (data.kind, data.text.clone(), data.len);
		let children = data.children.clone();

		let copied: Vec<u32> = children.into_iter().map(|c| self.copy_slot(c).index).collect();
		let id = self.alloc(NodeData {
			kind,
			parent: None,
			children: copied.clone(),
			text,
			len,
		});
		for child in copied {
			self.nodes[child as usize].parent = Some(id.index);
		}
		id
	}

	/// Inserts detached `child` at `index` among `parent`'s children.
	pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
		let p = self.composite_slot(parent)?;
		let c = self.detached_slot(child)?;
		if self.ancestor_slots(p).any(|a| a == c) {
			return Err(TreeError::CyclicInsert(child));
		}
		let len = self.nodes[p as usize].children.len();
		if index > len {
			return Err(TreeError::IndexOutOfBounds { parent, index, len });
		}

		let prev_sibling = index.checked_sub(1).map(|i| self.id(self.nodes[p as usize].children[i]));
		self.record(
			p,
			ChildChange {
				kind: ChangeKind::Added,
				old: None,
				new: Some(child),
				index,
				prev_sibling,
			},
		);

		self.nodes[p as usize].children.insert(index, c);
		self.nodes[c as usize].parent = Some(p);
		let added = self.nodes[c as usize].len;
		self.adjust_len(p, 0, added);
		Ok(())
	}

	/// Appends detached `child` as the last child of `parent`.
	pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
		let len = self.node(parent)?.child_count();
		self.insert_child(parent, len, child)
	}

	/// Detaches `child` from `parent`. The child stays in the arena.
	pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
		let (p, c, index) = self.child_position(parent, child)?;

		let prev_sibling = index.checked_sub(1).map(|i| self.id(self.nodes[p as usize].children[i]));
		self.record(
			p,
			ChildChange {
				kind: ChangeKind::Removed,
				old: Some(child),
				new: None,
				index,
				prev_sibling,
			},
		);

		self.nodes[p as usize].children.remove(index);
		self.nodes[c as usize].parent = None;
		let removed = self.nodes[c as usize].len;
		self.adjust_len(p, removed, 0);
		Ok(())
	}

	/// Puts detached `new` in the place of `old` under `parent`.
	pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> Result<()> {
		let (p, o, index) = self.child_position(parent, old)?;
		let n = self.detached_slot(new)?;
		if self.ancestor_slots(p).any(|a| a == n) {
			return Err(TreeError::CyclicInsert(new));
		}

		let prev_sibling = index.checked_sub(1).map(|i| self.id(self.nodes[p as usize].children[i]));
		self.record(
			p,
			ChildChange {
				kind: ChangeKind::Replaced,
				old: Some(old),
				new: Some(new),
				index,
				prev_sibling,
			},
		);

		self.nodes[p as usize].children[index] = n;
		self.nodes[o as usize].parent = None;
		self.nodes[n as usize].parent = Some(p);
		let (removed, added) = (self.nodes[o as usize].len, self.nodes[n as usize].len);
		self.adjust_len(p, removed, added);
		Ok(())
	}

	/// Replaces a leaf's text, recording a contents change under its parent.
	pub fn set_leaf_text(&mut self, leaf: NodeId, text: impl Into<String>) -> Result<()> {
		let slot = self.leaf_slot(leaf)?;
		if let Some(p) = self.nodes[slot as usize].parent {
			let index = self.index_in(p, slot);
			let prev_sibling = index.checked_sub(1).map(|i| self.id(self.nodes[p as usize].children[i]));
			self.record(
				p,
				ChildChange {
					kind: ChangeKind::ContentsChanged,
					old: Some(leaf),
					new: Some(leaf),
					index,
					prev_sibling,
				},
			);
		}
		self.store_leaf_text(slot, text.into());
		Ok(())
	}

	/// Replaces a leaf's text without recording anything.
	///
	/// Used to keep the tree in step with text edits already applied to the
	/// document.
	pub fn patch_leaf_text(&mut self, leaf: NodeId, text: impl Into<String>) -> Result<()> {
		let slot = self.leaf_slot(leaf)?;
		self.store_leaf_text(slot, text.into());
		Ok(())
	}

	/// Drains the changes recorded since the last call.
	pub fn take_changes(&mut self) -> TreeChangeEvent {
		std::mem::take(&mut self.pending)
	}

	/// Returns true if changes are waiting to be drained.
	pub fn has_pending_changes(&self) -> bool {
		!self.pending.is_empty()
	}

	/// Leaves whose closed range contains `range`, left to right.
	///
	/// An empty range at a leaf boundary yields both neighbours. Zero-length
	/// leaves at that boundary are included too.
	pub fn covering_leaves(&self, range: TextRange) -> SmallVec<[NodeId; 2]> {
		let mut out = SmallVec::new();
		if range.end > self.len() {
			return out;
		}
		let mut stack = vec![(self.root, 0usize)];
		while let Some((slot, start)) = stack.pop() {
			let data = &self.nodes[slot as usize];
			let node_range = TextRange::at(start, data.len);
			if !(node_range.start <= range.start && range.end <= node_range.end) {
				continue;
			}
			if data.text.is_some() {
				out.push(self.id(slot));
				continue;
			}
			let mut offset = start;
			let mut children = Vec::with_capacity(data.children.len());
			for &child in &data.children {
				children.push((child, offset));
				offset += self.nodes[child as usize].len;
			}
			stack.extend(children.into_iter().rev());
		}
		out
	}

	/// Pre-order iterator over the subtree rooted at `id`.
	pub fn preorder(&self, id: NodeId) -> Result<Preorder<'_>> {
		let slot = self.slot(id)?;
		Ok(Preorder {
			tree: self,
			stack: vec![slot],
		})
	}

	/// Allocates a composite over detached children the caller just built.
	pub(crate) fn alloc_composite(&mut self, kind: SyntaxKind, children: Vec<NodeId>) -> NodeId {
		let slots: Vec<u32> = children.iter().map(|c| c.index).collect();
		let len = slots.iter().map(|&s| self.nodes[s as usize].len).sum();
		let id = self.alloc(NodeData {
			kind,
			parent: None,
			children: slots.clone(),
			text: None,
			len,
		});
		for slot in slots {
			self.nodes[slot as usize].parent = Some(id.index);
		}
		id
	}

	/// Makes `children` the root's child list without recording changes.
	pub(crate) fn set_root_children(&mut self, children: Vec<NodeId>) {
		let root = self.root;
		let slots: Vec<u32> = children.iter().map(|c| c.index).collect();
		let len = slots.iter().map(|&s| self.nodes[s as usize].len).sum();
		for &slot in &slots {
			self.nodes[slot as usize].parent = Some(root);
		}
		let data = &mut self.nodes[root as usize];
		data.children = slots;
		data.len = len;
	}

	fn alloc(&mut self, data: NodeData) -> NodeId {
		let index = u32::try_from(self.nodes.len()).unwrap_or(u32::MAX);
		self.nodes.push(data);
		self.id(index)
	}

	fn id(&self, index: u32) -> NodeId {
		NodeId {
			generation: self.generation,
			index,
		}
	}

	fn slot(&self, id: NodeId) -> Result<u32> {
		if id.generation != self.generation || id.index as usize >= self.nodes.len() {
			return Err(TreeError::StaleNode(id));
		}
		Ok(id.index)
	}

	fn composite_slot(&self, id: NodeId) -> Result<u32> {
		let slot = self.slot(id)?;
		if self.nodes[slot as usize].text.is_some() {
			return Err(TreeError::LeafParent(id));
		}
		Ok(slot)
	}

	fn leaf_slot(&self, id: NodeId) -> Result<u32> {
		let slot = self.slot(id)?;
		if self.nodes[slot as usize].text.is_none() {
			return Err(TreeError::NotALeaf(id));
		}
		Ok(slot)
	}

	fn detached_slot(&self, id: NodeId) -> Result<u32> {
		let slot = self.slot(id)?;
		if self.nodes[slot as usize].parent.is_some() || slot == self.root {
			return Err(TreeError::AlreadyAttached(id));
		}
		Ok(slot)
	}

	fn child_position(&self, parent: NodeId, child: NodeId) -> Result<(u32, u32, usize)> {
		let p = self.composite_slot(parent)?;
		let c = self.slot(child)?;
		if self.nodes[c as usize].parent != Some(p) {
			return Err(TreeError::NotAChild { parent, child });
		}
		Ok((p, c, self.index_in(p, c)))
	}

	fn index_in(&self, parent: u32, child: u32) -> usize {
		self.nodes[parent as usize]
			.children
			.iter()
			.position(|&c| c == child)
			.unwrap_or(0)
	}

	/// `slot` and its ancestors, innermost first.
	fn ancestor_slots(&self, slot: u32) -> impl Iterator<Item = u32> + '_ {
		std::iter::successors(Some(slot), |&s| self.nodes[s as usize].parent)
	}

	fn is_attached_slot(&self, slot: u32) -> bool {
		self.ancestor_slots(slot).last() == Some(self.root)
	}

	fn record(&mut self, parent: u32, change: ChildChange) {
		if !self.is_attached_slot(parent) {
			return;
		}
		let id = self.id(parent);
		let generation = self.generation;
		let snapshot: SmallVec<[NodeId; 8]> = self.nodes[parent as usize]
			.children
			.iter()
			.map(|&index| NodeId { generation, index })
			.collect();
		self.pending.touch(id, || snapshot).children.push(change);
	}

	fn store_leaf_text(&mut self, slot: u32, text: String) {
		let new_len = text.chars().count();
		let data = &mut self.nodes[slot as usize];
		let old_len = data.len;
		let parent = data.parent;
		data.text = Some(text);
		data.len = new_len;
		if let Some(parent) = parent {
			self.adjust_len(parent, old_len, new_len);
		}
	}

	/// Applies a length change to `slot` and every ancestor.
	fn adjust_len(&mut self, slot: u32, removed: CharLen, added: CharLen) {
		let mut cursor = Some(slot);
		while let Some(s) = cursor {
			let data = &mut self.nodes[s as usize];
			data.len = data.len - removed + added;
			cursor = data.parent;
		}
	}
}

/// Borrowed view of one node.
#[derive(Clone, Copy)]
pub struct Node<'a> {
	tree: &'a SyntaxTree,
	index: u32,
}

impl fmt::Debug for Node<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}{}", self.kind(), self.text_range())
	}
}

impl PartialEq for Node<'_> {
	fn eq(&self, other: &Self) -> bool {
		std::ptr::eq(self.tree, other.tree) && self.index == other.index
	}
}

impl Eq for Node<'_> {}

impl<'a> Node<'a> {
	fn data(&self) -> &'a NodeData {
		&self.tree.nodes[self.index as usize]
	}

	fn at(&self, index: u32) -> Node<'a> {
		Node { tree: self.tree, index }
	}

	pub fn id(&self) -> NodeId {
		self.tree.id(self.index)
	}

	pub fn kind(&self) -> SyntaxKind {
		self.data().kind
	}

	pub fn is_leaf(&self) -> bool {
		self.data().text.is_some()
	}

	/// Text of a leaf, `None` for composites.
	pub fn leaf_text(&self) -> Option<&'a str> {
		self.data().text.as_deref()
	}

	pub fn text_len(&self) -> CharLen {
		self.data().len
	}

	pub fn parent(&self) -> Option<Node<'a>> {
		self.data().parent.map(|p| self.at(p))
	}

	pub fn children(self) -> impl DoubleEndedIterator<Item = Node<'a>> + 'a {
		let tree = self.tree;
		self.data().children.iter().map(move |&index| Node { tree, index })
	}

	pub fn child_count(&self) -> usize {
		self.data().children.len()
	}

	pub fn first_child(&self) -> Option<Node<'a>> {
		self.data().children.first().map(|&c| self.at(c))
	}

	pub fn last_child(&self) -> Option<Node<'a>> {
		self.data().children.last().map(|&c| self.at(c))
	}

	/// Position among the parent's children.
	pub fn index_in_parent(&self) -> Option<usize> {
		let parent = self.data().parent?;
		self.tree.nodes[parent as usize].children.iter().position(|&c| c == self.index)
	}

	pub fn prev_sibling(&self) -> Option<Node<'a>> {
		let parent = self.parent()?;
		let index = self.index_in_parent()?;
		index.checked_sub(1).map(|i| self.at(parent.data().children[i]))
	}

	pub fn next_sibling(&self) -> Option<Node<'a>> {
		let parent = self.parent()?;
		let index = self.index_in_parent()?;
		parent.data().children.get(index + 1).map(|&c| self.at(c))
	}

	/// This node and its ancestors, innermost first.
	pub fn ancestors(self) -> impl Iterator<Item = Node<'a>> + 'a {
		let tree = self.tree;
		tree.ancestor_slots(self.index).map(move |index| Node { tree, index })
	}

	/// Returns true if the node hangs off the tree root.
	pub fn is_attached(&self) -> bool {
		self.tree.is_attached_slot(self.index)
	}

	/// Deepest last descendant, or the node itself if it has no children.
	pub fn last_leaf(&self) -> Node<'a> {
		let mut node = *self;
		while let Some(child) = node.last_child() {
			node = child;
		}
		node
	}

	/// Offset of the node's first character, relative to the top of the
	/// subtree it is attached to.
	pub fn start(&self) -> CharIdx {
		let mut offset = 0;
		let mut node = *self;
		while let Some(parent) = node.parent() {
			offset += parent
				.data()
				.children
				.iter()
				.take_while(|&&c| c != node.index)
				.map(|&c| self.tree.nodes[c as usize].len)
				.sum::<CharLen>();
			node = parent;
		}
		offset
	}

	pub fn text_range(&self) -> TextRange {
		TextRange::at(self.start(), self.text_len())
	}

	/// Concatenated text of every leaf below this node.
	pub fn text(&self) -> String {
		let mut out = String::new();
		let mut stack = vec![self.index];
		while let Some(slot) = stack.pop() {
			let data = &self.tree.nodes[slot as usize];
			match &data.text {
				Some(text) => out.push_str(text),
				None => stack.extend(data.children.iter().rev()),
			}
		}
		out
	}

	/// Returns true if any node in this subtree satisfies `pred`.
	pub fn any_descendant(&self, mut pred: impl FnMut(Node<'a>) -> bool) -> bool {
		let mut stack = vec![self.index];
		while let Some(slot) = stack.pop() {
			let node = self.at(slot);
			if pred(node) {
				return true;
			}
			stack.extend(node.data().children.iter().rev());
		}
		false
	}
}

/// Pre-order traversal, see [`SyntaxTree::preorder`].
pub struct Preorder<'a> {
	tree: &'a SyntaxTree,
	stack: Vec<u32>,
}

impl<'a> Iterator for Preorder<'a> {
	type Item = Node<'a>;

	fn next(&mut self) -> Option<Self::Item> {
		let index = self.stack.pop()?;
		self.stack.extend(self.tree.nodes[index as usize].children.iter().rev());
		Some(Node { tree: self.tree, index })
	}
}
