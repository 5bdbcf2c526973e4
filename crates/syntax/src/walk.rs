//! Enter/leave traversal.

use crate::error::Result;
use crate::tree::{Node, NodeId, SyntaxTree};

/// What the walker should do after [`Visitor::enter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitControl {
	/// Descend into the children.
	Continue,
	/// Do not descend, but still call [`Visitor::leave`] for this node.
	SkipChildren,
	/// Abort the whole walk. No further callbacks run.
	Stop,
}

/// Callbacks for [`walk`].
pub trait Visitor {
	fn enter(&mut self, node: Node<'_>) -> VisitControl;

	fn leave(&mut self, _node: Node<'_>) {}
}

/// Walks the subtree under `root` depth first.
///
/// Returns `Ok(false)` if a visitor stopped the walk early.
pub fn walk<V: Visitor + ?Sized>(tree: &SyntaxTree, root: NodeId, visitor: &mut V) -> Result<bool> {
	enum Step<'a> {
		Enter(Node<'a>),
		Leave(Node<'a>),
	}

	let mut stack = vec![Step::Enter(tree.node(root)?)];
	while let Some(step) = stack.pop() {
		match step {
			Step::Enter(node) => match visitor.enter(node) {
				VisitControl::Stop => return Ok(false),
				VisitControl::SkipChildren => visitor.leave(node),
				VisitControl::Continue => {
					stack.push(Step::Leave(node));
					stack.extend(node.children().rev().map(Step::Enter));
				}
			},
			Step::Leave(node) => visitor.leave(node),
		}
	}
	Ok(true)
}
