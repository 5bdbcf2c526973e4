use thiserror::Error;

use crate::tree::NodeId;

/// Errors raised by tree navigation and mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
	#[error("node {0} does not belong to this tree generation")]
	StaleNode(NodeId),

	#[error("node {0} is not attached to a parent")]
	NotAttached(NodeId),

	#[error("node {0} already has a parent")]
	AlreadyAttached(NodeId),

	#[error("node {child} is not a child of {parent}")]
	NotAChild { parent: NodeId, child: NodeId },

	#[error("leaf {0} cannot have children")]
	LeafParent(NodeId),

	#[error("child index {index} out of bounds for {parent} with {len} children")]
	IndexOutOfBounds { parent: NodeId, index: usize, len: usize },

	#[error("inserting {0} would make it its own ancestor")]
	CyclicInsert(NodeId),

	#[error("node {0} is not a leaf")]
	NotALeaf(NodeId),
}

pub type Result<T> = std::result::Result<T, TreeError>;
