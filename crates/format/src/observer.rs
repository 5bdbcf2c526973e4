//! Classifies tree change batches into queued nodes and structural hazards.
//!
//! Nothing here touches text. A batch either queues nodes on the document's
//! [`DocumentContext`], flags the file for a full reparse, or records a parent
//! whose edge child vanished so the tree shape can be rechecked after the run.

use reflow_syntax::{ChangeKind, ChildChange, Node, NodeId, SyntaxTree, TreeChange, TreeChangeEvent};
use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

use crate::config::FormatConfig;
use crate::error::{FormatError, Result};
use crate::registry::DocumentContext;

/// Records one change batch against `ctx`.
///
/// The caller decides whether recording is enabled at all.
pub fn record(tree: &SyntaxTree, ctx: &mut DocumentContext, event: &TreeChangeEvent, config: &FormatConfig, cancel: &CancellationToken) -> Result<()> {
	ctx.mark_updated();
	for change in event.changes() {
		for child in &change.children {
			record_child(tree, ctx, change, child, config, cancel)?;
		}
	}
	ctx.retain_attached(tree);
	Ok(())
}

fn record_child(
	tree: &SyntaxTree,
	ctx: &mut DocumentContext,
	change: &TreeChange,
	child: &ChildChange,
	config: &FormatConfig,
	cancel: &CancellationToken,
) -> Result<()> {
	let Some(affected) = child.affected().and_then(|id| tree.node(id).ok()) else {
		trace!(parent = %change.parent, "change on a node from an older tree ignored");
		return Ok(());
	};

	if might_break_text_consistency(tree, change, child, affected) {
		trace!(node = %affected.id(), "change may break tree/text consistency, reparse pending");
		ctx.set_reparse_pending();
	} else if leaves_empty_range_at_edge(tree, change, child) && tree.node(change.parent).is_ok_and(has_raiseable_edge_child) {
		trace!(parent = %change.parent, "raise candidate recorded");
		ctx.add_raise_candidate(change.parent);
	}

	if !affected.is_attached() {
		trace!(node = %affected.id(), "change on a node that left the tree ignored");
		return Ok(());
	}
	match child.kind {
		ChangeKind::Added | ChangeKind::Replaced => queue(ctx, affected, config),
		ChangeKind::ContentsChanged if !ctx.marks.is_generated(affected.id()) => {
			queue_generated_descendants(ctx, affected, config, cancel)?;
		}
		ChangeKind::ContentsChanged | ChangeKind::Removed => {}
	}
	Ok(())
}

fn queue(ctx: &mut DocumentContext, node: Node<'_>, config: &FormatConfig) {
	let id = node.id();
	if !ctx.marks.is_generated(id) && !node.kind().is_whitespace() && ctx.marks.old_indent(id).is_none() {
		error!(node = %id, kind = %node.kind(), text = %node.text(), "non-generated node queued without old indentation");
	}
	ctx.queue(id, config.capture_originator);
}

/// Queues the first generated node on every branch below `root`.
fn queue_generated_descendants(ctx: &mut DocumentContext, root: Node<'_>, config: &FormatConfig, cancel: &CancellationToken) -> Result<()> {
	let mut stack = vec![root];
	while let Some(node) = stack.pop() {
		if cancel.is_cancelled() {
			return Err(FormatError::Cancelled);
		}
		if ctx.marks.is_generated(node.id()) {
			ctx.queue(node.id(), config.capture_originator);
			continue;
		}
		stack.extend(node.children().rev());
	}
	Ok(())
}

fn might_break_text_consistency(tree: &SyntaxTree, change: &TreeChange, child: &ChildChange, affected: Node<'_>) -> bool {
	affected.any_descendant(|n| n.kind().is_foreign()) || is_right_after_error(tree, change, child, affected)
}

/// Node visited before `node` when walking the text backwards: the last leaf
/// of the previous sibling, or the parent.
fn prev_node(node: Node<'_>) -> Option<Node<'_>> {
	match node.prev_sibling() {
		Some(prev) => Some(prev.last_leaf()),
		None => node.parent(),
	}
}

/// Returns true if only whitespace and empty nodes separate the change from
/// an error node before it.
fn is_right_after_error(tree: &SyntaxTree, change: &TreeChange, child: &ChildChange, affected: Node<'_>) -> bool {
	let start = if affected.is_attached() {
		prev_node(affected)
	} else {
		// a removed node: continue from where it used to be
		match child.prev_sibling.and_then(|id| tree.node(id).ok()).filter(|n| n.is_attached()) {
			Some(prev) => Some(prev.last_leaf()),
			None => tree.node(change.parent).ok(),
		}
	};
	std::iter::successors(start, |&n| prev_node(n))
		.take_while(|n| n.kind().is_whitespace() || n.text_len() == 0)
		.any(|n| n.kind().is_error())
}

/// The change removed, or emptied, what used to be the first or last child.
fn leaves_empty_range_at_edge(tree: &SyntaxTree, change: &TreeChange, child: &ChildChange) -> bool {
	let new_is_empty = match child.new {
		None => true,
		Some(id) => tree.node(id).is_ok_and(|n| n.text_len() == 0),
	};
	new_is_empty && change.was_edge_child(child.old)
}

/// Returns true if, ignoring empty children, `node` has no children or starts
/// or ends with whitespace or a comment.
pub(crate) fn has_raiseable_edge_child(node: Node<'_>) -> bool {
	let first = node.children().find(|n| n.text_len() > 0);
	let last = node.children().rev().find(|n| n.text_len() > 0);
	match (first, last) {
		(Some(first), Some(last)) => first.kind().is_raiseable() || last.kind().is_raiseable(),
		_ => true,
	}
}

/// Raise candidates that still have a raiseable edge after the run.
pub(crate) fn raise_candidates_needing_reparse(tree: &SyntaxTree, candidates: &[NodeId]) -> usize {
	candidates
		.iter()
		.filter_map(|&id| tree.node(id).ok())
		.filter(|node| node.is_attached() && has_raiseable_edge_child(*node))
		.count()
}
