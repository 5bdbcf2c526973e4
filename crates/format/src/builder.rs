//! Turns queued nodes and reformat markers into tasks.

use std::sync::Arc;

use reflow_primitives::TextRange;
use reflow_syntax::{Node, NodeId, VisitControl, Visitor, walk};
use rustc_hash::FxHashSet;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::error::{FormatError, Result};
use crate::file::FileView;
use crate::formatter::DisabledIndentRanges;
use crate::registry::NodeMarks;
use crate::task::{TaskKind, TaskSet};

/// Adds the tasks for one document to `tasks`.
///
/// Reformat markers are scanned first over the whole tree, then every queued
/// node is walked in recording order. Consumed generated flags, old indents
/// and markers are cleared from `marks`. Spans are only created once every
/// walk has finished, so a cancelled build leaves nothing to release.
pub fn build_tasks(
	file: &mut FileView,
	marks: &mut NodeMarks,
	pending: &[NodeId],
	disabled: &[Arc<dyn DisabledIndentRanges>],
	cancel: &CancellationToken,
	tasks: &mut TaskSet,
) -> Result<()> {
	let mut planned = Vec::new();
	if marks.has_reformat_markers() {
		collect_markers(file, marks, cancel, &mut planned)?;
	}
	collect_regions(file, marks, pending, disabled, cancel, &mut planned)?;

	let doc = file.document_mut();
	for (range, kind) in planned {
		tasks.create(doc, range, kind)?;
	}
	trace!(document = ?file.id(), tasks = tasks.len(), "tasks built");
	Ok(())
}

fn collect_markers(file: &FileView, marks: &mut NodeMarks, cancel: &CancellationToken, planned: &mut Vec<(TextRange, TaskKind)>) -> Result<()> {
	let tree = file.tree();
	for node in tree.preorder(tree.root())? {
		if cancel.is_cancelled() {
			return Err(FormatError::Cancelled);
		}
		let range = match marks.take_reformat_markers(node.id()) {
			(true, _) => TextRange::empty(node.start()),
			(false, true) => node.text_range(),
			(false, false) => continue,
		};
		planned.push((range, TaskKind::ReformatWithLeadingWhitespace));
	}
	Ok(())
}

fn collect_regions(
	file: &FileView,
	marks: &mut NodeMarks,
	pending: &[NodeId],
	disabled: &[Arc<dyn DisabledIndentRanges>],
	cancel: &CancellationToken,
	planned: &mut Vec<(TextRange, TaskKind)>,
) -> Result<()> {
	let tree = file.tree();
	let mut unvisited: FxHashSet<NodeId> = pending.iter().copied().collect();

	for &id in pending {
		unvisited.remove(&id);
		let Ok(node) = tree.node(id) else {
			trace!(node = %id, "queued node from an older tree skipped");
			continue;
		};
		if !node.is_attached() {
			trace!(node = %id, "queued node no longer attached");
			continue;
		}

		let in_region = !marks.is_generated(id);
		let mut visitor = RegionVisitor {
			file,
			marks: &mut *marks,
			unvisited: &unvisited,
			disabled,
			cancel,
			in_region,
			saved: Vec::new(),
			planned: &mut *planned,
		};
		if !walk(tree, id, &mut visitor)? {
			return Err(FormatError::Cancelled);
		}
	}
	Ok(())
}

/// Emits a reformat over each outermost generated node and a reindent over
/// the first significant node after a generated run.
struct RegionVisitor<'a> {
	file: &'a FileView,
	marks: &'a mut NodeMarks,
	/// Queued nodes whose own turn has not come yet.
	unvisited: &'a FxHashSet<NodeId>,
	disabled: &'a [Arc<dyn DisabledIndentRanges>],
	cancel: &'a CancellationToken,
	in_region: bool,
	saved: Vec<bool>,
	planned: &'a mut Vec<(TextRange, TaskKind)>,
}

impl RegionVisitor<'_> {
	fn enabled_ranges(&self, node: Node<'_>) -> Vec<TextRange> {
		let disabled: Vec<TextRange> = self
			.disabled
			.iter()
			.flat_map(|provider| provider.disabled_ranges(self.file, node.id()))
			.collect();
		node.text_range().exclude(&disabled)
	}
}

impl Visitor for RegionVisitor<'_> {
	fn enter(&mut self, node: Node<'_>) -> VisitControl {
		if self.cancel.is_cancelled() {
			return VisitControl::Stop;
		}
		self.saved.push(self.in_region);

		let id = node.id();
		if self.unvisited.contains(&id) {
			return VisitControl::SkipChildren;
		}

		let generated = self.marks.take_generated(id);
		if generated && !self.in_region {
			self.planned.push((node.text_range(), TaskKind::Reformat));
			self.in_region = true;
		}
		if !generated && self.in_region {
			if node.kind().is_whitespace() {
				return VisitControl::SkipChildren;
			}
			let old_indent = self.marks.take_old_indent(id).unwrap_or_else(|| {
				warn!(node = %id, kind = %node.kind(), "old indentation missing for a non-generated node, assuming 0");
				0
			});
			for range in self.enabled_ranges(node) {
				self.planned.push((range, TaskKind::Reindent { old_indent }));
			}
			self.in_region = false;
		}
		VisitControl::Continue
	}

	fn leave(&mut self, _node: Node<'_>) {
		if let Some(in_region) = self.saved.pop() {
			self.in_region = in_region;
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::test_helpers::{BraceParser, FixedDisabledRanges, kinds};

	fn file(text: &str) -> FileView {
		FileView::new(text, Arc::new(BraceParser))
	}

	fn shape(tasks: &TaskSet) -> Vec<(TextRange, TaskKind)> {
		let mut out: Vec<_> = tasks.iter().map(|t| (t.range, t.kind())).collect();
		out.sort_by_key(|(r, _)| (r.start, r.end));
		out
	}

	fn build(file: &mut FileView, marks: &mut NodeMarks, pending: &[NodeId]) -> TaskSet {
		let mut tasks = TaskSet::new();
		build_tasks(file, marks, pending, &[], &CancellationToken::new(), &mut tasks).unwrap();
		tasks
	}

	/// Root children of `file`, left to right.
	fn top(file: &FileView) -> Vec<NodeId> {
		file.tree().root_node().children().map(|n| n.id()).collect()
	}

	#[test]
	fn test_generated_node_becomes_reformat() {
		let mut file = file("a;\nb;\n");
		let stmt = top(&file)[2];
		let mut marks = NodeMarks::default();
		marks.set_generated(stmt, true);

		let tasks = build(&mut file, &mut marks, &[stmt]);
		assert_eq!(shape(&tasks), vec![(TextRange::new(3, 5), TaskKind::Reformat)]);
		assert!(!marks.is_generated(stmt));
	}

	#[test]
	fn test_moved_node_becomes_reindent() {
		let mut file = file("a;\n  b;\n");
		let stmt = top(&file)[2];
		let mut marks = NodeMarks::default();
		marks.set_old_indent(stmt, Some(8));

		let tasks = build(&mut file, &mut marks, &[stmt]);
		assert_eq!(shape(&tasks), vec![(TextRange::new(5, 7), TaskKind::Reindent { old_indent: 8 })]);
		assert_eq!(marks.old_indent(stmt), None);
	}

	#[test]
	fn test_missing_old_indent_defaults_to_zero() {
		let mut file = file("a;\nb;\n");
		let stmt = top(&file)[2];
		let mut marks = NodeMarks::default();

		let tasks = build(&mut file, &mut marks, &[stmt]);
		assert_eq!(shape(&tasks), vec![(TextRange::new(3, 5), TaskKind::Reindent { old_indent: 0 })]);
	}

	fn mark_generated(file: &FileView, marks: &mut NodeMarks, root: NodeId, except: Option<NodeId>) {
		let tree = file.tree();
		let excluded: Vec<NodeId> = match except {
			Some(id) => tree.preorder(id).unwrap().map(|n| n.id()).collect(),
			None => Vec::new(),
		};
		for node in tree.preorder(root).unwrap() {
			if !excluded.contains(&node.id()) {
				marks.set_generated(node.id(), true);
			}
		}
	}

	#[test]
	fn test_non_generated_child_of_generated_node_is_reindented() {
		let mut file = file("x {\n    y;\n}");
		let stmt = top(&file)[0];
		let block = file.tree().node(stmt).unwrap().last_child().unwrap();
		let inner = block.children().find(|n| n.kind() == kinds::STMT).unwrap().id();

		let mut marks = NodeMarks::default();
		mark_generated(&file, &mut marks, stmt, Some(inner));
		marks.set_old_indent(inner, Some(0));

		let tasks = build(&mut file, &mut marks, &[stmt]);
		assert_eq!(
			shape(&tasks),
			vec![
				(TextRange::new(0, 12), TaskKind::Reformat),
				(TextRange::new(8, 10), TaskKind::Reindent { old_indent: 0 }),
			]
		);
		assert!(file.tree().preorder(stmt).unwrap().all(|n| !marks.is_generated(n.id())));
	}

	#[test]
	fn test_queued_descendant_is_left_for_its_own_turn() {
		let mut file = file("x {\n    y;\n}");
		let stmt = top(&file)[0];
		let block = file.tree().node(stmt).unwrap().last_child().unwrap().id();
		let mut marks = NodeMarks::default();
		mark_generated(&file, &mut marks, stmt, None);

		let tasks = build(&mut file, &mut marks, &[stmt, block]);
		// the block is skipped inside the statement's walk, then opens its own
		// region on its turn
		assert_eq!(
			shape(&tasks),
			vec![
				(TextRange::new(0, 12), TaskKind::Reformat),
				(TextRange::new(2, 12), TaskKind::Reformat),
			]
		);
	}

	#[test]
	fn test_markers_take_precedence_and_are_cleared() {
		let mut file = file("a;\nb;\n");
		let ids = top(&file);
		let mut marks = NodeMarks::default();
		marks.mark_reformat_before(ids[2]);
		marks.mark_reformat(ids[2]);
		marks.mark_reformat(ids[0]);

		let tasks = build(&mut file, &mut marks, &[]);
		assert_eq!(
			shape(&tasks),
			vec![
				(TextRange::new(0, 2), TaskKind::ReformatWithLeadingWhitespace),
				(TextRange::empty(3), TaskKind::ReformatWithLeadingWhitespace),
			]
		);
		assert!(!marks.has_reformat_markers());
	}

	#[test]
	fn test_disabled_ranges_are_excluded_from_reindent() {
		let mut file = file("a;\nlong statement here;\n");
		let stmt = top(&file)[2];
		let provider = Arc::new(FixedDisabledRanges::new(vec![TextRange::new(8, 17)]));
		let disabled: Vec<Arc<dyn DisabledIndentRanges>> = vec![provider.clone()];
		let mut marks = NodeMarks::default();
		marks.set_old_indent(stmt, Some(4));

		let mut tasks = TaskSet::new();
		build_tasks(&mut file, &mut marks, &[stmt], &disabled, &CancellationToken::new(), &mut tasks).unwrap();
		assert_eq!(
			shape(&tasks),
			vec![
				(TextRange::new(3, 8), TaskKind::Reindent { old_indent: 4 }),
				(TextRange::new(17, 23), TaskKind::Reindent { old_indent: 4 }),
			]
		);
		assert_eq!(provider.queried(), vec![stmt]);
	}

	#[test]
	fn test_stale_and_detached_nodes_are_ignored() {
		let mut file = file("a;\n");
		let stale = top(&file)[0];
		file.reparse_from_text();
		let mut marks = NodeMarks::default();
		marks.set_generated(stale, true);

		let tasks = build(&mut file, &mut marks, &[stale]);
		assert!(tasks.is_empty());
		assert_eq!(file.document().live_span_count(), 0);
	}

	#[test]
	fn test_cancelled_build_creates_no_spans() {
		let mut file = file("a;\nb;\n");
		let stmt = top(&file)[2];
		let mut marks = NodeMarks::default();
		marks.set_generated(stmt, true);
		let cancel = CancellationToken::new();
		cancel.cancel();

		let mut tasks = TaskSet::new();
		let err = build_tasks(&mut file, &mut marks, &[stmt], &[], &cancel, &mut tasks).unwrap_err();
		assert!(matches!(err, FormatError::Cancelled));
		assert!(tasks.is_empty());
		assert_eq!(file.document().live_span_count(), 0);
	}
}
