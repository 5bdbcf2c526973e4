//! Task normalization.
//!
//! Drains a [`TaskSet`] rightmost-end first and folds it into two ordered,
//! disjoint lists: free-form reformat ranges and reindent ranges. Every text
//! offset a pass uses is frozen here, before the executor applies anything,
//! so applying the right-hand ranges first never moves an unprocessed one.

use reflow_primitives::{Document, SpanId, TextRange};
use tracing::trace;

use crate::error::Result;
use crate::formatter::FormatRanges;
use crate::task::{PostponedTask, ResolvedTask, TaskKind, TaskSet};


/// Output of one normalization pass, each list left to right.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Normalized {
	pub free_formatting: Vec<ResolvedTask>,
	pub reindent: Vec<ResolvedTask>,
}

impl Normalized {
	pub fn is_empty(&self) -> bool {
		self.free_formatting.is_empty() && self.reindent.is_empty()
	}

	fn push(&mut self, task: ResolvedTask) {
		trace!(range = %task.range, kind = ?task.kind(), "task finalized");
		if task.kind().is_reindent() {
			self.reindent.push(task);
		} else {
			self.free_formatting.push(task);
		}
	}

	/// Builds the executor's actions.
	///
	/// Free-form ranges are snapshotted into one [`FormatRanges`] with context
	/// extension on, and their spans are released. Reindent spans stay live so
	/// the executor can re-read them after the reformat pass.
	pub fn into_actions(self, doc: &mut Document) -> Actions {
		let reformat = if self.free_formatting.is_empty() {
			None
		} else {
			let mut ranges = FormatRanges::new();
			ranges.set_extend_to_context(true);
			for task in &self.free_formatting {
				ranges.push(task.range, task.kind().with_leading_whitespace());
				doc.dispose_span(task.task.span);
			}
			Some(ranges)
		};

		let entries: Vec<ReindentEntry> = self
			.reindent
			.iter()
			.filter_map(|task| match task.kind() {
				TaskKind::Reindent { old_indent } => Some(ReindentEntry {
					span: task.task.span,
					old_indent,
				}),
				_ => None,
			})
			.collect();
		let reindent = (!entries.is_empty()).then_some(ReindentAction { entries });

		Actions { reformat, reindent }
	}
}

/// One reindent range, tracked until it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReindentEntry {
	pub span: SpanId,
	pub old_indent: usize,
}

/// Reindent ranges of one pass, left to right.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReindentAction {
	pub entries: Vec<ReindentEntry>,
}

impl ReindentAction {
	pub fn dispose(&self, doc: &mut Document) {
		for entry in &self.entries {
			doc.dispose_span(entry.span);
		}
	}
}

/// What the executor runs for one pass, reformat first.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Actions {
	pub reformat: Option<FormatRanges>,
	pub reindent: Option<ReindentAction>,
}

impl Actions {
	/// Releases every span the actions still hold.
	pub fn dispose(&self, doc: &mut Document) {
		if let Some(reindent) = &self.reindent {
			reindent.dispose(doc);
		}
	}
}

/// Runs one normalization pass over `tasks`.
///
/// Free-form tasks overlapped by a reindent accumulator are left in `tasks`
/// for the next pass; everything else is consumed. Spans superseded by a merge
/// or split, and reindents nested in another reindent, are disposed.
pub fn normalize(tasks: &mut TaskSet, doc: &mut Document) -> Result<Normalized> {
	let mut out = Normalized::default();
	let mut deferred: Vec<PostponedTask> = Vec::new();
	let mut acc: Option<ResolvedTask> = None;

	while let Some(cur) = tasks.pop_first() {
		let Some(a) = acc else {
			acc = Some(cur);
			continue;
		};

		if a.start() > cur.end() || (a.start() == cur.end() && !a.can_stick_to(&cur)) {
			out.push(a);
			acc = Some(cur);
		} else if a.kind().is_free_form() && cur.kind().is_reindent() {
			acc = Some(split(tasks, doc, &mut out, a, cur)?);
		} else if a.kind().is_free_form() {
			acc = Some(merge(doc, a, cur)?);
		} else if cur.kind().is_reindent() {
			trace!(range = %cur.range, outer = %a.range, "nested reindent dropped");
			doc.dispose_span(cur.task.span);
		} else {
			trace!(range = %cur.range, outer = %a.range, "reformat under reindent deferred");
			deferred.push(cur.task);
		}
	}
	if let Some(a) = acc {
		out.push(a);
	}

	for task in deferred {
		tasks.insert(doc, task);
	}

	out.free_formatting.reverse();
	out.reindent.reverse();
	Ok(out)
}

/// Cuts the reindent range `cur` out of free-form `a`.
///
/// The part of `a` left of `cur` goes back into the set with `a`'s kind; the
/// part right of it is finalized as a leading-whitespace reformat. Returns the
/// new accumulator.
///
/// Both free-form kinds are split, including leading-whitespace reformats, so
/// no reformat range ever overlaps a reindent range.
fn split(tasks: &mut TaskSet, doc: &mut Document, out: &mut Normalized, a: ResolvedTask, cur: ResolvedTask) -> Result<ResolvedTask> {
	if a.start() < cur.start() {
		tasks.create(doc, TextRange::new(a.start(), cur.start()), a.kind())?;
	}
	let trailing = TextRange::new(cur.end(), a.end());
	let span = doc.create_span(trailing)?;
	out.push(ResolvedTask {
		range: trailing,
		task: PostponedTask {
			span,
			kind: TaskKind::ReformatWithLeadingWhitespace,
		},
	});
	doc.dispose_span(a.task.span);
	trace!(range = %a.range, reindent = %cur.range, "reformat split around reindent");
	Ok(cur)
}

/// Folds two free-form tasks into one over their union.
///
/// The result reformats leading whitespace exactly when an input starting at
/// the union's start does, whichever of the two was accumulated first.
fn merge(doc: &mut Document, a: ResolvedTask, cur: ResolvedTask) -> Result<ResolvedTask> {
	let range = a.range.union(&cur.range);
	let leads = |t: &ResolvedTask| t.start() == range.start && t.kind().with_leading_whitespace();
	let kind = if leads(&a) || leads(&cur) {
		TaskKind::ReformatWithLeadingWhitespace
	} else {
		TaskKind::Reformat
	};

	let span = if a.range == range {
		a.task.span
	} else if cur.range == range {
		cur.task.span
	} else {
		doc.create_span(range)?
	};
	for input in [a, cur] {
		if input.task.span != span {
			doc.dispose_span(input.task.span);
		}
	}

	trace!(%range, ?kind, "tasks merged");
	Ok(ResolvedTask {
		range,
		task: PostponedTask { span, kind },
	})
}
