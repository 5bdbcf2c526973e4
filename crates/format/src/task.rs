//! Postponed tasks and the ordered set they wait in.
//!
//! A task is a tracked span plus what to do with it. The set orders tasks by
//! their live range: descending end, then empty ranges first, then ascending
//! start. Two tasks over the same range cannot coexist; the one inserted
//! first wins.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use reflow_primitives::{CharIdx, Document, SpanId, TextRange};
use tracing::trace;

use crate::error::Result;

/// What a task does with its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
	/// Let the formatter lay out the range.
	Reformat,
	/// Like [`Reformat`](Self::Reformat), and also the whitespace in front.
	ReformatWithLeadingWhitespace,
	/// Shift existing indentation so the range lines up with its new position.
	Reindent {
		/// Indentation width the range had where it came from.
		old_indent: usize,
	},
}

impl TaskKind {
	pub fn is_reindent(&self) -> bool {
		matches!(self, Self::Reindent { .. })
	}

	/// Reformat of either flavor.
	pub fn is_free_form(&self) -> bool {
		!self.is_reindent()
	}

	pub fn with_leading_whitespace(&self) -> bool {
		matches!(self, Self::ReformatWithLeadingWhitespace)
	}
}

/// A tracked span and the work to do on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostponedTask {
	pub span: SpanId,
	pub kind: TaskKind,
}

/// A task together with the range its span covered when it was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTask {
	pub range: TextRange,
	pub task: PostponedTask,
}

impl ResolvedTask {
	pub fn start(&self) -> CharIdx {
		self.range.start
	}

	pub fn end(&self) -> CharIdx {
		self.range.end
	}

	pub fn kind(&self) -> TaskKind {
		self.task.kind
	}

	/// An empty leading-whitespace task never joins a neighbour it only
	/// touches, and neither does a reindent.
	pub fn can_stick_to(&self, next: &ResolvedTask) -> bool {
		let empty_marker = |t: &ResolvedTask| t.kind().with_leading_whitespace() && t.range.is_empty();
		!empty_marker(next) && !empty_marker(self) && !self.kind().is_reindent()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct TaskKey {
	end: Reverse<CharIdx>,
	non_empty: bool,
	start: CharIdx,
}

impl TaskKey {
	fn of(range: TextRange) -> Self {
		Self {
			end: Reverse(range.end),
			non_empty: !range.is_empty(),
			start: range.start,
		}
	}
}

/// Tasks waiting to be normalized, in extraction order.
#[derive(Debug, Default)]
pub struct TaskSet {
	tasks: BTreeMap<TaskKey, PostponedTask>,
}

impl TaskSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.tasks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tasks.is_empty()
	}

	/// Adds `task`, keyed by its span's current range.
	///
	/// Returns false, and disposes the task's span, if the span is no longer
	/// valid or another task already covers the same range.
	pub fn insert(&mut self, doc: &mut Document, task: PostponedTask) -> bool {
		let Some(range) = doc.span_range(task.span) else {
			doc.dispose_span(task.span);
			return false;
		};
		let key = TaskKey::of(range);
		if self.tasks.contains_key(&key) {
			trace!(%range, kind = ?task.kind, "duplicate task range dropped");
			doc.dispose_span(task.span);
			return false;
		}
		self.tasks.insert(key, task);
		true
	}

	/// Creates a span over `range` and inserts a task of `kind` on it.
	pub fn create(&mut self, doc: &mut Document, range: TextRange, kind: TaskKind) -> Result<bool> {
		let span = doc.create_span(range)?;
		Ok(self.insert(doc, PostponedTask { span, kind }))
	}

	/// Removes and returns the first task in extraction order.
	pub fn pop_first(&mut self) -> Option<ResolvedTask> {
		let (key, task) = self.tasks.pop_first()?;
		Some(ResolvedTask {
			range: TextRange::new(key.start, key.end.0),
			task,
		})
	}

	/// Tasks in extraction order, without removing them.
	pub fn iter(&self) -> impl Iterator<Item = ResolvedTask> + '_ {
		self.tasks.iter().map(|(key, &task)| ResolvedTask {
			range: TextRange::new(key.start, key.end.0),
			task,
		})
	}

	/// Re-keys every task from its span's live range after the text changed.
	pub fn refresh(&mut self, doc: &mut Document) {
		let tasks: Vec<PostponedTask> = std::mem::take(&mut self.tasks).into_values().collect();
		for task in tasks {
			self.insert(doc, task);
		}
	}

	/// Disposes every remaining span and empties the set.
	pub fn dispose_all(&mut self, doc: &mut Document) {
		let count = self.tasks.len();
		for task in std::mem::take(&mut self.tasks).into_values() {
			doc.dispose_span(task.span);
		}
		if count > 0 {
			trace!(count, "disposed leftover task spans");
		}
	}
}
