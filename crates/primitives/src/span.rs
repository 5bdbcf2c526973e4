//! Tracked spans that follow the text they cover.
//!
//! A [`SpanTable`] owns every live span of a document. Each text edit is
//! pushed through [`SpanTable::apply_edit`], which remaps the affected spans.
//! Spans are indexed by their end offset, so an edit only visits spans whose
//! end lies at or after the edit start; everything to the left is untouched.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::edit::{Bias, Edit};
use crate::range::{CharIdx, TextRange};


/// Handle to a tracked span.
///
/// Ids are never reused within a table, so a disposed id stays dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanId(pub u64);

#[derive(Debug, Clone, Copy)]
struct SpanEntry {
	range: TextRange,
	valid: bool,
}

/// Live span storage for one document.
#[derive(Debug, Default)]
pub struct SpanTable {
	entries: FxHashMap<SpanId, SpanEntry>,
	/// `(end, id)` for every valid span.
	by_end: BTreeSet<(CharIdx, SpanId)>,
	next_id: u64,
}

impl SpanTable {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts tracking `range`. The caller is responsible for bounds checks.
	pub fn insert(&mut self, range: TextRange) -> SpanId {
		let id = SpanId(self.next_id);
		self.next_id += 1;
		self.entries.insert(id, SpanEntry { range, valid: true });
		self.by_end.insert((range.end, id));
		id
	}

	/// Returns the current range of a span, or `None` if it was invalidated
	/// by an edit or disposed.
	pub fn get(&self, id: SpanId) -> Option<TextRange> {
		self.entries.get(&id).filter(|e| e.valid).map(|e| e.range)
	}

	/// Returns true if the span has not been disposed (it may still be invalid).
	pub fn contains(&self, id: SpanId) -> bool {
		self.entries.contains_key(&id)
	}

	/// Stops tracking a span. Returns false if it was already gone.
	pub fn remove(&mut self, id: SpanId) -> bool {
		let Some(entry) = self.entries.remove(&id) else {
			return false;
		};
		if entry.valid {
			self.by_end.remove(&(entry.range.end, id));
		}
		true
	}

	/// Number of spans not yet disposed, valid or not.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if no spans are tracked.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Remaps every span affected by `edit`.
	///
	/// Non-empty spans are not extended by insertions at either boundary: the
	/// start moves right with text inserted at it and the end stays before text
	/// inserted at it. Empty spans follow text inserted at their offset. A span
	/// whose text is entirely removed becomes invalid.
	pub fn apply_edit(&mut self, edit: &Edit) {
		let affected: Vec<(CharIdx, SpanId)> = self.by_end.range((edit.start, SpanId(0))..).copied().collect();

		for key in affected {
			self.by_end.remove(&key);
			let id = key.1;
			let Some(entry) = self.entries.get_mut(&id) else {
				continue;
			};

			let old = entry.range;
			if edit.swallows(old) {
				entry.valid = false;
				continue;
			}

			let (start, end) = if old.is_empty() {
				let pos = edit.map_pos(old.start, Bias::Right);
				(pos, pos)
			} else {
				let end = edit.map_pos(old.end, Bias::Left);
				let start = edit.map_pos(old.start, Bias::Right).min(end);
				(start, end)
			};

			entry.range = TextRange::new(start, end);
			self.by_end.insert((end, id));
		}
	}
}
