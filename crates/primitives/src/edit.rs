use crate::range::{CharIdx, CharLen, TextRange};

/// Bias determines how positions at edit boundaries are mapped.
///
/// When mapping a position through an edit, bias determines whether the position
/// moves with insertions or stays before them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
	/// Position stays before insertions at the same location.
	Left,
	/// Position moves after insertions at the same location.
	Right,
}

/// A single text replacement: `[start, end)` becomes `replacement_len` characters.
///
/// Only the shape of the edit is stored; the inserted text itself lives in the
/// rope once applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
	/// The starting character index of the replaced text.
	pub start: CharIdx,
	/// The ending character index of the replaced text (exclusive).
	pub end: CharIdx,
	/// Character length of the inserted text.
	pub replacement_len: CharLen,
}

impl Edit {
	/// Creates an edit replacing `range` with `replacement_len` characters.
	pub fn new(range: TextRange, replacement_len: CharLen) -> Self {
		Self {
			start: range.start,
			end: range.end,
			replacement_len,
		}
	}

	/// Returns the range removed from the old text.
	pub fn old_range(&self) -> TextRange {
		TextRange::new(self.start, self.end)
	}

	/// Returns true if nothing is removed.
	pub fn is_insertion(&self) -> bool {
		self.start == self.end
	}

	/// Returns the end of the inserted text in the new coordinates.
	pub fn new_end(&self) -> CharIdx {
		self.start + self.replacement_len
	}

	/// Maps a position through this edit using the specified bias.
	///
	/// Positions before the edit are unchanged, positions after it shift by the
	/// length delta. A position inside the removed text collapses to the start
	/// of the replacement (`Left`) or to its end (`Right`). The old end of a
	/// replacement maps to the new end regardless of bias.
	pub fn map_pos(&self, pos: CharIdx, bias: Bias) -> CharIdx {
		if pos < self.start {
			return pos;
		}
		if pos > self.end || (pos == self.end && !self.is_insertion()) {
			return pos - (self.end - self.start) + self.replacement_len;
		}
		if pos == self.start && !self.is_insertion() {
			return self.start;
		}
		match bias {
			Bias::Left => self.start,
			Bias::Right => self.new_end(),
		}
	}

	/// Returns true if this edit removes every character of `range`
	/// without replacing exactly that text.
	pub fn swallows(&self, range: TextRange) -> bool {
		if range.is_empty() || self.is_insertion() {
			return false;
		}
		let covered = self.start <= range.start && range.end <= self.end;
		let exact = self.start == range.start && self.end == range.end;
		covered && !(exact && self.replacement_len > 0)
	}
}
