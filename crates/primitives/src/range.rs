use std::fmt;

/// A position in the text, measured in characters (not bytes).
///
/// This is the canonical coordinate space for documents and spans.
pub type CharIdx = usize;

/// A length or count in the text, measured in characters (not bytes).
///
/// This is distinct from CharIdx to avoid accidentally passing an index
/// where a length is expected or vice versa.
pub type CharLen = usize;

/// A half-open `[start, end)` interval over document text.
///
/// Unlike a selection range there is no direction: `start <= end` always holds
/// for ranges built through [`TextRange::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextRange {
	/// Inclusive start offset.
	pub start: CharIdx,
	/// Exclusive end offset.
	pub end: CharIdx,
}

impl TextRange {
	/// Creates a new range.
	///
	/// # Panics
	///
	/// Panics in debug builds if `start > end`.
	#[inline]
	pub fn new(start: CharIdx, end: CharIdx) -> Self {
		debug_assert!(start <= end, "inverted range {start}..{end}");
		Self { start, end }
	}

	/// Creates an empty range at `pos`.
	#[inline]
	pub fn empty(pos: CharIdx) -> Self {
		Self::new(pos, pos)
	}

	/// Creates a range from a start offset and a length.
	#[inline]
	pub fn at(start: CharIdx, len: CharLen) -> Self {
		Self::new(start, start + len)
	}

	/// Returns the length of the range in characters.
	#[inline]
	pub fn len(&self) -> CharLen {
		self.end - self.start
	}

	/// Returns true if the range covers no characters.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.start == self.end
	}

	/// Returns true if `pos` lies inside the range (exclusive of `end`).
	#[inline]
	pub fn contains(&self, pos: CharIdx) -> bool {
		pos >= self.start && pos < self.end
	}

	/// Returns true if `other` lies entirely inside this range.
	#[inline]
	pub fn contains_range(&self, other: &TextRange) -> bool {
		self.start <= other.start && other.end <= self.end
	}

	/// Returns true if the two ranges share at least one character.
	pub fn overlaps(&self, other: &TextRange) -> bool {
		self.start < other.end && other.start < self.end
	}

	/// Returns true if the ranges overlap or touch at an endpoint.
	pub fn intersects(&self, other: &TextRange) -> bool {
		self.start <= other.end && other.start <= self.end
	}

	/// Smallest range covering both inputs.
	pub fn union(&self, other: &TextRange) -> Self {
		Self::new(self.start.min(other.start), self.end.max(other.end))
	}

	/// Overlapping part of the two ranges, if any.
	pub fn intersection(&self, other: &TextRange) -> Option<Self> {
		let start = self.start.max(other.start);
		let end = self.end.min(other.end);
		(start <= end).then(|| Self::new(start, end))
	}

	/// Shifts both endpoints right by `delta`.
	pub fn shift(self, delta: CharLen) -> Self {
		Self::new(self.start + delta, self.end + delta)
	}

	/// Clamps both endpoints to `[0, max]`.
	pub fn clamp(&self, max: CharIdx) -> Self {
		Self::new(self.start.min(max), self.end.min(max))
	}

	/// Returns the parts of this range not covered by any of `excluded`.
	///
	/// Empty leftovers are dropped. The result is ordered left to right.
	pub fn exclude(&self, excluded: &[TextRange]) -> Vec<TextRange> {
		let mut holes: Vec<TextRange> = excluded.iter().filter(|r| r.overlaps(self)).copied().collect();
		holes.sort_by_key(|r| r.start);

		let mut result = Vec::new();
		let mut cursor = self.start;
		for hole in holes {
			if hole.start > cursor {
				result.push(TextRange::new(cursor, hole.start.min(self.end)));
			}
			cursor = cursor.max(hole.end);
			if cursor >= self.end {
				break;
			}
		}
		if cursor < self.end {
			result.push(TextRange::new(cursor, self.end));
		}
		result
	}
}

impl fmt::Display for TextRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}..{})", self.start, self.end)
	}
}

impl From<std::ops::Range<CharIdx>> for TextRange {
	fn from(range: std::ops::Range<CharIdx>) -> Self {
		Self::new(range.start, range.end)
	}
}
