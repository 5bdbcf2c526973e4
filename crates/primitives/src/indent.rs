//! Indentation arithmetic.
//!
//! Widths are measured in columns: a space advances one column and a tab
//! advances to the next multiple of [`IndentOptions::tab_size`].

use crate::range::{CharIdx, TextRange};

/// How indentation is measured and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndentOptions {
	/// Columns per indentation level.
	pub indent_size: usize,
	/// Columns a tab character advances to.
	pub tab_size: usize,
	/// Whether [`fill`](Self::fill) emits tabs for whole tab stops.
	pub use_tabs: bool,
}

impl Default for IndentOptions {
	fn default() -> Self {
		Self {
			indent_size: 4,
			tab_size: 4,
			use_tabs: false,
		}
	}
}

impl IndentOptions {
	/// Returns the column width of a whitespace prefix.
	///
	/// Stops at the first character that is neither a space nor a tab.
	pub fn width(&self, indent: &str) -> usize {
		let tab = self.tab_size.max(1);
		indent
			.chars()
			.take_while(|c| matches!(c, ' ' | '\t'))
			.fold(0, |col, c| if c == '\t' { (col / tab + 1) * tab } else { col + 1 })
	}

	/// Builds the whitespace string for an indent of `width` columns.
	pub fn fill(&self, width: usize) -> String {
		if self.use_tabs && self.tab_size > 0 {
			let mut out = "\t".repeat(width / self.tab_size);
			out.push_str(&" ".repeat(width % self.tab_size));
			out
		} else {
			" ".repeat(width)
		}
	}

	/// Column width of `levels` indentation levels.
	pub fn levels(&self, levels: usize) -> usize {
		levels * self.indent_size
	}
}

/// Returns true for the characters that make up an indentation run.
#[inline]
pub fn is_indent_char(c: char) -> bool {
	c == ' ' || c == '\t'
}

/// Finds every indentation run that follows a line break inside `text`.
///
/// `base` is the document offset of `text[0]`; returned ranges are document
/// offsets covering only the spaces and tabs (not the line break). Runs on
/// blank lines, and a trailing run with nothing after it, are skipped.
pub fn indent_runs(text: &str, base: CharIdx) -> Vec<TextRange> {
	let chars: Vec<char> = text.chars().collect();
	let mut runs = Vec::new();
	let mut i = 0;
	while i < chars.len() {
		if chars[i] != '\n' {
			i += 1;
			continue;
		}
		let start = i + 1;
		let mut end = start;
		while end < chars.len() && is_indent_char(chars[end]) {
			end += 1;
		}
		let has_content = end < chars.len() && chars[end] != '\n' && chars[end] != '\r';
		if has_content {
			runs.push(TextRange::new(base + start, base + end));
		}
		i = end;
	}
	runs
}
