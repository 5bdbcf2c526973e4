//! A tiny brace language and collaborators for exercising the scheduler.
//!
//! The language has words, `;`-terminated statements, `{ }` blocks, `//`
//! comments and `<% %>` foreign fragments. [`BraceFormatter`] indents every
//! editable line by its brace depth.

use parking_lot::Mutex;
use reflow_primitives::{TextRange, indent_runs};
use reflow_syntax::{NodeId, Parser, SyntaxTree, TreeBuilder};

use crate::error::{FormatError, Result};
use crate::file::FileView;
use crate::formatter::{DisabledIndentRanges, ExternalFormatter, FormatContext, FormatRanges, Formatter};

/// Node kinds of the brace language.
pub mod kinds {
	use reflow_syntax::SyntaxKind;

	pub const FILE: SyntaxKind = SyntaxKind::FILE;
	pub const WHITESPACE: SyntaxKind = SyntaxKind::WHITESPACE;
	pub const COMMENT: SyntaxKind = SyntaxKind::COMMENT;
	pub const ERROR: SyntaxKind = SyntaxKind::ERROR;
	pub const FOREIGN: SyntaxKind = SyntaxKind::FOREIGN;
	pub const STMT: SyntaxKind = SyntaxKind::composite("STMT");
	pub const BLOCK: SyntaxKind = SyntaxKind::composite("BLOCK");
	pub const WORD: SyntaxKind = SyntaxKind::token("WORD");
	pub const LBRACE: SyntaxKind = SyntaxKind::token("LBRACE");
	pub const RBRACE: SyntaxKind = SyntaxKind::token("RBRACE");
	pub const SEMI: SyntaxKind = SyntaxKind::token("SEMI");
}

use kinds::*;

/// Parser for the brace language.
///
/// A statement missing its `;` ends with an empty `ERROR` leaf, and a stray
/// `}` at file level is wrapped in an `ERROR` node.
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceParser;

impl Parser for BraceParser {
	fn parse(&self, text: &str) -> SyntaxTree {
		let mut parse = BraceParse {
			tokens: lex(text),
			pos: 0,
			builder: TreeBuilder::new(FILE),
		};
		parse.items(false);
		parse.builder.finish()
	}
}

fn lex(text: &str) -> Vec<(reflow_syntax::SyntaxKind, String)> {
	let chars: Vec<char> = text.chars().collect();
	let mut tokens = Vec::new();
	let mut i = 0;
	while i < chars.len() {
		let start = i;
		let kind = match chars[i] {
			c if c.is_whitespace() => {
				while i < chars.len() && chars[i].is_whitespace() {
					i += 1;
				}
				WHITESPACE
			}
			'/' if chars.get(i + 1) == Some(&'/') => {
				while i < chars.len() && chars[i] != '\n' {
					i += 1;
				}
				COMMENT
			}
			'<' if chars.get(i + 1) == Some(&'%') => {
				i += 2;
				while i < chars.len() && !(chars[i] == '>' && chars[i - 1] == '%' && i >= start + 3) {
					i += 1;
				}
				i = (i + 1).min(chars.len());
				FOREIGN
			}
			'{' => {
				i += 1;
				LBRACE
			}
			'}' => {
				i += 1;
				RBRACE
			}
			';' => {
				i += 1;
				SEMI
			}
			_ => {
				while i < chars.len() && !is_word_break(&chars, i) {
					i += 1;
				}
				WORD
			}
		};
		tokens.push((kind, chars[start..i].iter().collect()));
	}
	tokens
}

fn is_word_break(chars: &[char], i: usize) -> bool {
	let c = chars[i];
	c.is_whitespace()
		|| matches!(c, '{' | '}' | ';')
		|| (c == '/' && chars.get(i + 1) == Some(&'/'))
		|| (c == '<' && chars.get(i + 1) == Some(&'%'))
}

struct BraceParse {
	tokens: Vec<(reflow_syntax::SyntaxKind, String)>,
	pos: usize,
	builder: TreeBuilder,
}

impl BraceParse {
	fn peek(&self) -> Option<reflow_syntax::SyntaxKind> {
		self.tokens.get(self.pos).map(|(kind, _)| *kind)
	}

	fn bump(&mut self) {
		if let Some((kind, text)) = self.tokens.get(self.pos) {
			self.builder.token(*kind, text);
			self.pos += 1;
		}
	}

	/// Kind of the next token that is not trivia.
	fn peek_significant(&self) -> Option<reflow_syntax::SyntaxKind> {
		self.tokens[self.pos..]
			.iter()
			.map(|(kind, _)| *kind)
			.find(|kind| !kind.is_whitespace() && !kind.is_comment())
	}

	fn items(&mut self, in_block: bool) {
		while let Some(kind) = self.peek() {
			if kind.is_whitespace() || kind.is_comment() {
				self.bump();
			} else if kind == RBRACE {
				if in_block {
					return;
				}
				self.builder.start_node(ERROR);
				self.bump();
				self.builder.finish_node();
			} else {
				self.statement();
			}
		}
	}

	fn statement(&mut self) {
		self.builder.start_node(STMT);
		loop {
			match self.peek() {
				Some(SEMI) => {
					self.bump();
					break;
				}
				Some(LBRACE) => {
					self.block();
					break;
				}
				Some(kind) if kind.is_whitespace() || kind.is_comment() => {
					if matches!(self.peek_significant(), Some(k) if k != RBRACE) {
						self.bump();
					} else {
						self.builder.token(ERROR, "");
						break;
					}
				}
				Some(RBRACE) | None => {
					self.builder.token(ERROR, "");
					break;
				}
				Some(_) => self.bump(),
			}
		}
		self.builder.finish_node();
	}

	fn block(&mut self) {
		self.builder.start_node(BLOCK);
		self.bump();
		self.items(true);
		if self.peek() == Some(RBRACE) {
			self.bump();
		}
		self.builder.finish_node();
	}
}

/// Indents every editable line by its brace depth.
///
/// Records each call so tests can inspect what the scheduler asked for.
#[derive(Debug, Default)]
pub struct BraceFormatter {
	calls: Mutex<Vec<(FormatRanges, FormatContext)>>,
}

impl BraceFormatter {
	pub fn new() -> Self {
		Self::default()
	}

	/// Ranges and context of every call so far.
	pub fn calls(&self) -> Vec<(FormatRanges, FormatContext)> {
		self.calls.lock().clone()
	}
}

impl Formatter for BraceFormatter {
	fn format(&self, file: &mut FileView, ranges: &FormatRanges, ctx: &FormatContext) -> Result<()> {
		self.calls.lock().push((ranges.clone(), *ctx));

		let text = file.text();
		let chars: Vec<char> = text.chars().collect();
		let mut edits = Vec::new();
		for run in indent_runs(&text, 0) {
			if !ranges.allows_whitespace_edit(run) {
				continue;
			}
			let mut depth = chars[..run.end].iter().fold(0usize, |depth, &c| match c {
				'{' => depth + 1,
				'}' => depth.saturating_sub(1),
				_ => depth,
			});
			if chars.get(run.end) == Some(&'}') {
				depth = depth.saturating_sub(1);
			}
			let wanted = ctx.indent.fill(ctx.indent.levels(depth));
			let current: String = chars[run.start..run.end].iter().collect();
			if current != wanted {
				edits.push((run, wanted));
			}
		}

		for (run, wanted) in edits.into_iter().rev() {
			file.replace_text(run, &wanted)?;
		}
		Ok(())
	}
}

/// Formatter that always fails.
#[derive(Debug, Default)]
pub struct FailingFormatter;

impl Formatter for FailingFormatter {
	fn format(&self, _file: &mut FileView, _ranges: &FormatRanges, _ctx: &FormatContext) -> Result<()> {
		Err(FormatError::Engine {
			message: "formatter exploded".into(),
		})
	}
}

/// External formatter wrapping a [`BraceFormatter`], applying to files whose
/// text starts with a marker.
#[derive(Debug)]
pub struct MarkerExternalFormatter {
	pub marker: &'static str,
	pub inner: BraceFormatter,
}

impl MarkerExternalFormatter {
	pub fn new(marker: &'static str) -> Self {
		Self {
			marker,
			inner: BraceFormatter::new(),
		}
	}
}

impl Formatter for MarkerExternalFormatter {
	fn format(&self, file: &mut FileView, ranges: &FormatRanges, ctx: &FormatContext) -> Result<()> {
		self.inner.format(file, ranges, ctx)
	}
}

impl ExternalFormatter for MarkerExternalFormatter {
	fn applies_to(&self, file: &FileView) -> bool {
		file.text().starts_with(self.marker)
	}
}

/// Disables reindentation inside fixed ranges and records the nodes it was
/// asked about.
#[derive(Debug, Default)]
pub struct FixedDisabledRanges {
	ranges: Vec<TextRange>,
	queried: Mutex<Vec<NodeId>>,
}

impl FixedDisabledRanges {
	pub fn new(ranges: Vec<TextRange>) -> Self {
		Self {
			ranges,
			queried: Mutex::new(Vec::new()),
		}
	}

	pub fn queried(&self) -> Vec<NodeId> {
		self.queried.lock().clone()
	}
}

impl DisabledIndentRanges for FixedDisabledRanges {
	fn disabled_ranges(&self, file: &FileView, node: NodeId) -> Vec<TextRange> {
		self.queried.lock().push(node);
		let Ok(node) = file.tree().node(node) else {
			return Vec::new();
		};
		let range = node.text_range();
		self.ranges.iter().copied().filter(|r| r.overlaps(&range)).collect()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn shape(tree: &SyntaxTree) -> Vec<String> {
		tree.preorder(tree.root())
			.unwrap()
			.map(|n| match n.leaf_text() {
				Some(text) => format!("{}:{text:?}", n.kind()),
				None => n.kind().to_string(),
			})
			.collect()
	}

	#[test]
	fn test_parse_round_trips_text() {
		let text = "fn main {\n    let x;  // note\n    <% raw %>\n}\n}";
		let tree = BraceParser.parse(text);
		assert_eq!(tree.text(), text);
	}

	#[test]
	fn test_parse_shape() {
		let tree = BraceParser.parse("a {\n  b;\n}\n");
		assert_eq!(
			shape(&tree),
			vec![
				"FILE",
				"STMT",
				"WORD:\"a\"",
				"WHITESPACE:\" \"",
				"BLOCK",
				"LBRACE:\"{\"",
				"WHITESPACE:\"\\n  \"",
				"STMT",
				"WORD:\"b\"",
				"SEMI:\";\"",
				"WHITESPACE:\"\\n\"",
				"RBRACE:\"}\"",
				"WHITESPACE:\"\\n\"",
			]
		);
	}

	#[test]
	fn test_unterminated_statement_ends_in_empty_error() {
		let tree = BraceParser.parse("{ b }");
		let kinds = shape(&tree);
		assert!(kinds.contains(&"ERROR:\"\"".to_string()));
		assert_eq!(tree.text(), "{ b }");
	}

	#[test]
	fn test_stray_close_brace_is_error() {
		let tree = BraceParser.parse("a; }");
		assert_eq!(
			shape(&tree),
			vec!["FILE", "STMT", "WORD:\"a\"", "SEMI:\";\"", "WHITESPACE:\" \"", "ERROR", "RBRACE:\"}\""]
		);
	}

	#[test]
	fn test_formatter_indents_by_depth() {
		let mut file = FileView::new("a {\nb {\nc;\n}\n}", std::sync::Arc::new(BraceParser));
		let mut ranges = FormatRanges::new();
		ranges.push(TextRange::new(0, file.document().len_chars()), false);
		let ctx = FormatContext {
			indent: Default::default(),
			format_doc_comments: false,
		};
		BraceFormatter::new().format(&mut file, &ranges, &ctx).unwrap();
		assert_eq!(file.text(), "a {\n    b {\n        c;\n    }\n}");
		assert_eq!(file.tree().text(), file.text());
	}
}
