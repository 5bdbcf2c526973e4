//! Common utilities for scheduler integration tests.

use std::sync::Arc;

use reflow_format::test_helpers::{BraceFormatter, BraceParser, kinds};
use reflow_format::{FileView, FormatConfig, Formatter, Result, Scheduler, TreeEdit};
use reflow_primitives::DocumentId;
use reflow_syntax::NodeId;

/// A scheduler with one open brace-language document.
pub struct Harness {
	pub scheduler: Scheduler,
	pub doc: DocumentId,
	pub formatter: Arc<BraceFormatter>,
}

impl Harness {
	pub fn new(text: &str) -> Self {
		Self::with_config(FormatConfig::default(), text)
	}

	pub fn with_config(config: FormatConfig, text: &str) -> Self {
		let _ = tracing_subscriber::fmt::try_init();
		let formatter = Arc::new(BraceFormatter::new());
		let mut scheduler = Scheduler::new(config, formatter.clone());
		let doc = scheduler.open(file(text));
		Self { scheduler, doc, formatter }
	}

	pub fn file(&self) -> &FileView {
		self.scheduler.file(self.doc).expect("document is open")
	}

	pub fn text(&self) -> String {
		self.file().text()
	}
}

pub fn file(text: &str) -> FileView {
	FileView::new(text, Arc::new(BraceParser))
}

/// A scheduler over `text` formatting with `formatter`.
pub fn scheduler_with(formatter: Arc<dyn Formatter>, text: &str) -> (Scheduler, DocumentId) {
	let _ = tracing_subscriber::fmt::try_init();
	let mut scheduler = Scheduler::new(FormatConfig::default(), formatter);
	let doc = scheduler.open(file(text));
	(scheduler, doc)
}

/// Top-level statement `index` among the root's statements.
pub fn statement(edit: &TreeEdit<'_>, index: usize) -> NodeId {
	edit.tree()
		.root_node()
		.children()
		.filter(|n| n.kind() == kinds::STMT)
		.nth(index)
		.expect("statement exists")
		.id()
}

/// Block ending `stmt`.
pub fn block_of(edit: &TreeEdit<'_>, stmt: NodeId) -> NodeId {
	let block = edit.tree().node(stmt).expect("live node").last_child().expect("non-empty statement");
	assert_eq!(block.kind(), kinds::BLOCK);
	block.id()
}

/// Inserts generated `word;` plus a leading newline right after the opening
/// brace of `block`.
pub fn insert_generated(edit: &mut TreeEdit<'_>, block: NodeId, word: &str) -> Result<NodeId> {
	let word = edit.new_leaf(kinds::WORD, word);
	let semi = edit.new_leaf(kinds::SEMI, ";");
	let stmt = edit.new_composite(kinds::STMT, &[word, semi])?;
	let newline = edit.new_leaf(kinds::WHITESPACE, "\n");
	edit.insert_child(block, 1, stmt)?;
	edit.insert_child(block, 1, newline)?;
	Ok(stmt)
}

/// Copies `source` plus a leading newline right after the opening brace of
/// `block`.
pub fn insert_copy(edit: &mut TreeEdit<'_>, block: NodeId, source: NodeId) -> Result<NodeId> {
	let copy = edit.copy_subtree(source)?;
	let newline = edit.new_leaf(kinds::WHITESPACE, "\n");
	edit.insert_child(block, 1, copy)?;
	edit.insert_child(block, 1, newline)?;
	Ok(copy)
}
