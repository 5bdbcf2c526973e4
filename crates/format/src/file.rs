//! Documents paired with their syntax trees.

use std::sync::Arc;

use reflow_primitives::{Document, DocumentId, TextRange};
use reflow_syntax::{NodeId, Parser, SyntaxTree};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{FormatError, Result};

/// A document, its current tree, and the parser that rebuilds the tree.
///
/// The tree always spells out the document text. Text edits patch a single
/// leaf when they can and fall back to a full reparse otherwise.
pub struct FileView {
	document: Document,
	tree: SyntaxTree,
	parser: Arc<dyn Parser>,
}

impl std::fmt::Debug for FileView {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FileView")
			.field("document", &self.document.id())
			.field("version", &self.document.version())
			.field("generation", &self.tree.generation())
			.finish_non_exhaustive()
	}
}

impl FileView {
	/// Parses `text` into a new file.
	pub fn new(text: &str, parser: Arc<dyn Parser>) -> Self {
		let tree = parser.parse(text);
		debug_assert_eq!(tree.len(), text.chars().count(), "parser dropped text");
		Self {
			document: Document::new(text),
			tree,
			parser,
		}
	}

	pub fn id(&self) -> DocumentId {
		self.document.id()
	}

	pub fn document(&self) -> &Document {
		&self.document
	}

	pub fn tree(&self) -> &SyntaxTree {
		&self.tree
	}

	pub fn text(&self) -> String {
		self.document.text()
	}

	pub(crate) fn document_mut(&mut self) -> &mut Document {
		&mut self.document
	}

	pub(crate) fn parts_mut(&mut self) -> (&mut SyntaxTree, &mut Document) {
		(&mut self.tree, &mut self.document)
	}

	/// Replaces `range` with `text` and brings the tree up to date.
	///
	/// Whitespace-only edits go into a whitespace leaf when one touches the
	/// range; other text may only land in a non-whitespace leaf. Edits that
	/// fit neither rule trigger [`reparse_from_text`](Self::reparse_from_text).
	pub fn replace_text(&mut self, range: TextRange, text: &str) -> Result<()> {
		let target = self.patch_target(range, text);
		self.document.replace(range, text)?;

		let Some(leaf) = target else {
			debug!(document = ?self.id(), %range, "edit spans leaves, reparsing");
			self.reparse_from_text();
			return Ok(());
		};

		let node = self.tree.node(leaf)?;
		let start = node.start();
		let old = node.leaf_text().unwrap_or_default();
		let mut patched: String = old.chars().take(range.start - start).collect();
		patched.push_str(text);
		patched.extend(old.chars().skip(range.end - start));
		self.tree.patch_leaf_text(leaf, patched)?;
		Ok(())
	}

	/// Rebuilds the tree from the document text. Node ids from the previous
	/// tree become stale.
	pub fn reparse_from_text(&mut self) {
		self.tree = self.parser.parse(&self.document.text());
	}

	fn patch_target(&self, range: TextRange, text: &str) -> Option<NodeId> {
		let candidates = self.tree.covering_leaves(range);
		let whitespace = text.chars().all(char::is_whitespace);
		let kind_of = |id: NodeId| self.tree.node(id).ok().map(|n| n.kind());

		let ws_leaf = candidates
			.iter()
			.copied()
			.find(|&id| kind_of(id).is_some_and(|k| k.is_whitespace()));
		let token_leaf = candidates
			.iter()
			.copied()
			.find(|&id| kind_of(id).is_some_and(|k| !k.is_whitespace() && !k.is_error() && !k.is_foreign()));

		if text.is_empty() {
			ws_leaf.or(token_leaf)
		} else if whitespace {
			ws_leaf
		} else {
			token_leaf.filter(|_| !text.chars().any(char::is_whitespace))
		}
	}
}

/// Open files keyed by document id.
#[derive(Debug, Default)]
pub struct Files {
	views: FxHashMap<DocumentId, FileView>,
}

impl Files {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, file: FileView) -> DocumentId {
		let id = file.id();
		self.views.insert(id, file);
		id
	}

	pub fn get(&self, id: DocumentId) -> Option<&FileView> {
		self.views.get(&id)
	}

	pub fn get_mut(&mut self, id: DocumentId) -> Option<&mut FileView> {
		self.views.get_mut(&id)
	}

	/// Like [`get_mut`](Self::get_mut) but reports an unknown id as an error.
	pub fn require_mut(&mut self, id: DocumentId) -> Result<&mut FileView> {
		self.views.get_mut(&id).ok_or(FormatError::UnknownDocument(id))
	}

	pub fn require(&self, id: DocumentId) -> Result<&FileView> {
		self.views.get(&id).ok_or(FormatError::UnknownDocument(id))
	}

	pub fn remove(&mut self, id: DocumentId) -> Option<FileView> {
		self.views.remove(&id)
	}

	pub fn len(&self) -> usize {
		self.views.len()
	}

	pub fn is_empty(&self) -> bool {
		self.views.is_empty()
	}
}
