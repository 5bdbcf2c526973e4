//! The postponed formatting scheduler.
//!
//! [`Scheduler`] owns the open files and the per-document contexts. Tree
//! edits go through [`Scheduler::edit`], which feeds each batch to the
//! observer; formatting runs when the outermost
//! [`postpone_formatting_inside`](Scheduler::postpone_formatting_inside) scope
//! closes.
//!
//! The nesting counters live on the scheduler itself, so one scheduler serves
//! one logical operation thread.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use reflow_primitives::{DocumentId, IndentOptions, TextRange};
use reflow_syntax::{Node, NodeId, SyntaxKind, SyntaxTree, TreeChangeEvent, TreeError};
use rustc_hash::FxHashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::FormatConfig;
use crate::error::{FormatError, Result};
use crate::executor::{PipelineEnv, run_pipeline};
use crate::file::{FileView, Files};
use crate::formatter::{DisabledIndentRanges, ExternalFormatter, Formatter};
use crate::lock::{ReentrantWriteLock, WriteAccess};
use crate::observer;
use crate::registry::{DocumentContext, NodeMarks};


#[derive(Debug, Default)]
struct SchedulerState {
	postponed_depth: usize,
	disabled_depth: usize,
	contexts: FxHashMap<DocumentId, DocumentContext>,
}

/// Records tree edits and formats them once the enclosing operation ends.
pub struct Scheduler {
	config: FormatConfig,
	formatter: Arc<dyn Formatter>,
	external: Vec<Arc<dyn ExternalFormatter>>,
	disabled_ranges: Vec<Arc<dyn DisabledIndentRanges>>,
	lock: Arc<dyn WriteAccess>,
	cancel: CancellationToken,
	files: Files,
	state: SchedulerState,
}

impl std::fmt::Debug for Scheduler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Scheduler")
			.field("config", &self.config)
			.field("files", &self.files.len())
			.field("state", &self.state)
			.finish_non_exhaustive()
	}
}

impl Scheduler {
	pub fn new(config: FormatConfig, formatter: Arc<dyn Formatter>) -> Self {
		Self {
			config,
			formatter,
			external: Vec::new(),
			disabled_ranges: Vec::new(),
			lock: Arc::new(ReentrantWriteLock::new()),
			cancel: CancellationToken::new(),
			files: Files::new(),
			state: SchedulerState::default(),
		}
	}

	/// Adds a formatter that takes over for the files it applies to.
	pub fn with_external_formatter(mut self, formatter: Arc<dyn ExternalFormatter>) -> Self {
		self.external.push(formatter);
		self
	}

	/// Adds a provider of ranges reindentation must leave alone.
	pub fn with_disabled_ranges(mut self, provider: Arc<dyn DisabledIndentRanges>) -> Self {
		self.disabled_ranges.push(provider);
		self
	}

	pub fn with_write_lock(mut self, lock: Arc<dyn WriteAccess>) -> Self {
		self.lock = lock;
		self
	}

	pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
		self.cancel = cancel;
		self
	}

	pub fn config(&self) -> &FormatConfig {
		&self.config
	}

	pub fn open(&mut self, file: FileView) -> DocumentId {
		self.files.insert(file)
	}

	pub fn file(&self, doc: DocumentId) -> Option<&FileView> {
		self.files.get(doc)
	}

	/// Closes `doc`, dropping whatever was still postponed for it.
	pub fn close(&mut self, doc: DocumentId) -> Option<FileView> {
		if self.state.contexts.remove(&doc).is_some_and(|ctx| ctx.has_pending()) {
			warn!(document = ?doc, "closing document with postponed formatting");
		}
		self.files.remove(doc)
	}

	/// Context recorded for `doc` since its last run, if any.
	pub fn context(&self, doc: DocumentId) -> Option<&DocumentContext> {
		self.state.contexts.get(&doc)
	}

	pub fn postponed_depth(&self) -> usize {
		self.state.postponed_depth
	}

	pub fn is_disabled(&self) -> bool {
		self.state.disabled_depth > 0
	}

	/// Applies one atomic batch of tree edits to `doc`.
	///
	/// The batch is handed to the observer even when `f` fails, since the
	/// edits made before the failure are already in the tree.
	pub fn edit<T>(&mut self, doc: DocumentId, f: impl FnOnce(&mut TreeEdit<'_>) -> Result<T>) -> Result<T> {
		let file = self.files.require_mut(doc)?;
		let marks = &mut self.state.contexts.entry(doc).or_default().marks;
		let mut edit = TreeEdit {
			file,
			marks,
			indent: self.config.indent,
		};
		let result = f(&mut edit);
		let event = edit.file.parts_mut().0.take_changes();

		let recorded = self.on_tree_change(doc, &event);
		let value = result?;
		recorded?;
		Ok(value)
	}

	/// Feeds a change batch for `doc` to the observer.
	///
	/// Ignored while disabled, and outside postpone scopes unless
	/// [`FormatConfig::record_outside_postpone`] is set. A cancelled scan
	/// drops everything recorded for the document.
	pub fn on_tree_change(&mut self, doc: DocumentId, event: &TreeChangeEvent) -> Result<()> {
		if event.is_empty() || self.is_disabled() {
			return Ok(());
		}
		if self.state.postponed_depth == 0 && !self.config.record_outside_postpone {
			return Ok(());
		}

		let file = self.files.require(doc)?;
		let ctx = self.state.contexts.entry(doc).or_default();
		match observer::record(file.tree(), ctx, event, &self.config, &self.cancel) {
			Err(FormatError::Cancelled) => {
				debug!(document = ?doc, "recording cancelled, dropping document context");
				self.state.contexts.remove(&doc);
				Err(FormatError::Cancelled)
			}
			other => other,
		}
	}

	/// Runs `f` with formatting postponed until the outermost scope closes.
	///
	/// When the depth returns to zero every document with recorded changes is
	/// formatted, under the write lock. An error from `f` takes precedence over
	/// one from formatting.
	pub fn postpone_formatting_inside<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
		let mut scope = Scope::enter(self, postponed_depth);
		let result = f(&mut *scope);
		drop(scope);
		if self.state.postponed_depth > 0 {
			return result;
		}

		let formatted = self.format_with_lock();
		let value = result?;
		formatted?;
		Ok(value)
	}

	/// Runs `f` with recording and execution switched off.
	pub fn disable_postponed_formatting_inside<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
		let mut scope = Scope::enter(self, disabled_depth);
		f(&mut *scope)
	}

	/// Runs `f` under the write lock inside a postpone scope.
	pub fn write_action<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
		let lock = Arc::clone(&self.lock);
		let mut f = Some(f);
		let mut out = None;
		lock.run_exclusive(&mut || {
			if let Some(f) = f.take() {
				out = Some(self.postpone_formatting_inside(f));
			}
		});
		out.unwrap_or(Err(FormatError::Cancelled))
	}

	fn format_with_lock(&mut self) -> Result<()> {
		if self.state.contexts.is_empty() {
			return Ok(());
		}
		if self.lock.is_held() {
			return self.do_postponed_formatting(None);
		}

		let lock = Arc::clone(&self.lock);
		let mut out = None;
		lock.run_exclusive(&mut || out = Some(self.do_postponed_formatting(None)));
		out.unwrap_or(Err(FormatError::Cancelled))
	}

	/// Formats `doc`, or every document with recorded changes.
	///
	/// Each document's context is dropped once its run ends, whether or not
	/// the run succeeds. With several documents, failures are logged and the
	/// first one is returned after all of them ran.
	pub fn do_postponed_formatting(&mut self, doc: Option<DocumentId>) -> Result<()> {
		if self.is_disabled() {
			return Ok(());
		}

		let docs = match doc {
			Some(id) => vec![id],
			None => {
				let mut ids: Vec<DocumentId> = self.state.contexts.keys().copied().collect();
				ids.sort_unstable();
				ids
			}
		};

		let mut first_error = None;
		for id in docs {
			if let Err(err) = self.format_document(id) {
				error!(document = ?id, error = %err, "postponed formatting failed");
				first_error.get_or_insert(err);
			}
		}
		first_error.map_or(Ok(()), Err)
	}

	fn format_document(&mut self, id: DocumentId) -> Result<()> {
		let Some(mut ctx) = self.state.contexts.remove(&id) else {
			return Ok(());
		};
		if !ctx.is_updated() && !ctx.marks.has_reformat_markers() {
			return Ok(());
		}
		let Some(file) = self.files.get_mut(id) else {
			warn!(document = ?id, "document closed before its postponed formatting ran");
			return Ok(());
		};

		let env = PipelineEnv {
			formatter: self.formatter.as_ref(),
			external: &self.external,
			disabled: &self.disabled_ranges,
			indent: self.config.indent,
			cancel: &self.cancel,
		};
		let disabled = Depth::enter(&mut self.state.disabled_depth);
		let result = run_pipeline(file, &mut ctx, &env);
		drop(disabled);

		if result.is_ok() && ctx.has_pending() {
			error!(
				document = ?id,
				pending = %ctx.dump_pending(file.tree()),
				"nodes left unprocessed after postponed formatting"
			);
		}
		result
	}

	/// Returns true if `doc` has queued nodes, still in its tree, waiting to be
	/// formatted.
	pub fn is_locked(&self, doc: DocumentId) -> bool {
		self.locking_context(doc).is_some()
	}

	fn locking_context(&self, doc: DocumentId) -> Option<(&DocumentContext, &FileView)> {
		let ctx = self.state.contexts.get(&doc)?;
		let file = self.files.get(doc)?;
		ctx.has_attached_pending(file.tree()).then_some((ctx, file))
	}

	/// Fails with [`FormatError::DocumentLocked`] while `doc` has queued nodes.
	pub fn assert_safe_to_edit_directly(&self, doc: DocumentId) -> Result<()> {
		let Some((ctx, file)) = self.locking_context(doc) else {
			return Ok(());
		};
		Err(FormatError::DocumentLocked {
			unprocessed: ctx.dump_pending(file.tree()),
			originator: ctx.originator().cloned(),
		})
	}

	/// Replaces text without going through the tree.
	pub fn edit_text_directly(&mut self, doc: DocumentId, range: TextRange, text: &str) -> Result<()> {
		self.assert_safe_to_edit_directly(doc)?;
		self.files.require_mut(doc)?.replace_text(range, text)
	}
}

/// Holds one level of a nesting counter, released on drop.
struct Depth<'a>(&'a mut usize);

impl<'a> Depth<'a> {
	fn enter(depth: &'a mut usize) -> Self {
		*depth += 1;
		Self(depth)
	}
}

impl Drop for Depth<'_> {
	fn drop(&mut self) {
		release(self.0);
	}
}

/// A [`Depth`] that also lends out the scheduler it counts on.
struct Scope<'a> {
	scheduler: &'a mut Scheduler,
	depth: fn(&mut SchedulerState) -> &mut usize,
}

impl<'a> Scope<'a> {
	fn enter(scheduler: &'a mut Scheduler, depth: fn(&mut SchedulerState) -> &mut usize) -> Self {
		*depth(&mut scheduler.state) += 1;
		Self { scheduler, depth }
	}
}

impl Deref for Scope<'_> {
	type Target = Scheduler;

	fn deref(&self) -> &Scheduler {
		self.scheduler
	}
}

impl DerefMut for Scope<'_> {
	fn deref_mut(&mut self) -> &mut Scheduler {
		self.scheduler
	}
}

impl Drop for Scope<'_> {
	fn drop(&mut self) {
		release((self.depth)(&mut self.scheduler.state));
	}
}

fn postponed_depth(state: &mut SchedulerState) -> &mut usize {
	&mut state.postponed_depth
}

fn disabled_depth(state: &mut SchedulerState) -> &mut usize {
	&mut state.disabled_depth
}

fn release(depth: &mut usize) {
	match depth.checked_sub(1) {
		Some(next) => *depth = next,
		None => error!("formatting scope depth underflow"),
	}
}

/// Tree mutation handle for one [`Scheduler::edit`] batch.
///
/// Every structural change is mirrored into the document text, so tree and
/// text stay in step while formatting is postponed.
pub struct TreeEdit<'a> {
	file: &'a mut FileView,
	marks: &'a mut NodeMarks,
	indent: IndentOptions,
}

impl TreeEdit<'_> {
	pub fn tree(&self) -> &SyntaxTree {
		self.file.tree()
	}

	pub fn node(&self, id: NodeId) -> Result<Node<'_>> {
		Ok(self.file.tree().node(id)?)
	}

	pub fn text(&self) -> String {
		self.file.text()
	}

	/// Creates a detached, generated leaf.
	pub fn new_leaf(&mut self, kind: SyntaxKind, text: &str) -> NodeId {
		let id = self.file.parts_mut().0.new_leaf(kind, text);
		self.marks.set_generated(id, true);
		id
	}

	/// Creates a detached, generated composite adopting `children`.
	pub fn new_composite(&mut self, kind: SyntaxKind, children: &[NodeId]) -> Result<NodeId> {
		let id = self.file.parts_mut().0.new_composite(kind, children)?;
		self.marks.set_generated(id, true);
		Ok(id)
	}

	/// Copies `source` into a detached subtree that remembers the
	/// indentation of the source.
	pub fn copy_subtree(&mut self, source: NodeId) -> Result<NodeId> {
		let indent = self.indent_of(source)?;
		let copy = self.file.parts_mut().0.deep_copy(source)?;
		self.marks.set_old_indent(copy, indent);
		Ok(copy)
	}

	/// Detaches `node` so it can be inserted elsewhere, remembering its
	/// current indentation.
	pub fn detach_for_move(&mut self, node: NodeId) -> Result<NodeId> {
		let parent = self.node(node)?.parent().ok_or(TreeError::NotAttached(node))?.id();
		let indent = self.indent_of(node)?;
		self.marks.set_old_indent(node, indent);
		self.remove_child(parent, node)?;
		Ok(node)
	}

	pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
		let (tree, doc) = self.file.parts_mut();
		tree.insert_child(parent, index, child)?;
		let node = tree.node(child)?;
		if node.is_attached() {
			doc.insert(node.start(), &node.text())?;
		}
		Ok(())
	}

	pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
		let index = self.node(parent)?.child_count();
		self.insert_child(parent, index, child)
	}

	pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
		let (tree, doc) = self.file.parts_mut();
		let range = attached_range(tree, child)?;
		tree.remove_child(parent, child)?;
		if let Some(range) = range {
			doc.delete(range)?;
		}
		Ok(())
	}

	pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> Result<()> {
		let (tree, doc) = self.file.parts_mut();
		let range = attached_range(tree, old)?;
		tree.replace_child(parent, old, new)?;
		if let Some(range) = range {
			doc.replace(range, &tree.node(new)?.text())?;
		}
		Ok(())
	}

	pub fn set_leaf_text(&mut self, leaf: NodeId, text: &str) -> Result<()> {
		let (tree, doc) = self.file.parts_mut();
		let range = attached_range(tree, leaf)?;
		tree.set_leaf_text(leaf, text)?;
		if let Some(range) = range {
			doc.replace(range, text)?;
		}
		Ok(())
	}

	/// Requests a reformat of the whitespace in front of `node`.
	pub fn mark_reformat_before(&mut self, node: NodeId) {
		self.marks.mark_reformat_before(node);
	}

	/// Requests a reformat of `node` and the whitespace in front of it.
	pub fn mark_reformat(&mut self, node: NodeId) {
		self.marks.mark_reformat(node);
	}

	pub fn set_generated(&mut self, node: NodeId, generated: bool) {
		self.marks.set_generated(node, generated);
	}

	pub fn set_old_indent(&mut self, node: NodeId, indent: Option<usize>) {
		self.marks.set_old_indent(node, indent);
	}

	/// Column width of the indentation on the line where `node` starts, or
	/// `None` for a node outside the file.
	fn indent_of(&self, node: NodeId) -> Result<Option<usize>> {
		let node = self.node(node)?;
		if !node.is_attached() {
			return Ok(None);
		}
		let line = self.file.document().line_indent(node.start())?;
		Ok(Some(self.indent.width(&line)))
	}
}

fn attached_range(tree: &SyntaxTree, id: NodeId) -> Result<Option<TextRange>> {
	let node = tree.node(id)?;
	Ok(node.is_attached().then(|| node.text_range()))
}
