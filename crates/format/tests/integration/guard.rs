use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use reflow_format::test_helpers::{BraceFormatter, kinds};
use reflow_format::{FormatError, ReentrantWriteLock, Scheduler, WriteAccess};
use reflow_primitives::TextRange;

use crate::common::{Harness, block_of, file, insert_generated, statement};

/// Write lock that counts acquisitions.
#[derive(Default)]
struct CountingLock {
	inner: ReentrantWriteLock,
	acquired: AtomicUsize,
}

impl WriteAccess for CountingLock {
	fn is_held(&self) -> bool {
		self.inner.is_held()
	}

	fn run_exclusive(&self, f: &mut dyn FnMut()) {
		self.acquired.fetch_add(1, Ordering::SeqCst);
		self.inner.run_exclusive(f);
	}
}

#[test]
fn locked_document_rejects_direct_edits_until_formatted() {
	let mut h = Harness::new("a {\n}\nb;\n");
	let doc = h.doc;
	h.scheduler
		.postpone_formatting_inside(|s| {
			s.edit(doc, |e| {
				let block = block_of(e, statement(e, 0));
				insert_generated(e, block, "x")
			})?;
			assert!(s.is_locked(doc));
			let err = s.edit_text_directly(doc, TextRange::new(7, 8), "c").unwrap_err();
			let message = err.to_string();
			assert!(message.contains("locked by postponed formatting"), "{message}");
			assert!(message.contains("STMT[4..6)"), "{message}");
			Ok(())
		})
		.unwrap();

	assert!(!h.scheduler.is_locked(doc));
	h.scheduler.assert_safe_to_edit_directly(doc).unwrap();
	h.scheduler.edit_text_directly(doc, TextRange::new(13, 14), "c").unwrap();
	assert_eq!(h.text(), "a {\n    x;\n}\nc;\n");
}

#[test]
fn nested_scopes_format_every_document_once() {
	let formatter = Arc::new(BraceFormatter::new());
	let mut s = Scheduler::new(Default::default(), formatter.clone());
	let first = s.open(file("a {\n}\n"));
	let second = s.open(file("b {\n}\n"));

	s.postpone_formatting_inside(|s| {
		for doc in [first, second] {
			s.postpone_formatting_inside(|s| {
				s.edit(doc, |e| {
					let block = block_of(e, statement(e, 0));
					insert_generated(e, block, "x")
				})
				.map(drop)
			})?;
		}
		assert!(s.is_locked(first) && s.is_locked(second));
		Ok(())
	})
	.unwrap();

	assert_eq!(formatter.calls().len(), 2);
	assert_eq!(s.file(first).unwrap().text(), "a {\n    x;\n}\n");
	assert_eq!(s.file(second).unwrap().text(), "b {\n    x;\n}\n");
}

#[test]
fn formatting_acquires_lock_once() {
	let lock = Arc::new(CountingLock::default());
	let mut s = Scheduler::new(Default::default(), Arc::new(BraceFormatter::new())).with_write_lock(lock.clone());
	let doc = s.open(file("a {\n}\n"));

	s.postpone_formatting_inside(|s| {
		s.edit(doc, |e| {
			let block = block_of(e, statement(e, 0));
			insert_generated(e, block, "x")
		})
		.map(drop)
	})
	.unwrap();
	assert_eq!(lock.acquired.load(Ordering::SeqCst), 1);

	s.write_action(|s| {
		s.edit(doc, |e| {
			let block = block_of(e, statement(e, 0));
			insert_generated(e, block, "y")
		})
		.map(drop)
	})
	.unwrap();
	assert_eq!(lock.acquired.load(Ordering::SeqCst), 2);
	assert_eq!(s.file(doc).unwrap().text(), "a {\n    y;\n    x;\n}\n");
}

#[test]
fn foreign_fragment_forces_reparse() {
	let mut h = Harness::new("a;\n");
	let doc = h.doc;
	let generation = h.file().tree().generation();
	h.scheduler
		.postpone_formatting_inside(|s| {
			s.edit(doc, |e| {
				let fragment = e.new_leaf(kinds::FOREIGN, "<% x %>");
				let semi = e.new_leaf(kinds::SEMI, ";");
				let stmt = e.new_composite(kinds::STMT, &[fragment, semi])?;
				let root = e.tree().root();
				e.append_child(root, stmt)
			})?;
			assert!(s.context(doc).unwrap().reparse_pending());
			Ok(())
		})
		.unwrap();

	assert_eq!(h.text(), "a;\n<% x %>;");
	assert_ne!(h.file().tree().generation(), generation);
	assert_eq!(h.file().tree().text(), h.text());
}

#[test]
fn insertion_after_error_forces_reparse() {
	let mut h = Harness::new("{ b }");
	let doc = h.doc;
	let generation = h.file().tree().generation();
	h.scheduler
		.postpone_formatting_inside(|s| {
			s.edit(doc, |e| {
				let block = block_of(e, statement(e, 0));
				let word = e.new_leaf(kinds::WORD, "c");
				e.insert_child(block, 4, word)
			})
		})
		.unwrap();

	assert_eq!(h.text(), "{ b c}");
	assert_ne!(h.file().tree().generation(), generation);
}

#[test]
fn exposed_trivia_edge_forces_reparse() {
	let mut h = Harness::new("a; // c");
	let doc = h.doc;
	let generation = h.file().tree().generation();
	h.scheduler
		.postpone_formatting_inside(|s| {
			s.edit(doc, |e| {
				let root = e.tree().root();
				let comment = e.tree().root_node().last_child().unwrap().id();
				e.remove_child(root, comment)
			})?;
			assert_eq!(s.context(doc).unwrap().raise_candidates().len(), 1);
			Ok(())
		})
		.unwrap();

	assert_eq!(h.text(), "a; ");
	assert_ne!(h.file().tree().generation(), generation);
	assert!(h.formatter.calls().is_empty());
}

#[test]
fn plain_removal_keeps_tree() {
	let mut h = Harness::new("a;b;");
	let doc = h.doc;
	let generation = h.file().tree().generation();
	h.scheduler
		.postpone_formatting_inside(|s| {
			s.edit(doc, |e| {
				let root = e.tree().root();
				let last = statement(e, 1);
				e.remove_child(root, last)
			})
		})
		.unwrap();

	assert_eq!(h.text(), "a;");
	assert_eq!(h.file().tree().generation(), generation);
}

#[test]
fn cancellation_during_build_releases_state() {
	let cancel = tokio_util::sync::CancellationToken::new();
	let h = Harness::new("a {\n}\n");
	let doc = h.doc;
	let mut s = h.scheduler.with_cancellation(cancel.clone());

	let err = s
		.postpone_formatting_inside(|s| {
			s.edit(doc, |e| {
				let block = block_of(e, statement(e, 0));
				insert_generated(e, block, "x")
			})?;
			cancel.cancel();
			Ok(())
		})
		.unwrap_err();
	assert!(matches!(err, FormatError::Cancelled));
	assert!(!s.is_locked(doc));
	assert!(s.context(doc).is_none());
	let file = s.file(doc).unwrap();
	assert_eq!(file.text(), "a {\nx;\n}\n");
	assert_eq!(file.document().live_span_count(), 0);
}
