use pretty_assertions::assert_eq;
use reflow_format::test_helpers::kinds;
use reflow_primitives::TextRange;

use crate::common::{Harness, block_of, insert_copy, insert_generated, statement};

#[test]
fn copied_block_lands_at_nested_depth() {
	let mut h = Harness::new("f {\n    g {\n    }\n}\nh {\n    k;\n}\n");
	let doc = h.doc;
	h.scheduler
		.postpone_formatting_inside(|s| {
			s.edit(doc, |e| {
				let outer = block_of(e, statement(e, 0));
				let inner_stmt = e.node(outer)?.children().find(|n| n.kind() == kinds::STMT).unwrap().id();
				let inner = block_of(e, inner_stmt);
				let source = statement(e, 1);
				insert_copy(e, inner, source)
			})?;
			assert_eq!(s.context(doc).unwrap().pending().len(), 2);
			Ok(())
		})
		.unwrap();

	assert_eq!(
		h.text(),
		"f {\n    g {\n        h {\n            k;\n        }\n    }\n}\nh {\n    k;\n}\n"
	);
	assert_eq!(h.file().tree().text(), h.text());
	assert_eq!(h.file().document().live_span_count(), 0);
	assert!(!h.scheduler.is_locked(doc));

	// the formatter only saw the inserted line break; the copy was shifted
	let calls = h.formatter.calls();
	assert_eq!(calls.len(), 1);
	let ranges: Vec<TextRange> = calls[0].0.entries().iter().map(|e| e.range).collect();
	assert_eq!(ranges, vec![TextRange::new(12, 13)]);
}

#[test]
fn second_run_without_changes_is_noop() {
	let mut h = Harness::new("a {\n}\n");
	let doc = h.doc;
	h.scheduler
		.postpone_formatting_inside(|s| {
			s.edit(doc, |e| {
				let block = block_of(e, statement(e, 0));
				insert_generated(e, block, "b")
			})
			.map(drop)
		})
		.unwrap();
	let text = h.text();
	let version = h.file().document().version();
	assert_eq!(h.formatter.calls().len(), 1);

	h.scheduler.postpone_formatting_inside(|_| Ok(())).unwrap();
	h.scheduler.do_postponed_formatting(None).unwrap();
	h.scheduler.do_postponed_formatting(Some(doc)).unwrap();

	assert_eq!(h.text(), text);
	assert_eq!(h.file().document().version(), version);
	assert_eq!(h.formatter.calls().len(), 1);
}

#[test]
fn adjacent_insertions_share_one_range() {
	let mut h = Harness::new("a {\n}\n");
	let doc = h.doc;
	h.scheduler
		.postpone_formatting_inside(|s| {
			s.edit(doc, |e| {
				let block = block_of(e, statement(e, 0));
				insert_generated(e, block, "c")?;
				insert_generated(e, block, "b")
			})
			.map(drop)
		})
		.unwrap();

	assert_eq!(h.text(), "a {\n    b;\n    c;\n}\n");
	let calls = h.formatter.calls();
	assert_eq!(calls.len(), 1);
	assert_eq!(calls[0].0.entries().len(), 1);
	assert_eq!(calls[0].0.entries()[0].range, TextRange::new(3, 9));
}

#[test]
fn edits_in_distant_places_keep_their_offsets() {
	let mut h = Harness::new("a {\n}\nb {\n}\nc {\n    d;\n}\n");
	let doc = h.doc;
	h.scheduler
		.postpone_formatting_inside(|s| {
			s.edit(doc, |e| {
				let first = block_of(e, statement(e, 0));
				insert_generated(e, first, "x")?;
				let second = block_of(e, statement(e, 1));
				let source = statement(e, 2);
				insert_copy(e, second, source)
			})
			.map(drop)
		})
		.unwrap();

	assert_eq!(h.text(), "a {\n    x;\n}\nb {\n    c {\n        d;\n    }\n}\nc {\n    d;\n}\n");
	assert_eq!(h.file().tree().text(), h.text());
	assert_eq!(h.file().document().live_span_count(), 0);
}

#[test]
fn moved_statement_keeps_relative_layout() {
	let mut h = Harness::new("a {\n    b {\n        c;\n    }\n}\nd {\n}\n");
	let doc = h.doc;
	h.scheduler
		.postpone_formatting_inside(|s| {
			s.edit(doc, |e| {
				let outer = block_of(e, statement(e, 0));
				let moved = e.node(outer)?.children().find(|n| n.kind() == kinds::STMT).unwrap().id();
				e.detach_for_move(moved)?;
				let target = block_of(e, statement(e, 1));
				let newline = e.new_leaf(kinds::WHITESPACE, "\n");
				e.insert_child(target, 1, moved)?;
				e.insert_child(target, 1, newline)
			})
		})
		.unwrap();

	assert_eq!(h.text(), "a {\n    \n}\nd {\n    b {\n        c;\n    }\n}\n");
	assert_eq!(h.file().tree().text(), h.text());
}

#[test]
fn reformat_markers_are_honored() {
	let mut h = Harness::new("a {\nb;\n      c;\n}\n");
	let doc = h.doc;
	h.scheduler
		.postpone_formatting_inside(|s| {
			s.edit(doc, |e| {
				let block = block_of(e, statement(e, 0));
				let stmts: Vec<_> = e.node(block)?.children().filter(|n| n.kind() == kinds::STMT).map(|n| n.id()).collect();
				e.mark_reformat_before(stmts[0]);
				e.mark_reformat(stmts[1]);
				Ok(())
			})
		})
		.unwrap();

	assert_eq!(h.text(), "a {\n    b;\n    c;\n}\n");
	let calls = h.formatter.calls();
	assert_eq!(calls.len(), 1);
	assert!(calls[0].0.entries().iter().all(|e| e.with_leading_whitespace));
}
