use std::io::Write;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use reflow_format::test_helpers::{BraceFormatter, FailingFormatter, FixedDisabledRanges, MarkerExternalFormatter};
use reflow_format::{FormatConfig, FormatError, Scheduler};
use reflow_primitives::TextRange;

use crate::common::{Harness, block_of, file, insert_copy, insert_generated, scheduler_with, statement};

#[test]
fn external_formatter_takes_over_matching_files() {
	let builtin = Arc::new(BraceFormatter::new());
	let external = Arc::new(MarkerExternalFormatter::new("ext"));
	let mut s = Scheduler::new(FormatConfig::default(), builtin.clone()).with_external_formatter(external.clone());
	let plain = s.open(file("a {\n}\n"));
	let marked = s.open(file("ext {\n}\n"));

	s.postpone_formatting_inside(|s| {
		for doc in [plain, marked] {
			s.edit(doc, |e| {
				let block = block_of(e, statement(e, 0));
				insert_generated(e, block, "x")
			})?;
		}
		Ok(())
	})
	.unwrap();

	assert_eq!(builtin.calls().len(), 1);
	assert_eq!(external.inner.calls().len(), 1);
	assert_eq!(s.file(plain).unwrap().text(), "a {\n    x;\n}\n");
	assert_eq!(s.file(marked).unwrap().text(), "ext {\n    x;\n}\n");
}

#[test]
fn disabled_ranges_are_not_reindented() {
	let text = "a {\n}\nh {\nk;\nm;\n}\n";
	let disabled = Arc::new(FixedDisabledRanges::new(vec![TextRange::new(8, 14)]));
	let mut h = Harness::new(text);
	let doc = h.doc;
	let mut s = h.scheduler.with_disabled_ranges(disabled.clone());

	let copy = s
		.postpone_formatting_inside(|s| {
			s.edit(doc, |e| {
				let block = block_of(e, statement(e, 0));
				let source = statement(e, 1);
				insert_copy(e, block, source)
			})
		})
		.unwrap();

	assert_eq!(disabled.queried(), vec![copy]);
	assert_eq!(s.file(doc).unwrap().text(), "a {\n    h {\nk;\nm;\n}\n}\nh {\nk;\nm;\n}\n");

	// without the provider the whole copy moves
	h = Harness::new(text);
	let doc = h.doc;
	h.scheduler
		.postpone_formatting_inside(|s| {
			s.edit(doc, |e| {
				let block = block_of(e, statement(e, 0));
				let source = statement(e, 1);
				insert_copy(e, block, source)
			})
			.map(drop)
		})
		.unwrap();
	assert_eq!(h.text(), "a {\n    h {\n    k;\n    m;\n    }\n}\nh {\nk;\nm;\n}\n");
}

#[test]
fn formatter_failure_surfaces_after_cleanup() {
	let (mut s, doc) = scheduler_with(Arc::new(FailingFormatter), "a {\n}\n");
	let err = s
		.postpone_formatting_inside(|s| {
			s.edit(doc, |e| {
				let block = block_of(e, statement(e, 0));
				insert_generated(e, block, "x")
			})
			.map(drop)
		})
		.unwrap_err();

	assert!(matches!(err, FormatError::Engine { .. }));
	assert!(err.to_string().contains("formatter exploded"));
	let file = s.file(doc).unwrap();
	assert_eq!(file.text(), "a {\nx;\n}\n");
	assert_eq!(file.document().live_span_count(), 0);
	assert!(!s.is_locked(doc));
	s.assert_safe_to_edit_directly(doc).unwrap();
}

#[test]
fn config_file_drives_indentation() {
	let mut tmp = tempfile::NamedTempFile::new().unwrap();
	writeln!(tmp, "indent {{\n    use-tabs #true\n}}").unwrap();
	let config = FormatConfig::load(tmp.path()).unwrap();
	assert!(config.indent.use_tabs);

	let mut h = Harness::with_config(config, "a {\n}\n");
	let doc = h.doc;
	h.scheduler
		.postpone_formatting_inside(|s| {
			s.edit(doc, |e| {
				let block = block_of(e, statement(e, 0));
				insert_generated(e, block, "x")
			})
			.map(drop)
		})
		.unwrap();
	assert_eq!(h.text(), "a {\n\tx;\n}\n");
	assert!(h.formatter.calls()[0].1.indent.use_tabs);
}

#[test]
fn bad_config_is_rejected() {
	let err = FormatConfig::parse("indent { width 4 }").unwrap_err();
	assert!(err.to_string().contains("indent.width"));
	let err: FormatError = err.into();
	assert!(matches!(err, FormatError::Config(_)));
}
