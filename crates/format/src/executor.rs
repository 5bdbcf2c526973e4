//! Applies normalized actions to live text, and the full per-document run.

use std::sync::Arc;

use reflow_primitives::{IndentOptions, TextRange, indent_runs};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::builder::build_tasks;
use crate::error::Result;
use crate::file::FileView;
use crate::formatter::{DisabledIndentRanges, ExternalFormatter, FormatContext, FormatRanges, Formatter};
use crate::normalize::{Actions, ReindentAction, normalize};
use crate::observer::raise_candidates_needing_reparse;
use crate::registry::DocumentContext;
use crate::task::TaskSet;


/// Collaborators a formatting run needs.
pub struct PipelineEnv<'a> {
	pub formatter: &'a dyn Formatter,
	/// Checked in order; the first that applies replaces `formatter`.
	pub external: &'a [Arc<dyn ExternalFormatter>],
	pub disabled: &'a [Arc<dyn DisabledIndentRanges>],
	pub indent: IndentOptions,
	pub cancel: &'a CancellationToken,
}

/// Runs the postponed work recorded in `ctx` against `file`.
///
/// Builds tasks from the queued nodes and markers, then normalizes and
/// executes until no task is left. Every span is released whether or not
/// the run succeeds. After a successful run the tree is rebuilt from text if
/// the observer flagged a hazard that still applies.
pub fn run_pipeline(file: &mut FileView, ctx: &mut DocumentContext, env: &PipelineEnv<'_>) -> Result<()> {
	let mut tasks = TaskSet::new();
	let result = run_passes(file, ctx, env, &mut tasks);
	tasks.dispose_all(file.document_mut());
	result?;

	reparse_if_needed(file, ctx);
	Ok(())
}

fn run_passes(file: &mut FileView, ctx: &mut DocumentContext, env: &PipelineEnv<'_>, tasks: &mut TaskSet) -> Result<()> {
	let pending = ctx.take_pending();
	build_tasks(file, &mut ctx.marks, &pending, env.disabled, env.cancel, tasks)?;
	if tasks.is_empty() {
		return Ok(());
	}

	debug!(document = ?file.id(), queued = pending.len(), tasks = tasks.len(), "running postponed formatting");
	let mut passes = 0usize;
	while !tasks.is_empty() {
		passes += 1;
		tasks.refresh(file.document_mut());
		let actions = normalize(tasks, file.document_mut())?.into_actions(file.document_mut());
		let result = execute(file, &actions, env);
		actions.dispose(file.document_mut());
		result?;
	}
	debug!(document = ?file.id(), passes, "postponed formatting applied");
	Ok(())
}

/// Applies one pass: the reformat first, then every reindent.
pub fn execute(file: &mut FileView, actions: &Actions, env: &PipelineEnv<'_>) -> Result<()> {
	if let Some(ranges) = &actions.reformat {
		reformat(file, ranges, env)?;
	}
	if let Some(reindent) = &actions.reindent {
		reindent_ranges(file, reindent, env.indent)?;
	}
	Ok(())
}

fn reformat(file: &mut FileView, ranges: &FormatRanges, env: &PipelineEnv<'_>) -> Result<()> {
	let ctx = FormatContext {
		indent: env.indent,
		format_doc_comments: false,
	};
	if let Some(external) = env.external.iter().find(|f| f.applies_to(file)) {
		trace!(document = ?file.id(), ranges = ranges.len(), "delegating to external formatter");
		return external.format(file, ranges, &ctx);
	}

	let mut ranges = ranges.ensure_non_empty(file.document().len_chars());
	ranges.set_extend_to_context(true);
	trace!(document = ?file.id(), ranges = ranges.len(), "reformatting");
	env.formatter.format(file, &ranges, &ctx)
}

/// Shifts the indentation inside each range by the difference between the
/// indent its first line has now and the one it had before.
///
/// Ranges are read from their live spans, so earlier edits in the same pass
/// are accounted for. The first line of a range is left alone, as are blank
/// lines.
pub fn reindent_ranges(file: &mut FileView, action: &ReindentAction, indent: IndentOptions) -> Result<()> {
	for entry in &action.entries {
		let Some(range) = file.document().span_range(entry.span) else {
			warn!(document = ?file.id(), span = ?entry.span, "reindent range was invalidated before it ran");
			continue;
		};

		let doc = file.document();
		let current = indent.width(&doc.line_indent(range.start)?);
		let delta = current as isize - entry.old_indent as isize;
		if delta == 0 {
			continue;
		}

		let chars: Vec<char> = doc.slice(range)?.chars().collect();
		let text: String = chars.iter().collect();
		let mut edits: Vec<(TextRange, String)> = Vec::new();
		for run in indent_runs(&text, range.start) {
			let old: String = chars[run.start - range.start..run.end - range.start].iter().collect();
			let width = (indent.width(&old) as isize + delta).max(0) as usize;
			let new = indent.fill(width);
			if new != old {
				edits.push((run, new));
			}
		}

		trace!(document = ?file.id(), %range, delta, lines = edits.len(), "reindenting");
		for (run, new) in edits.into_iter().rev() {
			file.replace_text(run, &new)?;
		}
	}
	Ok(())
}

fn reparse_if_needed(file: &mut FileView, ctx: &mut DocumentContext) {
	let raised = raise_candidates_needing_reparse(file.tree(), ctx.raise_candidates());
	if ctx.reparse_pending() || raised > 0 {
		debug!(
			document = ?file.id(),
			reparse_pending = ctx.reparse_pending(),
			raise_candidates = raised,
			"rebuilding tree from text"
		);
		file.reparse_from_text();
	}
	ctx.clear_reparse_pending();
}
