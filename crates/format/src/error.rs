//! Error types for the formatting scheduler.

use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;

use reflow_primitives::{DocumentId, EditError};
use reflow_syntax::TreeError;
use thiserror::Error;

use crate::config::ConfigError;

/// Stack captured when a document first became locked by pending work.
#[derive(Clone)]
pub struct Originator(pub Arc<Backtrace>);

impl Originator {
	pub fn capture() -> Self {
		Self(Arc::new(Backtrace::force_capture()))
	}
}

impl fmt::Debug for Originator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Originator(..)")
	}
}

impl fmt::Display for Originator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Errors surfaced by the scheduler and its collaborators.
#[derive(Debug, Error)]
pub enum FormatError {
	#[error(transparent)]
	Edit(#[from] EditError),

	#[error(transparent)]
	Tree(#[from] TreeError),

	/// A caller edited text directly while tree edits were still waiting to
	/// be formatted.
	#[error("document is locked by postponed formatting; unprocessed nodes: {unprocessed}{}", originator_hint(.originator))]
	DocumentLocked {
		/// Queued nodes as `kind[start..end)`, at most five of them.
		unprocessed: String,
		originator: Option<Originator>,
	},

	#[error("unknown document {0:?}")]
	UnknownDocument(DocumentId),

	/// The formatting engine failed.
	#[error("formatter failed: {message}")]
	Engine { message: String },

	#[error("operation cancelled")]
	Cancelled,

	#[error(transparent)]
	Config(#[from] ConfigError),
}

fn originator_hint(originator: &Option<Originator>) -> &'static str {
	if originator.is_some() {
		"; see the captured originator for the edit that locked it"
	} else {
		""
	}
}

pub type Result<T> = std::result::Result<T, FormatError>;
