//! Scheduler configuration parsed from KDL.
//!
//! ```kdl
//! indent {
//!     size 4
//!     tab-size 4
//!     use-tabs #false
//! }
//! diagnostics {
//!     capture-originator #true
//! }
//! record-outside-postpone #false
//! ```
//!
//! Every key is optional. Unknown keys and values of the wrong type are
//! rejected rather than ignored.

use std::path::{Path, PathBuf};

use kdl::{KdlDocument, KdlNode, KdlValue};
use reflow_primitives::IndentOptions;
use thiserror::Error;


/// Errors from configuration parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing KDL syntax.
	#[error("KDL parse error: {0}")]
	Kdl(#[from] kdl::KdlError),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },

	/// A value has the wrong type for its option.
	#[error("option '{option}' expects {expected}, got {got}")]
	OptionTypeMismatch {
		option: String,
		expected: &'static str,
		got: String,
	},

	/// A value has the right type but is out of range.
	#[error("invalid value for '{option}': {value}")]
	InvalidValue { option: String, value: String },

	#[error("unknown option '{key}'")]
	UnknownOption { key: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Scheduler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatConfig {
	/// Indentation used by reindent arithmetic and handed to formatters.
	pub indent: IndentOptions,
	/// Capture a backtrace when a document first becomes locked.
	pub capture_originator: bool,
	/// Record tree changes even when no postpone scope is open.
	pub record_outside_postpone: bool,
}

impl FormatConfig {
	/// Parses configuration from KDL text.
	pub fn parse(input: &str) -> Result<Self> {
		let doc: KdlDocument = input.parse()?;
		let mut config = Self::default();

		for node in doc.nodes() {
			match node.name().value() {
				"indent" => parse_indent(node, &mut config.indent)?,
				"diagnostics" => {
					for child in children(node) {
						match child.name().value() {
							"capture-originator" => {
								config.capture_originator = bool_value(child, "diagnostics.capture-originator")?;
							}
							other => return Err(unknown("diagnostics", other)),
						}
					}
				}
				"record-outside-postpone" => {
					config.record_outside_postpone = bool_value(node, "record-outside-postpone")?;
				}
				other => {
					return Err(ConfigError::UnknownOption { key: other.to_string() });
				}
			}
		}

		Ok(config)
	}

	/// Loads configuration from a file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
			path: path.to_path_buf(),
			error: e,
		})?;
		Self::parse(&content)
	}
}

fn parse_indent(node: &KdlNode, indent: &mut IndentOptions) -> Result<()> {
	for child in children(node) {
		match child.name().value() {
			"size" => indent.indent_size = usize_value(child, "indent.size")?,
			"tab-size" => {
				let size = usize_value(child, "indent.tab-size")?;
				if size == 0 {
					return Err(ConfigError::InvalidValue {
						option: "indent.tab-size".into(),
						value: "0".into(),
					});
				}
				indent.tab_size = size;
			}
			"use-tabs" => indent.use_tabs = bool_value(child, "indent.use-tabs")?,
			other => return Err(unknown("indent", other)),
		}
	}
	Ok(())
}

fn children(node: &KdlNode) -> impl Iterator<Item = &KdlNode> {
	node.children().into_iter().flat_map(|doc| doc.nodes())
}

fn unknown(section: &str, key: &str) -> ConfigError {
	ConfigError::UnknownOption {
		key: format!("{section}.{key}"),
	}
}

fn first_value<'a>(node: &'a KdlNode, option: &str) -> Result<&'a KdlValue> {
	node.get(0).ok_or_else(|| ConfigError::OptionTypeMismatch {
		option: option.to_string(),
		expected: "a value",
		got: "nothing".into(),
	})
}

fn bool_value(node: &KdlNode, option: &str) -> Result<bool> {
	let value = first_value(node, option)?;
	value.as_bool().ok_or_else(|| ConfigError::OptionTypeMismatch {
		option: option.to_string(),
		expected: "a boolean",
		got: value.to_string(),
	})
}

fn usize_value(node: &KdlNode, option: &str) -> Result<usize> {
	let value = first_value(node, option)?;
	let int = value.as_integer().ok_or_else(|| ConfigError::OptionTypeMismatch {
		option: option.to_string(),
		expected: "an integer",
		got: value.to_string(),
	})?;
	usize::try_from(int).map_err(|_| ConfigError::InvalidValue {
		option: option.to_string(),
		value: int.to_string(),
	})
}
