use std::fmt;

/// Broad category of a node kind.
///
/// The scheduler only needs to tell a handful of classes apart; everything
/// language-specific lives in the kind name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindClass {
	/// Spaces, tabs and line breaks between tokens.
	Whitespace,
	/// Line or block comment.
	Comment,
	/// Parser error recovery node.
	Error,
	/// Text belonging to another language embedded in this file.
	ForeignFragment,
	/// Any other leaf.
	Token,
	/// Interior node.
	Composite,
}

/// Node kind: a static name plus its [`KindClass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyntaxKind {
	name: &'static str,
	class: KindClass,
}

impl SyntaxKind {
	pub const WHITESPACE: Self = Self::new("WHITESPACE", KindClass::Whitespace);
	pub const COMMENT: Self = Self::new("COMMENT", KindClass::Comment);
	pub const ERROR: Self = Self::new("ERROR", KindClass::Error);
	pub const FOREIGN: Self = Self::new("FOREIGN", KindClass::ForeignFragment);
	pub const FILE: Self = Self::new("FILE", KindClass::Composite);

	pub const fn new(name: &'static str, class: KindClass) -> Self {
		Self { name, class }
	}

	/// Shorthand for a [`KindClass::Token`] kind.
	pub const fn token(name: &'static str) -> Self {
		Self::new(name, KindClass::Token)
	}

	/// Shorthand for a [`KindClass::Composite`] kind.
	pub const fn composite(name: &'static str) -> Self {
		Self::new(name, KindClass::Composite)
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn class(&self) -> KindClass {
		self.class
	}

	pub fn is_whitespace(&self) -> bool {
		self.class == KindClass::Whitespace
	}

	pub fn is_comment(&self) -> bool {
		self.class == KindClass::Comment
	}

	pub fn is_error(&self) -> bool {
		self.class == KindClass::Error
	}

	pub fn is_foreign(&self) -> bool {
		self.class == KindClass::ForeignFragment
	}

	/// Whitespace and comments, the kinds a parser keeps away from the edges
	/// of a composite by attaching them to the enclosing node instead.
	pub fn is_raiseable(&self) -> bool {
		matches!(self.class, KindClass::Whitespace | KindClass::Comment)
	}
}

impl fmt::Display for SyntaxKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}
