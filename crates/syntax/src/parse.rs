use crate::tree::SyntaxTree;

/// Builds a syntax tree from source text.
///
/// Parsers are infallible: malformed input is represented with
/// [`KindClass::Error`](crate::KindClass::Error) nodes. The leaves of the
/// returned tree must concatenate to exactly `text`.
pub trait Parser: Send + Sync {
	fn parse(&self, text: &str) -> SyntaxTree;
}

impl<F> Parser for F
where
	F: Fn(&str) -> SyntaxTree + Send + Sync,
{
	fn parse(&self, text: &str) -> SyntaxTree {
		self(text)
	}
}
