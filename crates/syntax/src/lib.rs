//! Arena syntax trees for postponed formatting.
//!
//! Trees are mutated through [`SyntaxTree`] methods that record every
//! attached change into a [`TreeChangeEvent`]; the formatter consumes those
//! batches to decide what to reformat once an operation completes.

mod builder;
mod error;
mod event;
mod kind;
mod parse;
mod tree;
mod walk;

pub use builder::TreeBuilder;
pub use error::{Result, TreeError};
pub use event::{ChangeKind, ChildChange, TreeChange, TreeChangeEvent};
pub use kind::{KindClass, SyntaxKind};
pub use parse::Parser;
pub use tree::{Node, NodeId, Preorder, SyntaxTree};
pub use walk::{VisitControl, Visitor, walk};
