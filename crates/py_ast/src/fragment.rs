use crate::{parse_expression, NodeRef, SyntaxTree};

/// An expression materialized from a string's contents.
///
/// The fragment owns its tree and carries the node it was created for, so
/// name lookups on fragment nodes resolve in the owner's file at the owner's
/// position. Dropping the fragment frees the tree, there is nothing else to
/// tear down.
#[derive(Debug)]
pub struct Fragment<'a> {
    tree: SyntaxTree,
    owner: NodeRef<'a>,
}

impl<'a> Fragment<'a> {
    /// Returns `None` when `contents` is not a single valid expression.
    pub fn parse(contents: &str, owner: NodeRef<'a>) -> Option<Self> {
        match parse_expression(contents) {
            Ok(tree) => Some(Self { tree, owner }),
            Err(err) => {
                log::trace!("fragment {contents:?} did not parse: {err}");
                None
            }
        }
    }

    /// The fragment's expression, tagged with the owner as its origin.
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            tree: &self.tree,
            id: self.tree.root,
            origin: Some(self.owner.as_origin()),
        }
    }
}
