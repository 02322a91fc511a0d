// Syntax layer for the supported Python subset.
//
// Trees are immutable once built: an arena of nodes, a parent map and byte
// spans. Everything downstream works through `NodeRef`, a non-owning handle
// that also remembers where a synthetic fragment came from.

mod expr;
pub mod fragment;
mod parse;
pub mod scope;

#[cfg(feature = "proptest_support")]
pub mod arbitrary;

#[cfg(test)]
mod tests;

use std::ops;

use derive_more::Debug;
use la_arena::{Arena, ArenaMap, Idx};
use num_bigint::BigInt;
use smol_str::SmolStr;

pub use fragment::Fragment;
pub use parse::{parse_expression, parse_file, ParseError};

pub type NodeId = Idx<Node>;

/// Byte range into the source a tree was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[debug("{start}..{end}")]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(value: Span) -> Self {
        (value.start, value.len()).into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Number {
    /// Arbitrary precision, literals past 64 bits keep their exact value.
    #[debug("{_0}")]
    Int(BigInt),
    /// Floats are kept as written, nothing downstream does arithmetic on them.
    #[debug("{_0}")]
    Float(SmolStr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    /// `|`
    BitOr,
    /// `&`
    BitAnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: SmolStr,
    pub decorators: Box<[NodeId]>,
    pub params: Box<[NodeId]>,
    pub returns: Option<NodeId>,
    pub body: Box<[NodeId]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: SmolStr,
    pub annotation: Option<NodeId>,
    pub default: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: SmolStr,
    pub bases: Box<[NodeId]>,
    pub body: Box<[NodeId]>,
}

/// A single-target assignment or bare annotated declaration
/// (`x = 1`, `x: int = 1`, `x: int`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDef {
    pub name: SmolStr,
    pub annotation: Option<NodeId>,
    pub value: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Placeholder for a hole left by error recovery.
    Missing,

    // -- expressions ----------------------------------------------------------
    Number(Number),
    Bool(bool),
    NoneLit,
    Ellipsis,
    /// String literal holding its decoded value (no quotes).
    Str(SmolStr),
    /// A reference expression.
    Name(SmolStr),
    /// `rhs` is `None` when the operator has nothing after it (`int |`).
    Binary {
        op: BinOp,
        lhs: NodeId,
        rhs: Option<NodeId>,
    },
    Paren(NodeId),
    /// Bare (`a, b`) or parenthesized tuple. `()` is the empty tuple.
    Tuple(Box<[NodeId]>),
    List(Box<[NodeId]>),
    Subscript {
        value: NodeId,
        index: NodeId,
    },
    Attribute {
        value: NodeId,
        attr: SmolStr,
    },
    Call {
        callee: NodeId,
        args: Box<[NodeId]>,
    },

    // -- statements and declarations ------------------------------------------
    Module(Box<[NodeId]>),
    Function(FunctionDef),
    Parameter(Param),
    Class(ClassDef),
    Target(TargetDef),
    Return(Option<NodeId>),
    If {
        cond: NodeId,
        body: Box<[NodeId]>,
        orelse: Box<[NodeId]>,
    },
    Import {
        module: Option<SmolStr>,
        names: Box<[SmolStr]>,
    },
    ExprStmt(NodeId),
    Pass,
}

impl Node {
    pub fn walk_children(&self, mut f: impl FnMut(NodeId)) {
        match self {
            Self::Missing
            | Self::Number(_)
            | Self::Bool(_)
            | Self::NoneLit
            | Self::Ellipsis
            | Self::Str(_)
            | Self::Name(_)
            | Self::Import { .. }
            | Self::Pass => {}
            Self::Binary { lhs, rhs, op: _ } => {
                f(*lhs);
                if let Some(rhs) = rhs {
                    f(*rhs);
                }
            }
            Self::Paren(inner) | Self::ExprStmt(inner) => f(*inner),
            Self::Tuple(xs) | Self::List(xs) | Self::Module(xs) => {
                xs.iter().copied().for_each(f);
            }
            Self::Subscript { value, index } => {
                f(*value);
                f(*index);
            }
            Self::Attribute { value, attr: _ } => f(*value),
            Self::Call { callee, args } => {
                f(*callee);
                args.iter().copied().for_each(f);
            }
            Self::Function(def) => {
                def.decorators.iter().copied().for_each(&mut f);
                def.params.iter().copied().for_each(&mut f);
                if let Some(returns) = def.returns {
                    f(returns);
                }
                def.body.iter().copied().for_each(f);
            }
            Self::Parameter(param) => {
                param.annotation.into_iter().for_each(&mut f);
                param.default.into_iter().for_each(f);
            }
            Self::Class(def) => {
                def.bases.iter().copied().for_each(&mut f);
                def.body.iter().copied().for_each(f);
            }
            Self::Target(def) => {
                def.annotation.into_iter().for_each(&mut f);
                def.value.into_iter().for_each(f);
            }
            Self::Return(value) => value.iter().copied().for_each(f),
            Self::If { cond, body, orelse } => {
                f(*cond);
                body.iter().copied().for_each(&mut f);
                orelse.iter().copied().for_each(f);
            }
        }
    }

    /// The name a declaration binds, if this node is one.
    pub fn declared_name(&self) -> Option<&SmolStr> {
        match self {
            Self::Function(def) => Some(&def.name),
            Self::Class(def) => Some(&def.name),
            Self::Target(def) => Some(&def.name),
            Self::Parameter(param) => Some(&param.name),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionDef> {
        match self {
            Self::Function(def) => Some(def),
            _ => None,
        }
    }

    pub fn as_param(&self) -> Option<&Param> {
        match self {
            Self::Parameter(param) => Some(param),
            _ => None,
        }
    }

    pub fn as_target(&self) -> Option<&TargetDef> {
        match self {
            Self::Target(def) => Some(def),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassDef> {
        match self {
            Self::Class(def) => Some(def),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Arena<Node>,
    #[debug(skip)]
    spans: ArenaMap<NodeId, Span>,
    #[debug(skip)]
    parents: ArenaMap<NodeId, NodeId>,
    pub root: NodeId,
    #[debug(skip)]
    source: String,
}

impl ops::Index<NodeId> for SyntaxTree {
    type Output = Node;
    fn index(&self, index: NodeId) -> &Self::Output {
        &self.nodes[index]
    }
}

impl SyntaxTree {
    pub(crate) fn new(
        nodes: Arena<Node>,
        spans: ArenaMap<NodeId, Span>,
        root: NodeId,
        source: String,
    ) -> Self {
        let mut parents = ArenaMap::default();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            nodes[id].walk_children(|child| {
                parents.insert(child, id);
                stack.push(child);
            });
        }

        Self {
            nodes,
            spans,
            parents,
            root,
            source,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.spans.get(id).copied().unwrap_or_default()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(id).copied()
    }

    pub fn text(&self, id: NodeId) -> &str {
        let span = self.span(id);
        self.source.get(span.start..span.end).unwrap_or("")
    }

    /// All nodes reachable from the root, in source order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let mut children = Vec::new();
            self.nodes[id].walk_children(|child| children.push(child));
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// 1-based line and column of a byte offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let before = &self.source[..offset.min(self.source.len())];
        let line = before.matches('\n').count() + 1;
        let col = before.len() - before.rfind('\n').map_or(0, |i| i + 1) + 1;
        (line, col)
    }

    pub fn node_ref(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef {
            tree: self,
            id,
            origin: None,
        }
    }
}

/// Where a fragment node came from: the real-file node that owns it.
#[derive(Debug, Clone, Copy)]
#[debug("Origin({id:?})")]
pub struct Origin<'a> {
    tree: &'a SyntaxTree,
    id: NodeId,
}

/// Non-owning handle to a node, valid for one derivation.
#[derive(Debug, Clone, Copy)]
#[debug("NodeRef({id:?})")]
pub struct NodeRef<'a> {
    tree: &'a SyntaxTree,
    id: NodeId,
    origin: Option<Origin<'a>>,
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl<'a> NodeRef<'a> {
    pub fn tree(&self) -> &'a SyntaxTree {
        self.tree
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node(&self) -> &'a Node {
        &self.tree[self.id]
    }

    pub fn span(&self) -> Span {
        self.tree.span(self.id)
    }

    pub fn text(&self) -> &'a str {
        self.tree.text(self.id)
    }

    /// Another node of the same tree, keeping this node's origin.
    pub fn child(&self, id: NodeId) -> NodeRef<'a> {
        NodeRef {
            tree: self.tree,
            id,
            origin: self.origin,
        }
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.tree.parent(self.id).map(|id| self.child(id))
    }

    /// Strict ancestors, innermost first.
    pub fn ancestors(&self) -> impl Iterator<Item = NodeRef<'a>> {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    pub fn is_synthetic(&self) -> bool {
        self.origin.is_some()
    }

    /// The real-file node this node stands for: its fragment owner when it is
    /// synthetic, itself otherwise.
    pub fn anchor(&self) -> NodeRef<'a> {
        match self.origin {
            Some(origin) => NodeRef {
                tree: origin.tree,
                id: origin.id,
                origin: None,
            },
            None => *self,
        }
    }

    /// The file name lookups for this node resolve in.
    pub fn context_file(&self) -> &'a SyntaxTree {
        self.anchor().tree
    }

    pub(crate) fn as_origin(&self) -> Origin<'a> {
        self.origin.unwrap_or(Origin {
            tree: self.tree,
            id: self.id,
        })
    }
}
