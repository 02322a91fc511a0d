// ==============================================================================
// Scope queries
// ==============================================================================
//
// Lexical lookups over a finished tree: the statement list a declaration lives
// in, enclosing functions/classes, and name resolution. Python scoping is
// approximated: function and module bodies are scopes, class bodies are only
// visible to statements directly inside them, and `if` branches belong to the
// surrounding scope.

use smol_str::SmolStr;

use crate::{Node, NodeId, NodeRef, SyntaxTree};

/// What a resolved name is bound by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding<'a> {
    /// A target, function, class or parameter declaration.
    Declaration(NodeRef<'a>),
    /// An `import` statement binding the name.
    Import(NodeRef<'a>),
}

impl<'a> Binding<'a> {
    pub fn node(&self) -> NodeRef<'a> {
        match self {
            Binding::Declaration(node) | Binding::Import(node) => *node,
        }
    }
}

impl<'a> NodeRef<'a> {
    /// The ordered statement list that directly contains this node.
    pub fn siblings(&self) -> Option<&'a [NodeId]> {
        let parent = self.parent()?;
        let id = self.id();
        match parent.node() {
            Node::Module(body) => Some(&body[..]),
            Node::Function(def) => def.body.contains(&id).then_some(&*def.body),
            Node::Class(def) => def.body.contains(&id).then_some(&*def.body),
            Node::If { body, orelse, .. } => {
                if body.contains(&id) {
                    Some(&body[..])
                } else if orelse.contains(&id) {
                    Some(&orelse[..])
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn enclosing_function(&self) -> Option<NodeRef<'a>> {
        self.ancestors()
            .find(|node| matches!(node.node(), Node::Function(_)))
    }

    /// True if `self` is `other` or one of its descendants.
    pub fn is_within(&self, other: NodeRef<'_>) -> bool {
        std::ptr::eq(self.tree(), other.tree())
            && (self.id() == other.id() || self.ancestors().any(|a| a.id() == other.id()))
    }

    /// Resolve the name this reference expression mentions.
    ///
    /// Fragment nodes resolve at their anchor, in the anchor's file.
    pub fn resolve_name(&self) -> Option<Binding<'a>> {
        let Node::Name(name) = self.node() else {
            return None;
        };
        let anchor = self.anchor();
        resolve_at(anchor, name)
    }
}

/// Look `name` up from the position of `at`, innermost scope first.
pub fn resolve_at<'a>(at: NodeRef<'a>, name: &str) -> Option<Binding<'a>> {
    let mut passed_function = false;
    for scope in at.ancestors() {
        let candidates = match scope.node() {
            Node::Function(def) => {
                let mut found: Vec<Binding<'a>> = def
                    .params
                    .iter()
                    .filter(|&&p| scope.tree()[p].declared_name().is_some_and(|n| n == name))
                    .map(|&p| Binding::Declaration(scope.child(p)))
                    .collect();
                found.extend(bindings_in(scope, &def.body, name));
                passed_function = true;
                found
            }
            Node::Class(def) if !passed_function => bindings_in(scope, &def.body, name),
            Node::Module(body) => bindings_in(scope, body, name),
            _ => continue,
        };

        if let Some(binding) = pick(at, &candidates) {
            return Some(binding);
        }
    }
    None
}

/// Prefer the last binding that ends before the use, otherwise the last one
/// in the scope. A binding that encloses the use never counts.
fn pick<'a>(at: NodeRef<'a>, candidates: &[Binding<'a>]) -> Option<Binding<'a>> {
    let pos = at.span().start;
    let usable = || {
        candidates
            .iter()
            .filter(move |binding| !at.is_within(binding.node()))
    };
    usable()
        .filter(|binding| binding.node().span().end <= pos)
        .last()
        .or_else(|| usable().last())
        .copied()
}

fn bindings_in<'a>(scope: NodeRef<'a>, stmts: &[NodeId], name: &str) -> Vec<Binding<'a>> {
    let mut out = Vec::new();
    collect_bindings(scope, stmts, name, &mut out);
    out
}

fn collect_bindings<'a>(scope: NodeRef<'a>, stmts: &[NodeId], name: &str, out: &mut Vec<Binding<'a>>) {
    for &stmt in stmts {
        let node = scope.child(stmt);
        match node.node() {
            Node::Function(_) | Node::Class(_) | Node::Target(_) => {
                if node.node().declared_name().is_some_and(|n| n == name) {
                    out.push(Binding::Declaration(node));
                }
            }
            Node::Import { names, .. } => {
                if names.iter().any(|n| n == name) {
                    out.push(Binding::Import(node));
                }
            }
            Node::If { body, orelse, .. } => {
                collect_bindings(scope, body, name, out);
                collect_bindings(scope, orelse, name, out);
            }
            _ => {}
        }
    }
}

impl SyntaxTree {
    /// The first target, function or parameter declaring `name`, in source
    /// order.
    pub fn find_declaration(&self, name: &str) -> Option<NodeRef<'_>> {
        self.preorder()
            .into_iter()
            .map(|id| self.node_ref(id))
            .find(|node| {
                matches!(
                    node.node(),
                    Node::Target(_) | Node::Function(_) | Node::Parameter(_)
                ) && node.node().declared_name().is_some_and(|n| n == name)
            })
    }

    /// Every target and function declaration, in source order.
    pub fn declarations(&self) -> Vec<(SmolStr, NodeRef<'_>)> {
        self.preorder()
            .into_iter()
            .map(|id| self.node_ref(id))
            .filter(|node| matches!(node.node(), Node::Target(_) | Node::Function(_)))
            .filter_map(|node| Some((node.node().declared_name()?.clone(), node)))
            .collect()
    }
}
