use py_ast::{Node, NodeRef};
use py_ty::Ty;

use crate::{BaseEngine, TypeEvalContext};

/// Type of `reference` inside the then-branch of an enclosing
/// `if isinstance(reference, T):`, innermost check first.
///
/// Narrowing stops at function and class boundaries and does not apply once
/// the name is rebound inside the branch.
pub(crate) fn isinstance_narrowing(reference: NodeRef<'_>, ctx: &TypeEvalContext) -> Option<Ty> {
    let Node::Name(name) = reference.node() else {
        return None;
    };
    if reference.is_synthetic() {
        return None;
    }
    let binding = reference.resolve_name();

    let mut inner = reference;
    for ancestor in reference.ancestors() {
        match ancestor.node() {
            Node::Function(_) | Node::Class(_) => return None,
            Node::If { cond, body, .. } if body.contains(&inner.id()) => {
                let rebound = binding.is_some_and(|b| b.node().is_within(ancestor));
                if !rebound {
                    if let Some(ty) = isinstance_check(ancestor.child(*cond), name, ctx) {
                        log::trace!("narrowed {name} to {ty}");
                        return Some(ty);
                    }
                }
            }
            _ => {}
        }
        inner = ancestor;
    }
    None
}

fn isinstance_check(cond: NodeRef<'_>, name: &str, ctx: &TypeEvalContext) -> Option<Ty> {
    let Node::Call { callee, args } = cond.node() else {
        return None;
    };
    let [subject, classinfo] = &args[..] else {
        return None;
    };
    let is_isinstance = matches!(cond.child(*callee).node(), Node::Name(f) if f == "isinstance");
    let is_subject = matches!(cond.child(*subject).node(), Node::Name(n) if n == name);
    if !(is_isinstance && is_subject) {
        return None;
    }
    classinfo_type(cond.child(*classinfo), ctx)
}

/// Instance type(s) named by the second `isinstance` argument.
fn classinfo_type(node: NodeRef<'_>, ctx: &TypeEvalContext) -> Option<Ty> {
    match node.node() {
        Node::Paren(inner) => classinfo_type(node.child(*inner), ctx),
        Node::Tuple(elems) => {
            Ty::union_all(elems.iter().filter_map(|&e| classinfo_type(node.child(e), ctx)))
        }
        _ => ctx.annotation_type(node),
    }
}
