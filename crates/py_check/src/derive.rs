// ==============================================================================
// Annotation derivation
// ==============================================================================
//
// Extra annotation forms on top of the standard typing rules: bare literals
// (`1 | 2`), `&`, tuple expressions as tuple types and quoted signature
// strings. Each rule answers `None` when it does not apply and the next one is
// tried, in this order:
//
//   literal -> union/intersection -> tuple -> signature string -> engine
//
// The last two are skipped in strict mode. Sub-expressions are always derived
// non-strictly.

use py_ast::{BinOp, Node, NodeRef, Number};
use py_ty::{LiteralValue, Ty};

use crate::{signature, BaseEngine};

pub fn derive_type(node: NodeRef<'_>, host: &dyn BaseEngine, strict: bool) -> Option<Ty> {
    literal_type(node)
        .or_else(|| union_type(node, host))
        .or_else(|| tuple_type(node, host))
        .or_else(|| {
            if strict {
                return None;
            }
            signature::signature_type(node, host)
                .or_else(|| host.annotation_type(node))
        })
}

fn derive_or_unknown(node: NodeRef<'_>, host: &dyn BaseEngine) -> Ty {
    derive_type(node, host, false).unwrap_or(Ty::Unknown)
}

fn literal_type(node: NodeRef<'_>) -> Option<Ty> {
    let value = match node.node() {
        Node::Number(Number::Int(i)) => LiteralValue::Int(i.clone()),
        Node::Bool(b) => LiteralValue::Bool(*b),
        _ => return None,
    };
    Some(Ty::Literal(value))
}

fn union_type(node: NodeRef<'_>, host: &dyn BaseEngine) -> Option<Ty> {
    let Node::Binary { op, lhs, rhs } = node.node() else {
        return None;
    };
    let lhs = node.child(*lhs);
    match op {
        BinOp::BitOr => {
            let rhs = node.child((*rhs)?);
            Ty::union(
                derive_type(lhs, host, false),
                derive_type(rhs, host, false),
            )
        }
        // Intersections are not modelled: `A & B` is `A`.
        BinOp::BitAnd => derive_type(lhs, host, false),
    }
}

fn tuple_type(node: NodeRef<'_>, host: &dyn BaseEngine) -> Option<Ty> {
    let elems = match node.node() {
        Node::Tuple(elems) => elems,
        Node::Paren(inner) => match node.child(*inner).node() {
            Node::Tuple(elems) => elems,
            // plain grouping, `(int | str)`
            _ => return derive_type(node.child(*inner), host, false),
        },
        _ => return None,
    };
    Some(Ty::tuple(
        elems.iter().map(|&e| derive_or_unknown(node.child(e), host)),
    ))
}

pub(crate) fn derive_all<'a>(
    nodes: impl IntoIterator<Item = NodeRef<'a>>,
    host: &dyn BaseEngine,
) -> Vec<Ty> {
    nodes
        .into_iter()
        .map(|node| derive_or_unknown(node, host))
        .collect()
}
