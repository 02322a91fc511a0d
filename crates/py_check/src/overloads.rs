use py_ast::{Node, NodeRef};
use py_ty::Ty;

use crate::{derive_type, BaseEngine};

/// `func` and the same-named functions declared before it in the same
/// statement list, nearest first.
pub fn collect_overloads<'a>(func: NodeRef<'a>) -> Vec<NodeRef<'a>> {
    let Some(def) = func.node().as_function() else {
        return Vec::new();
    };
    let Some(siblings) = func.siblings() else {
        return vec![func];
    };
    let upto = siblings
        .iter()
        .position(|&id| id == func.id())
        .map_or(0, |pos| pos + 1);

    siblings[..upto]
        .iter()
        .rev()
        .map(|&id| func.child(id))
        .filter(|sibling| {
            matches!(sibling.node(), Node::Function(other) if other.name == def.name)
        })
        .collect()
}

/// Union of the annotations of parameter `name` across an overload set.
/// `None` when no overload annotates it.
pub fn overload_parameter_union(
    name: &str,
    overloads: &[NodeRef<'_>],
    host: &dyn BaseEngine,
) -> Option<Ty> {
    let annotated = overloads.iter().filter_map(|func| {
        let def = func.node().as_function()?;
        def.params
            .iter()
            .map(|&p| func.child(p))
            .find(|param| param.node().declared_name().is_some_and(|n| n == name))
            .and_then(|param| Some(param.child(param.node().as_param()?.annotation?)))
    });
    union_of(annotated, host)
}

/// Union of the return annotations across an overload set. `None` when no
/// overload annotates its return.
pub fn overload_return_union(overloads: &[NodeRef<'_>], host: &dyn BaseEngine) -> Option<Ty> {
    let annotated = overloads.iter().filter_map(|func| {
        let returns = func.node().as_function()?.returns?;
        Some(func.child(returns))
    });
    union_of(annotated, host)
}

// TODO: members follow the walk (nearest overload first), not declaration order.
fn union_of<'a>(
    annotations: impl Iterator<Item = NodeRef<'a>>,
    host: &dyn BaseEngine,
) -> Option<Ty> {
    Ty::union_all(annotations.filter_map(|annotation| derive_type(annotation, host, false)))
}
