use py_ast::{Node, NodeRef};
use py_ty::{CallableParam, Ty};

use crate::derive::derive_all;
use crate::{derive_type, BaseEngine};

/// Whether a string's value has the shape `(...) -> R` or `def (...) -> R`.
pub fn is_signature_string(value: &str) -> bool {
    let value = value.trim();
    (value.starts_with("def (") || value.starts_with('(')) && value.contains("->")
}

/// Split a signature string at its first arrow into the parameter list (with
/// any `def` dropped) and the return type source.
pub fn split_signature(value: &str) -> Option<(&str, &str)> {
    // Only the first arrow splits. In `(int) -> (str) -> bool` the return
    // source is `(str) -> bool`, which is not an expression, so the string
    // as a whole derives to nothing rather than a curried callable.
    let (params, ret) = value.trim().split_once("->")?;
    let params = params.trim();
    let params = params.strip_prefix("def").unwrap_or(params).trim();
    Some((params, ret.trim()))
}

pub(crate) fn signature_type(node: NodeRef<'_>, host: &dyn BaseEngine) -> Option<Ty> {
    let Node::Str(value) = node.node() else {
        return None;
    };
    if !is_signature_string(value) {
        return None;
    }
    let (params_src, ret_src) = split_signature(value)?;

    let params_fragment = host.parse_fragment(params_src, node)?;
    let root = params_fragment.root();
    let params = match root.node() {
        Node::Tuple(elems) => derive_all(elems.iter().map(|&e| root.child(e)), host),
        Node::Paren(inner) => {
            let inner = root.child(*inner);
            match inner.node() {
                Node::Tuple(elems) => derive_all(elems.iter().map(|&e| inner.child(e)), host),
                _ => derive_all([inner], host),
            }
        }
        _ => {
            log::trace!("signature {value:?} has no parameter list");
            return None;
        }
    };

    let ret_fragment = host.parse_fragment(ret_src, node)?;
    let ret = derive_type(ret_fragment.root(), host, false).unwrap_or(Ty::Unknown);

    log::debug!("signature string {value:?} derived");
    Some(Ty::callable(
        params.into_iter().map(CallableParam::anonymous),
        ret,
    ))
}
