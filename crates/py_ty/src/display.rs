use std::fmt;

use itertools::Itertools;

use crate::{CallableParam, LiteralValue, Ty, TyRef, Union};

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Int(i) => write!(f, "{i}"),
            LiteralValue::Bool(true) => f.write_str("True"),
            LiteralValue::Bool(false) => f.write_str("False"),
            LiteralValue::Str(s) => write!(f, "'{}'", s.escape_default()),
        }
    }
}

impl fmt::Display for CallableParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if self.ty.is_unknown() => f.write_str(name),
            Some(name) => write!(f, "{name}: {}", self.ty),
            None => write!(f, "{}", self.ty),
        }
    }
}

impl fmt::Display for TyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Unknown => f.write_str("Any"),
            Ty::Literal(value) => write!(f, "Literal[{value}]"),
            Ty::Union(union) => fmt_union(union, f),
            Ty::Tuple(elems) if elems.is_empty() => f.write_str("tuple[()]"),
            Ty::Tuple(elems) => write!(f, "tuple[{}]", elems.iter().join(", ")),
            Ty::Callable(callable) => fmt_signature(&callable.params, &callable.ret, f),
            Ty::Function(function) => fmt_signature(&function.params, &function.ret, f),
            Ty::Nominal { name, args } if args.is_empty() => f.write_str(name),
            Ty::Nominal { name, args } => write!(f, "{name}[{}]", args.iter().join(", ")),
        }
    }
}

fn fmt_signature(params: &[CallableParam], ret: &Ty, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({}) -> {ret}", params.iter().join(", "))
}

/// Literal members collapse into one `Literal[...]` at the position of the
/// first of them; callables are parenthesized so their arrows stay readable.
fn fmt_union(union: &Union, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let literals: Vec<&LiteralValue> = union
        .iter()
        .filter_map(|member| match &**member {
            Ty::Literal(value) => Some(value),
            _ => None,
        })
        .collect();

    let mut parts = Vec::with_capacity(union.len());
    let mut literals_written = false;
    for member in union.iter() {
        match &**member {
            Ty::Literal(_) if literals_written => {}
            Ty::Literal(_) => {
                literals_written = true;
                parts.push(format!("Literal[{}]", literals.iter().join(", ")));
            }
            Ty::Callable(_) | Ty::Function(_) => parts.push(format!("({member})")),
            _ => parts.push(member.to_string()),
        }
    }
    f.write_str(&parts.join(" | "))
}
