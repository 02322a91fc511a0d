mod display;
mod union;

#[cfg(any(test, feature = "proptest_support"))]
pub mod arbitrary;


use std::sync::Arc;

use derive_more::{Debug, From};
use num_bigint::BigInt;
use smol_str::SmolStr;

pub use union::Union;

/// The value a literal type is inhabited by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LiteralValue {
    #[debug("{_0}")]
    Int(BigInt),
    #[debug("{_0}")]
    Bool(bool),
    #[debug("{_0:?}")]
    Str(SmolStr),
}

/// One parameter slot of a callable. Anonymous slots come from signature
/// strings and `Callable[...]`, named ones from real function definitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[debug("{name:?}: {ty:?}")]
pub struct CallableParam {
    pub name: Option<SmolStr>,
    pub ty: TyRef,
}

impl CallableParam {
    pub fn anonymous(ty: impl Into<TyRef>) -> Self {
        Self {
            name: None,
            ty: ty.into(),
        }
    }

    pub fn named(name: impl Into<SmolStr>, ty: impl Into<TyRef>) -> Self {
        Self {
            name: Some(name.into()),
            ty: ty.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[debug("Callable({params:?} -> {ret:?})")]
pub struct CallableTy {
    pub params: Vec<CallableParam>,
    pub ret: TyRef,
}

/// A function's own value type, as seen through a first-class reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[debug("Function {name}({params:?} -> {ret:?})")]
pub struct FunctionTy {
    pub name: SmolStr,
    pub params: Vec<CallableParam>,
    pub ret: TyRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, From)]
pub enum Ty {
    /// Nothing better is known.
    #[from(skip)]
    Unknown,

    #[debug("Literal({_0:?})")]
    Literal(LiteralValue),

    #[debug("Union({_0:?})")]
    Union(Union),

    /// Fixed-arity product type.
    #[debug("Tuple({_0:?})")]
    #[from(skip)]
    Tuple(Vec<TyRef>),

    #[debug("{_0:?}")]
    Callable(CallableTy),

    /// Instance of a named class, optionally parameterized (`list[int]`).
    /// `None` and class objects (`type[A]`) are nominal too.
    #[debug("{name}{args:?}")]
    #[from(skip)]
    Nominal { name: SmolStr, args: Vec<TyRef> },

    #[debug("{_0:?}")]
    Function(FunctionTy),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[debug("{_0:?}")]
pub struct TyRef(pub Arc<Ty>);

impl From<Ty> for TyRef {
    fn from(value: Ty) -> Self {
        TyRef(Arc::new(value))
    }
}

impl std::ops::Deref for TyRef {
    type Target = Ty;
    fn deref(&self) -> &Ty {
        &self.0
    }
}

impl Ty {
    pub fn nominal(name: impl Into<SmolStr>) -> Ty {
        Ty::Nominal {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<SmolStr>, args: impl IntoIterator<Item = Ty>) -> Ty {
        Ty::Nominal {
            name: name.into(),
            args: args.into_iter().map(TyRef::from).collect(),
        }
    }

    pub fn none() -> Ty {
        Ty::nominal("None")
    }

    /// The type of a class object, `type[A]`.
    pub fn class_object(instance: Ty) -> Ty {
        Ty::generic("type", [instance])
    }

    pub fn tuple(elems: impl IntoIterator<Item = Ty>) -> Ty {
        Ty::Tuple(elems.into_iter().map(TyRef::from).collect())
    }

    pub fn callable(params: impl IntoIterator<Item = CallableParam>, ret: Ty) -> Ty {
        Ty::Callable(CallableTy {
            params: params.into_iter().collect(),
            ret: ret.into(),
        })
    }

    /// Union of two possibly-missing types. A missing side yields the other
    /// side; two missing sides yield nothing.
    pub fn union(a: Option<Ty>, b: Option<Ty>) -> Option<Ty> {
        match (a, b) {
            (None, other) | (other, None) => other,
            (Some(a), Some(b)) => Ty::union_all([a, b]),
        }
    }

    /// Union of all members, flattened and deduplicated. Empty input yields
    /// nothing rather than an empty union; a single member is returned as is.
    pub fn union_all(members: impl IntoIterator<Item = Ty>) -> Option<Ty> {
        let union: Union = members.into_iter().collect();
        match union.len() {
            0 => None,
            1 => union.iter().next().map(|only| Ty::clone(only)),
            _ => Some(Ty::Union(union)),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Ty::Unknown)
    }

    /// Return type of anything callable.
    pub fn return_ty(&self) -> Option<&Ty> {
        match self {
            Ty::Callable(callable) => Some(&callable.ret),
            Ty::Function(function) => Some(&function.ret),
            _ => None,
        }
    }
}
