// ==============================================================================
// Base inference
// ==============================================================================
//
// The engine's own answers, used whenever every provider declines: standard
// type-hint interpretation, value inference for expressions, unannotated
// returns and parameters, and alias chains.

use py_ast::scope::Binding;
use py_ast::{BinOp, Node, NodeId, NodeRef, Number};
use py_ty::{CallableParam, FunctionTy, LiteralValue, Ty};
use smol_str::SmolStr;

use crate::{narrow, BaseEngine, TypeEvalContext};

/// Bound on alias chains and nested forward references.
const MAX_ALIAS_DEPTH: usize = 32;

const BUILTIN_CLASSES: &[&str] = &[
    "object",
    "int",
    "float",
    "complex",
    "bool",
    "str",
    "bytes",
    "list",
    "dict",
    "set",
    "frozenset",
    "tuple",
    "type",
];

const TYPING_MODULES: &[&str] = &["typing", "typing_extensions", "t"];

fn is_builtin_class(name: &str) -> bool {
    BUILTIN_CLASSES.contains(&name)
}

/// `typing` spellings of builtin generics.
fn canonical(name: &str) -> &str {
    match name {
        "List" => "list",
        "Dict" => "dict",
        "Set" => "set",
        "FrozenSet" => "frozenset",
        "Tuple" => "tuple",
        "Type" => "type",
        other => other,
    }
}

/// Meaning of an unsubscripted typing name.
fn special_name(name: &str) -> Option<Ty> {
    match canonical(name) {
        "Any" => Some(Ty::Unknown),
        class if is_builtin_class(class) => Some(Ty::nominal(class)),
        _ => None,
    }
}

/// `typing.X` and friends.
fn typing_member<'a>(node: NodeRef<'a>) -> Option<&'a SmolStr> {
    let Node::Attribute { value, attr } = node.node() else {
        return None;
    };
    match node.child(*value).node() {
        Node::Name(module) if TYPING_MODULES.contains(&module.as_str()) => Some(attr),
        _ => None,
    }
}

fn is_bare_final(node: NodeRef<'_>) -> bool {
    match node.node() {
        Node::Name(name) => name == "Final",
        Node::Attribute { .. } => typing_member(node).is_some_and(|attr| attr == "Final"),
        _ => false,
    }
}

fn literal_value(node: NodeRef<'_>) -> Option<Ty> {
    match node.node() {
        Node::Number(Number::Int(i)) => Some(Ty::Literal(LiteralValue::Int(i.clone()))),
        Node::Bool(b) => Some(Ty::Literal(LiteralValue::Bool(*b))),
        Node::Str(s) => Some(Ty::Literal(LiteralValue::Str(s.clone()))),
        Node::NoneLit => Some(Ty::none()),
        _ => None,
    }
}

fn collect_returns<'a>(scope: NodeRef<'a>, stmts: &[NodeId], out: &mut Vec<NodeRef<'a>>) {
    for &stmt in stmts {
        let node = scope.child(stmt);
        match node.node() {
            Node::Return(_) => out.push(node),
            Node::If { body, orelse, .. } => {
                collect_returns(scope, body, out);
                collect_returns(scope, orelse, out);
            }
            _ => {}
        }
    }
}

pub(crate) fn follow_assignments<'a>(reference: NodeRef<'a>) -> Option<NodeRef<'a>> {
    let mut current = reference;
    for _ in 0..MAX_ALIAS_DEPTH {
        let decl = current.resolve_name()?.node();
        match decl.node() {
            Node::Target(def) if def.annotation.is_none() => match def.value {
                Some(value) if matches!(decl.tree()[value], Node::Name(_)) => {
                    current = decl.child(value);
                }
                _ => return Some(decl),
            },
            _ => return Some(decl),
        }
    }
    log::debug!("assignment chain from {reference:?} too long");
    None
}

impl TypeEvalContext {
    pub(crate) fn interpret_annotation(&self, node: NodeRef<'_>, depth: usize) -> Option<Ty> {
        if depth > MAX_ALIAS_DEPTH {
            log::debug!("annotation {:?} nests too deeply", node.text());
            return None;
        }
        match node.node() {
            Node::NoneLit => Some(Ty::none()),
            // forward reference
            Node::Str(text) => {
                let fragment = self.parse_fragment(text, node)?;
                self.interpret_annotation(fragment.root(), depth + 1)
            }
            Node::Paren(inner) => self.interpret_annotation(node.child(*inner), depth),
            Node::Binary {
                op: BinOp::BitOr,
                lhs,
                rhs,
            } => {
                let rhs = (*rhs)?;
                Ty::union(
                    self.interpret_annotation(node.child(*lhs), depth),
                    self.interpret_annotation(node.child(rhs), depth),
                )
            }
            Node::Name(name) => self.named_annotation(node, name, depth),
            Node::Attribute { .. } => special_name(typing_member(node)?),
            Node::Subscript { value, index } => {
                self.subscript_annotation(node.child(*value), node.child(*index), depth)
            }
            _ => None,
        }
    }

    fn named_annotation(&self, node: NodeRef<'_>, name: &str, depth: usize) -> Option<Ty> {
        match node.resolve_name() {
            Some(Binding::Declaration(decl)) => match decl.node() {
                Node::Class(def) => Some(Ty::nominal(def.name.clone())),
                // `Alias = int`
                Node::Target(def) if def.annotation.is_none() => {
                    self.interpret_annotation(decl.child(def.value?), depth + 1)
                }
                _ => None,
            },
            Some(Binding::Import(_)) | None => special_name(name),
        }
    }

    fn subscript_annotation(
        &self,
        head: NodeRef<'_>,
        index: NodeRef<'_>,
        depth: usize,
    ) -> Option<Ty> {
        let args: Vec<NodeRef<'_>> = match index.node() {
            Node::Tuple(elems) => elems.iter().map(|&e| index.child(e)).collect(),
            _ => vec![index],
        };
        let arg_ty = |arg: NodeRef<'_>| self.interpret_annotation(arg, depth).unwrap_or(Ty::Unknown);

        let head_name = match head.node() {
            Node::Name(name) => match head.resolve_name() {
                Some(Binding::Declaration(decl)) => {
                    let def = decl.node().as_class()?;
                    return Some(Ty::generic(def.name.clone(), args.into_iter().map(arg_ty)));
                }
                _ => name,
            },
            Node::Attribute { .. } => typing_member(head)?,
            _ => return None,
        };

        match canonical(head_name) {
            "Final" | "ClassVar" | "Annotated" => self.interpret_annotation(*args.first()?, depth),
            "Optional" => Ty::union(Some(arg_ty(*args.first()?)), Some(Ty::none())),
            "Union" => Ty::union_all(args.into_iter().map(arg_ty)),
            "Literal" => Ty::union_all(args.into_iter().filter_map(literal_value)),
            "tuple" => Some(Ty::tuple(args.into_iter().map(arg_ty))),
            "type" => Some(Ty::class_object(arg_ty(*args.first()?))),
            "Callable" => {
                let params: Vec<CallableParam> = match args.first().map(|p| (p, p.node())) {
                    Some((list, Node::List(elems))) => elems
                        .iter()
                        .map(|&e| CallableParam::anonymous(arg_ty(list.child(e))))
                        .collect(),
                    _ => Vec::new(),
                };
                let ret = args.get(1).map_or(Ty::Unknown, |&r| arg_ty(r));
                Some(Ty::callable(params, ret))
            }
            class if is_builtin_class(class) => {
                Some(Ty::generic(class, args.into_iter().map(arg_ty)))
            }
            _ => None,
        }
    }

    pub(crate) fn infer_target(&self, target: NodeRef<'_>) -> Ty {
        let Some(def) = target.node().as_target() else {
            return Ty::Unknown;
        };
        self.guarded(target, || {
            let value_ty = || {
                def.value
                    .map_or(Ty::Unknown, |v| self.expression_type(target.child(v)))
            };
            match def.annotation.map(|a| target.child(a)) {
                Some(annotation) => match self.interpret_annotation(annotation, 0) {
                    Some(ty) => ty,
                    None if is_bare_final(annotation) => value_ty(),
                    None => Ty::Unknown,
                },
                None => value_ty(),
            }
        })
    }

    pub(crate) fn infer_parameter(&self, param: NodeRef<'_>, func: NodeRef<'_>) -> Ty {
        let Some(p) = param.node().as_param() else {
            return Ty::Unknown;
        };
        if let Some(annotation) = p.annotation {
            return self
                .interpret_annotation(param.child(annotation), 0)
                .unwrap_or(Ty::Unknown);
        }

        // `self` of a method
        let is_receiver = func
            .node()
            .as_function()
            .is_some_and(|def| def.params.first() == Some(&param.id()));
        if is_receiver {
            if let Some(class) = func.parent().and_then(|p| p.node().as_class()) {
                return Ty::nominal(class.name.clone());
            }
        }

        match p.default {
            Some(default) => self.expression_type(param.child(default)),
            None => Ty::Unknown,
        }
    }

    pub(crate) fn infer_return(&self, func: NodeRef<'_>) -> Ty {
        let Some(def) = func.node().as_function() else {
            return Ty::Unknown;
        };
        if let Some(annotation) = def.returns {
            return self
                .interpret_annotation(func.child(annotation), 0)
                .unwrap_or(Ty::Unknown);
        }

        self.guarded(func, || {
            let mut returns = Vec::new();
            collect_returns(func, &def.body, &mut returns);
            if returns.is_empty() {
                return Ty::none();
            }
            let tys = returns.into_iter().map(|ret| match ret.node() {
                Node::Return(Some(value)) => self.expression_type(ret.child(*value)),
                _ => Ty::none(),
            });
            Ty::union_all(tys).unwrap_or(Ty::Unknown)
        })
    }

    pub(crate) fn infer_callable(&self, func: NodeRef<'_>) -> Ty {
        let Some(def) = func.node().as_function() else {
            return Ty::Unknown;
        };
        let params = def
            .params
            .iter()
            .map(|&p| {
                let param = func.child(p);
                let name = param.node().declared_name().cloned().unwrap_or_default();
                CallableParam::named(name, self.parameter_type(param, func))
            })
            .collect();
        Ty::Function(FunctionTy {
            name: def.name.clone(),
            params,
            ret: self.return_type(func).into(),
        })
    }

    pub(crate) fn infer_value(&self, expr: NodeRef<'_>) -> Ty {
        match expr.node() {
            // Literal types only come from annotations; values are their class.
            Node::Number(Number::Int(_)) => Ty::nominal("int"),
            Node::Number(Number::Float(_)) => Ty::nominal("float"),
            Node::Bool(_) => Ty::nominal("bool"),
            Node::Str(_) => Ty::nominal("str"),
            Node::NoneLit => Ty::none(),
            Node::Ellipsis => Ty::nominal("ellipsis"),
            Node::Name(name) => self.name_value(expr, name),
            Node::Paren(inner) => self.expression_type(expr.child(*inner)),
            Node::Tuple(elems) => {
                Ty::tuple(elems.iter().map(|&e| self.expression_type(expr.child(e))))
            }
            Node::List(elems) => {
                let elem = Ty::union_all(elems.iter().map(|&e| self.expression_type(expr.child(e))));
                Ty::generic("list", [elem.unwrap_or(Ty::Unknown)])
            }
            Node::Call { callee, .. } => self.call_value(expr, expr.child(*callee)),
            _ => Ty::Unknown,
        }
    }

    fn name_value(&self, expr: NodeRef<'_>, name: &str) -> Ty {
        if let Some(narrowed) = narrow::isinstance_narrowing(expr, self) {
            return narrowed;
        }
        match expr.resolve_name() {
            Some(Binding::Declaration(decl)) => match decl.node() {
                Node::Target(_) => self.target_type(decl),
                Node::Function(_) => self.callable_type(decl),
                Node::Class(def) => Ty::class_object(Ty::nominal(def.name.clone())),
                Node::Parameter(_) => decl
                    .enclosing_function()
                    .map_or(Ty::Unknown, |func| self.parameter_type(decl, func)),
                _ => Ty::Unknown,
            },
            Some(Binding::Import(_)) => Ty::Unknown,
            None if is_builtin_class(name) => Ty::class_object(Ty::nominal(name)),
            None => Ty::Unknown,
        }
    }

    /// Functions go through the call-site query; class objects always
    /// construct an instance of the class.
    fn call_value(&self, call: NodeRef<'_>, callee: NodeRef<'_>) -> Ty {
        if let Node::Name(name) = callee.node() {
            match callee.resolve_name() {
                Some(Binding::Declaration(decl)) if decl.node().as_function().is_some() => {
                    return self.call_type(decl, call);
                }
                None if name == "isinstance" => return Ty::nominal("bool"),
                _ => {}
            }
        }

        match self.expression_type(callee) {
            Ty::Nominal { name, args } if name.as_str() == "type" => {
                args.first().map_or(Ty::Unknown, |instance| Ty::clone(instance))
            }
            callee_ty => callee_ty.return_ty().cloned().unwrap_or(Ty::Unknown),
        }
    }
}
