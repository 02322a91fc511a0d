use py_ast::{Node, NodeRef};
use py_ty::{CallableParam, FunctionTy, Ty};

use crate::{
    collect_overloads, derive_type, overload_parameter_union, overload_return_union, BaseEngine,
    TypeProvider,
};

/// The extension's provider: literal/union/tuple/signature annotations and
/// sibling overloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasedTypeProvider;

impl TypeProvider for BasedTypeProvider {
    fn reference_type(&self, target: NodeRef<'_>, host: &dyn BaseEngine) -> Option<Ty> {
        let annotation = target.node().as_target()?.annotation?;
        derive_type(target.child(annotation), host, false)
    }

    fn parameter_type(
        &self,
        param: NodeRef<'_>,
        func: NodeRef<'_>,
        host: &dyn BaseEngine,
    ) -> Option<Ty> {
        let p = param.node().as_param()?;
        p.annotation
            .and_then(|annotation| derive_type(param.child(annotation), host, false))
            .or_else(|| overload_parameter_union(&p.name, &collect_overloads(func), host))
    }

    fn return_type(&self, func: NodeRef<'_>, host: &dyn BaseEngine) -> Option<Ty> {
        let def = func.node().as_function()?;
        def.returns
            .and_then(|annotation| derive_type(func.child(annotation), host, false))
            .or_else(|| overload_return_union(&collect_overloads(func), host))
    }

    /// Strict, so the engine's own call inference is not reentered.
    fn call_type(
        &self,
        func: NodeRef<'_>,
        _call: NodeRef<'_>,
        host: &dyn BaseEngine,
    ) -> Option<Ty> {
        let annotation = func.node().as_function()?.returns?;
        derive_type(func.child(annotation), host, true)
    }

    /// A name that is only an alias of an annotated parameter takes the
    /// parameter's annotation.
    fn reference_expression_type(
        &self,
        reference: NodeRef<'_>,
        host: &dyn BaseEngine,
    ) -> Option<Ty> {
        let decl = host.follow_assignments(reference)?;
        let annotation = decl.node().as_param()?.annotation?;
        derive_type(decl.child(annotation), host, true)
    }

    /// Parameters come from the full query chain, so overload unions show
    /// up; an explicit return annotation always wins over inference.
    fn callable_type(&self, func: NodeRef<'_>, host: &dyn BaseEngine) -> Option<Ty> {
        let def = func.node().as_function()?;
        let params = def
            .params
            .iter()
            .map(|&p| func.child(p))
            .filter_map(|param| match param.node() {
                Node::Parameter(p) => Some(CallableParam::named(
                    p.name.clone(),
                    host.parameter_type(param, func),
                )),
                _ => None,
            })
            .collect();
        let ret = def
            .returns
            .and_then(|annotation| derive_type(func.child(annotation), host, false))
            .unwrap_or_else(|| host.return_type(func));

        Some(Ty::Function(FunctionTy {
            name: def.name.clone(),
            params,
            ret: ret.into(),
        }))
    }
}
