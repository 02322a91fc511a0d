mod derive;
mod engine;
mod narrow;
mod overloads;
mod provider;
mod signature;

#[cfg(test)]
mod tests;

#[cfg(test)]
mod pbt;

use std::cell::RefCell;

use derive_more::Debug;
use py_ast::{Fragment, Node, NodeId, NodeRef};
use py_ty::Ty;
use rustc_hash::FxHashSet;

pub use derive::derive_type;
pub use overloads::{collect_overloads, overload_parameter_union, overload_return_union};
pub use provider::BasedTypeProvider;
pub use signature::{is_signature_string, split_signature};

/// What kind of analysis is running. Carried through every query unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EvalMode {
    /// Background analysis (inspections, highlighting).
    #[default]
    CodeAnalysis,
    /// An explicit user request such as "show type".
    UserInitiated,
}

/// The capabilities a type provider may call back into.
///
/// `parameter_type` and `return_type` run the whole query (providers first,
/// then the engine's own inference); everything else is plain engine
/// behaviour that never consults providers.
pub trait BaseEngine {
    fn mode(&self) -> EvalMode;

    /// Interpret a type hint with the standard typing rules. `None` when the
    /// node does not denote a type on its own (bare `Final`, a number, ...).
    fn annotation_type(&self, annotation: NodeRef<'_>) -> Option<Ty>;

    /// Materialize `text` as an expression anchored at `owner`.
    fn parse_fragment<'a>(&self, text: &str, owner: NodeRef<'a>) -> Option<Fragment<'a>> {
        Fragment::parse(text, owner)
    }

    /// Follow a reference through unannotated `x = y` aliases and return the
    /// declaration the chain ends at.
    fn follow_assignments<'a>(&self, reference: NodeRef<'a>) -> Option<NodeRef<'a>>;

    fn parameter_type(&self, param: NodeRef<'_>, func: NodeRef<'_>) -> Ty;

    fn return_type(&self, func: NodeRef<'_>) -> Ty;
}

/// Extension hooks asked before the engine's own inference.
///
/// Every method answers `None` for "no opinion", in which case the next
/// provider (and finally the engine) is asked.
#[allow(unused_variables)]
pub trait TypeProvider {
    /// Declared type of an assignment target.
    fn reference_type(&self, target: NodeRef<'_>, host: &dyn BaseEngine) -> Option<Ty> {
        None
    }

    fn parameter_type(
        &self,
        param: NodeRef<'_>,
        func: NodeRef<'_>,
        host: &dyn BaseEngine,
    ) -> Option<Ty> {
        None
    }

    fn return_type(&self, func: NodeRef<'_>, host: &dyn BaseEngine) -> Option<Ty> {
        None
    }

    /// Result type of calling `func` at `call`.
    fn call_type(
        &self,
        func: NodeRef<'_>,
        call: NodeRef<'_>,
        host: &dyn BaseEngine,
    ) -> Option<Ty> {
        None
    }

    /// Type of a name used as a value.
    fn reference_expression_type(
        &self,
        reference: NodeRef<'_>,
        host: &dyn BaseEngine,
    ) -> Option<Ty> {
        None
    }

    /// Type of a function used as a first-class value.
    fn callable_type(&self, func: NodeRef<'_>, host: &dyn BaseEngine) -> Option<Ty> {
        None
    }
}

/// Identity of a node across trees, for reentrancy guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeKey(usize, NodeId);

impl NodeKey {
    fn of(node: NodeRef<'_>) -> Self {
        NodeKey(node.tree() as *const _ as usize, node.id())
    }
}

/// One analysis session: a mode plus the providers consulted before the
/// engine. Holds no results between queries.
#[derive(Debug)]
pub struct TypeEvalContext {
    mode: EvalMode,
    #[debug(skip)]
    providers: Vec<Box<dyn TypeProvider>>,
    #[debug(skip)]
    in_progress: RefCell<FxHashSet<NodeKey>>,
}

impl TypeEvalContext {
    /// An engine with no providers installed.
    pub fn new(mode: EvalMode) -> Self {
        Self {
            mode,
            providers: Vec::new(),
            in_progress: RefCell::default(),
        }
    }

    /// An engine with [`BasedTypeProvider`] installed.
    pub fn with_extension(mode: EvalMode) -> Self {
        Self::new(mode).with_provider(BasedTypeProvider)
    }

    pub fn code_analysis() -> Self {
        Self::with_extension(EvalMode::CodeAnalysis)
    }

    pub fn user_initiated() -> Self {
        Self::with_extension(EvalMode::UserInitiated)
    }

    pub fn with_provider(mut self, provider: impl TypeProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn mode(&self) -> EvalMode {
        self.mode
    }

    fn ask<T>(&self, query: impl Fn(&dyn TypeProvider) -> Option<T>) -> Option<T> {
        self.providers.iter().find_map(|provider| query(provider.as_ref()))
    }

    /// Type of any declaration or expression.
    pub fn type_of(&self, node: NodeRef<'_>) -> Ty {
        match node.node() {
            Node::Target(_) => self.target_type(node),
            Node::Function(_) => self.callable_type(node),
            Node::Class(def) => Ty::class_object(Ty::nominal(def.name.clone())),
            Node::Parameter(_) => match node.enclosing_function() {
                Some(func) => self.parameter_type(node, func),
                None => Ty::Unknown,
            },
            _ => self.expression_type(node),
        }
    }

    pub fn target_type(&self, target: NodeRef<'_>) -> Ty {
        self.ask(|p| p.reference_type(target, self))
            .unwrap_or_else(|| self.infer_target(target))
    }

    pub fn parameter_type(&self, param: NodeRef<'_>, func: NodeRef<'_>) -> Ty {
        self.ask(|p| p.parameter_type(param, func, self))
            .unwrap_or_else(|| self.infer_parameter(param, func))
    }

    pub fn return_type(&self, func: NodeRef<'_>) -> Ty {
        self.ask(|p| p.return_type(func, self))
            .unwrap_or_else(|| self.infer_return(func))
    }

    pub fn call_type(&self, func: NodeRef<'_>, call: NodeRef<'_>) -> Ty {
        self.ask(|p| p.call_type(func, call, self))
            .unwrap_or_else(|| self.return_type(func))
    }

    /// Value type of an expression. Names go through the providers first.
    pub fn expression_type(&self, expr: NodeRef<'_>) -> Ty {
        if matches!(expr.node(), Node::Name(_)) {
            if let Some(ty) = self.ask(|p| p.reference_expression_type(expr, self)) {
                return ty;
            }
        }
        self.infer_value(expr)
    }

    pub fn callable_type(&self, func: NodeRef<'_>) -> Ty {
        self.ask(|p| p.callable_type(func, self))
            .unwrap_or_else(|| self.infer_callable(func))
    }

    /// Run `f` unless `node` is already being inferred further up the stack,
    /// in which case the answer is `Unknown`.
    fn guarded(&self, node: NodeRef<'_>, f: impl FnOnce() -> Ty) -> Ty {
        let key = NodeKey::of(node);
        if !self.in_progress.borrow_mut().insert(key) {
            log::trace!("recursive inference of {node:?} cut short");
            return Ty::Unknown;
        }
        let ty = f();
        self.in_progress.borrow_mut().remove(&key);
        ty
    }
}

impl BaseEngine for TypeEvalContext {
    fn mode(&self) -> EvalMode {
        self.mode
    }

    fn annotation_type(&self, annotation: NodeRef<'_>) -> Option<Ty> {
        self.interpret_annotation(annotation, 0)
    }

    fn follow_assignments<'a>(&self, reference: NodeRef<'a>) -> Option<NodeRef<'a>> {
        engine::follow_assignments(reference)
    }

    fn parameter_type(&self, param: NodeRef<'_>, func: NodeRef<'_>) -> Ty {
        TypeEvalContext::parameter_type(self, param, func)
    }

    fn return_type(&self, func: NodeRef<'_>) -> Ty {
        TypeEvalContext::return_type(self, func)
    }
}
