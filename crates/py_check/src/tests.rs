use indoc::indoc;
use py_ast::{parse_file, Node, SyntaxTree};
use py_ty::{CallableParam, FunctionTy, Ty};

use crate::{
    collect_overloads, is_signature_string, split_signature, BaseEngine, EvalMode,
    TypeEvalContext, TypeProvider,
};

pub const MODES: [EvalMode; 2] = [EvalMode::CodeAnalysis, EvalMode::UserInitiated];

pub fn parse(src: &str) -> SyntaxTree {
    parse_file(src).expect("fixture should parse")
}

/// Type of the first `expr` declaration in `src`, one entry per mode.
pub fn expr_types(src: &str, ctx: impl Fn(EvalMode) -> TypeEvalContext) -> Vec<Ty> {
    let tree = parse(src);
    let expr = tree.find_declaration("expr").expect("fixture declares expr");
    MODES.iter().map(|&mode| ctx(mode).type_of(expr)).collect()
}

#[track_caller]
pub fn expect_expr_type(src: &str, expected: &str) {
    for (mode, ty) in MODES.iter().zip(expr_types(src, TypeEvalContext::with_extension)) {
        assert_eq!(ty.to_string(), expected, "failed in {mode:?}");
    }
}

#[track_caller]
fn expect_engine_only_type(src: &str, expected: &str) {
    for (mode, ty) in MODES.iter().zip(expr_types(src, TypeEvalContext::new)) {
        assert_eq!(ty.to_string(), expected, "failed in {mode:?}");
    }
}

macro_rules! test_case {
    ($name:ident, $file:tt, $expected:expr) => {
        #[test]
        fn $name() {
            let file = indoc! { $file };
            expect_expr_type(file, $expected);
        }
    };
}

fn int() -> Ty {
    Ty::nominal("int")
}

fn str_() -> Ty {
    Ty::nominal("str")
}

// -- annotation forms ---------------------------------------------------------

test_case!(bare_literal, "expr: 1 | 2", "Literal[1, 2]");

test_case!(bool_literals, "expr: True | False | 1", "Literal[True, False, 1]");

test_case!(literal_mixed_with_class, "expr: 1 | str | 2", "Literal[1, 2] | str");

test_case!(tuple_literal, "expr: (int, str)", "tuple[int, str]");

test_case!(single_element_tuple, "expr: (int,)", "tuple[int]");

test_case!(empty_tuple, "expr: ()", "tuple[()]");

test_case!(
    nested_tuples,
    "expr: (1 | 2, (int, str))",
    "tuple[Literal[1, 2], tuple[int, str]]"
);

test_case!(
    underivable_tuple_element_is_unknown,
    "expr: (int, 1.5)",
    "tuple[int, Any]"
);

test_case!(parenthesized_union_is_grouping, "expr: (int | None)", "int | None");

test_case!(intersection, "expr: int & str", "int");

test_case!(intersection_keeps_left_union, "expr: (1 | 2) & str", "Literal[1, 2]");

test_case!(
    callable,
    r#"
        expr: "(int, str) -> str"
    "#,
    "(int, str) -> str"
);

test_case!(
    callable_with_def_prefix,
    r#"
        expr: "def (int) -> str"
    "#,
    "(int) -> str"
);

test_case!(
    zero_parameter_callable,
    r#"
        expr: "() -> None"
    "#,
    "() -> None"
);

test_case!(
    callable_with_extension_types,
    r#"
        expr: "(1 | 2) -> (int, str)"
    "#,
    "(Literal[1, 2]) -> tuple[int, str]"
);

test_case!(
    callable_resolves_names_in_the_file,
    r#"
        class A: ...
        expr: "(A) -> A"
    "#,
    "(A) -> A"
);

test_case!(
    chained_arrows_are_not_a_signature,
    r#"
        expr: "(int) -> (str) -> bool"
    "#,
    "Any"
);

test_case!(
    malformed_signature,
    r#"
        expr: "(int, -> str"
    "#,
    "Any"
);

test_case!(
    plain_string_is_a_forward_reference,
    r#"
        class A: ...
        expr: "A"
    "#,
    "A"
);

test_case!(dangling_union, "expr: int |", "Any");

test_case!(underivable_union_side_is_dropped, "expr: int | 1.5", "int");

test_case!(
    ints_past_64_bits_stay_literal,
    "expr: 99999999999999999999 | 1",
    "Literal[99999999999999999999, 1]"
);

test_case!(
    standard_hints_still_work,
    "
    from typing import Optional
    expr: dict[str, Optional[int]]
    ",
    "dict[str, int | None]"
);

test_case!(pep604_inside_generic, "expr: list[int | None]", "list[int | None]");

// -- overloads ----------------------------------------------------------------

test_case!(
    infer_overload_parameter,
    "
    from typing import overload
    @overload
    def f(a: int) -> str: ...
    @overload
    def f(a: str) -> int: ...
    def f(a):
        expr = a
    ",
    "str | int"
);

test_case!(
    own_annotation_beats_overloads,
    "
    @overload
    def f(a: int) -> str: ...
    def f(a: bytes):
        expr = a
    ",
    "bytes"
);

test_case!(
    underivable_annotation_falls_back_to_overloads,
    "
    @overload
    def f(a: int) -> str: ...
    def f(a: 1.5):
        expr = a
    ",
    "int"
);

test_case!(
    overloads_only_look_backwards,
    "
    def f(a):
        expr = a
    @overload
    def f(a: int) -> str: ...
    ",
    "Any"
);

test_case!(
    overloads_stay_in_their_scope,
    "
    def f(a: int): ...
    class C:
        def f(self, a: str): ...
        def f(self, a):
            expr = a
    ",
    "str"
);

test_case!(
    unannotated_overload_returns_fall_back_to_inference,
    "
    def f(a: int): ...
    def f(a):
        return 'x'
    expr = f
    ",
    "(a: int) -> str"
);

#[test]
fn infer_overload_function_value() {
    let src = indoc! {"
        from typing import overload
        @overload
        def f(a: int) -> str: ...
        @overload
        def f(a: str) -> int: ...
        def f(a):
            return 1
        expr = f
    "};
    let either = Ty::union_all([str_(), int()]).unwrap();
    let expected = Ty::Function(FunctionTy {
        name: "f".into(),
        params: vec![CallableParam::named("a", either.clone())],
        ret: either.into(),
    });
    for ty in expr_types(src, TypeEvalContext::with_extension) {
        assert_eq!(ty, expected);
        assert!(ty.to_string().starts_with("(a: str | int) -> "));
    }
}

#[test]
fn collected_overloads_are_nearest_first() {
    let tree = parse(indoc! {"
        def f(a: int): ...
        def g(): ...
        def f(a: str): ...
        def f(a): ...
        def f(a: bytes): ...
    "});
    let Node::Module(body) = &tree[tree.root] else {
        panic!("root is a module");
    };
    let implementation = tree.node_ref(body[3]);
    let ids: Vec<_> = collect_overloads(implementation)
        .iter()
        .map(|f| f.id())
        .collect();
    assert_eq!(ids, vec![body[3], body[2], body[0]]);
}

// -- fallback paths -------------------------------------------------------------

test_case!(
    constructor,
    "
    class A:
        def __init__(self) -> None: ...
    expr = A()
    ",
    "A"
);

test_case!(
    narrowing,
    "
    a: object
    if isinstance(a, int):
        expr = a
    ",
    "int"
);

test_case!(
    narrowing_to_several_classes,
    "
    a: object
    if isinstance(a, (int, str)):
        expr = a
    ",
    "int | str"
);

test_case!(
    no_narrowing_in_else,
    "
    a: object
    if isinstance(a, int):
        pass
    else:
        expr = a
    ",
    "object"
);

test_case!(
    bare_final,
    "
    from typing import Final
    expr: Final = 1
    ",
    "int"
);

test_case!(class_object, "class A: ...\nexpr = A", "type[A]");

test_case!(
    inferred_return,
    "
    def f(x):
        if x:
            return 1
        return 'a'
    expr = f(1)
    ",
    "int | str"
);

test_case!(
    recursive_return_is_unknown,
    "
    def f():
        return f()
    expr = f()
    ",
    "Any"
);

test_case!(
    method_receiver,
    "
    class A:
        def m(self):
            expr = self
    ",
    "A"
);

// -- call sites and aliases -------------------------------------------------------

test_case!(
    call_site_uses_strict_derivation,
    "
    def f() -> 1 | 2: ...
    expr = f()
    ",
    "Literal[1, 2]"
);

test_case!(
    call_site_falls_back_to_return_type,
    r#"
    def f() -> "(int) -> str": ...
    expr = f()
    "#,
    "(int) -> str"
);

test_case!(
    constructors_ignore_call_site_rules,
    "
    class A:
        def __init__(self) -> 1 | 2: ...
    expr = A()
    ",
    "A"
);

test_case!(
    alias_of_parameter_uses_its_annotation,
    "
    def g(a: 1 | 2):
        b = a
        expr = b
    ",
    "Literal[1, 2]"
);

test_case!(
    annotated_function_value_keeps_its_return,
    "
    def f(a: int) -> 1 | 2:
        return a
    expr = f
    ",
    "(a: int) -> Literal[1, 2]"
);

#[test]
fn engine_alone_does_not_know_the_extension_forms() {
    expect_engine_only_type("expr: 1 | 2", "Any");
    expect_engine_only_type("expr: (int, str)", "Any");
    expect_engine_only_type("def g(a: 1 | 2):\n    b = a\n    expr = b\n", "Any");
    expect_engine_only_type("expr: int | str", "int | str");
}

#[test]
fn queries_are_idempotent() {
    let src = indoc! {"
        @overload
        def f(a: int) -> str: ...
        def f(a):
            return f(a)
        expr = f
    "};
    let tree = parse(src);
    let expr = tree.find_declaration("expr").unwrap();
    let ctx = TypeEvalContext::code_analysis();
    let first = ctx.type_of(expr);
    assert_eq!(ctx.type_of(expr), first);
    assert_eq!(TypeEvalContext::user_initiated().type_of(expr), first);
}

// -- provider chain ---------------------------------------------------------------

struct AlwaysBytes;

impl TypeProvider for AlwaysBytes {
    fn reference_type(&self, _target: py_ast::NodeRef<'_>, host: &dyn BaseEngine) -> Option<Ty> {
        assert_eq!(host.mode(), EvalMode::UserInitiated);
        Some(Ty::nominal("bytes"))
    }
}

#[test]
fn first_provider_with_an_opinion_wins() {
    let tree = parse("expr: 1 | 2\n");
    let expr = tree.find_declaration("expr").unwrap();

    let ctx = TypeEvalContext::new(EvalMode::UserInitiated)
        .with_provider(AlwaysBytes)
        .with_provider(crate::BasedTypeProvider);
    assert_eq!(ctx.type_of(expr).to_string(), "bytes");

    let ctx = TypeEvalContext::with_extension(EvalMode::UserInitiated).with_provider(AlwaysBytes);
    assert_eq!(ctx.type_of(expr).to_string(), "Literal[1, 2]");
}

// -- signature micro-format ---------------------------------------------------------

#[test]
fn signature_shape_detection() {
    assert!(is_signature_string("(int) -> str"));
    assert!(is_signature_string("  def (int) -> str  "));
    assert!(is_signature_string("() -> None"));
    assert!(!is_signature_string("def(int) -> str"));
    assert!(!is_signature_string("int -> str"));
    assert!(!is_signature_string("(int, str)"));
}

#[test]
fn signature_splits_at_the_first_arrow() {
    assert_eq!(split_signature("def (int) -> str"), Some(("(int)", "str")));
    assert_eq!(
        split_signature("(int) -> (str) -> bool"),
        Some(("(int)", "(str) -> bool"))
    );
    assert_eq!(split_signature("(int)"), None);
}
