// ==============================================================================
// Property-based tests for annotation derivation
// ==============================================================================
//
// Annotations are generated as source text (see py_ast::arbitrary) and placed
// after `expr: ` in a one-line file.
//
// Known limitations:
// - Only builtin class names appear as leaves, so name resolution through
//   classes in the file is not exercised here.
// - Nested signature strings are not generated; quoting inside quotes would
//   need escaping the generator does not do.

use proptest::prelude::{any, prop, prop_assert, prop_assert_eq, proptest, ProptestConfig};
use py_ast::arbitrary::{arb_annotation, arb_class_name, tuple_source};
use py_ty::Ty;

use crate::tests::{expr_types, MODES};
use crate::TypeEvalContext;

fn derived(annotation: &str) -> Vec<Ty> {
    expr_types(&format!("expr: {annotation}\n"), TypeEvalContext::with_extension)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn derivation_is_deterministic(annotation in arb_annotation()) {
        let first = derived(&annotation);
        prop_assert_eq!(first.len(), MODES.len());
        prop_assert!(first.windows(2).all(|pair| pair[0] == pair[1]));
        prop_assert_eq!(derived(&annotation), first);
    }

    #[test]
    fn intersection_is_its_left_operand(left in arb_annotation(), right in arb_annotation()) {
        let both = derived(&format!("({left}) & ({right})"));
        prop_assert_eq!(both, derived(&left));
    }

    #[test]
    fn tuples_keep_their_arity(elems in prop::collection::vec(arb_annotation(), 0..5)) {
        for ty in derived(&tuple_source(&elems)) {
            match ty {
                Ty::Tuple(members) => prop_assert_eq!(members.len(), elems.len()),
                other => prop_assert!(false, "expected a tuple, got {other}"),
            }
        }
    }

    #[test]
    fn int_unions_are_literal_unions(a in -100i64..100, b in -100i64..100) {
        let expected = if a == b {
            format!("Literal[{a}]")
        } else {
            format!("Literal[{a}, {b}]")
        };
        for ty in derived(&format!("{a} | {b}")) {
            prop_assert_eq!(ty.to_string(), expected.clone());
        }
    }

    #[test]
    fn signature_strings_become_callables(
        with_def in any::<bool>(),
        params in prop::collection::vec(arb_class_name(), 0..4),
        ret in arb_class_name(),
    ) {
        let prefix = if with_def { "def " } else { "" };
        let annotation = format!("\"{prefix}({}) -> {ret}\"", params.join(", "));
        let expected = format!("({}) -> {ret}", params.join(", "));
        for ty in derived(&annotation) {
            prop_assert!(matches!(&ty, Ty::Callable(c) if c.params.len() == params.len()));
            prop_assert_eq!(ty.to_string(), expected.clone());
        }
    }
}
