use proptest::prelude::{any, prop, prop_oneof, BoxedStrategy, Just, Strategy};

/// Annotation source text, as it would appear after `expr: `.
pub type AnnotationSrc = String;

pub fn arb_class_name() -> impl Strategy<Value = AnnotationSrc> {
    prop_oneof![
        Just("int".to_string()),
        Just("str".to_string()),
        Just("bool".to_string()),
        Just("float".to_string()),
        Just("bytes".to_string()),
    ]
}

pub fn arb_literal() -> impl Strategy<Value = AnnotationSrc> {
    prop_oneof![
        (-20i64..100).prop_map(|i| i.to_string()),
        any::<bool>().prop_map(|b| if b { "True" } else { "False" }.to_string()),
    ]
}

/// A quoted `(params) -> ret` signature over plain class names.
pub fn arb_signature() -> impl Strategy<Value = AnnotationSrc> {
    (
        any::<bool>(),
        prop::collection::vec(arb_class_name(), 0..4),
        arb_class_name(),
    )
        .prop_map(|(with_def, params, ret)| {
            let prefix = if with_def { "def " } else { "" };
            format!("\"{prefix}({}) -> {ret}\"", params.join(", "))
        })
}

pub fn tuple_source(elems: &[AnnotationSrc]) -> AnnotationSrc {
    match elems {
        [] => "()".to_string(),
        [single] => format!("({single},)"),
        many => format!("({})", many.join(", ")),
    }
}

/// Annotations mixing literals, class names, `|`, `&`, tuples and signature
/// strings. Operands are parenthesized so precedence never matters.
pub fn arb_annotation() -> BoxedStrategy<AnnotationSrc> {
    let leaf = prop_oneof![
        3 => arb_class_name(),
        3 => arb_literal(),
        1 => arb_signature(),
    ];

    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("({l}) | ({r})")),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("({l}) & ({r})")),
            prop::collection::vec(inner, 0..4).prop_map(|elems| tuple_source(&elems)),
        ]
    })
    .boxed()
}
