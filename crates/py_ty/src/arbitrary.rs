use proptest::prelude::{any, prop, prop_oneof, Arbitrary, BoxedStrategy, Just, Strategy};

use crate::{CallableParam, LiteralValue, Ty};

#[derive(Debug, Clone, Copy)]
pub struct RecursiveParams {
    pub depth: u32,
    pub desired_size: u32,
    pub expected_branch_size: u32,
}

impl Default for RecursiveParams {
    fn default() -> Self {
        Self {
            depth: 3,
            desired_size: 32,
            expected_branch_size: 3,
        }
    }
}

pub fn arb_literal() -> impl Strategy<Value = LiteralValue> {
    prop_oneof![
        (-50i64..50).prop_map(|i| LiteralValue::Int(i.into())),
        any::<bool>().prop_map(LiteralValue::Bool),
        "[a-z]{0,4}".prop_map(|s| LiteralValue::Str(s.into())),
    ]
}

pub fn arb_class() -> impl Strategy<Value = Ty> {
    prop_oneof![
        Just(Ty::nominal("int")),
        Just(Ty::nominal("str")),
        Just(Ty::nominal("bool")),
        Just(Ty::nominal("bytes")),
        Just(Ty::none()),
    ]
}

fn arb_ty(args: RecursiveParams) -> impl Strategy<Value = Ty> {
    let leaf = prop_oneof![
        arb_class(),
        arb_literal().prop_map(Ty::Literal),
        Just(Ty::Unknown),
    ];

    leaf.prop_recursive(
        args.depth,
        args.desired_size,
        args.expected_branch_size,
        |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(|elems| Ty::tuple(elems)),
                prop::collection::vec(inner.clone(), 2..4)
                    .prop_map(|members| Ty::union_all(members).unwrap_or(Ty::Unknown)),
                (prop::collection::vec(inner.clone(), 0..3), inner.clone()).prop_map(
                    |(params, ret)| Ty::callable(params.into_iter().map(CallableParam::anonymous), ret)
                ),
                inner.prop_map(|elem| Ty::generic("list", [elem])),
            ]
        },
    )
}

impl Arbitrary for Ty {
    type Parameters = RecursiveParams;
    type Strategy = BoxedStrategy<Ty>;

    fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
        arb_ty(args).boxed()
    }
}
