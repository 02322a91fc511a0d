use indoc::indoc;
use num_bigint::BigInt;

use crate::scope::Binding;
use crate::{parse_expression, parse_file, BinOp, Fragment, Node, Number, ParseError, SyntaxTree};

fn expr(src: &str) -> SyntaxTree {
    parse_expression(src).expect("expression should parse")
}

fn file(src: &str) -> SyntaxTree {
    parse_file(src).expect("file should parse")
}

#[test]
fn bitor_is_left_associative() {
    let tree = expr("1 | 2 | 3");
    let Node::Binary { op, lhs, rhs } = &tree[tree.root] else {
        panic!("expected a binary node, got {:?}", tree[tree.root]);
    };
    assert_eq!(*op, BinOp::BitOr);
    assert!(matches!(tree[*lhs], Node::Binary { .. }));
    assert_eq!(tree[rhs.unwrap()], Node::Number(Number::Int(BigInt::from(3))));
}

#[test]
fn bitand_binds_tighter_than_bitor() {
    let tree = expr("int | str & bytes");
    let Node::Binary { op, rhs, .. } = &tree[tree.root] else {
        panic!("expected a binary node");
    };
    assert_eq!(*op, BinOp::BitOr);
    assert!(matches!(
        tree[rhs.unwrap()],
        Node::Binary {
            op: BinOp::BitAnd,
            ..
        }
    ));
}

#[test]
fn dangling_operator_leaves_a_hole() {
    let tree = expr("int |");
    assert!(matches!(
        tree[tree.root],
        Node::Binary {
            op: BinOp::BitOr,
            rhs: None,
            ..
        }
    ));
}

#[test]
fn parenthesized_tuple_keeps_both_layers() {
    let tree = expr("(int, str)");
    let Node::Paren(inner) = tree[tree.root] else {
        panic!("expected parentheses");
    };
    let Node::Tuple(elems) = &tree[inner] else {
        panic!("expected a tuple inside the parentheses");
    };
    assert_eq!(elems.len(), 2);
}

#[test]
fn empty_parens_are_the_empty_tuple() {
    let tree = expr("()");
    assert_eq!(tree[tree.root], Node::Tuple(Box::default()));
}

#[test]
fn bare_and_trailing_comma_tuples() {
    let tree = expr("int, str");
    assert!(matches!(&tree[tree.root], Node::Tuple(elems) if elems.len() == 2));

    let tree = expr("(int,)");
    let Node::Paren(inner) = tree[tree.root] else {
        panic!("expected parentheses");
    };
    assert!(matches!(&tree[inner], Node::Tuple(elems) if elems.len() == 1));
}

#[test]
fn strings_are_unescaped() {
    let tree = expr(r#""(int) -> \"str\"""#);
    assert_eq!(tree[tree.root], Node::Str("(int) -> \"str\"".into()));

    let tree = expr("'single'");
    assert_eq!(tree[tree.root], Node::Str("single".into()));
}

#[test]
fn numbers_are_classified_by_their_text() {
    let big = "123456789012345678901234567890";
    let tree = expr(big);
    let expected: BigInt = big.parse().unwrap();
    assert_eq!(tree[tree.root], Node::Number(Number::Int(expected)));

    let tree = expr("1.0");
    assert_eq!(tree[tree.root], Node::Number(Number::Float("1.0".into())));
    let tree = expr("1.");
    assert_eq!(tree[tree.root], Node::Number(Number::Float("1.".into())));
}

#[test]
fn literals_and_postfix_chains() {
    assert_eq!(expr("-3")[expr("-3").root], Node::Number(Number::Int(BigInt::from(-3))));
    assert_eq!(expr("True")[expr("True").root], Node::Bool(true));
    assert_eq!(expr("None")[expr("None").root], Node::NoneLit);

    let tree = expr("typing.Literal[1, 2]");
    let Node::Subscript { value, index } = &tree[tree.root] else {
        panic!("expected a subscript");
    };
    assert!(matches!(&tree[*value], Node::Attribute { attr, .. } if attr == "Literal"));
    assert!(matches!(&tree[*index], Node::Tuple(elems) if elems.len() == 2));
}

#[test]
fn invalid_expression_is_an_error() {
    let err = parse_expression("(int, -> str").unwrap_err();
    assert!(matches!(err, ParseError::InvalidSyntax { .. }));
}

#[test]
fn overloads_parse_as_sibling_functions() {
    let tree = file(indoc! {"
        from typing import overload
        @overload
        def f(a: int) -> str: ...
        @overload
        def f(a: str) -> int: ...
        def f(a):
            expr = a
    "});

    let Node::Module(body) = &tree[tree.root] else {
        panic!("root is a module");
    };
    assert_eq!(body.len(), 4);
    assert!(matches!(&tree[body[0]], Node::Import { names, .. } if names[0] == "overload"));

    let first = tree[body[1]].as_function().expect("a function");
    assert_eq!(first.name, "f");
    assert_eq!(first.decorators.len(), 1);
    assert!(first.returns.is_some());

    let last = tree.node_ref(body[3]);
    assert_eq!(last.siblings().map(<[_]>::len), Some(4));

    let target = tree.find_declaration("expr").expect("expr is declared");
    assert_eq!(target.enclosing_function(), Some(last));
}

#[test]
fn comments_and_continuations() {
    let tree = file(indoc! {"
        # leading comment
        def f(a: int,  # first
              b: str) -> None:
            pass

        x: int = 1  # trailing
    "});
    let func = tree.find_declaration("f").expect("f is declared");
    assert_eq!(func.node().as_function().unwrap().params.len(), 2);
    let x = tree.find_declaration("x").expect("x is declared");
    assert!(x.node().as_target().unwrap().annotation.is_some());
}

#[test]
fn strings_and_comments_do_not_confuse_line_layout() {
    let tree = file(indoc! {r##"
        a: "(int) -> str" = "# not a comment"  # closing ) here is ignored (
        b: list["x: y"] = [
            "k",  # ]
            "v",
        ]
        def g(c: "(int, str) -> bool" = 1, d: Callable[[int, str], None] = None): ...
    "##});
    let Node::Module(body) = &tree[tree.root] else {
        panic!("root is a module");
    };
    assert_eq!(body.len(), 3);

    let a = tree.find_declaration("a").unwrap().node().as_target().unwrap();
    assert_eq!(tree[a.annotation.unwrap()], Node::Str("(int) -> str".into()));
    assert_eq!(tree[a.value.unwrap()], Node::Str("# not a comment".into()));

    let b = tree.find_declaration("b").unwrap().node().as_target().unwrap();
    assert!(matches!(tree[b.annotation.unwrap()], Node::Subscript { .. }));
    assert!(matches!(&tree[b.value.unwrap()], Node::List(elems) if elems.len() == 2));

    let g = tree.find_declaration("g").unwrap().node().as_function().unwrap();
    assert_eq!(g.params.len(), 2);
}

#[test]
fn if_elif_else_nest() {
    let tree = file(indoc! {"
        a: object
        if isinstance(a, int):
            b = a
        elif isinstance(a, str):
            b = a
        else:
            b = None
    "});
    let Node::Module(body) = &tree[tree.root] else {
        panic!("root is a module");
    };
    let Node::If { orelse, .. } = &tree[body[1]] else {
        panic!("expected an if statement");
    };
    assert!(matches!(&tree[orelse[0]], Node::If { orelse, .. } if orelse.len() == 1));
}

#[test]
fn unexpected_indent_is_reported() {
    let err = parse_file("x = 1\n    y = 2\n").unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedIndent { .. }));
}

#[test]
fn missing_block_is_reported() {
    let err = parse_file("def f():\nx = 1\n").unwrap_err();
    assert!(matches!(err, ParseError::ExpectedBlock { .. }));
}

#[test]
fn names_resolve_to_the_nearest_binding() {
    let tree = file(indoc! {"
        a = 1
        def g(a: str):
            b = a
        c = a
    "});

    let b = tree.find_declaration("b").unwrap();
    let in_g = b.child(b.node().as_target().unwrap().value.unwrap());
    let Some(Binding::Declaration(param)) = in_g.resolve_name() else {
        panic!("a resolves inside g");
    };
    assert!(matches!(param.node(), Node::Parameter(_)));

    let c = tree.find_declaration("c").unwrap();
    let at_module = c.child(c.node().as_target().unwrap().value.unwrap());
    let Some(Binding::Declaration(target)) = at_module.resolve_name() else {
        panic!("a resolves at module level");
    };
    assert!(matches!(target.node(), Node::Target(_)));
}

#[test]
fn later_definitions_win_for_earlier_uses_only_as_fallback() {
    let tree = file(indoc! {"
        def f(): ...
        def f(): ...
        x = f
    "});
    let x = tree.find_declaration("x").unwrap();
    let value = x.child(x.node().as_target().unwrap().value.unwrap());
    let resolved = value.resolve_name().unwrap().node();
    let Node::Module(body) = &tree[tree.root] else {
        panic!("root is a module");
    };
    assert_eq!(resolved.id(), body[1]);
}

#[test]
fn self_assignment_does_not_resolve_to_itself() {
    let tree = file("x = x\n");
    let x = tree.find_declaration("x").unwrap();
    let value = x.child(x.node().as_target().unwrap().value.unwrap());
    assert_eq!(value.resolve_name(), None);
}

#[test]
fn fragment_nodes_resolve_in_the_owner_file() {
    let tree = file(indoc! {"
        class A: ...
        expr: \"(A) -> A\"
    "});
    let target = tree.find_declaration("expr").unwrap();
    let owner = target.child(target.node().as_target().unwrap().annotation.unwrap());

    let fragment = Fragment::parse("A", owner).expect("fragment parses");
    let root = fragment.root();
    assert!(root.is_synthetic());
    assert_eq!(root.anchor(), owner);
    assert!(std::ptr::eq(root.context_file(), &tree));

    let resolved = root.resolve_name().expect("A resolves through the owner");
    assert!(matches!(resolved.node().node(), Node::Class(_)));
}

#[test]
fn nested_fragments_keep_the_outermost_owner() {
    let tree = file("expr: \"x\"\n");
    let target = tree.find_declaration("expr").unwrap();
    let owner = target.child(target.node().as_target().unwrap().annotation.unwrap());

    let outer = Fragment::parse("'inner'", owner).unwrap();
    let inner = Fragment::parse("int", outer.root()).unwrap();
    assert_eq!(inner.root().anchor(), owner);
}
