use la_arena::{Arena, ArenaMap};
use num_bigint::BigInt;
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use smol_str::SmolStr;

use crate::{BinOp, Node, NodeId, Number, Span};

#[derive(Parser)]
#[grammar = "expr.pest"]
pub(crate) struct ExprParser;

// box the error, pest errors are large
pub(crate) type PestError = Box<pest::error::Error<Rule>>;

/// Arena plus spans for a tree under construction.
#[derive(Default)]
pub(crate) struct TreeBuilder {
    pub(crate) nodes: Arena<Node>,
    pub(crate) spans: ArenaMap<NodeId, Span>,
}

impl TreeBuilder {
    pub(crate) fn alloc(&mut self, node: Node, span: Span) -> NodeId {
        let id = self.nodes.alloc(node);
        self.spans.insert(id, span);
        id
    }

    pub(crate) fn span_of(&self, id: NodeId) -> Span {
        self.spans.get(id).copied().unwrap_or_default()
    }

    /// Parse `text` as one expression. `offset` is where `text` starts in the
    /// full source, so spans point into the file rather than the snippet.
    pub(crate) fn expression(&mut self, text: &str, offset: usize) -> Result<NodeId, PestError> {
        let mut pairs = ExprParser::parse(Rule::fragment, text)?;
        let fragment = pairs.next().expect("fragment rule always produces a pair");
        let expression = fragment
            .into_inner()
            .find(|pair| pair.as_rule() == Rule::expression)
            .expect("fragment always contains an expression");
        Ok(self.lower_expression(expression, offset))
    }

    fn span(pair: &Pair<Rule>, offset: usize) -> Span {
        let span = pair.as_span();
        Span::new(span.start() + offset, span.end() + offset)
    }

    fn lower_expression(&mut self, pair: Pair<Rule>, offset: usize) -> NodeId {
        let span = Self::span(&pair, offset);
        let mut elems = Vec::new();
        let mut saw_comma = false;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::comma => saw_comma = true,
                _ => elems.push(self.lower(inner, offset)),
            }
        }

        if saw_comma {
            self.alloc(Node::Tuple(elems.into()), span)
        } else {
            // without a comma there is exactly one operand
            elems.pop().expect("expression has at least one operand")
        }
    }

    fn lower_binary(&mut self, pairs: Pairs<Rule>, offset: usize) -> NodeId {
        let mut pairs = pairs.peekable();
        let first = pairs.next().expect("binary rule has a left operand");
        let mut lhs = self.lower(first, offset);

        while let Some(op_pair) = pairs.next() {
            let op = match op_pair.as_rule() {
                Rule::or_op => BinOp::BitOr,
                Rule::and_op => BinOp::BitAnd,
                rule => unreachable!("unexpected binary operator rule {rule:?}"),
            };
            let op_end = Self::span(&op_pair, offset).end;
            let rhs = match pairs.peek().map(|p| p.as_rule()) {
                Some(Rule::or_op | Rule::and_op) | None => None,
                Some(_) => pairs.next().map(|p| self.lower(p, offset)),
            };

            let start = self.span_of(lhs).start;
            let end = rhs.map_or(op_end, |rhs| self.span_of(rhs).end);
            lhs = self.alloc(Node::Binary { op, lhs, rhs }, Span::new(start, end));
        }

        lhs
    }

    fn lower(&mut self, pair: Pair<Rule>, offset: usize) -> NodeId {
        let span = Self::span(&pair, offset);
        match pair.as_rule() {
            Rule::expression => self.lower_expression(pair, offset),
            Rule::bit_or | Rule::bit_and => self.lower_binary(pair.into_inner(), offset),
            Rule::primary => self.lower_primary(pair, offset),
            Rule::paren => match pair.into_inner().next() {
                Some(inner) => {
                    let inner = self.lower_expression(inner, offset);
                    self.alloc(Node::Paren(inner), span)
                }
                None => self.alloc(Node::Tuple(Box::default()), span),
            },
            Rule::list => {
                let elems: Vec<NodeId> = pair
                    .into_inner()
                    .map(|inner| self.lower(inner, offset))
                    .collect();
                self.alloc(Node::List(elems.into()), span)
            }
            Rule::ellipsis => self.alloc(Node::Ellipsis, span),
            Rule::number => {
                let text = pair.as_str();
                let number = match text.parse::<BigInt>() {
                    Ok(value) if !text.contains('.') => Number::Int(value),
                    _ => Number::Float(text.into()),
                };
                self.alloc(Node::Number(number), span)
            }
            Rule::string => {
                let quoted = pair.into_inner().next().expect("string has a quoted body");
                let raw = quoted.into_inner().next().map_or("", |inner| inner.as_str());
                self.alloc(Node::Str(unescape(raw)), span)
            }
            Rule::true_lit => self.alloc(Node::Bool(true), span),
            Rule::false_lit => self.alloc(Node::Bool(false), span),
            Rule::none_lit => self.alloc(Node::NoneLit, span),
            Rule::name => self.alloc(Node::Name(pair.as_str().into()), span),
            rule => unreachable!("lower: unexpected rule {rule:?}"),
        }
    }

    fn lower_primary(&mut self, pair: Pair<Rule>, offset: usize) -> NodeId {
        let mut inner = pair.into_inner();
        let atom = inner.next().expect("primary starts with an atom");
        let mut value = self.lower(atom, offset);

        for postfix in inner {
            let start = self.span_of(value).start;
            let span = Span::new(start, Self::span(&postfix, offset).end);
            let node = match postfix.as_rule() {
                Rule::call => {
                    let args: Vec<NodeId> = postfix
                        .into_inner()
                        .map(|arg| self.lower(arg, offset))
                        .collect();
                    Node::Call {
                        callee: value,
                        args: args.into(),
                    }
                }
                Rule::subscript => {
                    let index = postfix
                        .into_inner()
                        .next()
                        .expect("subscript holds an expression");
                    let index = self.lower_expression(index, offset);
                    Node::Subscript { value, index }
                }
                Rule::attribute => {
                    let attr = postfix
                        .into_inner()
                        .next()
                        .expect("attribute holds an identifier");
                    Node::Attribute {
                        value,
                        attr: attr.as_str().into(),
                    }
                }
                rule => unreachable!("unexpected postfix rule {rule:?}"),
            };
            value = self.alloc(node, span);
        }

        value
    }
}

fn unescape(raw: &str) -> SmolStr {
    if !raw.contains('\\') {
        return raw.into();
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out.into()
}
