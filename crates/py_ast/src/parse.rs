// ==============================================================================
// Statement parser
// ==============================================================================
//
// Indentation-aware, line-oriented parser for the supported Python subset.
// The `layout` grammar rules find logical lines first (comments blanked,
// bracketed continuations joined), then blocks are built by indentation. Every expression inside a
// statement goes through the pest expression grammar with its file offset so
// spans always point into the parsed file.

use miette::{Diagnostic, SourceSpan};
use pest::Parser;
use smol_str::SmolStr;
use thiserror::Error;

use crate::expr::{ExprParser, PestError, Rule, TreeBuilder};
use crate::{ClassDef, FunctionDef, Node, NodeId, Param, Span, SyntaxTree, TargetDef};

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ParseError {
    #[error("invalid syntax: {message}")]
    #[diagnostic(code(py_ast::invalid_syntax))]
    InvalidSyntax {
        message: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("unexpected indent")]
    #[diagnostic(code(py_ast::unexpected_indent))]
    UnexpectedIndent {
        #[label("this line is indented deeper than its block")]
        span: SourceSpan,
    },

    #[error("expected an indented block")]
    #[diagnostic(code(py_ast::expected_block))]
    ExpectedBlock {
        #[label("the body of this statement is missing")]
        span: SourceSpan,
    },

    #[error("malformed {what}")]
    #[diagnostic(code(py_ast::malformed))]
    Malformed {
        what: &'static str,
        #[label("could not read this {what}")]
        span: SourceSpan,
    },
}

impl ParseError {
    fn from_pest(err: PestError, offset: usize) -> Self {
        let (start, end) = match err.location {
            pest::error::InputLocation::Pos(pos) => (pos, pos),
            pest::error::InputLocation::Span(span) => span,
        };
        ParseError::InvalidSyntax {
            message: err.variant.message().into_owned(),
            span: Span::new(start + offset, end + offset).into(),
        }
    }
}

/// Parse a whole file into a tree rooted at a `Module` node.
pub fn parse_file(source: &str) -> Result<SyntaxTree, ParseError> {
    let (cleaned, spans) = layout(source)?;
    let lines = logical_lines(&cleaned, &spans);
    let mut parser = StmtParser {
        builder: TreeBuilder::default(),
        lines: &lines,
        pos: 0,
    };
    let body = parser.block(0)?;
    if let Some(line) = lines.get(parser.pos) {
        return Err(ParseError::UnexpectedIndent {
            span: line.text.span().into(),
        });
    }

    let root = parser
        .builder
        .alloc(Node::Module(body.into()), Span::new(0, source.len()));
    let TreeBuilder { nodes, spans } = parser.builder;
    Ok(SyntaxTree::new(nodes, spans, root, source.to_owned()))
}

/// Parse a standalone expression, the host's "expression from fragment".
pub fn parse_expression(source: &str) -> Result<SyntaxTree, ParseError> {
    let mut builder = TreeBuilder::default();
    let root = builder
        .expression(source, 0)
        .map_err(|err| ParseError::from_pest(err, 0))?;
    let TreeBuilder { nodes, spans } = builder;
    Ok(SyntaxTree::new(nodes, spans, root, source.to_owned()))
}

// ------------------------------------------------------------------------------
// Source segments
// ------------------------------------------------------------------------------

/// A slice of the source together with its byte offset.
#[derive(Debug, Clone, Copy)]
struct Segment<'s> {
    start: usize,
    text: &'s str,
}

impl<'s> Segment<'s> {
    fn span(&self) -> Span {
        Span::new(self.start, self.start + self.text.len())
    }

    fn trim(&self) -> Segment<'s> {
        let trimmed_start = self.text.trim_start();
        let start = self.start + (self.text.len() - trimmed_start.len());
        Segment {
            start,
            text: trimmed_start.trim_end(),
        }
    }

    fn slice(&self, from: usize, to: usize) -> Segment<'s> {
        Segment {
            start: self.start + from,
            text: &self.text[from..to],
        }
    }

    fn from(&self, from: usize) -> Segment<'s> {
        self.slice(from, self.text.len())
    }

    fn to(&self, to: usize) -> Segment<'s> {
        self.slice(0, to)
    }

    fn strip_keyword(&self, keyword: &str) -> Option<Segment<'s>> {
        let rest = self.text.strip_prefix(keyword)?;
        let boundary = rest
            .chars()
            .next()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'));
        boundary.then(|| self.from(keyword.len()).trim())
    }
}

#[derive(Debug)]
struct Line<'s> {
    indent: usize,
    text: Segment<'s>,
}

/// Blank out comments (byte offsets stay intact) and find the logical lines:
/// lines with open brackets are joined with their continuation.
fn layout(source: &str) -> Result<(String, Vec<Span>), ParseError> {
    let layout = ExprParser::parse(Rule::layout, source)
        .map_err(|err| ParseError::from_pest(Box::new(err), 0))?;

    let mut cleaned = source.to_owned();
    let mut lines = Vec::new();
    for line in layout.flatten().filter(|pair| pair.as_rule() == Rule::layout_line) {
        let span = line.as_span();
        lines.push(Span::new(span.start(), span.end()));
        for comment in line.into_inner().flatten().filter(|pair| pair.as_rule() == Rule::comment) {
            let span = comment.as_span();
            let blank = " ".repeat(span.end() - span.start());
            cleaned.replace_range(span.start()..span.end(), &blank);
        }
    }
    Ok((cleaned, lines))
}

/// Blank logical lines are dropped.
fn logical_lines<'s>(source: &'s str, spans: &[Span]) -> Vec<Line<'s>> {
    spans
        .iter()
        .filter_map(|span| {
            let text = source[span.start..span.end].trim_end();
            let content = text.trim_start();
            if content.is_empty() {
                return None;
            }
            let indent = text.len() - content.len();
            Some(Line {
                indent,
                text: Segment {
                    start: span.start + indent,
                    text: content,
                },
            })
        })
        .collect()
}

/// Byte index of the first position outside brackets and strings where
/// `needle(before, rest)` holds.
fn find_top_level(text: &str, needle: impl Fn(&str, &str) -> bool) -> Option<usize> {
    let scan = ExprParser::parse(Rule::scan, text).ok()?;
    scan.flatten()
        .filter(|pair| pair.as_rule() == Rule::top_char)
        .map(|pair| pair.as_span().start())
        .find(|&i| needle(&text[..i], &text[i..]))
}

/// Index of the bracket closing the one at index 0.
fn matching_close(text: &str) -> Option<usize> {
    let group = ExprParser::parse(Rule::group, text).ok()?.next()?;
    let close = group
        .into_inner()
        .last()
        .filter(|pair| pair.as_rule() == Rule::close_br)?;
    Some(close.as_span().start())
}

fn starts_with_colon(_before: &str, rest: &str) -> bool {
    rest.starts_with(':')
}

/// A plain `=`, not part of `==`, `<=`, `>=`, `!=` or `:=`.
fn is_assign(before: &str, rest: &str) -> bool {
    rest.starts_with('=')
        && !rest.starts_with("==")
        && !before.ends_with(['=', '<', '>', '!', ':'])
}

/// Split at top-level commas.
fn split_commas(seg: Segment<'_>) -> Vec<Segment<'_>> {
    let mut parts = Vec::new();
    let mut rest = seg;
    while let Some(idx) = find_top_level(rest.text, |_, s| s.starts_with(',')) {
        parts.push(rest.to(idx).trim());
        rest = rest.from(idx + 1);
    }
    let last = rest.trim();
    if !last.text.is_empty() {
        parts.push(last);
    }
    parts
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

// ------------------------------------------------------------------------------
// Statements
// ------------------------------------------------------------------------------

struct StmtParser<'s, 'l> {
    builder: TreeBuilder,
    lines: &'l [Line<'s>],
    pos: usize,
}

impl<'s> StmtParser<'s, '_> {
    fn expr(&mut self, seg: Segment<'_>) -> Result<NodeId, ParseError> {
        let seg = seg.trim();
        self.builder
            .expression(seg.text, seg.start)
            .map_err(|err| ParseError::from_pest(err, seg.start))
    }

    fn block(&mut self, indent: usize) -> Result<Vec<NodeId>, ParseError> {
        let mut body = Vec::new();
        let mut decorators = Vec::new();

        while let Some(line) = self.lines.get(self.pos) {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(ParseError::UnexpectedIndent {
                    span: line.text.span().into(),
                });
            }
            let text = line.text;
            self.pos += 1;

            if text.text.starts_with('@') {
                decorators.push(self.expr(text.from(1))?);
                continue;
            }

            let stmt = self.statement(text, indent, std::mem::take(&mut decorators))?;
            body.push(stmt);
        }

        if let Some(&dangling) = decorators.last() {
            return Err(ParseError::Malformed {
                what: "decorator",
                span: self.builder.span_of(dangling).into(),
            });
        }

        Ok(body)
    }

    /// Body after a `:`: either the rest of the header line or an indented block.
    fn suite(
        &mut self,
        header: Segment<'s>,
        inline: Segment<'s>,
        indent: usize,
    ) -> Result<Vec<NodeId>, ParseError> {
        if !inline.text.is_empty() {
            return Ok(vec![self.simple_statement(inline)?]);
        }
        match self.lines.get(self.pos) {
            Some(next) if next.indent > indent => self.block(next.indent),
            _ => Err(ParseError::ExpectedBlock {
                span: header.span().into(),
            }),
        }
    }

    /// Split `head: rest` at the header colon.
    fn header_colon(seg: Segment<'s>, what: &'static str) -> Result<(Segment<'s>, Segment<'s>), ParseError> {
        let idx = find_top_level(seg.text, starts_with_colon).ok_or(ParseError::Malformed {
            what,
            span: seg.span().into(),
        })?;
        Ok((seg.to(idx).trim(), seg.from(idx + 1).trim()))
    }

    fn statement(
        &mut self,
        text: Segment<'s>,
        indent: usize,
        decorators: Vec<NodeId>,
    ) -> Result<NodeId, ParseError> {
        if let Some(rest) = text.strip_keyword("def") {
            return self.function(text, rest, indent, decorators);
        }
        if let Some(rest) = text.strip_keyword("class") {
            return self.class(text, rest, indent);
        }
        if let Some(rest) = text.strip_keyword("if") {
            return self.if_statement(text, rest, indent);
        }
        if !decorators.is_empty() {
            return Err(ParseError::Malformed {
                what: "decorator",
                span: text.span().into(),
            });
        }
        self.simple_statement(text)
    }

    fn simple_statement(&mut self, text: Segment<'s>) -> Result<NodeId, ParseError> {
        let span = text.span();

        if text.strip_keyword("pass").is_some_and(|rest| rest.text.is_empty()) {
            return Ok(self.builder.alloc(Node::Pass, span));
        }
        if let Some(rest) = text.strip_keyword("return") {
            let value = match rest.text.is_empty() {
                true => None,
                false => Some(self.expr(rest)?),
            };
            return Ok(self.builder.alloc(Node::Return(value), span));
        }
        if let Some(rest) = text.strip_keyword("import") {
            let names = split_commas(rest)
                .into_iter()
                .map(|part| import_binding(part.text, true))
                .collect::<Vec<_>>();
            return Ok(self.builder.alloc(
                Node::Import {
                    module: None,
                    names: names.into(),
                },
                span,
            ));
        }
        if let Some(rest) = text.strip_keyword("from") {
            let idx = rest.text.find(" import ").ok_or(ParseError::Malformed {
                what: "import",
                span: span.into(),
            })?;
            let module: SmolStr = rest.text[..idx].trim().into();
            let names_seg = rest.from(idx + " import ".len()).trim();
            let names_text = names_seg
                .text
                .trim_start_matches('(')
                .trim_end_matches(')');
            let names = names_text
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| import_binding(part, false))
                .collect::<Vec<_>>();
            return Ok(self.builder.alloc(
                Node::Import {
                    module: Some(module),
                    names: names.into(),
                },
                span,
            ));
        }

        if let Some(target) = self.target(text)? {
            return Ok(target);
        }

        let value = self.expr(text)?;
        Ok(self.builder.alloc(Node::ExprStmt(value), span))
    }

    /// `name = value`, `name: annotation` or `name: annotation = value`.
    fn target(&mut self, text: Segment<'s>) -> Result<Option<NodeId>, ParseError> {
        let colon = find_top_level(text.text, starts_with_colon);
        let assign = find_top_level(text.text, is_assign);

        let name_end = match (colon, assign) {
            (Some(c), Some(a)) => c.min(a),
            (Some(c), None) => c,
            (None, Some(a)) => a,
            (None, None) => return Ok(None),
        };
        let name = text.to(name_end).trim();
        if !is_ident(name.text) {
            return Ok(None);
        }

        let (annotation, value) = match (colon, assign) {
            (Some(c), Some(a)) if c < a => {
                (Some(self.expr(text.slice(c + 1, a))?), Some(self.expr(text.from(a + 1))?))
            }
            (_, Some(a)) => (None, Some(self.expr(text.from(a + 1))?)),
            (Some(c), None) => (Some(self.expr(text.from(c + 1))?), None),
            (None, None) => (None, None),
        };

        let def = TargetDef {
            name: name.text.into(),
            annotation,
            value,
        };
        Ok(Some(self.builder.alloc(Node::Target(def), text.span())))
    }

    fn function(
        &mut self,
        text: Segment<'s>,
        rest: Segment<'s>,
        indent: usize,
        decorators: Vec<NodeId>,
    ) -> Result<NodeId, ParseError> {
        let malformed = || ParseError::Malformed {
            what: "function definition",
            span: text.span().into(),
        };

        let open = rest.text.find('(').ok_or_else(malformed)?;
        let name = rest.to(open).trim();
        if !is_ident(name.text) {
            return Err(malformed());
        }

        let after_open = rest.from(open);
        let close = matching_close(after_open.text).ok_or_else(malformed)?;
        let params_seg = after_open.slice(1, close);
        let after_params = after_open.from(close + 1).trim();

        let (signature_rest, inline) = Self::header_colon(after_params, "function definition")?;
        let returns = match signature_rest.text.strip_prefix("->") {
            Some(_) => Some(self.expr(signature_rest.from(2))?),
            None if signature_rest.text.is_empty() => None,
            None => return Err(malformed()),
        };

        let mut params = Vec::new();
        for part in split_commas(params_seg) {
            if let Some(param) = self.parameter(part)? {
                params.push(param);
            }
        }

        let body = self.suite(text, inline, indent)?;
        let end = body
            .last()
            .map_or(text.span().end, |&last| self.builder.span_of(last).end);
        let start = decorators
            .first()
            .map_or(text.start, |&first| self.builder.span_of(first).start - 1);

        let def = FunctionDef {
            name: name.text.into(),
            decorators: decorators.into(),
            params: params.into(),
            returns,
            body: body.into(),
        };
        Ok(self.builder.alloc(Node::Function(def), Span::new(start, end)))
    }

    fn parameter(&mut self, part: Segment<'s>) -> Result<Option<NodeId>, ParseError> {
        // bare `*` and `/` separators bind nothing
        if matches!(part.text, "*" | "/") {
            return Ok(None);
        }
        let stripped = part.text.trim_start_matches('*');
        let part = part.from(part.text.len() - stripped.len());

        let colon = find_top_level(part.text, starts_with_colon);
        let assign = find_top_level(part.text, is_assign);
        let name_end = [colon, assign].into_iter().flatten().min().unwrap_or(part.text.len());
        let name = part.to(name_end).trim();
        if !is_ident(name.text) {
            return Err(ParseError::Malformed {
                what: "parameter",
                span: part.span().into(),
            });
        }

        let annotation = match colon {
            Some(c) => Some(self.expr(part.slice(c + 1, assign.unwrap_or(part.text.len())))?),
            None => None,
        };
        let default = match assign {
            Some(a) => Some(self.expr(part.from(a + 1))?),
            None => None,
        };

        let param = Param {
            name: name.text.into(),
            annotation,
            default,
        };
        Ok(Some(self.builder.alloc(Node::Parameter(param), part.span())))
    }

    fn class(&mut self, text: Segment<'s>, rest: Segment<'s>, indent: usize) -> Result<NodeId, ParseError> {
        let (head, inline) = Self::header_colon(rest, "class definition")?;
        let (name, bases) = match head.text.find('(') {
            Some(open) => {
                let inner_end = head.text.rfind(')').ok_or(ParseError::Malformed {
                    what: "class definition",
                    span: text.span().into(),
                })?;
                let bases = split_commas(head.slice(open + 1, inner_end))
                    .into_iter()
                    .map(|base| self.expr(base))
                    .collect::<Result<Vec<_>, _>>()?;
                (head.to(open).trim(), bases)
            }
            None => (head, Vec::new()),
        };
        if !is_ident(name.text) {
            return Err(ParseError::Malformed {
                what: "class definition",
                span: text.span().into(),
            });
        }

        let body = self.suite(text, inline, indent)?;
        let end = body
            .last()
            .map_or(text.span().end, |&last| self.builder.span_of(last).end);
        let def = ClassDef {
            name: name.text.into(),
            bases: bases.into(),
            body: body.into(),
        };
        Ok(self.builder.alloc(Node::Class(def), Span::new(text.start, end)))
    }

    fn if_statement(&mut self, text: Segment<'s>, rest: Segment<'s>, indent: usize) -> Result<NodeId, ParseError> {
        let (cond, inline) = Self::header_colon(rest, "if statement")?;
        let cond = self.expr(cond)?;
        let body = self.suite(text, inline, indent)?;

        let mut orelse = Vec::new();
        if let Some(next) = self.lines.get(self.pos).filter(|l| l.indent == indent) {
            let next_text = next.text;
            if let Some(elif_rest) = next_text.strip_keyword("elif") {
                self.pos += 1;
                orelse.push(self.if_statement(next_text, elif_rest, indent)?);
            } else if let Some(else_rest) = next_text.strip_keyword("else") {
                self.pos += 1;
                let (_, inline) = Self::header_colon(else_rest, "else clause")?;
                orelse = self.suite(next_text, inline, indent)?;
            }
        }

        let last = orelse.last().or(body.last());
        let end = last.map_or(text.span().end, |&last| self.builder.span_of(last).end);
        Ok(self.builder.alloc(
            Node::If {
                cond,
                body: body.into(),
                orelse: orelse.into(),
            },
            Span::new(text.start, end),
        ))
    }
}

/// The name an import item binds: `a.b` binds `a` for plain imports,
/// `x as y` binds `y`.
fn import_binding(item: &str, plain: bool) -> SmolStr {
    let item = item.trim();
    if let Some((_, alias)) = item.split_once(" as ") {
        return alias.trim().into();
    }
    match plain {
        true => item.split('.').next().unwrap_or(item).into(),
        false => item.into(),
    }
}
