//! Parser for crisp source code.
//!
//! Transforms the token stream from the lexer into an AST using chumsky
//! combinators over a token slice. Byte spans are turned into line/column
//! positions in a single pass after parsing succeeds.
//!
//! A parse either produces the whole program or fails: there is no partial
//! AST. Editor tooling that needs something from broken input re-parses a
//! repaired slice of the source instead (see [`crate::eager`]).

use std::fmt;

use chumsky::{input::ValueInput, prelude::*};
use crisp_types::{Location, Position};

use crate::ast::{BinaryOp, CommandExpression, CommandOpt, Node, NodeKind, Program};
use crate::lexer::{self, HexLiteral, Token};

/// Span type used throughout the parser.
pub type Span = SimpleSpan;

type Extra<'tokens> = extra::Err<Rich<'tokens, Token, Span>>;

/// Parse error with location and the set of tokens that would have fit.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: std::ops::Range<usize>,
    pub position: Position,
    pub expected: Vec<String>,
    pub found: Option<String>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    fn from_rich(err: Rich<'_, Token, Span>, index: &LineIndex) -> Self {
        let span = *err.span();
        ParseError {
            message: err.to_string(),
            span: span.start..span.end,
            position: index.position(span.start),
            expected: err.expected().map(|p| p.to_string()).collect(),
            found: err.found().map(|t| t.to_string()),
        }
    }
}

/// Maps byte offsets to 1-based lines and 0-based columns.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { line_starts }
    }

    pub fn position(&self, offset: usize) -> Position {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        Position::new(line + 1, offset - self.line_starts[line], offset)
    }

    /// Byte offset where a 1-based line starts.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        line.checked_sub(1).and_then(|i| self.line_starts.get(i).copied())
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn resolve(&self, loc: &mut Option<Location>) {
        if let Some(loc) = loc {
            loc.start = self.position(loc.start.offset);
            loc.end = self.position(loc.end.offset);
        }
    }

    fn resolve_command(&self, command: &mut CommandExpression) {
        self.resolve(&mut command.loc);
        self.resolve(&mut command.name_loc);
        for arg in &mut command.args {
            self.resolve_node(arg);
        }
        for opt in &mut command.opts {
            self.resolve(&mut opt.loc);
            self.resolve_node(&mut opt.value);
        }
    }

    fn resolve_node(&self, node: &mut Node) {
        self.resolve(&mut node.loc);
        match &mut node.kind {
            NodeKind::Array(items) | NodeKind::Helper { args: items, .. } => {
                items.iter_mut().for_each(|n| self.resolve_node(n))
            }
            NodeKind::Binary { left, right, .. } => {
                self.resolve_node(left);
                self.resolve_node(right);
            }
            NodeKind::Block(body) => body.iter_mut().for_each(|c| self.resolve_command(c)),
            NodeKind::Call { target, args, .. } => {
                self.resolve_node(target);
                args.iter_mut().for_each(|n| self.resolve_node(n));
            }
            NodeKind::As { left, .. } => self.resolve_node(left),
            NodeKind::Address(_)
            | NodeKind::Bool(_)
            | NodeKind::Bytes(_)
            | NodeKind::Number(_)
            | NodeKind::String(_)
            | NodeKind::Identifier(_)
            | NodeKind::Variable(_) => {}
        }
    }
}

/// Parse crisp source code into a Program AST.
pub fn parse(source: &str) -> Result<Program, Vec<ParseError>> {
    let index = LineIndex::new(source);

    let tokens = lexer::tokenize(source).map_err(|errs| {
        errs.into_iter()
            .map(|e| ParseError {
                message: format!("lexer error: {}", e.token),
                position: index.position(e.span.start),
                span: e.span,
                expected: Vec::new(),
                found: None,
            })
            .collect::<Vec<_>>()
    })?;

    let tokens: Vec<(Token, Span)> = tokens
        .into_iter()
        .map(|spanned| (spanned.token, spanned.span.into()))
        .collect();

    let end_span: Span = (source.len()..source.len()).into();

    let mut program = program_parser()
        .parse(tokens.as_slice().map(end_span, |(t, s)| (t, s)))
        .into_result()
        .map_err(|errs| {
            errs.into_iter()
                .map(|e| ParseError::from_rich(e, &index))
                .collect::<Vec<_>>()
        })?;

    for command in &mut program.body {
        index.resolve_command(command);
    }
    Ok(program)
}

/// Positional argument or named option, in source order.
enum CommandItem {
    Arg(Node),
    Opt(CommandOpt),
}

/// Location holding raw byte offsets; lines and columns are filled in by
/// [`LineIndex`] once the whole parse has succeeded.
fn raw_loc(span: Span) -> Option<Location> {
    Some(Location::new(
        Position::new(0, 0, span.start),
        Position::new(0, 0, span.end),
    ))
}

fn node(kind: NodeKind, span: Span) -> Node {
    Node::new(kind, raw_loc(span))
}

fn cover(a: Option<Location>, b: Option<Location>) -> Option<Location> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.cover(&b)),
        (a, b) => a.or(b),
    }
}

fn binary(left: Node, (op, right): (BinaryOp, Node)) -> Node {
    let loc = cover(left.loc, right.loc);
    Node::new(
        NodeKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        loc,
    )
}

fn build_command(
    word: String,
    name_span: Span,
    items: Vec<CommandItem>,
    span: Span,
) -> CommandExpression {
    let (module, name) = match word.split_once(':') {
        Some((module, name)) => (Some(module.to_string()), name.to_string()),
        None => (None, word),
    };

    let mut args = Vec::new();
    let mut opts = Vec::new();
    for item in items {
        match item {
            CommandItem::Arg(node) => args.push(node),
            CommandItem::Opt(opt) => opts.push(opt),
        }
    }

    CommandExpression {
        module,
        name,
        args,
        opts,
        loc: raw_loc(span),
        name_loc: raw_loc(name_span),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Parser Combinators - generic over input type
// ═══════════════════════════════════════════════════════════════════════════

/// Top-level program parser.
fn program_parser<'tokens, I>() -> impl Parser<'tokens, I, Program, Extra<'tokens>>
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    line_parser(command_parser())
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
        .map(|lines| Program {
            body: lines.into_iter().flatten().collect(),
        })
}

/// A blank line, or one command and its terminator.
///
/// A command ends at a newline, at end of input, or right before the `)`
/// that closes the enclosing block (left unconsumed for the block parser).
fn line_parser<'tokens, I, P>(
    command: P,
) -> impl Parser<'tokens, I, Option<CommandExpression>, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
    P: Parser<'tokens, I, CommandExpression, Extra<'tokens>> + Clone,
{
    let terminator = choice((
        just(Token::Newline).ignored(),
        end(),
        just(Token::RParen).rewind().ignored(),
    ));

    choice((
        just(Token::Newline).to(None),
        command.then_ignore(terminator).map(Some),
    ))
}

/// Command parser: `[module:]name item*`, where items may contain blocks
/// of further commands.
fn command_parser<'tokens, I>(
) -> impl Parser<'tokens, I, CommandExpression, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    recursive(|command| {
        let block = just(Token::LParen)
            .then(just(Token::Newline))
            .ignore_then(line_parser(command).repeated().collect::<Vec<_>>())
            .then_ignore(just(Token::RParen))
            .map_with(|lines, e| {
                node(NodeKind::Block(lines.into_iter().flatten().collect()), e.span())
            })
            .labelled("block");

        let opt = select! { Token::LongOpt(name) => name }
            .then(expr_parser())
            .map_with(|(name, value), e| CommandOpt {
                name,
                value,
                loc: raw_loc(e.span()),
            })
            .labelled("option");

        let item = choice((
            opt.map(CommandItem::Opt),
            block.map(CommandItem::Arg),
            expr_parser().map(CommandItem::Arg),
        ));

        select! { Token::Ident(name) => name }
            .map_with(|name, e| (name, e.span()))
            .labelled("command")
            .then(item.repeated().collect::<Vec<_>>())
            .map_with(|((word, name_span), items), e| {
                build_command(word, name_span, items, e.span())
            })
            .boxed()
    })
}

/// Expression parser: literals, variables, helpers, arrays, parenthesised
/// arithmetic, `::` call chains and a trailing `as alias`.
fn expr_parser<'tokens, I>() -> impl Parser<'tokens, I, Node, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    recursive(|expr| {
        let list = expr
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>();

        let literal = select! {
            Token::Hex(HexLiteral::Address(a)) => NodeKind::Address(a),
            Token::Hex(HexLiteral::Bytes(b)) => NodeKind::Bytes(b),
            Token::Number(n) => NodeKind::Number(n),
            Token::String(s) => NodeKind::String(s),
            Token::True => NodeKind::Bool(true),
            Token::False => NodeKind::Bool(false),
            Token::Variable(v) => NodeKind::Variable(v),
            Token::Ident(s) => NodeKind::Identifier(s),
        }
        .map_with(|kind, e| node(kind, e.span()));

        // `@name(` is a single token, so args only attach when the paren
        // touches the helper name.
        let helper = choice((
            select! { Token::HelperCall(name) => name }
                .then(list.clone())
                .then_ignore(just(Token::RParen)),
            select! { Token::Helper(name) => name }.map(|name| (name, Vec::new())),
        ))
        .map_with(|(name, args), e| node(NodeKind::Helper { name, args }, e.span()))
        .labelled("helper");

        let array = list
            .clone()
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map_with(|items, e| node(NodeKind::Array(items), e.span()))
            .labelled("array");

        let mut sum = Recursive::declare();

        let group = sum
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .labelled("arithmetic expression");

        let atom = choice((literal, helper, array, group)).boxed();

        let call = just(Token::DoubleColon)
            .ignore_then(select! { Token::Ident(method) => method })
            .then(list.delimited_by(just(Token::LParen), just(Token::RParen)))
            .map_with(|(method, args), e| (method, args, e.span()));

        let postfix = atom
            .foldl(call.repeated(), |target: Node, (method, args, span)| {
                let loc = cover(target.loc, raw_loc(span));
                Node::new(
                    NodeKind::Call {
                        target: Box::new(target),
                        method,
                        args,
                    },
                    loc,
                )
            })
            .boxed();

        let power = postfix
            .clone()
            .foldl(
                just(Token::Caret)
                    .to(BinaryOp::Pow)
                    .then(postfix.clone())
                    .repeated(),
                binary,
            )
            .boxed();

        let product = power
            .clone()
            .foldl(
                choice((
                    just(Token::Star).to(BinaryOp::Mul),
                    just(Token::Slash).to(BinaryOp::Div),
                ))
                .then(power)
                .repeated(),
                binary,
            )
            .boxed();

        sum.define(
            product.clone().foldl(
                choice((
                    just(Token::Plus).to(BinaryOp::Add),
                    just(Token::Minus).to(BinaryOp::Sub),
                ))
                .then(product)
                .repeated(),
                binary,
            ),
        );

        postfix
            .then(
                just(Token::As)
                    .ignore_then(select! { Token::Ident(alias) => alias })
                    .or_not(),
            )
            .map_with(|(left, alias), e| match alias {
                Some(right) => node(
                    NodeKind::As {
                        left: Box::new(left),
                        right,
                    },
                    e.span(),
                ),
                None => left,
            })
            .labelled("expression")
            .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_index_positions() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.position(0), Position::new(1, 0, 0));
        assert_eq!(index.position(4), Position::new(2, 1, 4));
        assert_eq!(index.position(6), Position::new(3, 0, 6));
        assert_eq!(index.position(8), Position::new(4, 1, 8));
        assert_eq!(index.line_start(2), Some(3));
        assert_eq!(index.line_start(0), None);
        assert_eq!(index.line_count(), 4);
    }

    #[test]
    fn locations_are_resolved_to_lines() {
        let program = parse("set $x 1\nprint $x").unwrap();
        let second = &program.body[1];
        let loc = second.loc.unwrap();
        assert_eq!(loc.start, Position::new(2, 0, 9));
        assert_eq!(loc.end, Position::new(2, 8, 17));
        let arg = second.args[0].loc.unwrap();
        assert_eq!(arg.start, Position::new(2, 6, 15));
    }

    #[test]
    fn module_prefix_is_split_from_command_name() {
        let program = parse("dao:install vault").unwrap();
        assert_eq!(program.body[0].module.as_deref(), Some("dao"));
        assert_eq!(program.body[0].name, "install");
    }

    #[test]
    fn errors_carry_expected_tokens() {
        let errors = parse("set $x (1 +").unwrap_err();
        assert_eq!(errors[0].position.line, 1);
        assert!(!errors[0].expected.is_empty());
    }

    #[test]
    fn lexer_errors_are_reported_with_position() {
        let errors = parse("print 1\nprint 0xabc").unwrap_err();
        assert_eq!(errors[0].position, Position::new(2, 6, 14));
        assert!(errors[0].message.contains("even number"));
    }
}
