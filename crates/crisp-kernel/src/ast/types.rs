//! AST type definitions.

use std::fmt;

use crisp_types::{Address, Location};

/// A parsed script: the top-level commands in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<CommandExpression>,
}

impl Program {
    /// A copy with every source location removed, for structural comparison.
    pub fn without_locations(&self) -> Program {
        let mut program = self.clone();
        for command in &mut program.body {
            command.strip_locations();
        }
        program
    }
}

/// A command invocation: `[module:]name arg... --opt value...`
///
/// This is the only statement form in the language. Programs and blocks
/// hold commands directly, so every body is command-only by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandExpression {
    /// Explicit module prefix from `module:name`.
    pub module: Option<String>,
    pub name: String,
    pub args: Vec<Node>,
    pub opts: Vec<CommandOpt>,
    pub loc: Option<Location>,
    /// Location of the `[module:]name` word alone.
    pub name_loc: Option<Location>,
}

impl CommandExpression {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            module: None,
            name: name.into(),
            args: Vec::new(),
            opts: Vec::new(),
            loc: None,
            name_loc: None,
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn arg(mut self, node: Node) -> Self {
        self.args.push(node);
        self
    }

    pub fn opt(mut self, name: impl Into<String>, value: Node) -> Self {
        self.opts.push(CommandOpt {
            name: name.into(),
            value,
            loc: None,
        });
        self
    }

    /// The name as written, including any module prefix.
    pub fn full_name(&self) -> String {
        match &self.module {
            Some(module) => format!("{}:{}", module, self.name),
            None => self.name.clone(),
        }
    }

    /// The first block argument, if any.
    pub fn block(&self) -> Option<&[CommandExpression]> {
        self.args.iter().find_map(|arg| match &arg.kind {
            NodeKind::Block(body) => Some(body.as_slice()),
            _ => None,
        })
    }

    pub fn opt_value(&self, name: &str) -> Option<&Node> {
        self.opts.iter().find(|o| o.name == name).map(|o| &o.value)
    }

    pub(crate) fn strip_locations(&mut self) {
        self.loc = None;
        self.name_loc = None;
        for arg in &mut self.args {
            arg.strip_locations();
        }
        for opt in &mut self.opts {
            opt.loc = None;
            opt.value.strip_locations();
        }
    }
}

/// A named option: `--name value`
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOpt {
    pub name: String,
    pub value: Node,
    pub loc: Option<Location>,
}

/// An expression node with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub loc: Option<Location>,
}

impl Node {
    pub fn new(kind: NodeKind, loc: Option<Location>) -> Self {
        Self { kind, loc }
    }

    /// A node without location, as built by hand in tests or by hosts.
    pub fn bare(kind: NodeKind) -> Self {
        Self { kind, loc: None }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Self::bare(NodeKind::Identifier(name.into()))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::bare(NodeKind::Variable(name.into()))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::bare(NodeKind::String(s.into()))
    }

    pub fn number(value: impl Into<String>) -> Self {
        Self::bare(NodeKind::Number(NumberLiteral::new(value)))
    }

    /// Identifier text for nodes that name something (`Identifier`,
    /// `Variable`, or the left side of an `As`).
    pub fn identifier(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Identifier(s) | NodeKind::Variable(s) => Some(s),
            NodeKind::As { left, .. } => left.identifier(),
            _ => None,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, NodeKind::Block(_))
    }

    pub(crate) fn strip_locations(&mut self) {
        self.loc = None;
        match &mut self.kind {
            NodeKind::Array(items) => items.iter_mut().for_each(Node::strip_locations),
            NodeKind::Binary { left, right, .. } => {
                left.strip_locations();
                right.strip_locations();
            }
            NodeKind::Block(body) => body.iter_mut().for_each(CommandExpression::strip_locations),
            NodeKind::Call { target, args, .. } => {
                target.strip_locations();
                args.iter_mut().for_each(Node::strip_locations);
            }
            NodeKind::Helper { args, .. } => args.iter_mut().for_each(Node::strip_locations),
            NodeKind::As { left, .. } => left.strip_locations(),
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

/// The kinds of expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// 20-byte hex literal: `0x7af9...615d`
    Address(Address),
    Bool(bool),
    /// Any other even-length hex literal: `0xdeadbeef`
    Bytes(Vec<u8>),
    /// Numeric literal with optional power and time unit: `1.5e18`, `7d`
    Number(NumberLiteral),
    String(String),
    /// Array literal: `[a, b, c]`
    Array(Vec<Node>),
    /// Arithmetic: `($x + 3)`
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// Nested command body, always introducing a scope.
    Block(Vec<CommandExpression>),
    /// Read call chain element: `target::method(args)`
    Call {
        target: Box<Node>,
        method: String,
        args: Vec<Node>,
    },
    /// Helper invocation: `@name` or `@name(args)`; `name` excludes the `@`.
    Helper { name: String, args: Vec<Node> },
    /// Aliasing: `left as right`
    As { left: Box<Node>, right: String },
    /// Bare word: module names, app identifiers, permission roles.
    Identifier(String),
    /// Variable reference, name includes the leading `$`.
    Variable(String),
}

impl NodeKind {
    /// Short description for error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            NodeKind::Address(_) => "address",
            NodeKind::Bool(_) => "bool",
            NodeKind::Bytes(_) => "bytes",
            NodeKind::Number(_) => "number",
            NodeKind::String(_) => "string",
            NodeKind::Array(_) => "array",
            NodeKind::Binary { .. } => "arithmetic expression",
            NodeKind::Block(_) => "block",
            NodeKind::Call { .. } => "call",
            NodeKind::Helper { .. } => "helper",
            NodeKind::As { .. } => "alias",
            NodeKind::Identifier(_) => "identifier",
            NodeKind::Variable(_) => "variable",
        }
    }
}

/// Number literal as written.
///
/// The mantissa stays textual until interpretation so that `1.5e18` can be
/// scaled exactly instead of going through a float.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberLiteral {
    /// Digits, possibly with one decimal point.
    pub value: String,
    /// Decimal power from an `eN` suffix.
    pub power: Option<u32>,
    pub unit: Option<TimeUnit>,
}

impl NumberLiteral {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            power: None,
            unit: None,
        }
    }

    pub fn with_power(mut self, power: u32) -> Self {
        self.power = Some(power);
        self
    }

    pub fn with_unit(mut self, unit: TimeUnit) -> Self {
        self.unit = Some(unit);
        self
    }
}

impl fmt::Display for NumberLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)?;
        if let Some(power) = self.power {
            write!(f, "e{}", power)?;
        }
        if let Some(unit) = self.unit {
            write!(f, "{}", unit.suffix())?;
        }
        Ok(())
    }
}

/// Time unit suffix on a number literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeUnit {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix {
            "s" => TimeUnit::Seconds,
            "m" => TimeUnit::Minutes,
            "h" => TimeUnit::Hours,
            "d" => TimeUnit::Days,
            "w" => TimeUnit::Weeks,
            "mo" => TimeUnit::Months,
            "y" => TimeUnit::Years,
            _ => return None,
        })
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
            TimeUnit::Weeks => "w",
            TimeUnit::Months => "mo",
            TimeUnit::Years => "y",
        }
    }

    /// Length of one unit in seconds. Months are 30 days, years 365.
    pub fn seconds(&self) -> u64 {
        match self {
            TimeUnit::Seconds => 1,
            TimeUnit::Minutes => 60,
            TimeUnit::Hours => 3_600,
            TimeUnit::Days => 86_400,
            TimeUnit::Weeks => 604_800,
            TimeUnit::Months => 2_592_000,
            TimeUnit::Years => 31_536_000,
        }
    }
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
            BinaryOp::Pow => write!(f, "^"),
        }
    }
}
