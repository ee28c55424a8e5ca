//! Render AST back to source text.
//!
//! The output re-parses to the same tree modulo locations. Comments and
//! original spacing are not preserved; binary expressions are always fully
//! parenthesised.

use std::fmt::{self, Write};

use super::types::{CommandExpression, Node, NodeKind, Program};

const INDENT: &str = "  ";

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, command) in self.body.iter().enumerate() {
            if i > 0 {
                f.write_char('\n')?;
            }
            write_command(f, command, 0)?;
        }
        Ok(())
    }
}

impl fmt::Display for CommandExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_command(f, self, 0)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, self, 0)
    }
}

fn write_indent(f: &mut impl Write, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}

fn write_command(f: &mut impl Write, command: &CommandExpression, depth: usize) -> fmt::Result {
    f.write_str(&command.full_name())?;
    for arg in &command.args {
        f.write_char(' ')?;
        write_node(f, arg, depth)?;
    }
    for opt in &command.opts {
        write!(f, " --{} ", opt.name)?;
        write_node(f, &opt.value, depth)?;
    }
    Ok(())
}

fn write_list(f: &mut impl Write, items: &[Node], depth: usize) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_node(f, item, depth)?;
    }
    Ok(())
}

fn write_node(f: &mut impl Write, node: &Node, depth: usize) -> fmt::Result {
    match &node.kind {
        NodeKind::Address(a) => write!(f, "{}", a),
        NodeKind::Bool(b) => write!(f, "{}", b),
        NodeKind::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
        NodeKind::Number(n) => write!(f, "{}", n),
        NodeKind::String(s) => write_string(f, s),
        NodeKind::Array(items) => {
            f.write_char('[')?;
            write_list(f, items, depth)?;
            f.write_char(']')
        }
        NodeKind::Binary { op, left, right } => {
            f.write_char('(')?;
            write_node(f, left, depth)?;
            write!(f, " {} ", op)?;
            write_node(f, right, depth)?;
            f.write_char(')')
        }
        NodeKind::Block(body) => {
            f.write_str("(\n")?;
            for command in body {
                write_indent(f, depth + 1)?;
                write_command(f, command, depth + 1)?;
                f.write_char('\n')?;
            }
            write_indent(f, depth)?;
            f.write_char(')')
        }
        NodeKind::Call {
            target,
            method,
            args,
        } => {
            write_node(f, target, depth)?;
            write!(f, "::{}(", method)?;
            write_list(f, args, depth)?;
            f.write_char(')')
        }
        NodeKind::Helper { name, args } => {
            write!(f, "@{}", name)?;
            if !args.is_empty() {
                f.write_char('(')?;
                write_list(f, args, depth)?;
                f.write_char(')')?;
            }
            Ok(())
        }
        NodeKind::As { left, right } => {
            write_node(f, left, depth)?;
            write!(f, " as {}", right)
        }
        NodeKind::Identifier(s) | NodeKind::Variable(s) => f.write_str(s),
    }
}

fn write_string(f: &mut impl Write, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}
