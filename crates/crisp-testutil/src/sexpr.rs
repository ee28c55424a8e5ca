//! S-expression formatter for crisp ASTs.
//!
//! Keeps snapshot tests readable: locations are dropped and every node
//! kind gets a short, unambiguous form.

use crisp_kernel::ast::*;

/// Format a program. A single command is formatted on its own; several
/// become `(program ...)`.
pub fn format_program(program: &Program) -> String {
    match program.body.as_slice() {
        [] => "(program)".to_string(),
        [single] => format_command(single),
        commands => {
            let parts: Vec<String> = commands.iter().map(format_command).collect();
            format!("(program {})", parts.join(" "))
        }
    }
}

/// Format a command as `(cmd [module:]name args... --opt value...)`.
pub fn format_command(cmd: &CommandExpression) -> String {
    let mut parts = vec![format!("(cmd {}", cmd.full_name())];
    parts.extend(cmd.args.iter().map(format_node));
    for opt in &cmd.opts {
        parts.push(format!("--{}={}", opt.name, format_node(&opt.value)));
    }
    format!("{})", parts.join(" "))
}

/// Format an expression node.
pub fn format_node(node: &Node) -> String {
    match &node.kind {
        NodeKind::Address(a) => format!("(addr {})", a),
        NodeKind::Bool(b) => b.to_string(),
        NodeKind::Bytes(b) => format!("(bytes {})", b.len()),
        NodeKind::Number(n) => format_number(n),
        NodeKind::String(s) => format!("{:?}", s),
        NodeKind::Array(items) => {
            let parts: Vec<String> = items.iter().map(format_node).collect();
            format!("[{}]", parts.join(" "))
        }
        NodeKind::Binary { op, left, right } => {
            format!("({} {} {})", op, format_node(left), format_node(right))
        }
        NodeKind::Block(body) => {
            let parts: Vec<String> = body.iter().map(format_command).collect();
            format!("(block {})", parts.join(" "))
        }
        NodeKind::Call {
            target,
            method,
            args,
        } => {
            let mut parts = vec![format!("(call {} {}", format_node(target), method)];
            parts.extend(args.iter().map(format_node));
            format!("{})", parts.join(" "))
        }
        NodeKind::Helper { name, args } => {
            let mut parts = vec![format!("(@{}", name)];
            parts.extend(args.iter().map(format_node));
            format!("{})", parts.join(" "))
        }
        NodeKind::As { left, right } => format!("(as {} {})", format_node(left), right),
        NodeKind::Identifier(id) => id.clone(),
        NodeKind::Variable(name) => name.clone(),
    }
}

fn format_number(n: &NumberLiteral) -> String {
    let mut out = format!("(num {}", n.value);
    if let Some(power) = n.power {
        out.push_str(&format!(" e{}", power));
    }
    if let Some(unit) = n.unit {
        out.push_str(&format!(" {}", unit.suffix()));
    }
    out.push(')');
    out
}
