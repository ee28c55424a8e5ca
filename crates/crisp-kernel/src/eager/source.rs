//! Turning a half-typed script into something parseable.
//!
//! The text above the caret line is parsed with any open blocks closed.
//! The caret line is parsed on its own, padded so that positions still
//! match the original source.

use crate::ast::{CommandExpression, Program};
use crate::lexer::{Token, tokenize};
use crate::parser::parse;

use super::Caret;

/// Commands recovered from a partial script.
pub(crate) struct PreparedSource {
    /// Top-level commands above the caret line.
    pub commands: Vec<CommandExpression>,
    /// The command on the caret line, if it parses.
    pub current: Option<CommandExpression>,
    /// Text of the caret line.
    pub line: String,
}

pub(crate) fn prepare(source: &str, caret: Caret, ast: Option<&Program>) -> PreparedSource {
    let lines: Vec<&str> = source.split('\n').collect();
    let before = caret.line.saturating_sub(1).min(lines.len());
    let line = lines.get(before).copied().unwrap_or_default();

    // Each line keeps its newline so a `(` ending the last one still
    // reads as a block opener.
    let prefix: String = lines[..before].iter().map(|l| format!("{l}\n")).collect();
    let commands = match parse(&auto_close(&prefix)) {
        Ok(program) => program.body,
        Err(errors) => {
            tracing::debug!(errors = errors.len(), "prefix does not parse, using last good ast");
            ast.map(|program| {
                program
                    .body
                    .iter()
                    .filter(|c| c.loc.is_some_and(|l| l.end.line < caret.line))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
        }
    };

    let padding: String = lines[..before]
        .iter()
        .map(|l| format!("{}\n", " ".repeat(l.len())))
        .collect();

    PreparedSource {
        commands,
        current: current_command(&padding, line, caret.col),
        line: line.trim_end_matches('\r').to_string(),
    }
}

/// Append a closing `)` line for every block left open at the end.
///
/// A `(` directly followed by a newline opens a block; any other `(`
/// (groups, helper calls, `::` call arguments) is tracked only so that
/// its `)` is not mistaken for a block close.
fn auto_close(prefix: &str) -> String {
    let Ok(tokens) = tokenize(prefix) else {
        return prefix.to_string();
    };

    let mut open = Vec::new();
    let mut tokens = tokens.iter().peekable();
    while let Some(spanned) = tokens.next() {
        match spanned.token {
            Token::LParen => {
                let is_block = tokens
                    .peek()
                    .is_some_and(|next| matches!(next.token, Token::Newline));
                open.push(is_block);
            }
            Token::HelperCall(_) => open.push(false),
            Token::RParen => {
                open.pop();
            }
            _ => {}
        }
    }

    let mut closed = prefix.to_string();
    for _ in open.into_iter().filter(|is_block| *is_block) {
        closed.push_str("\n)");
    }
    closed
}

/// Parse the caret line alone: first without a trailing block opener,
/// then cut at the caret, then cut before the word being typed.
fn current_command(padding: &str, line: &str, col: usize) -> Option<CommandExpression> {
    let col = clamp_col(line, col);
    let without_opener = {
        let trimmed = line.trim_end();
        trimmed.strip_suffix('(').unwrap_or(trimmed)
    };
    let word_start = col - word_before(line, col).len();

    for candidate in [without_opener, &line[..col], &line[..word_start]] {
        if let Ok(program) = parse(&format!("{padding}{candidate}")) {
            return program.body.into_iter().next();
        }
    }
    None
}

/// Largest char boundary at or before `col`.
pub(crate) fn clamp_col(line: &str, col: usize) -> usize {
    let mut col = col.min(line.len());
    while !line.is_char_boundary(col) {
        col -= 1;
    }
    col
}

/// The partial word ending at `col`.
pub(crate) fn word_before(line: &str, col: usize) -> &str {
    let head = &line[..clamp_col(line, col)];
    let start = head
        .rfind(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | ','))
        .map(|i| i + 1)
        .unwrap_or(0);
    &head[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_close_counts_only_blocks() {
        assert_eq!(
            auto_close("connect dao (\n  set $x (1 + 2)"),
            "connect dao (\n  set $x (1 + 2)\n)"
        );
        assert_eq!(auto_close("set $x @date(now"), "set $x @date(now");
        assert_eq!(auto_close("a (\nb (\nc"), "a (\nb (\nc\n)\n)");
    }

    #[test]
    fn word_before_caret() {
        assert_eq!(word_before("set $b", 6), "$b");
        assert_eq!(word_before("set $b ", 7), "");
        assert_eq!(word_before("exec --va", 9), "--va");
        assert_eq!(word_before("set $x (@da", 11), "@da");
    }

    #[test]
    fn current_line_keeps_positions() {
        let prepared = prepare("set $a 1\nset $b ", Caret::new(2, 7), None);
        assert_eq!(prepared.commands.len(), 1);
        let current = prepared.current.unwrap();
        assert_eq!(current.name, "set");
        assert_eq!(current.loc.unwrap().start.line, 2);
    }

    #[test]
    fn trailing_block_opener_is_dropped() {
        let prepared = prepare("connect dao (", Caret::new(1, 13), None);
        let current = prepared.current.unwrap();
        assert_eq!(current.name, "connect");
        assert!(current.block().is_none());
    }

    #[test]
    fn partial_option_falls_back_to_the_text_before_it() {
        let source = "exec 0x0000000000000000000000000000000000000001 \"f()\" --";
        let prepared = prepare(source, Caret::new(1, 56), None);
        assert_eq!(prepared.current.unwrap().name, "exec");
    }

    #[test]
    fn broken_prefix_falls_back_to_ast() {
        let good = parse("set $a 1\nset $z 2").unwrap();
        let prepared = prepare("set $a 1\nset $b [1,\nset $c ", Caret::new(3, 7), Some(&good));
        assert_eq!(prepared.commands.len(), 2);
        assert_eq!(prepared.commands[1].args[0].identifier(), Some("$z"));
    }

    #[test]
    fn block_opened_on_the_previous_line_is_closed() {
        let prepared = prepare("connect dao (\n  set $x ", Caret::new(2, 9), None);
        assert_eq!(prepared.commands.len(), 1);
        let block = prepared.commands[0].args[1].loc.unwrap();
        assert!(block.end.line >= 2);
    }
}
