//! Lexer for crisp source code.
//!
//! Converts source text into a stream of tokens using the logos lexer
//! generator. Malformed literals (odd-length hex, hex or numbers glued to
//! identifier characters, unterminated strings) are lexer errors rather
//! than odd token sequences, so the parser never has to guess where a
//! literal ends.
//!
//! # Token Categories
//!
//! - **Literals**: hex (addresses and bytes), numbers with power and time
//!   unit suffixes, strings, booleans
//! - **Names**: identifiers (`token-manager:0`, `ar:connect`), variables
//!   (`$x`), helpers (`@me`, `@date(`), long options (`--value`)
//! - **Punctuation**: `( ) [ ] , ::` and the arithmetic operators
//! - **Structure**: newlines; comments are dropped by [`tokenize`]

use std::fmt;
use std::ops::Range;

use crisp_types::{ADDRESS_LEN, Address};
use logos::Logos;

use crate::ast::{NumberLiteral, TimeUnit};

/// Byte range in the source.
pub type Span = Range<usize>;

/// A token (or error) paired with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(token: T, span: Span) -> Self {
        Self { token, span }
    }
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LexerError {
    #[default]
    UnexpectedCharacter,
    UnterminatedString,
    InvalidEscape(char),
    InvalidNumber(String),
    InvalidHex(String),
    OddHexLength(String),
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexerError::UnexpectedCharacter => write!(f, "unexpected character"),
            LexerError::UnterminatedString => write!(f, "unterminated string"),
            LexerError::InvalidEscape(c) => write!(f, "invalid escape sequence: \\{}", c),
            LexerError::InvalidNumber(s) => write!(f, "invalid number: {}", s),
            LexerError::InvalidHex(s) => write!(f, "invalid hex literal: {}", s),
            LexerError::OddHexLength(s) => {
                write!(f, "hex literal must have an even number of digits: {}", s)
            }
        }
    }
}

/// Value of a `0x...` literal.
#[derive(Debug, Clone, PartialEq)]
pub enum HexLiteral {
    /// Exactly 20 bytes.
    Address(Address),
    Bytes(Vec<u8>),
}

/// Tokens produced by the crisp lexer.
///
/// Priorities are explicit wherever two patterns can match the same text:
/// valid literals beat the catch-all "invalid" patterns, which in turn only
/// win when they match a longer slice.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexerError)]
#[logos(skip r"[ \t]+")]
pub enum Token {
    // ═══════════════════════════════════════════════════════════════════
    // Keywords (must come before Ident for priority)
    // ═══════════════════════════════════════════════════════════════════
    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("as")]
    As,

    // ═══════════════════════════════════════════════════════════════════
    // Punctuation and operators
    // ═══════════════════════════════════════════════════════════════════
    #[token("::")]
    DoubleColon,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(",")]
    Comma,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("^")]
    Caret,

    // ═══════════════════════════════════════════════════════════════════
    // Literals (with values)
    // ═══════════════════════════════════════════════════════════════════
    /// Hex literal: 40 digits make an address, any other even count bytes.
    #[regex(r"0[xX][0-9a-fA-F]*", lex_hex, priority = 10)]
    Hex(HexLiteral),

    /// Number: `10`, `1.5e18`, `7d`, `3mo`
    #[regex(r"[0-9]+(\.[0-9]+)?(e[0-9]+)?(mo|s|m|h|d|w|y)?", lex_number, priority = 8)]
    Number(NumberLiteral),

    /// Double-quoted string, escapes processed.
    #[regex(r#""([^"\\\n]|\\.)*""#, lex_string)]
    /// Single-quoted string, escapes processed.
    #[regex(r"'([^'\\\n]|\\.)*'", lex_string)]
    String(String),

    // ═══════════════════════════════════════════════════════════════════
    // Invalid patterns (only win on a longer match than a valid literal)
    // ═══════════════════════════════════════════════════════════════════
    /// Invalid: hex followed by non-hex word characters (like 0x12zz)
    #[regex(r"0[xX][0-9a-fA-F]*[g-zG-Z_][0-9a-zA-Z_]*", lex_invalid_hex, priority = 9)]
    InvalidHex,

    /// Invalid: number followed by word characters (like 12abc or 1.)
    #[regex(r"[0-9][0-9a-zA-Z_.]*", lex_invalid_number, priority = 3)]
    InvalidNumber,

    /// Invalid: string without its closing quote on the same line
    #[regex(r#""([^"\\\n]|\\.)*"#, lex_unterminated, allow_greedy = true)]
    #[regex(r"'([^'\\\n]|\\.)*", lex_unterminated, allow_greedy = true)]
    UnterminatedString,

    // ═══════════════════════════════════════════════════════════════════
    // Names
    // ═══════════════════════════════════════════════════════════════════
    /// Variable reference, `$` kept: `$x`
    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Variable(String),

    /// Helper without call parens: `@me` → `me`
    #[regex(r"@[a-zA-Z][a-zA-Z0-9_.\-]*", |lex| lex.slice()[1..].to_string())]
    Helper(String),

    /// Helper immediately followed by `(`: `@date(` → `date`
    #[regex(r"@[a-zA-Z][a-zA-Z0-9_.\-]*\(", |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    HelperCall(String),

    /// Long option: `--value` → `value`
    #[regex(r"--[a-zA-Z][a-zA-Z0-9\-]*", |lex| lex.slice()[2..].to_string())]
    LongOpt(String),

    /// Identifier, possibly with `:segment` parts: `vault`, `token-manager:0`
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_.\-]*(:[a-zA-Z0-9_.\-]+)*", |lex| lex.slice().to_string())]
    Ident(String),

    // ═══════════════════════════════════════════════════════════════════
    // Structural tokens
    // ═══════════════════════════════════════════════════════════════════
    /// Comment: `# ...` to end of line
    #[regex(r"#[^\n\r]*", allow_greedy = true)]
    Comment,

    /// Newline (significant: ends commands)
    #[regex(r"\n|\r\n")]
    Newline,
}

fn lex_hex(lex: &mut logos::Lexer<Token>) -> Result<HexLiteral, LexerError> {
    let slice = lex.slice();
    let digits = &slice[2..];
    if digits.len() % 2 != 0 {
        return Err(LexerError::OddHexLength(slice.to_string()));
    }
    let bytes = hex::decode(digits).map_err(|_| LexerError::InvalidHex(slice.to_string()))?;
    if bytes.len() == ADDRESS_LEN {
        let address =
            Address::from_slice(&bytes).map_err(|_| LexerError::InvalidHex(slice.to_string()))?;
        Ok(HexLiteral::Address(address))
    } else {
        Ok(HexLiteral::Bytes(bytes))
    }
}

/// Split `1.5e18d` into mantissa, power and unit.
fn lex_number(lex: &mut logos::Lexer<Token>) -> Result<NumberLiteral, LexerError> {
    let slice = lex.slice();
    let invalid = || LexerError::InvalidNumber(slice.to_string());

    let digits_end = slice
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(slice.len());
    let (mantissa, mut rest) = slice.split_at(digits_end);
    let mut literal = NumberLiteral::new(mantissa);

    if let Some(after_e) = rest.strip_prefix('e') {
        let power_end = after_e
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after_e.len());
        let power = after_e[..power_end].parse::<u32>().map_err(|_| invalid())?;
        literal.power = Some(power);
        rest = &after_e[power_end..];
    }

    if !rest.is_empty() {
        literal.unit = Some(TimeUnit::from_suffix(rest).ok_or_else(invalid)?);
    }
    Ok(literal)
}

/// Strip quotes and process escapes. Both quote styles share one rule set.
fn lex_string(lex: &mut logos::Lexer<Token>) -> Result<String, LexerError> {
    parse_string_literal(lex.slice())
}

fn lex_invalid_hex(lex: &mut logos::Lexer<Token>) -> Result<(), LexerError> {
    Err(LexerError::InvalidHex(lex.slice().to_string()))
}

fn lex_invalid_number(lex: &mut logos::Lexer<Token>) -> Result<(), LexerError> {
    Err(LexerError::InvalidNumber(lex.slice().to_string()))
}

fn lex_unterminated(_lex: &mut logos::Lexer<Token>) -> Result<(), LexerError> {
    Err(LexerError::UnterminatedString)
}

/// Extract the content of a quoted string literal, processing escapes.
pub fn parse_string_literal(source: &str) -> Result<String, LexerError> {
    let mut chars = source.chars();
    let quote = chars.next().ok_or(LexerError::UnterminatedString)?;
    if source.len() < 2 || !source.ends_with(quote) {
        return Err(LexerError::UnterminatedString);
    }
    let inner = &source[1..source.len() - 1];

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => return Err(LexerError::InvalidEscape(other)),
            None => return Err(LexerError::UnterminatedString),
        }
    }
    Ok(out)
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::As => write!(f, "as"),
            Token::DoubleColon => write!(f, "::"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Caret => write!(f, "^"),
            Token::Hex(HexLiteral::Address(a)) => write!(f, "{}", a),
            Token::Hex(HexLiteral::Bytes(b)) => write!(f, "0x{}", hex::encode(b)),
            Token::Number(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "{:?}", s),
            Token::InvalidHex | Token::InvalidNumber | Token::UnterminatedString => {
                write!(f, "<invalid>")
            }
            Token::Variable(v) => write!(f, "{}", v),
            Token::Helper(h) => write!(f, "@{}", h),
            Token::HelperCall(h) => write!(f, "@{}(", h),
            Token::LongOpt(o) => write!(f, "--{}", o),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Comment => write!(f, "#"),
            Token::Newline => write!(f, "newline"),
        }
    }
}

/// Tokenize source into spanned tokens, dropping comments.
///
/// All lexer errors are collected; if any occurred the tokens are discarded.
pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token>>, Vec<Spanned<LexerError>>> {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(Token::Comment) => {}
            Ok(token) => tokens.push(Spanned::new(token, span)),
            Err(err) => errors.push(Spanned::new(err, span)),
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}
