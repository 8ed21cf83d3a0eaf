use orion_error::prelude::*;
use winnow::combinator::{alt, cut_err, opt, repeat};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, literal, take_till, take_until, take_while};

use crate::error::{CoreReason, CoreResult};

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// A lexical unit of a SQL statement. Every variant borrows its exact source
/// text, so concatenating the tokens reproduces the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Bare identifier or keyword.
    Ident(&'a str),
    /// `"quoted"` or `` `quoted` `` identifier, delimiters included.
    QuotedIdent(&'a str),
    /// `'string'` literal, quotes included.
    Str(&'a str),
    Number(&'a str),
    Space(&'a str),
    /// `-- line` (newline excluded) or `/* block */` comment.
    Comment(&'a str),
    /// Any other single character (`.`, `(`, `,`, operators, ...).
    Symbol(&'a str),
}

impl<'a> Token<'a> {
    pub fn text(&self) -> &'a str {
        match *self {
            Self::Ident(s)
            | Self::QuotedIdent(s)
            | Self::Str(s)
            | Self::Number(s)
            | Self::Space(s)
            | Self::Comment(s)
            | Self::Symbol(s) => s,
        }
    }

    pub fn is_space(&self) -> bool {
        matches!(self, Self::Space(_))
    }

    /// Whitespace or a comment.
    pub fn is_trivia(&self) -> bool {
        matches!(self, Self::Space(_) | Self::Comment(_))
    }

    /// Case-insensitive keyword test on bare identifiers.
    pub fn is_keyword(&self, kw: &str) -> bool {
        matches!(self, Self::Ident(s) if s.eq_ignore_ascii_case(kw))
    }

    pub fn is_symbol(&self, sym: &str) -> bool {
        matches!(self, Self::Symbol(s) if *s == sym)
    }
}

/// Split `sql` into tokens. Fails only on an unterminated quote or block
/// comment.
pub fn tokenize(sql: &str) -> CoreResult<Vec<Token<'_>>> {
    repeat(0.., token).parse(sql).map_err(|e| {
        StructError::from(CoreReason::Validation)
            .with_detail(format!("cannot tokenize SQL {sql:?}: {e}"))
    })
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

fn token<'a>(input: &mut &'a str) -> ModalResult<Token<'a>> {
    alt((
        take_while(1.., char::is_whitespace).map(Token::Space),
        comment.map(Token::Comment),
        string_literal.map(Token::Str),
        quoted_ident.map(Token::QuotedIdent),
        ident.map(Token::Ident),
        number.map(Token::Number),
        any.take().map(Token::Symbol),
    ))
    .parse_next(input)
}

fn comment<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    alt((
        (literal("--"), take_till(0.., '\n')).take(),
        (
            literal("/*"),
            cut_err((take_until(0.., "*/"), literal("*/"))).context(StrContext::Expected(
                StrContextValue::Description("end of block comment"),
            )),
        )
            .take(),
    ))
    .parse_next(input)
}

fn ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    // First character must be alphabetic or underscore (not digit).
    if !input.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$').parse_next(input)
}

fn number<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        take_while(1.., |c: char| c.is_ascii_digit()),
        opt((literal("."), take_while(0.., |c: char| c.is_ascii_digit()))),
    )
        .take()
        .parse_next(input)
}

/// `'...'` with `''` as the escaped quote.
fn string_literal<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        literal("'"),
        repeat::<_, _, (), _, _>(
            0..,
            alt((take_while(1.., |c: char| c != '\''), literal("''"))),
        ),
        cut_err(literal("'")).context(StrContext::Expected(StrContextValue::Description(
            "closing quote",
        ))),
    )
        .take()
        .parse_next(input)
}

fn quoted_ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    alt((
        (literal("\""), take_till(0.., '"'), cut_err(literal("\""))).take(),
        (literal("`"), take_till(0.., '`'), cut_err(literal("`"))).take(),
    ))
    .parse_next(input)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
