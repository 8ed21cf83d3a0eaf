use crate::error::CoreResult;

use super::lexer::{Token, tokenize};

/// Keywords that end the WHERE clause of a top-level SELECT.
const CLAUSE_TAIL: &[&str] = &[
    "group", "order", "having", "limit", "offset", "fetch", "union", "intersect", "except",
    "minus", "window", "for",
];

/// Keywords that may follow a table reference and are not an alias of it.
const NOT_AN_ALIAS: &[&str] = &[
    "where", "group", "order", "having", "limit", "offset", "fetch", "join", "inner", "left",
    "right", "full", "cross", "natural", "outer", "on", "using", "union", "intersect", "except",
    "minus", "window", "for",
];

/// Rename table references in `sql`.
///
/// `mapping` pairs a logical name (matched case-insensitively) with its
/// replacement. A bare identifier is renamed wherever it names a table or
/// qualifies a column (`wrapper.x`); a column that merely shares the name
/// (`t.wrapper`), function names and anything inside quotes are left alone.
///
/// With `wrap_from`, a renamed reference sitting directly after FROM or JOIN
/// becomes a nested `(select * from <target>)`, aliased with the target name
/// unless the query supplies its own alias.
pub fn rename_tables(sql: &str, mapping: &[(&str, &str)], wrap_from: bool) -> CoreResult<String> {
    let tokens = tokenize(sql)?;
    let mut out = String::with_capacity(sql.len() + 32);

    for (i, tok) in tokens.iter().enumerate() {
        let Token::Ident(name) = *tok else {
            out.push_str(tok.text());
            continue;
        };
        let Some(target) = mapping
            .iter()
            .find(|(from, _)| from.eq_ignore_ascii_case(name))
            .map(|(_, to)| *to)
        else {
            out.push_str(name);
            continue;
        };

        let prev = prev_significant(&tokens, i);
        let next = next_significant(&tokens, i);
        if prev.is_some_and(|t| t.is_symbol(".")) || next.is_some_and(|t| t.is_symbol("(")) {
            out.push_str(name);
            continue;
        }

        let in_from = prev.is_some_and(|t| t.is_keyword("from") || t.is_keyword("join"));
        if wrap_from && in_from {
            out.push_str("(select * from ");
            out.push_str(target);
            out.push(')');
            if !has_alias(next) {
                out.push_str(" as ");
                out.push_str(target);
            }
        } else {
            out.push_str(target);
        }
    }

    Ok(out)
}

/// Conjoin `predicates` onto the top-level WHERE clause of `sql`.
///
/// An existing predicate is parenthesised so the added conditions can only
/// narrow it. Without a WHERE clause one is inserted ahead of any trailing
/// GROUP BY / ORDER BY / LIMIT clause. Comments become blanks and trailing
/// `;` terminators are dropped, so nothing can swallow the added text.
pub fn conjoin_where(sql: &str, predicates: &[String]) -> CoreResult<String> {
    if predicates.is_empty() {
        return Ok(sql.to_string());
    }
    let mut tokens: Vec<Token<'_>> = tokenize(sql)?
        .into_iter()
        .map(|t| match t {
            Token::Comment(_) => Token::Space(" "),
            t => t,
        })
        .collect();
    while tokens.last().is_some_and(|t| t.is_space() || t.is_symbol(";")) {
        tokens.pop();
    }
    let added = predicates.join(" and ");

    let mut depth = 0i32;
    let mut where_at = None;
    let mut tail_at = None;
    for (i, tok) in tokens.iter().enumerate() {
        if tok.is_symbol("(") {
            depth += 1;
        } else if tok.is_symbol(")") {
            depth -= 1;
        } else if depth == 0 {
            if where_at.is_none() && tok.is_keyword("where") {
                where_at = Some(i);
            } else if CLAUSE_TAIL.iter().any(|kw| tok.is_keyword(kw)) {
                tail_at = Some(i);
                break;
            }
        }
    }

    let join = |range: &[Token<'_>]| range.iter().map(|t| t.text()).collect::<String>();
    let tail_start = tail_at.unwrap_or(tokens.len());
    let tail = join(&tokens[tail_start..]);

    let mut out = match where_at {
        Some(w) => {
            let head = join(&tokens[..=w]);
            let existing = join(&tokens[w + 1..tail_start]);
            let existing = existing.trim();
            if existing.is_empty() {
                format!("{head} {added}")
            } else {
                format!("{head} ({existing}) and {added}")
            }
        }
        None => {
            let head = join(&tokens[..tail_start]);
            format!("{} where {added}", head.trim_end())
        }
    };
    if !tail.is_empty() {
        out.push(' ');
        out.push_str(&tail);
    }
    Ok(out)
}

fn prev_significant<'t, 'a>(tokens: &'t [Token<'a>], i: usize) -> Option<&'t Token<'a>> {
    tokens[..i].iter().rev().find(|t| !t.is_trivia())
}

fn next_significant<'t, 'a>(tokens: &'t [Token<'a>], i: usize) -> Option<&'t Token<'a>> {
    tokens[i + 1..].iter().find(|t| !t.is_trivia())
}

fn has_alias(next: Option<&Token<'_>>) -> bool {
    match next {
        Some(Token::QuotedIdent(_)) => true,
        Some(t @ Token::Ident(_)) => !NOT_AN_ALIAS.iter().any(|kw| t.is_keyword(kw)),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
