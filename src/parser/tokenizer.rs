//! RQL tokenizer
//!
//! Turns text such as `and(eq(city,'Chandler'),gt(rank,25))` into a `Term`
//! tree. Commas split arguments at paren depth zero. A quote opens a
//! literal only at the start of an argument; inside it a backslash escapes
//! the next character.

use crate::errors::{RqlError, RqlResult};
use crate::model::{Literal, Term};

/// Parse one expression into a term tree
pub fn parse_term(input: &str) -> RqlResult<Term> {
    let text = input.trim();
    if text.is_empty() {
        return Err(RqlError::malformed("empty expression"));
    }

    if text.starts_with('\'') || text.starts_with('"') {
        return dequote(text).map(Term::Word);
    }

    let open = match text.find('(') {
        Some(open) => open,
        None => {
            if text.contains(')') {
                return Err(RqlError::malformed(format!("unbalanced ')' in '{}'", text)));
            }
            return Ok(Term::Word(Literal::bare(text)));
        }
    };

    let name = text[..open].trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(RqlError::malformed(format!("invalid function name in '{}'", text)));
    }
    if !text.ends_with(')') {
        return Err(RqlError::malformed(format!("unbalanced '(' in '{}'", text)));
    }

    let inner = &text[open + 1..text.len() - 1];
    let args = if inner.trim().is_empty() {
        Vec::new()
    } else {
        split_args(inner)?
            .iter()
            .map(|arg| parse_term(arg))
            .collect::<RqlResult<Vec<_>>>()?
    };

    Ok(Term::Call {
        name: name.to_string(),
        args,
    })
}

/// Returns true if the text looks like a function call
pub fn is_call(input: &str) -> bool {
    let text = input.trim();
    !text.starts_with('\'') && !text.starts_with('"') && text.contains('(')
}

/// Split an argument list on top-level commas.
///
/// Quoted sections and nested parentheses are kept intact; the pieces are
/// returned untrimmed of their quotes.
pub fn split_args(input: &str) -> RqlResult<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    // last significant char; a quote only opens after '(' or ',' or at the start
    let mut prev: Option<char> = None;

    for c in input.chars() {
        if let Some(q) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
                prev = Some(c);
            }
            continue;
        }

        match c {
            '\'' | '"' if matches!(prev, None | Some('(') | Some(',')) => {
                quote = Some(c);
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                if depth == 0 {
                    return Err(RqlError::malformed(format!("unbalanced ')' in '{}'", input)));
                }
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                args.push(check_arg(std::mem::take(&mut current), input)?);
                prev = None;
                continue;
            }
            _ => current.push(c),
        }

        if !c.is_whitespace() {
            prev = Some(c);
        }
    }

    if quote.is_some() {
        return Err(RqlError::malformed(format!("unterminated quote in '{}'", input)));
    }
    if depth != 0 {
        return Err(RqlError::malformed(format!("unbalanced '(' in '{}'", input)));
    }
    args.push(check_arg(current, input)?);

    Ok(args)
}

fn check_arg(arg: String, input: &str) -> RqlResult<String> {
    let trimmed = arg.trim();
    if trimmed.is_empty() {
        return Err(RqlError::malformed(format!("empty argument in '{}'", input)));
    }
    Ok(trimmed.to_string())
}

/// Strip surrounding quotes and unescape.
///
/// Text without a leading quote is returned as a bare literal.
pub fn dequote(input: &str) -> RqlResult<Literal> {
    let text = input.trim();
    let q = match text.chars().next() {
        Some(c @ ('\'' | '"')) => c,
        _ => return Ok(Literal::bare(text)),
    };

    let mut out = String::with_capacity(text.len());
    let mut escaped = false;
    let mut closed_at = None;

    for (i, c) in text.char_indices().skip(1) {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == q {
            closed_at = Some(i);
            break;
        } else {
            out.push(c);
        }
    }

    match closed_at {
        Some(i) if i + q.len_utf8() == text.len() => Ok(Literal::quoted(out)),
        Some(_) => Err(RqlError::malformed(format!(
            "unexpected text after closing quote in {}",
            text
        ))),
        None => Err(RqlError::malformed(format!("cannot dequote {}", text))),
    }
}
