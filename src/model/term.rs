//! Terms and literals
//!
//! A `Term` is what the tokenizer produces: a word or a nested call.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// A dequoted literal word from the query string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Literal {
    raw: String,
    quoted: bool,
}

impl Literal {
    /// Create a literal from dequoted text
    pub fn new(raw: impl Into<String>, quoted: bool) -> Self {
        Self {
            raw: raw.into(),
            quoted,
        }
    }

    /// Create an unquoted literal
    pub fn bare(raw: impl Into<String>) -> Self {
        Self::new(raw, false)
    }

    /// Create a quoted literal (always a string)
    pub fn quoted(raw: impl Into<String>) -> Self {
        Self::new(raw, true)
    }

    /// The dequoted text
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// Unquoted `null`
    pub fn is_null(&self) -> bool {
        !self.quoted && self.raw.eq_ignore_ascii_case("null")
    }

    /// Returns true if the text contains the wildcard glyph
    pub fn has_wildcard(&self, glyph: char) -> bool {
        self.raw.contains(glyph)
    }

    /// Typed JSON value for bind parameters.
    ///
    /// Quoted literals are strings. Bare words become null, booleans or
    /// numbers when they read as one; numbers with a leading zero stay
    /// strings so codes like `02134` survive.
    pub fn to_json(&self) -> Value {
        if self.quoted {
            return Value::String(self.raw.clone());
        }

        let lower = self.raw.to_ascii_lowercase();
        match lower.as_str() {
            "null" => return Value::Null,
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }

        if has_leading_zero(&self.raw) {
            return Value::String(self.raw.clone());
        }

        if let Ok(n) = self.raw.parse::<i64>() {
            return Value::Number(n.into());
        }
        if looks_numeric(&self.raw) {
            if let Some(num) = self
                .raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
            {
                return Value::Number(num);
            }
        }

        Value::String(self.raw.clone())
    }
}

fn has_leading_zero(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.")
}

fn looks_numeric(raw: &str) -> bool {
    !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

impl fmt::Display for Literal {
    /// Renders the literal back as RQL text
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(
                f,
                "\"{}\"",
                self.raw.replace('\\', "\\\\").replace('"', "\\\"")
            )
        } else {
            write!(f, "{}", self.raw)
        }
    }
}

/// A parsed expression term
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// A bare or quoted word
    Word(Literal),
    /// A function call such as `eq(city,Chandler)`
    Call { name: String, args: Vec<Term> },
}

impl Term {
    /// Returns the literal if this term is a word
    pub fn as_word(&self) -> Option<&Literal> {
        match self {
            Term::Word(lit) => Some(lit),
            Term::Call { .. } => None,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Term::Call { .. })
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Word(lit) => write!(f, "{}", lit),
            Term::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_literal_typing() {
        assert_eq!(Literal::bare("25").to_json(), json!(25));
        assert_eq!(Literal::bare("2.5").to_json(), json!(2.5));
        assert_eq!(Literal::bare("TRUE").to_json(), json!(true));
        assert_eq!(Literal::bare("null").to_json(), Value::Null);
        assert_eq!(Literal::bare("CHANDLER").to_json(), json!("CHANDLER"));
    }

    #[test]
    fn test_quoted_literal_is_string() {
        assert_eq!(Literal::quoted("42").to_json(), json!("42"));
        assert_eq!(Literal::quoted("null").to_json(), json!("null"));
        assert!(!Literal::quoted("null").is_null());
    }

    #[test]
    fn test_leading_zero_stays_string() {
        assert_eq!(Literal::bare("02134").to_json(), json!("02134"));
        assert_eq!(Literal::bare("0").to_json(), json!(0));
        assert_eq!(Literal::bare("0.5").to_json(), json!(0.5));
    }

    #[test]
    fn test_non_finite_stays_string() {
        assert_eq!(Literal::bare("NaN").to_json(), json!("NaN"));
        assert_eq!(Literal::bare("inf").to_json(), json!("inf"));
    }

    #[test]
    fn test_display_round_trips_quotes() {
        assert_eq!(Literal::quoted("f\"x").to_string(), "\"f\\\"x\"");
        assert_eq!(Literal::bare("abc").to_string(), "abc");
    }

    #[test]
    fn test_term_display() {
        let term = Term::Call {
            name: "eq".into(),
            args: vec![
                Term::Word(Literal::bare("city")),
                Term::Word(Literal::quoted("Chandler")),
            ],
        };
        assert_eq!(term.to_string(), "eq(city,\"Chandler\")");
    }
}
