//! The argument expression sub-language.
//!
//! Argument values in a metrics document may be given as a small date
//! arithmetic expression instead of a literal mapping, e.g.
//!
//! ```text
//! paginator_args: "StartTime = now - 4 weeks, EndTime = now"
//! ```
//!
//! The grammar is fixed and tiny — the only operations are the current
//! moment and subtracting a whole number of days or weeks from it:
//!
//! ```text
//! args  := [ '{' ] pair ( ',' pair )* [ '}' ]
//! pair  := ident ( '=' | ':' ) expr
//! expr  := 'now' | 'now' '-' integer unit
//! unit  := 'day' | 'days' | 'week' | 'weeks'
//! ```
//!
//! Expressions are parsed into an AST at document load time and evaluated
//! against the clock at each refresh, so the same document always parses to
//! the same spec and every refresh gets a fresh time window.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// One argument value expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgExpr {
    /// The moment of evaluation.
    Now,
    /// The moment of evaluation minus a number of days.
    DaysAgo(i64),
    /// The moment of evaluation minus a number of weeks.
    WeeksAgo(i64),
}

impl ArgExpr {
    /// Evaluate to a UTC timestamp relative to `now`.
    pub fn eval_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            ArgExpr::Now => now,
            ArgExpr::DaysAgo(n) => now - Duration::days(*n),
            ArgExpr::WeeksAgo(n) => now - Duration::weeks(*n),
        }
    }
}

/// A parsed argument expression string: an ordered list of named expressions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgsExpr {
    pairs: Vec<(String, ArgExpr)>,
}

impl ArgsExpr {
    /// Parse an argument expression string.
    ///
    /// Returns a human-readable reason on failure; the caller wraps it into
    /// a `SpecError` naming the offending metric.
    pub fn parse(input: &str) -> Result<Self, String> {
        let inner = strip_braces(input.trim());
        if inner.is_empty() {
            return Err("expression is empty".to_string());
        }

        let mut pairs = Vec::new();
        for part in inner.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err("empty argument pair".to_string());
            }
            let (name, expr) = split_pair(part)?;
            if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(format!("invalid argument name '{name}'"));
            }
            pairs.push((name.to_string(), parse_expr(expr)?));
        }
        Ok(Self { pairs })
    }

    /// Materialize into a JSON argument mapping, binding `now` to the given
    /// instant. Timestamps are rendered as RFC 3339 UTC strings.
    pub fn eval_at(&self, now: DateTime<Utc>) -> Map<String, Value> {
        self.pairs
            .iter()
            .map(|(name, expr)| {
                let ts = expr
                    .eval_at(now)
                    .to_rfc3339_opts(SecondsFormat::Secs, true);
                (name.clone(), Value::String(ts))
            })
            .collect()
    }
}

fn strip_braces(s: &str) -> &str {
    // Unbalanced braces fall through and fail name validation.
    match s.strip_prefix('{').and_then(|inner| inner.strip_suffix('}')) {
        Some(inner) => inner.trim(),
        None => s,
    }
}

fn split_pair(part: &str) -> Result<(&str, &str), String> {
    let sep = part
        .find(['=', ':'])
        .ok_or_else(|| format!("argument pair '{part}' has no '=' or ':'"))?;
    let name = part[..sep].trim();
    let expr = part[sep + 1..].trim();
    if name.is_empty() {
        return Err(format!("argument pair '{part}' has an empty name"));
    }
    Ok((name, expr))
}

fn parse_expr(expr: &str) -> Result<ArgExpr, String> {
    let mut tokens = expr.split_whitespace();
    match tokens.next() {
        Some("now") => {}
        Some(other) => return Err(format!("expected 'now', found '{other}'")),
        None => return Err("expected an expression".to_string()),
    }

    match tokens.next() {
        None => Ok(ArgExpr::Now),
        Some("-") => {
            let amount: i64 = tokens
                .next()
                .ok_or("expected a number after '-'")?
                .parse()
                .map_err(|_| "expected a whole number after '-'".to_string())?;
            if amount < 0 {
                return Err("duration must be non-negative".to_string());
            }
            let expr = match tokens.next() {
                Some("day") | Some("days") => ArgExpr::DaysAgo(amount),
                Some("week") | Some("weeks") => ArgExpr::WeeksAgo(amount),
                Some(other) => return Err(format!("unknown duration unit '{other}'")),
                None => return Err("expected a duration unit (days or weeks)".to_string()),
            };
            match tokens.next() {
                None => Ok(expr),
                Some(extra) => Err(format!("unexpected trailing token '{extra}'")),
            }
        }
        Some(other) => Err(format!("unexpected token '{other}' after 'now'")),
    }
}
