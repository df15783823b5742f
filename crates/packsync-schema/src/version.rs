//! Maven-style artifact version ordering.
//!
//! Mod jars declare free-form version strings (`1.20.1-47.2.0`, `2.0.0-beta.3`,
//! `1.0`). Comparison tokenizes on `.`, `-` and digit/letter transitions,
//! compares numbers numerically and ranks well-known qualifiers:
//! `alpha < beta < milestone < rc < snapshot < release < sp < other`.
//! Trailing zero and release tokens are insignificant, so `1.0 == 1.0.0`.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Digits with leading zeros stripped; compared by length, then lexically.
    Number(String),
    Qualifier(String),
}

impl Token {
    fn is_null(&self) -> bool {
        match self {
            Token::Number(n) => n.is_empty(),
            Token::Qualifier(q) => q.is_empty(),
        }
    }

    fn cmp_to(&self, other: Option<&Token>) -> Ordering {
        match (self, other) {
            (Token::Number(a), None) => {
                if a.is_empty() {
                    Ordering::Equal
                } else {
                    Ordering::Greater
                }
            }
            (Token::Qualifier(a), None) => qualifier_rank(a).cmp(&qualifier_rank("")),
            (Token::Number(a), Some(Token::Number(b))) => {
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (Token::Number(_), Some(Token::Qualifier(_))) => Ordering::Greater,
            (Token::Qualifier(_), Some(Token::Number(_))) => Ordering::Less,
            (Token::Qualifier(a), Some(Token::Qualifier(b))) => {
                qualifier_rank(a).cmp(&qualifier_rank(b))
            }
        }
    }
}

fn qualifier_rank(q: &str) -> (u8, &str) {
    match q {
        "alpha" => (0, ""),
        "beta" => (1, ""),
        "milestone" => (2, ""),
        "rc" => (3, ""),
        "snapshot" => (4, ""),
        "" => (5, ""),
        "sp" => (6, ""),
        other => (7, other),
    }
}

fn canonical_qualifier(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    match lower.as_str() {
        "a" => "alpha".to_owned(),
        "b" => "beta".to_owned(),
        "m" => "milestone".to_owned(),
        "cr" => "rc".to_owned(),
        "ga" | "final" | "release" => String::new(),
        _ => lower,
    }
}

fn tokenize(input: &str) -> Vec<Token> {
    fn flush(buf: &mut String, digits: bool, out: &mut Vec<Token>) {
        if buf.is_empty() {
            return;
        }
        if digits {
            let trimmed = buf.trim_start_matches('0');
            out.push(Token::Number(trimmed.to_owned()));
        } else {
            out.push(Token::Qualifier(canonical_qualifier(buf)));
        }
        buf.clear();
    }

    let mut tokens = Vec::new();
    let mut buf = String::new();
    let mut digits = false;
    for c in input.trim().chars() {
        if c == '.' || c == '-' || c == '_' || c == '+' {
            flush(&mut buf, digits, &mut tokens);
            continue;
        }
        let is_digit = c.is_ascii_digit();
        if !buf.is_empty() && is_digit != digits {
            flush(&mut buf, digits, &mut tokens);
        }
        digits = is_digit;
        buf.push(c);
    }
    flush(&mut buf, digits, &mut tokens);

    while tokens.last().is_some_and(Token::is_null) {
        tokens.pop();
    }
    tokens
}

/// A declared mod version with a total ordering.
#[derive(Clone)]
pub struct ArtifactVersion {
    raw: String,
    tokens: Vec<Token>,
}

impl ArtifactVersion {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_owned(),
            tokens: tokenize(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for ArtifactVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.tokens.len().max(other.tokens.len());
        for i in 0..len {
            let ord = match (self.tokens.get(i), other.tokens.get(i)) {
                (Some(a), b) => a.cmp_to(b),
                (None, Some(b)) => b.cmp_to(None).reverse(),
                (None, None) => Ordering::Equal,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for ArtifactVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ArtifactVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ArtifactVersion {}

impl fmt::Debug for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArtifactVersion({})", self.raw)
    }
}

impl fmt::Display for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for ArtifactVersion {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}
