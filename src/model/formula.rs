//! Model formula parsing
//!
//! Supports the subset of formula notation the analysis uses:
//!
//! - `"bp ~ RIDAGEYR + female + C(bpt) + BMXBMI"`: response and fixed
//!   effects, implicit intercept
//! - `"1 + bpi"`: random-effects formula, explicit intercept
//! - `"0 + C(bpt)"`: variance-component formula, intercept suppressed
//!   so categorical terms expand to a full one-hot block

use std::fmt;

use crate::error::{NhanesError, Result};

/// A single term on the right-hand side of a formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// A numeric column used as-is
    Numeric(String),
    /// A categorical column expanded to indicator columns, `C(name)`
    Categorical(String),
}

impl Term {
    /// Name of the underlying column
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Numeric(name) | Self::Categorical(name) => name,
        }
    }
}

/// A parsed model formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    /// Response column, absent for random-effect and variance-component
    /// formulas
    pub response: Option<String>,
    /// Whether the design carries an intercept column
    pub intercept: bool,
    /// Right-hand-side terms in source order
    pub terms: Vec<Term>,
}

impl Formula {
    /// Parse a formula string
    ///
    /// # Errors
    /// Returns an error on an empty right-hand side, repeated `~`, or a
    /// malformed term
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = text.split('~');
        let first = parts
            .next()
            .ok_or_else(|| NhanesError::Formula("empty formula".to_string()))?;
        let (response, rhs) = match parts.next() {
            Some(rhs) => {
                if parts.next().is_some() {
                    return Err(NhanesError::Formula(format!(
                        "more than one '~' in formula {text:?}"
                    )));
                }
                let lhs = first.trim();
                if lhs.is_empty() {
                    return Err(NhanesError::Formula(format!(
                        "empty response in formula {text:?}"
                    )));
                }
                (Some(lhs.to_string()), rhs)
            }
            None => (None, first),
        };

        let mut intercept = true;
        let mut terms = Vec::new();
        for token in rhs.split('+') {
            let token = token.trim();
            match token {
                "" => {
                    return Err(NhanesError::Formula(format!(
                        "empty term in formula {text:?}"
                    )));
                }
                "1" => intercept = true,
                "0" => intercept = false,
                _ => {
                    if let Some(inner) = token.strip_prefix("C(").and_then(|t| t.strip_suffix(')'))
                    {
                        let inner = inner.trim();
                        if inner.is_empty() {
                            return Err(NhanesError::Formula(format!(
                                "empty categorical term in formula {text:?}"
                            )));
                        }
                        terms.push(Term::Categorical(inner.to_string()));
                    } else if token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                        terms.push(Term::Numeric(token.to_string()));
                    } else {
                        return Err(NhanesError::Formula(format!(
                            "malformed term {token:?} in formula {text:?}"
                        )));
                    }
                }
            }
        }

        if terms.is_empty() && !intercept {
            return Err(NhanesError::Formula(format!(
                "formula {text:?} has neither terms nor an intercept"
            )));
        }

        Ok(Self {
            response,
            intercept,
            terms,
        })
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(response) = &self.response {
            write!(f, "{response} ~ ")?;
        }
        let mut first = true;
        if !self.intercept {
            write!(f, "0")?;
            first = false;
        }
        for term in &self.terms {
            if !first {
                write!(f, " + ")?;
            }
            first = false;
            match term {
                Term::Numeric(name) => write!(f, "{name}")?,
                Term::Categorical(name) => write!(f, "C({name})")?,
            }
        }
        if first {
            write!(f, "1")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixed_effects_formula() {
        let f = Formula::parse("bp ~ RIDAGEYR + female + C(bpt) + BMXBMI").unwrap();
        assert_eq!(f.response.as_deref(), Some("bp"));
        assert!(f.intercept);
        assert_eq!(
            f.terms,
            vec![
                Term::Numeric("RIDAGEYR".to_string()),
                Term::Numeric("female".to_string()),
                Term::Categorical("bpt".to_string()),
                Term::Numeric("BMXBMI".to_string()),
            ]
        );
    }

    #[test]
    fn parses_intercept_suppression() {
        let f = Formula::parse("0 + C(bpt)").unwrap();
        assert_eq!(f.response, None);
        assert!(!f.intercept);
        assert_eq!(f.terms, vec![Term::Categorical("bpt".to_string())]);
    }

    #[test]
    fn parses_bare_intercept() {
        let f = Formula::parse("1").unwrap();
        assert!(f.intercept);
        assert!(f.terms.is_empty());
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(Formula::parse("bp ~ ").is_err());
        assert!(Formula::parse("bp ~ a ~ b").is_err());
        assert!(Formula::parse("bp ~ a + + b").is_err());
        assert!(Formula::parse("bp ~ C()").is_err());
        assert!(Formula::parse("0").is_err());
    }

    #[test]
    fn display_round_trips() {
        for text in [
            "bp ~ RIDAGEYR + female + C(bpt) + BMXBMI",
            "0 + sy",
            "1 + bpi",
        ] {
            let f = Formula::parse(text).unwrap();
            assert_eq!(Formula::parse(&f.to_string()).unwrap(), f);
        }
    }
}
