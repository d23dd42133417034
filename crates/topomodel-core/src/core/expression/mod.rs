//! Symbolic algebraic expressions with named free symbols.
//!
//! An [`Expression`] keeps the text it was parsed from for display and a
//! canonical tree for comparison, so two spellings of the same algebra compare
//! equal: `sigma + epsilon*r == r*epsilon + sigma`.

mod ast;
mod parser;

use ast::Node;
use parser::Parser;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Syntax error at position {position}: {reason}")]
    Parse { position: usize, reason: String },
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),
    #[error("Symbol '{0}' has no bound value")]
    UnboundSymbol(String),
    #[error("Expression evaluated to NaN")]
    NotANumber,
}

#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    canonical: Node,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let tree = Parser::new(source)?.parse()?;
        Ok(Self {
            source: source.trim().to_string(),
            canonical: tree.canonicalize(),
        })
    }

    /// The text the expression was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of every symbol in the expression. Function names and `pi` are
    /// not symbols.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();
        self.canonical.collect_symbols(&mut symbols);
        symbols
    }

    pub fn contains_symbol(&self, name: &str) -> bool {
        self.free_symbols().contains(name)
    }

    /// Replaces every occurrence of `name` with a numeric value.
    ///
    /// The result's source text is the canonical rendering of the substituted
    /// tree.
    pub fn substitute(&self, name: &str, value: f64) -> Expression {
        let canonical = self.canonical.clone().substitute(name, value).canonicalize();
        Expression {
            source: canonical.to_string(),
            canonical,
        }
    }

    /// Evaluates the expression numerically.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError::UnboundSymbol`] if a free symbol has no entry
    /// in `bindings`, or [`ExpressionError::NotANumber`] on a domain error.
    pub fn evaluate(&self, bindings: &HashMap<&str, f64>) -> Result<f64, ExpressionError> {
        self.canonical.evaluate(bindings)
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Expression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::parse(s)
    }
}
