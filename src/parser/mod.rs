//! QDIMACS parser
//!
//! Reads the prenex ∀X∃Y CNF format: comment lines, a problem line, one or
//! more `a`/`e` quantifier lines terminated by `0`, then clauses terminated
//! by `0`. All universal blocks are merged into X and all existential blocks
//! into Y.

use std::fmt;
use std::path::Path;

use crate::error::SynthError;
use crate::ir::{Clause, Formula, FormulaError, Lit, Var, VariableSet};

/// Parse error with location information
#[derive(Debug, Clone)]
pub struct ParseError {
    pub line_number: usize,
    pub message: String,
    pub line_content: String,
}

impl ParseError {
    pub fn new(
        line_number: usize,
        message: impl Into<String>,
        line_content: impl Into<String>,
    ) -> Self {
        Self {
            line_number,
            message: message.into(),
            line_content: line_content.into(),
        }
    }

    /// A whole-file structural error (no single offending line)
    pub fn structural(err: FormulaError) -> Self {
        Self::new(0, err.to_string(), "")
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line_number == 0 {
            write!(f, "{}", self.message)
        } else {
            write!(
                f,
                "line {}: {}\n  | {}",
                self.line_number, self.message, self.line_content
            )
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a whitespace separated, `0`-terminated list of integers
fn parse_ints(tokens: &[&str], line_number: usize, line: &str) -> Result<Vec<i32>, ParseError> {
    tokens
        .iter()
        .map(|t| {
            t.parse::<i32>()
                .map_err(|_| ParseError::new(line_number, format!("invalid integer '{}'", t), line))
        })
        .collect()
}

/// Parse a quantifier block body into variables, requiring the `0` sentinel
fn parse_block(tokens: &[&str], line_number: usize, line: &str) -> Result<Vec<Var>, ParseError> {
    let ints = parse_ints(tokens, line_number, line)?;
    match ints.split_last() {
        Some((0, body)) => body
            .iter()
            .map(|&i| {
                if i > 0 {
                    Ok(Var(i as u32))
                } else {
                    Err(ParseError::new(
                        line_number,
                        "quantified variables must be positive",
                        line,
                    ))
                }
            })
            .collect(),
        _ => Err(ParseError::new(
            line_number,
            "quantifier line must end with 0",
            line,
        )),
    }
}

/// Parse QDIMACS text into a formula
pub fn parse_qdimacs(text: &str) -> Result<Formula, ParseError> {
    let mut universals = Vec::new();
    let mut existentials = Vec::new();
    let mut clauses: Vec<Clause> = Vec::new();
    let mut pending: Clause = Vec::new();
    let mut seen_clause = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_number = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('c') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens[0] {
            "p" => {
                if tokens.len() < 4 || tokens[1] != "cnf" {
                    return Err(ParseError::new(
                        line_number,
                        "expected 'p cnf <vars> <clauses>'",
                        raw,
                    ));
                }
                parse_ints(&tokens[2..4], line_number, raw)?;
            }
            "a" | "e" => {
                if seen_clause {
                    return Err(ParseError::new(
                        line_number,
                        "quantifier line after clauses",
                        raw,
                    ));
                }
                let block = parse_block(&tokens[1..], line_number, raw)?;
                if tokens[0] == "a" {
                    universals.extend(block);
                } else {
                    existentials.extend(block);
                }
            }
            _ => {
                seen_clause = true;
                for value in parse_ints(&tokens, line_number, raw)? {
                    match Lit::from_dimacs(value) {
                        Some(lit) => pending.push(lit),
                        None => clauses.push(std::mem::take(&mut pending)),
                    }
                }
            }
        }
    }
    if !pending.is_empty() {
        clauses.push(pending);
    }

    let vars = VariableSet::new(universals, existentials).map_err(ParseError::structural)?;
    for clause in &clauses {
        for lit in clause {
            let v = lit.var();
            if !vars.is_universal(v) && !vars.is_existential(v) {
                return Err(ParseError::new(
                    0,
                    format!("literal {} uses unquantified variable {}", lit, v),
                    "",
                ));
            }
        }
    }
    Formula::new(vars, clauses).map_err(ParseError::structural)
}

/// Read and parse a QDIMACS file
pub fn parse_file(path: &Path) -> Result<Formula, SynthError> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_qdimacs(&content)?)
}
