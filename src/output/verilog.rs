//! Verilog rendering of the Skolem vector
//!
//! Universal variable `n` becomes input `i<n>`, existential variable `n`
//! becomes output `o<n>`. Assignments follow the dependency order, so a
//! definition only reads outputs assigned above it.

use crate::ir::{Expr, Formula, Var};
use crate::synth::result::SynthResult;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

fn name(formula: &Formula, v: Var) -> String {
    if formula.vars().is_universal(v) {
        format!("i{}", v.0)
    } else {
        format!("o{}", v.0)
    }
}

pub fn render_expr(formula: &Formula, expr: &Expr) -> String {
    match expr {
        Expr::Const(true) => "1'b1".to_string(),
        Expr::Const(false) => "1'b0".to_string(),
        Expr::Lit(l) if l.is_positive() => name(formula, l.var()),
        Expr::Lit(l) => format!("~{}", name(formula, l.var())),
        Expr::Not(e) => format!("~({})", render_expr(formula, e)),
        Expr::And(items) => join(formula, items, " & "),
        Expr::Or(items) => join(formula, items, " | "),
    }
}

fn join(formula: &Formula, items: &[Expr], op: &str) -> String {
    let parts: Vec<String> = items.iter().map(|e| render_expr(formula, e)).collect();
    format!("({})", parts.join(op))
}

/// The `SkolemFormula` module for `result`
pub fn render_module(formula: &Formula, result: &SynthResult) -> String {
    let inputs: Vec<String> = formula
        .universals()
        .iter()
        .map(|&v| name(formula, v))
        .collect();
    let outputs: Vec<String> = formula
        .existentials()
        .iter()
        .map(|&v| name(formula, v))
        .collect();
    let mut ports = inputs.clone();
    ports.extend(outputs.iter().cloned());

    let mut out = String::new();
    let verdict = if result.is_verified() {
        "verified"
    } else {
        "unverified"
    };
    let _ = writeln!(out, "// Skolem functions ({}, {})", verdict, result.status);
    let _ = writeln!(out, "module SkolemFormula ({});", ports.join(", "));
    if !inputs.is_empty() {
        let _ = writeln!(out, "input {};", inputs.join(", "));
    }
    if !outputs.is_empty() {
        let _ = writeln!(out, "output {};", outputs.join(", "));
    }
    for (v, expr) in result.candidates.iter() {
        let _ = writeln!(out, "assign {} = {};", name(formula, v), render_expr(formula, expr));
    }
    out.push_str("endmodule\n");
    out
}

/// Write `<dir>/<stem>_skolem.v`
pub fn write_skolem(
    dir: &Path,
    stem: &str,
    formula: &Formula,
    result: &SynthResult,
) -> io::Result<PathBuf> {
    let path = dir.join(format!("{}_skolem.v", stem));
    std::fs::write(&path, render_module(formula, result))?;
    log::info!("wrote {}", path.display());
    Ok(path)
}
