use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn run_skolem(input: &Path, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_skolem"))
        .arg(input)
        .args(extra)
        .output()
        .expect("Failed to execute skolem")
}

fn write_input(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn skolem_file(dir: &Path, stem: &str) -> String {
    std::fs::read_to_string(dir.join(format!("{}_skolem.v", stem)))
        .expect("Skolem output should be written")
}

#[test]
fn test_all_unate_formula() {
    let dir = tempfile::tempdir().unwrap();
    // y is true in every model: (y) and (~y | x)
    let input = write_input(dir.path(), "unate.qdimacs", "p cnf 2 2\na 1 0\ne 2 0\n2 0\n-2 1 0\n");

    let output = run_skolem(&input, &[]);
    assert!(
        output.status.success(),
        "Command failed with status: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("status: trivial"), "stdout: {}", stdout);
    assert!(stdout.contains("repairs: 0"));

    let verilog = skolem_file(dir.path(), "unate");
    assert!(verilog.starts_with("// Skolem functions (verified"));
    assert!(verilog.contains("assign o2 = 1'b1;"));

    let timing = std::fs::read_to_string(dir.path().join("unate_time_details")).unwrap();
    assert!(timing.lines().any(|l| l.starts_with("parse:")));
    assert!(timing.lines().any(|l| l.starts_with("total:")));
}

#[test]
fn test_unique_definition_without_sampling() {
    let dir = tempfile::tempdir().unwrap();
    // y <-> x
    let input = write_input(dir.path(), "equiv.qdimacs", "p cnf 2 2\na 1 0\ne 2 0\n-1 2 0\n1 -2 0\n");

    let output = run_skolem(&input, &[]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("samples:"), "no sampling expected: {}", stdout);
    assert!(skolem_file(dir.path(), "equiv").contains("assign o2 = i1;"));
}

#[test]
fn test_learn_and_repair_run() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    // y3 <-> (x1 | x2), y4 | ~y3 | x1
    let text = "c learned run\np cnf 4 4\na 1 2 0\ne 3 4 0\n-3 1 2 0\n3 -1 0\n3 -2 0\n4 -3 1 0\n";
    let input = write_input(dir.path(), "learn.qdimacs", text);

    let output = run_skolem(
        &input,
        &[
            "--no-preprocess",
            "--no-unique",
            "--samples",
            "40",
            "--output-dir",
            out_dir.path().to_str().unwrap(),
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("status: converged"), "stdout: {}", stdout);
    assert!(stdout.contains("samples: "));

    let verilog = skolem_file(out_dir.path(), "learn");
    assert!(verilog.contains("module SkolemFormula (i1, i2, o3, o4);"));
    assert!(verilog.contains("assign o3 = "));
    assert!(verilog.contains("assign o4 = "));
}

#[test]
fn test_malformed_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "bad.qdimacs", "p cnf 2 1\ne 2 0\n2 0\n");
    let output = run_skolem(&input, &[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn test_invalid_option_combination_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "equiv.qdimacs", "p cnf 2 2\na 1 0\ne 2 0\n-1 2 0\n1 -2 0\n");
    let output = run_skolem(&input, &["--uniform-sampling", "--adaptive-bias"]);
    assert!(!output.status.success());
}
