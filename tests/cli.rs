#![allow(missing_docs)]

use std::path::PathBuf;
use std::process::{Command, Output};

fn hornlog(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hornlog"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn rule_file(name: &str, source: &str) -> PathBuf {
    let path = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    std::fs::write(&path, source).unwrap();
    path
}

#[test]
fn test_bundled_rules_pass() {
    let output = hornlog(&["rules/lookup.hl", "rules/lambda.hl", "rules/lists.hl"]);
    let out = stdout(&output);
    assert!(output.status.success(), "{out}");
    assert!(out.contains("rules/lambda.hl"), "{out}");
    assert!(out.contains("PASS line"), "{out}");
    assert!(!out.contains("FAIL"), "{out}");
    assert!(out.trim_end().ends_with(" 0 failed"), "{out}");
}

#[test]
fn test_failing_block_exits_nonzero() {
    let path = rule_file("failing_block.hl", "Pick A.\n## Pick x\n#. x: B\n");
    let output = hornlog(&[path.to_str().unwrap()]);
    let out = stdout(&output);
    assert!(!output.status.success(), "{out}");
    assert!(out.contains("FAIL line 2: Pick x"), "{out}");
    assert!(out.contains("x: expected `B`, got `A`"), "{out}");
    assert!(out.contains("0 passed, 1 failed"), "{out}");
}

#[test]
fn test_unreadable_file_exits_nonzero() {
    let output = hornlog(&["rules/missing.hl"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("failed to read rules/missing.hl"));
}

#[test]
fn test_malformed_file_exits_nonzero() {
    let path = rule_file("malformed.hl", "Pick A\n");
    let output = hornlog(&[path.to_str().unwrap()]);
    let err = stderr(&output);
    assert!(!output.status.success());
    assert!(err.contains("failed to load"), "{err}");
    assert!(err.contains("expected '.'"), "{err}");
}

#[test]
fn test_query_prints_each_solution() {
    let output = hornlog(&["rules/lists.hl", "-q", "Append xs ys [1, 2]"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output).lines().collect::<Vec<_>>(),
        vec![
            "xs: []; ys: [1, 2]",
            "xs: [1]; ys: [2]",
            "xs: [1, 2]; ys: []",
        ]
    );
}

#[test]
fn test_query_limit() {
    let output = hornlog(&["rules/lists.hl", "-q", "Member x a", "-n", "2"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).lines().count(), 2);
}

#[test]
fn test_undefined_predicate_query() {
    let output = hornlog(&["rules/lookup.hl", "-q", "Lookup (Bind A []) Z v"]);
    assert!(!output.status.success());
    assert_eq!(stdout(&output).trim(), "no");
    let err = stderr(&output);
    assert!(err.contains("undefined predicate: Lookup/3"), "{err}");
}

#[cfg(feature = "serde")]
#[test]
fn test_json_report() {
    let output = hornlog(&["rules/lookup.hl", "--json"]);
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let outcomes = report["outcomes"].as_array().unwrap();
    assert!(!outcomes.is_empty());
    assert_eq!(outcomes[0]["query"], "LookUp (Bind X (Bind Y [])) (S Z) v");
}
