//! End-to-end checks of the `lectern` binary.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use pretty_assertions::assert_eq;
use serde_json::Value;

const NOTE: &str = "An empirical study of how trust develops across distributed teams.";

fn lectern(project: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lectern"))
        .args(args)
        .arg("--project")
        .arg(project)
        .current_dir(project)
        .env_remove("LECTERN_LOG")
        .output()
        .expect("lectern should spawn")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn record(key: &str, doi: &str) -> String {
    format!(
        "@article{{{key},\n  title = {{Trust in Distributed Teams}},\n  author = {{Doe, Jane}},\n  \
         year = {{2021}},\n  doi = {{{doi}}},\n  note = {{{NOTE}}},\n}}\n"
    )
}

#[test]
fn validate_fails_on_violations_and_reports_them() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.bib"), "@article{k, title = {Only a title}}").unwrap();

    let output = lectern(dir.path(), &["validate", "bad.bib"]);
    assert!(!output.status.success());

    let report = stdout_json(&output);
    assert_eq!(report["valid"], false);
    let rules: Vec<&str> = report["violations"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v["rule"].as_str())
        .collect();
    assert!(rules.contains(&"required_field"), "{rules:?}");
    assert!(String::from_utf8_lossy(&output.stderr).contains("lectern error"));
}

#[test]
fn dedupe_folds_records_sharing_a_doi() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.bib"), record("doe2021", "10.1000/trust")).unwrap();
    std::fs::write(
        dir.path().join("b.bib"),
        record("doe2021b", "https://doi.org/10.1000/TRUST"),
    )
    .unwrap();

    let output = lectern(
        dir.path(),
        &["dedupe", "a.bib", "b.bib", "-o", "all.bib", "--report", "report.json"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let response = stdout_json(&output);
    assert_eq!(response["records_in"], 2);
    assert_eq!(response["entries_out"], 1);
    assert_eq!(response["duplicates_folded"], 1);

    let merged = std::fs::read_to_string(dir.path().join("all.bib")).unwrap();
    assert_eq!(merged.matches("@article{").count(), 1);
    assert!(merged.contains("@article{doe2021,"));
    assert!(dir.path().join("report.json").is_file());
}

#[test]
fn guard_write_denies_invalid_bibliography_content() {
    let dir = tempfile::tempdir().unwrap();
    let payload = serde_json::json!({
        "tool_name": "Write",
        "tool_input": {
            "file_path": "intermediate_files/literature-domain-1.bib",
            "content": "@article{k, title = {T}}"
        }
    });

    let mut child = Command::new(env!("CARGO_BIN_EXE_lectern"))
        .args(["hook", "guard-write", "--project"])
        .arg(dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(payload.to_string().as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let answer = stdout_json(&output);
    assert_eq!(answer["hookSpecificOutput"]["permissionDecision"], "deny");
    assert!(
        answer["hookSpecificOutput"]["denyReason"]
            .as_str()
            .unwrap()
            .contains("k: required_field")
    );
}

#[test]
fn schema_lists_registered_names() {
    let dir = tempfile::tempdir().unwrap();
    let output = lectern(dir.path(), &["schema"]);
    assert!(output.status.success());
    let names = stdout_json(&output);
    assert!(names.as_array().unwrap().iter().any(|n| n == "ledger_entry"));
}

#[cfg(unix)]
mod pipeline {
    use super::*;
    use pretty_assertions::assert_eq;

    const WORKER: &str = r#"#!/bin/sh
set -e
case "$LECTERN_ROLE" in
  planner)
    printf '# Plan\n\n### Domain 1: Foundations\nScope.\n\n### Domain 2: Practice\nScope.\n' > "$LECTERN_OUTPUT"
    ;;
  researcher)
    if [ "$LECTERN_UNIT" = "$FAIL_UNIT" ]; then
      echo "search backend unavailable" >&2
      exit 3
    fi
    cat > "$LECTERN_OUTPUT" <<BIB
@article{paper$LECTERN_UNIT,
  title = {Study $LECTERN_UNIT on trust},
  author = {Doe, Jane},
  year = {202$LECTERN_UNIT},
  journal = {Journal of Trust},
  note = {An empirical study of how trust develops across distributed teams.},
}
BIB
    ;;
  synthesis_planner)
    printf '# Outline\n\n## Background\nA.\n\n## Findings\nB.\n' > "$LECTERN_OUTPUT"
    ;;
  writer)
    printf '## Section %s\n\nEvidence [@paper%s].\n' "$LECTERN_UNIT" "$LECTERN_UNIT" > "$LECTERN_OUTPUT"
    ;;
esac
"#;

    fn project(fail_unit: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("worker.sh");
        std::fs::write(&script, WORKER).unwrap();

        let command = format!("command = [\"sh\", \"{}\"]", script.display());
        let env = format!("env = {{ FAIL_UNIT = \"{fail_unit}\" }}");
        let config = ["planner", "researcher", "synthesis_planner", "writer"]
            .iter()
            .map(|role| format!("[workers.{role}]\n{command}\n{env}\n"))
            .collect::<Vec<_>>()
            .join("\n");
        std::fs::create_dir(dir.path().join(".lectern")).unwrap();
        std::fs::write(dir.path().join(".lectern/config.toml"), config).unwrap();
        dir
    }

    #[test]
    fn run_completes_with_command_workers() {
        let dir = project("none");
        let output = lectern(dir.path(), &["run", "Trust in teams"]);
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

        let response = stdout_json(&output);
        assert_eq!(response["complete"], true);
        assert_eq!(response["phases_run"].as_array().unwrap().len(), 5);

        let run_root = dir.path().join("reviews/trust-in-teams");
        let review = std::fs::read_to_string(run_root.join("literature-review-final.md")).unwrap();
        assert!(review.contains("## Section 1"));
        assert!(review.contains("Doe, J. (2021). Study 1 on trust. Journal of Trust."));

        let status = stdout_json(&lectern(dir.path(), &["status", "Trust in teams"]));
        assert_eq!(status["next_pending"], Value::Null);
        assert!(status["phases"].as_array().unwrap().iter().all(|p| p["complete"] == true));

        let ledger = run_root.join("intermediate_files/progress-ledger.jsonl");
        let check = lectern(
            dir.path(),
            &["hook", "validate-ledger", ledger.to_str().unwrap()],
        );
        assert!(check.status.success(), "{}", String::from_utf8_lossy(&check.stdout));
    }

    #[test]
    fn failing_worker_stops_the_run_and_is_resumable() {
        let dir = project("2");
        let output = lectern(dir.path(), &["run", "Trust in teams"]);
        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("phase research did not complete"), "{stderr}");
        assert!(stderr.contains("search backend unavailable"), "{stderr}");

        let status = stdout_json(&lectern(dir.path(), &["status", "Trust in teams"]));
        assert_eq!(status["next_pending"], "research");
        assert_eq!(status["phases"][1]["last_status"], "failed");
        assert_eq!(status["phases"][0]["complete"], true);
    }
}
