use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

const REVIEW_SPEC: &str = r#"
id: review
name: Code review
stages:
  - key: Analyze
    type: ai-action
    isFirstStage: true
    transitions:
      - on: { verdict: fix }
        goTo: Fix
      - on: { verdict: { $in: "pass,skip" } }
        goTo: Done
  - key: Fix
    type: system-action
    transitions:
      - on: {}
        goTo: Analyze
  - key: Done
    type: system-action
"#;

fn stageflow(workspace: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stageflow").unwrap();
    cmd.current_dir(workspace.path())
        .env("STAGEFLOW_LOG_DIR", workspace.path().join("logs"))
        .env_remove("STAGEFLOW_STORE_ROOT")
        .env_remove("STAGEFLOW_MAX_REFERENCE_DEPTH")
        .env_remove("STAGEFLOW_REJECT_UNKNOWN_OPERATORS")
        .env_remove("STAGEFLOW_CONSOLE_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let workspace = TempDir::new().unwrap();
    stageflow(&workspace)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("eval"))
        .stdout(predicate::str::contains("job"));
}

#[test]
fn test_validate_prints_stage_summary() {
    let workspace = TempDir::new().unwrap();
    let spec = workspace.path().join("review.yaml");
    fs::write(&spec, REVIEW_SPEC).unwrap();

    stageflow(&workspace)
        .arg("validate")
        .arg(&spec)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Specification 'Code review' is valid (3 stages)",
        ))
        .stdout(predicate::str::contains(
            "Analyze (ai-action) [first] -> Fix, Done",
        ))
        .stdout(predicate::str::contains("Done (system-action)"));
}

#[test]
fn test_validate_rejects_dangling_transition() {
    let workspace = TempDir::new().unwrap();
    let spec = workspace.path().join("broken.json");
    fs::write(
        &spec,
        r#"{"id": "broken", "stages": [
            {"key": "A", "isFirstStage": true, "transitions": [{"on": {}, "goTo": "Nowhere"}]}
        ]}"#,
    )
    .unwrap();

    stageflow(&workspace)
        .arg("validate")
        .arg(&spec)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nowhere"));
}

#[test]
fn test_eval_prints_match_result() {
    let workspace = TempDir::new().unwrap();

    stageflow(&workspace)
        .args([
            "eval",
            "--conditions",
            r#"{"status": {"$in": "done,skipped"}, "$workflowContext.env": "prod"}"#,
            "--workflow-context",
            r#"{"env": "prod"}"#,
            "--stage-output",
            r#"{"status": "DONE"}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("true\n"));

    stageflow(&workspace)
        .args([
            "eval",
            "--conditions",
            r#"{"retries": {"$gt": 3}}"#,
            "--stage-output",
            r#"{"retries": 1}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("false\n"));
}

#[test]
fn test_eval_rejects_non_object_scope() {
    let workspace = TempDir::new().unwrap();
    stageflow(&workspace)
        .args(["eval", "--conditions", "{}", "--stage-output", "[1, 2]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--stage-output must be a JSON object"));
}

#[test]
fn test_job_runs_against_file_store() {
    let workspace = TempDir::new().unwrap();
    let store = workspace.path().join("store");
    fs::create_dir_all(store.join("specifications")).unwrap();
    fs::write(store.join("specifications").join("review.yaml"), REVIEW_SPEC).unwrap();

    let output = stageflow(&workspace)
        .args(["job", "create-workflow", "--store"])
        .arg(&store)
        .args(["--vars", r#"{"workflowSpecificationId": "review"}"#])
        .output()
        .unwrap();
    assert!(output.status.success());
    let created: Value = serde_json::from_slice(&output.stdout).unwrap();
    let workflow_id = created["workflowId"].as_str().unwrap().to_string();
    assert!(store
        .join("workflows")
        .join(format!("{}.json", workflow_id))
        .exists());

    let output = stageflow(&workspace)
        .args(["job", "create-cycle", "--store"])
        .arg(&store)
        .arg("--vars")
        .arg(format!(r#"{{"workflowId": "{}"}}"#, workflow_id))
        .output()
        .unwrap();
    assert!(output.status.success());
    let cycle: Value = serde_json::from_slice(&output.stdout).unwrap();
    let cycle_id = cycle["cycleId"].as_str().unwrap();

    stageflow(&workspace)
        .args(["job", "stage-decision", "--store"])
        .arg(&store)
        .arg("--vars")
        .arg(format!(
            r#"{{"workflowId": "{}", "cycleId": "{}"}}"#,
            workflow_id, cycle_id
        ))
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""stageKey": "Analyze""#));
}

#[test]
fn test_unknown_job_reports_worker_error() {
    let workspace = TempDir::new().unwrap();
    stageflow(&workspace)
        .args(["job", "stage-rewind", "--store"])
        .arg(workspace.path().join("store"))
        .assert()
        .failure()
        .stdout(predicate::str::contains(r#""workerExecutionStatus": "ERROR""#))
        .stdout(predicate::str::contains("Unknown job type: stage-rewind"));
}
