use chrono::Utc;
use serde_json::{json, Map, Value};
use stageflow::core::workflow::{
    StageExecutionStatus, StageHistory, StageTransitionSelector, VariableScopes,
    WorkflowSpecification,
};

fn spec(value: Value) -> WorkflowSpecification {
    serde_json::from_value(value).expect("specification")
}

fn history_with_output(output: Value) -> StageHistory {
    StageHistory {
        id: "history-1".to_string(),
        stage_key: "S1".to_string(),
        stage_type: "tool".to_string(),
        execution_status: StageExecutionStatus::Success,
        stage_input: Map::new(),
        stage_output: output.as_object().cloned().unwrap(),
        error: None,
        started_at: Utc::now(),
        ended_at: Some(Utc::now()),
    }
}

fn review_spec() -> WorkflowSpecification {
    spec(json!({
        "id": "review",
        "stages": [
            {"key": "S1", "type": "ai-action", "isFirstStage": true, "transitions": [
                {"on": {"field": "done"}, "goTo": "S2"}
            ]},
            {"key": "S2", "type": "system-action"}
        ]
    }))
}

#[test]
fn blank_previous_key_returns_first_stage() {
    let spec = review_spec();
    let empty = Map::new();
    let scopes = VariableScopes::new(&empty, &empty, &empty, &empty);
    let selector = StageTransitionSelector::default();

    let first = selector.select_next(&spec, None, None, &scopes).unwrap();
    assert_eq!(first.key, "S1");
    let first = selector.select_next(&spec, Some(""), None, &scopes).unwrap();
    assert_eq!(first.key, "S1");
}

#[test]
fn missing_or_ambiguous_first_stage_is_not_found() {
    let empty = Map::new();
    let scopes = VariableScopes::new(&empty, &empty, &empty, &empty);
    let selector = StageTransitionSelector::default();

    let none = spec(json!({"stages": [{"key": "a"}]}));
    let err = selector.select_next(&none, None, None, &scopes).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.code, "WFS-STAGE-001");

    let many = spec(json!({"stages": [
        {"key": "a", "isFirstStage": true},
        {"key": "b", "isFirstStage": true}
    ]}));
    let err = selector.select_next(&many, None, None, &scopes).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn end_to_end_match_and_miss() {
    let spec = review_spec();
    let empty = Map::new();
    let scopes = VariableScopes::new(&empty, &empty, &empty, &empty);
    let selector = StageTransitionSelector::default();

    let done = history_with_output(json!({"field": "done"}));
    let next = selector
        .select_next(&spec, Some("S1"), Some(&done), &scopes)
        .unwrap();
    assert_eq!(next.key, "S2");
    assert_eq!(next.stage_type, "system-action");

    let other = history_with_output(json!({"field": "other"}));
    let err = selector
        .select_next(&spec, Some("S1"), Some(&other), &scopes)
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        err.message,
        "No valid transition found for the current stage and variables. Reasons: transition to 'S2' didn't match"
    );
}

#[test]
fn first_declared_matching_transition_wins() {
    let spec = spec(json!({"stages": [
        {"key": "S1", "isFirstStage": true, "transitions": [
            {"on": {"score": {"$gte": 0.5}, "status": "done"}, "goTo": "Publish"},
            {"on": {"status": "done"}, "goTo": "Archive"}
        ]},
        {"key": "Publish"},
        {"key": "Archive"}
    ]}));
    let empty = Map::new();
    let scopes = VariableScopes::new(&empty, &empty, &empty, &empty);
    let selector = StageTransitionSelector::default();

    let both = history_with_output(json!({"status": "done", "score": 0.9}));
    let next = selector
        .select_next(&spec, Some("S1"), Some(&both), &scopes)
        .unwrap();
    assert_eq!(next.key, "Publish");

    let low = history_with_output(json!({"status": "done", "score": 0.1}));
    let next = selector
        .select_next(&spec, Some("S1"), Some(&low), &scopes)
        .unwrap();
    assert_eq!(next.key, "Archive");
}

#[test]
fn empty_on_map_is_skipped() {
    let spec = spec(json!({"stages": [
        {"key": "S1", "isFirstStage": true, "transitions": [
            {"on": {}, "goTo": "Anywhere"},
            {"goTo": "Anywhere"}
        ]},
        {"key": "Anywhere"}
    ]}));
    let empty = Map::new();
    let scopes = VariableScopes::new(&empty, &empty, &empty, &empty);
    let history = history_with_output(json!({"field": "done"}));

    let err = StageTransitionSelector::default()
        .select_next(&spec, Some("S1"), Some(&history), &scopes)
        .unwrap_err();
    assert!(err
        .message
        .ends_with("transition to 'Anywhere' didn't match; transition to 'Anywhere' didn't match"));
}

#[test]
fn conditions_can_read_every_scope() {
    let spec = spec(json!({"stages": [
        {"key": "S1", "isFirstStage": true, "transitions": [{
            "on": {
                "$workflowContext.repo": "core",
                "$cycleContext.attempt": {"$lt": 3},
                "$processVariable.approved": true,
                "verdict": {"$in": ["pass", "warn"]}
            },
            "goTo": "S2"
        }]},
        {"key": "S2"}
    ]}));
    let workflow = json!({"repo": "CORE"}).as_object().cloned().unwrap();
    let cycle = json!({"attempt": 1}).as_object().cloned().unwrap();
    let process = json!({"approved": true}).as_object().cloned().unwrap();
    let ignored = json!({"verdict": "fail"}).as_object().cloned().unwrap();
    let scopes = VariableScopes::new(&workflow, &cycle, &process, &ignored);
    let history = history_with_output(json!({"verdict": "Warn"}));

    let next = StageTransitionSelector::default()
        .select_next(&spec, Some("s1"), Some(&history), &scopes)
        .unwrap();
    assert_eq!(next.key, "S2");
}

#[test]
fn unknown_previous_stage_is_not_found() {
    let spec = review_spec();
    let empty = Map::new();
    let scopes = VariableScopes::new(&empty, &empty, &empty, &empty);
    let err = StageTransitionSelector::default()
        .select_next(&spec, Some("Deploy"), None, &scopes)
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.message, "Stage not found: Deploy");
}
