use serde_json::json;
use stageflow::core::store::{FileStore, SpecificationStore, WorkflowStore};
use stageflow::core::types::ErrorCategory;
use stageflow::core::workflow::{Workflow, WorkflowSpecification};
use std::fs;
use tempfile::TempDir;

fn specification() -> WorkflowSpecification {
    serde_json::from_value(json!({
        "id": "deploy",
        "context": {"env": "staging"},
        "stages": [
            {"key": "Build", "type": "tool", "isFirstStage": true,
             "transitions": [{"on": {"ok": true}, "goTo": "Ship"}]},
            {"key": "Ship", "type": "tool"}
        ]
    }))
    .unwrap()
}

#[tokio::test]
async fn workflow_round_trips_through_disk() {
    let root = TempDir::new().unwrap();
    let store = FileStore::new(root.path());

    let mut workflow = Workflow::new(specification(), Some("corr".into()));
    workflow.start_cycle().context.insert("attempt".into(), json!(1));
    store.save(&workflow).await.unwrap();

    let path = store.workflows_dir().join(format!("{}.json", workflow.id));
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());

    let loaded = store.get_one(&workflow.id).await.unwrap().unwrap();
    assert_eq!(loaded, workflow);

    workflow.context.insert("released".into(), json!(true));
    store.save(&workflow).await.unwrap();
    let reloaded = store.get_one(&workflow.id).await.unwrap().unwrap();
    assert_eq!(reloaded.context["released"], json!(true));
}

#[tokio::test]
async fn missing_documents_read_as_none() {
    let root = TempDir::new().unwrap();
    let store = FileStore::new(root.path());

    assert!(store.get_one("absent").await.unwrap().is_none());
    assert!(store.get_specification("absent").await.unwrap().is_none());
}

#[tokio::test]
async fn specifications_load_from_yaml_and_json() {
    let root = TempDir::new().unwrap();
    let store = FileStore::new(root.path());
    fs::create_dir_all(store.specifications_dir()).unwrap();

    fs::write(
        store.specifications_dir().join("review.yaml"),
        r#"
context:
  team: platform
stages:
  - key: Analyze
    type: ai-action
    isFirstStage: true
"#,
    )
    .unwrap();
    fs::write(
        store.specifications_dir().join("deploy.json"),
        serde_json::to_string(&specification()).unwrap(),
    )
    .unwrap();

    let review = store.get_specification("review").await.unwrap().unwrap();
    assert_eq!(review.id, "review");
    assert_eq!(review.context["team"], json!("platform"));
    assert_eq!(review.first_stage().unwrap().key, "Analyze");

    let deploy = store.get_specification("deploy").await.unwrap().unwrap();
    assert_eq!(deploy, specification());
}

#[tokio::test]
async fn corrupt_documents_surface_decode_errors() {
    let root = TempDir::new().unwrap();
    let store = FileStore::new(root.path());
    fs::create_dir_all(store.workflows_dir()).unwrap();
    fs::write(store.workflows_dir().join("broken.json"), "{ nope").unwrap();

    let err = store.get_one("broken").await.unwrap_err();
    assert_eq!(err.category, ErrorCategory::SerializationError);
    assert_eq!(err.code, "WFS-STORE-001");
}

#[tokio::test]
async fn path_like_ids_are_rejected() {
    let root = TempDir::new().unwrap();
    let store = FileStore::new(root.path().join("store"));

    for id in ["../outside", "nested/id", ".hidden"] {
        let err = store.get_one(id).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::ValidationError);
        let err = store.get_specification(id).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::ValidationError);
    }
}
