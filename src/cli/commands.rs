use crate::{
    cli::args::{EvalArgs, JobArgs, ValidateArgs},
    core::{
        worker::error_result, ConfigLoader, FileStore, StageWorkers, StageflowConfig,
        VariableScopes, WorkflowSpecification,
    },
    Result,
};
use anyhow::{anyhow, Context};
use serde_json::{Map, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::info;

fn load_config(explicit: Option<&Path>) -> Result<StageflowConfig> {
    let config = match explicit {
        Some(path) => ConfigLoader::load_explicit(path)?,
        None => ConfigLoader::load_from_workspace(&env::current_dir()?)?,
    };
    Ok(config)
}

/// Parse an inline JSON argument, or the file it names when prefixed with `@`.
/// Files ending in .yaml/.yml are read as YAML.
fn read_value_arg(raw: &str) -> Result<Value> {
    let Some(path) = raw.strip_prefix('@') else {
        return serde_json::from_str(raw).context("argument is not valid JSON");
    };
    let path = PathBuf::from(path);
    let content =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    } else {
        serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }
}

fn read_object_arg(raw: Option<&str>, name: &str) -> Result<Map<String, Value>> {
    let Some(raw) = raw else {
        return Ok(Map::new());
    };
    match read_value_arg(raw).with_context(|| format!("invalid --{}", name))? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(anyhow!(
            "--{} must be a JSON object, got {}",
            name,
            json_kind(&other)
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub async fn validate(args: ValidateArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let spec = WorkflowSpecification::load_from_file(&args.spec, &config.validation_settings())?;
    info!(spec = %args.spec.display(), stages = spec.stages.len(), "specification valid");

    let title = spec
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(spec.id.as_str());
    println!(
        "Specification '{}' is valid ({} stages)",
        title,
        spec.stages.len()
    );
    for stage in &spec.stages {
        let marker = if stage.is_first_stage { " [first]" } else { "" };
        let targets: Vec<&str> = stage
            .transitions
            .iter()
            .map(|transition| transition.go_to.as_str())
            .collect();
        if targets.is_empty() {
            println!("  {} ({}){}", stage.key, stage.stage_type, marker);
        } else {
            println!(
                "  {} ({}){} -> {}",
                stage.key,
                stage.stage_type,
                marker,
                targets.join(", ")
            );
        }
    }
    Ok(())
}

pub async fn eval(args: EvalArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let conditions = read_object_arg(Some(&args.conditions), "conditions")?;
    let workflow_context = read_object_arg(args.workflow_context.as_deref(), "workflow-context")?;
    let cycle_context = read_object_arg(args.cycle_context.as_deref(), "cycle-context")?;
    let process_variables =
        read_object_arg(args.process_variables.as_deref(), "process-variables")?;
    let stage_output = read_object_arg(args.stage_output.as_deref(), "stage-output")?;

    let scopes = VariableScopes::new(
        &workflow_context,
        &cycle_context,
        &process_variables,
        &stage_output,
    );
    let matched = config.evaluator().evaluate(&conditions, &scopes);
    println!("{}", matched);
    Ok(())
}

pub async fn job(args: JobArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let vars = read_object_arg(Some(&args.vars), "vars")?;
    let root = args.store.unwrap_or_else(|| config.store.root.clone());
    let workers = StageWorkers::with_evaluator(Arc::new(FileStore::new(root)), config.evaluator());

    match workers.handle(&args.job_type, &vars).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&Value::Object(result))?);
            Ok(())
        }
        Err(err) => {
            let result = error_result(&err.message);
            println!("{}", serde_json::to_string_pretty(&Value::Object(result))?);
            Err(err.into())
        }
    }
}
