use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct ValidateArgs {
    /// Specification file (.yaml, .yml or .json)
    #[arg(value_name = "SPEC")]
    pub spec: PathBuf,

    /// Config file to use instead of ./stageflow.toml
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct EvalArgs {
    /// Condition map as inline JSON or @file
    #[arg(long, value_name = "JSON|@FILE")]
    pub conditions: String,

    /// Workflow context as inline JSON or @file
    #[arg(long, value_name = "JSON|@FILE", help_heading = "Scopes")]
    pub workflow_context: Option<String>,

    /// Cycle context as inline JSON or @file
    #[arg(long, value_name = "JSON|@FILE", help_heading = "Scopes")]
    pub cycle_context: Option<String>,

    /// Process variables as inline JSON or @file
    #[arg(long, value_name = "JSON|@FILE", help_heading = "Scopes")]
    pub process_variables: Option<String>,

    /// Stage output as inline JSON or @file
    #[arg(long, value_name = "JSON|@FILE", help_heading = "Scopes")]
    pub stage_output: Option<String>,

    /// Config file to use instead of ./stageflow.toml
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct JobArgs {
    /// Job type, e.g. stage-decision
    #[arg(value_name = "JOB_TYPE")]
    pub job_type: String,

    /// Job variables as inline JSON or @file
    #[arg(long, value_name = "JSON|@FILE", default_value = "{}")]
    pub vars: String,

    /// File store root (default: store.root from config)
    #[arg(long, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Config file to use instead of ./stageflow.toml
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
