pub mod args;
pub mod commands;

pub use args::{EvalArgs, JobArgs, ValidateArgs};
use clap::{Parser, Subcommand};

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "stageflow")]
#[command(version = crate::VERSION)]
#[command(about = "Stage transition and variable resolution engine for workflow specifications")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: validate a specification, try conditions with eval, then let the process engine drive job handlers."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Check a workflow specification",
        long_about = "Validate parses a specification, checks stage keys, the first stage, transition targets and condition operators, then prints a stage summary.",
        after_help = "Example:\n    stageflow validate ./specs/review.yaml"
    )]
    Validate(ValidateArgs),
    #[command(
        about = "Evaluate a condition map against scopes",
        long_about = "Eval runs the condition evaluator over the given workflow, cycle, process-variable and stage-output scopes and prints true or false.",
        after_help = "Example:\n    stageflow eval --conditions '{\"status\": {\"$in\": \"done,skipped\"}}' --stage-output '{\"status\": \"DONE\"}'"
    )]
    Eval(EvalArgs),
    #[command(
        about = "Run one job handler against the file store",
        long_about = "Job executes a single handler (create-workflow, create-cycle, stage-decision, stage-pre-processing, stage-post-processing, cycle-complete-success, workflow-complete-success, flow-complete-error) and prints the result variables as JSON.",
        after_help = "Example:\n    stageflow job create-workflow --store ./.stageflow --vars '{\"workflowSpecificationId\": \"review\"}'"
    )]
    Job(JobArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    match args.command {
        Command::Validate(validate_args) => commands::validate(validate_args).await,
        Command::Eval(eval_args) => commands::eval(eval_args).await,
        Command::Job(job_args) => commands::job(job_args).await,
    }
}
