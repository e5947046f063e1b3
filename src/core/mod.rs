pub mod config;
pub mod error;
pub mod store;
pub mod types;
pub mod worker;
pub mod workflow;

pub use config::{ConfigLoader, StageflowConfig};
pub use error::AppError;
pub use store::{FileStore, InMemoryStore, SpecificationStore, WorkflowStore};
pub use types::*;
pub use worker::{JobType, StageWorkers};
pub use workflow::{
    ConditionEvaluator, MappingApplier, PathResolver, ScopedVariableResolver,
    StageTransitionSelector, VariableScopes, Workflow, WorkflowSpecification,
};
