//! Stage transition selection and scoped variable resolution.

pub mod condition;
pub mod instance;
pub mod mapping;
pub mod path;
pub mod schema;
pub mod scope;
pub mod transition;

pub use condition::{ConditionEvaluator, ConditionProblem, ConditionSet, Operator};
pub use instance::{
    Cycle, CycleExecutionStatus, StageExecutionStatus, StageHistory, WorkerHistory, Workflow,
    WorkflowExecutionStatus,
};
pub use mapping::MappingApplier;
pub use path::PathResolver;
pub use schema::{StageSpec, Transition, ValidationSettings, WorkflowSpecification};
pub use scope::{Destination, ScopeKind, ScopedVariableResolver, VariableScopes};
pub use transition::StageTransitionSelector;
