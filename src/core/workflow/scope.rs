//! Variable scopes and `$`-prefixed expression resolution.
//!
//! Expression syntax: a string starting with [`VARIABLE_MARKER`], optionally followed by one of
//! `workflowContext.`, `cycleContext.` or `processVariable.` and a dotted path. A marked
//! expression without a recognised prefix is a path into the current stage output. Anything
//! else is a literal.

use crate::core::workflow::path::PathResolver;
use serde_json::{Map, Value};

/// Marker that turns a string into a scoped variable reference.
pub const VARIABLE_MARKER: char = '$';

/// The four namespaces an expression can resolve against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Workflow,
    Cycle,
    ProcessVariable,
    StageOutput,
}

/// Prefixed scopes, in the order they are tried.
const PREFIX_TABLE: [(ScopeKind, &str); 3] = [
    (ScopeKind::Workflow, "workflowContext."),
    (ScopeKind::Cycle, "cycleContext."),
    (ScopeKind::ProcessVariable, "processVariable."),
];

impl ScopeKind {
    /// Name used in expressions and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Workflow => "workflowContext",
            ScopeKind::Cycle => "cycleContext",
            ScopeKind::ProcessVariable => "processVariable",
            ScopeKind::StageOutput => "stageOutput",
        }
    }

    /// Split an expression (marker already removed) into its scope and the remaining path.
    /// Unprefixed expressions address the stage output in full.
    pub fn split(expression: &str) -> (ScopeKind, &str) {
        PREFIX_TABLE
            .iter()
            .find_map(|(kind, prefix)| expression.strip_prefix(prefix).map(|path| (*kind, path)))
            .unwrap_or((ScopeKind::StageOutput, expression))
    }
}

impl std::fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strip the variable marker, returning `None` for literal strings.
pub fn strip_marker(expression: &str) -> Option<&str> {
    expression.strip_prefix(VARIABLE_MARKER)
}

/// Whether `value` is a string reference to a scoped variable.
pub fn is_reference(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.starts_with(VARIABLE_MARKER))
}

/// Borrowed view over the four variable namespaces of one resolution session.
#[derive(Debug, Clone, Copy)]
pub struct VariableScopes<'a> {
    pub workflow_context: &'a Map<String, Value>,
    pub cycle_context: &'a Map<String, Value>,
    pub process_variables: &'a Map<String, Value>,
    pub stage_output: &'a Map<String, Value>,
}

impl<'a> VariableScopes<'a> {
    pub fn new(
        workflow_context: &'a Map<String, Value>,
        cycle_context: &'a Map<String, Value>,
        process_variables: &'a Map<String, Value>,
        stage_output: &'a Map<String, Value>,
    ) -> Self {
        Self {
            workflow_context,
            cycle_context,
            process_variables,
            stage_output,
        }
    }

    /// Backing map for a scope.
    pub fn scope(&self, kind: ScopeKind) -> &'a Map<String, Value> {
        match kind {
            ScopeKind::Workflow => self.workflow_context,
            ScopeKind::Cycle => self.cycle_context,
            ScopeKind::ProcessVariable => self.process_variables,
            ScopeKind::StageOutput => self.stage_output,
        }
    }

    /// Look up an expression whose marker has already been removed.
    pub fn lookup(&self, expression: &str) -> Option<&'a Value> {
        let (kind, path) = ScopeKind::split(expression);
        PathResolver::get(self.scope(kind), path)
    }
}

/// Resolves expressions against a [`VariableScopes`] view.
pub struct ScopedVariableResolver;

impl ScopedVariableResolver {
    /// Resolve an expression into a value. Non-string values and unmarked strings are literals
    /// and come back unchanged; unresolvable references yield `Value::Null`.
    pub fn resolve(expression: &Value, scopes: &VariableScopes<'_>) -> Value {
        match expression {
            Value::String(text) => match strip_marker(text) {
                Some(reference) => scopes.lookup(reference).cloned().unwrap_or(Value::Null),
                None => expression.clone(),
            },
            literal => literal.clone(),
        }
    }

    /// Resolve a condition key. Keys follow the same prefix rules as expressions but the marker
    /// is optional: an unmarked key is still a variable path, never a literal.
    pub fn resolve_key<'a>(raw_key: &str, scopes: &VariableScopes<'a>) -> Option<&'a Value> {
        let key = strip_marker(raw_key).unwrap_or(raw_key);
        scopes.lookup(key)
    }
}

/// Write target of an output mapping entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination<'e> {
    pub kind: ScopeKind,
    pub path: &'e str,
}

impl<'e> Destination<'e> {
    /// Parse a destination expression. The marker is optional; the stage output is read-only, so
    /// an unprefixed destination yields `None`.
    pub fn parse(expression: &'e str) -> Option<Self> {
        let unmarked = strip_marker(expression).unwrap_or(expression);
        match ScopeKind::split(unmarked) {
            (ScopeKind::StageOutput, _) => None,
            (_, "") => None,
            (kind, path) => Some(Destination { kind, path }),
        }
    }
}
