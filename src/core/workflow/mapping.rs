//! Stage input assembly and output dispersal.

use crate::core::workflow::path::PathResolver;
use crate::core::workflow::scope::{Destination, ScopeKind, ScopedVariableResolver, VariableScopes};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Applies a stage's input and output mappings.
pub struct MappingApplier;

impl MappingApplier {
    /// Build the stage input from `mapping` (destination field name to source expression).
    /// Sources that resolve to null are left out.
    pub fn build_input(
        mapping: &IndexMap<String, Value>,
        scopes: &VariableScopes<'_>,
    ) -> Map<String, Value> {
        let mut input = Map::new();
        for (field, source) in mapping {
            match ScopedVariableResolver::resolve(source, scopes) {
                Value::Null => debug!(field = %field, "input mapping source resolved to null"),
                value => {
                    input.insert(field.clone(), value);
                }
            }
        }
        input
    }

    /// Disperse a finished stage's output according to `mapping` (destination expression to
    /// source expression).
    ///
    /// Workflow and cycle destinations are written into the given contexts in place. The
    /// `processVariable.*` entries are returned for the external process engine. Unknown
    /// destinations are skipped.
    pub fn apply_output(
        mapping: &IndexMap<String, Value>,
        workflow_context: &mut Map<String, Value>,
        cycle_context: &mut Map<String, Value>,
        process_variables: &Map<String, Value>,
        stage_output: &Map<String, Value>,
    ) -> Map<String, Value> {
        let mut collected = Map::new();
        for (destination, source) in mapping {
            // Sources read the contexts as left by earlier entries.
            let value = {
                let scopes = VariableScopes::new(
                    workflow_context,
                    cycle_context,
                    process_variables,
                    stage_output,
                );
                ScopedVariableResolver::resolve(source, &scopes)
            };
            if value.is_null() {
                debug!(destination = %destination, "output mapping source resolved to null");
                continue;
            }

            let Some(target) = Destination::parse(destination) else {
                warn!(
                    destination = %destination,
                    "skipping output mapping entry with unrecognized destination scope"
                );
                continue;
            };
            match target.kind {
                ScopeKind::Workflow => PathResolver::set(workflow_context, target.path, value),
                ScopeKind::Cycle => PathResolver::set(cycle_context, target.path, value),
                ScopeKind::ProcessVariable => PathResolver::set(&mut collected, target.path, value),
                ScopeKind::StageOutput => {}
            }
        }
        collected
    }
}
