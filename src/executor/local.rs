// Copyright (c) 2025 - Cowboy AI, Inc.
//! Local executor
//!
//! Runs a unit directly against the resolver registry:
//!
//! 1. the sub-document must hold one mutation operation with one field
//! 2. the field must name a registered resolver
//! 3. arguments are bound from the request variables, falling back to the
//!    operation's variable defaults
//! 4. the resolver's value is projected through the field's selections

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{ExecutionResult, GraphError, UnitExecutor};
use crate::context::UnitContext;
use crate::document::{Argument, OperationDefinition, OperationType, Selection};
use crate::resolver::{Arguments, ResolveInfo, ResolverRegistry};
use crate::split::UnitOperation;
use crate::state::{CoreState, UnitState};

/// Executes units against a [`ResolverRegistry`]
pub struct LocalExecutor<S = CoreState> {
    registry: Arc<ResolverRegistry<S>>,
}

impl<S: UnitState> LocalExecutor<S> {
    pub fn new(registry: Arc<ResolverRegistry<S>>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl<S: UnitState> UnitExecutor<S> for LocalExecutor<S> {
    async fn execute(&self, unit: &UnitOperation, context: UnitContext<S>) -> ExecutionResult {
        let mut operations = unit.document.operations();
        let (Some(operation), None) = (operations.next(), operations.next()) else {
            return ExecutionResult::from_error(GraphError::new(
                "Must provide exactly one operation.",
            ));
        };

        if operation.operation != OperationType::Mutation {
            return ExecutionResult::from_error(GraphError::new(format!(
                "Schema is not configured to execute {} operation.",
                operation.operation
            )));
        }

        let [Selection::Field(field)] = operation.selections.as_slice() else {
            return ExecutionResult::from_error(GraphError::new(
                "Unit operations must select exactly one field.",
            ));
        };

        let Some(resolver) = self.registry.get(&field.name) else {
            return ExecutionResult::from_error(
                GraphError::new(format!(
                    "Cannot query field \"{}\" on type \"Mutation\".",
                    field.name
                ))
                .with_path(&field.name),
            );
        };

        let args = match bind_arguments(operation, &field.arguments, context.variables()) {
            Ok(args) => args,
            Err(error) => return ExecutionResult::from_error(error.with_path(&field.name)),
        };

        let info = ResolveInfo {
            field_name: field.name.clone(),
            result_key: context.call().result_key.clone(),
            operation_name: operation.name.clone(),
            selections: field.selections.clone(),
        };

        debug!(unit = %field.name, args = args.len(), "Resolving unit");
        match resolver.resolve(args, context, info).await {
            Ok(value) => {
                let mut data = Map::new();
                data.insert(field.name.clone(), project(&value, &field.selections));
                ExecutionResult::from_data(data)
            }
            Err(err) => {
                warn!(unit = %field.name, error = %err, "Resolver failed");
                ExecutionResult::from_error(GraphError::new(err.to_string()).with_path(&field.name))
            }
        }
    }
}

fn bind_arguments(
    operation: &OperationDefinition,
    arguments: &[Argument],
    provided: &Map<String, Value>,
) -> Result<Arguments, GraphError> {
    let mut variables = provided.clone();
    for definition in &operation.variable_definitions {
        if variables.contains_key(&definition.name) {
            continue;
        }
        if let Some(default) = &definition.default_value {
            let value = default
                .bind(&Map::new())
                .map_err(undefined_variable)?;
            variables.insert(definition.name.clone(), value);
        }
    }

    arguments
        .iter()
        .map(|argument| {
            let value = argument
                .value
                .bind(&variables)
                .map_err(undefined_variable)?;
            Ok((argument.name.clone(), value))
        })
        .collect()
}

fn undefined_variable(name: &str) -> GraphError {
    GraphError::new(format!("Variable \"${name}\" is not defined."))
}

/// Keep only the selected fields of `value`
///
/// Fields absent from the value project to `null`. Inline fragments merge
/// their fields into the parent; fragment spreads are left out.
fn project(value: &Value, selections: &[Selection]) -> Value {
    if selections.is_empty() {
        return value.clone();
    }
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| project(item, selections))
                .collect(),
        ),
        Value::Object(object) => {
            let mut projected = Map::new();
            project_into(object, selections, &mut projected);
            Value::Object(projected)
        }
        other => other.clone(),
    }
}

fn project_into(
    object: &Map<String, Value>,
    selections: &[Selection],
    out: &mut Map<String, Value>,
) {
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                let value = object.get(&field.name).unwrap_or(&Value::Null);
                out.insert(field.name.clone(), project(value, &field.selections));
            }
            Selection::InlineFragment(fragment) => project_into(object, &fragment.selections, out),
            Selection::FragmentSpread(_) => {}
        }
    }
}
