// Copyright (c) 2025 - Cowboy AI, Inc.
//! Batch driver and result aggregation
//!
//! Units run strictly one after another in declaration order. Each unit's
//! outcome is folded into the batch result under its result key; a failing
//! unit contributes its errors and never stops the units after it.
//!
//! ```text
//! units:   f            f_1           g
//!          │ ok {f: 1}  │ err "boom"  │ ok {g: 2}
//!          ▼            ▼             ▼
//! result:  { data: { f: 1, g: 2 }, errors: [ "boom" ] }
//! ```
//!
//! When the batch is tracked, every unit's subject is settled once the unit
//! returns, so a unit that failed before its resolver ran still reaches the
//! root snapshot.

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::context::BatchContext;
use crate::errors::MutationsError;
use crate::executor::{ExecutionResult, GraphError, UnitExecutor};
use crate::split::{UnitCall, UnitOperation};
use crate::state::UnitState;

/// Folds unit results into one batch result
#[derive(Debug, Default)]
pub struct ResultAggregator {
    data: Option<Map<String, Value>>,
    errors: Option<Vec<GraphError>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one unit's result under its result key
    ///
    /// Only `data[call.name]` is taken from the unit's data.
    pub fn record(&mut self, call: &UnitCall, result: ExecutionResult) {
        if let Some(value) = result.data.and_then(|mut data| data.remove(&call.name)) {
            self.data
                .get_or_insert_with(Map::new)
                .insert(call.result_key.clone(), value);
        }
        if let Some(errors) = result.errors.filter(|errors| !errors.is_empty()) {
            self.errors.get_or_insert_with(Vec::new).extend(errors);
        }
    }

    pub fn finish(self) -> ExecutionResult {
        ExecutionResult {
            data: self.data,
            errors: self.errors,
        }
    }
}

/// Execute `units` in order and aggregate their results
pub async fn execute_units<S: UnitState>(
    units: &[UnitOperation],
    batch: &BatchContext<S>,
    executor: &dyn UnitExecutor<S>,
    unit_timeout: Option<Duration>,
) -> ExecutionResult {
    let mut aggregator = ResultAggregator::new();

    for unit in units {
        let call = &unit.call;
        let context = batch.for_unit(call);
        debug!(unit = %call.name, result_key = %call.result_key, "Executing unit");

        let result = match unit_timeout {
            None => executor.execute(unit, context).await,
            Some(limit) => match tokio::time::timeout(limit, executor.execute(unit, context)).await
            {
                Ok(result) => result,
                Err(_) => {
                    warn!(result_key = %call.result_key, timeout = ?limit, "Unit timed out");
                    let error = MutationsError::Timeout(format!(
                        "{} did not complete within {:?}",
                        call.result_key, limit
                    ));
                    ExecutionResult::from_error(
                        GraphError::new(error.to_string()).with_path(&call.result_key),
                    )
                }
            },
        };

        if result.has_errors() {
            warn!(
                result_key = %call.result_key,
                errors = result.errors.as_ref().map_or(0, Vec::len),
                "Unit failed"
            );
        }
        if let Some(tree) = batch.tree() {
            tree.settle(&call.result_key);
        }
        aggregator.record(call, result);
    }

    aggregator.finish()
}
