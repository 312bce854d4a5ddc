// Copyright (c) 2025 - Cowboy AI, Inc.
//! Execution Contexts
//!
//! ```text
//! BatchContext        one per execute(); config, variables, extensions,
//!   │                 query executor, aggregation tree
//!   └─ UnitContext    one per unit call; adds the call and its subject
//!        └─ MutationContext   what a resolver sees; adds the state updater
//! ```
//!
//! Contexts are built fresh for every batch and never mutated afterwards;
//! the `with_*` methods return new values.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::aggregation::AggregationTree;
use crate::errors::{MutationsError, MutationsResult};
use crate::executor::{ExecutionResult, Query, QueryExecutor};
use crate::split::UnitCall;
use crate::state::{CoreState, MutationStateSubject, StateUpdater, UnitState};

/// Per-batch context shared by every unit
pub struct BatchContext<S = CoreState> {
    config: Arc<Value>,
    variables: Arc<Map<String, Value>>,
    extensions: Arc<Map<String, Value>>,
    query_executor: Option<Arc<dyn QueryExecutor>>,
    node_uri: Option<String>,
    tree: Option<Arc<AggregationTree<S>>>,
}

impl<S> Clone for BatchContext<S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            variables: self.variables.clone(),
            extensions: self.extensions.clone(),
            query_executor: self.query_executor.clone(),
            node_uri: self.node_uri.clone(),
            tree: self.tree.clone(),
        }
    }
}

impl<S: UnitState> BatchContext<S> {
    pub fn new(config: Arc<Value>) -> Self {
        Self {
            config,
            variables: Arc::new(Map::new()),
            extensions: Arc::new(Map::new()),
            query_executor: None,
            node_uri: None,
            tree: None,
        }
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = Arc::new(variables);
        self
    }

    pub fn with_extensions(mut self, extensions: Map<String, Value>) -> Self {
        self.extensions = Arc::new(extensions);
        self
    }

    pub fn with_query_executor(
        mut self,
        executor: Arc<dyn QueryExecutor>,
        node_uri: Option<String>,
    ) -> Self {
        self.query_executor = Some(executor);
        self.node_uri = node_uri;
        self
    }

    pub fn with_tree(mut self, tree: Arc<AggregationTree<S>>) -> Self {
        self.tree = Some(tree);
        self
    }

    pub fn config(&self) -> &Value {
        &self.config
    }

    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    pub fn extensions(&self) -> &Map<String, Value> {
        &self.extensions
    }

    pub fn tree(&self) -> Option<&AggregationTree<S>> {
        self.tree.as_deref()
    }

    /// Context for one unit call, attaching its subject if the batch is stateful
    pub fn for_unit(&self, call: &UnitCall) -> UnitContext<S> {
        UnitContext {
            subject: self.tree.as_ref().and_then(|tree| tree.subject(&call.result_key)),
            batch: self.clone(),
            call: call.clone(),
        }
    }
}

/// Context for one unit call
pub struct UnitContext<S = CoreState> {
    batch: BatchContext<S>,
    call: UnitCall,
    subject: Option<MutationStateSubject<S>>,
}

impl<S> Clone for UnitContext<S> {
    fn clone(&self) -> Self {
        Self {
            batch: self.batch.clone(),
            call: self.call.clone(),
            subject: self.subject.clone(),
        }
    }
}

impl<S: UnitState> UnitContext<S> {
    pub fn batch(&self) -> &BatchContext<S> {
        &self.batch
    }

    pub fn call(&self) -> &UnitCall {
        &self.call
    }

    pub fn subject(&self) -> Option<&MutationStateSubject<S>> {
        self.subject.as_ref()
    }

    pub fn variables(&self) -> &Map<String, Value> {
        self.batch.variables()
    }
}

/// Context passed to resolvers
///
/// Carries the resolved configuration, the request extensions and the
/// unit's [`StateUpdater`].
pub struct MutationContext<S = CoreState> {
    unit: UnitContext<S>,
    state: StateUpdater<S>,
}

impl<S> Clone for MutationContext<S> {
    fn clone(&self) -> Self {
        Self {
            unit: self.unit.clone(),
            state: self.state.clone(),
        }
    }
}

impl<S: UnitState> MutationContext<S> {
    pub fn new(unit: UnitContext<S>, state: StateUpdater<S>) -> Self {
        Self { unit, state }
    }

    /// State updater for this unit execution
    pub fn state(&self) -> &StateUpdater<S> {
        &self.state
    }

    /// Resolved configuration object
    pub fn config(&self) -> &Value {
        self.unit.batch.config()
    }

    /// Decode one configuration entry
    ///
    /// A missing key decodes from `null`.
    pub fn config_value<T: DeserializeOwned>(&self, key: &str) -> serde_json::Result<T> {
        T::deserialize(self.config().get(key).unwrap_or(&Value::Null))
    }

    pub fn extensions(&self) -> &Map<String, Value> {
        self.unit.batch.extensions()
    }

    pub fn result_key(&self) -> &str {
        &self.unit.call.result_key
    }

    pub fn unit(&self) -> &UnitContext<S> {
        &self.unit
    }

    /// Run a read query against the configured node
    pub async fn query(&self, query: Query) -> MutationsResult<ExecutionResult> {
        let batch = &self.unit.batch;
        match (&batch.query_executor, &batch.node_uri) {
            (Some(executor), Some(uri)) => Ok(executor.execute(query, uri).await),
            _ => Err(MutationsError::NoQueryExecutor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frp::Subject;
    use crate::state::StateBuilder;
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl QueryExecutor for Echo {
        async fn execute(&self, query: Query, uri: &str) -> ExecutionResult {
            let mut data = Map::new();
            data.insert("uri".into(), json!(uri));
            data.insert("query".into(), json!(query.query));
            ExecutionResult::from_data(data)
        }
    }

    fn mutation_context(batch: BatchContext) -> MutationContext {
        let unit = batch.for_unit(&UnitCall {
            name: "f".into(),
            result_key: "f_1".into(),
        });
        let state = StateUpdater::new("u", Arc::new(Default::default()), None);
        MutationContext::new(unit, state)
    }

    #[test]
    fn test_config_value_decoding() {
        let ctx = mutation_context(BatchContext::new(Arc::new(json!({ "retries": 3 }))));

        assert_eq!(ctx.config_value::<u32>("retries").unwrap(), 3);
        assert_eq!(ctx.config_value::<Option<u32>>("missing").unwrap(), None);
        assert!(ctx.config_value::<u32>("missing").is_err());
        assert_eq!(ctx.result_key(), "f_1");
    }

    #[test]
    fn test_unit_context_has_no_subject_without_tree() {
        let batch = BatchContext::<CoreState>::new(Arc::new(json!({})));
        let unit = batch.for_unit(&UnitCall {
            name: "f".into(),
            result_key: "f".into(),
        });
        assert!(unit.subject().is_none());
    }

    #[test]
    fn test_unit_context_picks_its_subject() {
        let calls = [UnitCall {
            name: "f".into(),
            result_key: "f".into(),
        }];
        let tree = AggregationTree::build(
            &calls,
            Subject::empty(),
            Arc::new(StateBuilder::<CoreState>::default()),
        );
        let batch = BatchContext::<CoreState>::new(Arc::new(json!({}))).with_tree(Arc::new(tree));

        assert!(batch.for_unit(&calls[0]).subject().is_some());
    }

    #[tokio::test]
    async fn test_query_requires_executor_and_uri() {
        let ctx = mutation_context(BatchContext::new(Arc::new(json!({}))));
        let err = ctx.query(Query::new("{ a }")).await.unwrap_err();
        assert!(matches!(err, MutationsError::NoQueryExecutor));

        let ctx = mutation_context(
            BatchContext::new(Arc::new(json!({})))
                .with_query_executor(Arc::new(Echo), Some("http://node".into())),
        );
        let result = ctx.query(Query::new("{ a }")).await.unwrap();
        let data = result.data.unwrap();
        assert_eq!(data["uri"], json!("http://node"));
        assert_eq!(data["query"], json!("{ a }"));
    }
}
