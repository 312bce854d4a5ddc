// Copyright (c) 2025 - Cowboy AI, Inc.
//! Mutations facade
//!
//! [`Mutations`] ties a [`MutationsModule`] (resolvers, config generators and
//! state builder) to a configuration and an execution engine, and exposes the
//! two entry points callers use: `execute` and `configure`.
//!
//! ```text
//! execute(MutationQuery)
//!   ├─ split document            (structural errors reject here)
//!   ├─ resolve config            (first call only, then cached)
//!   ├─ build BatchContext        (+ AggregationTree if a state subject is given)
//!   └─ run units in order ──► ExecutionResult { data?, errors? }
//! ```
//!
//! # Example
//!
//! ```rust
//! use cim_mutations::mutations::{Mutations, MutationsModule, MutationQuery};
//! use cim_mutations::resolver::ResolverMap;
//! use cim_mutations::state::{CoreState, StateBuilder};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let resolvers =
//!     ResolverMap::<CoreState>::new().with("ping", |_, _, _| async { Ok(json!("pong")) });
//! let module = MutationsModule::new(resolvers, StateBuilder::default());
//! let mutations = Mutations::new(module, json!({})).unwrap();
//!
//! let result = mutations
//!     .execute(MutationQuery::parse("mutation { ping ping }").unwrap())
//!     .await
//!     .unwrap();
//! assert_eq!(result.get("ping_1"), Some(&json!("pong")));
//! # });
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::aggregation::AggregationTree;
use crate::config::{ConfigGenerators, MutationsConfig};
use crate::context::BatchContext;
use crate::document::{Document, DocumentError};
use crate::errors::MutationsResult;
use crate::execute::execute_units;
use crate::executor::{ExecutionResult, LocalExecutor, QueryExecutor, UnitExecutor};
use crate::resolver::{ResolverMap, ResolverRegistry};
use crate::split::{split_document, UnitCall};
use crate::state::{CoreState, MutationStatesSubject, StateBuilder, UnitState};

/// Everything a mutations module supplies
pub struct MutationsModule<S = CoreState> {
    pub resolvers: ResolverMap<S>,
    pub config: ConfigGenerators,
    pub state_builder: StateBuilder<S>,
}

impl<S: UnitState> MutationsModule<S> {
    pub fn new(resolvers: ResolverMap<S>, state_builder: StateBuilder<S>) -> Self {
        Self {
            resolvers,
            config: ConfigGenerators::new(),
            state_builder,
        }
    }

    pub fn with_config(mut self, config: ConfigGenerators) -> Self {
        self.config = config;
        self
    }
}

/// One batch request
pub struct MutationQuery<S = CoreState> {
    pub document: Document,
    pub variables: Map<String, Value>,
    pub extensions: Map<String, Value>,
    /// Root subject receiving merged per-unit state while the batch runs
    pub state_subject: Option<MutationStatesSubject<S>>,
}

impl<S: UnitState> MutationQuery<S> {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            variables: Map::new(),
            extensions: Map::new(),
            state_subject: None,
        }
    }

    /// Parse document text into a query
    pub fn parse(source: &str) -> Result<Self, DocumentError> {
        Ok(Self::new(Document::parse(source)?))
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_extensions(mut self, extensions: Map<String, Value>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_state_subject(mut self, subject: MutationStatesSubject<S>) -> Self {
        self.state_subject = Some(subject);
        self
    }
}

type ExecutorFactory<S> =
    Box<dyn FnOnce(Arc<ResolverRegistry<S>>) -> Arc<dyn UnitExecutor<S>> + Send>;

struct ConfigSlot {
    args: Value,
    resolved: Option<Arc<Value>>,
}

/// Builder for [`Mutations`]
pub struct MutationsBuilder<S = CoreState> {
    module: MutationsModule<S>,
    args: Value,
    options: MutationsConfig,
    executor: Option<ExecutorFactory<S>>,
    query_executor: Option<Arc<dyn QueryExecutor>>,
}

impl<S: UnitState> MutationsBuilder<S> {
    pub fn options(mut self, options: MutationsConfig) -> Self {
        self.options = options;
        self
    }

    /// Replace the local executor with another engine
    pub fn executor(self, executor: Arc<dyn UnitExecutor<S>>) -> Self {
        self.executor_with(move |_| executor)
    }

    /// Replace the local executor with an engine built over the wrapped
    /// resolver registry
    pub fn executor_with<F>(mut self, factory: F) -> Self
    where
        F: FnOnce(Arc<ResolverRegistry<S>>) -> Arc<dyn UnitExecutor<S>> + Send + 'static,
    {
        self.executor = Some(Box::new(factory));
        self
    }

    pub fn query_executor(mut self, executor: Arc<dyn QueryExecutor>) -> Self {
        self.query_executor = Some(executor);
        self
    }

    /// Validate the configuration arguments and assemble the engine
    pub fn build(self) -> MutationsResult<Mutations<S>> {
        let MutationsModule {
            resolvers,
            config,
            state_builder,
        } = self.module;
        config.validate(&self.args)?;

        let state_builder = Arc::new(state_builder);
        let registry = Arc::new(ResolverRegistry::wrap(&resolvers, state_builder.clone()));
        let executor: Arc<dyn UnitExecutor<S>> = match self.executor {
            Some(factory) => factory(registry.clone()),
            None => Arc::new(LocalExecutor::new(registry.clone())),
        };

        info!(
            resolvers = resolvers.len(),
            config_keys = config.keys().count(),
            "Mutations module loaded"
        );

        Ok(Mutations {
            registry,
            state_builder,
            executor,
            generators: config,
            config: RwLock::new(ConfigSlot {
                args: self.args,
                resolved: None,
            }),
            query_executor: self.query_executor,
            options: self.options,
        })
    }
}

/// Batch mutation engine
pub struct Mutations<S = CoreState> {
    registry: Arc<ResolverRegistry<S>>,
    state_builder: Arc<StateBuilder<S>>,
    executor: Arc<dyn UnitExecutor<S>>,
    generators: ConfigGenerators,
    config: RwLock<ConfigSlot>,
    query_executor: Option<Arc<dyn QueryExecutor>>,
    options: MutationsConfig,
}

impl<S: UnitState> Mutations<S> {
    pub fn builder(module: MutationsModule<S>, config_args: Value) -> MutationsBuilder<S> {
        MutationsBuilder {
            module,
            args: config_args,
            options: MutationsConfig::default(),
            executor: None,
            query_executor: None,
        }
    }

    /// Engine with the local executor and default options
    pub fn new(module: MutationsModule<S>, config_args: Value) -> MutationsResult<Self> {
        Self::builder(module, config_args).build()
    }

    /// Execute a batch document
    ///
    /// Structural document errors reject the whole batch before any unit
    /// runs. Unit failures are collected into `errors` and never stop the
    /// remaining units.
    pub async fn execute(&self, query: MutationQuery<S>) -> MutationsResult<ExecutionResult> {
        let units = split_document(&query.document)?;
        let config = self.resolved_config().await?;

        info!(
            units = units.len(),
            tracked = query.state_subject.is_some(),
            "Executing mutation batch"
        );

        let mut batch = BatchContext::new(config)
            .with_variables(query.variables)
            .with_extensions(query.extensions);
        if let Some(executor) = &self.query_executor {
            batch = batch.with_query_executor(executor.clone(), self.options.node_uri.clone());
        }
        if let Some(root) = query.state_subject {
            let calls: Vec<UnitCall> = units
                .iter()
                .filter(|unit| self.registry.contains(&unit.call.name))
                .map(|unit| unit.call.clone())
                .collect();
            let tree = AggregationTree::build(&calls, root, self.state_builder.clone());
            batch = batch.with_tree(Arc::new(tree));
        }

        let result = execute_units(
            &units,
            &batch,
            self.executor.as_ref(),
            self.options.unit_timeout,
        )
        .await;

        info!(
            data = result.data.as_ref().map_or(0, Map::len),
            errors = result.errors.as_ref().map_or(0, Vec::len),
            "Mutation batch complete"
        );
        Ok(result)
    }

    /// Validate and resolve new configuration arguments, replacing the
    /// current configuration for subsequent executions
    pub async fn configure(&self, config_args: Value) -> MutationsResult<()> {
        self.generators.validate(&config_args)?;
        let resolved = self.generators.resolve(&config_args).await?;

        let mut slot = self.config.write().await;
        slot.args = config_args;
        slot.resolved = Some(Arc::new(resolved));
        debug!("Configuration replaced");
        Ok(())
    }

    async fn resolved_config(&self) -> MutationsResult<Arc<Value>> {
        if let Some(resolved) = &self.config.read().await.resolved {
            return Ok(resolved.clone());
        }

        let mut slot = self.config.write().await;
        if let Some(resolved) = &slot.resolved {
            return Ok(resolved.clone());
        }
        let resolved = Arc::new(self.generators.resolve(&slot.args).await?);
        slot.resolved = Some(resolved.clone());
        debug!("Configuration resolved");
        Ok(resolved)
    }
}
