// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resolvers and the Unit Resolver Registry
//!
//! Callers register plain [`Resolver`]s by unit name. At execution time each
//! one is wrapped so that, per invocation, it gets a fresh uuid, a fresh
//! [`StateUpdater`] bound to the unit's subject, and a [`MutationContext`]
//! carrying that updater:
//!
//! ```text
//! ResolverMap { "save" → Resolver }
//!        │ wrap(builder)
//!        ▼
//! ResolverRegistry { "save" → StatefulResolver }
//!        │ resolve(args, UnitContext)
//!        ├─ uuid = v4
//!        ├─ StateUpdater::new(uuid, builder, unit subject)   (publishes initial state)
//!        └─ Resolver::resolve(args, MutationContext, info)
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::context::{MutationContext, UnitContext};
use crate::document::Selection;
use crate::state::{CoreState, StateBuilder, StateUpdater, UnitState};

/// Bound argument values for one call
pub type Arguments = Map<String, Value>;

/// Details of the call being resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveInfo {
    pub field_name: String,
    pub result_key: String,
    pub operation_name: Option<String>,
    pub selections: Vec<Selection>,
}

/// A caller-supplied mutation resolver
#[async_trait]
pub trait Resolver<S: UnitState = CoreState>: Send + Sync {
    async fn resolve(
        &self,
        args: Arguments,
        context: MutationContext<S>,
        info: ResolveInfo,
    ) -> anyhow::Result<Value>;
}

struct FnResolver<F>(F);

#[async_trait]
impl<S, F, Fut> Resolver<S> for FnResolver<F>
where
    S: UnitState,
    F: Fn(Arguments, MutationContext<S>, ResolveInfo) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    async fn resolve(
        &self,
        args: Arguments,
        context: MutationContext<S>,
        info: ResolveInfo,
    ) -> anyhow::Result<Value> {
        (self.0)(args, context, info).await
    }
}

/// Resolvers by unit name, as supplied by the caller
pub struct ResolverMap<S = CoreState> {
    resolvers: BTreeMap<String, Arc<dyn Resolver<S>>>,
}

impl<S> Clone for ResolverMap<S> {
    fn clone(&self) -> Self {
        Self {
            resolvers: self.resolvers.clone(),
        }
    }
}

impl<S: UnitState> Default for ResolverMap<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: UnitState> ResolverMap<S> {
    pub fn new() -> Self {
        Self {
            resolvers: BTreeMap::new(),
        }
    }

    /// Register an async closure
    ///
    /// # Example
    ///
    /// ```rust
    /// use cim_mutations::resolver::ResolverMap;
    /// use cim_mutations::state::CoreState;
    /// use serde_json::json;
    ///
    /// let resolvers = ResolverMap::<CoreState>::new().with("ping", |_args, _ctx, _info| async {
    ///     Ok(json!(true))
    /// });
    /// assert!(resolvers.contains("ping"));
    /// ```
    pub fn with<F, Fut>(self, name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(Arguments, MutationContext<S>, ResolveInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.with_resolver(name, FnResolver(resolver))
    }

    /// Register a [`Resolver`] implementation
    pub fn with_resolver(mut self, name: impl Into<String>, resolver: impl Resolver<S> + 'static) -> Self {
        self.resolvers.insert(name.into(), Arc::new(resolver));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolvers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resolvers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

/// A resolver as the execution engine sees it
#[async_trait]
pub trait UnitResolver<S: UnitState = CoreState>: Send + Sync {
    async fn resolve(
        &self,
        args: Arguments,
        context: UnitContext<S>,
        info: ResolveInfo,
    ) -> anyhow::Result<Value>;
}

/// Wraps a [`Resolver`] with per-invocation state
pub struct StatefulResolver<S = CoreState> {
    inner: Arc<dyn Resolver<S>>,
    builder: Arc<StateBuilder<S>>,
}

impl<S: UnitState> StatefulResolver<S> {
    pub fn new(inner: Arc<dyn Resolver<S>>, builder: Arc<StateBuilder<S>>) -> Self {
        Self { inner, builder }
    }
}

#[async_trait]
impl<S: UnitState> UnitResolver<S> for StatefulResolver<S> {
    async fn resolve(
        &self,
        args: Arguments,
        context: UnitContext<S>,
        info: ResolveInfo,
    ) -> anyhow::Result<Value> {
        let uuid = Uuid::new_v4().to_string();
        debug!(
            unit = %info.field_name,
            result_key = %info.result_key,
            uuid = %uuid,
            tracked = context.subject().is_some(),
            "Starting unit"
        );
        let state = StateUpdater::new(uuid, self.builder.clone(), context.subject().cloned());
        self.inner
            .resolve(args, MutationContext::new(context, state), info)
            .await
    }
}

/// Wrapped resolvers by unit name
pub struct ResolverRegistry<S = CoreState> {
    resolvers: BTreeMap<String, Arc<dyn UnitResolver<S>>>,
}

impl<S: UnitState> ResolverRegistry<S> {
    /// Wrap every resolver in `map` with state from `builder`
    pub fn wrap(map: &ResolverMap<S>, builder: Arc<StateBuilder<S>>) -> Self {
        let resolvers = map
            .resolvers
            .iter()
            .map(|(name, resolver)| {
                let wrapped: Arc<dyn UnitResolver<S>> =
                    Arc::new(StatefulResolver::new(resolver.clone(), builder.clone()));
                (name.clone(), wrapped)
            })
            .collect();
        Self { resolvers }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn UnitResolver<S>>> {
        self.resolvers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolvers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resolvers.keys().map(String::as_str)
    }
}
