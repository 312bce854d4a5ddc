// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-mutations
//!
//! Provides the resolver module shared by the integration tests.
//!
//! # Design Principles
//! - Fixtures are the ONLY place that builds mutations modules
//! - Resolvers are deterministic apart from the per-execution uuid
//! - Tests subscribe before executing, so no snapshot is missed
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing_subscriber::EnvFilter;

use cim_mutations::config::{ConfigGenerators, MutationsConfig};
use cim_mutations::executor::{ExecutionResult, GraphError, Query, QueryExecutor};
use cim_mutations::frp::{Subject, Subscription};
use cim_mutations::mutations::{Mutations, MutationsModule};
use cim_mutations::resolver::ResolverMap;
use cim_mutations::state::{CoreState, ProgressUpdate, StateBuilder, StateError};

pub const CONFIG_VALUE: &str = "...";
pub const NODE_URI: &str = "http://localhost:5000";

/// Install a test subscriber; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Resolvers covering every behaviour the tests exercise
pub fn test_resolvers() -> ResolverMap<CoreState> {
    ResolverMap::new()
        .with("testResolve", |_, _, _| async { Ok(json!(true)) })
        .with("secondTestResolve", |_, _, _| async { Ok(json!(true)) })
        .with("dispatchStateEvent", |_, ctx, _| async move {
            ctx.state().dispatch_event(ProgressUpdate { value: 0.5 }).await?;
            Ok(json!(true))
        })
        .with("badProgress", |_, ctx, _| async move {
            let rejected = matches!(
                ctx.state().dispatch_event(ProgressUpdate { value: 1.5 }).await,
                Err(StateError::ProgressOutOfRange { .. })
            );
            Ok(json!(rejected))
        })
        .with("testConfig", |_, ctx, _| async move {
            Ok(ctx.config()["value"].clone())
        })
        .with("testError", |_, _, _| async {
            Err(anyhow::anyhow!("I'm an error..."))
        })
        .with("testQuery", |_, ctx, _| async move {
            let result = ctx
                .query(Query::new("query testQuery { testQuery { id } }"))
                .await?;
            Ok(result.get("testQuery").cloned().unwrap_or(Value::Null))
        })
        .with("echo", |args, _, _| async move { Ok(Value::Object(args)) })
        .with("slow", |_, _, _| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(json!(true))
        })
}

pub fn test_config() -> ConfigGenerators {
    ConfigGenerators::new().value("value", Ok)
}

pub fn test_module() -> MutationsModule<CoreState> {
    MutationsModule::new(test_resolvers(), StateBuilder::default()).with_config(test_config())
}

pub fn config_args(value: &str) -> Value {
    json!({ "value": value })
}

/// Mutations over the test module with the default executor
pub fn test_mutations() -> Mutations<CoreState> {
    Mutations::new(test_module(), config_args(CONFIG_VALUE)).expect("valid test configuration")
}

/// Mutations with a remote query executor pointed at [`NODE_URI`]
pub fn test_mutations_with_queries(executor: Arc<StubQueryExecutor>) -> Mutations<CoreState> {
    Mutations::builder(test_module(), config_args(CONFIG_VALUE))
        .options(MutationsConfig::default().with_node_uri(NODE_URI))
        .query_executor(executor)
        .build()
        .expect("valid test configuration")
}

/// Answers `testQuery { id }` and records every request
#[derive(Default)]
pub struct StubQueryExecutor {
    pub requests: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl QueryExecutor for StubQueryExecutor {
    async fn execute(&self, query: Query, uri: &str) -> ExecutionResult {
        self.requests
            .lock()
            .unwrap()
            .push((query.query.clone(), uri.to_string()));
        if query.query.contains("testQuery") {
            let mut data = Map::new();
            data.insert("testQuery".into(), json!({ "id": "1" }));
            ExecutionResult::from_data(data)
        } else {
            ExecutionResult::from_error(GraphError::new("unknown query"))
        }
    }
}

/// Record every value a subject publishes
pub fn record<T: Clone + Send + Sync + 'static>(
    subject: &Subject<T>,
) -> (Arc<Mutex<Vec<T>>>, Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = subject.subscribe(move |value: &T| sink.lock().unwrap().push(value.clone()));
    (seen, subscription)
}

/// Extension state for modules that track uploaded files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadState {
    pub files: Vec<String>,
    pub status: Option<String>,
}

/// A module whose state tracks `FILE_ADDED` events and a status
pub fn upload_module() -> MutationsModule<UploadState> {
    let builder = StateBuilder::<UploadState>::default()
        .on("FILE_ADDED", |state, payload| {
            let mut files = state.ext.files.clone();
            files.push(payload["name"].as_str().unwrap_or_default().to_string());
            Ok(json!({ "files": files }))
        })
        .reducer(|_, event| Ok(json!({ "status": event.name.to_string() })))
        .declare_events(["FILE_ADDED", "UPLOAD_FINISHED"]);

    let resolvers = ResolverMap::<UploadState>::new()
        .with("upload", |args, ctx, _| async move {
            let names = args
                .get("files")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let total = names.len().max(1) as f64;
            for (index, name) in names.iter().enumerate() {
                ctx.state().dispatch("FILE_ADDED", json!({ "name": name })).await?;
                ctx.state()
                    .dispatch_event(ProgressUpdate {
                        value: (index + 1) as f64 / total,
                    })
                    .await?;
            }
            ctx.state().dispatch("UPLOAD_FINISHED", Value::Null).await?;
            Ok(json!(ctx.state().current().await.ext.files))
        })
        .with("sneaky", |_, ctx, _| async move {
            ctx.state().dispatch("NOT_DECLARED", Value::Null).await?;
            Ok(json!(true))
        });

    MutationsModule::new(resolvers, builder)
}
