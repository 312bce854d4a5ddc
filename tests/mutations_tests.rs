// Copyright (c) 2025 - Cowboy AI, Inc.
//! Batch execution tests
//!
//! Exercise `Mutations::execute` and `Mutations::configure` end to end
//! through the local executor.

mod fixtures;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

use cim_mutations::config::{ConfigError, MutationsConfig};
use cim_mutations::context::UnitContext;
use cim_mutations::errors::MutationsError;
use cim_mutations::executor::{ExecutionResult, LocalExecutor, UnitExecutor};
use cim_mutations::mutations::{MutationQuery, Mutations};
use cim_mutations::split::UnitOperation;
use cim_mutations::state::CoreState;

use fixtures::*;

fn query(source: &str) -> MutationQuery {
    MutationQuery::parse(source).expect("document parses")
}

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object")
}

#[tokio::test]
async fn test_repeated_calls_get_suffixed_result_keys() {
    init_tracing();
    let mutations = test_mutations();

    let result = mutations
        .execute(query("mutation { testResolve testResolve testResolve }"))
        .await
        .unwrap();

    assert_eq!(
        result,
        ExecutionResult::from_data(object(json!({
            "testResolve": true,
            "testResolve_1": true,
            "testResolve_2": true,
        })))
    );
}

#[tokio::test]
async fn test_distinct_calls_keep_their_names() {
    let mutations = test_mutations();

    let result = mutations
        .execute(query("mutation { testResolve secondTestResolve }"))
        .await
        .unwrap();

    assert_eq!(result.get("testResolve"), Some(&json!(true)));
    assert_eq!(result.get("secondTestResolve"), Some(&json!(true)));
    assert!(result.errors.is_none());
}

#[tokio::test]
async fn test_failing_unit_does_not_abort_batch() {
    let mutations = test_mutations();

    let result = mutations
        .execute(query("mutation { testResolve testError secondTestResolve }"))
        .await
        .unwrap();

    assert_eq!(result.get("testResolve"), Some(&json!(true)));
    assert_eq!(result.get("secondTestResolve"), Some(&json!(true)));
    assert_eq!(result.get("testError"), None);

    let errors = result.errors.expect("one error");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "I'm an error...");
}

#[tokio::test]
async fn test_only_failures_yield_no_data() {
    let mutations = test_mutations();

    let result = mutations
        .execute(query("mutation { testError testError }"))
        .await
        .unwrap();

    assert!(result.data.is_none());
    assert_eq!(result.errors.map(|errors| errors.len()), Some(2));
}

#[tokio::test]
async fn test_unregistered_field_reports_error() {
    let mutations = test_mutations();

    let result = mutations
        .execute(query("mutation { missing testResolve }"))
        .await
        .unwrap();

    assert_eq!(result.get("testResolve"), Some(&json!(true)));
    let errors = result.errors.unwrap();
    assert_eq!(
        errors[0].message,
        "Cannot query field \"missing\" on type \"Mutation\"."
    );
}

/// Counts resolver invocations so structural rejections can prove nothing ran
struct CountingExecutor {
    inner: LocalExecutor<CoreState>,
    runs: Arc<AtomicUsize>,
}

#[async_trait]
impl UnitExecutor<CoreState> for CountingExecutor {
    async fn execute(&self, unit: &UnitOperation, context: UnitContext) -> ExecutionResult {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(unit, context).await
    }
}

fn counting_mutations() -> (Mutations, Arc<AtomicUsize>) {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    let mutations = Mutations::builder(test_module(), config_args(CONFIG_VALUE))
        .executor_with(move |registry| {
            let executor: Arc<dyn UnitExecutor<CoreState>> = Arc::new(CountingExecutor {
                inner: LocalExecutor::new(registry),
                runs: counter,
            });
            executor
        })
        .build()
        .unwrap();
    (mutations, runs)
}

#[tokio::test]
async fn test_custom_executor_receives_every_unit() {
    let (mutations, runs) = counting_mutations();

    let result = mutations
        .execute(query("mutation { testResolve testResolve }"))
        .await
        .unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(result.get("testResolve_1"), Some(&json!(true)));
}

#[tokio::test]
async fn test_inline_fragment_rejects_before_any_unit_runs() {
    let (mutations, runs) = counting_mutations();

    let err = mutations
        .execute(query(
            "mutation { testResolve ... on Mutation { secondTestResolve } }",
        ))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Unrecognized SelectionNode.kind InlineFragment");
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_type_definition_rejects_before_any_unit_runs() {
    let (mutations, runs) = counting_mutations();

    let err = mutations
        .execute(query("mutation { testResolve } type Foo { id: ID }"))
        .await
        .unwrap_err();

    assert!(matches!(err, MutationsError::Document(_)));
    assert_eq!(
        err.to_string(),
        "Unrecognized DefinitionNode.kind ObjectTypeDefinition"
    );
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_resolver_reads_resolved_config() {
    let mutations = test_mutations();

    let result = mutations
        .execute(query("mutation { testConfig }"))
        .await
        .unwrap();

    assert_eq!(result.get("testConfig"), Some(&json!(CONFIG_VALUE)));
}

#[tokio::test]
async fn test_configure_replaces_config() {
    let mutations = test_mutations();
    mutations.configure(config_args("foo")).await.unwrap();

    let result = mutations
        .execute(query("mutation { testConfig }"))
        .await
        .unwrap();

    assert_eq!(result.get("testConfig"), Some(&json!("foo")));
}

#[tokio::test]
async fn test_configure_with_missing_key_keeps_previous_config() {
    let mutations = test_mutations();

    let err = mutations.configure(json!({})).await.unwrap_err();
    assert!(matches!(
        err,
        MutationsError::Config(ConfigError::MissingConfigValue { ref key }) if key == "value"
    ));
    assert_eq!(
        err.to_string(),
        "Failed to find mutation configuration value for the property 'value'."
    );

    let result = mutations
        .execute(query("mutation { testConfig }"))
        .await
        .unwrap();
    assert_eq!(result.get("testConfig"), Some(&json!(CONFIG_VALUE)));

    mutations.configure(config_args("bar")).await.unwrap();
    let result = mutations
        .execute(query("mutation { testConfig }"))
        .await
        .unwrap();
    assert_eq!(result.get("testConfig"), Some(&json!("bar")));
}

#[test]
fn test_construction_requires_declared_config() {
    let err = Mutations::new(test_module(), json!({ "other": 1 }))
        .err()
        .expect("missing key rejected");
    assert!(matches!(
        err,
        MutationsError::Config(ConfigError::MissingConfigValue { .. })
    ));
}

#[tokio::test]
async fn test_arguments_bind_from_variables_and_defaults() {
    let mutations = test_mutations();

    let result = mutations
        .execute(
            query(
                r#"mutation Save($name: String, $size: Int = 3) {
                    echo(name: $name, size: $size, tags: ["a", "b"])
                }"#,
            )
            .with_variables(object(json!({ "name": "report.pdf" }))),
        )
        .await
        .unwrap();

    assert_eq!(
        result.get("echo"),
        Some(&json!({ "name": "report.pdf", "size": 3, "tags": ["a", "b"] }))
    );
}

#[tokio::test]
async fn test_selections_project_resolver_value() {
    let mutations = test_mutations();

    let result = mutations
        .execute(query(r#"mutation { echo(id: "1", secret: "x") { id missing } }"#))
        .await
        .unwrap();

    assert_eq!(result.get("echo"), Some(&json!({ "id": "1", "missing": null })));
}

#[tokio::test]
async fn test_undefined_variable_fails_only_its_unit() {
    let mutations = test_mutations();

    let result = mutations
        .execute(query("mutation { echo(name: $nope) testResolve }"))
        .await
        .unwrap();

    assert_eq!(result.get("testResolve"), Some(&json!(true)));
    let errors = result.errors.unwrap();
    assert_eq!(errors[0].message, "Variable \"$nope\" is not defined.");
    assert_eq!(errors[0].path, vec!["echo".to_string()]);
}

#[tokio::test]
async fn test_query_executor_reaches_node() {
    let executor = Arc::new(StubQueryExecutor::default());
    let mutations = test_mutations_with_queries(executor.clone());

    let result = mutations
        .execute(query("mutation { testQuery }"))
        .await
        .unwrap();

    assert_eq!(result.get("testQuery"), Some(&json!({ "id": "1" })));
    let requests = executor.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].1, NODE_URI);
}

#[tokio::test]
async fn test_query_without_node_uri_fails_unit() {
    let executor = Arc::new(StubQueryExecutor::default());
    let mutations = Mutations::builder(test_module(), config_args(CONFIG_VALUE))
        .query_executor(executor.clone())
        .build()
        .unwrap();

    let result = mutations
        .execute(query("mutation { testQuery testResolve }"))
        .await
        .unwrap();

    assert_eq!(result.get("testResolve"), Some(&json!(true)));
    assert_eq!(result.errors.map(|errors| errors.len()), Some(1));
    assert!(executor.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unit_timeout_isolates_stalled_unit() {
    let mutations = Mutations::builder(test_module(), config_args(CONFIG_VALUE))
        .options(MutationsConfig::default().with_unit_timeout(Duration::from_millis(50)))
        .build()
        .unwrap();

    let result = mutations
        .execute(query("mutation { slow testResolve }"))
        .await
        .unwrap();

    assert_eq!(result.get("testResolve"), Some(&json!(true)));
    let errors = result.errors.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].path, vec!["slow".to_string()]);
    assert!(errors[0].message.starts_with("Operation timed out"));
}
