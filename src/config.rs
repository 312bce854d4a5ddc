// Copyright (c) 2025 - Cowboy AI, Inc.
//! Configuration
//!
//! Two layers:
//!
//! - [`ConfigGenerators`]: the module's declared configuration keys, each
//!   turning a caller-supplied argument into a resolved value
//! - [`MutationsConfig`]: runtime options for the execution engine itself
//!
//! ```text
//! args { ethereum: "http://..", ipfs: { uri: ".." } }
//!          │ validate: every declared key has an argument
//!          │ resolve:  run each generator on its argument
//!          ▼
//! config { ethereum: <provider>, ipfs: { uri: <client> } }
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while validating or resolving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A declared key has no matching argument
    #[error("Failed to find mutation configuration value for the property '{key}'.")]
    MissingConfigValue { key: String },

    /// The arguments are not shaped like the declaration
    #[error("Invalid config arguments: {0}")]
    InvalidArguments(String),

    /// A generator failed
    #[error("Config generator for {key} failed: {source}")]
    Generator {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

type Generator = Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

#[derive(Clone)]
enum Entry {
    Generator(Generator),
    Group(ConfigGenerators),
}

/// Declared configuration keys and their generators
///
/// # Example
///
/// ```rust
/// use cim_mutations::config::ConfigGenerators;
/// use serde_json::json;
///
/// let generators = ConfigGenerators::new()
///     .value("endpoint", |arg| {
///         Ok(json!(format!("{}/graphql", arg.as_str().unwrap_or_default())))
///     })
///     .group("retry", ConfigGenerators::new().value("attempts", Ok));
///
/// assert!(generators.validate(&json!({ "endpoint": "http://node" })).is_err());
/// assert!(generators
///     .validate(&json!({ "endpoint": "http://node", "retry": { "attempts": 3 } }))
///     .is_ok());
/// ```
#[derive(Clone, Default)]
pub struct ConfigGenerators {
    entries: BTreeMap<String, Entry>,
}

impl ConfigGenerators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a key with a synchronous generator
    pub fn value<F>(self, key: impl Into<String>, generator: F) -> Self
    where
        F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.value_async(key, move |arg| futures::future::ready(generator(arg)))
    }

    /// Declare a key with an asynchronous generator
    pub fn value_async<F, Fut>(mut self, key: impl Into<String>, generator: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let generator: Generator = Arc::new(move |arg: Value| generator(arg).boxed());
        self.entries.insert(key.into(), Entry::Generator(generator));
        self
    }

    /// Declare a nested group of keys
    pub fn group(mut self, key: impl Into<String>, generators: ConfigGenerators) -> Self {
        self.entries.insert(key.into(), Entry::Group(generators));
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check that every declared key has an argument
    pub fn validate(&self, args: &Value) -> Result<(), ConfigError> {
        self.validate_at(args, None)
    }

    fn validate_at(&self, args: &Value, prefix: Option<&str>) -> Result<(), ConfigError> {
        if self.entries.is_empty() {
            return Ok(());
        }
        let args = as_object(args, prefix)?;

        for (key, entry) in &self.entries {
            let path = join(prefix, key);
            let arg = args
                .get(key)
                .ok_or_else(|| ConfigError::MissingConfigValue { key: path.clone() })?;
            if let Entry::Group(group) = entry {
                group.validate_at(arg, Some(&path))?;
            }
        }
        Ok(())
    }

    /// Validate `args` and run every generator, producing the config object
    pub async fn resolve(&self, args: &Value) -> Result<Value, ConfigError> {
        self.validate(args)?;
        self.resolve_at(args, None).await
    }

    fn resolve_at<'a>(
        &'a self,
        args: &'a Value,
        prefix: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Value, ConfigError>> {
        async move {
            let mut resolved = Map::new();
            if self.entries.is_empty() {
                return Ok(Value::Object(resolved));
            }
            let args = as_object(args, prefix)?;

            for (key, entry) in &self.entries {
                let path = join(prefix, key);
                let arg = args
                    .get(key)
                    .ok_or_else(|| ConfigError::MissingConfigValue { key: path.clone() })?;
                let value = match entry {
                    Entry::Generator(generator) => generator(arg.clone())
                        .await
                        .map_err(|source| ConfigError::Generator {
                            key: path.clone(),
                            source,
                        })?,
                    Entry::Group(group) => group.resolve_at(arg, Some(&path)).await?,
                };
                resolved.insert(key.clone(), value);
            }
            Ok(Value::Object(resolved))
        }
        .boxed()
    }
}

fn as_object<'a>(
    args: &'a Value,
    prefix: Option<&str>,
) -> Result<&'a Map<String, Value>, ConfigError> {
    args.as_object().ok_or_else(|| {
        ConfigError::InvalidArguments(match prefix {
            Some(path) => format!("{path} must be an object"),
            None => "arguments must be an object".to_string(),
        })
    })
}

fn join(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}.{key}"),
        None => key.to_string(),
    }
}

/// Runtime options for [`Mutations`](crate::mutations::Mutations)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationsConfig {
    /// Endpoint handed to the query executor for remote reads
    pub node_uri: Option<String>,
    /// Upper bound on a single unit's execution; `None` waits indefinitely
    pub unit_timeout: Option<Duration>,
}

impl MutationsConfig {
    pub fn with_node_uri(mut self, uri: impl Into<String>) -> Self {
        self.node_uri = Some(uri.into());
        self
    }

    pub fn with_unit_timeout(mut self, timeout: Duration) -> Self {
        self.unit_timeout = Some(timeout);
        self
    }
}
