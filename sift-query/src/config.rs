//! Configuration file parsing for `sift.toml`.
//!
//! ```toml
//! [compiler]
//! max_depth = 16
//!
//! [database]
//! url = "sqlite://${DATA_DIR}/members.db"
//!
//! [debug]
//! log_queries = true
//! slow_query_threshold_ms = 250
//!
//! [environments.test.database]
//! url = "sqlite::memory:"
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex_lite::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::compiler::CompilerConfig;
use crate::error::{QueryError, QueryResult};

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// Main configuration structure for `sift.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SiftConfig {
    /// Compiler tunables.
    #[serde(default)]
    pub compiler: CompilerConfig,

    /// Database connection.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Debug/logging settings.
    #[serde(default)]
    pub debug: DebugConfig,

    /// Environment-specific overrides.
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentOverride>,
}

impl SiftConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            QueryError::config(format!("cannot read {}", path.display())).with_source(e)
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> QueryResult<Self> {
        let expanded = expand_env_vars(content);
        toml::from_str(&expanded).map_err(|e| {
            QueryError::config(format!("invalid configuration: {}", e.message())).with_source(e)
        })
    }

    /// Database URL, if configured.
    pub fn database_url(&self) -> Option<&str> {
        self.database.url.as_deref()
    }

    /// Apply the overrides of environment `env`, if any.
    pub fn for_environment(mut self, env: &str) -> Self {
        let Some(overrides) = self.environments.remove(env) else {
            return self;
        };
        if let Some(compiler) = overrides.compiler {
            if let Some(max_depth) = compiler.max_depth {
                self.compiler.max_depth = max_depth;
            }
        }
        if let Some(url) = overrides.database.and_then(|db| db.url) {
            self.database.url = Some(url);
        }
        if let Some(debug) = overrides.debug {
            if let Some(log_queries) = debug.log_queries {
                self.debug.log_queries = log_queries;
            }
            if let Some(threshold) = debug.slow_query_threshold_ms {
                self.debug.slow_query_threshold_ms = threshold;
            }
        }
        self
    }
}

/// Database configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection URL (supports `${ENV_VAR}` interpolation).
    pub url: Option<String>,
}

/// Debug configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Log every statement at debug level.
    #[serde(default)]
    pub log_queries: bool,

    /// Statements slower than this are logged as warnings.
    #[serde(default = "default_slow_query_threshold")]
    pub slow_query_threshold_ms: u64,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_queries: false,
            slow_query_threshold_ms: default_slow_query_threshold(),
        }
    }
}

fn default_slow_query_threshold() -> u64 {
    1000
}

/// Environment-specific configuration overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentOverride {
    /// Compiler overrides.
    pub compiler: Option<CompilerOverride>,
    /// Database overrides.
    pub database: Option<DatabaseConfig>,
    /// Debug overrides.
    pub debug: Option<DebugOverride>,
}

/// Compiler configuration overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerOverride {
    /// Override max_depth.
    pub max_depth: Option<usize>,
}

/// Debug configuration overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugOverride {
    /// Override log_queries.
    pub log_queries: Option<bool>,
    /// Override slow_query_threshold_ms.
    pub slow_query_threshold_ms: Option<u64>,
}

/// Expand `${VAR_NAME}` from the process environment. Unset variables are
/// left as written.
fn expand_env_vars(content: &str) -> String {
    ENV_VAR
        .replace_all(content, |caps: &Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}
