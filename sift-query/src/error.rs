//! Error types for compiling and executing rule-based queries.
//!
//! Two layers of errors exist:
//! - [`CompileError`] is produced while validating or compiling a rule tree.
//!   It never touches the database and carries the offending rule.
//! - [`QueryError`] is what the executors hand back to callers. It carries an
//!   [`ErrorCode`] for programmatic handling plus optional context.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: S{category}{number}
//! - 1xxx: Rule errors (invalid rule, malformed tree)
//! - 3xxx: Connection errors
//! - 5xxx: Execution errors (lock timeout, params, driver errors)
//! - 6xxx: Data errors (deserialization)
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors (handler contract violations)
//!
//! ```rust
//! use sift_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::new(ErrorCode::InvalidParameter, "update payload is empty");
//! assert_eq!(err.code, ErrorCode::InvalidParameter);
//! assert!(err.to_string().contains("S5003"));
//! ```

use std::fmt;

use thiserror::Error;

use crate::rule::{Rule, RuleGroup, RuleNode};

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Result type for rule compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Rule errors (1xxx)
    /// A rule is not acceptable for its field, type or operator (S1001).
    InvalidRule = 1001,
    /// The rule tree could not be parsed (S1002).
    MalformedRuleTree = 1002,

    // Connection errors (3xxx)
    /// Database connection failed (S3001).
    ConnectionFailed = 3001,

    // Query execution errors (5xxx)
    /// The database stayed locked past the busy timeout (S5001).
    QueryTimeout = 5001,
    /// Invalid parameter (S5003).
    InvalidParameter = 5003,
    /// General database error (S5005).
    DatabaseError = 5005,

    // Data errors (6xxx)
    /// Deserialization error (S6003).
    DeserializationError = 6003,

    // Configuration errors (7xxx)
    /// Invalid configuration (S7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (S9001).
    Internal = 9001,
    /// A field handler was reached with a type or operator it does not support (S9002).
    HandlerContractViolation = 9002,
}

impl ErrorCode {
    /// Get the error code string (e.g., "S1001").
    pub fn code(&self) -> String {
        format!("S{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidRule => "Invalid rule",
            Self::MalformedRuleTree => "Malformed rule tree",
            Self::ConnectionFailed => "Database connection failed",
            Self::QueryTimeout => "Query timeout",
            Self::InvalidParameter => "Invalid parameter",
            Self::DatabaseError => "Database error",
            Self::DeserializationError => "Deserialization error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
            Self::HandlerContractViolation => "Field handler contract violation",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The entity involved.
    pub entity: Option<String>,
    /// The field involved.
    pub field: Option<String>,
    /// The offending rule or group, serialized in wire format.
    pub rule: Option<serde_json::Value>,
    /// The SQL statement (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
}

/// Errors surfaced by the query executors.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// Set the entity.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.context.entity = Some(entity.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Attach the offending rule node.
    pub fn with_rule(mut self, rule: &RuleNode) -> Self {
        self.context.rule = serde_json::to_value(rule).ok();
        self
    }

    /// Set the SQL statement.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create a client-facing invalid rule error.
    pub fn invalid_rule(message: impl Into<String>, rule: &RuleNode) -> Self {
        let mut err = Self::new(ErrorCode::InvalidRule, message).with_rule(rule);
        if let RuleNode::Rule(rule) = rule {
            err = err.with_field(&rule.field);
        }
        err
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParameter, message)
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::ConnectionFailed, format!("Connection error: {}", message))
            .with_suggestion("Check that the database file is reachable")
    }

    /// Create a timeout error for a statement that could not get its lock.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::QueryTimeout, message)
            .with_suggestion("Raise busy_timeout or shorten competing write transactions")
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message.into())
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::DeserializationError,
            format!("Failed to deserialize result: {}", message),
        )
        .with_suggestion("Check that the row type matches the selected columns")
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
    }

    // ============== Error Checks ==============

    /// Check if this error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidRule | ErrorCode::MalformedRuleTree | ErrorCode::InvalidParameter
        )
    }

    /// Check if this is an invalid rule error.
    pub fn is_invalid_rule(&self) -> bool {
        self.code == ErrorCode::InvalidRule
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::QueryTimeout
    }
}

/// Errors raised while validating or compiling a rule tree.
#[derive(Error, Debug)]
pub enum CompileError {
    /// The rule (or group) is not acceptable. Client-originated.
    #[error("invalid rule: {message}")]
    InvalidRule {
        /// What is wrong with the rule.
        message: String,
        /// The offending rule or group.
        rule: Box<RuleNode>,
    },

    /// The wire-format rule tree could not be parsed. Client-originated.
    #[error("malformed rule tree: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A handler was invoked for a type or operator it cannot translate.
    /// Indicates a registration bug, not bad input.
    #[error("handler for '{field}' cannot translate {detail}")]
    HandlerContract {
        /// The field whose handler failed.
        field: String,
        /// What the handler was asked to do.
        detail: String,
    },
}

impl CompileError {
    /// Build an invalid-rule error for a leaf rule.
    pub fn invalid_rule(message: impl Into<String>, rule: &Rule) -> Self {
        Self::InvalidRule {
            message: message.into(),
            rule: Box::new(RuleNode::Rule(rule.clone())),
        }
    }

    /// Build an invalid-rule error for a group.
    ///
    /// Only the group's condition is kept; its children are not copied.
    pub fn invalid_group(message: impl Into<String>, group: &RuleGroup) -> Self {
        Self::InvalidRule {
            message: message.into(),
            rule: Box::new(RuleNode::Group(RuleGroup::new(group.condition, []))),
        }
    }

    /// Build a handler contract violation for a rule.
    pub fn handler_contract(rule: &Rule) -> Self {
        Self::HandlerContract {
            field: rule.field.clone(),
            detail: format!(
                "operator '{}' on type '{}'",
                rule.operator.as_str(),
                rule.value_type.as_str()
            ),
        }
    }

    /// Check if this error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRule { .. } | Self::Malformed(_))
    }
}

impl From<CompileError> for QueryError {
    fn from(err: CompileError) -> Self {
        match err {
            CompileError::InvalidRule { message, rule } => {
                QueryError::invalid_rule(message, &rule)
            }
            CompileError::Malformed(e) => {
                QueryError::new(ErrorCode::MalformedRuleTree, e.to_string())
                    .with_suggestion(
                        "Rule groups look like {\"condition\":\"AND\",\"rules\":[...]}",
                    )
            }
            CompileError::HandlerContract { field, detail } => QueryError::new(
                ErrorCode::HandlerContractViolation,
                format!("handler for '{}' cannot translate {}", field, detail),
            )
            .with_field(field),
        }
    }
}
