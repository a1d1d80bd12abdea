//! Error types for the enforcement engine

use thiserror::Error;

pub use crate::matcher::error::MatcherError;

/// Model definition errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A required section (`r`, `p`, `e` or `m`) is not defined
    #[error("missing required section `{0}` in model")]
    MissingSection(String),

    /// The policy effect expression is not one of the supported forms
    #[error("unsupported effect: {0}")]
    UnsupportedEffect(String),

    /// An assertion definition could not be used
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    /// The model text could not be parsed
    #[error("parse the content error: line {line}, {content}")]
    Config { line: usize, content: String },
}

/// Request errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Request values do not line up with the request definition
    #[error("invalid request size: expected {expected}, found {found}")]
    InvalidSize { expected: usize, found: usize },
}

/// Policy errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// A policy row does not line up with the policy definition
    #[error("invalid policy size: expected {expected}, found {found}")]
    InvalidSize { expected: usize, found: usize },

    /// `eval()` needs a policy row to source its sub-rule from
    #[error("please make sure rule exists in policy when using eval() in matcher")]
    EvalWithoutRules,

    /// `eval()` referenced a name that is not a policy token
    #[error("eval() rule `{0}` is not a policy parameter")]
    EvalRuleNotFound(String),
}

/// Role manager errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RbacError {
    /// One of the names in a link operation is unknown to the graph
    #[error("name1 or name2 does not exist: {0}")]
    NotFound(String),

    /// More than one domain argument was supplied
    #[error("domain should be 1 parameter, found {0}")]
    DomainCount(usize),

    /// A grouping row or definition does not fit the role definition
    #[error("invalid grouping policy: {0}")]
    InvalidGrouping(String),
}

/// Persistence adapter errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// The backing file does not exist or is not a regular file
    #[error("invalid file path, file path cannot be empty: {0}")]
    InvalidFilePath(String),

    /// The adapter lacks the requested capability
    #[error("{0} is not supported by this adapter")]
    Unsupported(&'static str),

    /// A filtered policy cannot be written back as the full policy
    #[error("cannot save a filtered policy")]
    SaveFiltered,

    /// No adapter is attached to the enforcer
    #[error("no adapter is set")]
    NotSet,
}

/// Enforcement engine errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Model definition error
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Request error
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Policy error
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    /// Role manager error
    #[error("RBAC error: {0}")]
    Rbac(#[from] RbacError),

    /// Matcher evaluation error
    #[error("Matcher error: {0}")]
    Matcher(#[from] MatcherError),

    /// Adapter error
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for enforcement operations
pub type Result<T> = std::result::Result<T, AuthzError>;
