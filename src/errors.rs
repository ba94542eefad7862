// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("node '{node}': parameter '{param}' of {callable} is missing from `needs`")]
    MissingInput {
        node: String,
        param: String,
        callable: String,
    },

    #[error("node '{node}': parameter '{param}' of {callable} is missing from `config`")]
    MissingConfig {
        node: String,
        param: String,
        callable: String,
    },

    #[error("node '{node}' needs unknown node '{reference}'")]
    DanglingReference { node: String, reference: String },

    #[error("duplicate node name '{0}'")]
    DuplicateNode(String),

    #[error("node '{node}' uses unknown component '{component}'")]
    UnknownComponent { node: String, component: String },

    #[error("node '{node}': component '{component}' has no method '{method}'")]
    UnknownMethod {
        node: String,
        component: String,
        method: String,
    },

    #[error("node '{node}': component '{component}' has no constructor '{constructor}'")]
    UnknownConstructor {
        node: String,
        component: String,
        constructor: String,
    },

    #[error("invalid node name '{0}': must be a single non-empty path component")]
    InvalidNodeName(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in graph: {0}")]
    CyclicGraph(String),

    #[error("unknown target '{0}'")]
    UnknownTarget(String),

    #[error("node '{node}': input '{param}' expects output of '{producer}', which was not provided")]
    UnresolvedInput {
        node: String,
        param: String,
        producer: String,
    },

    #[error("node '{node}' failed: {source:#}")]
    Invocation {
        node: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("artifact path already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GraphError {
    /// Whether this error describes a defect in the node specification itself,
    /// detected before anything runs.
    pub fn is_specification_error(&self) -> bool {
        matches!(
            self,
            GraphError::MissingInput { .. }
                | GraphError::MissingConfig { .. }
                | GraphError::DanglingReference { .. }
                | GraphError::DuplicateNode(_)
                | GraphError::UnknownComponent { .. }
                | GraphError::UnknownMethod { .. }
                | GraphError::UnknownConstructor { .. }
                | GraphError::InvalidNodeName(_)
                | GraphError::CyclicGraph(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, GraphError>;
