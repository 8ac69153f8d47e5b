// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for depenv operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience Result type with depenv Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during depenv operations.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Invalid YAML in a graph file
    #[error("Invalid graph file: {error}")]
    #[diagnostic(
        code(depenv::invalid_yaml),
        help("Check YAML syntax and ensure 'api: depenv/v0' is present")
    )]
    InvalidYaml {
        #[source]
        error: serde_yaml::Error,
        yaml_content: String,
    },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(depenv::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Profile could not be located by path or by name
    #[error("Profile not found: {name}")]
    #[diagnostic(
        code(depenv::profile_not_found),
        help("Pass a path to the profile or place it in the profiles directory ({})", searched.display())
    )]
    ProfileNotFound { name: String, searched: PathBuf },

    /// Circular include detected
    #[error("Circular profile include detected: {0:?}")]
    #[diagnostic(
        code(depenv::circular_include),
        help("Remove the circular reference in your include() lines")
    )]
    CircularInclude(PathBuf),

    /// A profile environment line could not be parsed
    #[error("Bad env definition in {}:{line_number}: {line}", origin_name(.path))]
    #[diagnostic(
        code(depenv::bad_env_definition),
        help("Use NAME=value, NAME+=value, NAME=+value or NAME=! (optionally prefixed with 'pattern:')")
    )]
    BadEnvDefinition {
        path: Option<PathBuf>,
        line_number: usize,
        line: String,
    },

    /// A node id was referenced but never declared
    #[error("Unknown node: {id}")]
    #[diagnostic(code(depenv::unknown_node), help("{}", suggestion_message(similar)))]
    UnknownNode { id: String, similar: Vec<String> },

    /// Two nodes share the same id
    #[error("Duplicate node id: {0}")]
    #[diagnostic(
        code(depenv::duplicate_node),
        help("Give each node a unique 'id' (it defaults to the node name)")
    )]
    DuplicateNode(String),

    /// The followed subgraph contains a cycle
    #[error("Cyclic dependency among: {}", .nodes.join(", "))]
    #[diagnostic(code(depenv::cyclic_dependency))]
    CyclicDependency { nodes: Vec<String> },

    /// Validation error
    #[error("Validation failed: {0}")]
    #[diagnostic(code(depenv::validation_failed))]
    ValidationFailed(String),

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(depenv::io_error))]
    Io(#[from] std::io::Error),
}

fn origin_name(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "<text>".to_string(),
    }
}

fn suggestion_message(similar: &[String]) -> String {
    if similar.is_empty() {
        "Check that every requirement names a declared node id".to_string()
    } else {
        format!("Did you mean one of: {}?", similar.join(", "))
    }
}
