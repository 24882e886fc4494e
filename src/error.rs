//! Error types for document generation and input loading.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::ParameterLocation;
use crate::version::SUPPORTED_VERSIONS;

/// Errors during document generation.
///
/// Generation never returns a partial document: the first error aborts the run.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(
        "unknown schema variant '{kind}'{}",
        schema_name.as_ref().map(|n| format!(" in schema '{n}'")).unwrap_or_default()
    )]
    UnknownSchemaVariant {
        kind: &'static str,
        /// Debug rendering of the offending node.
        definition: String,
        schema_name: Option<String>,
    },

    #[error(transparent)]
    MissingParameterData(MissingParameterData),

    #[error("{message} (key: {key}, values: {})", values.join(", "))]
    Conflict {
        message: String,
        key: &'static str,
        values: Vec<String>,
    },

    #[error("unsupported configuration: {message}")]
    UnsupportedConfiguration { message: String },

    #[error(
        "unsupported OpenAPI version \"{version}\": expected one of {}",
        SUPPORTED_VERSIONS.join(", ")
    )]
    UnsupportedVersion { version: String },
}

impl GenerateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        GenerateError::UnsupportedConfiguration {
            message: message.into(),
        }
    }

    /// Adds positional context to a missing-parameter error. Any other error
    /// is returned untouched.
    pub(crate) fn with_parameter_context(
        self,
        enrich: impl FnOnce(&mut MissingParameterData),
    ) -> Self {
        match self {
            GenerateError::MissingParameterData(mut data) => {
                enrich(&mut data);
                GenerateError::MissingParameterData(data)
            }
            other => other,
        }
    }
}

/// A parameter lacks its `name` or `in`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingParameterData {
    pub missing_field: &'static str,
    pub param_name: Option<String>,
    /// `"<method> <path>"` of the route being compiled.
    pub route: Option<String>,
    pub location: Option<ParameterLocation>,
}

impl MissingParameterData {
    pub(crate) fn new(missing_field: &'static str) -> Self {
        Self {
            missing_field,
            param_name: None,
            route: None,
            location: None,
        }
    }
}

impl std::error::Error for MissingParameterData {}

impl fmt::Display for MissingParameterData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing parameter data: `{}`", self.missing_field)?;
        if let Some(name) = &self.param_name {
            write!(f, " for parameter '{}'", name)?;
        }
        if let Some(location) = self.location {
            write!(f, " in {} parameters", location)?;
        }
        if let Some(route) = &self.route {
            write!(f, " of route {}", route)?;
        }
        f.write_str("; set it through the schema's `param` metadata")
    }
}

impl From<MissingParameterData> for GenerateError {
    fn from(data: MissingParameterData) -> Self {
        GenerateError::MissingParameterData(data)
    }
}

/// Errors while loading a definitions file.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid definitions: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}
