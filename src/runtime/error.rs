//! Error types
//!
//! [`PhpError`] is a language-level error: it unwinds to the nearest PHP
//! `catch`. [`ContractError`] is raised when an embedder breaks an engine
//! invariant and is not meant to be recovered by script code.
//! [`EngineError`] is returned while assembling an engine from extensions.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhpError {
    #[error("TypeError: {0}")]
    TypeError(String),
    #[error("ValueError: {0}")]
    ValueError(String),
    #[error("ArgumentCountError: {0}")]
    ArgumentCountError(String),
    #[error("Error: {0}")]
    Error(String),
}

impl PhpError {
    /// Name of the PHP exception class this error is thrown as.
    pub fn class_name(&self) -> &'static str {
        match self {
            PhpError::TypeError(_) => "TypeError",
            PhpError::ValueError(_) => "ValueError",
            PhpError::ArgumentCountError(_) => "ArgumentCountError",
            PhpError::Error(_) => "Error",
        }
    }

    /// `$e->getMessage()`
    pub fn message(&self) -> &str {
        match self {
            PhpError::TypeError(msg)
            | PhpError::ValueError(msg)
            | PhpError::ArgumentCountError(msg)
            | PhpError::Error(msg) => msg,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("enumerator {id} is not registered with this array")]
    UnknownEnumerator { id: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("extension '{0}' is already registered")]
    DuplicateExtension(&'static str),
    #[error("extension '{extension}' depends on '{dependency}' which is not loaded")]
    MissingDependency {
        extension: &'static str,
        dependency: &'static str,
    },
    #[error("extension '{extension}' failed to initialise: {reason}")]
    InitFailed {
        extension: &'static str,
        reason: String,
    },
}
