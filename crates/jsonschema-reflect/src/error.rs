//! Error types for schema reflection.

use crate::id::IdError;

/// Errors produced while reflecting a type into a schema document.
///
/// Malformed tag directives are never reported here; they are dropped at the
/// field they appear on and logged at `debug` level.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid base schema id `{id}`: {reason}")]
    InvalidBaseId { id: String, reason: IdError },

    #[error("lookup returned invalid id `{id}` for type `{type_name}`: {reason}")]
    InvalidLookupId {
        id: String,
        type_name: String,
        reason: IdError,
    },

    #[error("{capability} for type `{type_name}` failed: {source}")]
    Extension {
        capability: &'static str,
        type_name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("alias cycle detected at type `{type_name}`")]
    AliasCycle { type_name: String },

    #[error("malformed type `{type_name}`: {message}")]
    MalformedType { type_name: String, message: String },
}

/// Error type returned by extension capabilities.
pub type ExtensionError = anyhow::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
