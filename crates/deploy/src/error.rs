//! Error types for the deployment engine.

use std::path::PathBuf;

use alloy_core::primitives::B256;

/// Errors surfaced while running a stage.
///
/// Every variant aborts the current stage, and the orchestrator aborts the whole run on the
/// first one it sees.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// A dependency lookup on a unit name that was never registered.
    #[error("unit `{name}` is not registered")]
    NotFound { name: String },

    /// A unit name is already registered with a different kind or different creation arguments.
    #[error(
        "unit `{name}` is already registered as `{existing_kind}` with different creation arguments (requested `{requested_kind}`)"
    )]
    AlreadyExists {
        name: String,
        existing_kind: String,
        requested_kind: String,
    },

    /// The ledger client reported a failure for a create or call request.
    #[error("stage `{stage}` step {step}: {request} failed")]
    RemoteFailure {
        stage: String,
        step: usize,
        request: String,
        #[source]
        source: LedgerError,
    },

    /// The operation is restricted to other networks.
    #[error("`{operation}` is not available on network `{network}`")]
    UnsupportedNetwork {
        operation: &'static str,
        network: crate::Network,
    },

    /// Invalid numeric input to the parameter resolver.
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// The persisted registry could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures reported by a [`crate::LedgerClient`].
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("RPC error from {method}: {message}")]
    Rpc { method: String, message: String },

    #[error("transaction {0} reverted")]
    Reverted(B256),

    #[error("transaction {0} is still pending")]
    Pending(B256),

    #[error("receipt of transaction {0} carries no contract address")]
    MissingAddress(B256),

    #[error("no artifact found for kind `{0}`")]
    MissingArtifact(String),

    #[error("kind `{kind}` matches {} artifacts: {paths:?}", paths.len())]
    AmbiguousArtifact {
        kind: String,
        paths: Vec<std::path::PathBuf>,
    },

    #[error("kind `{kind}` has no operation `{operation}` taking {arity} argument(s)")]
    UnknownOperation {
        kind: String,
        operation: String,
        arity: usize,
    },

    #[error("no unit deployed at {0}")]
    UnknownTarget(alloy_core::primitives::Address),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Invalid input to a parameter computation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolverError {
    #[error("{what} must be strictly positive")]
    NonPositiveDivisor { what: &'static str },

    #[error("{what} = {value} exceeds the maximum of {max}")]
    OutOfRange {
        what: &'static str,
        value: u64,
        max: u64,
    },

    #[error("arithmetic overflow while computing {what}")]
    Overflow { what: &'static str },
}

/// Failures of the on-disk registry store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("registry at {} is locked by another run", .0.display())]
    Locked(PathBuf),

    #[error("registry at {} belongs to network `{found}`, not `{expected}`", path.display())]
    NetworkMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
}
