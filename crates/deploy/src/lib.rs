//! ivory-deploy - Deployment orchestration for the Ivory protocol.
//!
//! Named units are created from templates on a ledger and recorded in a per-network registry.
//! Stages group the creation and configuration steps, and the orchestrator runs them in order so
//! a deployment can be re-run and resumed after a failure.

mod error;
pub use error::{DeployError, LedgerError, ResolverError, StoreError};

mod value;
pub use value::Value;

mod network;
pub use network::{Network, NetworkFilter};

pub mod params;

pub mod registry;
pub use registry::{Registry, Unit};

pub mod ledger;
pub use ledger::{ArtifactStore, InMemoryLedger, LedgerClient, Receipt, RpcLedger, Signer};

mod rpc;

mod stage;
pub use stage::{Stage, StageContext, StageOutcome};

mod orchestrator;
pub use orchestrator::{Orchestrator, RunReport, SkipReason, StageFailure, TagFilter, run_all};

pub mod config;
pub use config::{DeployConfig, NetworkConfig, ProtocolConfig};

pub mod protocol;

mod faucet;
pub use faucet::{FAUCET, send_test_tokens};
