//! Unit registry: the durable name to identity mapping that makes deployments re-runnable.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use alloy_core::primitives::{Address, B256};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{DeployError, Network, StoreError, Value};

/// Name of the registry file inside a network's deployment directory.
pub const REGISTRY_FILENAME: &str = "registry.json";

/// Name of the advisory lock file guarding a deployment directory.
const LOCK_FILENAME: &str = ".lock";

/// Compute the fingerprint of a creation request.
///
/// Only the kind and the creation arguments participate, serialized to JSON and hashed with
/// SHA-256.
pub fn fingerprint(kind: &str, args: &[Value]) -> String {
    let json = serde_json::to_string(&(kind, args))
        .expect("creation arguments serialization should never fail");

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    hex::encode(hasher.finalize())
}

/// A created unit, as recorded in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique, human-assigned name.
    pub name: String,
    /// Address the unit was created at.
    pub identity: Address,
    /// Template the unit was created from.
    pub kind: String,
    /// Constructor arguments, in order.
    pub creation_args: Vec<Value>,
    /// Fingerprint of `(kind, creation_args)`.
    pub fingerprint: String,
    /// Hash of the creating transaction, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
    /// Unix timestamp at which the unit was recorded.
    pub created_at: i64,
}

impl Unit {
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        creation_args: Vec<Value>,
        identity: Address,
    ) -> Self {
        let kind = kind.into();
        Self {
            name: name.into(),
            identity,
            fingerprint: fingerprint(&kind, &creation_args),
            kind,
            creation_args,
            transaction_hash: None,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn with_transaction(mut self, transaction_hash: B256) -> Self {
        self.transaction_hash = Some(transaction_hash);
        self
    }

    /// Whether this unit was created from the given kind and arguments.
    pub fn matches(&self, kind: &str, args: &[Value]) -> bool {
        self.fingerprint == fingerprint(kind, args)
    }
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    network: Network,
    #[serde(default)]
    units: BTreeMap<String, Unit>,
    #[serde(default)]
    applied_calls: BTreeSet<String>,
}

#[derive(Serialize)]
struct RegistrySnapshot<'a> {
    network: Network,
    units: &'a BTreeMap<String, Unit>,
    applied_calls: &'a BTreeSet<String>,
}

/// On-disk backing of a registry. The lock is held until the store is dropped.
#[derive(Debug)]
struct FileStore {
    path: PathBuf,
    _lock: File,
}

/// Registry of the units created on one network.
///
/// Besides units, the registry journals the configuration calls that must be applied at most
/// once, keyed by [`call_key`].
#[derive(Debug)]
pub struct Registry {
    network: Network,
    units: BTreeMap<String, Unit>,
    applied_calls: BTreeSet<String>,
    store: Option<FileStore>,
}

impl Registry {
    /// A registry that lives only as long as the process.
    pub fn in_memory(network: Network) -> Self {
        Self {
            network,
            units: BTreeMap::new(),
            applied_calls: BTreeSet::new(),
            store: None,
        }
    }

    /// Open (or initialize) the persisted registry in `dir`.
    ///
    /// Takes an exclusive lock on the directory for the lifetime of the returned registry.
    pub fn open(dir: impl AsRef<Path>, network: Network) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(LOCK_FILENAME))?;
        FileExt::try_lock_exclusive(&lock).map_err(|_| StoreError::Locked(dir.to_path_buf()))?;

        let path = dir.join(REGISTRY_FILENAME);
        let (units, applied_calls) = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let file: RegistryFile = serde_json::from_str(&content)?;
            if file.network != network {
                return Err(StoreError::NetworkMismatch {
                    path,
                    expected: network.to_string(),
                    found: file.network.to_string(),
                });
            }
            (file.units, file.applied_calls)
        } else {
            (BTreeMap::new(), BTreeSet::new())
        };

        tracing::debug!(
            path = %path.display(),
            %network,
            units = units.len(),
            "Registry opened"
        );

        Ok(Self {
            network,
            units,
            applied_calls,
            store: Some(FileStore { path, _lock: lock }),
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Path of the backing file, if the registry is persisted.
    pub fn path(&self) -> Option<&Path> {
        self.store.as_ref().map(|store| store.path.as_path())
    }

    /// Record a unit.
    ///
    /// A no-op returning the existing unit when the name is already registered with the same
    /// fingerprint. Fails with [`DeployError::AlreadyExists`] when it is registered with a
    /// different one. The mapping is persisted before this returns.
    pub fn create(&mut self, unit: Unit) -> Result<Unit, DeployError> {
        if let Some(existing) = self.verify(&unit.name, &unit.kind, &unit.creation_args)? {
            tracing::debug!(unit = %existing.name, "Unit already registered");
            return Ok(existing.clone());
        }

        self.units.insert(unit.name.clone(), unit.clone());
        if let Err(err) = self.persist() {
            self.units.remove(&unit.name);
            return Err(err.into());
        }

        tracing::debug!(
            unit = %unit.name,
            kind = %unit.kind,
            address = %unit.identity,
            "Unit registered"
        );
        Ok(unit)
    }

    /// Check a prospective creation against the registry.
    ///
    /// Returns the existing unit when `name` is registered with a matching fingerprint, `None`
    /// when the name is free.
    pub fn verify(
        &self,
        name: &str,
        kind: &str,
        args: &[Value],
    ) -> Result<Option<&Unit>, DeployError> {
        match self.units.get(name) {
            None => Ok(None),
            Some(existing) if existing.matches(kind, args) => Ok(Some(existing)),
            Some(existing) => Err(DeployError::AlreadyExists {
                name: name.to_string(),
                existing_kind: existing.kind.clone(),
                requested_kind: kind.to_string(),
            }),
        }
    }

    pub fn get(&self, name: &str) -> Result<&Unit, DeployError> {
        self.units.get(name).ok_or_else(|| DeployError::NotFound {
            name: name.to_string(),
        })
    }

    pub fn has(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    /// Registered units, ordered by name.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Whether the call identified by `key` was already applied.
    pub fn is_applied(&self, key: &str) -> bool {
        self.applied_calls.contains(key)
    }

    /// Journal the call identified by `key` as applied. Persisted before this returns.
    pub fn mark_applied(&mut self, key: String) -> Result<(), DeployError> {
        if !self.applied_calls.insert(key.clone()) {
            return Ok(());
        }
        if let Err(err) = self.persist() {
            self.applied_calls.remove(&key);
            return Err(err.into());
        }
        Ok(())
    }

    /// Number of journaled calls.
    pub fn applied_calls(&self) -> usize {
        self.applied_calls.len()
    }

    fn persist(&self) -> Result<(), StoreError> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        let snapshot = RegistrySnapshot {
            network: self.network,
            units: &self.units,
            applied_calls: &self.applied_calls,
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        // Write-then-rename so a crash never leaves a truncated registry behind.
        let tmp_path = store.path.with_extension("json.tmp");
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(json.as_bytes())?;
        tmp.sync_all()?;
        std::fs::rename(&tmp_path, &store.path)?;

        Ok(())
    }
}

/// Journal key of a configuration call that must run at most once.
///
/// The call is identified by its position in the stage as well as by what it does, so the same
/// call issued twice by a stage is journaled twice.
pub fn call_key(
    stage: &str,
    step: usize,
    unit: &str,
    operation: &str,
    args: &[Value],
) -> String {
    format!(
        "{stage}::{step}::{unit}::{operation}::{}",
        fingerprint(operation, args)
    )
}
