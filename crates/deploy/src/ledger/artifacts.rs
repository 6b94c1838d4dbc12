//! Compiled unit templates and argument encoding.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue, Specifier},
    json_abi::{JsonAbi, Param},
    primitives::Bytes,
};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{LedgerError, Value};

/// A compiled template in the Hardhat artifact format.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
}

impl Artifact {
    /// Creation payload: bytecode followed by the encoded constructor arguments.
    pub fn encode_create(&self, args: &[Value]) -> Result<Bytes, LedgerError> {
        let params = self
            .abi
            .constructor()
            .map(|constructor| constructor.inputs.as_slice())
            .unwrap_or_default();
        if params.len() != args.len() {
            return Err(self.unknown_operation("constructor", args.len()));
        }

        let mut data = self.bytecode.to_vec();
        data.extend(encode_params(params, args)?);
        Ok(data.into())
    }

    /// Call payload: selector followed by the encoded arguments.
    ///
    /// Overloads are told apart by arity.
    pub fn encode_call(&self, operation: &str, args: &[Value]) -> Result<Bytes, LedgerError> {
        let function = self
            .abi
            .function(operation)
            .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == args.len()))
            .ok_or_else(|| self.unknown_operation(operation, args.len()))?;

        let mut data = function.selector().to_vec();
        data.extend(encode_params(&function.inputs, args)?);
        Ok(data.into())
    }

    fn unknown_operation(&self, operation: &str, arity: usize) -> LedgerError {
        LedgerError::UnknownOperation {
            kind: self.contract_name.clone(),
            operation: operation.to_string(),
            arity,
        }
    }
}

fn encode_params(params: &[Param], args: &[Value]) -> Result<Vec<u8>, LedgerError> {
    let values = params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty: DynSolType = param.resolve().map_err(|err| {
                LedgerError::Encoding(format!("parameter `{}`: {err}", param.name))
            })?;
            to_sol_value(arg, &ty)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DynSolValue::Tuple(values).abi_encode_params())
}

fn to_sol_value(value: &Value, ty: &DynSolType) -> Result<DynSolValue, LedgerError> {
    match (ty, value) {
        (DynSolType::Address, Value::Address(address)) => Ok(DynSolValue::Address(*address)),
        (DynSolType::Uint(bits), Value::Uint(v)) if v.bit_len() <= *bits => {
            Ok(DynSolValue::Uint(*v, *bits))
        }
        (DynSolType::Bool, Value::Bool(b)) => Ok(DynSolValue::Bool(*b)),
        (DynSolType::String, Value::String(s)) => Ok(DynSolValue::String(s.clone())),
        (DynSolType::Bytes, Value::Bytes(b)) => Ok(DynSolValue::Bytes(b.to_vec())),
        (DynSolType::Array(inner), Value::Array(items)) => items
            .iter()
            .map(|item| to_sol_value(item, inner))
            .collect::<Result<Vec<_>, _>>()
            .map(DynSolValue::Array),
        (DynSolType::FixedArray(inner, len), Value::Array(items)) if items.len() == *len => items
            .iter()
            .map(|item| to_sol_value(item, inner))
            .collect::<Result<Vec<_>, _>>()
            .map(DynSolValue::FixedArray),
        _ => Err(LedgerError::Encoding(format!(
            "cannot encode {value} as {}",
            ty.sol_type_name()
        ))),
    }
}

/// Loads artifacts by kind from a Hardhat `artifacts/` tree.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    cache: Mutex<HashMap<String, Arc<Artifact>>>,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Load the artifact named `<kind>.json` anywhere under the root.
    ///
    /// A kind found at more than one path is rejected rather than guessed.
    pub async fn load(&self, kind: &str) -> Result<Arc<Artifact>, LedgerError> {
        if let Some(artifact) = self.cache.lock().await.get(kind) {
            return Ok(artifact.clone());
        }

        let mut paths = find_files(&self.root, &format!("{kind}.json"))
            .await
            .map_err(|err| {
                LedgerError::Transport(format!("reading {}: {err}", self.root.display()))
            })?;
        let path = match paths.len() {
            0 => return Err(LedgerError::MissingArtifact(kind.to_string())),
            1 => paths.remove(0),
            _ => {
                paths.sort();
                return Err(LedgerError::AmbiguousArtifact {
                    kind: kind.to_string(),
                    paths,
                });
            }
        };

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| LedgerError::Transport(format!("reading {}: {err}", path.display())))?;
        let artifact: Artifact = serde_json::from_str(&content)
            .map_err(|err| LedgerError::Encoding(format!("parsing {}: {err}", path.display())))?;

        tracing::trace!(kind, path = %path.display(), "Artifact loaded");

        let artifact = Arc::new(artifact);
        self.cache
            .lock()
            .await
            .entry(kind.to_string())
            .or_insert_with(|| artifact.clone());
        Ok(artifact)
    }
}

/// Every file named `file_name` under `root`. A missing root has no matches.
async fn find_files(root: &Path, file_name: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => return Err(err),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
            } else if path.file_name().is_some_and(|name| name == file_name) {
                found.push(path);
            }
        }
    }

    Ok(found)
}
