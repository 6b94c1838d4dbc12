//! Argument values passed to create and call requests.

use std::fmt;

use alloy_core::primitives::{Address, Bytes, U256};
use derive_more::From;
use serde::{Deserialize, Serialize};

/// A single constructor or operation argument.
///
/// Values are ABI-agnostic: the ledger adapter maps them onto the parameter types the target
/// declares (a [`Value::Uint`] fills a `uint8` as well as a `uint256`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, From)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Address(Address),
    Uint(U256),
    Bool(bool),
    String(String),
    Bytes(Bytes),
    Array(Vec<Value>),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Uint(U256::from(value))
    }
}

impl From<Vec<Address>> for Value {
    fn from(addresses: Vec<Address>) -> Self {
        Self::Array(addresses.into_iter().map(Value::Address).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(address) => write!(f, "{address}"),
            Self::Uint(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::Bytes(value) => write!(f, "{value}"),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Formats an argument list for log lines.
pub fn display_args(args: &[Value]) -> String {
    args.iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
