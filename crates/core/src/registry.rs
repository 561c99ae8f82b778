//! Explicit fact-decode registry.
//!
//! Facts are dispatched by the `kind` tag through a registry built once at
//! startup and passed by reference; there is no process-global decoder
//! state. Decoding reconstructs the concrete fact through serde and leaves
//! structural validation to the caller.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::TypeError;
use crate::fact::{
    CreateAccountFact, CurrencyPolicyUpdateFact, CurrencyRegisterFact, Fact, FactKind,
    KeyUpdateFact, TransferFact,
};

type DecodeFn = fn(Value) -> Result<Fact, TypeError>;

/// Maps fact kind tags to their decoders.
pub struct FactRegistry {
    entries: BTreeMap<&'static str, DecodeFn>,
}

impl FactRegistry {
    /// Registry covering every supported fact kind.
    pub fn with_defaults() -> Self {
        let mut r = FactRegistry {
            entries: BTreeMap::new(),
        };
        r.register(FactKind::CreateAccount, |v| {
            decode_as::<CreateAccountFact>(v).map(Fact::CreateAccount)
        });
        r.register(FactKind::KeyUpdate, |v| {
            decode_as::<KeyUpdateFact>(v).map(Fact::KeyUpdate)
        });
        r.register(FactKind::Transfer, |v| {
            decode_as::<TransferFact>(v).map(Fact::Transfer)
        });
        r.register(FactKind::CurrencyRegister, |v| {
            decode_as::<CurrencyRegisterFact>(v).map(Fact::CurrencyRegister)
        });
        r.register(FactKind::CurrencyPolicyUpdate, |v| {
            decode_as::<CurrencyPolicyUpdateFact>(v).map(Fact::CurrencyPolicyUpdate)
        });
        r
    }

    pub fn register(&mut self, kind: FactKind, decode: DecodeFn) {
        self.entries.insert(kind.as_str(), decode);
    }

    /// Registered kind tags, in stable order.
    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Decode a fact from its JSON value, dispatching on the `kind` tag.
    pub fn decode(&self, value: Value) -> Result<Fact, TypeError> {
        let tag = value
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| TypeError::Decode("missing kind tag".into()))?;
        let decode = self
            .entries
            .get(tag)
            .ok_or_else(|| TypeError::UnknownFactKind(tag.to_string()))?;
        decode(value)
    }

    /// Decode a fact from raw JSON bytes.
    pub fn decode_slice(&self, bytes: &[u8]) -> Result<Fact, TypeError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| TypeError::Decode(e.to_string()))?;
        self.decode(value)
    }
}

fn decode_as<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, TypeError> {
    serde_json::from_value(value).map_err(|e| TypeError::Decode(e.to_string()))
}
