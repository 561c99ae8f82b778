//! Operation facts: the signable payloads of operations.
//!
//! Facts form a closed tagged union dispatched by the `kind` field. Each
//! fact has a canonical byte form; the fact hash is sha256 over those bytes
//! and the signature base appends the network id (see
//! [`Fact::signature_base`]).

use std::fmt;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::amount::{Amount, CurrencyId};
use crate::currency::{CurrencyDesign, CurrencyPolicy, FeePolicy};
use crate::error::TypeError;
use crate::keys::Keys;
use crate::network::NetworkId;

/// The closed set of fact kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FactKind {
    CreateAccount,
    KeyUpdate,
    Transfer,
    CurrencyRegister,
    CurrencyPolicyUpdate,
}

impl FactKind {
    pub const ALL: [FactKind; 5] = [
        FactKind::CreateAccount,
        FactKind::KeyUpdate,
        FactKind::Transfer,
        FactKind::CurrencyRegister,
        FactKind::CurrencyPolicyUpdate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FactKind::CreateAccount => "create-account",
            FactKind::KeyUpdate => "key-update",
            FactKind::Transfer => "transfer",
            FactKind::CurrencyRegister => "currency-register",
            FactKind::CurrencyPolicyUpdate => "currency-policy-update",
        }
    }

    pub fn from_tag(tag: &str) -> Option<FactKind> {
        FactKind::ALL.into_iter().find(|k| k.as_str() == tag)
    }
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One target of a create-account fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAccountItem {
    pub keys: Keys,
    pub amounts: Vec<Amount>,
}

/// Creates new accounts funded by the sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAccountFact {
    pub token: String,
    pub sender: Address,
    pub items: Vec<CreateAccountItem>,
}

/// Replaces the signing policy of an existing account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyUpdateFact {
    pub token: String,
    pub target: Address,
    pub keys: Keys,
    pub currency: CurrencyId,
}

/// One receiver of a transfer fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferItem {
    pub receiver: Address,
    pub amounts: Vec<Amount>,
}

/// Moves amounts from the sender to one or more receivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferFact {
    pub token: String,
    pub sender: Address,
    pub items: Vec<TransferItem>,
}

/// Registers a new currency design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRegisterFact {
    pub token: String,
    pub design: CurrencyDesign,
}

/// Replaces the policy of an existing currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyPolicyUpdateFact {
    pub token: String,
    pub currency: CurrencyId,
    pub policy: CurrencyPolicy,
}

/// A fact, tagged on the wire by its `kind` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Fact {
    CreateAccount(CreateAccountFact),
    KeyUpdate(KeyUpdateFact),
    Transfer(TransferFact),
    CurrencyRegister(CurrencyRegisterFact),
    CurrencyPolicyUpdate(CurrencyPolicyUpdateFact),
}

impl Fact {
    pub fn kind(&self) -> FactKind {
        match self {
            Fact::CreateAccount(_) => FactKind::CreateAccount,
            Fact::KeyUpdate(_) => FactKind::KeyUpdate,
            Fact::Transfer(_) => FactKind::Transfer,
            Fact::CurrencyRegister(_) => FactKind::CurrencyRegister,
            Fact::CurrencyPolicyUpdate(_) => FactKind::CurrencyPolicyUpdate,
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Fact::CreateAccount(f) => &f.token,
            Fact::KeyUpdate(f) => &f.token,
            Fact::Transfer(f) => &f.token,
            Fact::CurrencyRegister(f) => &f.token,
            Fact::CurrencyPolicyUpdate(f) => &f.token,
        }
    }

    pub fn set_token(&mut self, token: String) {
        match self {
            Fact::CreateAccount(f) => f.token = token,
            Fact::KeyUpdate(f) => f.token = token,
            Fact::Transfer(f) => f.token = token,
            Fact::CurrencyRegister(f) => f.token = token,
            Fact::CurrencyPolicyUpdate(f) => f.token = token,
        }
    }

    /// Structural validation, independent of any ledger state.
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.token().is_empty() {
            return Err(TypeError::InvalidFact("empty token".into()));
        }
        match self {
            Fact::CreateAccount(f) => {
                if f.items.is_empty() {
                    return Err(TypeError::InvalidFact("create-account without items".into()));
                }
                for item in &f.items {
                    item.keys.validate()?;
                    validate_amounts(&item.amounts)?;
                }
                Ok(())
            }
            Fact::KeyUpdate(f) => f.keys.validate(),
            Fact::Transfer(f) => {
                if f.items.is_empty() {
                    return Err(TypeError::InvalidFact("transfer without items".into()));
                }
                for item in &f.items {
                    if item.receiver == f.sender {
                        return Err(TypeError::InvalidFact(format!(
                            "transfer to self: {}",
                            f.sender
                        )));
                    }
                    validate_amounts(&item.amounts)?;
                }
                Ok(())
            }
            Fact::CurrencyRegister(f) => f.design.validate(),
            Fact::CurrencyPolicyUpdate(f) => f.policy.validate(),
        }
    }

    /// Every address this fact touches: the sender plus all receivers or
    /// targets. Drives by-address operation lookups in the read-model.
    pub fn addresses(&self) -> Vec<Address> {
        let mut out: Vec<Address> = Vec::new();
        let mut push = |a: &Address| {
            if !out.contains(a) {
                out.push(a.clone());
            }
        };
        match self {
            Fact::CreateAccount(f) => push(&f.sender),
            Fact::KeyUpdate(f) => push(&f.target),
            Fact::Transfer(f) => {
                push(&f.sender);
                for item in &f.items {
                    push(&item.receiver);
                }
            }
            Fact::CurrencyRegister(_) | Fact::CurrencyPolicyUpdate(_) => {}
        }
        out
    }

    /// Deterministic byte form of this fact, the input of [`Fact::hash`].
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        put_str(&mut buf, self.kind().as_str());
        put_str(&mut buf, self.token());
        match self {
            Fact::CreateAccount(f) => {
                put_str(&mut buf, f.sender.as_str());
                for item in &f.items {
                    put_keys(&mut buf, &item.keys);
                    put_amounts(&mut buf, &item.amounts);
                }
            }
            Fact::KeyUpdate(f) => {
                put_str(&mut buf, f.target.as_str());
                put_keys(&mut buf, &f.keys);
                put_str(&mut buf, f.currency.as_str());
            }
            Fact::Transfer(f) => {
                put_str(&mut buf, f.sender.as_str());
                for item in &f.items {
                    put_str(&mut buf, item.receiver.as_str());
                    put_amounts(&mut buf, &item.amounts);
                }
            }
            Fact::CurrencyRegister(f) => {
                put_str(&mut buf, f.design.currency.as_str());
                buf.extend_from_slice(&f.design.genesis_amount.as_u128().to_be_bytes());
                put_policy(&mut buf, &f.design.policy);
            }
            Fact::CurrencyPolicyUpdate(f) => {
                put_str(&mut buf, f.currency.as_str());
                put_policy(&mut buf, &f.policy);
            }
        }
        buf
    }

    /// sha256 over the canonical bytes.
    pub fn hash(&self) -> B256 {
        let digest = Sha256::digest(self.canonical_bytes());
        B256::from_slice(&digest)
    }

    /// The exact byte sequence a wallet must sign: canonical fact bytes
    /// followed by the network id.
    pub fn signature_base(&self, network_id: &NetworkId) -> Vec<u8> {
        let mut base = self.canonical_bytes();
        base.extend_from_slice(network_id.as_bytes());
        base
    }
}

fn validate_amounts(amounts: &[Amount]) -> Result<(), TypeError> {
    if amounts.is_empty() {
        return Err(TypeError::InvalidFact("empty amount list".into()));
    }
    for (i, a) in amounts.iter().enumerate() {
        a.validate_positive()?;
        if amounts[..i].iter().any(|other| other.currency == a.currency) {
            return Err(TypeError::InvalidFact(format!(
                "duplicate currency {} in amounts",
                a.currency
            )));
        }
    }
    Ok(())
}

fn put_bytes(buf: &mut Vec<u8>, b: &[u8]) {
    buf.extend_from_slice(&(b.len() as u64).to_be_bytes());
    buf.extend_from_slice(b);
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_bytes(buf, s.as_bytes());
}

fn put_keys(buf: &mut Vec<u8>, keys: &Keys) {
    buf.push(keys.threshold);
    for k in &keys.keys {
        put_str(buf, k.key.as_str());
        buf.push(k.weight);
    }
}

fn put_amounts(buf: &mut Vec<u8>, amounts: &[Amount]) {
    for a in amounts {
        put_str(buf, a.currency.as_str());
        buf.extend_from_slice(&a.big.as_u128().to_be_bytes());
    }
}

fn put_policy(buf: &mut Vec<u8>, policy: &CurrencyPolicy) {
    buf.extend_from_slice(&policy.new_account_min_balance.as_u128().to_be_bytes());
    match &policy.fee {
        FeePolicy::Nil => buf.push(0),
        FeePolicy::Fixed { amount } => {
            buf.push(1);
            buf.extend_from_slice(&amount.as_u128().to_be_bytes());
        }
        FeePolicy::Ratio { ratio, min, max } => {
            buf.push(2);
            buf.extend_from_slice(&ratio.to_be_bytes());
            buf.extend_from_slice(&min.as_u128().to_be_bytes());
            buf.extend_from_slice(&max.as_u128().to_be_bytes());
        }
    }
}
