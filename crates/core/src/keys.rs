//! Public keys, signatures and weighted multisig key sets.
//!
//! Keys and signatures are structurally-validated strings; real key parsing
//! and signature verification belong to the external crypto collaborator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Type suffix carried by every public key string.
pub const PUBLICKEY_SUFFIX: &str = "vpb";

/// A public key, `"<body>:vpb"` with a non-empty alphanumeric body.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Publickey(String);

impl Publickey {
    pub fn new(s: impl Into<String>) -> Result<Self, TypeError> {
        let s = s.into();
        let body = s
            .strip_suffix(PUBLICKEY_SUFFIX)
            .and_then(|rest| rest.strip_suffix(':'))
            .ok_or_else(|| {
                TypeError::InvalidPublickey(format!("missing :{PUBLICKEY_SUFFIX} suffix: {s}"))
            })?;
        if body.is_empty() || !body.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TypeError::InvalidPublickey(format!("bad key body: {s}")));
        }
        Ok(Publickey(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Publickey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Publickey {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Publickey::new(s)
    }
}

impl TryFrom<String> for Publickey {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Publickey::new(s)
    }
}

impl From<Publickey> for String {
    fn from(k: Publickey) -> String {
        k.0
    }
}

/// An opaque signature string. Non-empty, no whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature(String);

impl Signature {
    pub fn new(s: impl Into<String>) -> Result<Self, TypeError> {
        let s = s.into();
        if s.is_empty() || s.chars().any(|c| c.is_whitespace()) {
            return Err(TypeError::InvalidSignature(s));
        }
        Ok(Signature(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Signature {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Signature::new(s)
    }
}

impl From<Signature> for String {
    fn from(s: Signature) -> String {
        s.0
    }
}

/// One key of a signing policy, with its voting weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountKey {
    pub key: Publickey,
    pub weight: u8,
}

impl AccountKey {
    pub fn new(key: Publickey, weight: u8) -> Result<Self, TypeError> {
        let k = AccountKey { key, weight };
        k.validate()?;
        Ok(k)
    }

    pub fn validate(&self) -> Result<(), TypeError> {
        if self.weight == 0 || self.weight > 100 {
            return Err(TypeError::InvalidKeys(format!(
                "weight {} out of range 1..=100",
                self.weight
            )));
        }
        Ok(())
    }
}

/// An account's signing policy: weighted public keys and a threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keys {
    pub keys: Vec<AccountKey>,
    pub threshold: u8,
}

impl Keys {
    pub fn new(keys: Vec<AccountKey>, threshold: u8) -> Result<Self, TypeError> {
        let k = Keys { keys, threshold };
        k.validate()?;
        Ok(k)
    }

    pub fn validate(&self) -> Result<(), TypeError> {
        if self.keys.is_empty() {
            return Err(TypeError::InvalidKeys("empty key set".into()));
        }
        if self.threshold == 0 || self.threshold > 100 {
            return Err(TypeError::InvalidKeys(format!(
                "threshold {} out of range 1..=100",
                self.threshold
            )));
        }
        let mut total: u32 = 0;
        for (i, k) in self.keys.iter().enumerate() {
            k.validate()?;
            if self.keys[..i].iter().any(|other| other.key == k.key) {
                return Err(TypeError::InvalidKeys(format!("duplicate key {}", k.key)));
            }
            total += u32::from(k.weight);
        }
        if total < u32::from(self.threshold) {
            return Err(TypeError::InvalidKeys(format!(
                "total weight {total} below threshold {}",
                self.threshold
            )));
        }
        Ok(())
    }

    /// True if `key` participates in this policy.
    pub fn contains(&self, key: &Publickey) -> bool {
        self.keys.iter().any(|k| &k.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pk(body: &str) -> Publickey {
        Publickey::new(format!("{body}:vpb")).unwrap()
    }

    #[test]
    fn publickey_requires_suffix() {
        assert!(Publickey::new("abc:vpb").is_ok());
        assert!(Publickey::new("abc").is_err());
        assert!(Publickey::new(":vpb").is_err());
        assert!(Publickey::new("a b:vpb").is_err());
    }

    #[test]
    fn keys_validation() {
        // single key, weight covers threshold
        assert!(Keys::new(vec![AccountKey::new(pk("k1"), 100).unwrap()], 100).is_ok());

        // total weight below threshold
        let weak = Keys {
            keys: vec![AccountKey {
                key: pk("k1"),
                weight: 10,
            }],
            threshold: 50,
        };
        assert!(weak.validate().is_err());

        // duplicate key
        let dup = Keys {
            keys: vec![
                AccountKey {
                    key: pk("k1"),
                    weight: 50,
                },
                AccountKey {
                    key: pk("k1"),
                    weight: 50,
                },
            ],
            threshold: 50,
        };
        assert!(dup.validate().is_err());

        // empty set
        let empty = Keys {
            keys: vec![],
            threshold: 1,
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn multi_key_threshold() {
        let keys = Keys::new(
            vec![
                AccountKey::new(pk("k1"), 40).unwrap(),
                AccountKey::new(pk("k2"), 40).unwrap(),
            ],
            80,
        )
        .unwrap();
        assert!(keys.contains(&pk("k1")));
        assert!(!keys.contains(&pk("k3")));
    }
}
