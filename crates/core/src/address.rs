//! Account addresses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Type suffix carried by every account address.
pub const ADDRESS_SUFFIX: &str = "vca";

const MIN_BASE_LEN: usize = 3;
const MAX_BASE_LEN: usize = 40;

/// A validated account address, `"<base>:vca"`.
///
/// The base is 3-40 characters, starts with an alphanumeric and otherwise
/// allows `[A-Za-z0-9._-]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn new(s: impl Into<String>) -> Result<Self, TypeError> {
        let s = s.into();
        validate(&s)?;
        Ok(Address(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(s: &str) -> Result<(), TypeError> {
    let base = s
        .strip_suffix(ADDRESS_SUFFIX)
        .and_then(|rest| rest.strip_suffix(':'))
        .ok_or_else(|| TypeError::InvalidAddress(format!("missing :{ADDRESS_SUFFIX} suffix: {s}")))?;

    if base.len() < MIN_BASE_LEN || base.len() > MAX_BASE_LEN {
        return Err(TypeError::InvalidAddress(format!(
            "base length {} out of range: {s}",
            base.len()
        )));
    }

    let mut chars = base.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_alphanumeric()) {
        return Err(TypeError::InvalidAddress(format!(
            "must start with an alphanumeric: {s}"
        )));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')) {
        return Err(TypeError::InvalidAddress(format!("illegal character: {s}")));
    }
    Ok(())
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::new(s)
    }
}

impl TryFrom<String> for Address {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Address::new(s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> String {
        a.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed() {
        for s in ["alice:vca", "a.b-c_1:vca", "0genesis:vca"] {
            assert!(Address::new(s).is_ok(), "{s}");
        }
    }

    #[test]
    fn rejects_malformed() {
        for s in [
            "alice",          // no suffix
            "alice:vcb",      // wrong suffix
            "al:vca",         // too short
            "-alice:vca",     // bad first char
            "al ice:vca",     // whitespace
            ":vca",           // empty base
        ] {
            assert!(Address::new(s).is_err(), "{s}");
        }
    }

    #[test]
    fn serde_round_trip() {
        let a = Address::new("alice:vca").unwrap();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"alice:vca\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn serde_rejects_malformed() {
        assert!(serde_json::from_str::<Address>("\"oops\"").is_err());
    }
}
