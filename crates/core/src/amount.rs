//! Currency ids, integer amounts and per-currency amount pairs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identifier of a unit of account. 2-10 characters, `[A-Z0-9]`, starting
/// with a letter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyId(String);

impl CurrencyId {
    pub fn new(s: impl Into<String>) -> Result<Self, TypeError> {
        let s = s.into();
        let ok = (2..=10).contains(&s.len())
            && s.chars().next().is_some_and(|c| c.is_ascii_uppercase())
            && s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        if !ok {
            return Err(TypeError::InvalidCurrencyId(s));
        }
        Ok(CurrencyId(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurrencyId::new(s)
    }
}

impl TryFrom<String> for CurrencyId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        CurrencyId::new(s)
    }
}

impl From<CurrencyId> for String {
    fn from(c: CurrencyId) -> String {
        c.0
    }
}

/// An unsigned integer amount. Serialized as a decimal string so large
/// values survive JSON round-trips intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub struct Big(u128);

impl Big {
    pub const ZERO: Big = Big(0);

    pub fn new(v: u128) -> Self {
        Big(v)
    }

    pub fn as_u128(self) -> u128 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Big) -> Option<Big> {
        self.0.checked_add(other.0).map(Big)
    }

    pub fn checked_sub(self, other: Big) -> Option<Big> {
        self.0.checked_sub(other.0).map(Big)
    }
}

impl fmt::Display for Big {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Big {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v: u128 = s
            .parse()
            .map_err(|_| TypeError::InvalidAmount(s.to_string()))?;
        Ok(Big(v))
    }
}

impl From<u128> for Big {
    fn from(v: u128) -> Self {
        Big(v)
    }
}

impl TryFrom<String> for Big {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Big> for String {
    fn from(b: Big) -> String {
        b.to_string()
    }
}

/// An amount of one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub currency: CurrencyId,
    pub big: Big,
}

impl Amount {
    pub fn new(currency: CurrencyId, big: Big) -> Self {
        Amount { currency, big }
    }

    /// Validation for amounts embedded in facts, where zero is meaningless.
    pub fn validate_positive(&self) -> Result<(), TypeError> {
        if self.big.is_zero() {
            return Err(TypeError::InvalidAmount(format!(
                "zero amount of {}",
                self.currency
            )));
        }
        Ok(())
    }
}
