//! Currency metadata: fee policies and currency designs.

use serde::{Deserialize, Serialize};

use crate::amount::{Big, CurrencyId};
use crate::error::TypeError;

/// A currency's fee-computation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FeePolicy {
    /// No fee is charged.
    Nil,
    /// A flat fee per operation.
    Fixed { amount: Big },
    /// A proportional fee, bounded below and above.
    Ratio { ratio: f64, min: Big, max: Big },
}

impl FeePolicy {
    pub fn validate(&self) -> Result<(), TypeError> {
        match self {
            FeePolicy::Nil => Ok(()),
            FeePolicy::Fixed { .. } => Ok(()),
            FeePolicy::Ratio { ratio, min, max } => {
                if !(0.0..=1.0).contains(ratio) || !ratio.is_finite() {
                    return Err(TypeError::InvalidCurrency(format!(
                        "fee ratio {ratio} out of range 0..=1"
                    )));
                }
                if min > max {
                    return Err(TypeError::InvalidCurrency(format!(
                        "fee min {min} above max {max}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Policy attached to a currency design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyPolicy {
    /// Minimum balance a newly created account must hold in this currency.
    pub new_account_min_balance: Big,
    pub fee: FeePolicy,
}

impl CurrencyPolicy {
    pub fn validate(&self) -> Result<(), TypeError> {
        self.fee.validate()
    }
}

/// Metadata for one currency unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyDesign {
    pub currency: CurrencyId,
    pub genesis_amount: Big,
    pub policy: CurrencyPolicy,
}

impl CurrencyDesign {
    pub fn new(
        currency: CurrencyId,
        genesis_amount: Big,
        policy: CurrencyPolicy,
    ) -> Result<Self, TypeError> {
        let d = CurrencyDesign {
            currency,
            genesis_amount,
            policy,
        };
        d.validate()?;
        Ok(d)
    }

    pub fn validate(&self) -> Result<(), TypeError> {
        if self.genesis_amount.is_zero() {
            return Err(TypeError::InvalidCurrency(format!(
                "zero genesis supply for {}",
                self.currency
            )));
        }
        self.policy.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vst() -> CurrencyId {
        CurrencyId::new("VST").unwrap()
    }

    #[test]
    fn ratio_bounds() {
        let ok = FeePolicy::Ratio {
            ratio: 0.05,
            min: Big::new(1),
            max: Big::new(100),
        };
        assert!(ok.validate().is_ok());

        let out_of_range = FeePolicy::Ratio {
            ratio: 1.5,
            min: Big::new(1),
            max: Big::new(100),
        };
        assert!(out_of_range.validate().is_err());

        let inverted = FeePolicy::Ratio {
            ratio: 0.1,
            min: Big::new(100),
            max: Big::new(1),
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn design_requires_supply() {
        let policy = CurrencyPolicy {
            new_account_min_balance: Big::ZERO,
            fee: FeePolicy::Nil,
        };
        assert!(CurrencyDesign::new(vst(), Big::new(1_000_000), policy.clone()).is_ok());
        assert!(CurrencyDesign::new(vst(), Big::ZERO, policy).is_err());
    }

    #[test]
    fn fee_policy_wire_shape() {
        let json = serde_json::to_value(FeePolicy::Fixed { amount: Big::new(3) }).unwrap();
        assert_eq!(json["type"], "fixed");
        assert_eq!(json["amount"], "3");
    }
}
