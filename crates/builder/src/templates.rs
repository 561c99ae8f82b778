//! Template placeholder values and per-kind template construction.
//!
//! Placeholders are fixed, well-known values: wallets diff a filled-in
//! template against them, and the builder rejects any submission where one
//! survives.

use vista_core::{
    AccountKey, Address, Amount, Big, CreateAccountFact, CreateAccountItem, CurrencyDesign,
    CurrencyId, CurrencyPolicy, CurrencyPolicyUpdateFact, CurrencyRegisterFact, Fact, FactKind,
    FeePolicy, KeyUpdateFact, Keys, Publickey, TransferFact, TransferItem, TypeError,
};

use crate::error::{BuilderError, BuilderResult};

pub const TEMPLATE_TOKEN: &str = "vista-template-token";
pub const TEMPLATE_SENDER: &str = "templatesender:vca";
pub const TEMPLATE_RECEIVER: &str = "templatereceiver:vca";
pub const TEMPLATE_PUBLICKEY: &str = "templatepublickey:vpb";
pub const TEMPLATE_SIGNATURE: &str = "templatesignature";
pub const TEMPLATE_CURRENCY: &str = "TPL";
pub const TEMPLATE_BIG: u128 = 100;

fn template_sender() -> Address {
    Address::new(TEMPLATE_SENDER).expect("template sender constant")
}

fn template_receiver() -> Address {
    Address::new(TEMPLATE_RECEIVER).expect("template receiver constant")
}

fn template_keys() -> Keys {
    let key = AccountKey {
        key: Publickey::new(TEMPLATE_PUBLICKEY).expect("template key constant"),
        weight: 100,
    };
    Keys {
        keys: vec![key],
        threshold: 100,
    }
}

fn template_amounts() -> Vec<Amount> {
    vec![Amount::new(template_currency(), Big::new(TEMPLATE_BIG))]
}

fn template_currency() -> CurrencyId {
    CurrencyId::new(TEMPLATE_CURRENCY).expect("template currency constant")
}

fn template_policy() -> CurrencyPolicy {
    CurrencyPolicy {
        new_account_min_balance: Big::ZERO,
        fee: FeePolicy::Nil,
    }
}

/// Build the placeholder-filled fact for one kind tag.
pub fn fact_template(kind_tag: &str) -> BuilderResult<Fact> {
    let kind = FactKind::from_tag(kind_tag)
        .ok_or_else(|| TypeError::UnknownFactKind(kind_tag.to_string()))?;

    let fact = match kind {
        FactKind::CreateAccount => Fact::CreateAccount(CreateAccountFact {
            token: TEMPLATE_TOKEN.into(),
            sender: template_sender(),
            items: vec![CreateAccountItem {
                keys: template_keys(),
                amounts: template_amounts(),
            }],
        }),
        FactKind::KeyUpdate => Fact::KeyUpdate(KeyUpdateFact {
            token: TEMPLATE_TOKEN.into(),
            target: template_sender(),
            keys: template_keys(),
            currency: template_currency(),
        }),
        FactKind::Transfer => Fact::Transfer(TransferFact {
            token: TEMPLATE_TOKEN.into(),
            sender: template_sender(),
            items: vec![TransferItem {
                receiver: template_receiver(),
                amounts: template_amounts(),
            }],
        }),
        FactKind::CurrencyRegister => Fact::CurrencyRegister(CurrencyRegisterFact {
            token: TEMPLATE_TOKEN.into(),
            design: CurrencyDesign {
                currency: template_currency(),
                genesis_amount: Big::new(TEMPLATE_BIG),
                policy: template_policy(),
            },
        }),
        FactKind::CurrencyPolicyUpdate => Fact::CurrencyPolicyUpdate(CurrencyPolicyUpdateFact {
            token: TEMPLATE_TOKEN.into(),
            currency: template_currency(),
            policy: template_policy(),
        }),
    };
    Ok(fact)
}

/// Reject a fact in which any placeholder value survives.
pub fn reject_placeholders(fact: &Fact) -> BuilderResult<()> {
    let placeholder = |what: &str| -> BuilderResult<()> {
        Err(BuilderError::Placeholder(format!(
            "{what} is same with template default"
        )))
    };

    match fact {
        Fact::CreateAccount(f) => {
            if f.sender.as_str() == TEMPLATE_SENDER {
                return placeholder("sender");
            }
            for item in &f.items {
                if item.keys.keys.iter().any(|k| k.key.as_str() == TEMPLATE_PUBLICKEY) {
                    return placeholder("key");
                }
            }
        }
        Fact::KeyUpdate(f) => {
            if f.target.as_str() == TEMPLATE_SENDER {
                return placeholder("target");
            }
            if f.keys.keys.iter().any(|k| k.key.as_str() == TEMPLATE_PUBLICKEY) {
                return placeholder("key");
            }
        }
        Fact::Transfer(f) => {
            if f.sender.as_str() == TEMPLATE_SENDER {
                return placeholder("sender");
            }
            for item in &f.items {
                if item.receiver.as_str() == TEMPLATE_RECEIVER
                    || item.receiver.as_str() == TEMPLATE_SENDER
                {
                    return placeholder("receiver");
                }
            }
        }
        Fact::CurrencyRegister(f) => {
            if f.design.currency.as_str() == TEMPLATE_CURRENCY {
                return placeholder("currency");
            }
        }
        Fact::CurrencyPolicyUpdate(f) => {
            if f.currency.as_str() == TEMPLATE_CURRENCY {
                return placeholder("currency");
            }
        }
    }
    Ok(())
}
