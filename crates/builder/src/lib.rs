//! Wallet-facing operation builder.
//!
//! Produces fact templates pre-filled with well-known placeholder values,
//! and validates/recomposes client-submitted facts and signed operations.
//! Any submission that still carries an unmodified placeholder is rejected
//! — that is the tell of a wallet that forgot to customize the template.
//!
//! Template generation is deterministic: the same placeholders every call,
//! so wallets can diff a filled-in template against the original.

pub mod error;
pub mod templates;

pub use error::{BuilderError, BuilderResult};
pub use templates::{
    TEMPLATE_BIG, TEMPLATE_CURRENCY, TEMPLATE_PUBLICKEY, TEMPLATE_RECEIVER, TEMPLATE_SENDER,
    TEMPLATE_SIGNATURE, TEMPLATE_TOKEN,
};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use vista_core::{
    AcceptAll, Fact, FactRegistry, FactSign, NetworkId, Operation, Publickey, Signature,
    SignatureVerifier,
};

/// A validated fact plus the exact bytes the client must sign.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltFact {
    pub fact: Fact,
    pub signature_base: Vec<u8>,
}

/// Request body for composing an operation from a fact and one signature.
#[derive(Debug, Clone, Deserialize)]
pub struct SignRequest {
    pub fact: Fact,
    pub signer: Publickey,
    pub signature: Signature,
    pub signed_at: DateTime<Utc>,
}

/// Constructs and validates operation templates for external wallets.
pub struct Builder {
    registry: Arc<FactRegistry>,
    network_id: NetworkId,
    verifier: Arc<dyn SignatureVerifier>,
}

impl Builder {
    pub fn new(registry: Arc<FactRegistry>, network_id: NetworkId) -> Self {
        Builder {
            registry,
            network_id,
            verifier: Arc::new(AcceptAll),
        }
    }

    /// Plug in a real signature verifier; the default accepts everything
    /// structurally valid.
    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn network_id(&self) -> &NetworkId {
        &self.network_id
    }

    /// A fact pre-filled with placeholder values for the given kind tag.
    pub fn fact_template(&self, kind_tag: &str) -> BuilderResult<Fact> {
        templates::fact_template(kind_tag)
    }

    /// Decode and validate a client-submitted fact.
    ///
    /// A token still equal to the template default is replaced with a fresh
    /// one; every other surviving placeholder is rejected. On success the
    /// caller receives the fact plus its signature base for this network.
    pub fn build_fact(&self, bytes: &[u8]) -> BuilderResult<BuiltFact> {
        let mut fact = self.registry.decode_slice(bytes)?;

        if let Some(token) = check_token(fact.token())? {
            fact.set_token(token);
        }
        templates::reject_placeholders(&fact)?;
        fact.validate()?;

        let signature_base = fact.signature_base(&self.network_id);
        Ok(BuiltFact {
            fact,
            signature_base,
        })
    }

    /// Decode a client-submitted operation, rebuild it with its fact
    /// signatures and validate it against the network id.
    pub fn build_operation(&self, bytes: &[u8]) -> BuilderResult<Operation> {
        let decoded: Operation =
            serde_json::from_slice(bytes).map_err(|e| BuilderError::Decode(e.to_string()))?;

        templates::reject_placeholders(&decoded.fact)?;
        for sign in &decoded.fact_signs {
            if sign.signer.as_str() == TEMPLATE_PUBLICKEY
                || sign.signature.as_str() == TEMPLATE_SIGNATURE
            {
                return Err(BuilderError::Placeholder(
                    "fact sign is same with template default".into(),
                ));
            }
        }

        // Rebuild through the canonical constructor: the client-sent hash
        // is recomputed, not trusted.
        let operation = Operation::new(decoded.fact, decoded.fact_signs);
        operation.validate(&self.network_id, self.verifier.as_ref())?;
        Ok(operation)
    }

    /// Validate an already-composed operation against this network.
    pub fn verify_operation(&self, operation: &Operation) -> BuilderResult<()> {
        operation
            .validate(&self.network_id, self.verifier.as_ref())
            .map_err(Into::into)
    }

    /// Compose a signed operation from a fact and one fact signature.
    pub fn attach_sign(&self, request: SignRequest) -> BuilderResult<Operation> {
        templates::reject_placeholders(&request.fact)?;
        if request.signer.as_str() == TEMPLATE_PUBLICKEY
            || request.signature.as_str() == TEMPLATE_SIGNATURE
        {
            return Err(BuilderError::Placeholder(
                "fact sign is same with template default".into(),
            ));
        }

        let sign = FactSign::new(request.signer, request.signature, request.signed_at);
        let operation = Operation::new(request.fact, vec![sign]);
        operation.validate(&self.network_id, self.verifier.as_ref())?;
        Ok(operation)
    }
}

/// Validate a fact token. Empty tokens fail; the template default is
/// replaced with a freshly generated one; anything else is kept.
pub fn check_token(token: &str) -> BuilderResult<Option<String>> {
    if token.is_empty() {
        return Err(BuilderError::Validation("empty token".into()));
    }
    if token == TEMPLATE_TOKEN {
        return Ok(Some(fresh_token()));
    }
    Ok(None)
}

fn fresh_token() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vista_core::{Address, Amount, Big, CurrencyId, FactKind, TransferFact, TransferItem};

    fn builder() -> Builder {
        Builder::new(
            Arc::new(FactRegistry::with_defaults()),
            NetworkId::new("vista-test").unwrap(),
        )
    }

    fn filled_transfer() -> Fact {
        Fact::Transfer(TransferFact {
            token: "customer-token-1".into(),
            sender: Address::new("alice:vca").unwrap(),
            items: vec![TransferItem {
                receiver: Address::new("bob:vca").unwrap(),
                amounts: vec![Amount::new(CurrencyId::new("VST").unwrap(), Big::new(10))],
            }],
        })
    }

    #[test]
    fn templates_are_deterministic() {
        let b = builder();
        for kind in FactKind::ALL {
            let a = b.fact_template(kind.as_str()).unwrap();
            let c = b.fact_template(kind.as_str()).unwrap();
            assert_eq!(a, c, "{kind}");
            assert_eq!(a.hash(), c.hash(), "{kind}");
        }
    }

    #[test]
    fn unknown_kind_fails() {
        assert!(matches!(
            builder().fact_template("mint"),
            Err(BuilderError::Type(_))
        ));
    }

    #[test]
    fn unmodified_template_is_rejected() {
        let b = builder();
        let template = b.fact_template("transfer").unwrap();
        let bytes = serde_json::to_vec(&template).unwrap();
        let err = b.build_fact(&bytes).unwrap_err();
        assert!(matches!(err, BuilderError::Placeholder(_)), "{err}");
    }

    #[test]
    fn filled_in_fact_builds_with_signature_base() {
        let b = builder();
        let fact = filled_transfer();
        let bytes = serde_json::to_vec(&fact).unwrap();

        let built = b.build_fact(&bytes).unwrap();
        assert_eq!(built.fact, fact);
        // Independent recomputation of the signature base.
        assert_eq!(
            built.signature_base,
            fact.signature_base(&NetworkId::new("vista-test").unwrap())
        );
    }

    #[test]
    fn default_token_is_substituted() {
        let b = builder();
        let mut fact = filled_transfer();
        fact.set_token(TEMPLATE_TOKEN.into());
        let bytes = serde_json::to_vec(&fact).unwrap();

        let built = b.build_fact(&bytes).unwrap();
        assert_ne!(built.fact.token(), TEMPLATE_TOKEN);
        assert!(!built.fact.token().is_empty());
        // Base covers the substituted token.
        assert_eq!(
            built.signature_base,
            built
                .fact
                .signature_base(&NetworkId::new("vista-test").unwrap())
        );
    }

    #[test]
    fn empty_token_fails() {
        let b = builder();
        let mut fact = filled_transfer();
        fact.set_token(String::new());
        let bytes = serde_json::to_vec(&fact).unwrap();
        assert!(matches!(
            b.build_fact(&bytes),
            Err(BuilderError::Validation(_))
        ));
    }

    #[test]
    fn template_sign_is_rejected_on_operations() {
        let b = builder();
        let sign = FactSign::new(
            Publickey::new(TEMPLATE_PUBLICKEY).unwrap(),
            Signature::new("realsig").unwrap(),
            Utc::now(),
        );
        let op = Operation::new(filled_transfer(), vec![sign]);
        let bytes = serde_json::to_vec(&op).unwrap();
        assert!(matches!(
            b.build_operation(&bytes),
            Err(BuilderError::Placeholder(_))
        ));
    }

    #[test]
    fn operation_hash_is_recomputed() {
        let b = builder();
        let sign = FactSign::new(
            Publickey::new("signer1:vpb").unwrap(),
            Signature::new("realsig").unwrap(),
            Utc::now(),
        );
        let mut op = Operation::new(filled_transfer(), vec![sign]);
        let good_hash = op.hash;
        op.hash = vista_core::B256::repeat_byte(0x11);
        let bytes = serde_json::to_vec(&op).unwrap();

        let rebuilt = b.build_operation(&bytes).unwrap();
        assert_eq!(rebuilt.hash, good_hash);
    }

    #[test]
    fn attach_sign_composes_an_operation() {
        let b = builder();
        let request = SignRequest {
            fact: filled_transfer(),
            signer: Publickey::new("signer1:vpb").unwrap(),
            signature: Signature::new("realsig").unwrap(),
            signed_at: Utc::now(),
        };
        let op = b.attach_sign(request).unwrap();
        assert_eq!(op.fact, filled_transfer());
        assert_eq!(op.fact_signs.len(), 1);
    }

    #[test]
    fn check_token_rules() {
        assert!(check_token("").is_err());
        assert!(check_token("custom").unwrap().is_none());
        let replaced = check_token(TEMPLATE_TOKEN).unwrap().unwrap();
        assert_ne!(replaced, TEMPLATE_TOKEN);
    }
}
