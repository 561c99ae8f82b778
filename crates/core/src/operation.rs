//! Operations: a fact plus the signatures over it.

use alloy_primitives::B256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::TypeError;
use crate::fact::Fact;
use crate::keys::{Publickey, Signature};
use crate::network::NetworkId;

/// One signature over a fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSign {
    pub signer: Publickey,
    pub signature: Signature,
    pub signed_at: DateTime<Utc>,
}

impl FactSign {
    pub fn new(signer: Publickey, signature: Signature, signed_at: DateTime<Utc>) -> Self {
        FactSign {
            signer,
            signature,
            signed_at,
        }
    }

    fn write_bytes(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.signer.as_str().as_bytes());
        buf.extend_from_slice(self.signature.as_str().as_bytes());
        buf.extend_from_slice(&self.signed_at.timestamp_millis().to_be_bytes());
    }
}

/// Verification seam for fact signatures.
///
/// The digest core never verifies cryptography itself; a node embeds an
/// implementation backed by its key primitives. [`AcceptAll`] is the
/// structural default used in tests and template validation.
pub trait SignatureVerifier: Send + Sync {
    fn verify(
        &self,
        signer: &Publickey,
        signature: &Signature,
        message: &[u8],
    ) -> Result<(), TypeError>;
}

/// Accepts every structurally-valid signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl SignatureVerifier for AcceptAll {
    fn verify(
        &self,
        _signer: &Publickey,
        _signature: &Signature,
        _message: &[u8],
    ) -> Result<(), TypeError> {
        Ok(())
    }
}

/// A signed operation: the unit submitted to the chain and projected by the
/// digest pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub hash: B256,
    pub fact: Fact,
    pub fact_signs: Vec<FactSign>,
}

impl Operation {
    /// Compose an operation, computing its hash from the fact and signs.
    pub fn new(fact: Fact, fact_signs: Vec<FactSign>) -> Self {
        let hash = Self::compute_hash(&fact, &fact_signs);
        Operation {
            hash,
            fact,
            fact_signs,
        }
    }

    /// sha256 over the fact hash and every fact sign.
    pub fn compute_hash(fact: &Fact, fact_signs: &[FactSign]) -> B256 {
        let mut buf = Vec::with_capacity(128);
        buf.extend_from_slice(fact.hash().as_slice());
        for fs in fact_signs {
            fs.write_bytes(&mut buf);
        }
        B256::from_slice(&Sha256::digest(buf))
    }

    pub fn fact_hash(&self) -> B256 {
        self.fact.hash()
    }

    /// Structural validation plus signature verification through the given
    /// seam, against the network-bound signature base.
    pub fn validate(
        &self,
        network_id: &NetworkId,
        verifier: &dyn SignatureVerifier,
    ) -> Result<(), TypeError> {
        self.fact.validate()?;
        if self.fact_signs.is_empty() {
            return Err(TypeError::InvalidOperation("no fact signs".into()));
        }
        if self.hash != Self::compute_hash(&self.fact, &self.fact_signs) {
            return Err(TypeError::InvalidOperation("hash mismatch".into()));
        }
        let base = self.fact.signature_base(network_id);
        for fs in &self.fact_signs {
            verifier.verify(&fs.signer, &fs.signature, &base)?;
        }
        Ok(())
    }
}
