//! Buffered HTTP responses.
//!
//! A handler's full response — status, the filtered header subset and the
//! body — is captured into one value that can be stored as cache bytes and
//! replayed verbatim for later identical requests.

use serde::{Deserialize, Serialize};

/// A fully-buffered HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedResponse {
    pub status: u16,
    pub content_type: String,
    /// Wire-encoding hint for the embedded payload.
    pub encoder_hint: String,
    pub body: Vec<u8>,
}

impl CapturedResponse {
    pub fn new(
        status: u16,
        content_type: impl Into<String>,
        encoder_hint: impl Into<String>,
        body: Vec<u8>,
    ) -> Self {
        CapturedResponse {
            status,
            content_type: content_type.into(),
            encoder_hint: encoder_hint.into(),
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Serialize for storage in a byte cache.
    pub fn to_cache_bytes(&self) -> Vec<u8> {
        // Infallible for this shape; an empty vec would simply never replay.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Decode a previously-captured response; `None` for foreign bytes.
    pub fn from_cache_bytes(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_round_trip() {
        let captured = CapturedResponse::new(
            200,
            "application/hal+json",
            "json-v1",
            br#"{"_embedded":{}}"#.to_vec(),
        );
        let bytes = captured.to_cache_bytes();
        assert_eq!(CapturedResponse::from_cache_bytes(&bytes).unwrap(), captured);
    }

    #[test]
    fn foreign_bytes_do_not_replay() {
        assert!(CapturedResponse::from_cache_bytes(b"not-json").is_none());
    }

    #[test]
    fn success_statuses() {
        assert!(CapturedResponse::new(200, "t", "e", vec![]).is_success());
        assert!(!CapturedResponse::new(404, "t", "e", vec![]).is_success());
    }
}
