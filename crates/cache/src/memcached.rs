//! Remote memcached backend.

use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::{Cache, CacheError};

/// Cache backed by an external memcached service.
///
/// Raw cache keys (path + query) can exceed memcached's key limits, so keys
/// are hashed to a fixed-width hex form before hitting the wire.
pub struct MemcachedCache {
    client: memcache::Client,
}

impl MemcachedCache {
    /// Connect to `host:port`. Connection errors surface immediately so a
    /// misconfigured cache fails at startup.
    pub fn connect(addr: &str) -> Result<Self, CacheError> {
        let url = format!("memcache://{addr}");
        let client = memcache::Client::connect(url.as_str())
            .map_err(|e| CacheError::Backend(format!("memcached connect {addr}: {e}")))?;
        Ok(MemcachedCache { client })
    }

    fn wire_key(key: &str) -> String {
        hex::encode(Sha256::digest(key.as_bytes()))
    }
}

impl Cache for MemcachedCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self.client.get::<Vec<u8>>(&Self::wire_key(key)) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(key, error = %e, "memcached get failed");
                None
            }
        }
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let expiration = ttl.as_secs().min(u32::MAX as u64) as u32;
        if let Err(e) = self
            .client
            .set(&Self::wire_key(key), value.as_slice(), expiration)
        {
            tracing::debug!(key, error = %e, "memcached set failed");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.client.delete(&Self::wire_key(key)) {
            tracing::debug!(key, error = %e, "memcached delete failed");
        }
    }
}
