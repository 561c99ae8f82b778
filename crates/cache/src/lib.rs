//! Byte-oriented cache abstraction for the HTTP read surface.
//!
//! Backends are interchangeable behind the [`Cache`] trait: an in-process
//! LRU with per-entry expiry, a remote memcached service, or a no-op.
//! Entries are advisory — a miss never means an entity does not exist, and
//! writes are best-effort (failures are logged, never surfaced).
//!
//! Backend selection is by URI scheme (`memory://`, `memcached://host:port`,
//! `dummy://`); anything else fails at startup.

pub mod captured;
pub mod memcached;
pub mod memory;

pub use captured::CapturedResponse;
pub use memcached::MemcachedCache;
pub use memory::MemoryCache;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while constructing a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("unsupported cache scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid cache uri: {0}")]
    InvalidUri(String),

    #[error("cache backend error: {0}")]
    Backend(String),
}

/// A byte key/value cache with TTL semantics.
///
/// Implementations are internally synchronized; `get`/`set` take `&self`.
pub trait Cache: Send + Sync {
    /// Fetch a live entry. Expired or missing entries return `None`.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store an entry for `ttl`. Best-effort.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration);

    /// Drop an entry if present. Best-effort.
    fn remove(&self, key: &str);
}

/// A cache that stores nothing and hits never.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

impl Cache for NullCache {
    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) {}

    fn remove(&self, _key: &str) {}
}

/// Construct a cache backend from its URI.
///
/// `memory://` takes an optional `?size=N` capacity; `memcached://host:port`
/// connects eagerly so a bad address fails at startup rather than on the
/// first request.
pub fn from_uri(uri: &str) -> Result<Arc<dyn Cache>, CacheError> {
    let (scheme, rest) = uri
        .split_once("://")
        .ok_or_else(|| CacheError::InvalidUri(uri.to_string()))?;

    match scheme {
        "memory" => {
            let capacity = parse_memory_size(rest)?;
            Ok(Arc::new(MemoryCache::new(capacity)))
        }
        "memcached" => {
            if rest.is_empty() {
                return Err(CacheError::InvalidUri(uri.to_string()));
            }
            Ok(Arc::new(MemcachedCache::connect(rest)?))
        }
        "dummy" => Ok(Arc::new(NullCache)),
        other => Err(CacheError::UnsupportedScheme(other.to_string())),
    }
}

fn parse_memory_size(rest: &str) -> Result<usize, CacheError> {
    let query = rest.trim_start_matches('/');
    if query.is_empty() {
        return Ok(memory::DEFAULT_CAPACITY);
    }
    let query = query
        .strip_prefix('?')
        .ok_or_else(|| CacheError::InvalidUri(format!("memory://{rest}")))?;
    for pair in query.split('&') {
        if let Some(("size", v)) = pair.split_once('=') {
            let n: usize = v
                .parse()
                .map_err(|_| CacheError::InvalidUri(format!("bad size: {v}")))?;
            if n == 0 {
                return Err(CacheError::InvalidUri("size must be positive".into()));
            }
            return Ok(n);
        }
    }
    Ok(memory::DEFAULT_CAPACITY)
}
