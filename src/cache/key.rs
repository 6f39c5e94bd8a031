//! Cache key generation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Derives stable keys from upstream request descriptions.
///
/// The same path and query pairs always map to the same key regardless of
/// pair order, so equivalent requests share cache entries and in-flight
/// fetches.
#[derive(Debug, Clone, Default)]
pub struct CacheKeyGenerator {
    prefix: Option<String>,
    salt: Option<String>,
}

impl CacheKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    pub fn for_request(&self, path: &str, query: &[(&str, &str)]) -> CacheKey {
        let mut params: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (k, v) in query {
            params.entry(*k).or_default().push(*v);
        }
        for values in params.values_mut() {
            values.sort_unstable();
        }

        let mut hasher = Sha256::new();
        hasher.update(path.as_bytes());
        for (k, values) in &params {
            for v in values {
                hasher.update([0u8]);
                hasher.update(k.as_bytes());
                hasher.update(b"=");
                hasher.update(v.as_bytes());
            }
        }
        if let Some(ref s) = self.salt {
            hasher.update([0xffu8]);
            hasher.update(s.as_bytes());
        }
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();

        match self.prefix {
            Some(ref p) => CacheKey::new(format!("{}:{}", p, hash)),
            None => CacheKey::new(hash),
        }
    }
}
