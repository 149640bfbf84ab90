//! Run identifiers and the deterministic content fingerprint.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one pipeline run, equal to its artifact namespace name.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// FNV-1a hash used to fingerprint ingested data.
#[derive(Copy, Clone, Debug)]
pub struct SimpleHash(u32);

impl SimpleHash {
    /// Create a new hash state with the FNV offset basis.
    pub fn new() -> Self {
        Self(2_166_136_261)
    }

    /// Feed bytes into the hash function.
    pub fn update(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.0 = (self.0 ^ u32::from(*b)).wrapping_mul(16_777_619);
        }
    }

    pub fn finish32(&self) -> u32 {
        self.0
    }

    /// 8-character lowercase hex string.
    pub fn finish_hex(&self) -> String {
        format!("{:08x}", self.0)
    }
}

impl Default for SimpleHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv_reference_values() {
        let mut h = SimpleHash::new();
        assert_eq!(h.finish32(), 0x811c_9dc5);
        h.update(b"a");
        assert_eq!(h.finish_hex(), "e40c292c");
    }
}
