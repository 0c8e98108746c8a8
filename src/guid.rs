//! Content-fingerprint identifiers.
//!
//! Every API, assembly, package and extension method is identified by a
//! 16-byte fingerprint of a canonical identity string, so the same logical
//! entity gets the same id across independent indexing runs. The fingerprint
//! is the first 16 bytes of the SHA-256 digest of the UTF-8 input.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::Error;

/// 16-byte identifier stored raw (no endian conversion) in the catalog.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Guid([u8; 16]);

impl Guid {
    /// Size in bytes.
    pub const SIZE: usize = 16;

    /// The all-zero id.
    pub const EMPTY: Guid = Guid([0; 16]);

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Fingerprint a canonical identity string.
    pub fn from_content(identity: &str) -> Self {
        Self::from_parts(&[identity.as_bytes()])
    }

    /// Fingerprint several byte strings hashed back to back.
    pub fn from_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Self(bytes)
    }

    /// Fingerprint for an assembly identity.
    pub fn for_assembly(name: &str, version: &str, public_key_token: &str) -> Self {
        let token = if public_key_token.is_empty() {
            "null"
        } else {
            public_key_token
        };
        Self::from_content(&format!(
            "{}, Version={}, PublicKeyToken={}",
            name, version, token
        ))
    }

    /// Fingerprint for a package id and version.
    pub fn for_package(id: &str, version: &str) -> Self {
        Self::from_content(&format!("{}/{}", id.to_lowercase(), version))
    }

    /// Fingerprint for an extension-method edge.
    pub fn for_extension_method(extended_type: Guid, method: Guid) -> Self {
        Self::from_parts(&[extended_type.as_bytes(), method.as_bytes()])
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}

impl FromStr for Guid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: Vec<u8> = s.bytes().filter(|b| *b != b'-').collect();
        if hex.len() != 32 {
            return Err(Error::InvalidGuid(s.to_string()));
        }

        let mut bytes = [0u8; 16];
        for (i, pair) in hex.chunks(2).enumerate() {
            let text = std::str::from_utf8(pair).map_err(|_| Error::InvalidGuid(s.to_string()))?;
            bytes[i] =
                u8::from_str_radix(text, 16).map_err(|_| Error::InvalidGuid(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for Guid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Guid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
