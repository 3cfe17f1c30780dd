use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identifier the blob store assigns to a blob when it is created.
///
/// IDs are UUID v7, so they sort by creation time and are never reused: two
/// saves of identical bytes get two different IDs. That keeps purging one
/// site's version from deleting bytes another save still points at.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(uuid::Uuid);

impl BlobId {
    /// Generate a fresh time-ordered blob ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Lowercase hyphenated form, used in URLs and file names.
    pub fn to_key(&self) -> String {
        self.0.as_hyphenated().to_string()
    }

    /// Short representation (first 8 characters).
    pub fn short_id(&self) -> String {
        self.to_key()[..8].to_string()
    }

    /// Parse from the hyphenated or simple UUID form.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        uuid::Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| TypeError::InvalidBlobId(format!("{s:?}: {e}")))
    }
}

impl FromStr for BlobId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobId({})", self.short_id())
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

/// BLAKE3 digest of a blob's bytes, domain-separated for verso blobs.
///
/// Stored alongside each blob so reads can be verified against what was
/// written.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    const DOMAIN: &'static [u8] = b"verso-blob-v1:";

    /// Digest the given content.
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(Self::DOMAIN);
        hasher.update(data);
        Self(*hasher.finalize().as_bytes())
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.short_hex())
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_ordered() {
        let a = BlobId::generate();
        let b = BlobId::generate();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn parse_accepts_display_form() {
        let id = BlobId::generate();
        let parsed: BlobId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = BlobId::parse("not-a-blob").unwrap_err();
        assert!(matches!(err, TypeError::InvalidBlobId(_)));
    }

    #[test]
    fn short_id_is_8_chars() {
        assert_eq!(BlobId::generate().short_id().len(), 8);
    }

    #[test]
    fn blob_id_serializes_as_plain_string() {
        let id = BlobId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(ContentDigest::of(b"hello"), ContentDigest::of(b"hello"));
        assert_ne!(ContentDigest::of(b"hello"), ContentDigest::of(b"world"));
    }

    #[test]
    fn digest_is_domain_separated() {
        let raw = *blake3::hash(b"hello").as_bytes();
        assert_ne!(ContentDigest::of(b"hello").as_bytes(), &raw);
    }

    #[test]
    fn digest_hex_parsing() {
        let digest = ContentDigest::of(b"test");
        assert_eq!(ContentDigest::from_hex(&digest.to_hex()).unwrap(), digest);
        assert_eq!(
            ContentDigest::from_hex("abcd").unwrap_err(),
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
    }
}
