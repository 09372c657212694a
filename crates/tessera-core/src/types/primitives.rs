use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Number of bytes in a SHA256 digest (header, validator set and app hashes).
pub const HASH_LEN: usize = 32;

/// Number of bytes in a validator address.
pub const ADDRESS_LEN: usize = 20;

/// Number of bytes in an Ed25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Number of bytes in an Ed25519 signature.
pub const SIGNATURE_LEN: usize = 64;

/// A byte string had the wrong length for the fixed-size type it was decoded into.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid {what} length: expected {expected} bytes, got {got}")]
pub struct BytesLengthError {
    pub what: &'static str,
    pub expected: usize,
    pub got: usize,
}

/// Declares a fixed-size byte newtype.
///
/// Equality goes through `subtle` so that comparing attacker-supplied hashes
/// and ids never short-circuits on the first differing byte. On the serde side
/// the bytes travel as a hex string (with or without `0x`).
macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr, $what:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn from_slice(bytes: &[u8]) -> Result<Self, BytesLengthError> {
                let arr: [u8; $len] = bytes.try_into().map_err(|_| BytesLengthError {
                    what: $what,
                    expected: $len,
                    got: bytes.len(),
                })?;
                Ok(Self(arr))
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.0[..].ct_eq(&other.0[..]).into()
            }
        }

        impl Eq for $name {}

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                self.0.cmp(&other.0)
            }
        }

        impl std::hash::Hash for $name {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.0.hash(state);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{})", stringify!($name), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&hex::encode(self.0))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                let s = s.strip_prefix("0x").unwrap_or(&s);
                let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
                Self::from_slice(&bytes).map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_bytes!(
    /// A 32-byte SHA256 digest. The all-zero value stands for "no hash".
    Hash,
    HASH_LEN,
    "hash"
);

fixed_bytes!(
    /// A validator address (20 bytes).
    Address,
    ADDRESS_LEN,
    "address"
);

fixed_bytes!(
    /// An Ed25519 public key (32 bytes, compressed Edwards point).
    PublicKey,
    PUBLIC_KEY_LEN,
    "public key"
);

fixed_bytes!(
    /// An Ed25519 signature (64 bytes).
    Signature,
    SIGNATURE_LEN,
    "signature"
);

impl Hash {
    pub const EMPTY: Hash = Hash([0u8; HASH_LEN]);

    /// SHA256 of arbitrary data.
    pub fn digest(data: &[u8]) -> Self {
        Self::digest_parts(&[data])
    }

    /// SHA256 over the concatenation of `parts`, without building the joined buffer.
    pub fn digest_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        Self(hasher.finalize().into())
    }

    /// SHA256 of two digests concatenated (one inner Merkle node).
    pub fn pair(left: &Hash, right: &Hash) -> Self {
        Self::digest_parts(&[&left.0, &right.0])
    }

    /// True for the all-zero hash, which headers use for "unset".
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl Default for Hash {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Address {
    /// Derive an address from a public key: the first 20 bytes of SHA256(pubkey).
    pub fn from_public_key(key: &PublicKey) -> Self {
        let digest = Hash::digest(&key.0);
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&digest.0[..ADDRESS_LEN]);
        Self(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_digest_known_vectors() {
        assert_eq!(
            Hash::digest(b"").0,
            hex!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
        assert_eq!(
            Hash::digest_parts(&[b"a", b"bc"]).0,
            hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_pair_is_order_sensitive() {
        let a = Hash::digest(b"a");
        let b = Hash::digest(b"b");
        assert_eq!(Hash::pair(&a, &b), Hash::pair(&a, &b));
        assert_ne!(Hash::pair(&a, &b), Hash::pair(&b, &a));
    }

    #[test]
    fn test_empty_hash() {
        assert!(Hash::EMPTY.is_empty());
        assert!(Hash::default().is_empty());
        assert!(!Hash::digest(b"").is_empty());
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        let err = Address::from_slice(&[0u8; 19]).unwrap_err();
        assert_eq!(err.expected, ADDRESS_LEN);
        assert_eq!(err.got, 19);
        assert!(Signature::from_slice(&[7u8; SIGNATURE_LEN]).is_ok());
    }

    #[test]
    fn test_hex_serde_accepts_prefix() {
        let json = format!("\"0x{}\"", "ab".repeat(HASH_LEN));
        let hash: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(hash, Hash([0xAB; HASH_LEN]));

        let encoded = serde_json::to_string(&hash).unwrap();
        assert_eq!(encoded, format!("\"{}\"", "ab".repeat(HASH_LEN)));

        let short: Result<Hash, _> = serde_json::from_str("\"abcd\"");
        assert!(short.is_err());
    }

    #[test]
    fn test_address_ordering_is_bytewise() {
        let low = Address([0x01; ADDRESS_LEN]);
        let high = Address([0x02; ADDRESS_LEN]);
        assert!(low < high);
    }
}
