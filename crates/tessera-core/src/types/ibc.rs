use serde::{Deserialize, Serialize};

/// The only proof operation the verifier folds.
pub const IAVL_OP: &str = "iavl";

/// One step of a commitment proof: `hash(prefix || current || suffix)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOp {
    /// Operation kind. Anything other than [`IAVL_OP`] is rejected.
    pub op_type: String,
    #[serde(with = "hex_bytes")]
    pub prefix: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub suffix: Vec<u8>,
}

impl ProofOp {
    pub fn iavl(prefix: Vec<u8>, suffix: Vec<u8>) -> Self {
        Self {
            op_type: IAVL_OP.to_string(),
            prefix,
            suffix,
        }
    }
}

/// Evidence that `(key, value)` is committed under a chain's app hash at `height`.
/// Obtained from any (untrusted) relayer, verified locally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    #[serde(with = "hex_bytes")]
    pub key: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub value: Vec<u8>,
    /// Applied in order, leaf first.
    pub ops: Vec<ProofOp>,
    pub height: u64,
}

mod hex_bytes {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proof_json_uses_hex() {
        let proof = Proof {
            key: b"k".to_vec(),
            value: vec![0xAB],
            ops: vec![ProofOp::iavl(vec![0x01], vec![])],
            height: 7,
        };

        let json = serde_json::to_value(&proof).unwrap();
        assert_eq!(json["key"], "6b");
        assert_eq!(json["value"], "ab");
        assert_eq!(json["ops"][0]["op_type"], "iavl");
        assert_eq!(json["ops"][0]["suffix"], "");

        let decoded: Proof = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, proof);
    }
}
