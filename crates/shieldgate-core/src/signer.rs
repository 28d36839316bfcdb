// Local signer backed by an Ed25519 key
//
// The signer address is "0x" + the last 20 bytes of SHA-256(verifying key).
// Only the recognised transaction fields are signed, in canonical JSON form;
// the payload is "0x" + hex(canonical bytes || 64-byte signature).

use async_trait::async_trait;
use ed25519_dalek::{Signer as _, SigningKey};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::config::ConfigError;
use crate::error::SignerError;
use crate::fingerprint::canonical_json;
use crate::traits::Signer;

/// Transaction fields carried into the signed request
const SIGNED_FIELDS: &[&str] = &[
    "to",
    "data",
    "value",
    "nonce",
    "gasLimit",
    "gasPrice",
    "maxFeePerGas",
    "maxPriorityFeePerGas",
    "chainId",
    "type",
];

pub struct LocalSigner {
    key: Option<SigningKey>,
    address: Option<String>,
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl LocalSigner {
    /// Build from an optional hex seed (32 bytes, optional 0x prefix)
    pub fn from_config(private_key: Option<&str>) -> Result<Self, ConfigError> {
        let Some(raw) = private_key else {
            return Ok(Self::unconfigured());
        };

        let invalid = |message: String| ConfigError::Invalid {
            var: "SIGNER_PRIVATE_KEY".to_string(),
            message,
        };
        let bytes = hex::decode(raw.trim().trim_start_matches("0x"))
            .map_err(|e| invalid(e.to_string()))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| invalid(format!("expected 32 bytes, got {}", b.len())))?;

        Ok(Self::from_seed(seed))
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        let key = SigningKey::from_bytes(&seed);
        let digest = Sha256::digest(key.verifying_key().as_bytes());
        let address = format!("0x{}", hex::encode(&digest[12..]));
        Self {
            key: Some(key),
            address: Some(address),
        }
    }

    /// A signer with no key; every sign call fails with NotConfigured
    pub fn unconfigured() -> Self {
        Self {
            key: None,
            address: None,
        }
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

fn decode_transaction(unsigned: &Value) -> Result<Map<String, Value>, SignerError> {
    let value = match unsigned {
        Value::String(raw) => serde_json::from_str(raw).map_err(|e| {
            SignerError::MalformedTransaction(format!("transaction is not valid JSON: {}", e))
        })?,
        other => other.clone(),
    };
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(SignerError::MalformedTransaction(
            "transaction must be an object".to_string(),
        )),
    }
}

#[async_trait]
impl Signer for LocalSigner {
    async fn sign(
        &self,
        unsigned_transaction: &Value,
        expected_address: &str,
    ) -> Result<String, SignerError> {
        let (Some(key), Some(address)) = (&self.key, &self.address) else {
            return Err(SignerError::NotConfigured);
        };

        if !address.eq_ignore_ascii_case(expected_address) {
            return Err(SignerError::AddressMismatch {
                expected: expected_address.to_string(),
                actual: address.clone(),
            });
        }

        let tx = decode_transaction(unsigned_transaction)?;

        let present = |field: &str| {
            tx.get(field)
                .and_then(Value::as_str)
                .is_some_and(|v| !v.is_empty())
        };
        if !present("to") || !present("data") {
            return Err(SignerError::MalformedTransaction(
                "transaction requires 'to' and 'data'".to_string(),
            ));
        }

        // A null or empty `from` is treated as absent
        let from = tx
            .get("from")
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty());
        if let Some(from) = from {
            if !from.eq_ignore_ascii_case(address) {
                return Err(SignerError::AddressMismatch {
                    expected: from.to_string(),
                    actual: address.clone(),
                });
            }
        }

        let request: Map<String, Value> = SIGNED_FIELDS
            .iter()
            .filter_map(|field| tx.get(*field).map(|v| (field.to_string(), v.clone())))
            .collect();
        let message = canonical_json(&Value::Object(request)).into_bytes();

        let signature = key
            .try_sign(&message)
            .map_err(|e| SignerError::SigningFailed(e.to_string()))?;

        let mut payload = message;
        payload.extend_from_slice(&signature.to_bytes());
        Ok(format!("0x{}", hex::encode(payload)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};
    use serde_json::json;

    fn tx() -> Value {
        json!({
            "to": "0x1111111111111111111111111111111111111111",
            "data": "0x095ea7b3",
            "value": "0",
            "nonce": 0,
            "chainId": 11155111,
            "note": "not signed",
        })
    }

    #[tokio::test]
    async fn test_unconfigured_signer() {
        let signer = LocalSigner::from_config(None).unwrap();
        let err = signer.sign(&tx(), "0xabc").await.unwrap_err();
        assert!(matches!(err, SignerError::NotConfigured));
    }

    #[tokio::test]
    async fn test_address_mismatch() {
        let signer = LocalSigner::from_seed([7u8; 32]);
        let err = signer
            .sign(&tx(), "0x0000000000000000000000000000000000000000")
            .await
            .unwrap_err();
        assert!(matches!(err, SignerError::AddressMismatch { .. }));
    }

    #[tokio::test]
    async fn test_malformed_transactions() {
        let signer = LocalSigner::from_seed([7u8; 32]);
        let address = signer.address().unwrap().to_string();

        let err = signer.sign(&json!("not json"), &address).await.unwrap_err();
        assert!(matches!(err, SignerError::MalformedTransaction(_)));

        let err = signer.sign(&json!([1, 2]), &address).await.unwrap_err();
        assert!(matches!(err, SignerError::MalformedTransaction(_)));

        let err = signer
            .sign(&json!({"to": "0x11"}), &address)
            .await
            .unwrap_err();
        assert!(matches!(err, SignerError::MalformedTransaction(_)));
    }

    #[tokio::test]
    async fn test_null_or_empty_to_and_data_rejected() {
        let signer = LocalSigner::from_seed([7u8; 32]);
        let address = signer.address().unwrap().to_string();

        for tx in [
            json!({"to": null, "data": null}),
            json!({"to": "0x11", "data": null}),
            json!({"to": "", "data": "0x"}),
            json!({"to": "0x11", "data": 42}),
        ] {
            let err = signer.sign(&tx, &address).await.unwrap_err();
            assert!(matches!(err, SignerError::MalformedTransaction(_)), "{}", tx);
        }
    }

    #[tokio::test]
    async fn test_null_from_is_ignored() {
        let signer = LocalSigner::from_seed([7u8; 32]);
        let address = signer.address().unwrap().to_string();

        let payload = signer
            .sign(&json!({"to": "0x11", "data": "0x", "from": null}), &address)
            .await
            .unwrap();
        assert!(payload.starts_with("0x"));

        let mut tx = tx();
        tx["from"] = json!("");
        assert!(signer.sign(&tx, &address).await.is_ok());
    }

    #[tokio::test]
    async fn test_from_must_match_signer() {
        let signer = LocalSigner::from_seed([7u8; 32]);
        let address = signer.address().unwrap().to_string();
        let mut tx = tx();
        tx["from"] = json!("0x9999999999999999999999999999999999999999");
        let err = signer.sign(&tx, &address).await.unwrap_err();
        assert!(matches!(err, SignerError::AddressMismatch { .. }));
    }

    #[tokio::test]
    async fn test_signature_verifies_over_canonical_fields() {
        let seed = [7u8; 32];
        let signer = LocalSigner::from_seed(seed);
        let address = signer.address().unwrap().to_uppercase().replacen("0X", "0x", 1);

        let payload = signer.sign(&tx(), &address).await.unwrap();
        let bytes = hex::decode(payload.trim_start_matches("0x")).unwrap();
        let (message, sig) = bytes.split_at(bytes.len() - 64);

        let message_text = std::str::from_utf8(message).unwrap();
        assert!(!message_text.contains("note"));
        assert!(message_text.starts_with(r#"{"chainId":11155111,"data":"#));

        let verifying = SigningKey::from_bytes(&seed).verifying_key();
        let signature = Signature::from_slice(sig).unwrap();
        assert!(verifying.verify(message, &signature).is_ok());

        // String-encoded transactions sign identically
        let again = signer
            .sign(&Value::String(tx().to_string()), &address)
            .await
            .unwrap();
        assert_eq!(payload, again);
    }

    #[test]
    fn test_invalid_seed_is_config_error() {
        assert!(LocalSigner::from_config(Some("0x1234")).is_err());
        assert!(LocalSigner::from_config(Some("zz")).is_err());
        let signer = LocalSigner::from_config(Some(&"ab".repeat(32))).unwrap();
        assert_eq!(signer.address().unwrap().len(), 42);
    }
}
