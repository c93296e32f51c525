//! JWS 信封的建構與解析。
//!
//! 每個送出的變更請求都由 [`build_envelope`] 建立一個全新的信封；信封一旦
//! 建立即不可修改，也不會重複使用。

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::{
    base64::{Base64, DecodeError},
    key_pair::{KeyError, KeyPair},
    protection::{KeyBinding, ProtectedHeader, Protection},
    signature::{create_signature, verify_signature, SignatureError},
};

/// 表示與 JWS 相關的錯誤。
#[derive(Error, Debug)]
pub enum JwsError {
    #[error("Base64 decode error: {0}")]
    Base64DecodeError(#[from] DecodeError),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Key error: {0}")]
    KeyError(#[from] KeyError),
    #[error("Signature error: {0}")]
    SignatureError(#[from] SignatureError),
}

type Result<T> = std::result::Result<T, JwsError>;

/// 以 flattened JSON 序列化的 JSON Web Signature。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Jws {
    /// 對應 JWS 中的 "protected" 欄位
    #[serde(rename = "protected")]
    header: String,
    payload: String,
    signature: String,
}

impl Jws {
    pub fn new(header_b64: &Base64, payload_b64: &Base64, signature_b64: &Base64) -> Self {
        Jws {
            header: header_b64.base64_url(),
            payload: payload_b64.base64_url(),
            signature: signature_b64.base64_url(),
        }
    }

    /// 將 `Jws` 實例序列化為 JSON 字串。
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// 解碼保護頭。
    pub fn protected_header(&self) -> Result<ProtectedHeader> {
        let bytes = Base64::from_url(&self.header)?.decode()?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// 將負載解碼為指定型別。
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        let bytes = Base64::from_url(&self.payload)?.decode()?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// 以 `key_pair` 的公鑰驗證簽名。
    pub fn verify(&self, key_pair: &KeyPair) -> Result<bool> {
        let signature = Base64::from_url(&self.signature)?.decode()?;
        Ok(verify_signature(
            &Base64::from_url(&self.header)?,
            &Base64::from_url(&self.payload)?,
            &signature,
            key_pair,
        )?)
    }
}

/// 建立一個簽名信封。
///
/// 負載序列化為 JSON 後，與綁定 `url` 及 `nonce` 的保護頭一同以 `key_pair`
/// 簽名。`nonce` 僅在信封本身不會被單獨送出時（金鑰更換的內層信封）才可省略。
///
/// # 參數
///
/// - `url`: 請求目標 URL。
/// - `payload`: 任意可序列化的負載。
/// - `key_pair`: 簽名金鑰。
/// - `nonce`: 事先取得的 Replay-Nonce。
/// - `binding`: 保護頭中的 `jwk` 或 `kid`。
pub fn build_envelope<P: Serialize + ?Sized>(
    url: &str,
    payload: &P,
    key_pair: &KeyPair,
    nonce: Option<&str>,
    binding: KeyBinding,
) -> Result<Jws> {
    let header = Protection::new(nonce, key_pair.alg)
        .bind(binding)
        .create_header(url)
        .to_base64()?;
    let payload = Base64::new(serde_json::to_vec(payload)?);
    let signature = create_signature(&header, &payload, key_pair)?;

    Ok(Jws::new(&header, &payload, &signature))
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::key_pair::KeyAlgorithm;

    #[test]
    fn test_envelope_embeds_nonce_and_verifies() {
        let key = KeyPair::generate(KeyAlgorithm::EcP256).unwrap();
        let payloads = [json!({}), json!({"a": [1, 2, 3]}), json!("plain"), json!(null)];

        for (i, payload) in payloads.iter().enumerate() {
            let nonce = format!("nonce-{i}");
            let jws = build_envelope(
                "https://ca.test/acme/new-acct",
                payload,
                &key,
                Some(&nonce),
                KeyBinding::Jwk(key.jwk().unwrap()),
            )
            .unwrap();

            let header = jws.protected_header().unwrap();
            assert_eq!(header.nonce.as_deref(), Some(nonce.as_str()));
            assert_eq!(header.url, "https://ca.test/acme/new-acct");
            assert_eq!(&jws.payload::<Value>().unwrap(), payload);
            assert!(jws.verify(&key).unwrap());
        }
    }

    #[test]
    fn test_rsa_envelope_verifies() {
        let key = KeyPair::generate(KeyAlgorithm::Rsa { bits: 2048 }).unwrap();
        let jws = build_envelope(
            "https://ca.test/x",
            &json!({"k": "v"}),
            &key,
            Some("n"),
            KeyBinding::Kid("https://ca.test/acct/1".to_string()),
        )
        .unwrap();

        assert!(jws.verify(&key).unwrap());
        assert_eq!(jws.protected_header().unwrap().alg, "RS256");
    }

    #[test]
    fn test_envelope_does_not_verify_with_other_key() {
        let key = KeyPair::generate(KeyAlgorithm::EcP256).unwrap();
        let other = KeyPair::generate(KeyAlgorithm::EcP256).unwrap();
        let jws = build_envelope("u", &json!({}), &key, Some("n"), KeyBinding::Kid("k".into()))
            .unwrap();

        assert!(!jws.verify(&other).unwrap());
    }

    #[test]
    fn test_json_field_names() {
        let key = KeyPair::generate(KeyAlgorithm::EcP256).unwrap();
        let jws = build_envelope("u", &json!({}), &key, Some("n"), KeyBinding::Kid("k".into()))
            .unwrap();
        let value: Value = serde_json::from_str(&jws.to_json().unwrap()).unwrap();

        assert!(value["protected"].is_string());
        assert!(value["payload"].is_string());
        assert!(value["signature"].is_string());
    }
}
