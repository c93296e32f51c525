use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{base64::Base64, key_pair::{KeyAlgorithm, KeyPair}};

/// JWK 相關操作的錯誤類型。
#[derive(Debug, Error)]
pub enum JwkError {
    /// 金鑰轉換失敗。
    #[error("Failed to convert key: {0}")]
    KeyConversionError(String),
    /// 序列化錯誤。
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// JSON Web Key (JWK) 的封裝，支援 RSA 與 P-256 EC 公鑰。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kty")]
pub enum Jwk {
    /// RSA 格式的 JWK。
    #[serde(rename = "RSA")]
    Rsa(RsaJwk),
    /// EC 格式的 JWK。
    #[serde(rename = "EC")]
    Ec(EcJwk),
}

/// RSA 公鑰參數。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaJwk {
    n: String,
    e: String,
}

/// EC 公鑰參數。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcJwk {
    crv: String,
    x: String,
    y: String,
}

impl Jwk {
    /// 根據金鑰對的公鑰建立對應的 JWK。
    pub fn new(key_pair: &KeyPair) -> Result<Self, JwkError> {
        let convert = |e: openssl::error::ErrorStack| JwkError::KeyConversionError(e.to_string());

        match key_pair.alg {
            KeyAlgorithm::Rsa { .. } => {
                let rsa = key_pair.pub_key.rsa().map_err(convert)?;
                Ok(Jwk::Rsa(RsaJwk {
                    n: Base64::new(rsa.n().to_vec()).base64_url(),
                    e: Base64::new(rsa.e().to_vec()).base64_url(),
                }))
            }
            KeyAlgorithm::EcP256 => {
                let (x, y) = key_pair
                    .ec_coordinates()
                    .map_err(|e| JwkError::KeyConversionError(e.to_string()))?;
                Ok(Jwk::Ec(EcJwk {
                    crv: "P-256".to_string(),
                    x: Base64::new(x).base64_url(),
                    y: Base64::new(y).base64_url(),
                }))
            }
        }
    }

    /// 產生 RFC 7638 規定的正規 JSON：只含必要成員，並依字典序排列。
    ///
    /// 此輸出用於計算 thumbprint。
    pub fn to_acme_json(&self) -> Result<String, JwkError> {
        let mut map = Map::new();
        match self {
            Jwk::Rsa(jwk) => {
                map.insert("e".to_string(), Value::String(jwk.e.clone()));
                map.insert("kty".to_string(), Value::String("RSA".to_string()));
                map.insert("n".to_string(), Value::String(jwk.n.clone()));
            }
            Jwk::Ec(jwk) => {
                map.insert("crv".to_string(), Value::String(jwk.crv.clone()));
                map.insert("kty".to_string(), Value::String("EC".to_string()));
                map.insert("x".to_string(), Value::String(jwk.x.clone()));
                map.insert("y".to_string(), Value::String(jwk.y.clone()));
            }
        }

        serde_json::to_string(&Value::Object(map)).map_err(JwkError::from)
    }
}
