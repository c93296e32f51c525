use serde::{Deserialize, Serialize};

use crate::{base64::Base64, jwk::Jwk, key_pair::KeyAlgorithm};

/// 保護頭中用來識別簽名金鑰的方式。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyBinding {
    /// 直接嵌入公鑰，用於尚未取得帳戶 URL 的請求。
    Jwk(Jwk),
    /// 以帳戶 URL 作為金鑰識別符。
    Kid(String),
}

/// 用於生成保護頭（Protected Header）的建構器。
pub struct Protection<'a> {
    nonce: Option<&'a str>,
    alg: KeyAlgorithm,
    binding: Option<KeyBinding>,
}

/// 數字簽章保護頭部的資料結構。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedHeader {
    /// 簽章演算法
    pub alg: String,
    /// 防止重放攻擊的隨機數，金鑰更換的內層信封沒有此欄位
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// 請求目標 URL
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwk: Option<Jwk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl ProtectedHeader {
    /// 將保護頭序列化後轉換為 Base64url。
    pub fn to_base64(&self) -> serde_json::Result<Base64> {
        Ok(Base64::new(serde_json::to_vec(self)?))
    }
}

impl<'a> Protection<'a> {
    /// 建立一個新的 [`Protection`] 實例，演算法由金鑰類型決定。
    pub fn new(nonce: Option<&'a str>, alg: KeyAlgorithm) -> Self {
        Self {
            nonce,
            alg,
            binding: None,
        }
    }

    /// 設定保護頭的 `jwk` 或 `kid` 欄位。
    pub fn bind(mut self, binding: KeyBinding) -> Self {
        self.binding = Some(binding);
        self
    }

    /// 根據目前設定的參數為 `url` 生成一個 [`ProtectedHeader`]。
    pub fn create_header(&self, url: impl Into<String>) -> ProtectedHeader {
        let (jwk, kid) = match &self.binding {
            Some(KeyBinding::Jwk(jwk)) => (Some(jwk.clone()), None),
            Some(KeyBinding::Kid(kid)) => (None, Some(kid.clone())),
            None => (None, None),
        };

        ProtectedHeader {
            alg: self.alg.jws_alg().to_string(),
            nonce: self.nonce.map(ToString::to_string),
            url: url.into(),
            jwk,
            kid,
        }
    }
}
