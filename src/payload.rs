use std::error::Error;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{base64::Base64, jwk::Jwk};

/// 定義所有 API 載荷（Payload）必須實作的功能。
pub trait PayloadT: Serialize {
    /// 將載荷轉換成 JSON 格式的字串。
    fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// 驗證載荷資料是否符合預期的規範。
    fn validate(&self) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 將電子郵件地址補上 `mailto:` 前綴，已是 URI 者保持不變。
pub fn contact_uri(contact: &str) -> String {
    if contact.contains(':') {
        contact.to_string()
    } else {
        format!("mailto:{}", contact)
    }
}

/// 建立或更新帳戶時送出的帳戶欄位。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Vec<String>>,
    #[serde(rename = "termsOfServiceAgreed", skip_serializing_if = "Option::is_none")]
    pub terms_of_service_agreed: Option<bool>,
    /// 舊版協議以服務條款 URL 表示同意。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement: Option<String>,
    /// 為 `true` 時伺服器不建立新帳戶，只回傳既有帳戶的位置。
    #[serde(rename = "onlyReturnExisting", skip_serializing_if = "Option::is_none")]
    pub only_return_existing: Option<bool>,
}

impl AccountPayload {
    /// 用於查詢既有帳戶位置的探測載荷。
    pub fn lookup() -> Self {
        Self {
            only_return_existing: Some(true),
            ..Default::default()
        }
    }
}

impl PayloadT for AccountPayload {
    /// 聯絡資訊若存在，不可包含空字串。
    fn validate(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if let Some(contact) = &self.contact {
            if contact.iter().any(|c| c.trim().is_empty()) {
                return Err("Contact entries cannot be empty".into());
            }
        }
        Ok(())
    }
}

/// 表示一個識別項，用來描述證書所涵蓋的主機名稱等資訊。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub type_: String,
    pub value: String,
}

impl Identifier {
    /// 建立類型為 `"dns"` 的識別項。
    pub fn dns(domain: &str) -> Self {
        Identifier {
            type_: "dns".to_string(),
            value: domain.to_string(),
        }
    }
}

/// 請求授權時的載荷。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuthorizationPayload {
    pub identifier: Identifier,
    /// 設為 `"require"` 時伺服器只回傳既有授權。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing: Option<String>,
}

impl NewAuthorizationPayload {
    pub fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            existing: None,
        }
    }

    /// 要求伺服器回傳既有的授權。
    pub fn existing_required(identifier: Identifier) -> Self {
        Self {
            identifier,
            existing: Some("require".to_string()),
        }
    }
}

impl PayloadT for NewAuthorizationPayload {
    fn validate(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.identifier.value.is_empty() {
            return Err("Identifier value cannot be empty".into());
        }
        Ok(())
    }
}

/// 回應 HTTP-01、DNS-01 等挑戰時送出的 key authorization。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeResponsePayload {
    #[serde(rename = "keyAuthorization")]
    pub key_authorization: String,
}

impl PayloadT for ChallengeResponsePayload {
    fn validate(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if !self.key_authorization.contains('.') {
            return Err("Key authorization must be token.thumbprint".into());
        }
        Ok(())
    }
}

/// 提交憑證訂單的載荷：CSR 與可選的有效期限。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPayload {
    /// DER 格式 CSR 的 Base64url 編碼
    pub csr: String,
    #[serde(rename = "notBefore", skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(rename = "notAfter", skip_serializing_if = "Option::is_none")]
    pub not_after: Option<DateTime<Utc>>,
}

impl OrderPayload {
    pub fn new(
        csr_der: &[u8],
        not_before: Option<DateTime<Utc>>,
        not_after: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            csr: Base64::new(csr_der).base64_url(),
            not_before,
            not_after,
        }
    }
}

impl PayloadT for OrderPayload {
    /// 驗證訂單載荷：
    ///
    /// - CSR 不可為空。
    /// - 同時指定時，`notBefore` 必須早於 `notAfter`。
    fn validate(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.csr.is_empty() {
            return Err("CSR cannot be empty".into());
        }
        if let (Some(not_before), Some(not_after)) = (self.not_before, self.not_after) {
            if not_before >= not_after {
                return Err("notBefore must be earlier than notAfter".into());
            }
        }
        Ok(())
    }
}

/// 金鑰更換內層信封的載荷。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyChangePayload {
    /// 帳戶 URL
    pub account: String,
    /// 目前的帳戶公鑰
    #[serde(rename = "oldKey")]
    pub old_key: Jwk,
}

impl PayloadT for KeyChangePayload {
    fn validate(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.account.is_empty() {
            return Err("Account URL is required".into());
        }
        Ok(())
    }
}
