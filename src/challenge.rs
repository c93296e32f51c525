use std::fmt;

use openssl::sha::sha256;
use serde::Deserialize;

use crate::{
    account::Account,
    base64::Base64,
    error::{AcmeError, Result},
    payload::ChallengeResponsePayload,
    transport::Problem,
};

/// 表示 ACME 挑戰的類型。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum ChallengeType {
    Http01,
    Dns01,
    TlsAlpn01,
    /// 伺服器提供的其他類型，保留原始字串。
    Other(String),
}

impl ChallengeType {
    /// 返回挑戰類型對應的字串表示。
    pub fn as_str(&self) -> &str {
        match self {
            Self::Http01 => "http-01",
            Self::Dns01 => "dns-01",
            Self::TlsAlpn01 => "tls-alpn-01",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for ChallengeType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "http-01" => Self::Http01,
            "dns-01" => Self::Dns01,
            "tls-alpn-01" => Self::TlsAlpn01,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for ChallengeType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 表示 ACME 挑戰的狀態。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    Pending,
    Processing,
    Valid,
    Invalid,
    Deactivated,
    Expired,
    Revoked,
    #[serde(other)]
    Unknown,
}

impl ChallengeStatus {
    /// 判斷該狀態是否為終結狀態。
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Valid | Self::Invalid | Self::Deactivated | Self::Expired | Self::Revoked
        )
    }
}

/// 授權中的一個挑戰。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Challenge {
    #[serde(rename = "type")]
    pub challenge_type: ChallengeType,
    /// 挑戰本身的 URL，舊版協議使用 `uri`
    #[serde(alias = "uri")]
    pub url: String,
    pub status: ChallengeStatus,
    pub token: Option<String>,
    pub validated: Option<String>,
    pub error: Option<Problem>,
}

impl Challenge {
    /// 計算 key authorization：`token + "." + thumbprint`。
    ///
    /// # 錯誤
    ///
    /// 挑戰沒有 token 時回傳 [`AcmeError::MissingToken`]。
    pub fn key_authorization(&self, account: &Account) -> Result<String> {
        let token = self.token.as_deref().ok_or(AcmeError::MissingToken)?;
        let thumbprint = account.key_pair.thumbprint()?;
        Ok(format!("{}.{}", token, thumbprint))
    }

    /// 回應挑戰時使用的載荷。
    pub fn response_payload(&self, account: &Account) -> Result<ChallengeResponsePayload> {
        Ok(ChallengeResponsePayload {
            key_authorization: self.key_authorization(account)?,
        })
    }

    /// HTTP-01 驗證檔案的路徑，非 HTTP-01 或缺少 token 時回傳 `None`。
    pub fn http01_path(&self) -> Option<String> {
        match (&self.challenge_type, &self.token) {
            (ChallengeType::Http01, Some(token)) => {
                Some(format!("/.well-known/acme-challenge/{}", token))
            }
            _ => None,
        }
    }

    /// DNS-01 的 TXT 記錄值：key authorization 的 SHA-256 以 Base64url 編碼。
    pub fn dns01_txt_value(&self, account: &Account) -> Result<String> {
        let digest = sha256(self.key_authorization(account)?.as_bytes());
        Ok(Base64::new(digest).base64_url())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::key_pair::{KeyAlgorithm, KeyPair};

    fn challenge(value: serde_json::Value) -> Challenge {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_challenge() {
        let c = challenge(json!({
            "type": "http-01",
            "url": "https://ca.test/chall/1",
            "status": "pending",
            "token": "tok"
        }));
        assert_eq!(c.challenge_type, ChallengeType::Http01);
        assert_eq!(c.status, ChallengeStatus::Pending);
        assert_eq!(c.http01_path().as_deref(), Some("/.well-known/acme-challenge/tok"));
    }

    #[test]
    fn test_parse_legacy_and_unknown_fields() {
        let c = challenge(json!({
            "type": "tls-sni-01",
            "uri": "https://legacy.test/chall/2",
            "status": "something-new"
        }));
        assert_eq!(c.challenge_type, ChallengeType::Other("tls-sni-01".into()));
        assert_eq!(c.url, "https://legacy.test/chall/2");
        assert_eq!(c.status, ChallengeStatus::Unknown);
        assert!(c.token.is_none());
    }

    #[test]
    fn test_terminal_statuses() {
        use ChallengeStatus::*;

        for status in [Valid, Invalid, Deactivated, Expired, Revoked] {
            assert!(status.is_terminal(), "{status:?}");
        }
        for status in [Pending, Processing, Unknown] {
            assert!(!status.is_terminal(), "{status:?}");
        }
    }

    #[test]
    fn test_key_authorization() {
        let account = Account::new(KeyPair::generate(KeyAlgorithm::EcP256).unwrap());
        let c = challenge(json!({
            "type": "dns-01",
            "url": "https://ca.test/chall/3",
            "status": "pending",
            "token": "abc"
        }));

        let thumbprint = account.key_pair.thumbprint().unwrap();
        assert_eq!(c.key_authorization(&account).unwrap(), format!("abc.{}", thumbprint));
        assert_eq!(c.dns01_txt_value(&account).unwrap().len(), 43);
        assert!(c.http01_path().is_none());
    }

    #[test]
    fn test_key_authorization_without_token() {
        let account = Account::new(KeyPair::generate(KeyAlgorithm::EcP256).unwrap());
        let c = challenge(json!({
            "type": "http-01",
            "url": "https://ca.test/chall/4",
            "status": "pending"
        }));

        let err = c.key_authorization(&account).unwrap_err();
        assert!(matches!(err, AcmeError::MissingToken));
    }
}
