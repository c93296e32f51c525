use serde::{Deserialize, Serialize};

/// Let's Encrypt 正式環境的目錄 URL。
pub const LETS_ENCRYPT_DIRECTORY: &str = "https://acme-v02.api.letsencrypt.org/directory";

/// Let's Encrypt 測試環境的目錄 URL。
pub const LETS_ENCRYPT_STAGING_DIRECTORY: &str =
    "https://acme-staging-v02.api.letsencrypt.org/directory";

/// 伺服器公布的資源對照表。
///
/// 每個端點都可能不存在，缺少端點以 `None` 表示而非錯誤。欄位名稱同時接受
/// RFC 8555 的 camelCase 與舊版草案的連字號寫法。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Directory {
    #[serde(rename = "newNonce", alias = "new-nonce", skip_serializing_if = "Option::is_none")]
    pub new_nonce: Option<String>,
    #[serde(
        rename = "newAccount",
        alias = "new-account",
        alias = "new-reg",
        skip_serializing_if = "Option::is_none"
    )]
    pub new_account: Option<String>,
    #[serde(
        rename = "newOrder",
        alias = "new-order",
        alias = "new-app",
        skip_serializing_if = "Option::is_none"
    )]
    pub new_order: Option<String>,
    /// 舊版協議的憑證簽發端點。
    #[serde(rename = "new-cert", alias = "newCert", skip_serializing_if = "Option::is_none")]
    pub new_cert: Option<String>,
    #[serde(rename = "newAuthz", alias = "new-authz", skip_serializing_if = "Option::is_none")]
    pub new_authz: Option<String>,
    #[serde(rename = "keyChange", alias = "key-change", skip_serializing_if = "Option::is_none")]
    pub key_change: Option<String>,
    #[serde(rename = "revokeCert", alias = "revoke-cert", skip_serializing_if = "Option::is_none")]
    pub revoke_cert: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<DirectoryMeta>,
    /// 取得此目錄時所使用的 URL，由解析器在取得後填入。
    #[serde(skip)]
    pub url: String,
}

/// 目錄中的 `meta` 物件。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DirectoryMeta {
    #[serde(rename = "termsOfService", alias = "terms-of-service")]
    pub terms_of_service: Option<String>,
    pub website: Option<String>,
    #[serde(rename = "caaIdentities", default)]
    pub caa_identities: Vec<String>,
    #[serde(rename = "externalAccountRequired", default)]
    pub external_account_required: bool,
}

/// 端點選擇結果：首選端點、相容性替代端點，或不支援。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointChoice<'a> {
    Primary(&'a str),
    Fallback(&'a str),
    Unsupported,
}

impl<'a> EndpointChoice<'a> {
    /// 依序嘗試首選與替代端點。
    fn pick(primary: Option<&'a str>, fallback: Option<&'a str>) -> Self {
        match (primary, fallback) {
            (Some(url), _) => Self::Primary(url),
            (None, Some(url)) => Self::Fallback(url),
            (None, None) => Self::Unsupported,
        }
    }

    /// 取得選中的 URL。
    pub fn url(&self) -> Option<&'a str> {
        match *self {
            Self::Primary(url) | Self::Fallback(url) => Some(url),
            Self::Unsupported => None,
        }
    }
}

impl Directory {
    /// 從 JSON 解析目錄並記錄其來源 URL。
    pub fn from_json(body: &[u8], url: &str) -> serde_json::Result<Self> {
        let mut directory: Directory = serde_json::from_slice(body)?;
        directory.url = url.to_string();
        Ok(directory)
    }

    /// 取得 nonce 的端點；沒有專用端點時改用目錄本身的 URL。
    pub fn nonce_endpoint(&self) -> EndpointChoice<'_> {
        EndpointChoice::pick(self.new_nonce.as_deref(), Some(self.url.as_str()))
    }

    /// 提交訂單的端點；沒有 `newOrder` 時退回舊版的 `new-cert`。
    ///
    /// 兩者接受的負載不一定相同，替代路徑僅為相容性處理。
    pub fn order_endpoint(&self) -> EndpointChoice<'_> {
        EndpointChoice::pick(self.new_order.as_deref(), self.new_cert.as_deref())
    }

    /// 查詢帳戶位置的端點，沿用帳戶建立端點。
    pub fn account_lookup_endpoint(&self) -> EndpointChoice<'_> {
        EndpointChoice::pick(self.new_account.as_deref(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RFC_DIRECTORY: &str = r#"{
        "newNonce": "https://ca.test/acme/new-nonce",
        "newAccount": "https://ca.test/acme/new-acct",
        "newOrder": "https://ca.test/acme/new-order",
        "revokeCert": "https://ca.test/acme/revoke-cert",
        "keyChange": "https://ca.test/acme/key-change",
        "meta": {
            "termsOfService": "https://ca.test/terms.pdf",
            "caaIdentities": ["ca.test"]
        }
    }"#;

    const LEGACY_DIRECTORY: &str = r#"{
        "new-reg": "https://legacy.test/acme/new-reg",
        "new-authz": "https://legacy.test/acme/new-authz",
        "new-app": "https://legacy.test/acme/new-app",
        "new-cert": "https://legacy.test/acme/new-cert",
        "revoke-cert": "https://legacy.test/acme/revoke-cert"
    }"#;

    #[test]
    fn test_parse_rfc_directory() {
        let dir = Directory::from_json(RFC_DIRECTORY.as_bytes(), "https://ca.test/dir").unwrap();

        assert_eq!(dir.url, "https://ca.test/dir");
        assert_eq!(dir.new_account.as_deref(), Some("https://ca.test/acme/new-acct"));
        assert_eq!(dir.key_change.as_deref(), Some("https://ca.test/acme/key-change"));
        assert!(dir.new_authz.is_none());
        let meta = dir.meta.unwrap();
        assert_eq!(meta.terms_of_service.as_deref(), Some("https://ca.test/terms.pdf"));
        assert_eq!(meta.caa_identities, vec!["ca.test"]);
    }

    #[test]
    fn test_parse_legacy_directory() {
        let dir = Directory::from_json(LEGACY_DIRECTORY.as_bytes(), "https://legacy.test/dir").unwrap();

        assert_eq!(dir.new_account.as_deref(), Some("https://legacy.test/acme/new-reg"));
        assert_eq!(dir.new_authz.as_deref(), Some("https://legacy.test/acme/new-authz"));
        assert_eq!(dir.new_order.as_deref(), Some("https://legacy.test/acme/new-app"));
        assert_eq!(
            dir.order_endpoint(),
            EndpointChoice::Primary("https://legacy.test/acme/new-app")
        );
        assert!(dir.new_nonce.is_none());
        assert!(dir.key_change.is_none());
    }

    #[test]
    fn test_nonce_endpoint_falls_back_to_directory_url() {
        let dir = Directory::from_json(LEGACY_DIRECTORY.as_bytes(), "https://legacy.test/dir").unwrap();
        assert_eq!(
            dir.nonce_endpoint(),
            EndpointChoice::Fallback("https://legacy.test/dir")
        );

        let dir = Directory::from_json(RFC_DIRECTORY.as_bytes(), "https://ca.test/dir").unwrap();
        assert_eq!(
            dir.nonce_endpoint(),
            EndpointChoice::Primary("https://ca.test/acme/new-nonce")
        );
    }

    #[test]
    fn test_order_endpoint_prefers_new_order() {
        let mut dir = Directory {
            new_order: Some("https://ca.test/order".into()),
            new_cert: Some("https://ca.test/cert".into()),
            ..Default::default()
        };
        assert_eq!(dir.order_endpoint(), EndpointChoice::Primary("https://ca.test/order"));

        dir.new_order = None;
        assert_eq!(dir.order_endpoint(), EndpointChoice::Fallback("https://ca.test/cert"));

        dir.new_cert = None;
        assert_eq!(dir.order_endpoint(), EndpointChoice::Unsupported);
        assert_eq!(dir.order_endpoint().url(), None);
    }

    #[test]
    fn test_account_lookup_has_no_fallback() {
        let dir = Directory::default();
        assert_eq!(dir.account_lookup_endpoint(), EndpointChoice::Unsupported);
    }
}
