//! ACME 帳戶：註冊、定位、更新與金鑰更換。
//!
//! 帳戶的身分是其金鑰對。伺服器分配的帳戶 URL 不保存在 [`Account`] 中，
//! 需要時透過 [`AcmeClient::locate`] 取得，並在同一次流程內明確傳遞。

use serde::Deserialize;
use tracing::info;

use crate::{
    client::AcmeClient,
    directory::{Directory, EndpointChoice},
    error::{AcmeError, Result},
    jws::build_envelope,
    key_pair::{KeyAlgorithm, KeyPair},
    payload::{contact_uri, AccountPayload, KeyChangePayload, PayloadT},
    protection::KeyBinding,
};

/// 帳戶狀態。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Valid,
    Deactivated,
    Revoked,
}

/// 表示 ACME 帳戶。
#[derive(Debug, Clone)]
pub struct Account {
    /// 帳戶使用的密鑰對。
    pub key_pair: KeyPair,
    /// 聯絡方式，例如 `mailto:` URI。
    pub contact: Option<Vec<String>>,
    /// 伺服器回報的帳戶狀態。
    pub status: Option<AccountStatus>,
    /// 是否同意服務條款。
    pub terms_of_service_agreed: Option<bool>,
    /// 此帳戶訂單列表的 URL。
    pub orders: Option<String>,
    /// 舊版協議所同意的服務條款 URL。
    pub agreement: Option<String>,
}

/// 伺服器回傳的帳戶資源，所有欄位皆為可選。
#[derive(Debug, Default, Deserialize)]
struct AccountResource {
    status: Option<AccountStatus>,
    contact: Option<Vec<String>>,
    #[serde(rename = "termsOfServiceAgreed")]
    terms_of_service_agreed: Option<bool>,
    orders: Option<String>,
    agreement: Option<String>,
}

impl AccountResource {
    /// 解析回應本文，空本文視為沒有任何欄位。
    fn from_body(body: &[u8]) -> serde_json::Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
    }
}

impl Account {
    /// 以既有金鑰建立尚未註冊的帳戶。
    pub fn new(key_pair: KeyPair) -> Self {
        Self {
            key_pair,
            contact: None,
            status: None,
            terms_of_service_agreed: None,
            orders: None,
            agreement: None,
        }
    }

    /// 取得 [`AccountBuilder`]。
    pub fn builder() -> AccountBuilder {
        AccountBuilder::new()
    }

    /// 合併伺服器回傳的欄位，產生新的帳戶值；伺服器未提供的欄位保留原值。
    fn merge(mut self, resource: AccountResource) -> Self {
        self.status = resource.status.or(self.status);
        self.contact = resource.contact.or(self.contact);
        self.terms_of_service_agreed = resource
            .terms_of_service_agreed
            .or(self.terms_of_service_agreed);
        self.orders = resource.orders.or(self.orders);
        self.agreement = resource.agreement.or(self.agreement);
        self
    }

    /// 建立或更新帳戶時送出的欄位。
    fn payload(&self) -> Result<AccountPayload> {
        let payload = AccountPayload {
            contact: self.contact.clone(),
            terms_of_service_agreed: self.terms_of_service_agreed,
            agreement: self.agreement.clone(),
            only_return_existing: None,
        };
        payload
            .validate()
            .map_err(|e| AcmeError::InvalidPayload(e.to_string()))?;
        Ok(payload)
    }

    pub(crate) fn jwk_binding(&self) -> Result<KeyBinding> {
        Ok(KeyBinding::Jwk(self.key_pair.jwk()?))
    }
}

impl AcmeClient {
    /// 透過目錄的帳戶建立端點註冊帳戶，回傳填入伺服器欄位的新帳戶。
    ///
    /// # 錯誤
    ///
    /// 目錄沒有帳戶建立端點時回傳 [`AcmeError::UnsupportedOperation`]。
    pub fn register(&self, account: &Account, directory: &Directory) -> Result<Account> {
        let url = directory
            .new_account
            .as_deref()
            .ok_or(AcmeError::UnsupportedOperation("newAccount"))?;

        let response = self.post_signed(
            directory,
            url,
            &account.payload()?,
            &account.key_pair,
            account.jwk_binding()?,
        )?;
        let registered = account
            .clone()
            .merge(AccountResource::from_body(&response.body)?);

        info!(status = ?registered.status, "account registered");
        Ok(registered)
    }

    /// 取得帳戶的資源 URL。
    ///
    /// 向帳戶建立端點送出只查詢既有帳戶的探測請求，並讀取回應的 `Location` 標頭。
    pub fn locate(&self, account: &Account, directory: &Directory) -> Result<String> {
        let url = match directory.account_lookup_endpoint() {
            EndpointChoice::Primary(url) | EndpointChoice::Fallback(url) => url,
            EndpointChoice::Unsupported => {
                return Err(AcmeError::UnsupportedOperation("newAccount"))
            }
        };

        let response = self.post_signed(
            directory,
            url,
            &AccountPayload::lookup(),
            &account.key_pair,
            account.jwk_binding()?,
        )?;
        let location = response.header("Location")?;

        info!(location = %location, "account located");
        Ok(location)
    }

    /// 更新帳戶欄位：先定位帳戶，再將新欄位送往帳戶 URL。
    pub fn update(&self, account: &Account, directory: &Directory) -> Result<Account> {
        let location = self.locate(account, directory)?;

        let response = self.post_signed(
            directory,
            &location,
            &account.payload()?,
            &account.key_pair,
            KeyBinding::Kid(location.clone()),
        )?;
        let updated = account
            .clone()
            .merge(AccountResource::from_body(&response.body)?);

        info!(location = %location, "account updated");
        Ok(updated)
    }

    /// 將帳戶金鑰從 `current` 更換為 `new_account` 的金鑰。
    ///
    /// 內層信封由新金鑰簽名，載有帳戶 URL 與舊公鑰；外層信封以內層信封為負載，
    /// 由目前的金鑰簽名後送往 `keyChange` 端點。
    ///
    /// 回傳的帳戶保留 `current` 的欄位，只替換金鑰對。
    ///
    /// # 錯誤
    ///
    /// 目錄沒有 `keyChange` 端點時回傳 [`AcmeError::UnsupportedOperation`]，
    /// 且不發出任何請求。
    pub fn key_rollover(
        &self,
        current: &Account,
        new_account: &Account,
        directory: &Directory,
    ) -> Result<Account> {
        let key_change = directory
            .key_change
            .as_deref()
            .ok_or(AcmeError::UnsupportedOperation("keyChange"))?;

        let location = self.locate(current, directory)?;

        let change = KeyChangePayload {
            account: location.clone(),
            old_key: current.key_pair.jwk()?,
        };
        change
            .validate()
            .map_err(|e| AcmeError::InvalidPayload(e.to_string()))?;
        let inner = build_envelope(
            key_change,
            &change,
            &new_account.key_pair,
            None,
            new_account.jwk_binding()?,
        )?;

        let response = self.post_signed(
            directory,
            key_change,
            &inner,
            &current.key_pair,
            KeyBinding::Kid(location.clone()),
        )?;
        let rolled = Account {
            key_pair: new_account.key_pair.clone(),
            ..current.clone()
        }
        .merge(AccountResource::from_body(&response.body)?);

        info!(location = %location, "account key rolled over");
        Ok(rolled)
    }
}

/// 用於構建 [`Account`] 的構造器。
///
/// 預設使用 2048 位元 RSA 金鑰，不附聯絡方式，也不同意服務條款。
#[derive(Debug, Clone, Default)]
pub struct AccountBuilder {
    contact: Vec<String>,
    key_alg: KeyAlgorithm,
    terms_of_service_agreed: bool,
    agreement: Option<String>,
}

impl AccountBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新增聯絡方式，純電子郵件地址會自動補上 `mailto:`。
    pub fn contact(mut self, contact: &str) -> Self {
        self.contact.push(contact_uri(contact));
        self
    }

    /// 設置密鑰演算法。
    pub fn key_algorithm(mut self, alg: KeyAlgorithm) -> Self {
        self.key_alg = alg;
        self
    }

    /// 同意服務條款。
    pub fn agree_to_terms(mut self) -> Self {
        self.terms_of_service_agreed = true;
        self
    }

    /// 設置舊版協議的服務條款 URL。
    pub fn agreement(mut self, url: &str) -> Self {
        self.agreement = Some(url.to_string());
        self
    }

    /// 產生金鑰並建立 [`Account`]。
    pub fn build(self) -> Result<Account> {
        let mut account = Account::new(KeyPair::generate(self.key_alg)?);
        if !self.contact.is_empty() {
            account.contact = Some(self.contact);
        }
        if self.terms_of_service_agreed {
            account.terms_of_service_agreed = Some(true);
        }
        account.agreement = self.agreement;
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};

    use super::*;
    use crate::{
        error::ErrorKind,
        jws::Jws,
        transport::{HttpResponse, Method, MockTransport},
    };

    const ACCOUNT_URL: &str = "https://ca.test/acme/acct/42";

    fn directory() -> Directory {
        Directory {
            new_nonce: Some("https://ca.test/acme/new-nonce".into()),
            new_account: Some("https://ca.test/acme/new-acct".into()),
            key_change: Some("https://ca.test/acme/key-change".into()),
            url: "https://ca.test/dir".into(),
            ..Default::default()
        }
    }

    fn account() -> Account {
        Account::builder()
            .contact("admin@example.com")
            .key_algorithm(KeyAlgorithm::EcP256)
            .agree_to_terms()
            .build()
            .unwrap()
    }

    fn nonce(value: &str) -> HttpResponse {
        HttpResponse::new(200, "").with_header("Replay-Nonce", value)
    }

    fn posted(transport: &MockTransport, index: usize) -> Jws {
        let request = transport.requests().swap_remove(index);
        assert_eq!(request.method, Method::Post);
        serde_json::from_slice(&request.body).unwrap()
    }

    #[test]
    fn test_builder() {
        let account = account();
        assert_eq!(account.contact, Some(vec!["mailto:admin@example.com".to_string()]));
        assert_eq!(account.terms_of_service_agreed, Some(true));
        assert_eq!(account.key_pair.alg, KeyAlgorithm::EcP256);
    }

    #[test]
    fn test_register() {
        let transport = Arc::new(MockTransport::new());
        transport.push(nonce("n1"));
        transport.push(
            HttpResponse::new(201, r#"{"status":"valid","orders":"https://ca.test/acme/acct/42/orders"}"#)
                .with_header("Location", ACCOUNT_URL),
        );
        let client = AcmeClient::with_transport(transport.clone());
        let account = account();

        let registered = client.register(&account, &directory()).unwrap();

        assert_eq!(registered.status, Some(AccountStatus::Valid));
        assert_eq!(registered.orders.as_deref(), Some("https://ca.test/acme/acct/42/orders"));
        assert_eq!(registered.contact, account.contact);

        let jws = posted(&transport, 1);
        let header = jws.protected_header().unwrap();
        assert_eq!(header.nonce.as_deref(), Some("n1"));
        assert_eq!(header.url, "https://ca.test/acme/new-acct");
        assert_eq!(header.jwk, Some(account.key_pair.jwk().unwrap()));
        assert!(jws.verify(&account.key_pair).unwrap());

        let payload: Value = jws.payload().unwrap();
        assert_eq!(payload["termsOfServiceAgreed"], true);
        assert_eq!(payload["contact"], json!(["mailto:admin@example.com"]));
    }

    #[test]
    fn test_register_without_endpoint() {
        let transport = Arc::new(MockTransport::new());
        let client = AcmeClient::with_transport(transport.clone());
        let directory = Directory {
            url: "https://ca.test/dir".into(),
            ..Default::default()
        };

        let err = client.register(&account(), &directory).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_locate_reads_location() {
        let transport = Arc::new(MockTransport::new());
        transport.push(nonce("n1"));
        transport.push(HttpResponse::new(200, "{}").with_header("location", ACCOUNT_URL));
        let client = AcmeClient::with_transport(transport.clone());

        let location = client.locate(&account(), &directory()).unwrap();

        assert_eq!(location, ACCOUNT_URL);
        let payload: Value = posted(&transport, 1).payload().unwrap();
        assert_eq!(payload, json!({"onlyReturnExisting": true}));
    }

    #[test]
    fn test_locate_without_location_header() {
        let transport = Arc::new(MockTransport::new());
        transport.push(nonce("n1"));
        transport.push(HttpResponse::new(200, "{}"));
        let client = AcmeClient::with_transport(transport);

        let err = client.locate(&account(), &directory()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_update_posts_to_account_url() {
        let transport = Arc::new(MockTransport::new());
        transport.push(nonce("n1"));
        transport.push(HttpResponse::new(200, "").with_header("Location", ACCOUNT_URL));
        transport.push(nonce("n2"));
        transport.push(HttpResponse::new(
            200,
            r#"{"status":"valid","contact":["mailto:new@example.com"]}"#,
        ));
        let client = AcmeClient::with_transport(transport.clone());

        let mut account = account();
        account.contact = Some(vec!["mailto:new@example.com".into()]);
        let updated = client.update(&account, &directory()).unwrap();

        assert_eq!(updated.contact, Some(vec!["mailto:new@example.com".to_string()]));
        assert_eq!(transport.requests()[3].url, ACCOUNT_URL);

        let header = posted(&transport, 3).protected_header().unwrap();
        assert_eq!(header.kid.as_deref(), Some(ACCOUNT_URL));
        assert_eq!(header.nonce.as_deref(), Some("n2"));
        assert!(header.jwk.is_none());
    }

    #[test]
    fn test_key_rollover_without_endpoint_issues_no_request() {
        let transport = Arc::new(MockTransport::new());
        let client = AcmeClient::with_transport(transport.clone());
        let mut directory = directory();
        directory.key_change = None;

        let err = client
            .key_rollover(&account(), &account(), &directory)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_key_rollover_nesting() {
        let transport = Arc::new(MockTransport::new());
        transport.push(nonce("n1"));
        transport.push(HttpResponse::new(200, "").with_header("Location", ACCOUNT_URL));
        transport.push(nonce("n2"));
        transport.push(HttpResponse::new(200, r#"{"status":"valid"}"#));
        let client = AcmeClient::with_transport(transport.clone());
        let current = account();
        let new_account = Account::new(KeyPair::generate(KeyAlgorithm::EcP256).unwrap());

        let rolled = client
            .key_rollover(&current, &new_account, &directory())
            .unwrap();

        assert_eq!(rolled.key_pair.thumbprint().unwrap(), new_account.key_pair.thumbprint().unwrap());
        assert_eq!(rolled.status, Some(AccountStatus::Valid));
        assert_eq!(transport.requests()[3].url, "https://ca.test/acme/key-change");

        // 外層：目前金鑰簽名，以帳戶 URL 為 kid，帶有新的 nonce
        let outer = posted(&transport, 3);
        assert!(outer.verify(&current.key_pair).unwrap());
        assert!(!outer.verify(&new_account.key_pair).unwrap());
        let outer_header = outer.protected_header().unwrap();
        assert_eq!(outer_header.kid.as_deref(), Some(ACCOUNT_URL));
        assert_eq!(outer_header.nonce.as_deref(), Some("n2"));
        assert_eq!(outer_header.url, "https://ca.test/acme/key-change");

        // 內層：新金鑰簽名，嵌入新公鑰，載有帳戶 URL 與舊公鑰
        let inner: Jws = outer.payload().unwrap();
        assert!(inner.verify(&new_account.key_pair).unwrap());
        assert!(!inner.verify(&current.key_pair).unwrap());
        let inner_header = inner.protected_header().unwrap();
        assert_eq!(inner_header.jwk, Some(new_account.key_pair.jwk().unwrap()));
        assert_eq!(inner_header.url, "https://ca.test/acme/key-change");
        assert!(inner_header.nonce.is_none());

        let change: KeyChangePayload = inner.payload().unwrap();
        assert_eq!(change.account, ACCOUNT_URL);
        assert_eq!(change.old_key, current.key_pair.jwk().unwrap());
    }

    #[test]
    fn test_key_rollover_keeps_account_fields() {
        let transport = Arc::new(MockTransport::new());
        transport.push(nonce("n1"));
        transport.push(HttpResponse::new(200, "").with_header("Location", ACCOUNT_URL));
        transport.push(nonce("n2"));
        transport.push(HttpResponse::new(200, ""));
        let client = AcmeClient::with_transport(transport);
        let current = account();
        let new_account = Account::new(KeyPair::generate(KeyAlgorithm::EcP256).unwrap());

        let rolled = client
            .key_rollover(&current, &new_account, &directory())
            .unwrap();

        assert_eq!(rolled.key_pair.thumbprint().unwrap(), new_account.key_pair.thumbprint().unwrap());
        assert_eq!(rolled.contact, Some(vec!["mailto:admin@example.com".to_string()]));
        assert_eq!(rolled.terms_of_service_agreed, Some(true));
        assert_eq!(rolled.agreement, current.agreement);
    }

    #[test]
    fn test_key_rollover_reports_failed_location_step() {
        let transport = Arc::new(MockTransport::new());
        transport.push(nonce("n1"));
        transport.push(HttpResponse::new(400, "bad request"));
        let client = AcmeClient::with_transport(transport.clone());

        let err = client
            .key_rollover(&account(), &account(), &directory())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(transport.requests().len(), 2);
    }
}
