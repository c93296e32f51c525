use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tracing::debug;

use crate::{
    directory::Directory,
    error::Result,
    jws::{build_envelope, Jws},
    key_pair::KeyPair,
    nonce::Nonce,
    protection::KeyBinding,
    transport::{HttpResponse, HttpTransport, Transport, JOSE_JSON},
};

/// 執行 ACME 協議操作的客戶端。
///
/// 客戶端本身不保存任何協議狀態：目錄與帳戶都由呼叫者傳入，操作結果以新的值
/// 回傳。每個簽名請求都會先取得一個新的 nonce，nonce 不會被快取或在請求間共用，
/// 因此同一個客戶端可以在多個執行緒中同時使用。
#[derive(Clone)]
pub struct AcmeClient {
    transport: Arc<dyn Transport>,
}

impl AcmeClient {
    /// 預設的 User-Agent。
    pub const DEFAULT_USER_AGENT: &str = concat!("racme-client/", env!("CARGO_PKG_VERSION"));

    /// 使用預設設定建立客戶端。
    pub fn new() -> Result<Self> {
        AcmeClientBuilder::new().build()
    }

    /// 取得 [`AcmeClientBuilder`]。
    pub fn builder() -> AcmeClientBuilder {
        AcmeClientBuilder::new()
    }

    /// 使用自訂的傳輸層建立客戶端。
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// 取得並解析目錄，並記錄其來源 URL。
    ///
    /// 不進行重試，傳輸或解析錯誤直接回傳。
    pub fn fetch_directory(&self, url: &str) -> Result<Directory> {
        let response = self.transport.get(url)?.error_for_status()?;
        let directory = Directory::from_json(&response.body, url)?;
        debug!(url, "fetched directory");
        Ok(directory)
    }

    /// 為下一個簽名請求取得新的 nonce。
    pub fn obtain_nonce(&self, directory: &Directory) -> Result<String> {
        Ok(Nonce::for_directory(self.transport.as_ref(), directory).get()?)
    }

    /// 取得 nonce、建立信封並送出，是所有簽名請求的唯一路徑。
    pub(crate) fn post_signed<P: Serialize + ?Sized>(
        &self,
        directory: &Directory,
        url: &str,
        payload: &P,
        key_pair: &KeyPair,
        binding: KeyBinding,
    ) -> Result<HttpResponse> {
        let nonce = self.obtain_nonce(directory)?;
        let jws = build_envelope(url, payload, key_pair, Some(&nonce), binding)?;
        self.post_jws(url, &jws)
    }

    /// 送出已建立的信封，非 2xx 回應會轉換為錯誤。
    pub(crate) fn post_jws(&self, url: &str, jws: &Jws) -> Result<HttpResponse> {
        let body = jws.to_json()?.into_bytes();
        let response = self.transport.post(url, JOSE_JSON, body)?.error_for_status()?;
        debug!(url, status = %response.status, "signed request completed");
        Ok(response)
    }
}

/// 用於構建 [`AcmeClient`] 的構造器。
#[derive(Debug, Clone)]
pub struct AcmeClientBuilder {
    user_agent: String,
    timeout: Option<Duration>,
}

impl AcmeClientBuilder {
    /// 建立構造器，預設使用 [`AcmeClient::DEFAULT_USER_AGENT`] 且不設逾時。
    pub fn new() -> Self {
        Self {
            user_agent: AcmeClient::DEFAULT_USER_AGENT.to_string(),
            timeout: None,
        }
    }

    /// 設置 User-Agent。
    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// 設置單一請求的逾時。
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// 根據目前的配置建立 [`AcmeClient`]。
    pub fn build(self) -> Result<AcmeClient> {
        let transport = HttpTransport::new(&self.user_agent, self.timeout)?;
        Ok(AcmeClient::with_transport(Arc::new(transport)))
    }
}

impl Default for AcmeClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
