use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    directory::{Directory, EndpointChoice},
    transport::{Transport, TransportError},
};

/// 表示在取得 Nonce 時可能發生的錯誤狀況。
#[derive(Error, Debug)]
pub enum NonceError {
    /// 探測請求失敗，或回應缺少 `Replay-Nonce` 標頭。
    #[error("Failed to obtain nonce: {0}")]
    Transport(#[from] TransportError),
}

/// 透過 HEAD 探測請求取得 `Replay-Nonce` 的實作。
pub struct Nonce<'a> {
    transport: &'a dyn Transport,
    url: String,
}

impl<'a> Nonce<'a> {
    /// 建立一個向指定 URL 探測的 `Nonce`。
    pub fn new(transport: &'a dyn Transport, url: impl Into<String>) -> Self {
        Nonce {
            transport,
            url: url.into(),
        }
    }

    /// 依目錄選擇探測目標：優先使用 `newNonce`，否則使用目錄本身的 URL。
    pub fn for_directory(transport: &'a dyn Transport, directory: &Directory) -> Self {
        let url = match directory.nonce_endpoint() {
            EndpointChoice::Primary(url) => url,
            EndpointChoice::Fallback(url) => {
                warn!(url, "directory has no newNonce endpoint, probing directory URL");
                url
            }
            EndpointChoice::Unsupported => directory.url.as_str(),
        };
        Self::new(transport, url)
    }

    /// 目前的探測目標。
    pub fn url(&self) -> &str {
        &self.url
    }

    /// 發出 HEAD 探測請求並讀取 `Replay-Nonce` 標頭。
    ///
    /// 每次呼叫都會取得新的 nonce，不會快取或共用。
    pub fn get(&self) -> Result<String, NonceError> {
        let response = self.transport.head(&self.url)?.error_for_status()?;
        let nonce = response.header("Replay-Nonce")?;
        debug!(url = %self.url, "obtained replay nonce");
        Ok(nonce)
    }
}
