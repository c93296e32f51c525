use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::{
    account::Account,
    certificate::Certificate,
    client::AcmeClient,
    csr::Csr,
    directory::{Directory, EndpointChoice},
    error::{AcmeError, Result},
    key_pair::KeyPair,
    payload::{OrderPayload, PayloadT},
};

/// 證書訂單：DER 編碼的 CSR 與可選的有效期限。
///
/// 訂單只提交一次，結果是解碼後的證書而不是可變的伺服器資源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// DER 編碼的 CSR
    pub csr: Vec<u8>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
}

impl Order {
    /// 以已編碼的 CSR 建立訂單。
    pub fn new(csr: Vec<u8>) -> Self {
        Order {
            csr,
            not_before: None,
            not_after: None,
        }
    }

    /// 以證書金鑰簽署 `csr` 並建立訂單。
    pub fn from_csr(csr: &Csr, cert_key: &KeyPair) -> Result<Self> {
        Ok(Self::new(csr.build_der(cert_key)?))
    }

    /// 設置證書生效時間。
    pub fn not_before(mut self, not_before: DateTime<Utc>) -> Self {
        self.not_before = Some(not_before);
        self
    }

    /// 設置證書到期時間。
    pub fn not_after(mut self, not_after: DateTime<Utc>) -> Self {
        self.not_after = Some(not_after);
        self
    }

    fn payload(&self) -> OrderPayload {
        OrderPayload::new(&self.csr, self.not_before, self.not_after)
    }
}

impl AcmeClient {
    /// 提交訂單並解碼伺服器回傳的 DER 證書。
    ///
    /// 優先使用 `newOrder` 端點，缺少時改用舊版的 `new-cert` 端點。
    /// 兩者期望的載荷未必相同，後者只是相容性的替代路徑。
    ///
    /// # 錯誤
    ///
    /// - 兩個端點都不存在時回傳 [`AcmeError::UnsupportedOperation`]，且不發出任何請求。
    /// - 回應無法解碼時回傳 [`AcmeError::Certificate`]，其中保留原始回應內容。
    pub fn submit_order(
        &self,
        order: &Order,
        account: &Account,
        directory: &Directory,
    ) -> Result<Certificate> {
        let url = match directory.order_endpoint() {
            EndpointChoice::Primary(url) => {
                debug!(url, "submitting order to newOrder");
                url
            }
            EndpointChoice::Fallback(url) => {
                warn!(url, "directory has no newOrder endpoint, using legacy new-cert");
                url
            }
            EndpointChoice::Unsupported => return Err(AcmeError::UnsupportedOperation("newOrder")),
        };

        let payload = order.payload();
        payload
            .validate()
            .map_err(|e| AcmeError::InvalidPayload(e.to_string()))?;

        let response = self.post_signed(
            directory,
            url,
            &payload,
            &account.key_pair,
            account.jwk_binding()?,
        )?;
        let certificate = Certificate::from_der(&response.body)?;

        info!(url, not_after = ?certificate.not_after().ok(), "certificate issued");
        Ok(certificate)
    }
}
