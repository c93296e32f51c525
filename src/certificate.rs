use chrono::{DateTime, Duration, Utc};
use openssl::{asn1::Asn1Time, error::ErrorStack, x509::X509};
use thiserror::Error;

/// 證書相關操作可能出現的錯誤類型
#[derive(Debug, Error)]
pub enum CertificateError {
    /// DER 解碼失敗，保留原始位元組以便診斷。
    #[error("Failed to decode certificate ({} bytes): {source}", .der.len())]
    Decode { source: ErrorStack, der: Vec<u8> },
    #[error("OpenSSL error: {0}")]
    OpenSSL(#[from] ErrorStack),
    #[error("Invalid expiration timestamp")]
    InvalidTimestamp,
}

type Result<T> = std::result::Result<T, CertificateError>;

/// X.509 證書封裝結構
#[derive(Debug, Clone)]
pub struct Certificate {
    pub cert: X509,
}

impl Certificate {
    /// 從 DER 位元組解析證書。
    ///
    /// # 錯誤
    ///
    /// 解析失敗時回傳 [`CertificateError::Decode`]，其中包含無法解析的原始資料。
    pub fn from_der(der: &[u8]) -> Result<Self> {
        match X509::from_der(der) {
            Ok(cert) => Ok(Certificate { cert }),
            Err(source) => Err(CertificateError::Decode {
                source,
                der: der.to_vec(),
            }),
        }
    }

    /// 從 PEM 字串解析證書。
    pub fn from_pem(pem: &str) -> Result<Self> {
        Ok(Certificate {
            cert: X509::from_pem(pem.as_bytes())?,
        })
    }

    /// 匯出 PEM 格式。
    pub fn to_pem(&self) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.cert.to_pem()?).into_owned())
    }

    /// 匯出 DER 格式。
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.cert.to_der()?)
    }

    /// 證書的到期時間。
    pub fn not_after(&self) -> Result<DateTime<Utc>> {
        let epoch = Asn1Time::from_unix(0)?;
        let diff = epoch.diff(self.cert.not_after())?;
        let seconds = diff.days as i64 * 86400 + diff.secs as i64;
        DateTime::from_timestamp(seconds, 0).ok_or(CertificateError::InvalidTimestamp)
    }

    /// 判斷證書是否應該進行續約
    ///
    /// 剩餘有效時間少於 `threshold_days` 天（或已過期）時回傳 `true`。
    pub fn should_renew(&self, threshold_days: u32) -> Result<bool> {
        let remaining = self.not_after()? - Utc::now();
        Ok(remaining < Duration::days(threshold_days as i64))
    }
}
