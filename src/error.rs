use thiserror::Error;

use crate::{
    certificate::CertificateError,
    csr::CsrError,
    jws::JwsError,
    key_pair::KeyError,
    nonce::NonceError,
    transport::TransportError,
};

/// 協議流程中所有錯誤的分類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 目錄缺少所需的端點。
    UnsupportedOperation,
    /// 信封建構失敗。
    Signing,
    /// 網路或 HTTP 層失敗，包括缺少預期的標頭。
    Transport,
    /// 伺服器回傳的內容無法解讀。
    ProtocolViolation,
    /// 找不到預期存在的項目。
    NotFound,
}

/// ACME 協議操作的錯誤類型。
#[derive(Debug, Error)]
pub enum AcmeError {
    #[error("Operation not supported: directory has no {0} endpoint")]
    UnsupportedOperation(&'static str),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("JWS error: {0}")]
    Jws(#[from] JwsError),
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
    #[error("CSR error: {0}")]
    Csr(#[from] CsrError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Nonce error: {0}")]
    Nonce(#[from] NonceError),
    #[error("Unexpected response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
    #[error("Certificate error: {0}")]
    Certificate(#[from] CertificateError),
    #[error("No matching challenge: no pending {0} challenge")]
    NoMatchingChallenge(String),
    #[error("Challenge has no token")]
    MissingToken,
}

impl AcmeError {
    /// 取得錯誤分類。
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedOperation(_) => ErrorKind::UnsupportedOperation,
            Self::InvalidPayload(_) | Self::Jws(_) | Self::Key(_) | Self::Csr(_) => {
                ErrorKind::Signing
            }
            Self::Transport(_) | Self::Nonce(_) => ErrorKind::Transport,
            Self::InvalidResponse(_) | Self::Certificate(_) => ErrorKind::ProtocolViolation,
            Self::NoMatchingChallenge(_) | Self::MissingToken => ErrorKind::NotFound,
        }
    }
}

/// 結果類型，錯誤為 [`AcmeError`]。
pub type Result<T> = std::result::Result<T, AcmeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            AcmeError::UnsupportedOperation("keyChange").kind(),
            ErrorKind::UnsupportedOperation
        );
        assert_eq!(
            AcmeError::Transport(TransportError::MissingHeader("Location")).kind(),
            ErrorKind::Transport
        );
        assert_eq!(AcmeError::MissingToken.kind(), ErrorKind::NotFound);
        assert_eq!(
            AcmeError::NoMatchingChallenge("http-01".into()).to_string(),
            "No matching challenge: no pending http-01 challenge"
        );
    }
}
