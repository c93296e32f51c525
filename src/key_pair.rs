use openssl::{
    bn::BigNumContext,
    ec::{EcGroup, EcKey},
    error::ErrorStack,
    nid::Nid,
    pkey::{Id, PKey, Private, Public},
    rsa::Rsa,
    sha::sha256,
};
use thiserror::Error;

use crate::{
    base64::Base64,
    jwk::{Jwk, JwkError},
};

/// 鍵相關操作的錯誤列舉。
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("OpenSSL error: {0}")]
    OpenSSL(#[from] ErrorStack),
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Unsupported key size: {0}")]
    UnsupportedKeySize(u32),
    #[error("JWK error: {0}")]
    JwkError(#[from] JwkError),
}

type Result<T> = std::result::Result<T, KeyError>;

/// 帳戶或憑證金鑰可使用的演算法。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    /// RSA 金鑰，簽名使用 RS256。
    Rsa { bits: u32 },
    /// NIST P-256 橢圓曲線金鑰，簽名使用 ES256。
    EcP256,
}

impl Default for KeyAlgorithm {
    fn default() -> Self {
        Self::Rsa { bits: 2048 }
    }
}

impl KeyAlgorithm {
    /// 對應的 JWS `alg` 值。
    pub fn jws_alg(&self) -> &'static str {
        match self {
            Self::Rsa { .. } => "RS256",
            Self::EcP256 => "ES256",
        }
    }
}

/// 表示一組非對稱加密的金鑰對。
///
/// ACME 帳戶的身分即為此金鑰對，伺服器分配的帳戶 URL 不保存在這裡。
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub alg: KeyAlgorithm,
    pub pri_key: PKey<Private>,
    pub pub_key: PKey<Public>,
}

impl KeyPair {
    /// 依指定演算法產生新的金鑰對。
    ///
    /// RSA 金鑰長度必須介於 2048 與 8192 位元之間。
    pub fn generate(alg: KeyAlgorithm) -> Result<Self> {
        let pri_key = match alg {
            KeyAlgorithm::Rsa { bits } => {
                if !(2048..=8192).contains(&bits) {
                    return Err(KeyError::UnsupportedKeySize(bits));
                }
                PKey::from_rsa(Rsa::generate(bits)?)?
            }
            KeyAlgorithm::EcP256 => {
                let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1)?;
                PKey::from_ec_key(EcKey::generate(&group)?)?
            }
        };
        Self::from_private_key(pri_key)
    }

    /// 根據 PEM 格式的私鑰資料建立金鑰對，演算法由金鑰本身推斷。
    pub fn from_pem(pri_key_pem: &[u8]) -> Result<Self> {
        Self::from_private_key(PKey::private_key_from_pem(pri_key_pem)?)
    }

    /// 將私鑰匯出為 PKCS#8 PEM。持久化由呼叫者負責。
    pub fn to_pem(&self) -> Result<Vec<u8>> {
        Ok(self.pri_key.private_key_to_pem_pkcs8()?)
    }

    fn from_private_key(pri_key: PKey<Private>) -> Result<Self> {
        let (alg, pub_key) = match pri_key.id() {
            Id::RSA => {
                let rsa = pri_key.rsa()?;
                let bits = rsa.size() * 8;
                let pub_rsa =
                    Rsa::from_public_components(rsa.n().to_owned()?, rsa.e().to_owned()?)?;
                (KeyAlgorithm::Rsa { bits }, PKey::from_rsa(pub_rsa)?)
            }
            Id::EC => {
                let ec = pri_key.ec_key()?;
                if ec.group().curve_name() != Some(Nid::X9_62_PRIME256V1) {
                    return Err(KeyError::UnsupportedAlgorithm("EC curve".to_string()));
                }
                let pub_ec = EcKey::from_public_key(ec.group(), ec.public_key())?;
                (KeyAlgorithm::EcP256, PKey::from_ec_key(pub_ec)?)
            }
            other => return Err(KeyError::UnsupportedAlgorithm(format!("{other:?}"))),
        };

        Ok(Self {
            alg,
            pri_key,
            pub_key,
        })
    }

    /// 取得公鑰的 JWK 表示。
    pub fn jwk(&self) -> Result<Jwk> {
        Ok(Jwk::new(self)?)
    }

    /// 計算 RFC 7638 縮影（thumbprint），以 URL 安全 Base64 字串回傳。
    pub fn thumbprint(&self) -> Result<String> {
        let hash = sha256(self.jwk()?.to_acme_json()?.as_bytes());
        Ok(Base64::new(hash).base64_url())
    }

    /// 取得 EC 公鑰的仿射座標 (x, y)，各為 32 位元組。
    pub(crate) fn ec_coordinates(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        let ec = self.pub_key.ec_key()?;
        let mut ctx = BigNumContext::new()?;
        let mut x = openssl::bn::BigNum::new()?;
        let mut y = openssl::bn::BigNum::new()?;
        ec.public_key()
            .affine_coordinates(ec.group(), &mut x, &mut y, &mut ctx)?;
        Ok((x.to_vec_padded(32)?, y.to_vec_padded(32)?))
    }
}
