use openssl::{
    bn::BigNum,
    ecdsa::EcdsaSig,
    hash::{hash, MessageDigest},
    sign::{Signer, Verifier},
};
use thiserror::Error;

use crate::{
    base64::Base64,
    key_pair::{KeyAlgorithm, KeyPair},
};

/// 簽名操作可能遇到的錯誤類型。
#[derive(Debug, Error)]
pub enum SignatureError {
    /// 簽名或驗證過程中發生錯誤。
    #[error("Signing error: {0}")]
    SigningError(#[from] openssl::error::ErrorStack),
    /// ES256 簽名長度不是 64 位元組。
    #[error("Malformed signature of {0} bytes")]
    MalformedSignature(usize),
}

type Result<T> = std::result::Result<T, SignatureError>;

/// 簽名演算法的介面。
trait SignatureAlgorithmT {
    /// 使用私鑰對資料進行簽名，回傳 JWS 格式的簽名位元組。
    fn sign(&self, data: &[u8], key_pair: &KeyPair) -> Result<Vec<u8>>;

    /// 使用公鑰驗證 JWS 格式的簽名。
    fn verify(&self, data: &[u8], signature: &[u8], key_pair: &KeyPair) -> Result<bool>;
}

/// RS256：RSASSA-PKCS1-v1_5 搭配 SHA-256。
struct Rs256;

impl SignatureAlgorithmT for Rs256 {
    fn sign(&self, data: &[u8], key_pair: &KeyPair) -> Result<Vec<u8>> {
        let mut signer = Signer::new(MessageDigest::sha256(), &key_pair.pri_key)?;
        signer.update(data)?;
        Ok(signer.sign_to_vec()?)
    }

    fn verify(&self, data: &[u8], signature: &[u8], key_pair: &KeyPair) -> Result<bool> {
        let mut verifier = Verifier::new(MessageDigest::sha256(), &key_pair.pub_key)?;
        verifier.update(data)?;
        Ok(verifier.verify(signature)?)
    }
}

/// ES256：P-256 ECDSA 搭配 SHA-256。
///
/// JWS 要求簽名為固定寬度的 `r || s`，而非 OpenSSL 產生的 DER 結構。
struct Es256;

impl Es256 {
    const COMPONENT_LEN: i32 = 32;
}

impl SignatureAlgorithmT for Es256 {
    fn sign(&self, data: &[u8], key_pair: &KeyPair) -> Result<Vec<u8>> {
        let digest = hash(MessageDigest::sha256(), data)?;
        let ec = key_pair.pri_key.ec_key()?;
        let sig = EcdsaSig::sign(&digest, &ec)?;

        let mut raw = sig.r().to_vec_padded(Self::COMPONENT_LEN)?;
        raw.extend(sig.s().to_vec_padded(Self::COMPONENT_LEN)?);
        Ok(raw)
    }

    fn verify(&self, data: &[u8], signature: &[u8], key_pair: &KeyPair) -> Result<bool> {
        if signature.len() != 2 * Self::COMPONENT_LEN as usize {
            return Err(SignatureError::MalformedSignature(signature.len()));
        }
        let (r, s) = signature.split_at(Self::COMPONENT_LEN as usize);
        let sig = EcdsaSig::from_private_components(BigNum::from_slice(r)?, BigNum::from_slice(s)?)?;

        let digest = hash(MessageDigest::sha256(), data)?;
        let ec = key_pair.pub_key.ec_key()?;
        Ok(sig.verify(&digest, &ec)?)
    }
}

/// 根據金鑰演算法取得對應的簽名實作。
fn algorithm_for(key_pair: &KeyPair) -> Box<dyn SignatureAlgorithmT> {
    match key_pair.alg {
        KeyAlgorithm::Rsa { .. } => Box::new(Rs256),
        KeyAlgorithm::EcP256 => Box::new(Es256),
    }
}

/// 以 `header.payload` 作為簽名輸入產生簽名。
///
/// # 參數
///
/// - `header_b64`: 已編碼的保護標頭。
/// - `payload_b64`: 已編碼的負載，可以為空字串。
/// - `key_pair`: 用於簽名的金鑰對。
pub fn create_signature(
    header_b64: &Base64,
    payload_b64: &Base64,
    key_pair: &KeyPair,
) -> Result<Base64> {
    let signing_input = format!("{}.{}", header_b64.as_str(), payload_b64.as_str());
    let signature = algorithm_for(key_pair).sign(signing_input.as_bytes(), key_pair)?;
    Ok(Base64::new(signature))
}

/// 驗證簽名是否由 `key_pair` 的私鑰對同樣的 `header.payload` 所產生。
pub fn verify_signature(
    header_b64: &Base64,
    payload_b64: &Base64,
    signature: &[u8],
    key_pair: &KeyPair,
) -> Result<bool> {
    let signing_input = format!("{}.{}", header_b64.as_str(), payload_b64.as_str());
    algorithm_for(key_pair).verify(signing_input.as_bytes(), signature, key_pair)
}
