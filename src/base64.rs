//! JWS 所使用的 URL 安全 Base64 編碼（RFC 4648 §5，不含填充）。

use thiserror::Error;

/// Base64url 解碼時可能發生的錯誤。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// 遇到不屬於 URL 安全字元集的字元，包含該字元的 ASCII 值。
    #[error("Invalid character: {0}")]
    InvalidCharacter(u8),

    /// 輸入長度除以 4 餘 1，不可能由任何位元組序列編碼而來。
    #[error("Invalid length")]
    InvalidLength,
}

/// 已編碼的 Base64url 字串。
///
/// # 示例
///
/// ```
/// # use racme_client::base64::Base64;
/// let b64 = Base64::new("Hello, World!");
/// assert_eq!(b64.base64_url(), "SGVsbG8sIFdvcmxkIQ");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64 {
    encoded: String,
}

impl Base64 {
    const ALPHABET: &'static [u8; 64] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

    /// 將任意位元組資料編碼為不含填充的 Base64url。
    pub fn new<T: AsRef<[u8]>>(input: T) -> Self {
        let bytes = input.as_ref();
        let mut encoded = String::with_capacity(bytes.len().div_ceil(3) * 4);

        for chunk in bytes.chunks(3) {
            let b1 = chunk[0] as u32;
            let b2 = chunk.get(1).copied().unwrap_or(0) as u32;
            let b3 = chunk.get(2).copied().unwrap_or(0) as u32;
            let group = b1 << 16 | b2 << 8 | b3;

            // 每個輸入位元組對應 chunk.len() + 1 個輸出字元
            for i in 0..=chunk.len() {
                let index = (group >> (18 - 6 * i)) & 0x3F;
                encoded.push(Self::ALPHABET[index as usize] as char);
            }
        }

        Self { encoded }
    }

    /// 從已編碼的 Base64url 字串建立實例，並檢查其格式。
    ///
    /// 為了相容性，結尾的 `=` 填充會被忽略。
    ///
    /// # 錯誤
    ///
    /// 可能返回 [`DecodeError::InvalidCharacter`] 或 [`DecodeError::InvalidLength`]。
    pub fn from_url(url_encoded: &str) -> Result<Self, DecodeError> {
        let trimmed = url_encoded.trim_end_matches('=');
        if trimmed.len() % 4 == 1 {
            return Err(DecodeError::InvalidLength);
        }
        if let Some(&c) = trimmed.as_bytes().iter().find(|c| decode_char(**c).is_err()) {
            return Err(DecodeError::InvalidCharacter(c));
        }
        Ok(Self {
            encoded: trimmed.to_string(),
        })
    }

    /// 將內容解碼回原始位元組。
    pub fn decode(&self) -> Result<Vec<u8>, DecodeError> {
        let encoded = self.encoded.as_bytes();
        let mut buffer = Vec::with_capacity(encoded.len() * 3 / 4);

        for chunk in encoded.chunks(4) {
            if chunk.len() == 1 {
                return Err(DecodeError::InvalidLength);
            }
            let mut group = 0u32;
            for (i, &c) in chunk.iter().enumerate() {
                group |= (decode_char(c)? as u32) << (18 - 6 * i);
            }
            for i in 0..chunk.len() - 1 {
                buffer.push((group >> (16 - 8 * i)) as u8);
            }
        }

        Ok(buffer)
    }

    /// 返回 Base64url 字串。
    pub fn base64_url(&self) -> String {
        self.encoded.clone()
    }

    /// 返回內部字串的引用。
    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

/// 將 URL 安全字元轉換為 6 位元數值。
fn decode_char(c: u8) -> Result<u8, DecodeError> {
    match c {
        b'A'..=b'Z' => Ok(c - b'A'),
        b'a'..=b'z' => Ok(c - b'a' + 26),
        b'0'..=b'9' => Ok(c - b'0' + 52),
        b'-' => Ok(62),
        b'_' => Ok(63),
        _ => Err(DecodeError::InvalidCharacter(c)),
    }
}
