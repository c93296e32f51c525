//! # ACME Protocol Client Core
//!
//! 本庫實作 ACME 協議（例如 Let's Encrypt）的核心流程，不包含命令列工具或持久化儲存：
//!
//! - **directory**: 取得伺服器目錄，並以明確的端點選擇處理舊版伺服器的相容性。
//! - **nonce / jws**: 每個簽名請求都先取得新的 nonce，再建立 JWS 信封。
//! - **account**: 帳戶註冊、定位、更新與金鑰更換。
//! - **authorization / challenge**: 請求授權、尋找待處理的挑戰並送出回應。
//! - **order**: 提交 CSR 並解碼伺服器簽發的證書。
//!
//! ## 使用方式
//!
//! 所有網路操作都透過 [`AcmeClient`] 進行。客戶端不保存協議狀態，目錄與帳戶由呼叫者
//! 持有並在每次操作時傳入，操作結果則以新的值回傳。
//!
//! ## 示例
//!
//! ```rust,no_run
//! use racme_client::{
//!     challenge::ChallengeType, csr::Csr, directory::LETS_ENCRYPT_STAGING_DIRECTORY,
//!     key_pair::{KeyAlgorithm, KeyPair}, order::Order, payload::Identifier, Account,
//!     AcmeClient,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AcmeClient::new()?;
//!     let directory = client.fetch_directory(LETS_ENCRYPT_STAGING_DIRECTORY)?;
//!
//!     // 1. 註冊帳戶
//!     let account = Account::builder()
//!         .contact("admin@example.com")
//!         .agree_to_terms()
//!         .build()?;
//!     let account = client.register(&account, &directory)?;
//!
//!     // 2. 請求授權並回應 HTTP-01 挑戰
//!     let identifier = Identifier::dns("example.com");
//!     let authz = client.new_authorization(&identifier, &account, &directory)?;
//!     let challenge = authz.find_pending_challenge(&ChallengeType::Http01)?;
//!     println!("{:?}", challenge.http01_path());
//!     let payload = challenge.response_payload(&account)?;
//!     client.respond_to_challenge(challenge, &payload, &account, &directory)?;
//!
//!     // 3. 提交 CSR 並取得證書
//!     let cert_key = KeyPair::generate(KeyAlgorithm::EcP256)?;
//!     let order = Order::from_csr(&Csr::new().san("example.com"), &cert_key)?;
//!     let certificate = client.submit_order(&order, &account, &directory)?;
//!     println!("{}", certificate.to_pem()?);
//!
//!     Ok(())
//! }
//! ```
//!
//! 更多詳細 API 說明請參考各個模組的文檔。

pub mod account;
pub mod authorization;
pub mod base64;
pub mod certificate;
pub mod challenge;
pub mod client;
pub mod csr;
pub mod directory;
pub mod error;
pub mod jwk;
pub mod jws;
pub mod key_pair;
pub mod nonce;
pub mod order;
pub mod payload;
pub mod protection;
pub mod signature;
pub mod transport;

pub use account::{Account, AccountBuilder, AccountStatus};
pub use authorization::{Authorization, AuthorizationStatus};
pub use certificate::Certificate;
pub use client::{AcmeClient, AcmeClientBuilder};
pub use directory::{Directory, EndpointChoice};
pub use error::{AcmeError, ErrorKind, Result};
pub use order::Order;
