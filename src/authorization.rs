use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    account::Account,
    challenge::{Challenge, ChallengeStatus, ChallengeType},
    client::AcmeClient,
    directory::Directory,
    error::{AcmeError, Result},
    payload::{Identifier, NewAuthorizationPayload, PayloadT},
};

/// 授權狀態。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    Pending,
    Valid,
    Invalid,
    Deactivated,
    Expired,
    Revoked,
    #[serde(other)]
    Unknown,
}

/// 伺服器對某個識別項的授權，包含依序排列的挑戰。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Authorization {
    pub identifier: Identifier,
    pub status: AuthorizationStatus,
    pub expires: Option<String>,
    #[serde(default)]
    pub challenges: Vec<Challenge>,
}

impl Authorization {
    /// 尋找指定類型且狀態恰為 `pending` 的挑戰。
    ///
    /// 類型相符但狀態不是 `pending` 的挑戰不會被回傳。
    ///
    /// # 錯誤
    ///
    /// 找不到時回傳 [`AcmeError::NoMatchingChallenge`]。
    pub fn find_pending_challenge(&self, challenge_type: &ChallengeType) -> Result<&Challenge> {
        self.challenges
            .iter()
            .find(|c| &c.challenge_type == challenge_type && c.status == ChallengeStatus::Pending)
            .ok_or_else(|| AcmeError::NoMatchingChallenge(challenge_type.to_string()))
    }
}

impl AcmeClient {
    /// 為識別項請求新的授權。
    ///
    /// # 錯誤
    ///
    /// 目錄沒有 `newAuthz` 端點時回傳 [`AcmeError::UnsupportedOperation`]。
    pub fn new_authorization(
        &self,
        identifier: &Identifier,
        account: &Account,
        directory: &Directory,
    ) -> Result<Authorization> {
        let url = Self::new_authz_url(directory)?;
        let payload = NewAuthorizationPayload::new(identifier.clone());
        self.request_authorization(url, &payload, account, directory)
    }

    /// 重新取得呼叫者已知的授權。
    ///
    /// 與 [`AcmeClient::new_authorization`] 相同，但負載標記為只接受既有授權，
    /// 並改為送往授權本身的 URL。
    pub fn existing_authorization(
        &self,
        identifier: &Identifier,
        authorization_url: &str,
        account: &Account,
        directory: &Directory,
    ) -> Result<Authorization> {
        Self::new_authz_url(directory)?;
        let payload = NewAuthorizationPayload::existing_required(identifier.clone());
        self.request_authorization(authorization_url, &payload, account, directory)
    }

    /// 將挑戰回應送往挑戰自身的 URL，回傳更新後的挑戰。
    pub fn respond_to_challenge<P: PayloadT>(
        &self,
        challenge: &Challenge,
        payload: &P,
        account: &Account,
        directory: &Directory,
    ) -> Result<Challenge> {
        payload
            .validate()
            .map_err(|e| AcmeError::InvalidPayload(e.to_string()))?;

        let response = self.post_signed(
            directory,
            &challenge.url,
            payload,
            &account.key_pair,
            account.jwk_binding()?,
        )?;
        let updated: Challenge = serde_json::from_slice(&response.body)?;

        info!(
            challenge_type = %updated.challenge_type,
            status = ?updated.status,
            "challenge response accepted"
        );
        Ok(updated)
    }

    fn new_authz_url(directory: &Directory) -> Result<&str> {
        directory
            .new_authz
            .as_deref()
            .ok_or(AcmeError::UnsupportedOperation("newAuthz"))
    }

    fn request_authorization(
        &self,
        url: &str,
        payload: &NewAuthorizationPayload,
        account: &Account,
        directory: &Directory,
    ) -> Result<Authorization> {
        payload
            .validate()
            .map_err(|e| AcmeError::InvalidPayload(e.to_string()))?;

        let response = self.post_signed(
            directory,
            url,
            payload,
            &account.key_pair,
            account.jwk_binding()?,
        )?;
        let authorization: Authorization = serde_json::from_slice(&response.body)?;

        debug!(
            identifier = %authorization.identifier.value,
            challenges = authorization.challenges.len(),
            "authorization received"
        );
        Ok(authorization)
    }
}
