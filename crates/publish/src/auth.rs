//! Per-session re-authentication.
//!
//! Tokens are short-lived and never cached: every session logs in again,
//! and the token it gets is used for all of that session's calls.

use assetlane_protocol::{BearerToken, Credentials, LinkedAccount, Profile};
use tracing::{debug, warn};

use crate::error::UploadError;
use crate::platform::PlatformApi;

/// Token and profile returned by a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: BearerToken,
    pub profile: Profile,
}

/// Exchanges stored credentials for a bearer token.
pub struct AuthenticationClient<'a> {
    platform: &'a dyn PlatformApi,
}

impl<'a> AuthenticationClient<'a> {
    pub fn new(platform: &'a dyn PlatformApi) -> Self {
        Self { platform }
    }

    /// Authenticates a connected account.
    ///
    /// Accounts that are not `CONNECTED` fail before any network call.
    pub async fn authenticate(&self, account: &LinkedAccount) -> Result<BearerToken, UploadError> {
        if !account.is_connected() {
            return Err(UploadError::AccountNotReady {
                account_id: account.id.clone(),
                reason: format!("status is {}", account.status),
            });
        }

        let outcome = self.login(&account.credentials).await?;
        debug!(account = %account.id, "authenticated");
        Ok(outcome.token)
    }

    /// Logs in with a credential pair regardless of account status.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, UploadError> {
        let resp = self.platform.login(credentials).await.map_err(|e| {
            warn!(login = %credentials.login_id, error = %e, "login rejected");
            UploadError::Auth(e.to_string())
        })?;

        let token = BearerToken::new(resp.auth_token);
        if token.is_empty() {
            return Err(UploadError::Auth("login returned an empty token".into()));
        }

        Ok(LoginOutcome {
            token,
            profile: resp.profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockPlatform, api_error};
    use assetlane_protocol::AccountStatus;

    fn account(status: AccountStatus) -> LinkedAccount {
        LinkedAccount {
            id: "acc-1".into(),
            credentials: Credentials {
                login_id: "owner".into(),
                password: "pw".into(),
            },
            display_name: String::new(),
            username: String::new(),
            status,
            last_validated_at: None,
        }
    }

    #[tokio::test]
    async fn connected_account_gets_token() {
        let mock = MockPlatform::new();
        mock.push_login(Ok("Bearer abc"));

        let token = AuthenticationClient::new(&mock)
            .authenticate(&account(AccountStatus::Connected))
            .await
            .unwrap();
        assert_eq!(token.as_str(), "abc");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn not_connected_makes_no_call() {
        let mock = MockPlatform::new();
        for status in [AccountStatus::Failed, AccountStatus::Pending] {
            let err = AuthenticationClient::new(&mock)
                .authenticate(&account(status))
                .await
                .unwrap_err();
            assert!(matches!(err, UploadError::AccountNotReady { .. }));
        }
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn rejected_login_is_auth_error() {
        let mock = MockPlatform::new();
        mock.push_login(Err(api_error(401, "bad credentials")));

        let err = AuthenticationClient::new(&mock)
            .authenticate(&account(AccountStatus::Connected))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "auth_error");
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn blank_token_is_rejected() {
        let mock = MockPlatform::new();
        mock.push_login(Ok("   "));

        let err = AuthenticationClient::new(&mock)
            .login(&account(AccountStatus::Pending).credentials)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Auth(_)));
    }

    #[tokio::test]
    async fn login_returns_profile() {
        let mock = MockPlatform::new();
        let outcome = AuthenticationClient::new(&mock)
            .login(&account(AccountStatus::Pending).credentials)
            .await
            .unwrap();
        assert_eq!(outcome.profile.user_id, "owner01");
        assert_eq!(mock.calls(), vec![crate::mock::Call::Login("owner".into())]);
    }
}
