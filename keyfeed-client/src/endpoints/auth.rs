//! Sign-in, sign-up and email verification.

use keyfeed_types::dto::{
    LoginRequest, LoginResponseData, SignupRequest, SocialLoginUrl, SocialProvider,
    VerificationConfirm, VerificationRequest, VerificationResult,
};
use keyfeed_types::{ApiError, AuthSession, Persistence};
use serde_json::Value;

use super::require_name;
use crate::api::{to_json, ApiClient, ApiRequest};
use crate::transport::HttpTransport;

impl<T: HttpTransport> ApiClient<T> {
    /// Sign in and store the session.
    ///
    /// With `stay_signed_in` the session survives restarts, otherwise it
    /// lives only as long as this process.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        stay_signed_in: bool,
    ) -> Result<AuthSession, ApiError> {
        let email = require_name(email, "email")?;
        if password.is_empty() {
            return Err(ApiError::Validation("password must not be empty".into()));
        }

        let body = to_json(&LoginRequest {
            email,
            password: password.to_string(),
            stay_signed_in,
        })?;
        let data: LoginResponseData = self
            .request_data(ApiRequest::post("/auth/login").json(body))
            .await?;

        let session = AuthSession::from_login(&data, Persistence::from_stay_signed_in(stay_signed_in));
        self.session().save(session.clone())?;
        tracing::info!("Signed in as user {}", session.user.id);
        Ok(session)
    }

    /// Forget the stored session.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.session().clear()?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// URL that starts the provider's login flow.
    pub async fn social_login_url(&self, provider: SocialProvider) -> Result<String, ApiError> {
        let path = format!("/auth/{}/login", provider.as_str());
        let data: SocialLoginUrl = self.request_data(ApiRequest::post(path)).await?;
        Ok(data.url)
    }

    /// Ask the server to email a verification code.
    pub async fn request_email_verification(&self, email: &str) -> Result<bool, ApiError> {
        let body = to_json(&VerificationRequest {
            email: require_name(email, "email")?,
        })?;
        let result: VerificationResult = self
            .request_data(ApiRequest::post("/auth/email-verification/request").json(body))
            .await?;
        Ok(result.success)
    }

    /// Confirm the emailed verification code.
    pub async fn confirm_email_verification(&self, email: &str, code: &str) -> Result<bool, ApiError> {
        let body = to_json(&VerificationConfirm {
            email: require_name(email, "email")?,
            code: require_name(code, "verification code")?,
        })?;
        let result: VerificationResult = self
            .request_data(ApiRequest::post("/auth/email-verification/confirm").json(body))
            .await?;
        Ok(result.success)
    }

    /// Create an account. Does not sign in.
    pub async fn signup(&self, request: SignupRequest) -> Result<(), ApiError> {
        let request = SignupRequest {
            name: require_name(&request.name, "name")?,
            email: require_name(&request.email, "email")?,
            ..request
        };
        if request.password.is_empty() {
            return Err(ApiError::Validation("password must not be empty".into()));
        }
        let _: Option<Value> = self
            .request_data(ApiRequest::post("/auth/join").json(to_json(&request)?))
            .await?;
        Ok(())
    }
}
