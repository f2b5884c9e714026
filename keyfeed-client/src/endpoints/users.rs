//! Account management.

use keyfeed_types::dto::{DeleteAccountRequest, PasswordChangeRequest};
use keyfeed_types::ApiError;
use serde_json::Value;

use crate::api::{to_json, ApiClient, ApiRequest};
use crate::transport::HttpTransport;

impl<T: HttpTransport> ApiClient<T> {
    /// Change the account password.
    ///
    /// A confirmation that differs from the new password is rejected before
    /// any request is made.
    pub async fn change_password(&self, request: PasswordChangeRequest) -> Result<(), ApiError> {
        if request.new_password.is_empty() {
            return Err(ApiError::Validation("new password must not be empty".into()));
        }
        if request.new_password != request.confirm_password {
            return Err(ApiError::Validation("password confirmation does not match".into()));
        }
        let _: Option<Value> = self
            .request_data(ApiRequest::patch("/users/password").json(to_json(&request)?))
            .await?;
        Ok(())
    }

    /// Delete the account and sign out.
    pub async fn delete_account(&self, password: &str) -> Result<(), ApiError> {
        let body = to_json(&DeleteAccountRequest {
            password: password.to_string(),
        })?;
        let _: Option<Value> = self.request_data(ApiRequest::delete("/users").json(body)).await?;
        self.session().clear()?;
        tracing::info!("Account deleted");
        Ok(())
    }
}
