//! Sign-in and account commands.

use anyhow::{Context, Result};

use keyfeed_client::HttpTransport;
use keyfeed_types::dto::{PasswordChangeRequest, SignupRequest, SocialProvider};
use keyfeed_types::Persistence;

use super::App;

/// Sign in and store the session.
pub async fn login<T: HttpTransport>(
    app: &App<T>,
    email: &str,
    password: &str,
    stay_signed_in: bool,
) -> Result<()> {
    let session = app
        .client
        .login(email, password, stay_signed_in)
        .await
        .context("Login failed")?;

    println!("Signed in as {} <{}>", session.user.name, session.user.email);
    if session.persistence == Persistence::Tab {
        println!();
        println!("Note: the session ends with this command.");
        println!("Use 'keyfeed login --stay-signed-in' to keep it.");
    }
    Ok(())
}

/// Forget the stored session.
pub fn logout<T: HttpTransport>(app: &App<T>) -> Result<()> {
    let was_signed_in = app.client.session().current().is_some();
    app.client.logout().context("Failed to clear session")?;
    if was_signed_in {
        println!("Signed out.");
    } else {
        println!("Not signed in.");
    }
    Ok(())
}

/// Print the URL that starts a social login.
pub async fn social_login<T: HttpTransport>(app: &App<T>, provider: SocialProvider) -> Result<()> {
    let url = app
        .client
        .social_login_url(provider)
        .await
        .context("Failed to get login URL")?;
    println!("Open this URL to sign in with {}:", provider.as_str());
    println!("  {}", url);
    Ok(())
}

/// Create an account.
pub async fn signup<T: HttpTransport>(app: &App<T>, request: SignupRequest) -> Result<()> {
    let email = request.email.clone();
    app.client.signup(request).await.context("Sign-up failed")?;
    println!("Account created for {}.", email.trim());
    println!();
    println!("Next step: keyfeed login --email {} --stay-signed-in", email.trim());
    Ok(())
}

/// Ask for a verification code by email.
pub async fn request_verification<T: HttpTransport>(app: &App<T>, email: &str) -> Result<()> {
    let sent = app
        .client
        .request_email_verification(email)
        .await
        .context("Failed to request verification code")?;
    if !sent {
        anyhow::bail!("The server did not send a verification code");
    }
    println!("Verification code sent to {}.", email.trim());
    Ok(())
}

/// Confirm an emailed verification code.
pub async fn confirm_verification<T: HttpTransport>(app: &App<T>, email: &str, code: &str) -> Result<()> {
    let verified = app
        .client
        .confirm_email_verification(email, code)
        .await
        .context("Failed to confirm verification code")?;
    if !verified {
        anyhow::bail!("Verification code was not accepted");
    }
    println!("Email verified.");
    Ok(())
}

/// Change the account password.
pub async fn change_password<T: HttpTransport>(app: &App<T>, request: PasswordChangeRequest) -> Result<()> {
    app.require_session()?;
    app.client
        .change_password(request)
        .await
        .context("Failed to change password")?;
    println!("Password changed.");
    Ok(())
}

/// Delete the account and sign out.
pub async fn delete_account<T: HttpTransport>(app: &App<T>, password: &str) -> Result<()> {
    let session = app.require_session()?;
    app.client
        .delete_account(password)
        .await
        .context("Failed to delete account")?;
    println!("Account {} deleted.", session.user.email);
    Ok(())
}
