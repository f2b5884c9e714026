//! Authenticated session state.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::dto::LoginResponseData;
use crate::UserId;

/// Bearer access token.
///
/// Zeroed on drop and redacted in `Debug` so it never ends up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken([{} chars REDACTED])", self.0.len())
    }
}

/// Identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User id.
    pub id: UserId,
    /// Account email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Account role.
    #[serde(default)]
    pub role: String,
}

/// Where a session is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persistence {
    /// Survives restarts ("stay signed in").
    Durable,
    /// Lives only as long as the current process.
    Tab,
}

impl Persistence {
    /// Persistence for the "stay signed in" choice made at login.
    pub fn from_stay_signed_in(stay: bool) -> Self {
        if stay {
            Persistence::Durable
        } else {
            Persistence::Tab
        }
    }
}

/// The signed-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// Current access token.
    pub token: AccessToken,
    /// Signed-in user.
    pub user: UserProfile,
    /// Storage scope holding this session.
    pub persistence: Persistence,
}

impl AuthSession {
    /// Build a session from a login response.
    pub fn from_login(data: &LoginResponseData, persistence: Persistence) -> Self {
        Self {
            token: AccessToken::new(data.access_token.clone()),
            user: UserProfile {
                id: data.id,
                email: data.email.clone(),
                name: data.name.clone(),
                role: data.role.clone(),
            },
            persistence,
        }
    }

    /// The same session with a refreshed token.
    pub fn with_token(&self, token: AccessToken) -> Self {
        Self {
            token,
            user: self.user.clone(),
            persistence: self.persistence,
        }
    }

    /// The persisted form (the scope is implied by where it is stored).
    pub fn to_stored(&self) -> StoredSession {
        StoredSession {
            token: self.token.clone(),
            user: self.user.clone(),
        }
    }
}

/// What is written to a storage scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    /// Access token.
    pub token: AccessToken,
    /// Signed-in user.
    pub user: UserProfile,
}

impl StoredSession {
    /// Attach the scope the record was read from.
    pub fn into_session(self, persistence: Persistence) -> AuthSession {
        AuthSession {
            token: self.token,
            user: self.user,
            persistence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_data() -> LoginResponseData {
        serde_json::from_str(
            r#"{"id":7,"email":"kim@example.com","name":"Kim","role":"USER","accessToken":"tok-123"}"#,
        )
        .unwrap()
    }

    #[test]
    fn session_from_login() {
        let session = AuthSession::from_login(&login_data(), Persistence::Durable);
        assert_eq!(session.token.expose(), "tok-123");
        assert_eq!(session.user.id, UserId::new(7));
        assert_eq!(session.persistence, Persistence::Durable);
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = AccessToken::new("very-secret");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn bearer_header_value() {
        assert_eq!(AccessToken::new("abc").bearer(), "Bearer abc");
    }

    #[test]
    fn stored_session_round_trips_scope() {
        let session = AuthSession::from_login(&login_data(), Persistence::Tab);
        let stored = session.to_stored();
        let json = serde_json::to_string(&stored).unwrap();
        assert!(json.contains("\"token\":\"tok-123\""));
        let back: StoredSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back.into_session(Persistence::Tab), session);
    }

    #[test]
    fn stay_signed_in_maps_to_scope() {
        assert_eq!(Persistence::from_stay_signed_in(true), Persistence::Durable);
        assert_eq!(Persistence::from_stay_signed_in(false), Persistence::Tab);
    }
}
