use serde::Deserialize;

use crate::domain::{Error, UserId};

pub const USER_ID_MISSING: &str = "User ID is missing in response";

/// Raw body of `POST /auth/token/`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
}

/// An authenticated user and the tokens that prove it.
///
/// Passed explicitly to every call that needs authentication. Debug output
/// redacts the tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    access: String,
    refresh: Option<String>,
    pub user_id: UserId,
    pub username: String,
}

impl Session {
    pub fn new(access: impl Into<String>, user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: None,
            user_id,
            username: username.into(),
        }
    }

    pub fn with_refresh(mut self, refresh: impl Into<String>) -> Self {
        self.refresh = Some(refresh.into());
        self
    }

    /// Builds a session from a login response. The response must name the user.
    pub fn from_token_response(response: TokenResponse, login_name: &str) -> Result<Self, Error> {
        let user_id = response
            .user_id
            .ok_or_else(|| Error::Session(USER_ID_MISSING.to_string()))?;
        if response.access.trim().is_empty() {
            return Err(Error::Session("Access token is missing in response".to_string()));
        }
        Ok(Self {
            access: response.access,
            refresh: response.refresh,
            user_id,
            username: response.username.unwrap_or_else(|| login_name.to_string()),
        })
    }

    pub fn access_token(&self) -> &str {
        &self.access
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh.as_deref()
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access)
    }
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("access", &"<redacted>")
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .finish()
    }
}
