use serde::{Deserialize, Serialize};

use crate::auth::password::MIN_PASSWORD_LEN;
use crate::error::ApiError;

/// Body of `POST /auth`, tagged by `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum AuthRequest {
    Register(CredentialsRequest),
    Login(CredentialsRequest),
    Check(TokenRequest),
    Logout(TokenRequest),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub token: Option<String>,
}

/// Validated login/password pair. Login is trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl CredentialsRequest {
    pub fn into_registration(self) -> Result<Credentials, ApiError> {
        let login = self.login.trim().to_string();
        if login.is_empty() || self.password.is_empty() {
            return Err(ApiError::validation("login and password are required"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(Credentials {
            login,
            password: self.password,
        })
    }

    /// Login attempts are never rejected as malformed; bad pairs fail authentication.
    pub fn into_login(self) -> Credentials {
        Credentials {
            login: self.login.trim().to_string(),
            password: self.password,
        }
    }
}

impl TokenRequest {
    pub fn into_token(self) -> Result<String, ApiError> {
        self.token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthorized("no token"))
    }
}

/// Returned by register and login.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user_id: i64,
    pub login: String,
}

/// Returned by check.
#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    pub user_id: i64,
    pub login: String,
}
