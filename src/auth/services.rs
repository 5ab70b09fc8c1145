use rand::{rngs::OsRng, RngCore};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{Credentials, IdentityResponse, SessionResponse},
        password::{hash_password, verify_dummy, verify_password},
        repo,
        repo_types::User,
    },
    error::{is_unique_violation, ApiError},
    state::AppState,
};

/// Session tokens carry 256 random bits.
pub const TOKEN_BYTES: usize = 32;

/// Random session token as lowercase hex.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn session_expiry(state: &AppState) -> Option<OffsetDateTime> {
    state
        .config
        .session_ttl
        .map(|ttl| OffsetDateTime::now_utc() + ttl)
}

fn login_taken() -> ApiError {
    ApiError::conflict("login already taken")
}

pub async fn register(state: &AppState, creds: Credentials) -> Result<SessionResponse, ApiError> {
    if User::find_by_login(&state.db, &creds.login).await?.is_some() {
        warn!(login = %creds.login, "login already registered");
        return Err(login_taken());
    }

    let hash = hash_password(&creds.password)?;

    let mut tx = state.db.begin().await?;
    let user = match User::create_tx(&mut tx, &creds.login, &hash).await {
        Ok(u) => u,
        // lost a race with a concurrent registration
        Err(e) if is_unique_violation(&e) => {
            warn!(login = %creds.login, "login registered concurrently");
            return Err(login_taken());
        }
        Err(e) => return Err(e.into()),
    };
    let token = generate_token();
    repo::insert_session(&mut *tx, user.id, &token, session_expiry(state)).await?;
    tx.commit().await?;

    info!(user_id = user.id, login = %user.login, "user registered");
    Ok(SessionResponse {
        token,
        user_id: user.id,
        login: user.login,
    })
}

pub async fn login(state: &AppState, creds: Credentials) -> Result<SessionResponse, ApiError> {
    let invalid = || ApiError::unauthorized("invalid login or password");

    let Some(user) = User::find_by_login(&state.db, &creds.login).await? else {
        verify_dummy(&creds.password);
        warn!(login = %creds.login, "login unknown user");
        return Err(invalid());
    };

    let ok = verify_password(&creds.password, &user.password_hash).unwrap_or_else(|e| {
        warn!(error = %e, user_id = user.id, "stored password hash is unreadable");
        false
    });
    if !ok {
        warn!(user_id = user.id, "login invalid password");
        return Err(invalid());
    }

    let token = generate_token();
    repo::insert_session(&state.db, user.id, &token, session_expiry(state)).await?;

    info!(user_id = user.id, "user logged in");
    Ok(SessionResponse {
        token,
        user_id: user.id,
        login: user.login,
    })
}

pub async fn check(state: &AppState, token: &str) -> Result<IdentityResponse, ApiError> {
    let user = repo::find_session_user(&state.db, token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("session not found"))?;
    Ok(IdentityResponse {
        user_id: user.user_id,
        login: user.login,
    })
}

pub async fn logout(state: &AppState, token: &str) -> Result<(), ApiError> {
    if !repo::delete_session(&state.db, token).await? {
        return Err(ApiError::unauthorized("session not found"));
    }
    info!("session revoked");
    Ok(())
}
