use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{dto::AuthRequest, services},
    error::ApiError,
    http::{preflight, Ack, JsonBody},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route(
        "/auth",
        post(dispatch)
            .options(preflight)
            .fallback(method_not_allowed),
    )
}

#[instrument(skip_all)]
pub async fn dispatch(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AuthRequest>,
) -> Result<Response, ApiError> {
    match req {
        AuthRequest::Register(body) => {
            let creds = body.into_registration().inspect_err(|e| {
                warn!(error = %e, "registration rejected");
            })?;
            Ok(Json(services::register(&state, creds).await?).into_response())
        }
        AuthRequest::Login(body) => {
            Ok(Json(services::login(&state, body.into_login()).await?).into_response())
        }
        AuthRequest::Check(body) => {
            let token = body.into_token()?;
            Ok(Json(services::check(&state, &token).await?).into_response())
        }
        AuthRequest::Logout(body) => {
            let token = body.into_token()?;
            services::logout(&state, &token).await?;
            Ok(Json(Ack::ok()).into_response())
        }
        AuthRequest::Unknown => {
            warn!("unknown auth action");
            Err(ApiError::validation("unknown action"))
        }
    }
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
