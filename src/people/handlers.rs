use axum::{
    extract::{DefaultBodyLimit, State},
    routing::get,
    Json, Router,
};
use tracing::{instrument, warn};

use super::{
    dto::{CreatePersonRequest, DeletePersonRequest, PeopleResponse, PersonResponse},
    repo, services,
};
use crate::{
    auth::AuthUser,
    error::ApiError,
    http::{preflight, Ack, JsonBody},
    state::AppState,
};

/// Embedded photos arrive base64-encoded inside the JSON body.
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

pub fn people_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/people",
            get(list_people)
                .post(create_person)
                .delete(delete_person)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

#[instrument(skip(state))]
pub async fn list_people(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PeopleResponse>, ApiError> {
    let people = repo::list_by_user(&state.db, user_id).await?;
    Ok(Json(PeopleResponse {
        people: people.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state, body))]
pub async fn create_person(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(body): JsonBody<CreatePersonRequest>,
) -> Result<Json<PersonResponse>, ApiError> {
    let new = body.validate().inspect_err(|e| {
        warn!(error = %e, user_id, "person rejected");
    })?;
    let person = services::create_person(&state, user_id, new).await?;
    Ok(Json(PersonResponse {
        person: person.into(),
    }))
}

#[instrument(skip(state, body))]
pub async fn delete_person(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(body): JsonBody<DeletePersonRequest>,
) -> Result<Json<Ack>, ApiError> {
    services::delete_person(&state, user_id, body.id).await?;
    Ok(Json(Ack::ok()))
}

/// Runs after the session check so unauthenticated callers still get 401.
async fn method_not_allowed(AuthUser(_): AuthUser) -> ApiError {
    ApiError::MethodNotAllowed
}
