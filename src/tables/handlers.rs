use anyhow::Context;
use axum::{extract::State, routing::get, Json, Router};
use tracing::{debug, info, instrument};

use super::{
    dto::{
        CreateTableRequest, TableDocument, TableResponse, TableView, TablesResponse,
        UpdateTableRequest,
    },
    repo,
};
use crate::{
    auth::AuthUser,
    error::ApiError,
    http::{preflight, Ack, JsonBody},
    state::AppState,
};

pub fn tables_routes() -> Router<AppState> {
    Router::new().route(
        "/tables",
        get(list_tables)
            .post(create_table)
            .put(update_table)
            .options(preflight)
            .fallback(method_not_allowed),
    )
}

#[instrument(skip(state))]
pub async fn list_tables(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<TablesResponse>, ApiError> {
    let rows = repo::list_by_user(&state.db, user_id).await?;
    let tables = rows
        .into_iter()
        .map(TableView::try_from)
        .collect::<Result<Vec<_>, _>>()
        .context("stored table document is not JSON")?;
    Ok(Json(TablesResponse { tables }))
}

#[instrument(skip(state, body))]
pub async fn create_table(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(body): JsonBody<CreateTableRequest>,
) -> Result<Json<TableResponse>, ApiError> {
    let doc = TableDocument::from(body);
    let table = repo::insert_table(&state.db, user_id, &doc).await?;
    info!(user_id, table_id = table.id, "table created");
    Ok(Json(TableResponse {
        table: table.into(),
    }))
}

#[instrument(skip(state, body))]
pub async fn update_table(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(body): JsonBody<UpdateTableRequest>,
) -> Result<Json<Ack>, ApiError> {
    let (table_id, doc) = body.into_parts();
    let updated = repo::update_table(&state.db, user_id, table_id, &doc).await?;
    if updated == 0 {
        debug!(user_id, table_id, "update matched no owned table");
    }
    Ok(Json(Ack::ok()))
}

async fn method_not_allowed(AuthUser(_): AuthUser) -> ApiError {
    ApiError::MethodNotAllowed
}
