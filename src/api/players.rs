use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::oid::ObjectId;
use tracing::instrument;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    models::players::PlayerPublic,
    util::errors::{IntoRouteError, RouteError, SimpleRouteErrorOutput},
    AppState,
};

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(get_player))
}

/// Get player by ID
#[utoipa::path(
    method(get),
    path = "/{id}",
    params(
        ("id" = String, Path, description = "ID of the player to get"),
    ),
    responses(
        (status = OK, description = "Success", body = PlayerPublic, content_type = "application/json"),
        (status = BAD_REQUEST, description = "Malformed ID", body = SimpleRouteErrorOutput, content_type = "application/json"),
        (status = NOT_FOUND, description = "Player not found", body = SimpleRouteErrorOutput, content_type = "application/json"),
        (status = INTERNAL_SERVER_ERROR, description = "Miscellaneous error", body = SimpleRouteErrorOutput)
    )
)]
#[instrument(skip(state), err(Debug))]
async fn get_player(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PlayerPublic>, RouteError> {
    let id = ObjectId::parse_str(&id).http_error("Invalid player ID", StatusCode::BAD_REQUEST)?;

    let player = state
        .store
        .find_player(id)
        .await?
        .ok_or_else(|| RouteError::new_not_found().set_public_error_message("Player not found"))?;

    Ok(Json(player.into()))
}
