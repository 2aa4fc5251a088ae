use axum::{Json, Router};
use serde::Serialize;
use utoipa::{openapi::OpenApi, OpenApi as OpenApiTrait, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{util::errors::RouteError, AppState};

pub mod connections;
mod players;

#[derive(OpenApiTrait)]
#[openapi(servers((url = "/api")), security(
    (),
    ("token_jwt" = [])
))]
pub struct ApiDoc;

pub fn routes() -> (Router<AppState>, OpenApi) {
    OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(health_check))
        .nest("/players", players::routes())
        .nest("/connections", connections::routes())
        .split_for_parts()
}

#[derive(Serialize, ToSchema)]
struct HealthCheck {
    status: &'static str,
}

/// Get health of the API.
#[utoipa::path(
    method(get),
    path = "/healthCheck",
    responses(
        (status = OK, description = "Success", body = HealthCheck, content_type = "application/json")
    )
)]
async fn health_check() -> Result<Json<HealthCheck>, RouteError> {
    Ok(Json(HealthCheck { status: "ok" }))
}
