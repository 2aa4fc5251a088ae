use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    models::{
        connections::{ConnectionRequest, ConnectionStatus},
        players::{Player, PlayerPublic},
    },
    util::{
        errors::{IntoRouteError, RouteError, SimpleRouteErrorOutput},
        jwt::Claims,
    },
    AppState,
};

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(get_connections))
        .routes(routes!(request_connection))
        .routes(routes!(accept_request))
        .routes(routes!(reject_request))
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionsResponse {
    /// Confirmed connections, oldest first
    pub connections: Vec<PlayerPublic>,
    /// Incoming requests waiting for an answer, oldest first
    pub pending_requests: Vec<PlayerPublic>,
}

fn parse_player_id(raw: &str) -> Result<ObjectId, RouteError> {
    ObjectId::parse_str(raw).http_error("Invalid player ID", StatusCode::BAD_REQUEST)
}

/// Get own connections and incoming requests
#[utoipa::path(
    method(get),
    path = "/",
    responses(
        (status = OK, description = "Success", body = ConnectionsResponse, content_type = "application/json"),
        (status = UNAUTHORIZED, description = "Unauthorized", body = SimpleRouteErrorOutput, content_type = "application/json"),
        (status = INTERNAL_SERVER_ERROR, description = "Miscellaneous error", body = SimpleRouteErrorOutput)
    ),
    security(
        ("token_jwt" = [])
    )
)]
#[instrument(skip_all, err(Debug), fields(player = %claims.sub))]
async fn get_connections(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<ConnectionsResponse>, RouteError> {
    let me = claims.player_id()?;
    let requests = state.store.active_requests_of(me).await?;

    let connection_ids: Vec<ObjectId> = requests
        .iter()
        .filter(|r| r.status == ConnectionStatus::Accepted)
        .filter_map(|r| r.counterpart_of(me))
        .collect();

    let mut incoming: Vec<&ConnectionRequest> = requests
        .iter()
        .filter(|r| r.status == ConnectionStatus::Pending && r.recipient == me)
        .collect();
    incoming.sort_by_key(|r| r.created_at);
    let pending_ids: Vec<ObjectId> = incoming.iter().map(|r| r.requester).collect();

    let all_ids: Vec<ObjectId> = connection_ids.iter().chain(&pending_ids).copied().collect();
    let mut players: HashMap<ObjectId, Player> = state
        .store
        .players_by_ids(&all_ids)
        .await
        .http_internal_error("Failed to load players")?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    // Players that were deleted in the meantime are skipped
    let mut in_order = |ids: &[ObjectId]| -> Vec<PlayerPublic> {
        ids.iter()
            .filter_map(|id| players.remove(id))
            .map(PlayerPublic::from)
            .collect()
    };
    let connections = in_order(&connection_ids);
    let pending_requests = in_order(&pending_ids);

    Ok(Json(ConnectionsResponse {
        connections,
        pending_requests,
    }))
}

/// Send a connection request to a player
#[utoipa::path(
    method(post),
    path = "/request/{player_id}",
    params(
        ("player_id" = String, Path, description = "ID of the player to connect with"),
    ),
    responses(
        (status = NO_CONTENT, description = "Request sent"),
        (status = BAD_REQUEST, description = "Invalid parameters", body = SimpleRouteErrorOutput, content_type = "application/json"),
        (status = NOT_FOUND, description = "Couldn't find player", body = SimpleRouteErrorOutput, content_type = "application/json"),
        (status = CONFLICT, description = "Already connected or request pending", body = SimpleRouteErrorOutput, content_type = "application/json"),
        (status = UNAUTHORIZED, description = "Unauthorized", body = SimpleRouteErrorOutput, content_type = "application/json"),
        (status = INTERNAL_SERVER_ERROR, description = "Miscellaneous error", body = SimpleRouteErrorOutput)
    ),
    security(
        ("token_jwt" = [])
    )
)]
#[instrument(skip(state, claims), err(Debug), fields(player = %claims.sub))]
async fn request_connection(
    State(state): State<AppState>,
    claims: Claims,
    Path(player_id): Path<String>,
) -> Result<StatusCode, RouteError> {
    let me = claims.player_id()?;
    let target = parse_player_id(&player_id)?;

    if me == target {
        return Err(
            RouteError::new_bad_request().set_public_error_message("You can't connect with yourself")
        );
    }

    state
        .store
        .find_player(target)
        .await?
        .ok_or_else(|| RouteError::new_not_found().set_public_error_message("Player not found"))?;

    let existing = state.store.active_requests_of(me).await?;
    if let Some(request) = existing
        .iter()
        .find(|r| r.status.is_active() && r.involves_pair(me, target))
    {
        let message = match request.status {
            ConnectionStatus::Accepted => "Already connected",
            _ => "A request between you is already pending",
        };
        return Err(RouteError::new_conflict().set_public_error_message(message));
    }

    // the check above only picks the message, the store has the final say
    let inserted = state
        .store
        .insert_request(&ConnectionRequest::new_pending(me, target))
        .await?;
    if !inserted {
        return Err(RouteError::new_conflict()
            .set_public_error_message("A request between you is already pending"));
    }
    info!("Connection request sent");

    Ok(StatusCode::NO_CONTENT)
}

async fn respond(
    state: &AppState,
    claims: &Claims,
    player_id: &str,
    status: ConnectionStatus,
) -> Result<StatusCode, RouteError> {
    let me = claims.player_id()?;
    let requester = parse_player_id(player_id)?;

    state
        .store
        .resolve_pending(requester, me, status)
        .await?
        .ok_or_else(|| {
            RouteError::new_not_found()
                .set_public_error_message("No pending request from this player")
        })?;
    info!(status = status.as_str(), "Connection request resolved");

    Ok(StatusCode::NO_CONTENT)
}

/// Accept a pending connection request
#[utoipa::path(
    method(post),
    path = "/accept/{player_id}",
    params(
        ("player_id" = String, Path, description = "ID of the player who sent the request"),
    ),
    responses(
        (status = NO_CONTENT, description = "Request accepted"),
        (status = BAD_REQUEST, description = "Invalid parameters", body = SimpleRouteErrorOutput, content_type = "application/json"),
        (status = NOT_FOUND, description = "No pending request from this player", body = SimpleRouteErrorOutput, content_type = "application/json"),
        (status = UNAUTHORIZED, description = "Unauthorized", body = SimpleRouteErrorOutput, content_type = "application/json"),
        (status = INTERNAL_SERVER_ERROR, description = "Miscellaneous error", body = SimpleRouteErrorOutput)
    ),
    security(
        ("token_jwt" = [])
    )
)]
#[instrument(skip(state, claims), err(Debug), fields(player = %claims.sub))]
async fn accept_request(
    State(state): State<AppState>,
    claims: Claims,
    Path(player_id): Path<String>,
) -> Result<StatusCode, RouteError> {
    respond(&state, &claims, &player_id, ConnectionStatus::Accepted).await
}

/// Reject a pending connection request
#[utoipa::path(
    method(post),
    path = "/reject/{player_id}",
    params(
        ("player_id" = String, Path, description = "ID of the player who sent the request"),
    ),
    responses(
        (status = NO_CONTENT, description = "Request rejected"),
        (status = BAD_REQUEST, description = "Invalid parameters", body = SimpleRouteErrorOutput, content_type = "application/json"),
        (status = NOT_FOUND, description = "No pending request from this player", body = SimpleRouteErrorOutput, content_type = "application/json"),
        (status = UNAUTHORIZED, description = "Unauthorized", body = SimpleRouteErrorOutput, content_type = "application/json"),
        (status = INTERNAL_SERVER_ERROR, description = "Miscellaneous error", body = SimpleRouteErrorOutput)
    ),
    security(
        ("token_jwt" = [])
    )
)]
#[instrument(skip(state, claims), err(Debug), fields(player = %claims.sub))]
async fn reject_request(
    State(state): State<AppState>,
    claims: Claims,
    Path(player_id): Path<String>,
) -> Result<StatusCode, RouteError> {
    respond(&state, &claims, &player_id, ConnectionStatus::Rejected).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
        Router,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{
        make_router,
        store::{memory::MemoryStore, ConnectionStore, PlayerStore},
        util::testing::{state_with_store, test_state, token_for},
    };

    /// Hands control back to the runtime after reading requests, so concurrent
    /// handlers interleave between their check and their write.
    struct YieldingStore(Arc<MemoryStore>);

    #[async_trait]
    impl PlayerStore for YieldingStore {
        async fn find_player(&self, id: ObjectId) -> anyhow::Result<Option<Player>> {
            self.0.find_player(id).await
        }

        async fn find_player_by_username(&self, username: &str) -> anyhow::Result<Option<Player>> {
            self.0.find_player_by_username(username).await
        }

        async fn players_by_ids(&self, ids: &[ObjectId]) -> anyhow::Result<Vec<Player>> {
            self.0.players_by_ids(ids).await
        }

        async fn all_players(&self) -> anyhow::Result<Vec<Player>> {
            self.0.all_players().await
        }

        async fn close(&self) {
            self.0.close().await;
        }
    }

    #[async_trait]
    impl ConnectionStore for YieldingStore {
        async fn active_requests_of(
            &self,
            player: ObjectId,
        ) -> anyhow::Result<Vec<ConnectionRequest>> {
            let requests = self.0.active_requests_of(player).await;
            tokio::task::yield_now().await;
            requests
        }

        async fn insert_request(&self, request: &ConnectionRequest) -> anyhow::Result<bool> {
            self.0.insert_request(request).await
        }

        async fn resolve_pending(
            &self,
            requester: ObjectId,
            recipient: ObjectId,
            status: ConnectionStatus,
        ) -> anyhow::Result<Option<ConnectionRequest>> {
            self.0.resolve_pending(requester, recipient, status).await
        }
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn setup() -> (Arc<MemoryStore>, Router) {
        let store = Arc::new(MemoryStore::default());
        let app = make_router(test_state(store.clone()));
        (store, app)
    }

    #[tokio::test]
    async fn test_requires_token() {
        let (_, app) = setup();
        let (status, body) = send(&app, "GET", "/api/connections", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "No token found");
    }

    #[tokio::test]
    async fn test_rejects_forged_token() {
        let (_, app) = setup();
        let (status, _) = send(&app, "GET", "/api/connections", Some("not.a.jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_from_cookie() {
        let (store, app) = setup();
        let me = store.add_player("ace", None);

        let request = Request::builder()
            .uri("/api/connections")
            .header(header::COOKIE, format!("authorization={}", token_for(&me)))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_empty_connections() {
        let (store, app) = setup();
        let me = store.add_player("ace", None);

        let (status, body) = send(&app, "GET", "/api/connections", Some(&token_for(&me))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["connections"], serde_json::json!([]));
        assert_eq!(body["pendingRequests"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_request_then_accept_flow() {
        let (store, app) = setup();
        let me = store.add_player("ace", Some("Ace"));
        let other = store.add_player("blaze", Some("Blaze"));

        let uri = format!("/api/connections/request/{}", me.id.to_hex());
        let (status, _) = send(&app, "POST", &uri, Some(&token_for(&other))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        // shows up as incoming for the recipient only
        let (_, body) = send(&app, "GET", "/api/connections", Some(&token_for(&me))).await;
        assert_eq!(body["pendingRequests"][0]["username"], "blaze");
        let (_, body) = send(&app, "GET", "/api/connections", Some(&token_for(&other))).await;
        assert_eq!(body["pendingRequests"], serde_json::json!([]));

        let uri = format!("/api/connections/accept/{}", other.id.to_hex());
        let (status, _) = send(&app, "POST", &uri, Some(&token_for(&me))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        for (viewer, expected) in [(&me, "blaze"), (&other, "ace")] {
            let (_, body) = send(&app, "GET", "/api/connections", Some(&token_for(viewer))).await;
            assert_eq!(body["pendingRequests"], serde_json::json!([]));
            assert_eq!(body["connections"].as_array().unwrap().len(), 1);
            assert_eq!(body["connections"][0]["username"], expected);
        }
    }

    #[tokio::test]
    async fn test_reject_removes_pending() {
        let (store, app) = setup();
        let me = store.add_player("ace", None);
        let other = store.add_player("blaze", None);
        store.add_request(ConnectionRequest::new_pending(other.id, me.id));

        let uri = format!("/api/connections/reject/{}", other.id.to_hex());
        let (status, _) = send(&app, "POST", &uri, Some(&token_for(&me))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&app, "GET", "/api/connections", Some(&token_for(&me))).await;
        assert_eq!(body["pendingRequests"], serde_json::json!([]));
        assert_eq!(body["connections"], serde_json::json!([]));
        assert_eq!(store.requests()[0].status, ConnectionStatus::Rejected);

        // a rejected request doesn't block asking again
        let uri = format!("/api/connections/request/{}", me.id.to_hex());
        let (status, _) = send(&app, "POST", &uri, Some(&token_for(&other))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_crossing_requests_leave_one_active() {
        let store = Arc::new(MemoryStore::default());
        let ace = store.add_player("ace", None);
        let blaze = store.add_player("blaze", None);
        let app = make_router(state_with_store(Arc::new(YieldingStore(store.clone()))));

        let to_blaze = format!("/api/connections/request/{}", blaze.id.to_hex());
        let to_ace = format!("/api/connections/request/{}", ace.id.to_hex());
        let (ace_token, blaze_token) = (token_for(&ace), token_for(&blaze));
        let ((first, _), (second, _)) = tokio::join!(
            send(&app, "POST", &to_blaze, Some(&ace_token)),
            send(&app, "POST", &to_ace, Some(&blaze_token)),
        );

        let statuses = [first, second];
        assert!(statuses.contains(&StatusCode::NO_CONTENT), "{statuses:?}");
        assert!(statuses.contains(&StatusCode::CONFLICT), "{statuses:?}");
        let active: Vec<ConnectionRequest> = store
            .requests()
            .into_iter()
            .filter(|r| r.status.is_active())
            .collect();
        assert_eq!(active.len(), 1);

        // the request that went through can be accepted, and only once
        let request = &active[0];
        let (recipient, requester) = if request.recipient == ace.id {
            (&ace, &blaze)
        } else {
            (&blaze, &ace)
        };
        let uri = format!("/api/connections/accept/{}", requester.id.to_hex());
        let (status, _) = send(&app, "POST", &uri, Some(&token_for(recipient))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let uri = format!("/api/connections/accept/{}", recipient.id.to_hex());
        let (status, _) = send(&app, "POST", &uri, Some(&token_for(requester))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        for viewer in [&ace, &blaze] {
            let (_, body) = send(&app, "GET", "/api/connections", Some(&token_for(viewer))).await;
            assert_eq!(body["connections"].as_array().unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_accept_without_pending_request() {
        let (store, app) = setup();
        let me = store.add_player("ace", None);
        let other = store.add_player("blaze", None);

        let uri = format!("/api/connections/accept/{}", other.id.to_hex());
        let (status, body) = send(&app, "POST", &uri, Some(&token_for(&me))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No pending request from this player");
    }

    #[tokio::test]
    async fn test_requester_cannot_accept_own_request() {
        let (store, app) = setup();
        let me = store.add_player("ace", None);
        let other = store.add_player("blaze", None);
        store.add_request(ConnectionRequest::new_pending(me.id, other.id));

        let uri = format!("/api/connections/accept/{}", other.id.to_hex());
        let (status, _) = send(&app, "POST", &uri, Some(&token_for(&me))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_accepting_twice_only_succeeds_once() {
        let (store, app) = setup();
        let me = store.add_player("ace", None);
        let other = store.add_player("blaze", None);
        store.add_request(ConnectionRequest::new_pending(other.id, me.id));

        let uri = format!("/api/connections/accept/{}", other.id.to_hex());
        let (first, _) = send(&app, "POST", &uri, Some(&token_for(&me))).await;
        let (second, _) = send(&app, "POST", &uri, Some(&token_for(&me))).await;
        assert_eq!(first, StatusCode::NO_CONTENT);
        assert_eq!(second, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_duplicate_request_conflicts() {
        let (store, app) = setup();
        let me = store.add_player("ace", None);
        let other = store.add_player("blaze", None);
        store.add_request(ConnectionRequest::new_pending(other.id, me.id));

        // the other direction counts too
        let uri = format!("/api/connections/request/{}", other.id.to_hex());
        let (status, body) = send(&app, "POST", &uri, Some(&token_for(&me))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "A request between you is already pending");
    }

    #[tokio::test]
    async fn test_request_validation() {
        let (store, app) = setup();
        let me = store.add_player("ace", None);
        let token = token_for(&me);

        let uri = format!("/api/connections/request/{}", me.id.to_hex());
        let (status, _) = send(&app, "POST", &uri, Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, "POST", "/api/connections/request/zzz", Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid player ID");

        let uri = format!("/api/connections/request/{}", ObjectId::new().to_hex());
        let (status, _) = send(&app, "POST", &uri, Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_player() {
        let (store, app) = setup();
        let me = store.add_player("ace", Some("Ace"));

        let uri = format!("/api/players/{}", me.id.to_hex());
        let (status, body) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["displayName"], "Ace");

        let uri = format!("/api/players/{}", ObjectId::new().to_hex());
        let (status, _) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
