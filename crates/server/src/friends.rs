//! Friendship API endpoints.

use api_types::friend::{FriendRequestNew, FriendRequestView, FriendsResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{ServerError, server::ServerState, user};

/// Sends a friend request to another user.
pub async fn request(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<FriendRequestNew>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .request_friendship(&user.username, &payload.recipient, Utc::now())
        .await?;
    Ok(StatusCode::CREATED)
}

/// Pending requests addressed to the authenticated user.
pub async fn pending(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<FriendRequestView>>, ServerError> {
    let requests = state.engine.requests_for(&user.username).await?;
    Ok(Json(
        requests
            .into_iter()
            .map(|r| FriendRequestView {
                requester: r.requester,
                created_at: r.created_at,
            })
            .collect(),
    ))
}

/// Accepts a pending request; the friendship becomes mutual atomically.
pub async fn accept(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(requester): Path<String>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .accept_friendship(&user.username, &requester, Utc::now())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Blocks another user.
pub async fn block(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(username): Path<String>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .block_user(&user.username, &username, Utc::now())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Accepted friends of the authenticated user.
pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<FriendsResponse>, ServerError> {
    let friends = state.engine.friends_of(&user.username).await?;
    Ok(Json(FriendsResponse { friends }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::server::tests::{send_json, test_router};

    #[tokio::test]
    async fn request_accept_and_list() {
        let (router, _db) = test_router().await;

        let (status, _) = send_json(
            &router,
            "POST",
            "/friends/requests",
            Some("alice"),
            json!({"recipient": "bob"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send_json(
            &router,
            "GET",
            "/friends/requests",
            Some("bob"),
            serde_json::Value::Null,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["requester"], "alice");

        let (status, _) = send_json(
            &router,
            "POST",
            "/friends/requests/alice/accept",
            Some("bob"),
            serde_json::Value::Null,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send_json(
            &router,
            "GET",
            "/friends",
            Some("alice"),
            serde_json::Value::Null,
        )
        .await;
        assert_eq!(body["friends"][0], "bob");
    }

    #[tokio::test]
    async fn duplicate_request_conflicts() {
        let (router, _db) = test_router().await;
        send_json(
            &router,
            "POST",
            "/friends/requests",
            Some("alice"),
            json!({"recipient": "bob"}),
        )
        .await;

        let (status, _) = send_json(
            &router,
            "POST",
            "/friends/requests",
            Some("bob"),
            json!({"recipient": "alice"}),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
