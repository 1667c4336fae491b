//! Pairwise balance endpoint.

use api_types::balance::PairBalance;
use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{ServerError, currency_to_api, server::ServerState, user};

/// Pending debt between the authenticated user and another user, derived
/// from pending obligations only.
pub async fn between(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(username): Path<String>,
) -> Result<Json<PairBalance>, ServerError> {
    let balance = state.engine.balance_between(&user.username, &username).await?;
    let net = balance.net()?;

    Ok(Json(PairBalance {
        other: username,
        owes_minor: balance.owes.minor(),
        owed_to_minor: balance.owed_to.minor(),
        net_minor: net.minor(),
        currency: currency_to_api(net.currency()),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::server::tests::{send_json, test_router};

    #[tokio::test]
    async fn balance_reflects_pending_obligations() {
        let (router, _db) = test_router().await;
        send_json(
            &router,
            "POST",
            "/bills",
            Some("alice"),
            json!({
                "merchant_name": "Cafe Azzurro",
                "items": [],
                "subtotal_minor": 9000,
                "tax_minor": 0,
                "tip_minor": 0,
                "total_minor": 9000,
                "currency": "INR",
                "participants": ["bob"],
                "strategy": {"kind": "equal"},
                "ocr_data": null,
            }),
        )
        .await;

        let (status, body) = send_json(
            &router,
            "GET",
            "/balance/alice",
            Some("bob"),
            serde_json::Value::Null,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["owes_minor"], 4500);
        assert_eq!(body["owed_to_minor"], 0);
        assert_eq!(body["net_minor"], -4500);
    }
}
