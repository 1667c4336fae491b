//! Settlement API endpoints.
//!
//! `/payments/confirm` is the gateway callback. It carries its own HMAC
//! signature and is deliberately outside the Basic-auth layer; a duplicate
//! delivery answers 200 with `status: "duplicate"` so the gateway stops
//! retrying.

use api_types::payment::{GatewayConfirmation, PaymentView, SettlementNew, SettlementResult};
use axum::{Extension, Json, extract::State, http::StatusCode};
use chrono::Utc;

use crate::{ServerError, currency_from_api, currency_to_api, server::ServerState, user};
use engine::{Confirmation, SettlementOutcome};

fn payment_view(payment: engine::Payment) -> PaymentView {
    PaymentView {
        id: payment.id,
        bill_id: payment.bill_id,
        obligation_id: payment.obligation_id,
        payer: payment.payer,
        payee: payment.payee,
        amount_minor: payment.amount.minor(),
        currency: currency_to_api(payment.amount.currency()),
        external_ref: payment.external_ref,
        status: payment.status.as_str().to_string(),
    }
}

/// Records a transfer handed to the gateway, pinning amount and parties to
/// the order reference.
pub async fn initiate(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<SettlementNew>,
) -> Result<(StatusCode, Json<PaymentView>), ServerError> {
    let payment = state
        .engine
        .initiate_settlement(
            payload.obligation_id,
            &payload.order_ref,
            &user.username,
            Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(payment_view(payment))))
}

/// Applies a signed gateway confirmation to the ledger.
pub async fn confirm(
    State(state): State<ServerState>,
    Json(payload): Json<GatewayConfirmation>,
) -> Result<Json<SettlementResult>, ServerError> {
    let confirmation = Confirmation {
        order_ref: payload.order_ref,
        payment_ref: payload.payment_ref,
        bill_id: payload.bill_id,
        payer: payload.payer,
        payee: payload.payee,
        amount_minor: payload.amount_minor,
        currency: currency_from_api(payload.currency),
        signature: payload.signature,
    };

    let outcome = state
        .engine
        .apply_confirmation(&confirmation, Utc::now())
        .await?;

    let status = match &outcome {
        SettlementOutcome::Settled(_) => "settled",
        SettlementOutcome::Duplicate(_) => "duplicate",
    };
    Ok(Json(SettlementResult {
        status: status.to_string(),
        payment_id: outcome.payment().id,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::server::tests::{send_json, sign_confirmation, test_router};

    async fn bill_with_obligation(router: &axum::Router) -> (String, i64) {
        let (_, body) = send_json(
            router,
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
        (body["id"].as_str().unwrap().to_string(), 4500)
    }

    fn confirmation_body(bill_id: &str, amount: i64, order_ref: &str) -> serde_json::Value {
        let mut body = json!({
            "order_ref": order_ref,
            "payment_ref": format!("TXN_{order_ref}"),
            "bill_id": bill_id,
            "payer": "bob",
            "payee": "alice",
            "amount_minor": amount,
            "currency": "INR",
            "signature": "",
        });
        sign_confirmation(&mut body);
        body
    }

    #[tokio::test]
    async fn callback_settles_then_reports_duplicate() {
        let (router, _db) = test_router().await;
        let (bill_id, owed) = bill_with_obligation(&router).await;
        let body = confirmation_body(&bill_id, owed, "SPLIT_HTTP_1");

        let (status, first) =
            send_json(&router, "POST", "/payments/confirm", None, body.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["status"], "settled");

        let (status, second) = send_json(&router, "POST", "/payments/confirm", None, body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["status"], "duplicate");
        assert_eq!(first["payment_id"], second["payment_id"]);
    }

    #[tokio::test]
    async fn forged_signature_is_forbidden() {
        let (router, _db) = test_router().await;
        let (bill_id, owed) = bill_with_obligation(&router).await;
        let mut body = confirmation_body(&bill_id, owed, "SPLIT_HTTP_2");
        body["amount_minor"] = json!(owed - 1000);

        let (status, _) = send_json(&router, "POST", "/payments/confirm", None, body).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn initiate_requires_the_payer() {
        let (router, db) = test_router().await;
        let (bill_id, _) = bill_with_obligation(&router).await;

        // Fish the obligation id out of the database.
        use sea_orm::{ConnectionTrait, Statement};
        let row = db
            .query_one(Statement::from_sql_and_values(
                db.get_database_backend(),
                "SELECT id FROM obligations WHERE bill_id = ?",
                vec![bill_id.clone().into()],
            ))
            .await
            .unwrap()
            .unwrap();
        let obligation_id: String = row.try_get("", "id").unwrap();

        let (status, _) = send_json(
            &router,
            "POST",
            "/payments",
            Some("carol"),
            json!({"obligation_id": obligation_id, "order_ref": "SPLIT_HTTP_3"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send_json(
            &router,
            "POST",
            "/payments",
            Some("bob"),
            json!({"obligation_id": obligation_id, "order_ref": "SPLIT_HTTP_3"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["amount_minor"], 4500);
    }
}
