//! Bill API endpoints.

use api_types::bill::{
    BillDetails, BillItemNew, BillItemView, BillNew, BillView, ParticipantView, SplitStrategy,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, currency_from_api, currency_to_api, server::ServerState, user};
use engine::{CreateBill, Money, NewBillItem};

fn bill_view(bill: engine::Bill) -> BillView {
    BillView {
        id: bill.id,
        created_by: bill.created_by,
        merchant_name: bill.merchant_name,
        subtotal_minor: bill.subtotal.minor(),
        tax_minor: bill.tax.minor(),
        tip_minor: bill.tip.minor(),
        total_minor: bill.total.minor(),
        currency: currency_to_api(bill.total.currency()),
        status: bill.status.as_str().to_string(),
        created_at: bill.created_at,
    }
}

fn strategy_from_api(strategy: SplitStrategy) -> engine::SplitStrategy {
    match strategy {
        SplitStrategy::Equal => engine::SplitStrategy::Equal,
        SplitStrategy::ByItem { assignments } => engine::SplitStrategy::ByItem(
            assignments
                .into_iter()
                .map(|a| engine::ItemAssignment {
                    item_index: a.item_index,
                    participants: a.participants,
                    weights: a.weights,
                })
                .collect(),
        ),
    }
}

/// Handle requests for creating a new bill.
pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<BillNew>,
) -> Result<(StatusCode, Json<BillView>), ServerError> {
    let currency = currency_from_api(payload.currency);
    let items = payload
        .items
        .into_iter()
        .map(|item: BillItemNew| NewBillItem {
            name: item.name,
            unit_price: Money::new(item.unit_price_minor, currency),
            quantity: item.quantity,
        })
        .collect();

    let bill = state
        .engine
        .create_bill(CreateBill {
            creator: user.username,
            merchant_name: payload.merchant_name,
            items,
            subtotal: Money::new(payload.subtotal_minor, currency),
            tax: Money::new(payload.tax_minor, currency),
            tip: Money::new(payload.tip_minor, currency),
            total: Money::new(payload.total_minor, currency),
            participants: payload.participants,
            strategy: strategy_from_api(payload.strategy),
            ocr_data: payload.ocr_data,
            created_at: Utc::now(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(bill_view(bill))))
}

/// Bills the user created or participates in, newest first.
pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<BillView>>, ServerError> {
    let bills = state.engine.bills_for_user(&user.username).await?;
    Ok(Json(bills.into_iter().map(bill_view).collect()))
}

/// One bill with items and participant shares.
pub async fn detail(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BillDetails>, ServerError> {
    let details = state.engine.bill_with_details(id, &user.username).await?;

    Ok(Json(BillDetails {
        bill: bill_view(details.bill),
        items: details
            .items
            .into_iter()
            .map(|item| BillItemView {
                id: item.id,
                name: item.name,
                unit_price_minor: item.unit_price.minor(),
                quantity: item.quantity,
            })
            .collect(),
        participants: details
            .participants
            .into_iter()
            .map(|p| ParticipantView {
                user: p.user,
                share_minor: p.share.minor(),
                is_paid: p.is_paid,
                paid_at: p.paid_at,
            })
            .collect(),
    }))
}

/// Cancels an active bill; creator only.
pub async fn cancel(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.cancel_bill(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
