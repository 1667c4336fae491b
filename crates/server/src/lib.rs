use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use extract::{BillExtractor, ExtractionError};
pub use server::{ServerState, run, run_with_listener, spawn_with_listener};

mod balance;
mod bills;
mod extract;
mod friends;
mod payments;
mod server;
mod user;

pub mod types {
    pub mod bill {
        pub use api_types::bill::{BillDetails, BillNew, BillView, SplitStrategy};
    }

    pub mod friend {
        pub use api_types::friend::{FriendRequestNew, FriendRequestView, FriendsResponse};
    }

    pub mod payment {
        pub use api_types::payment::{GatewayConfirmation, SettlementNew, SettlementResult};
    }

    pub mod balance {
        pub use api_types::balance::PairBalance;
    }

    pub mod extract {
        pub use api_types::extract::{ExtractRequest, ExtractedBill};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Extraction(String),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::InvalidSignature(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_)
        | EngineError::AlreadySettled(_)
        | EngineError::AmountMismatch(_)
        | EngineError::ObligationNotSettleable(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidTotals(_)
        | EngineError::CurrencyMismatch(_)
        | EngineError::EmptyParticipantSet
        | EngineError::UnassignedItem(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Extraction(err) => (StatusCode::BAD_GATEWAY, err),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

pub(crate) fn currency_from_api(currency: api_types::Currency) -> engine::Currency {
    match currency {
        api_types::Currency::Inr => engine::Currency::Inr,
        api_types::Currency::Eur => engine::Currency::Eur,
        api_types::Currency::Usd => engine::Currency::Usd,
    }
}

pub(crate) fn currency_to_api(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Inr => api_types::Currency::Inr,
        engine::Currency::Eur => api_types::Currency::Eur,
        engine::Currency::Usd => api_types::Currency::Usd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_signature_maps_to_403() {
        let res = ServerError::from(EngineError::InvalidSignature("ORDER_1".to_string()))
            .into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        let res = ServerError::from(EngineError::KeyNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn settlement_conflicts_map_to_409() {
        for err in [
            EngineError::ExistingKey("x".to_string()),
            EngineError::AlreadySettled("x".to_string()),
            EngineError::AmountMismatch("x".to_string()),
            EngineError::ObligationNotSettleable("x".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn validation_errors_map_to_422() {
        for err in [
            EngineError::InvalidAmount("x".to_string()),
            EngineError::InvalidTotals("x".to_string()),
            EngineError::CurrencyMismatch("x".to_string()),
            EngineError::EmptyParticipantSet,
            EngineError::UnassignedItem("x".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[test]
    fn extraction_failure_maps_to_502() {
        let res = ServerError::Extraction("backend down".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
