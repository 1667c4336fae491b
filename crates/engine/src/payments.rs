//! Payment primitives.
//!
//! A payment tracks one gateway transfer against one obligation. The
//! `external_ref` (gateway order reference) is the idempotency key: the
//! schema enforces at most one payment row per reference, so a confirmation
//! can complete at most one payment no matter how often it is delivered.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, Money, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid payment status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payment {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub obligation_id: Uuid,
    pub payer: String,
    pub payee: String,
    pub amount: Money,
    /// Gateway order reference; unique, the idempotency key.
    pub external_ref: String,
    /// Gateway-side transaction id, known once the confirmation arrives.
    pub gateway_payment_ref: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn new(
        bill_id: Uuid,
        obligation_id: Uuid,
        payer: String,
        payee: String,
        amount: Money,
        external_ref: String,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if external_ref.trim().is_empty() {
            return Err(EngineError::InvalidAmount(
                "external reference must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            bill_id,
            obligation_id,
            payer,
            payee,
            amount,
            external_ref,
            gateway_payment_ref: None,
            status: PaymentStatus::Pending,
            created_at,
            completed_at: None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub bill_id: String,
    pub obligation_id: String,
    pub payer_id: String,
    pub payee_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub external_ref: String,
    pub gateway_payment_ref: Option<String>,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Payment> for ActiveModel {
    fn from(payment: &Payment) -> Self {
        Self {
            id: ActiveValue::Set(payment.id.to_string()),
            bill_id: ActiveValue::Set(payment.bill_id.to_string()),
            obligation_id: ActiveValue::Set(payment.obligation_id.to_string()),
            payer_id: ActiveValue::Set(payment.payer.clone()),
            payee_id: ActiveValue::Set(payment.payee.clone()),
            amount_minor: ActiveValue::Set(payment.amount.minor()),
            currency: ActiveValue::Set(payment.amount.currency().code().to_string()),
            external_ref: ActiveValue::Set(payment.external_ref.clone()),
            gateway_payment_ref: ActiveValue::Set(payment.gateway_payment_ref.clone()),
            status: ActiveValue::Set(payment.status.as_str().to_string()),
            created_at: ActiveValue::Set(payment.created_at),
            completed_at: ActiveValue::Set(payment.completed_at),
        }
    }
}

impl TryFrom<Model> for Payment {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        let currency = Currency::try_from(model.currency.as_str())?;
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("payment not exists".to_string()))?,
            bill_id: Uuid::parse_str(&model.bill_id)
                .map_err(|_| EngineError::KeyNotFound("bill not exists".to_string()))?,
            obligation_id: Uuid::parse_str(&model.obligation_id)
                .map_err(|_| EngineError::KeyNotFound("obligation not exists".to_string()))?,
            payer: model.payer_id,
            payee: model.payee_id,
            amount: Money::new(model.amount_minor, currency),
            external_ref: model.external_ref,
            gateway_payment_ref: model.gateway_payment_ref,
            status: PaymentStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            completed_at: model.completed_at,
        })
    }
}
