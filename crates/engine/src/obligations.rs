//! Obligation primitives.
//!
//! An obligation is a directed pending debt (payer owes payee) for one
//! bill. The ledger is append-only: an obligation only ever moves
//! `pending -> settled` (verified payment) or `pending -> cancelled` (bill
//! cancelled first), never out of a terminal state.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, Money, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationStatus {
    Pending,
    Settled,
    Cancelled,
}

impl ObligationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Settled => "settled",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for ObligationStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "settled" => Ok(Self::Settled),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid obligation status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Obligation {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub payer: String,
    pub payee: String,
    pub amount: Money,
    pub status: ObligationStatus,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Obligation {
    pub fn new(
        bill_id: Uuid,
        payer: String,
        payee: String,
        amount: Money,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount.is_negative() || amount.is_zero() {
            return Err(EngineError::InvalidAmount(
                "obligation amount must be positive".to_string(),
            ));
        }
        if payer == payee {
            return Err(EngineError::InvalidAmount(
                "payer and payee must differ".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            bill_id,
            payer,
            payee,
            amount,
            status: ObligationStatus::Pending,
            created_at,
            settled_at: None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "obligations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub bill_id: String,
    pub payer_id: String,
    pub payee_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub settled_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bills::Entity",
        from = "Column::BillId",
        to = "super::bills::Column::Id"
    )]
    Bills,
}

impl Related<super::bills::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bills.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Obligation> for ActiveModel {
    fn from(obligation: &Obligation) -> Self {
        Self {
            id: ActiveValue::Set(obligation.id.to_string()),
            bill_id: ActiveValue::Set(obligation.bill_id.to_string()),
            payer_id: ActiveValue::Set(obligation.payer.clone()),
            payee_id: ActiveValue::Set(obligation.payee.clone()),
            amount_minor: ActiveValue::Set(obligation.amount.minor()),
            currency: ActiveValue::Set(obligation.amount.currency().code().to_string()),
            status: ActiveValue::Set(obligation.status.as_str().to_string()),
            created_at: ActiveValue::Set(obligation.created_at),
            settled_at: ActiveValue::Set(obligation.settled_at),
        }
    }
}

impl TryFrom<Model> for Obligation {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        let currency = Currency::try_from(model.currency.as_str())?;
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("obligation not exists".to_string()))?,
            bill_id: Uuid::parse_str(&model.bill_id)
                .map_err(|_| EngineError::KeyNotFound("bill not exists".to_string()))?,
            payer: model.payer_id,
            payee: model.payee_id,
            amount: Money::new(model.amount_minor, currency),
            status: ObligationStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            settled_at: model.settled_at,
        })
    }
}
