//! Bill primitives.
//!
//! A `Bill` is the transactional aggregate root: its items, participants and
//! initial obligations are created atomically, and the subtotal/tax/tip/total
//! invariant is rejected before any write.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, Money, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Active,
    Settled,
    Cancelled,
}

impl BillStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Settled => "settled",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for BillStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "settled" => Ok(Self::Settled),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid bill status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bill {
    pub id: Uuid,
    pub created_by: String,
    pub merchant_name: String,
    pub subtotal: Money,
    pub tax: Money,
    pub tip: Money,
    pub total: Money,
    pub status: BillStatus,
    /// Raw extraction payload, kept verbatim for audit/debugging only.
    pub ocr_data: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Bill {
    /// Builds a new active bill, enforcing
    /// `|total - (subtotal + tax + tip)| <= 1` minor unit.
    pub fn new(
        created_by: String,
        merchant_name: String,
        subtotal: Money,
        tax: Money,
        tip: Money,
        total: Money,
        ocr_data: Option<String>,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if total.is_negative() || subtotal.is_negative() || tax.is_negative() || tip.is_negative()
        {
            return Err(EngineError::InvalidTotals(
                "amounts must not be negative".to_string(),
            ));
        }
        let expected = subtotal.checked_add(tax)?.checked_add(tip)?;
        let drift = total.checked_sub(expected)?.minor().abs();
        if drift > 1 {
            return Err(EngineError::InvalidTotals(format!(
                "total {total} does not match subtotal {subtotal} + tax {tax} + tip {tip}"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            created_by,
            merchant_name,
            subtotal,
            tax,
            tip,
            total,
            status: BillStatus::Active,
            ocr_data,
            created_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "bills")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub created_by: String,
    pub merchant_name: String,
    pub subtotal_minor: i64,
    pub tax_minor: i64,
    pub tip_minor: i64,
    pub total_minor: i64,
    pub currency: String,
    pub status: String,
    pub ocr_data: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bill_items::Entity")]
    BillItems,
    #[sea_orm(has_many = "super::participants::Entity")]
    Participants,
}

impl Related<super::bill_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillItems.def()
    }
}

impl Related<super::participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Bill> for ActiveModel {
    fn from(bill: &Bill) -> Self {
        Self {
            id: ActiveValue::Set(bill.id.to_string()),
            created_by: ActiveValue::Set(bill.created_by.clone()),
            merchant_name: ActiveValue::Set(bill.merchant_name.clone()),
            subtotal_minor: ActiveValue::Set(bill.subtotal.minor()),
            tax_minor: ActiveValue::Set(bill.tax.minor()),
            tip_minor: ActiveValue::Set(bill.tip.minor()),
            total_minor: ActiveValue::Set(bill.total.minor()),
            currency: ActiveValue::Set(bill.total.currency().code().to_string()),
            status: ActiveValue::Set(bill.status.as_str().to_string()),
            ocr_data: ActiveValue::Set(bill.ocr_data.clone()),
            created_at: ActiveValue::Set(bill.created_at),
        }
    }
}

impl TryFrom<Model> for Bill {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        let currency = Currency::try_from(model.currency.as_str())?;
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("bill not exists".to_string()))?,
            created_by: model.created_by,
            merchant_name: model.merchant_name,
            subtotal: Money::new(model.subtotal_minor, currency),
            tax: Money::new(model.tax_minor, currency),
            tip: Money::new(model.tip_minor, currency),
            total: Money::new(model.total_minor, currency),
            status: BillStatus::try_from(model.status.as_str())?,
            ocr_data: model.ocr_data,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inr(minor: i64) -> Money {
        Money::new(minor, Currency::Inr)
    }

    #[test]
    fn new_accepts_totals_within_one_minor_unit() {
        let bill = Bill::new(
            "alice".to_string(),
            "Cafe Azzurro".to_string(),
            inr(9500),
            inr(500),
            inr(0),
            inr(10_001),
            None,
            Utc::now(),
        );
        assert!(bill.is_ok());
    }

    #[test]
    fn new_rejects_mismatched_totals() {
        let bill = Bill::new(
            "alice".to_string(),
            "Cafe Azzurro".to_string(),
            inr(9500),
            inr(500),
            inr(0),
            inr(10_100),
            None,
            Utc::now(),
        );
        assert!(matches!(bill, Err(EngineError::InvalidTotals(_))));
    }

    #[test]
    fn new_rejects_negative_amounts() {
        let bill = Bill::new(
            "alice".to_string(),
            "Cafe Azzurro".to_string(),
            inr(-100),
            inr(0),
            inr(0),
            inr(-100),
            None,
            Utc::now(),
        );
        assert!(matches!(bill, Err(EngineError::InvalidTotals(_))));
    }
}
