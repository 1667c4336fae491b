use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{Currency, EngineError, Money, ResultEngine};

/// A user attached to a bill with their computed share.
///
/// For a given bill the participant shares sum **exactly** to the bill
/// total; the allocation assigns any rounding remainder deterministically.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub id: Uuid,
    pub user: String,
    pub share: Money,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Participant {
    pub fn new(user: String, share: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            share,
            is_paid: false,
            paid_at: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "bill_participants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub bill_id: String,
    pub user_id: String,
    pub share_minor: i64,
    pub currency: String,
    pub is_paid: bool,
    pub paid_at: Option<DateTimeUtc>,
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

impl Participant {
    pub(crate) fn to_active_model(&self, bill_id: Uuid) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::Set(self.id.to_string()),
            bill_id: ActiveValue::Set(bill_id.to_string()),
            user_id: ActiveValue::Set(self.user.clone()),
            share_minor: ActiveValue::Set(self.share.minor()),
            currency: ActiveValue::Set(self.share.currency().code().to_string()),
            is_paid: ActiveValue::Set(self.is_paid),
            paid_at: ActiveValue::Set(self.paid_at),
        }
    }
}

impl TryFrom<Model> for Participant {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        let currency = Currency::try_from(model.currency.as_str())?;
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("participant not exists".to_string()))?,
            user: model.user_id,
            share: Money::new(model.share_minor, currency),
            is_paid: model.is_paid,
            paid_at: model.paid_at,
        })
    }
}
