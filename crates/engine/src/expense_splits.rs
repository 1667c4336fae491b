use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{Currency, EngineError, Money, ResultEngine};

/// Item-level share, present only when a bill is split `ByItem`.
///
/// The splits of a given item sum to that item's line total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpenseSplit {
    pub id: Uuid,
    pub bill_item_id: Uuid,
    pub user: String,
    pub share: Money,
}

impl ExpenseSplit {
    pub fn new(bill_item_id: Uuid, user: String, share: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            bill_item_id,
            user,
            share,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "expense_splits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub bill_item_id: String,
    pub user_id: String,
    pub share_minor: i64,
    pub currency: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bill_items::Entity",
        from = "Column::BillItemId",
        to = "super::bill_items::Column::Id"
    )]
    BillItems,
}

impl Related<super::bill_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ExpenseSplit> for ActiveModel {
    fn from(split: &ExpenseSplit) -> Self {
        Self {
            id: ActiveValue::Set(split.id.to_string()),
            bill_item_id: ActiveValue::Set(split.bill_item_id.to_string()),
            user_id: ActiveValue::Set(split.user.clone()),
            share_minor: ActiveValue::Set(split.share.minor()),
            currency: ActiveValue::Set(split.share.currency().code().to_string()),
        }
    }
}

impl TryFrom<Model> for ExpenseSplit {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        let currency = Currency::try_from(model.currency.as_str())?;
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("expense split not exists".to_string()))?,
            bill_item_id: Uuid::parse_str(&model.bill_item_id)
                .map_err(|_| EngineError::KeyNotFound("bill item not exists".to_string()))?,
            user: model.user_id,
            share: Money::new(model.share_minor, currency),
        })
    }
}
