use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{Currency, EngineError, Money, ResultEngine};

/// A line item owned by exactly one bill (deleted with it).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BillItem {
    pub id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl BillItem {
    pub fn new(name: String, unit_price: Money, quantity: u32) -> ResultEngine<Self> {
        if quantity == 0 {
            return Err(EngineError::InvalidAmount(format!(
                "item \"{name}\" must have a positive quantity"
            )));
        }
        if unit_price.is_negative() {
            return Err(EngineError::InvalidAmount(format!(
                "item \"{name}\" must not have a negative price"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            unit_price,
            quantity,
        })
    }

    /// Price multiplied by quantity.
    pub fn line_total(&self) -> ResultEngine<Money> {
        self.unit_price.multiply_by_quantity(self.quantity)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "bill_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub bill_id: String,
    pub name: String,
    pub unit_price_minor: i64,
    pub currency: String,
    pub quantity: i32,
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

impl BillItem {
    pub(crate) fn to_active_model(&self, bill_id: Uuid) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::Set(self.id.to_string()),
            bill_id: ActiveValue::Set(bill_id.to_string()),
            name: ActiveValue::Set(self.name.clone()),
            unit_price_minor: ActiveValue::Set(self.unit_price.minor()),
            currency: ActiveValue::Set(self.unit_price.currency().code().to_string()),
            quantity: ActiveValue::Set(self.quantity as i32),
        }
    }
}

impl TryFrom<Model> for BillItem {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        let quantity = u32::try_from(model.quantity)
            .map_err(|_| EngineError::InvalidAmount("invalid item quantity".to_string()))?;
        let currency = Currency::try_from(model.currency.as_str())?;
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("bill item not exists".to_string()))?,
            name: model.name,
            unit_price: Money::new(model.unit_price_minor, currency),
            quantity,
        })
    }
}
