use chrono::{DateTime, Utc};
use sea_orm::{
    Condition, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Bill, BillItem, BillStatus, EngineError, ExpenseSplit, Money, ObligationStatus, Participant,
    ResultEngine, SplitStrategy, bill_items, bills, expense_splits, obligations, participants,
    split::{self, BillTotals},
};

use super::{Engine, normalize_required_name, with_tx};

/// One line of a bill being created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBillItem {
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

/// Everything needed to create a bill in one shot.
#[derive(Clone, Debug)]
pub struct CreateBill {
    pub creator: String,
    pub merchant_name: String,
    pub items: Vec<NewBillItem>,
    pub subtotal: Money,
    pub tax: Money,
    pub tip: Money,
    pub total: Money,
    /// Participants besides the creator; the creator is always included.
    pub participants: Vec<String>,
    pub strategy: SplitStrategy,
    pub ocr_data: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A bill with its items and participant shares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BillDetails {
    pub bill: Bill,
    pub items: Vec<BillItem>,
    pub participants: Vec<Participant>,
}

impl Engine {
    /// Creates a bill with its items, participant shares, item splits and
    /// obligations in one DB transaction.
    ///
    /// Shares are computed before anything is written; a failed validation
    /// leaves the database untouched. Every non-creator participant with a
    /// positive share gets one pending obligation towards the creator.
    pub async fn create_bill(&self, command: CreateBill) -> ResultEngine<Bill> {
        let merchant_name = normalize_required_name(&command.merchant_name, "merchant name")?;

        let bill = Bill::new(
            command.creator.clone(),
            merchant_name,
            command.subtotal,
            command.tax,
            command.tip,
            command.total,
            command.ocr_data,
            command.created_at,
        )?;

        let mut items = Vec::with_capacity(command.items.len());
        for new_item in &command.items {
            new_item.unit_price.ensure_same_currency(command.total)?;
            items.push(BillItem::new(
                new_item.name.clone(),
                new_item.unit_price,
                new_item.quantity,
            )?);
        }

        // The creator always participates and comes first, so equal-split
        // remainders land on them.
        let mut participant_names = vec![command.creator.clone()];
        for name in &command.participants {
            if !participant_names.contains(name) {
                participant_names.push(name.clone());
            }
        }

        let totals = BillTotals {
            subtotal: command.subtotal,
            tax: command.tax,
            tip: command.tip,
            total: command.total,
        };
        let shares = split::compute_shares(&totals, &items, &participant_names, &command.strategy)?;

        let mut obligation_rows = Vec::new();
        for (user, share) in &shares.participants {
            if user != &command.creator && !share.is_zero() {
                obligation_rows.push(crate::Obligation::new(
                    bill.id,
                    user.clone(),
                    command.creator.clone(),
                    *share,
                    command.created_at,
                )?);
            }
        }

        with_tx!(self, |db_tx| {
            bills::ActiveModel::from(&bill).insert(&db_tx).await?;

            for item in &items {
                item.to_active_model(bill.id).insert(&db_tx).await?;
            }

            for (user, share) in &shares.participants {
                Participant::new(user.clone(), *share)
                    .to_active_model(bill.id)
                    .insert(&db_tx)
                    .await?;
            }

            for item_split in &shares.item_splits {
                let item_id = items[item_split.item_index].id;
                let split_row =
                    ExpenseSplit::new(item_id, item_split.user.clone(), item_split.amount);
                expense_splits::ActiveModel::from(&split_row)
                    .insert(&db_tx)
                    .await?;
            }

            for obligation in &obligation_rows {
                super::ledger::record_obligation(&db_tx, obligation).await?;
            }

            Ok(bill.clone())
        })
    }

    /// Loads one bill with items and participant shares.
    ///
    /// Only the creator and the bill's participants may read it; everyone
    /// else gets the same error as a missing bill.
    pub async fn bill_with_details(&self, bill_id: Uuid, user_id: &str) -> ResultEngine<BillDetails> {
        let bill_model = bills::Entity::find_by_id(bill_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("bill not exists".to_string()))?;

        let participant_models = participants::Entity::find()
            .filter(participants::Column::BillId.eq(bill_id.to_string()))
            .all(&self.database)
            .await?;

        let allowed = bill_model.created_by == user_id
            || participant_models.iter().any(|p| p.user_id == user_id);
        if !allowed {
            return Err(EngineError::KeyNotFound("bill not exists".to_string()));
        }

        let item_models = bill_items::Entity::find()
            .filter(bill_items::Column::BillId.eq(bill_id.to_string()))
            .all(&self.database)
            .await?;

        Ok(BillDetails {
            bill: Bill::try_from(bill_model)?,
            items: item_models
                .into_iter()
                .map(BillItem::try_from)
                .collect::<ResultEngine<_>>()?,
            participants: participant_models
                .into_iter()
                .map(Participant::try_from)
                .collect::<ResultEngine<_>>()?,
        })
    }

    /// All bills the user created or participates in, newest first.
    pub async fn bills_for_user(&self, user_id: &str) -> ResultEngine<Vec<Bill>> {
        let participating: Vec<String> = participants::Entity::find()
            .filter(participants::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|p| p.bill_id)
            .collect();

        let bill_models = bills::Entity::find()
            .filter(
                Condition::any()
                    .add(bills::Column::CreatedBy.eq(user_id))
                    .add(bills::Column::Id.is_in(participating)),
            )
            .order_by_desc(bills::Column::CreatedAt)
            .all(&self.database)
            .await?;

        bill_models.into_iter().map(Bill::try_from).collect()
    }

    /// Cancels an active bill and voids its pending obligations.
    ///
    /// Only the creator may cancel. Cancelling twice is a no-op; a settled
    /// bill can no longer be cancelled.
    pub async fn cancel_bill(&self, bill_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let bill_model = bills::Entity::find_by_id(bill_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("bill not exists".to_string()))?;
            if bill_model.created_by != user_id {
                return Err(EngineError::KeyNotFound("bill not exists".to_string()));
            }

            match BillStatus::try_from(bill_model.status.as_str())? {
                BillStatus::Cancelled => return Ok(()),
                BillStatus::Settled => {
                    return Err(EngineError::AlreadySettled(bill_id.to_string()));
                }
                BillStatus::Active => {}
            }

            bills::Entity::update_many()
                .col_expr(
                    bills::Column::Status,
                    Expr::value(BillStatus::Cancelled.as_str()),
                )
                .filter(bills::Column::Id.eq(bill_id.to_string()))
                .exec(&db_tx)
                .await?;

            obligations::Entity::update_many()
                .col_expr(
                    obligations::Column::Status,
                    Expr::value(ObligationStatus::Cancelled.as_str()),
                )
                .filter(obligations::Column::BillId.eq(bill_id.to_string()))
                .filter(obligations::Column::Status.eq(ObligationStatus::Pending.as_str()))
                .exec(&db_tx)
                .await?;

            Ok(())
        })
    }
}
