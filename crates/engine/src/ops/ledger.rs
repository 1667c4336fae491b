use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, QueryFilter, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    BillStatus, Currency, EngineError, Money, Obligation, ObligationStatus, ResultEngine, bills,
    obligations, participants,
};

use super::Engine;

/// Pending debt between two users, both directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairBalance {
    /// What `user` still owes `other`.
    pub owes: Money,
    /// What `other` still owes `user`.
    pub owed_to: Money,
}

impl PairBalance {
    /// Net amount from `user`'s perspective; negative means `user` owes.
    pub fn net(&self) -> ResultEngine<Money> {
        self.owed_to.checked_sub(self.owes)
    }
}

impl Engine {
    /// Pending obligations of one bill, insertion order.
    pub async fn obligations_for_bill(&self, bill_id: Uuid) -> ResultEngine<Vec<Obligation>> {
        let models = obligations::Entity::find()
            .filter(obligations::Column::BillId.eq(bill_id.to_string()))
            .all(&self.database)
            .await?;
        models.into_iter().map(Obligation::try_from).collect()
    }

    /// Sums pending obligations between two users in both directions.
    ///
    /// Settled and cancelled obligations never count; the balance is derived
    /// purely from rows in `pending` state.
    pub async fn balance_between(&self, user_id: &str, other: &str) -> ResultEngine<PairBalance> {
        let owes = sum_pending(&self.database, user_id, other).await?;
        let owed_to = sum_pending(&self.database, other, user_id).await?;
        owes.ensure_same_currency(owed_to)?;
        Ok(PairBalance { owes, owed_to })
    }
}

/// Appends one pending obligation to the ledger.
///
/// Runs inside the caller's transaction; bill creation records all of a
/// bill's obligations through this in one commit.
pub(super) async fn record_obligation<C: ConnectionTrait>(
    db: &C,
    obligation: &Obligation,
) -> ResultEngine<()> {
    obligations::ActiveModel::from(obligation).insert(db).await?;
    Ok(())
}

/// Sums a payer's pending obligations towards a payee.
///
/// Mixed currencies across the rows are a data error and are rejected
/// rather than silently added together.
async fn sum_pending<C: ConnectionTrait>(
    db: &C,
    payer: &str,
    payee: &str,
) -> ResultEngine<Money> {
    let models = obligations::Entity::find()
        .filter(obligations::Column::PayerId.eq(payer))
        .filter(obligations::Column::PayeeId.eq(payee))
        .filter(obligations::Column::Status.eq(ObligationStatus::Pending.as_str()))
        .all(db)
        .await?;

    let mut sum = Money::zero(Currency::default());
    for (index, model) in models.into_iter().enumerate() {
        let amount = Money::new(
            model.amount_minor,
            Currency::try_from(model.currency.as_str())?,
        );
        sum = if index == 0 {
            amount
        } else {
            sum.checked_add(amount)?
        };
    }
    Ok(sum)
}

/// Moves one pending obligation to `settled` and projects the change onto
/// the bill aggregate.
///
/// The status flip is a conditional `UPDATE ... WHERE status = 'pending'`;
/// when it affects no row the obligation was already terminal and the
/// current state decides the error. Runs inside the caller's transaction.
pub(super) async fn settle_obligation<C: ConnectionTrait>(
    db: &C,
    obligation_id: Uuid,
    paid: Money,
    settled_at: DateTime<Utc>,
) -> ResultEngine<Obligation> {
    let model = obligations::Entity::find_by_id(obligation_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("obligation not exists".to_string()))?;
    let obligation = Obligation::try_from(model)?;

    paid.ensure_same_currency(obligation.amount)?;
    if paid != obligation.amount {
        return Err(EngineError::AmountMismatch(format!(
            "paid {paid}, owed {}",
            obligation.amount
        )));
    }

    let updated = obligations::Entity::update_many()
        .col_expr(
            obligations::Column::Status,
            Expr::value(ObligationStatus::Settled.as_str()),
        )
        .col_expr(obligations::Column::SettledAt, Expr::value(settled_at))
        .filter(obligations::Column::Id.eq(obligation_id.to_string()))
        .filter(obligations::Column::Status.eq(ObligationStatus::Pending.as_str()))
        .exec(db)
        .await?;

    if updated.rows_affected == 0 {
        // Lost the race or the bill was cancelled first; report the state
        // the obligation is actually in.
        let model = obligations::Entity::find_by_id(obligation_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("obligation not exists".to_string()))?;
        return match ObligationStatus::try_from(model.status.as_str())? {
            ObligationStatus::Settled => {
                Err(EngineError::AlreadySettled(obligation_id.to_string()))
            }
            ObligationStatus::Cancelled => Err(EngineError::ObligationNotSettleable(format!(
                "obligation {obligation_id} was cancelled"
            ))),
            ObligationStatus::Pending => Err(EngineError::ObligationNotSettleable(format!(
                "obligation {obligation_id} could not be settled"
            ))),
        };
    }

    // Projection: the payer's participant row is now paid.
    participants::Entity::update_many()
        .col_expr(participants::Column::IsPaid, Expr::value(true))
        .col_expr(participants::Column::PaidAt, Expr::value(settled_at))
        .filter(participants::Column::BillId.eq(obligation.bill_id.to_string()))
        .filter(participants::Column::UserId.eq(obligation.payer.clone()))
        .filter(participants::Column::IsPaid.eq(false))
        .exec(db)
        .await?;

    // Projection: an active bill with no pending obligations left is settled.
    let pending_left = obligations::Entity::find()
        .filter(obligations::Column::BillId.eq(obligation.bill_id.to_string()))
        .filter(obligations::Column::Status.eq(ObligationStatus::Pending.as_str()))
        .count(db)
        .await?;
    if pending_left == 0 {
        bills::Entity::update_many()
            .col_expr(
                bills::Column::Status,
                Expr::value(BillStatus::Settled.as_str()),
            )
            .filter(bills::Column::Id.eq(obligation.bill_id.to_string()))
            .filter(bills::Column::Status.eq(BillStatus::Active.as_str()))
            .exec(db)
            .await?;
    }

    Ok(Obligation {
        status: ObligationStatus::Settled,
        settled_at: Some(settled_at),
        ..obligation
    })
}
