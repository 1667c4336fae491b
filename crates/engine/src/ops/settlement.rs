use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, SqlErr, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    Confirmation, EngineError, Money, Obligation, ObligationStatus, Payment, PaymentStatus,
    ResultEngine, obligations, payments,
};

use super::{Engine, ledger, normalize_required_name, with_tx};

/// What a confirmation did to the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// First delivery; the obligation moved to `settled`.
    Settled(Payment),
    /// Redelivery of an already-applied confirmation; nothing changed.
    Duplicate(Payment),
}

impl SettlementOutcome {
    pub fn payment(&self) -> &Payment {
        match self {
            Self::Settled(payment) | Self::Duplicate(payment) => payment,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

impl Engine {
    /// Records that a transfer has been handed to the gateway.
    ///
    /// The pending payment row pins the obligation's amount to the order
    /// reference, so the later confirmation can be checked against it.
    /// Reusing an order reference is rejected with `ExistingKey`.
    pub async fn initiate_settlement(
        &self,
        obligation_id: Uuid,
        order_ref: &str,
        initiated_by: &str,
        at: DateTime<Utc>,
    ) -> ResultEngine<Payment> {
        let order_ref = normalize_required_name(order_ref, "order reference")?;

        let model = obligations::Entity::find_by_id(obligation_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("obligation not exists".to_string()))?;
        let obligation = Obligation::try_from(model)?;

        if obligation.payer != initiated_by {
            return Err(EngineError::KeyNotFound("obligation not exists".to_string()));
        }
        match obligation.status {
            ObligationStatus::Pending => {}
            ObligationStatus::Settled => {
                return Err(EngineError::AlreadySettled(obligation_id.to_string()));
            }
            ObligationStatus::Cancelled => {
                return Err(EngineError::ObligationNotSettleable(format!(
                    "obligation {obligation_id} was cancelled"
                )));
            }
        }

        let existing = payments::Entity::find()
            .filter(payments::Column::ExternalRef.eq(order_ref.clone()))
            .one(&self.database)
            .await?;
        if existing.is_some() {
            return Err(EngineError::ExistingKey(order_ref));
        }

        let payment = Payment::new(
            obligation.bill_id,
            obligation.id,
            obligation.payer.clone(),
            obligation.payee.clone(),
            obligation.amount,
            order_ref,
            at,
        )?;
        payments::ActiveModel::from(&payment)
            .insert(&self.database)
            .await?;
        Ok(payment)
    }

    /// Applies one gateway confirmation to the ledger.
    ///
    /// The signature is verified before anything touches the database.
    /// Delivered once, the matching obligation is settled and the payment
    /// completed; delivered again, the stored payment is returned as
    /// [`SettlementOutcome::Duplicate`] with no writes. Two racing
    /// deliveries are serialized by the unique index on the order
    /// reference: the loser's insert fails and is re-read as a duplicate.
    pub async fn apply_confirmation(
        &self,
        confirmation: &Confirmation,
        at: DateTime<Utc>,
    ) -> ResultEngine<SettlementOutcome> {
        self.verifier.verify(confirmation)?;

        let result: ResultEngine<SettlementOutcome> = with_tx!(self, |db_tx| {
            let existing = payments::Entity::find()
                .filter(payments::Column::ExternalRef.eq(confirmation.order_ref.clone()))
                .one(&db_tx)
                .await?;

            match existing {
                Some(model) => {
                    let payment = Payment::try_from(model)?;
                    match payment.status {
                        PaymentStatus::Completed => {
                            tracing::info!(
                                order_ref = %confirmation.order_ref,
                                "confirmation redelivered, already applied"
                            );
                            return Ok(SettlementOutcome::Duplicate(payment));
                        }
                        PaymentStatus::Failed => Err(EngineError::ObligationNotSettleable(
                            format!("payment {} already failed", confirmation.order_ref),
                        )),
                        PaymentStatus::Pending => {
                            let paid = confirmed_amount(confirmation, &payment)?;
                            let settled =
                                ledger::settle_obligation(&db_tx, payment.obligation_id, paid, at)
                                    .await?;
                            let completed =
                                complete_payment(&db_tx, payment, confirmation, at).await?;
                            tracing::info!(
                                order_ref = %confirmation.order_ref,
                                obligation_id = %settled.id,
                                "settlement applied"
                            );
                            Ok(SettlementOutcome::Settled(completed))
                        }
                    }
                }
                None => {
                    // No initiated payment for this reference; locate the
                    // obligation by the confirmation's own coordinates.
                    let obligation =
                        find_obligation_for(&db_tx, confirmation).await?;
                    let paid = Money::new(confirmation.amount_minor, confirmation.currency);
                    let settled =
                        ledger::settle_obligation(&db_tx, obligation.id, paid, at).await?;

                    let mut payment = Payment::new(
                        settled.bill_id,
                        settled.id,
                        settled.payer.clone(),
                        settled.payee.clone(),
                        paid,
                        confirmation.order_ref.clone(),
                        at,
                    )?;
                    payment.gateway_payment_ref = Some(confirmation.payment_ref.clone());
                    payment.status = PaymentStatus::Completed;
                    payment.completed_at = Some(at);
                    payments::ActiveModel::from(&payment).insert(&db_tx).await?;
                    tracing::info!(
                        order_ref = %confirmation.order_ref,
                        obligation_id = %settled.id,
                        "settlement applied"
                    );
                    Ok(SettlementOutcome::Settled(payment))
                }
            }
        });

        match result {
            Err(EngineError::Database(db_err))
                if matches!(db_err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
            {
                // Lost a race against a concurrent delivery of the same
                // reference. The winner committed; read its payment back.
                self.completed_duplicate(confirmation).await
            }
            other => other,
        }
    }

    async fn completed_duplicate(
        &self,
        confirmation: &Confirmation,
    ) -> ResultEngine<SettlementOutcome> {
        let model = payments::Entity::find()
            .filter(payments::Column::ExternalRef.eq(confirmation.order_ref.clone()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("payment not exists".to_string()))?;
        let payment = Payment::try_from(model)?;
        if payment.status != PaymentStatus::Completed {
            return Err(EngineError::ObligationNotSettleable(format!(
                "payment {} is {}",
                confirmation.order_ref,
                payment.status.as_str()
            )));
        }
        tracing::info!(
            order_ref = %confirmation.order_ref,
            "confirmation redelivered, already applied"
        );
        Ok(SettlementOutcome::Duplicate(payment))
    }
}

/// Cross-checks the confirmation against the initiated payment.
fn confirmed_amount(confirmation: &Confirmation, payment: &Payment) -> ResultEngine<Money> {
    if confirmation.payer != payment.payer
        || confirmation.payee != payment.payee
        || confirmation.bill_id != payment.bill_id
    {
        return Err(EngineError::AmountMismatch(format!(
            "confirmation {} does not match its initiated payment",
            confirmation.order_ref
        )));
    }
    Ok(Money::new(confirmation.amount_minor, confirmation.currency))
}

/// The pending obligation a bare confirmation refers to.
async fn find_obligation_for<C: sea_orm::ConnectionTrait>(
    db: &C,
    confirmation: &Confirmation,
) -> ResultEngine<Obligation> {
    let models = obligations::Entity::find()
        .filter(obligations::Column::BillId.eq(confirmation.bill_id.to_string()))
        .filter(obligations::Column::PayerId.eq(confirmation.payer.clone()))
        .filter(obligations::Column::PayeeId.eq(confirmation.payee.clone()))
        .all(db)
        .await?;
    if models.is_empty() {
        return Err(EngineError::KeyNotFound("obligation not exists".to_string()));
    }

    let mut fallback: Option<EngineError> = None;
    for model in models {
        let obligation = Obligation::try_from(model)?;
        match obligation.status {
            ObligationStatus::Pending => return Ok(obligation),
            ObligationStatus::Settled => {
                fallback = Some(EngineError::AlreadySettled(obligation.id.to_string()));
            }
            ObligationStatus::Cancelled => {
                fallback.get_or_insert(EngineError::ObligationNotSettleable(format!(
                    "obligation {} was cancelled",
                    obligation.id
                )));
            }
        }
    }
    Err(fallback.unwrap_or_else(|| EngineError::KeyNotFound("obligation not exists".to_string())))
}

/// Marks an initiated payment completed with the gateway's transaction id.
async fn complete_payment<C: sea_orm::ConnectionTrait>(
    db: &C,
    payment: Payment,
    confirmation: &Confirmation,
    at: DateTime<Utc>,
) -> ResultEngine<Payment> {
    payments::Entity::update_many()
        .col_expr(
            payments::Column::Status,
            Expr::value(PaymentStatus::Completed.as_str()),
        )
        .col_expr(
            payments::Column::GatewayPaymentRef,
            Expr::value(confirmation.payment_ref.clone()),
        )
        .col_expr(payments::Column::CompletedAt, Expr::value(at))
        .filter(payments::Column::Id.eq(payment.id.to_string()))
        .exec(db)
        .await?;

    Ok(Payment {
        gateway_payment_ref: Some(confirmation.payment_ref.clone()),
        status: PaymentStatus::Completed,
        completed_at: Some(at),
        ..payment
    })
}
