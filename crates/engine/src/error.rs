//! The module contains the errors the engine can throw.
//!
//! The taxonomy follows the settlement design: validation errors are
//! rejected before any write, conflicts surface the offending identifier,
//! [`InvalidSignature`] is an integrity failure (never retried) and
//! [`Database`] is the transient storage condition.
//!
//! [`InvalidSignature`]: EngineError::InvalidSignature
//! [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid totals: {0}")]
    InvalidTotals(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("No participants supplied")]
    EmptyParticipantSet,
    #[error("Item \"{0}\" has no participants assigned")]
    UnassignedItem(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Obligation already settled: {0}")]
    AlreadySettled(String),
    #[error("Payment amount does not match obligation: {0}")]
    AmountMismatch(String),
    #[error("Obligation cannot be settled: {0}")]
    ObligationNotSettleable(String),
    #[error("Invalid confirmation signature: {0}")]
    InvalidSignature(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidTotals(a), Self::InvalidTotals(b)) => a == b,
            (Self::CurrencyMismatch(a), Self::CurrencyMismatch(b)) => a == b,
            (Self::EmptyParticipantSet, Self::EmptyParticipantSet) => true,
            (Self::UnassignedItem(a), Self::UnassignedItem(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::AlreadySettled(a), Self::AlreadySettled(b)) => a == b,
            (Self::AmountMismatch(a), Self::AmountMismatch(b)) => a == b,
            (Self::ObligationNotSettleable(a), Self::ObligationNotSettleable(b)) => a == b,
            (Self::InvalidSignature(a), Self::InvalidSignature(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
