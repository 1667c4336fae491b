use sea_orm::DatabaseConnection;

use crate::{EngineError, ResultEngine, SettlementVerifier};

mod bills;
mod friends;
mod ledger;
mod settlement;

pub use bills::{BillDetails, CreateBill, NewBillItem};
pub use ledger::PairBalance;
pub use settlement::SettlementOutcome;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The ledger core: bill aggregate, obligations, settlement.
///
/// Stateless apart from the shared database handle and the gateway
/// verifier, so it is safe to share behind an `Arc` across request
/// handlers.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    verifier: SettlementVerifier,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    gateway_secret: Option<Vec<u8>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Shared secret used to verify gateway confirmations.
    pub fn gateway_secret(mut self, secret: impl Into<Vec<u8>>) -> EngineBuilder {
        self.gateway_secret = Some(secret.into());
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> ResultEngine<Engine> {
        let secret = self
            .gateway_secret
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| {
                EngineError::InvalidAmount("gateway secret must be configured".to_string())
            })?;
        Ok(Engine {
            database: self.database,
            verifier: SettlementVerifier::new(secret),
        })
    }
}
