//! Payment-gateway confirmation verification.
//!
//! The gateway signs each confirmation with HMAC-SHA256 over a canonical
//! rendering of the payload: fields sorted by name, `name=value` pairs
//! joined with `|`. We recompute the signature with the shared secret and
//! compare in constant time (`Mac::verify_slice`). A mismatch is treated as
//! a potential forgery: it is logged and rejected, never retried.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine};

type HmacSha256 = Hmac<Sha256>;

/// Inbound gateway confirmation, exactly the callback payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmation {
    /// Gateway order reference, used as the idempotency key.
    pub order_ref: String,
    /// Gateway-side transaction id.
    pub payment_ref: String,
    pub bill_id: Uuid,
    pub payer: String,
    pub payee: String,
    pub amount_minor: i64,
    pub currency: Currency,
    /// Hex-encoded HMAC-SHA256 over the canonical payload.
    pub signature: String,
}

/// Validates confirmations before they are allowed to touch the ledger.
#[derive(Clone)]
pub struct SettlementVerifier {
    secret: Vec<u8>,
}

impl std::fmt::Debug for SettlementVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementVerifier").finish_non_exhaustive()
    }
}

impl SettlementVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Canonical field set, sorted by field name, mirroring the gateway.
    fn canonical_payload(confirmation: &Confirmation) -> String {
        format!(
            "amount={}|bill_id={}|currency={}|order_ref={}|payee={}|payer={}|payment_ref={}",
            confirmation.amount_minor,
            confirmation.bill_id,
            confirmation.currency.code(),
            confirmation.order_ref,
            confirmation.payee,
            confirmation.payer,
            confirmation.payment_ref,
        )
    }

    fn mac(&self, confirmation: &Confirmation) -> HmacSha256 {
        // HMAC accepts keys of any length.
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC key of any length is valid");
        mac.update(Self::canonical_payload(confirmation).as_bytes());
        mac
    }

    /// Produces the hex signature the gateway is expected to send.
    ///
    /// Used when initiating a transfer and by tests building valid
    /// confirmations.
    pub fn sign(&self, confirmation: &Confirmation) -> String {
        hex::encode(self.mac(confirmation).finalize().into_bytes())
    }

    /// Checks the supplied signature in constant time.
    ///
    /// Failures are security events: logged at WARN with the order
    /// reference and rejected with
    /// [`InvalidSignature`](EngineError::InvalidSignature).
    pub fn verify(&self, confirmation: &Confirmation) -> ResultEngine<()> {
        let rejected = || {
            tracing::warn!(
                order_ref = %confirmation.order_ref,
                bill_id = %confirmation.bill_id,
                "confirmation signature mismatch, rejecting as potential forgery"
            );
            EngineError::InvalidSignature(confirmation.order_ref.clone())
        };

        let supplied = hex::decode(confirmation.signature.trim()).map_err(|_| rejected())?;
        self.mac(confirmation)
            .verify_slice(&supplied)
            .map_err(|_| rejected())
    }
}
