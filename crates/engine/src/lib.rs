//! Ledger and settlement core for shared expenses.
//!
//! Money is integer minor units everywhere ([`Money`]); shares are computed
//! by the pure [`split`] module; the [`Engine`] persists bills, obligations
//! and payments through sea-orm and applies gateway confirmations exactly
//! once.

pub use bill_items::BillItem;
pub use bills::{Bill, BillStatus};
pub use currency::Currency;
pub use error::EngineError;
pub use expense_splits::ExpenseSplit;
pub use friendships::{FriendStatus, Friendship};
pub use money::Money;
pub use obligations::{Obligation, ObligationStatus};
pub use ops::{
    BillDetails, CreateBill, Engine, EngineBuilder, NewBillItem, PairBalance, SettlementOutcome,
};
pub use participants::Participant;
pub use payments::{Payment, PaymentStatus};
pub use split::{BillTotals, ItemAssignment, ItemSplit, Shares, SplitStrategy, compute_shares};
pub use verifier::{Confirmation, SettlementVerifier};

pub mod bill_items;
pub mod bills;
mod currency;
mod error;
pub mod expense_splits;
pub mod friendships;
mod money;
pub mod obligations;
mod ops;
pub mod participants;
pub mod payments;
pub mod split;
mod verifier;

pub type ResultEngine<T> = Result<T, EngineError>;
