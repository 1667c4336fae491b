//! Wire types shared between the HTTP server and its clients.
//!
//! All monetary fields are integer minor units paired with a currency code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Inr,
    Eur,
    Usd,
}

pub mod bill {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct BillItemNew {
        pub name: String,
        pub unit_price_minor: i64,
        pub quantity: u32,
    }

    /// One item assigned to a subset of the participants, by item position.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ItemAssignment {
        pub item_index: usize,
        pub participants: Vec<String>,
        pub weights: Option<Vec<u64>>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    pub enum SplitStrategy {
        Equal,
        ByItem { assignments: Vec<ItemAssignment> },
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct BillNew {
        pub merchant_name: String,
        pub items: Vec<BillItemNew>,
        pub subtotal_minor: i64,
        pub tax_minor: i64,
        pub tip_minor: i64,
        pub total_minor: i64,
        #[serde(default)]
        pub currency: Currency,
        /// Participants besides the creator.
        pub participants: Vec<String>,
        pub strategy: SplitStrategy,
        pub ocr_data: Option<String>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct BillView {
        pub id: Uuid,
        pub created_by: String,
        pub merchant_name: String,
        pub subtotal_minor: i64,
        pub tax_minor: i64,
        pub tip_minor: i64,
        pub total_minor: i64,
        pub currency: Currency,
        pub status: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct BillItemView {
        pub id: Uuid,
        pub name: String,
        pub unit_price_minor: i64,
        pub quantity: u32,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ParticipantView {
        pub user: String,
        pub share_minor: i64,
        pub is_paid: bool,
        pub paid_at: Option<DateTime<Utc>>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct BillDetails {
        pub bill: BillView,
        pub items: Vec<BillItemView>,
        pub participants: Vec<ParticipantView>,
    }
}

pub mod friend {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct FriendRequestNew {
        pub recipient: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct FriendRequestView {
        pub requester: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct FriendsResponse {
        pub friends: Vec<String>,
    }
}

pub mod payment {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct SettlementNew {
        pub obligation_id: Uuid,
        pub order_ref: String,
    }

    /// Gateway callback payload, signed with the shared merchant secret.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct GatewayConfirmation {
        pub order_ref: String,
        pub payment_ref: String,
        pub bill_id: Uuid,
        pub payer: String,
        pub payee: String,
        pub amount_minor: i64,
        #[serde(default)]
        pub currency: Currency,
        pub signature: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct SettlementResult {
        /// `settled` on first delivery, `duplicate` on redeliveries.
        pub status: String,
        pub payment_id: Uuid,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct PaymentView {
        pub id: Uuid,
        pub bill_id: Uuid,
        pub obligation_id: Uuid,
        pub payer: String,
        pub payee: String,
        pub amount_minor: i64,
        pub currency: Currency,
        pub external_ref: String,
        pub status: String,
    }
}

pub mod balance {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct PairBalance {
        pub other: String,
        pub owes_minor: i64,
        pub owed_to_minor: i64,
        pub net_minor: i64,
        pub currency: Currency,
    }
}

pub mod user {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub username: String,
        pub display_name: String,
        pub phone_number: Option<String>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct PhoneSearch {
        pub phone_number: String,
    }
}

pub mod extract {
    use super::*;

    /// Receipt image to run through extraction, base64-encoded.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ExtractRequest {
        pub image_base64: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ExtractedItem {
        pub name: String,
        pub unit_price_minor: i64,
        pub quantity: u32,
    }

    /// Best-effort structured read of a receipt; the client confirms or
    /// edits before creating a bill from it.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ExtractedBill {
        pub merchant_name: Option<String>,
        pub items: Vec<ExtractedItem>,
        pub subtotal_minor: Option<i64>,
        pub tax_minor: Option<i64>,
        pub tip_minor: Option<i64>,
        pub total_minor: Option<i64>,
        #[serde(default)]
        pub currency: Currency,
        /// Raw payload as returned by the extraction backend.
        pub raw: String,
    }
}
