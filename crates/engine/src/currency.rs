use serde::{Deserialize, Serialize};

use crate::EngineError;

/// ISO-like currency code carried by every money value in the ledger.
///
/// Bills are effectively mono-currency today (default `INR`, matching the
/// payment gateway), but the type keeps the data model explicit so mixing
/// currencies is a hard error rather than silent drift.
///
/// ## Minor units
///
/// The engine stores monetary values as an `i64` number of **minor units**
/// (see `Money`). `minor_units()` returns how many decimal digits are used
/// when converting between major units (human input/output, e.g.
/// `10.50 INR`) and minor units (stored integers, e.g. `1050`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Inr,
    Eur,
    Usd,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Inr => "INR",
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
        }
    }

    /// Number of fraction digits used when formatting/parsing amounts.
    #[must_use]
    pub const fn minor_units(self) -> u8 {
        match self {
            Currency::Inr | Currency::Eur | Currency::Usd => 2,
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "INR" => Ok(Currency::Inr),
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            other => Err(EngineError::CurrencyMismatch(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}
