use std::fmt;

use crate::{Currency, EngineError, ResultEngine};

/// Money amount represented as **integer minor units** plus a currency tag.
///
/// Use this type for **all** monetary values in the ledger (bill totals,
/// shares, obligations, payments) to avoid floating-point drift. Arithmetic
/// between different currencies fails with
/// [`CurrencyMismatch`](EngineError::CurrencyMismatch) instead of producing a
/// nonsense value.
///
/// # Examples
///
/// ```rust
/// use engine::{Currency, Money};
///
/// let amount = Money::new(12_34, Currency::Inr);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34 INR");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Money {
    minor: i64,
    currency: Currency,
}

impl Money {
    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64, currency: Currency) -> Self {
        Self { minor, currency }
    }

    /// The zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self { minor: 0, currency }
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.minor
    }

    #[must_use]
    pub const fn currency(self) -> Currency {
        self.currency
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.minor == 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.minor < 0
    }

    /// Fails with [`CurrencyMismatch`](EngineError::CurrencyMismatch) unless
    /// both amounts share a currency.
    pub fn ensure_same_currency(self, rhs: Money) -> ResultEngine<()> {
        if self.currency != rhs.currency {
            return Err(EngineError::CurrencyMismatch(format!(
                "{} vs {}",
                self.currency, rhs.currency
            )));
        }
        Ok(())
    }

    /// Checked addition; fails on currency mismatch or overflow.
    pub fn checked_add(self, rhs: Money) -> ResultEngine<Money> {
        self.ensure_same_currency(rhs)?;
        let minor = self
            .minor
            .checked_add(rhs.minor)
            .ok_or_else(|| EngineError::InvalidAmount("amount overflow".to_string()))?;
        Ok(Money::new(minor, self.currency))
    }

    /// Checked subtraction; fails on currency mismatch or overflow.
    pub fn checked_sub(self, rhs: Money) -> ResultEngine<Money> {
        self.ensure_same_currency(rhs)?;
        let minor = self
            .minor
            .checked_sub(rhs.minor)
            .ok_or_else(|| EngineError::InvalidAmount("amount overflow".to_string()))?;
        Ok(Money::new(minor, self.currency))
    }

    /// Multiplies a unit price by a line-item quantity.
    pub fn multiply_by_quantity(self, quantity: u32) -> ResultEngine<Money> {
        let minor = self
            .minor
            .checked_mul(i64::from(quantity))
            .ok_or_else(|| EngineError::InvalidAmount("amount overflow".to_string()))?;
        Ok(Money::new(minor, self.currency))
    }

    /// Splits the amount into weighted shares that sum back **exactly** to
    /// the input (largest-remainder method).
    ///
    /// Each share starts as the truncated proportional amount; the residual
    /// minor units are then handed out one at a time ordered by remainder
    /// descending, weight descending, index ascending. With equal weights
    /// this assigns the leftover units to the earliest positions, so the
    /// output is fully deterministic and re-running with the same inputs
    /// yields the same shares.
    ///
    /// A weight sum of zero falls back to equal weights (this happens when
    /// tax is allocated proportionally over participants whose item subtotal
    /// is zero). Negative amounts are rejected: shares are never negative.
    pub fn allocate(self, weights: &[u64]) -> ResultEngine<Vec<Money>> {
        if weights.is_empty() {
            return Err(EngineError::InvalidAmount(
                "cannot allocate over zero weights".to_string(),
            ));
        }
        if self.minor < 0 {
            return Err(EngineError::InvalidAmount(
                "cannot allocate a negative amount".to_string(),
            ));
        }

        let equal_weights;
        let weights = if weights.iter().all(|w| *w == 0) {
            equal_weights = vec![1u64; weights.len()];
            &equal_weights
        } else {
            weights
        };
        let weight_sum: u128 = weights.iter().map(|w| u128::from(*w)).sum();

        let total = self.minor as u128;
        let mut shares = Vec::with_capacity(weights.len());
        let mut remainders = Vec::with_capacity(weights.len());
        let mut assigned: u128 = 0;
        for (index, weight) in weights.iter().enumerate() {
            let scaled = total * u128::from(*weight);
            let share = scaled / weight_sum;
            assigned += share;
            shares.push(share as i64);
            remainders.push((scaled % weight_sum, *weight, index));
        }

        // total - assigned < weights.len(), one extra unit per position at most.
        let mut residual = (total - assigned) as usize;
        remainders.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then(b.1.cmp(&a.1))
                .then(a.2.cmp(&b.2))
        });
        for (_, _, index) in remainders {
            if residual == 0 {
                break;
            }
            shares[index] += 1;
            residual -= 1;
        }

        Ok(shares
            .into_iter()
            .map(|minor| Money::new(minor, self.currency))
            .collect())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minor < 0 { "-" } else { "" };
        let abs = self.minor.unsigned_abs();
        let scale = 10u64.pow(u32::from(self.currency.minor_units()));
        let major = abs / scale;
        let frac = abs % scale;
        write!(
            f,
            "{sign}{major}.{frac:0width$} {code}",
            width = self.currency.minor_units() as usize,
            code = self.currency.code()
        )
    }
}
