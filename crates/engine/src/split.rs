//! Pure share computation.
//!
//! Given a bill's totals, its items and an ordered participant set, this
//! module computes each participant's share. It performs no I/O; persisting
//! the result is the bill aggregate's job (`ops::bills`).

use crate::{BillItem, EngineError, Money, ResultEngine};

/// How a bill is divided among its participants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Total divided evenly; rounding remainder goes to the earliest
    /// participants in insertion order.
    Equal,
    /// Each item is divided among the participants assigned to it; tax and
    /// tip are then divided among everyone proportionally to their item
    /// subtotal.
    ByItem(Vec<ItemAssignment>),
}

/// Assignment of one item (by position in the bill's item list) to a subset
/// of the participants, with optional weight overrides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemAssignment {
    pub item_index: usize,
    pub participants: Vec<String>,
    /// Same length as `participants` when present; defaults to equal.
    pub weights: Option<Vec<u64>>,
}

/// The monetary header of a bill, already validated by `Bill::new`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BillTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub tip: Money,
    pub total: Money,
}

/// One participant's slice of a single item (`ByItem` only).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemSplit {
    pub item_index: usize,
    pub user: String,
    pub amount: Money,
}

/// Result of a share computation, ordered by participant insertion order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shares {
    pub participants: Vec<(String, Money)>,
    /// Item-level splits; empty for `Equal`.
    pub item_splits: Vec<ItemSplit>,
}

/// Computes every participant's share of the bill.
///
/// The participant shares always sum exactly to `totals.total`; the
/// allocation never produces a negative share and re-running with the same
/// inputs yields the same result.
pub fn compute_shares(
    totals: &BillTotals,
    items: &[BillItem],
    participants: &[String],
    strategy: &SplitStrategy,
) -> ResultEngine<Shares> {
    if participants.is_empty() {
        return Err(EngineError::EmptyParticipantSet);
    }

    match strategy {
        SplitStrategy::Equal => {
            let weights = vec![1u64; participants.len()];
            let shares = totals.total.allocate(&weights)?;
            Ok(Shares {
                participants: participants.iter().cloned().zip(shares).collect(),
                item_splits: Vec::new(),
            })
        }
        SplitStrategy::ByItem(assignments) => {
            compute_by_item(totals, items, participants, assignments)
        }
    }
}

fn compute_by_item(
    totals: &BillTotals,
    items: &[BillItem],
    participants: &[String],
    assignments: &[ItemAssignment],
) -> ResultEngine<Shares> {
    let position = |user: &str| -> ResultEngine<usize> {
        participants
            .iter()
            .position(|p| p == user)
            .ok_or_else(|| EngineError::KeyNotFound(format!("participant {user}")))
    };

    // Item line totals must add up to the bill subtotal, otherwise the
    // grand-total invariant cannot hold.
    let mut line_sum = Money::zero(totals.subtotal.currency());
    for item in items {
        line_sum = line_sum.checked_add(item.line_total()?)?;
    }
    if line_sum != totals.subtotal {
        return Err(EngineError::InvalidTotals(format!(
            "item totals {line_sum} do not match bill subtotal {}",
            totals.subtotal
        )));
    }

    let mut item_subtotals = vec![0i64; participants.len()];
    let mut item_splits = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let assignment = assignments
            .iter()
            .find(|a| a.item_index == index)
            .filter(|a| !a.participants.is_empty())
            .ok_or_else(|| EngineError::UnassignedItem(item.name.clone()))?;

        let weights = match &assignment.weights {
            Some(weights) if weights.len() != assignment.participants.len() => {
                return Err(EngineError::InvalidAmount(format!(
                    "item \"{}\": weights do not match participants",
                    item.name
                )));
            }
            Some(weights) => weights.clone(),
            None => vec![1u64; assignment.participants.len()],
        };

        let shares = item.line_total()?.allocate(&weights)?;
        for (user, share) in assignment.participants.iter().zip(shares) {
            item_subtotals[position(user)?] += share.minor();
            item_splits.push(ItemSplit {
                item_index: index,
                user: user.clone(),
                amount: share,
            });
        }
    }

    // Whatever is left of the total on top of the items (tax, tip and the
    // one-minor-unit rounding slack) is spread proportionally to each
    // participant's item subtotal, so nobody pays tax on items they did not
    // order. A negative pool would force negative shares; reject it.
    let pool = totals.total.checked_sub(totals.subtotal)?;
    if pool.is_negative() {
        return Err(EngineError::InvalidTotals(
            "total is below the item subtotal".to_string(),
        ));
    }
    let weights: Vec<u64> = item_subtotals.iter().map(|m| *m as u64).collect();
    let pool_shares = pool.allocate(&weights)?;

    let mut out = Vec::with_capacity(participants.len());
    for (index, user) in participants.iter().enumerate() {
        let share = Money::new(item_subtotals[index], totals.total.currency())
            .checked_add(pool_shares[index])?;
        out.push((user.clone(), share));
    }

    Ok(Shares {
        participants: out,
        item_splits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Currency;

    fn inr(minor: i64) -> Money {
        Money::new(minor, Currency::Inr)
    }

    fn totals(subtotal: i64, tax: i64, tip: i64, total: i64) -> BillTotals {
        BillTotals {
            subtotal: inr(subtotal),
            tax: inr(tax),
            tip: inr(tip),
            total: inr(total),
        }
    }

    fn users(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn equal_split_assigns_remainder_by_insertion_order() {
        // 100.00 total (95.00 + 5.00 tax), three ways.
        let shares = compute_shares(
            &totals(9500, 500, 0, 10_000),
            &[],
            &users(&["alice", "bob", "carol"]),
            &SplitStrategy::Equal,
        )
        .unwrap();

        let minors: Vec<i64> = shares.participants.iter().map(|(_, s)| s.minor()).collect();
        assert_eq!(minors, vec![3334, 3333, 3333]);
        assert_eq!(shares.participants[0].0, "alice");
    }

    #[test]
    fn equal_split_sums_exactly_for_many_participant_counts() {
        for count in 1..=50usize {
            let names: Vec<String> = (0..count).map(|i| format!("user{i}")).collect();
            let shares = compute_shares(
                &totals(10_007, 0, 0, 10_007),
                &[],
                &names,
                &SplitStrategy::Equal,
            )
            .unwrap();
            let sum: i64 = shares.participants.iter().map(|(_, s)| s.minor()).sum();
            assert_eq!(sum, 10_007);
        }
    }

    #[test]
    fn empty_participants_rejected() {
        let err = compute_shares(&totals(100, 0, 0, 100), &[], &[], &SplitStrategy::Equal)
            .unwrap_err();
        assert_eq!(err, EngineError::EmptyParticipantSet);
    }

    fn item(name: &str, price_minor: i64, quantity: u32) -> BillItem {
        BillItem::new(name.to_string(), inr(price_minor), quantity).unwrap()
    }

    #[test]
    fn by_item_allocates_tax_proportionally() {
        // alice ordered 60.00 of food, bob 40.00; 10.00 tax follows 60/40.
        let items = vec![item("thali", 6000, 1), item("lassi", 4000, 1)];
        let assignments = vec![
            ItemAssignment {
                item_index: 0,
                participants: users(&["alice"]),
                weights: None,
            },
            ItemAssignment {
                item_index: 1,
                participants: users(&["bob"]),
                weights: None,
            },
        ];
        let shares = compute_shares(
            &totals(10_000, 1000, 0, 11_000),
            &items,
            &users(&["alice", "bob"]),
            &SplitStrategy::ByItem(assignments),
        )
        .unwrap();

        let minors: Vec<i64> = shares.participants.iter().map(|(_, s)| s.minor()).collect();
        assert_eq!(minors, vec![6600, 4400]);
        assert_eq!(shares.item_splits.len(), 2);
    }

    #[test]
    fn by_item_shared_item_splits_evenly_and_total_is_exact() {
        let items = vec![item("platter", 1001, 1)];
        let assignments = vec![ItemAssignment {
            item_index: 0,
            participants: users(&["alice", "bob"]),
            weights: None,
        }];
        let shares = compute_shares(
            &totals(1001, 99, 0, 1100),
            &items,
            &users(&["alice", "bob"]),
            &SplitStrategy::ByItem(assignments),
        )
        .unwrap();

        let sum: i64 = shares.participants.iter().map(|(_, s)| s.minor()).sum();
        assert_eq!(sum, 1100);
        assert!(shares.participants.iter().all(|(_, s)| !s.is_negative()));
        // Item remainder goes to alice (first assigned participant).
        let item_sum: i64 = shares.item_splits.iter().map(|s| s.amount.minor()).sum();
        assert_eq!(item_sum, 1001);
        assert_eq!(shares.item_splits[0].amount.minor(), 501);
    }

    #[test]
    fn by_item_supports_weight_overrides() {
        let items = vec![item("wine", 3000, 1)];
        let assignments = vec![ItemAssignment {
            item_index: 0,
            participants: users(&["alice", "bob"]),
            weights: Some(vec![2, 1]),
        }];
        let shares = compute_shares(
            &totals(3000, 0, 0, 3000),
            &items,
            &users(&["alice", "bob"]),
            &SplitStrategy::ByItem(assignments),
        )
        .unwrap();

        let minors: Vec<i64> = shares.participants.iter().map(|(_, s)| s.minor()).collect();
        assert_eq!(minors, vec![2000, 1000]);
    }

    #[test]
    fn by_item_rejects_unassigned_item() {
        let items = vec![item("thali", 6000, 1), item("lassi", 4000, 1)];
        let assignments = vec![ItemAssignment {
            item_index: 0,
            participants: users(&["alice"]),
            weights: None,
        }];
        let err = compute_shares(
            &totals(10_000, 0, 0, 10_000),
            &items,
            &users(&["alice"]),
            &SplitStrategy::ByItem(assignments),
        )
        .unwrap_err();
        assert_eq!(err, EngineError::UnassignedItem("lassi".to_string()));
    }

    #[test]
    fn by_item_rejects_unknown_assignment_participant() {
        let items = vec![item("thali", 100, 1)];
        let assignments = vec![ItemAssignment {
            item_index: 0,
            participants: users(&["mallory"]),
            weights: None,
        }];
        let err = compute_shares(
            &totals(100, 0, 0, 100),
            &items,
            &users(&["alice"]),
            &SplitStrategy::ByItem(assignments),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::KeyNotFound(_)));
    }

    #[test]
    fn by_item_rejects_items_not_matching_subtotal() {
        let items = vec![item("thali", 100, 1)];
        let assignments = vec![ItemAssignment {
            item_index: 0,
            participants: users(&["alice"]),
            weights: None,
        }];
        let err = compute_shares(
            &totals(200, 0, 0, 200),
            &items,
            &users(&["alice"]),
            &SplitStrategy::ByItem(assignments),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTotals(_)));
    }
}
