use num_traits::CheckedSub;

use primitives::validator::Accounting;
use primitives::{BalancesMap, BigNum, Channel, DomainError, EventAggregate};

/// Folds `aggregates` (already filtered to "since the last cursor" by the
/// caller) into `accounting`'s running balance tree: saturating addition of
/// each publisher's `eventPayouts`, clamped so the total never exceeds
/// `channel.deposit_amount`. The cursor (`last_event_aggregate`) advances to
/// the newest `created` seen, even across aggregates that contributed
/// nothing (an already-exhausted channel must not re-process the same
/// aggregates forever).
///
/// Fees are deliberately NOT deducted here: `Accounting` is the producer's
/// own running ledger, and the fee tree is only ever computed fresh, once,
/// at the point a leader commits a `NewState` — deducting it on every
/// producer tick would compound across ticks. `balances` and
/// `balances_before_fees` therefore carry the same pre-fee tree; both
/// fields exist on the wire for symmetry with `NewState`'s
/// `balances`/`balances_after_fees` pair, not because two different trees
/// are computed here.
pub fn merge_aggregates(
    accounting: &Accounting,
    aggregates: &[EventAggregate],
    channel: &Channel,
) -> Result<Accounting, DomainError> {
    let last_event_aggregate = aggregates
        .iter()
        .map(|aggregate| aggregate.created)
        .chain(std::iter::once(accounting.last_event_aggregate))
        .max()
        .unwrap_or(accounting.last_event_aggregate);

    let balances = merge_payouts_into_balances(
        &accounting.balances_before_fees,
        aggregates.iter().flat_map(|aggregate| aggregate.payouts()),
        &channel.deposit_amount,
    )?;

    Ok(Accounting {
        last_event_aggregate,
        balances_before_fees: balances.clone(),
        balances,
    })
}

/// Saturating fold: each payout is clamped to what's left of the deposit
/// before being credited, so `sum(result) <= deposit` always holds even if
/// the raw payouts would have overshot it.
fn merge_payouts_into_balances<'a>(
    balances: &BalancesMap,
    payouts: impl Iterator<Item = (&'a primitives::Address, &'a BigNum)>,
    deposit: &BigNum,
) -> Result<BalancesMap, DomainError> {
    let mut new_balances = balances.clone();

    let total: BigNum = balances.values().sum();
    let mut remaining = deposit.checked_sub(&total).ok_or_else(|| {
        DomainError::RuleViolation("remaining starts negative: total exceeds deposit".to_string())
    })?;

    for (publisher, payout) in payouts {
        let to_add = payout.min(&remaining);

        let entry = new_balances.entry(*publisher).or_insert_with(|| 0_u64.into());
        *entry += to_add;

        remaining = remaining.checked_sub(to_add).ok_or_else(|| {
            DomainError::RuleViolation("remaining must never go negative".to_string())
        })?;
    }

    Ok(new_balances)
}
