use primitives::{BalancesMap, BigNum, Channel};

/// A transition `prev -> next` is valid when the total distributed never
/// decreases, never exceeds the deposit, and no publisher's balance is
/// rolled back.
pub fn is_valid_transition(channel: &Channel, prev: &BalancesMap, next: &BalancesMap) -> bool {
    let sum_prev: BigNum = prev.values().sum();
    let sum_next: BigNum = next.values().sum();

    let deposit = channel.deposit_amount.clone();

    let prev_checks = prev.iter().all(|(acc, bal)| match next.get(acc) {
        Some(next_bal) => next_bal >= bal,
        None => false,
    });

    // no need to check for negative balances, BigNum wraps an unsigned integer
    sum_next >= sum_prev && sum_next <= deposit && prev_checks
}

/// Health in promilles (0-1000) of the leader's approved tree relative to
/// our own accounting: `mins * 1000 / total`, where `mins` sums, per
/// publisher, the smaller of our balance and the leader's approved balance,
/// and `total` is our own balances' sum. A node with zero balances of its
/// own is trivially fully healthy.
pub fn get_health(_channel: &Channel, our: &BalancesMap, approved: &BalancesMap) -> u64 {
    let total: BigNum = our.values().sum();
    if total == 0_u64.into() {
        return 1_000;
    }

    let zero = BigNum::from(0_u64);
    let mins: BigNum = our
        .iter()
        .map(|(acc, val)| val.min(approved.get(acc).unwrap_or(&zero)))
        .sum();

    if mins >= total {
        return 1_000;
    }

    (mins * &BigNum::from(1_000_u64) / &total).to_u64().unwrap_or(0)
}

/// Whether `approved` is close enough to `our` accounting to still approve a
/// leader's `NewState` despite the numeric disagreement. `health_threshold_promilles`
/// is `Config::health_threshold_promilles`, threaded in rather than hardcoded
/// so it stays a process-wide, constructor-supplied value (spec.md §6).
pub fn is_healthy(channel: &Channel, our: &BalancesMap, approved: &BalancesMap, health_threshold_promilles: u32) -> bool {
    get_health(channel, our, approved) >= u64::from(health_threshold_promilles)
}
