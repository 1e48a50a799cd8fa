use num::rational::Ratio;
use num_traits::CheckedSub;
use primitives::{Address, BalancesMap, BigNum, Channel, DomainError, ValidatorDesc};

/// `getBalancesAfterFees`: prorates `balances` down by
/// `(deposit - totalValidatorsFee) / deposit` and credits the difference to
/// the validators, iterating in canonical (sorted) key order so both nodes
/// compute byte-identical output.
pub fn get_balances_after_fees_tree(
    balances: &BalancesMap,
    channel: &Channel,
) -> Result<BalancesMap, DomainError> {
    let deposit_amount = channel.deposit_amount.clone();

    let total_distributed = balances.iter().map(|(_, balance)| balance).sum::<BigNum>();

    let validators_iter = channel.spec.validators.iter();
    let total_validators_fee = validators_iter
        .map(|validator| &validator.fee)
        .sum::<BigNum>();

    if total_validators_fee > deposit_amount {
        return Err(DomainError::RuleViolation(
            "total fees <= deposit: fee constraint violated".into(),
        ));
    }

    if total_distributed > deposit_amount {
        return Err(DomainError::RuleViolation(
            "distributed <= deposit: OUTPACE rule #4".into(),
        ));
    }

    let deposit_to_distribute = &deposit_amount - &total_validators_fee;

    let ratio = Ratio::new(deposit_to_distribute.clone(), deposit_amount.clone());
    let fee_ratio = Ratio::new(total_distributed.clone(), deposit_amount.clone());

    let mut balances_after_fees = BalancesMap::default();
    let mut total = BigNum::from(0_u64);

    for (key, value) in balances.iter() {
        let adjusted_balance = value * &ratio;

        total += &adjusted_balance;
        balances_after_fees.insert(*key, adjusted_balance);
    }

    let rounding_error = if deposit_amount == total_distributed {
        deposit_to_distribute.checked_sub(&total).ok_or_else(|| {
            DomainError::RuleViolation("rounding_err should never be negative".to_owned())
        })?
    } else {
        BigNum::from(0_u64)
    };

    let balances_after_fees = distribute_fee(
        balances_after_fees,
        rounding_error,
        fee_ratio,
        channel.spec.validators.iter(),
    );

    Ok(balances_after_fees)
}

/// Credits each validator's prorated fee; any rounding remainder goes to
/// index 0 (the leader).
fn distribute_fee<'a>(
    mut balances: BalancesMap,
    rounding_error: BigNum,
    fee_ratio: Ratio<BigNum>,
    validators: impl Iterator<Item = &'a ValidatorDesc>,
) -> BalancesMap {
    for (index, validator) in validators.enumerate() {
        let fee = &validator.fee * &fee_ratio;

        let fee_rounded = if index == 0 {
            &fee + &rounding_error
        } else {
            fee
        };

        if fee_rounded > 0_u64.into() {
            let fee_id = validator.fee_addr.as_ref().unwrap_or(&validator.id);
            let addr = Address::from(*fee_id.inner());
            let entry = balances.entry(addr).or_insert_with(|| 0_u64.into());

            *entry += &fee_rounded;
        }
    }

    balances
}
