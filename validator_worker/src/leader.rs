//! The leader tick (spec.md §4.6): runs the producer, and if the resulting
//! balance tree differs from what we last committed, signs and broadcasts
//! a fresh `NewState`. The leader never emits `ApproveState`/`RejectState`
//! and never rejects its own state — it unilaterally advances.

use primitives::adapter::Adapter;
use primitives::validator::NewState;
use primitives::ValidatorMessage;

use crate::core::fees::get_balances_after_fees_tree;
use crate::error::Error;
use crate::producer;
use crate::sentry_interface::SentryApi;
use crate::state_root::hex_state_root;

/// Runs one leader-side tick. Returns `true` if a new `NewState` was
/// emitted, `false` if nothing changed (the caller falls through to the
/// heartbeat path).
pub async fn tick<A: Adapter + 'static>(iface: &SentryApi<A>) -> Result<bool, Error> {
    let (balances, _) = producer::tick(iface).await?;

    let latest_new_state = match iface.get_our_latest_message(&["NewState"]).await? {
        Some(ValidatorMessage::NewState(new_state)) => Some(new_state),
        _ => None,
    };

    if let Some(latest) = &latest_new_state {
        if latest.balances == balances {
            return Ok(false);
        }
    }

    let balances_after_fees = get_balances_after_fees_tree(&balances, &iface.channel)?;
    let state_root = hex_state_root(&iface.channel.id, &balances_after_fees);

    let signature = iface
        .adapter
        .read()
        .await
        .sign(&state_root)
        .await
        .map_err(|err| Error::AdapterFailure(iface.channel.id, err.to_string()))?;

    let new_state = ValidatorMessage::NewState(NewState {
        state_root,
        signature,
        balances,
        balances_after_fees,
    });

    iface.persist_and_propagate(&[iface.channel.follower()], new_state).await?;

    Ok(true)
}
