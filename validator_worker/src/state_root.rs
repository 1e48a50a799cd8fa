use primitives::{merkle_tree::MerkleTree, Address, BalancesMap, ChannelId};
use tiny_keccak::{Hasher, Keccak};

pub(crate) fn keccak256(chunks: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    for chunk in chunks {
        hasher.update(chunk);
    }

    let mut output = [0_u8; 32];
    hasher.finalize(&mut output);
    output
}

/// One balance leaf: `keccak256(publisher || amount)`, amount big-endian
/// over 32 bytes so two validators with the same balances always produce
/// the same leaf regardless of representation.
fn balance_leaf(publisher: &Address, amount: &primitives::BigNum) -> [u8; 32] {
    keccak256(&[publisher.as_bytes(), &amount.to_be_bytes_padded(32)])
}

/// Root of the balances Merkle tree. An empty map commits to the zero hash
/// rather than panicking on an empty leaf set.
fn balances_root(balances: &BalancesMap) -> [u8; 32] {
    if balances.is_empty() {
        return [0_u8; 32];
    }

    let leaves: Vec<[u8; 32]> = balances
        .iter()
        .map(|(publisher, amount)| balance_leaf(publisher, amount))
        .collect();

    MerkleTree::new(&leaves).root()
}

/// The channel's state root: `keccak256(channelId || balancesRoot)`,
/// binding the balance commitment to the specific channel it's for so a
/// state root from one channel can never be replayed against another.
pub fn state_root(channel_id: &ChannelId, balances_after_fees: &BalancesMap) -> [u8; 32] {
    keccak256(&[channel_id.as_bytes(), &balances_root(balances_after_fees)])
}

/// `state_root` as the lowercase hex string carried in [`ValidatorMessage`]s
/// and signed by the [`primitives::adapter::Adapter`].
///
/// [`ValidatorMessage`]: primitives::ValidatorMessage
pub fn hex_state_root(channel_id: &ChannelId, balances_after_fees: &BalancesMap) -> String {
    hex::encode(state_root(channel_id, balances_after_fees))
}

/// Recomputes the root from `balances_after_fees` and compares it against
/// `claimed_state_root` (a lowercase hex string, as carried on the wire).
pub fn is_valid_root_hash(claimed_state_root: &str, channel_id: &ChannelId, balances_after_fees: &BalancesMap) -> bool {
    claimed_state_root == hex_state_root(channel_id, balances_after_fees)
}
