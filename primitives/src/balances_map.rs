use serde::{Deserialize, Serialize};
use std::{
    collections::{
        btree_map::{Entry, IntoIter, Iter, Values},
        BTreeMap,
    },
    iter::FromIterator,
    ops::Index,
};

use crate::{Address, BigNum};

/// `Address -> BigNum` balance tree. A thin wrapper over `BTreeMap` rather
/// than a bare `HashMap`: both validators must iterate keys in the same
/// canonical (sorted-ascending) order when computing the fee tree and the
/// state root, so both nodes produce byte-identical output (spec.md §4.1).
pub type BalancesMap = Map<Address, BigNum>;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Map<K: Ord, V>(BTreeMap<K, V>);

impl<K: Ord, V> Default for Map<K, V> {
    fn default() -> Self {
        Map(BTreeMap::new())
    }
}

impl<K: Ord, V> Index<&'_ K> for Map<K, V> {
    type Output = V;

    fn index(&self, index: &K) -> &Self::Output {
        self.0.index(index)
    }
}

impl<K: Ord, V> Map<K, V> {
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.0.iter()
    }

    pub fn values(&self) -> Values<'_, K, V> {
        self.0.values()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.0.contains_key(key)
    }

    pub fn entry(&mut self, key: K) -> Entry<'_, K, V> {
        self.0.entry(key)
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.0.insert(key, value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for Map<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Map(iter.into_iter().collect::<BTreeMap<K, V>>())
    }
}

impl<K: Ord, V> IntoIterator for Map<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a Map<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use std::convert::TryFrom;

    fn addr(hex: &str) -> Address {
        Address::try_from(hex).expect("valid test address")
    }

    #[test]
    fn balances_map_serializes_and_deserializes() {
        let balances_map: BalancesMap = vec![
            (
                addr("0xce07CbB7e054514D590a0262C93070D838bFBA2e"),
                BigNum::from(100_u64),
            ),
            (
                addr("0xc91763d7f14ac5c5ddfbcd012e0d2a61ab9bded3"),
                BigNum::from(50_u64),
            ),
        ]
        .into_iter()
        .collect();

        let actual_json = serde_json::to_value(&balances_map).expect("serializes");
        let back: BalancesMap = serde_json::from_value(actual_json).expect("deserializes");

        assert_eq!(balances_map, back);
    }

    #[test]
    fn duplicate_keys_keep_the_last_occurrence() {
        let json = json!({
            "0x80690751969B234697e9059e04ed72195c3507fa": "100",
            "0x80690751969B234697e9059e04ed72195c3507fa": "50"
        });

        let deserialized: BalancesMap = serde_json::from_value(json).expect("deserializes");

        assert_eq!(
            &BigNum::from(50_u64),
            deserialized
                .get(&addr("0x80690751969B234697e9059e04ed72195c3507fa"))
                .unwrap()
        );
    }
}
