//! Internal helpers.
//!
//! These utilities are **not** part of the public API.

use std::{
    collections::{BTreeSet, HashMap},
    hash::Hash,
};

/// Build a map from the elements, keyed by `key`. Later elements win on
/// duplicate keys.
pub(crate) fn index_by<E, K, F>(elems: impl IntoIterator<Item = E>, key: F) -> HashMap<K, E>
where
    K: Eq + Hash,
    F: Fn(&E) -> K,
{
    elems.into_iter().map(|elem| (key(&elem), elem)).collect()
}

/// The requested keys absent from `found`, in `requested` order.
pub(crate) fn missing<K, V>(requested: &BTreeSet<K>, found: &HashMap<K, V>) -> Vec<K>
where
    K: Ord + Eq + Hash + Clone,
{
    requested
        .iter()
        .filter(|key| !found.contains_key(*key))
        .cloned()
        .collect()
}
