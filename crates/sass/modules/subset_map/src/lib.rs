//! A map from sets of values to arbitrary payloads, queryable by subset.
//!
//! `SubsetMap` answers "which stored entries have a key set that is a subset
//! of this query set?" without scanning every entry: each element of a stored
//! key set indexes a bucket, so a query only touches the buckets of its own
//! elements. Payloads live in an insertion-ordered arena and results come
//! back in insertion order, duplicates included if the same payload was
//! inserted more than once.

use std::collections::HashMap;
use std::collections::HashSet;
use std::hash::Hash;

/// One bucket entry: the full key set it was stored under, plus the index of
/// its payload in the arena.
#[derive(Clone, Debug)]
struct BucketEntry<K> {
    key_set: Vec<K>,
    payload_index: usize,
}

/// An insertion-ordered multimap from sets of `K` to payloads of `V`,
/// queryable by "key set is a subset of the query set".
#[derive(Clone, Debug)]
pub struct SubsetMap<K, V> {
    buckets: HashMap<K, Vec<BucketEntry<K>>>,
    payloads: Vec<V>,
}

impl<K, V> Default for SubsetMap<K, V> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
            payloads: Vec::new(),
        }
    }
}

impl<K, V> SubsetMap<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored payloads (duplicates included).
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Store `value` under `key_set`. An empty key set is a usage error.
    pub fn put(&mut self, key_set: Vec<K>, value: V) {
        assert!(!key_set.is_empty(), "SubsetMap keys may not be empty");
        let payload_index = self.payloads.len();
        self.payloads.push(value);
        for key in &key_set {
            self.buckets
                .entry(key.clone())
                .or_default()
                .push(BucketEntry {
                    key_set: key_set.clone(),
                    payload_index,
                });
        }
    }

    /// All `(payload, stored key set)` pairs whose key set is a subset of
    /// `query`, deduplicated by payload and in insertion order.
    pub fn get(&self, query: &[K]) -> Vec<(&V, &[K])> {
        let query_set: HashSet<&K> = query.iter().collect();
        let mut found: Vec<(usize, &[K])> = Vec::new();
        let mut seen_indices: HashSet<usize> = HashSet::new();
        for key in query {
            let Some(bucket) = self.buckets.get(key) else {
                continue;
            };
            for entry in bucket {
                if !entry.key_set.iter().all(|member| query_set.contains(member)) {
                    continue;
                }
                if seen_indices.insert(entry.payload_index) {
                    found.push((entry.payload_index, entry.key_set.as_slice()));
                }
            }
        }
        found.sort_by_key(|(index, _)| *index);
        found
            .into_iter()
            .map(|(index, key_set)| (&self.payloads[index], key_set))
            .collect()
    }

    /// Every stored payload, in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.payloads.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::SubsetMap;

    fn set(elements: &[&str]) -> Vec<String> {
        elements.iter().map(|element| (*element).to_owned()).collect()
    }

    #[test]
    fn superset_query_finds_payload() {
        let mut map = SubsetMap::new();
        map.put(set(&["a", "b"]), 1);
        let hits = map.get(&set(&["a", "b", "c"]));
        assert_eq!(hits.len(), 1);
        assert_eq!(*hits[0].0, 1);
        assert_eq!(hits[0].1, set(&["a", "b"]).as_slice());
    }

    #[test]
    fn non_superset_query_finds_nothing() {
        let mut map = SubsetMap::new();
        map.put(set(&["a", "b"]), 1);
        assert!(map.get(&set(&["a"])).is_empty());
        assert!(map.get(&set(&["b", "c"])).is_empty());
        assert!(map.get(&set(&["d"])).is_empty());
    }

    #[test]
    fn results_come_back_in_insertion_order() {
        let mut map = SubsetMap::new();
        map.put(set(&["b"]), 2);
        map.put(set(&["a"]), 1);
        map.put(set(&["a", "b"]), 3);
        let hits: Vec<i32> = map
            .get(&set(&["a", "b"]))
            .into_iter()
            .map(|(value, _)| *value)
            .collect();
        assert_eq!(hits, vec![2, 1, 3]);
    }

    #[test]
    fn duplicate_payloads_are_kept_separate() {
        let mut map = SubsetMap::new();
        map.put(set(&["a"]), 7);
        map.put(set(&["a"]), 7);
        assert_eq!(map.get(&set(&["a"])).len(), 2);
        assert_eq!(map.values().count(), 2);
    }

    #[test]
    fn query_matches_each_entry_once() {
        // Both elements of the stored key set appear in the query, but the
        // entry must only be reported once.
        let mut map = SubsetMap::new();
        map.put(set(&["a", "b"]), 9);
        assert_eq!(map.get(&set(&["b", "a"])).len(), 1);
    }

    #[test]
    #[should_panic(expected = "SubsetMap keys may not be empty")]
    fn empty_key_set_is_rejected() {
        let mut map = SubsetMap::new();
        map.put(Vec::<String>::new(), 1);
    }
}
