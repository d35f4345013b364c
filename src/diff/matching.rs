//! Stable matching and classification utilities
//!
//! Generic building blocks the diff engine is assembled from: pair items
//! from two snapshots by a stable key, then classify pairs as changed or
//! unchanged. Ordering is deterministic and never re-sorted: `pairs` and
//! `added` follow the `after` snapshot's ordering, `removed` follows
//! `before`'s.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Outcome of matching two snapshots by key.
#[derive(Debug, Clone)]
pub struct MatchOutcome<T> {
    /// Present in both snapshots, in `after` order: (before, after)
    pub pairs: Vec<(T, T)>,
    /// Present only in `after`, in `after` order
    pub added: Vec<T>,
    /// Present only in `before`, in `before` order
    pub removed: Vec<T>,
}

/// Pair up `before` and `after` items by a stable key.
pub fn match_by_key<T, K, F>(before: &[T], after: &[T], key: F) -> MatchOutcome<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let before_by_key: HashMap<K, &T> = before.iter().map(|item| (key(item), item)).collect();
    let after_keys: HashSet<K> = after.iter().map(&key).collect();

    let mut pairs = Vec::new();
    let mut added = Vec::new();
    for item in after {
        match before_by_key.get(&key(item)) {
            Some(prev) => pairs.push(((*prev).clone(), item.clone())),
            None => added.push(item.clone()),
        }
    }

    let removed = before
        .iter()
        .filter(|item| !after_keys.contains(&key(item)))
        .cloned()
        .collect();

    MatchOutcome {
        pairs,
        added,
        removed,
    }
}

/// Pairs split into changed and unchanged, original order preserved.
#[derive(Debug, Clone)]
pub struct Classified<T> {
    pub changed: Vec<(T, T)>,
    pub unchanged: Vec<(T, T)>,
}

/// Partition matched pairs under a caller-supplied change predicate.
pub fn classify_pairs<T>(
    pairs: Vec<(T, T)>,
    is_changed: impl Fn(&T, &T) -> bool,
) -> Classified<T> {
    let (changed, unchanged) = pairs
        .into_iter()
        .partition(|(before, after)| is_changed(before, after));
    Classified { changed, unchanged }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u32,
        value: i64,
    }

    fn item(id: u32, value: i64) -> Item {
        Item { id, value }
    }

    #[test]
    fn test_match_by_key_basic() {
        let before = vec![item(1, 0), item(2, 0)];
        let after = vec![item(2, 0), item(3, 0)];

        let outcome = match_by_key(&before, &after, |i| i.id);

        assert_eq!(outcome.pairs.len(), 1);
        assert_eq!(outcome.pairs[0].1.id, 2);
        assert_eq!(outcome.added, vec![item(3, 0)]);
        assert_eq!(outcome.removed, vec![item(1, 0)]);
    }

    #[test]
    fn test_match_preserves_after_order_for_added_and_pairs() {
        let before = vec![item(5, 0), item(1, 0)];
        let after = vec![item(9, 0), item(1, 0), item(7, 0), item(5, 0)];

        let outcome = match_by_key(&before, &after, |i| i.id);

        let pair_ids: Vec<_> = outcome.pairs.iter().map(|(_, a)| a.id).collect();
        assert_eq!(pair_ids, vec![1, 5]);
        let added_ids: Vec<_> = outcome.added.iter().map(|i| i.id).collect();
        assert_eq!(added_ids, vec![9, 7]);
    }

    #[test]
    fn test_match_preserves_before_order_for_removed() {
        let before = vec![item(3, 0), item(1, 0), item(2, 0)];
        let after = vec![item(1, 0)];

        let outcome = match_by_key(&before, &after, |i| i.id);
        let removed_ids: Vec<_> = outcome.removed.iter().map(|i| i.id).collect();
        assert_eq!(removed_ids, vec![3, 2]);
    }

    #[test]
    fn test_match_empty_inputs() {
        let outcome = match_by_key(&[], &[item(1, 0)], |i: &Item| i.id);
        assert!(outcome.pairs.is_empty());
        assert_eq!(outcome.added.len(), 1);
        assert!(outcome.removed.is_empty());

        let outcome = match_by_key(&[item(1, 0)], &[], |i: &Item| i.id);
        assert_eq!(outcome.removed.len(), 1);
        assert!(outcome.added.is_empty());
    }

    #[test]
    fn test_classify_pairs_preserves_order() {
        // Five pairs, only #2 and #5 differ in value.
        let pairs: Vec<(Item, Item)> = vec![
            (item(1, 10), item(1, 10)),
            (item(2, 10), item(2, 11)),
            (item(3, 10), item(3, 10)),
            (item(4, 10), item(4, 10)),
            (item(5, 10), item(5, 99)),
        ];

        let classified = classify_pairs(pairs, |b, a| b.value != a.value);

        let changed_ids: Vec<_> = classified.changed.iter().map(|(b, _)| b.id).collect();
        assert_eq!(changed_ids, vec![2, 5]);
        let unchanged_ids: Vec<_> = classified.unchanged.iter().map(|(b, _)| b.id).collect();
        assert_eq!(unchanged_ids, vec![1, 3, 4]);
    }
}
