//! Property-based tests (proptest) for distances, signatures, entropy and the ensemble.

use proptest::prelude::*;
use std::f64::consts::FRAC_PI_2;

use firststory::lsh::HashTable;
use firststory::{cosine_distance, LshIndex, SparseVector, TopicThread};

fn word_set() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..60, 1..12)
}

fn sample() -> Vec<u32> {
    (0..60).cycle().take(1200).collect()
}

proptest! {
    #[test]
    fn prop_distance_symmetric_and_bounded(a in word_set(), b in word_set()) {
        let a = SparseVector::new(a);
        let b = SparseVector::new(b);
        let ab = cosine_distance(1, &a, &b).unwrap();
        let ba = cosine_distance(1, &b, &a).unwrap();

        prop_assert_eq!(ab, ba);
        prop_assert!((0.0..=FRAC_PI_2 + 1e-12).contains(&ab));
    }

    #[test]
    fn prop_distance_to_self_is_zero(a in word_set()) {
        let a = SparseVector::new(a);
        prop_assert_eq!(cosine_distance(1, &a, &a).unwrap(), 0.0);
    }

    #[test]
    fn prop_signature_has_one_bit_per_hyperplane(
        planes in 1usize..150,
        words in word_set(),
        seed in any::<u64>(),
    ) {
        let table = HashTable::new(planes, 10, &sample(), seed).unwrap();
        let signature = table.signature(&SparseVector::new(words));
        prop_assert_eq!(signature.len(), planes);
        prop_assert!(signature.count_ones() as usize <= planes);
    }

    #[test]
    fn prop_entropy_nonnegative_and_bounded(items in prop::collection::vec(word_set(), 0..20)) {
        let mut thread = TopicThread::new(0);
        for (i, words) in items.into_iter().enumerate() {
            thread.add(i as u64 + 1, &SparseVector::new(words), 0.0);
        }
        let entropy = thread.entropy();
        prop_assert!(entropy >= 0.0);
        if entropy == 0.0 {
            prop_assert!(thread.distinct_words() <= 1);
        } else {
            prop_assert!(thread.distinct_words() > 1);
        }
        if thread.distinct_words() > 0 {
            prop_assert!(entropy <= (thread.distinct_words() as f64).ln() + 1e-9);
        }
    }

    #[test]
    fn prop_ensemble_no_worse_than_any_table(
        items in prop::collection::vec(word_set(), 1..30),
        seed in any::<u64>(),
    ) {
        let mut index = LshIndex::new(4, 8, 5, &sample(), seed).unwrap();
        for (i, words) in items.into_iter().enumerate() {
            let item = i as u64;
            let vector = SparseVector::new(words);
            let best = index.insert(item, &vector).unwrap();

            for table in index.tables() {
                let local = table
                    .nearest_neighbor(item, &vector, &table.signature(&vector))
                    .unwrap();
                prop_assert!(best.distance <= local.distance);
            }
            prop_assert_eq!(best.neighbor.is_some(), best.distance.is_finite());
        }
    }

    #[test]
    fn prop_buckets_never_exceed_capacity(
        items in prop::collection::vec(word_set(), 1..60),
        capacity in 1usize..6,
    ) {
        let mut table = HashTable::new(3, capacity, &sample(), 11).unwrap();
        for (i, words) in items.into_iter().enumerate() {
            table.insert(i as u64, &SparseVector::new(words));
        }
        prop_assert!(table.largest_bucket() <= capacity);
        prop_assert!(table.buckets().iter().all(|bucket| bucket.len() <= capacity));
    }
}
