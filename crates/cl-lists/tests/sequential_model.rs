//! Single-threaded runs compared step by step against `BTreeSet`.

use std::collections::BTreeSet;

use cl_core::{ConcurrentSet, Key};
use cl_dst::{get_or_generate_seed, DeterministicRng};
use cl_lists::{CoarseGrainedSet, LazySet, LockFreeSet};

const STEPS: u64 = 5_000;

/// Replay `STEPS` random operations on `S` and on the model.
///
/// With `duplicate_insert_is_true`, inserting a present key is expected to
/// report `true` while still leaving the set unchanged.
fn check_against_model<S: ConcurrentSet + Default>(seed: u64, max_key: Key, duplicate_insert_is_true: bool) {
    let set = S::default();
    let mut model = BTreeSet::new();
    let mut rng = DeterministicRng::new(seed);

    for step in 0..STEPS {
        let key = rng.gen_key(max_key);
        match rng.gen_range(0..3u8) {
            0 => assert_eq!(
                set.search(key),
                model.contains(&key),
                "{} step {}: search({}) (DST_SEED={})",
                S::NAME,
                step,
                key,
                seed
            ),
            1 => {
                let newly_added = model.insert(key);
                let expected = newly_added || duplicate_insert_is_true;
                assert_eq!(
                    set.insert(key),
                    expected,
                    "{} step {}: insert({}) (DST_SEED={})",
                    S::NAME,
                    step,
                    key,
                    seed
                );
            }
            _ => assert_eq!(
                set.delete(key),
                model.remove(&key),
                "{} step {}: delete({}) (DST_SEED={})",
                S::NAME,
                step,
                key,
                seed
            ),
        }
    }

    let expected: Vec<Key> = model.into_iter().collect();
    assert_eq!(set.snapshot(), expected, "{} final snapshot (DST_SEED={})", S::NAME, seed);
}

#[test]
fn test_coarse_grained_matches_model() {
    let seed = get_or_generate_seed();
    check_against_model::<CoarseGrainedSet>(seed, 64, true);
}

#[test]
fn test_lazy_matches_model() {
    let seed = get_or_generate_seed();
    check_against_model::<LazySet>(seed, 64, false);
}

#[test]
fn test_lock_free_matches_model() {
    let seed = get_or_generate_seed();
    check_against_model::<LockFreeSet>(seed, 64, false);
}

#[test]
fn test_sparse_keys_match_model() {
    // Wide key range: mostly misses, long lists.
    for seed in [1, 2, 3] {
        check_against_model::<CoarseGrainedSet>(seed, 10_000, true);
        check_against_model::<LazySet>(seed, 10_000, false);
        check_against_model::<LockFreeSet>(seed, 10_000, false);
    }
}

#[test]
fn test_snapshot_is_strictly_ascending_after_churn() {
    fn check<S: ConcurrentSet + Default>() {
        let set = S::default();
        let mut rng = DeterministicRng::new(99);
        for _ in 0..1_000 {
            let key = rng.gen_range(-500..500);
            if rng.gen_bool(0.6) {
                set.insert(key);
            } else {
                set.delete(key);
            }
        }

        let keys = set.snapshot();
        assert!(keys.windows(2).all(|w| w[0] < w[1]), "{}: {:?}", S::NAME, keys);
    }

    check::<CoarseGrainedSet>();
    check::<LazySet>();
    check::<LockFreeSet>();
}
