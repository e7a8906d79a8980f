// Property tests for pending-set computation
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use std::collections::BTreeSet;
use tallyman_core::Version;
use tallyman_engine::manager::pending_versions;

fn version() -> impl Strategy<Value = Version> {
    (0i64..4_000_000_000).prop_map(|secs| {
        let at = chrono::DateTime::from_timestamp(secs, 0).unwrap().naive_utc();
        Version::from_timestamp(at)
    })
}

proptest! {
    #[test]
    fn pending_is_ordered_set_difference(
        available in prop::collection::btree_set(version(), 0..20),
        applied in prop::collection::vec(version(), 0..20),
        extra in prop::collection::vec(any::<prop::sample::Index>(), 0..10),
    ) {
        let available: Vec<Version> = available.into_iter().collect();
        // Mix in applied versions that are also available, some more than once
        let mut applied = applied;
        if !available.is_empty() {
            for idx in extra {
                applied.push(idx.get(&available).clone());
            }
        }

        let pending = pending_versions(available.clone(), &applied);

        let applied_set: BTreeSet<&Version> = applied.iter().collect();
        let expected: Vec<Version> = available
            .iter()
            .filter(|v| !applied_set.contains(v))
            .cloned()
            .collect();
        prop_assert_eq!(&pending, &expected);
        prop_assert!(pending.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(pending.iter().all(|v| !applied_set.contains(v)));
    }
}
