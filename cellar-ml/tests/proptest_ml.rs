//! Property-based tests for the split and the header check.

use cellar_ml::ValidationReport;
use cellar_ml::stages::train_test_split;
use proptest::prelude::*;
use std::collections::HashSet;

proptest! {
    #[test]
    fn split_partitions_all_rows(n in 2usize..500, test_size in 0.01f64..0.99, seed in any::<u64>()) {
        match train_test_split(n, test_size, seed) {
            Ok((train, test)) => {
                prop_assert_eq!(train.len() + test.len(), n);
                prop_assert_eq!(test.len(), (n as f64 * test_size).ceil() as usize);
                let all: HashSet<usize> = train.iter().chain(test.iter()).copied().collect();
                prop_assert_eq!(all.len(), n);
                prop_assert!(all.iter().all(|&i| i < n));
            }
            Err(_) => {
                // Only a split that would leave one side empty may be refused.
                let n_test = (n as f64 * test_size).ceil() as usize;
                prop_assert!(n_test == 0 || n_test >= n);
            }
        }
    }

    #[test]
    fn split_is_reproducible(n in 2usize..200, seed in any::<u64>()) {
        let a = train_test_split(n, 0.25, seed);
        let b = train_test_split(n, 0.25, seed);
        prop_assert_eq!(a.ok(), b.ok());
    }

    #[test]
    fn header_valid_iff_identical(
        names in prop::collection::vec("[a-z]{1,6}", 1..8),
        swap in any::<prop::sample::Index>(),
    ) {
        let expected: Vec<String> = names.clone();
        prop_assert!(ValidationReport::compare(&names, &expected).status);

        let mut renamed = names.clone();
        let i = swap.index(renamed.len());
        renamed[i].push('_');
        prop_assert!(!ValidationReport::compare(&renamed, &expected).status);

        let mut extended = names.clone();
        extended.push("extra column".to_string());
        prop_assert!(!ValidationReport::compare(&extended, &expected).status);

        let shortened = &names[..names.len() - 1];
        prop_assert!(!ValidationReport::compare(shortened, &expected).status);
    }
}
