//! Property-based tests for samplespace enumeration.

use proptest::prelude::*;
use qcal_node::SweepShape;

proptest! {
    /// Every combination is visited exactly once and the flat index can be
    /// recovered with first-axis-fastest strides.
    #[test]
    fn combinations_are_a_bijection(lengths in prop::collection::vec(1_usize..=5, 0..=4)) {
        let shape = SweepShape::new(lengths.iter().enumerate().map(|(i, &n)| (format!("d{i}"), n)));
        let size = shape.size();
        prop_assert_eq!(size, lengths.iter().product::<usize>());

        let mut seen = std::collections::HashSet::new();
        for index in 0..size {
            let combination = shape.combination_at(index).unwrap();
            prop_assert_eq!(combination.len(), lengths.len());

            let mut stride = 1;
            let mut flat = 0;
            for (i, n) in combination.iter().zip(&lengths) {
                prop_assert!(i < n);
                flat += i * stride;
                stride *= n;
            }
            prop_assert_eq!(flat, index);
            prop_assert!(seen.insert(combination));
        }
        prop_assert!(shape.combination_at(size).is_none());
    }
}
