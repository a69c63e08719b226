//! Property tests over generated method bodies and counter vectors.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use srcprof::coverage::{instrument_source, CountsSnapshot, InstrumentedUnit, ReportAggregator};
use srcprof::InstrumentConfig;
use std::path::Path;

fn statement() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        Just("a();".to_string()),
        Just("x = y + 1;".to_string()),
        Just("v = c ? 1 : 2;".to_string()),
        Just("r = () -> go();".to_string()),
        Just("list.forEach(e -> { use(e); });".to_string()),
    ];
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(|s| format!("if (c) {{ {s} }}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("if (c) {a} else {b}")),
            inner.clone().prop_map(|s| format!("while (n-- > 0) {s}")),
            inner
                .clone()
                .prop_map(|s| format!("for (int i = 0; i < n; i++) {{ {s} }}")),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| format!("try {{ {a} }} catch (E e) {{ {b} }}")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!(
                "switch (k) {{ case 1: {a} break; default: {b} }}"
            )),
            prop::collection::vec(inner, 1..3).prop_map(|v| format!("{{ {} }}", v.join(" "))),
        ]
    })
}

fn program() -> impl Strategy<Value = String> {
    prop::collection::vec(statement(), 1..4).prop_map(|methods| {
        let body: String = methods
            .iter()
            .enumerate()
            .map(|(i, s)| format!("  void m{i}(boolean c, int n, int k) {{\n    {s}\n  }}\n"))
            .collect();
        format!("class Gen {{\n{body}}}\n")
    })
}

fn instrument(source: &str) -> InstrumentedUnit {
    instrument_source(Path::new("Gen.java"), source, &InstrumentConfig::default()).unwrap()
}

fn counts(len: usize) -> impl Strategy<Value = (Vec<u64>, Vec<u64>, Vec<u64>)> {
    let v = move || prop::collection::vec(0u64..1_000, len);
    (v(), v(), v())
}

proptest! {
    #[test]
    fn prop_merge_commutative((a, b, _) in (0usize..32).prop_flat_map(counts)) {
        let mut ab = CountsSnapshot::new(a.clone());
        ab.merge(&CountsSnapshot::new(b.clone())).unwrap();
        let mut ba = CountsSnapshot::new(b);
        ba.merge(&CountsSnapshot::new(a)).unwrap();
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn prop_merge_associative((a, b, c) in (0usize..32).prop_flat_map(counts)) {
        let (a, b, c) = (CountsSnapshot::new(a), CountsSnapshot::new(b), CountsSnapshot::new(c));
        let mut left = a.clone();
        left.merge(&b).unwrap();
        left.merge(&c).unwrap();
        let mut bc = b;
        bc.merge(&c).unwrap();
        let mut right = a;
        right.merge(&bc).unwrap();
        prop_assert_eq!(left, right);
    }

    #[test]
    fn prop_mismatched_lengths_never_merge(a in 0usize..16, b in 0usize..16) {
        prop_assume!(a != b);
        let mut left = CountsSnapshot::zeroed(a);
        prop_assert!(left.merge(&CountsSnapshot::zeroed(b)).is_err());
        prop_assert_eq!(left.len(), a);
    }

    #[test]
    fn prop_extraction_deterministic_and_nested(source in program()) {
        let first = instrument(&source);
        let second = instrument(&source);
        prop_assert_eq!(&first.outcome, &second.outcome);
        prop_assert_eq!(&first.rewritten, &second.rewritten);

        for (i, block) in first.outcome.blocks.iter().enumerate() {
            prop_assert_eq!(block.id.index(), i);
            prop_assert!(block.start <= block.end);
            if let Some(parent) = block.parent {
                let parent = first.outcome.block(parent).unwrap();
                prop_assert!(parent.start <= block.start && block.end <= parent.end);
            }
        }
    }

    #[test]
    fn prop_rewritten_source_parses(source in program()) {
        let unit = instrument(&source);
        let again = instrument_source(
            Path::new("Gen.java"),
            &unit.rewritten,
            &InstrumentConfig::default(),
        );
        prop_assert!(again.is_ok(), "{}", unit.rewritten);
    }

    #[test]
    fn prop_every_decision_has_two_sides(source in program()) {
        let config = InstrumentConfig::default();
        let metadata = instrument(&source).into_metadata(&config);
        let report = ReportAggregator::new(&metadata).report();
        prop_assert_eq!(
            report.totals.branches.total,
            2 * metadata.decisions().count()
        );
        for decision in metadata.decisions() {
            prop_assert_ne!(decision.true_side, decision.false_side);
        }
    }

    #[test]
    fn prop_more_counts_never_lose_coverage(
        (source, seed) in program().prop_flat_map(|s| {
            let len = instrument(&s).outcome.counter_count();
            (Just(s), prop::collection::vec((0u64..3, 0u64..3), len))
        })
    ) {
        let config = InstrumentConfig::default();
        let metadata = instrument(&source).into_metadata(&config);
        let (base, extra): (Vec<u64>, Vec<u64>) = seed.into_iter().unzip();

        let mut low = ReportAggregator::new(&metadata);
        low.add_snapshot(&CountsSnapshot::new(base.clone())).unwrap();
        let mut high = ReportAggregator::new(&metadata);
        high.add_snapshot(&CountsSnapshot::new(base)).unwrap();
        high.add_snapshot(&CountsSnapshot::new(extra)).unwrap();

        let (low, high) = (low.report().totals, high.report().totals);
        prop_assert!(low.blocks.covered <= high.blocks.covered);
        prop_assert!(low.branches.covered <= high.branches.covered);
        prop_assert!(low.lines.covered <= high.lines.covered);
        prop_assert!(low.hits <= high.hits);
    }
}
