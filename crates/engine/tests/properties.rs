// Property-based tests for the all-pairs matcher.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;
use colmatch_engine::document::TabularDocument;
use colmatch_engine::error::Side;
use colmatch_engine::matcher::find_matches;
use colmatch_engine::options::MissingColumnPolicy;

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Small alphabet so collisions are common.
fn arb_cell() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-c]{1,2}",
        1 => Just("".to_string()),
        1 => "[0-9]{1,2}",
    ]
}

/// Ragged rows: widths 0..4.
fn arb_rows() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec(arb_cell(), 0..4), 0..8)
}

fn table(rows: Vec<Vec<String>>) -> TabularDocument {
    TabularDocument::new("t.xlsx", "Sheet1", rows)
}

proptest! {
    #![proptest_config(config_256())]

    /// Skip policy reports exactly the pairs a brute-force scan finds.
    #[test]
    fn skip_matches_brute_force(a in arb_rows(), b in arb_rows(), col_a in 0usize..3, col_b in 0usize..3) {
        let ta = table(a);
        let tb = table(b);
        let out = find_matches(&ta, col_a, &tb, col_b, MissingColumnPolicy::Skip).unwrap();

        let mut expected = Vec::new();
        for i in 0..ta.row_count() {
            for j in 0..tb.row_count() {
                if let (Some(x), Some(y)) = (ta.cell(i, col_a), tb.cell(j, col_b)) {
                    if x == y {
                        expected.push((i, j));
                    }
                }
            }
        }
        let got: Vec<_> = out.iter().map(|m| (m.row_a, m.row_b)).collect();
        prop_assert_eq!(got, expected);
    }

    /// Every reported pair really is equal, and the value is the shared text.
    #[test]
    fn reported_pairs_are_equal(a in arb_rows(), b in arb_rows(), col_a in 0usize..3, col_b in 0usize..3) {
        let ta = table(a);
        let tb = table(b);
        for m in find_matches(&ta, col_a, &tb, col_b, MissingColumnPolicy::Skip).unwrap() {
            prop_assert_eq!(ta.cell(m.row_a, col_a), Some(m.value.as_str()));
            prop_assert_eq!(tb.cell(m.row_b, col_b), Some(m.value.as_str()));
        }
    }

    /// Abort either agrees with skip (no narrow row met) or names a row that really is narrow.
    #[test]
    fn abort_is_consistent_with_skip(a in arb_rows(), b in arb_rows(), col_a in 0usize..3, col_b in 0usize..3) {
        let ta = table(a);
        let tb = table(b);
        let skip = find_matches(&ta, col_a, &tb, col_b, MissingColumnPolicy::Skip).unwrap();
        match find_matches(&ta, col_a, &tb, col_b, MissingColumnPolicy::Abort) {
            Ok(strict) => prop_assert_eq!(strict, skip),
            Err(narrow) => match narrow.side {
                Side::A => prop_assert!(ta.width(narrow.row) <= col_a),
                Side::B => prop_assert!(tb.width(narrow.row) <= col_b),
            },
        }
    }

    /// Disjoint value sets never match.
    #[test]
    fn disjoint_columns_never_match(a in arb_rows(), b in arb_rows()) {
        let prefix = |rows: Vec<Vec<String>>, p: &str| -> Vec<Vec<String>> {
            rows.into_iter()
                .map(|r| r.into_iter().map(|c| format!("{p}{c}")).collect())
                .collect()
        };
        let ta = table(prefix(a, "L"));
        let tb = table(prefix(b, "R"));
        let out = find_matches(&ta, 0, &tb, 0, MissingColumnPolicy::Skip).unwrap();
        prop_assert!(out.is_empty());
    }
}
