//! Property-based tests for sorting and projection.
//!
//! Uses `proptest` to check that any batch of rows sorts into a stable,
//! correctly ordered permutation in either direction, and that projection is a
//! pure function of its input.

use std::cmp::Ordering;

use proptest::prelude::*;

use super::TopicId;
use super::catalog;
use super::dataset::SortableDataset;
use super::row::{Row, Value};

// ──────────────────── strategies ────────────────────

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        (0_i64..5).prop_map(Value::Integer),
        (0_i32..5).prop_map(|n| Value::Decimal(f64::from(n) / 2.0)),
        "[a-c]{0,2}".prop_map(Value::Text),
    ]
}

/// Project rows tagged with their fetch position in `id`.
fn arb_rows() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec((arb_value(), "[a-c]{1,2}", 0_i64..4), 0..40).prop_map(|cells| {
        cells
            .into_iter()
            .enumerate()
            .map(|(index, (name, owner, size))| {
                Row::new()
                    .with("id", format!("{index:04}"))
                    .with("name", name)
                    .with("owner", owner)
                    .with("size", size)
            })
            .collect()
    })
}

fn dataset(rows: Vec<Row>, column: usize, ascending: bool) -> SortableDataset {
    let definition = catalog::definition(TopicId::Projects);
    let mut dataset = SortableDataset::new(definition.columns, definition.default_sort).unwrap();
    dataset.replace_rows(rows);
    dataset.set_sort(column, ascending).unwrap();
    dataset
}

fn position(row: &Row) -> String {
    row.get("id").to_string()
}

// ──────────────────── properties ────────────────────

proptest! {
    #[test]
    fn sorted_rows_are_ordered_and_stable(
        rows in arb_rows(),
        column in 0_usize..4,
        ascending in any::<bool>(),
    ) {
        let key = catalog::definition(TopicId::Projects).columns[column].key;
        let sorted = dataset(rows.clone(), column, ascending).ordered_rows();
        prop_assert_eq!(sorted.len(), rows.len());

        for pair in sorted.windows(2) {
            let mut ordering = pair[0].get(key).compare(pair[1].get(key));
            if !ascending {
                ordering = ordering.reverse();
            }
            prop_assert_ne!(ordering, Ordering::Greater);
            if ordering == Ordering::Equal {
                prop_assert!(position(&pair[0]) < position(&pair[1]), "ties keep fetch order");
            }
        }
    }

    #[test]
    fn sorting_is_a_permutation(rows in arb_rows(), column in 0_usize..4) {
        let mut sorted: Vec<String> = dataset(rows.clone(), column, false)
            .ordered_rows()
            .iter()
            .map(position)
            .collect();
        sorted.sort();
        let original: Vec<String> = rows.iter().map(position).collect();
        prop_assert_eq!(sorted, original);
    }

    #[test]
    fn double_reverse_restores_order(rows in arb_rows(), column in 0_usize..4) {
        let mut data = dataset(rows, column, true);
        let before = data.ordered_rows();
        data.reverse();
        data.reverse();
        prop_assert_eq!(data.ordered_rows(), before);
    }

    #[test]
    fn projection_is_pure(rows in arb_rows()) {
        let projection = catalog::definition(TopicId::Projects).projection();
        let first = projection.project(&rows);
        let second = projection.project(&rows);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.row_count(), rows.len());
        for cells in &first.rows {
            prop_assert_eq!(cells.len(), first.widths.len());
            for (cell, width) in cells.iter().zip(&first.widths) {
                prop_assert!(cell.text.chars().count() <= *width);
            }
        }
    }
}
