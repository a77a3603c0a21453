//! Grid Catalog
//!
//! Static table of the buttons shown on the panel, four per row.

use crate::domain::models::GridValue;

/// Buttons per grid row
pub const GRID_COLUMNS: usize = 4;

pub const GRID_VALUES: &[GridValue] = &[
    GridValue { id: "v1", label: "1", value: 1.0 },
    GridValue { id: "v2", label: "2", value: 2.0 },
    GridValue { id: "v5", label: "5", value: 5.0 },
    GridValue { id: "v10", label: "10", value: 10.0 },
    GridValue { id: "v20", label: "20", value: 20.0 },
    GridValue { id: "v25", label: "25", value: 25.0 },
    GridValue { id: "v50", label: "50", value: 50.0 },
    GridValue { id: "v75", label: "75", value: 75.0 },
    GridValue { id: "v100", label: "100", value: 100.0 },
    GridValue { id: "v150", label: "150", value: 150.0 },
    GridValue { id: "v200", label: "200", value: 200.0 },
    GridValue { id: "v250", label: "250", value: 250.0 },
    GridValue { id: "v500", label: "500", value: 500.0 },
    GridValue { id: "v750", label: "750", value: 750.0 },
    GridValue { id: "v1k", label: "1K", value: 1000.0 },
    GridValue { id: "vmax", label: "MAX", value: 9999.0 },
];

/// Look up a button by its label, ignoring case. Labels are numbers, so
/// grid positions are never accepted as input.
pub fn find(input: &str) -> Option<&'static GridValue> {
    let input = input.trim();
    GRID_VALUES
        .iter()
        .find(|item| item.label.eq_ignore_ascii_case(input))
}

/// Rows of the grid in display order
pub fn rows() -> impl Iterator<Item = &'static [GridValue]> {
    GRID_VALUES.chunks(GRID_COLUMNS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_labels_and_ids_are_unique() {
        let labels: HashSet<_> = GRID_VALUES.iter().map(|v| v.label).collect();
        let ids: HashSet<_> = GRID_VALUES.iter().map(|v| v.id).collect();
        assert_eq!(labels.len(), GRID_VALUES.len());
        assert_eq!(ids.len(), GRID_VALUES.len());
    }

    #[test]
    fn test_find_by_label() {
        assert_eq!(find("1").map(|v| v.label), Some("1"));
        assert_eq!(find("10").map(|v| v.label), Some("10"));
        assert_eq!(find("max").map(|v| v.value), Some(9999.0));
        assert_eq!(find(" 1k ").map(|v| v.value), Some(1000.0));
        assert!(find("3").is_none());
        assert!(find("16").is_none());
        assert!(find("nope").is_none());
    }

    #[test]
    fn test_numeric_input_only_ever_matches_its_own_label() {
        for n in 0..=10_000 {
            let input = n.to_string();
            if let Some(item) = find(&input) {
                assert_eq!(item.label, input);
            }
        }
        for item in GRID_VALUES {
            assert_eq!(find(item.label).map(|v| v.id), Some(item.id));
        }
    }

    #[test]
    fn test_rows_are_full() {
        assert!(rows().all(|row| row.len() == GRID_COLUMNS));
        assert_eq!(rows().count(), GRID_VALUES.len() / GRID_COLUMNS);
    }
}
