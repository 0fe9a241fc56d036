use std::collections::{BTreeMap, BTreeSet};

use super::model::{PlayerStatsTable, StatValue};
use crate::config::{POSITION_COLUMN, TEAM_COLUMNS};

// ---------------------------------------------------------------------------
// Filter predicate: which unique values are selected per column
// ---------------------------------------------------------------------------

/// Per-column selection state: maps column_name → set of selected values.
/// Columns absent from the map are not constrained; an empty set selects
/// nothing.
pub type FilterState = BTreeMap<String, BTreeSet<StatValue>>;

/// The categorical columns offered in the sidebar, in display order:
/// the team column (whichever name the page uses) then position.
pub fn filter_columns(table: &PlayerStatsTable) -> Vec<String> {
    table
        .find_column(TEAM_COLUMNS)
        .into_iter()
        .chain(std::iter::once(POSITION_COLUMN))
        .filter(|col| table.column_index(col).is_some())
        .map(str::to_string)
        .collect()
}

/// Initialise a [`FilterState`] with every team and position selected.
pub fn init_filter_state(table: &PlayerStatsTable) -> FilterState {
    filter_columns(table)
        .into_iter()
        .filter_map(|col| {
            let values = table.unique_values(&col)?.clone();
            Some((col, values))
        })
        .collect()
}

/// Return indices of rows that pass all active filters.
///
/// A row passes a column filter when its value for that column is in the
/// selected set. Filters on columns the table does not have are ignored.
pub fn filtered_indices(table: &PlayerStatsTable, filters: &FilterState) -> Vec<usize> {
    let active: Vec<(usize, &BTreeSet<StatValue>)> = filters
        .iter()
        .filter_map(|(col, selected)| Some((table.column_index(col)?, selected)))
        .collect();

    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            active
                .iter()
                .all(|(col, selected)| selected.contains(&row[*col]))
        })
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{parse_stats_page, tests::SAMPLE_PAGE};

    fn text(s: &str) -> StatValue {
        StatValue::Text(s.to_string())
    }

    fn sample() -> PlayerStatsTable {
        parse_stats_page(SAMPLE_PAGE).unwrap()
    }

    fn apply(table: &PlayerStatsTable, filters: &FilterState) -> PlayerStatsTable {
        table.select_rows(&filtered_indices(table, filters))
    }

    #[test]
    fn sidebar_columns_are_team_then_position() {
        assert_eq!(filter_columns(&sample()), vec!["Tm".to_string(), "Pos".to_string()]);
    }

    #[test]
    fn full_selection_is_identity() {
        let table = sample();
        let filters = init_filter_state(&table);
        assert_eq!(apply(&table, &filters), table);
    }

    #[test]
    fn empty_selection_returns_no_rows() {
        let table = sample();
        let mut filters = init_filter_state(&table);
        filters.insert("Pos".into(), BTreeSet::new());
        assert!(filtered_indices(&table, &filters).is_empty());

        let mut filters = init_filter_state(&table);
        filters.insert("Tm".into(), BTreeSet::new());
        assert!(apply(&table, &filters).is_empty());
    }

    #[test]
    fn lakers_point_guards_only() {
        let table = sample();
        let mut filters = init_filter_state(&table);
        filters.insert("Tm".into(), BTreeSet::from([text("LAL")]));
        filters.insert("Pos".into(), BTreeSet::from([text("PG")]));

        let view = apply(&table, &filters);
        let tm = view.column_index("Tm").unwrap();
        let pos = view.column_index("Pos").unwrap();
        let player = view.column_index("Player").unwrap();
        assert_eq!(view.len(), 2);
        assert!(view.rows.iter().all(|r| r[tm] == text("LAL") && r[pos] == text("PG")));
        assert_eq!(view.rows[0][player], text("LeBron James"));
    }

    #[test]
    fn reapplying_is_idempotent() {
        let table = sample();
        let mut filters = init_filter_state(&table);
        filters.insert("Pos".into(), BTreeSet::from([text("PF"), text("C")]));

        let once = apply(&table, &filters);
        let twice = apply(&once, &filters);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 6);
    }

    #[test]
    fn unknown_filter_column_is_ignored() {
        let table = sample();
        let mut filters = FilterState::new();
        filters.insert("Conference".into(), BTreeSet::new());
        assert_eq!(filtered_indices(&table, &filters).len(), table.len());
    }
}
