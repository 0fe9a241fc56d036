use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{LAST_SEASON, Settings};
use crate::data::cache::StatsCache;
use crate::data::export;
use crate::data::filter::{FilterState, filter_columns, filtered_indices, init_filter_state};
use crate::data::loader::{self, StatsSource};
use crate::data::model::{PlayerStatsTable, StatValue};
use crate::data::stats::{CorrelationMatrix, correlation_matrix};

// ---------------------------------------------------------------------------
// Where the current table came from
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum TableOrigin {
    Season(u16),
    File(PathBuf),
}

impl std::fmt::Display for TableOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableOrigin::Season(year) => write!(f, "{year}"),
            TableOrigin::File(path) => write!(f, "{}", path.display()),
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering. Every control maps to one
/// method here.
pub struct AppState {
    pub settings: Settings,

    source: Box<dyn StatsSource>,
    cache: StatsCache,

    /// Season chosen in the year selector.
    pub year: u16,

    /// Loaded table (None until the first successful load).
    pub table: Option<PlayerStatsTable>,
    pub origin: Option<TableOrigin>,

    /// Per-column filter selections (team, position).
    pub filters: FilterState,

    /// Indices of rows passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Correlation matrix of the current selection, shown until the next
    /// selection change.
    pub heatmap: Option<CorrelationMatrix>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(settings: Settings, source: Box<dyn StatsSource>) -> Self {
        Self {
            settings,
            source,
            cache: StatsCache::default(),
            year: LAST_SEASON,
            table: None,
            origin: None,
            filters: FilterState::default(),
            visible_indices: Vec::new(),
            heatmap: None,
            status_message: None,
        }
    }

    /// Ingest a table, select every team and position.
    pub fn set_table(&mut self, table: PlayerStatsTable, origin: TableOrigin) {
        self.filters = init_filter_state(&table);
        self.visible_indices = (0..table.len()).collect();
        self.heatmap = None;
        self.table = Some(table);
        self.origin = Some(origin);
        self.status_message = None;
    }

    // -- Year selector --

    /// Switch to `year`, loading it through the cache.
    pub fn select_year(&mut self, year: u16) {
        let source = self.source.as_ref();
        match self
            .cache
            .get_or_try_load(year, |y| loader::load_season(source, y))
        {
            Ok(table) => {
                let table = table.clone();
                self.year = year;
                self.set_table(table, TableOrigin::Season(year));
            }
            Err(e) => {
                log::error!("Failed to load season {year}: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Drop the cached copy of the current season and fetch it again.
    pub fn reload_year(&mut self) {
        if self.cache.invalidate(self.year) {
            log::info!("Season {}: cache invalidated", self.year);
        }
        self.select_year(self.year);
    }

    /// Forget every cached season; the current table stays on screen.
    pub fn clear_cache(&mut self) {
        if !self.cache.is_empty() {
            log::info!("Dropping {} cached seasons", self.cache.len());
        }
        self.cache.clear();
    }

    pub fn is_cached(&self, year: u16) -> bool {
        self.cache.contains(year)
    }

    // -- Filters --

    /// Team and position columns of the current table.
    pub fn filter_columns(&self) -> Vec<String> {
        self.table.as_ref().map(filter_columns).unwrap_or_default()
    }

    /// Recompute `visible_indices` after filter change.
    pub fn refilter(&mut self) {
        if let Some(table) = &self.table {
            self.visible_indices = filtered_indices(table, &self.filters);
        }
        self.heatmap = None;
    }

    /// Toggle a single value in a column's selection.
    pub fn toggle_filter_value(&mut self, column: &str, value: &StatValue) {
        let selected = self.filters.entry(column.to_string()).or_default();
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
        self.refilter();
    }

    /// Select all values in a column.
    pub fn select_all(&mut self, column: &str) {
        if let Some(all_vals) = self.table.as_ref().and_then(|t| t.unique_values(column)) {
            self.filters.insert(column.to_string(), all_vals.clone());
            self.refilter();
        }
    }

    /// Deselect all values in a column.
    pub fn select_none(&mut self, column: &str) {
        self.filters.insert(column.to_string(), BTreeSet::new());
        self.refilter();
    }

    // -- Presentation --

    /// The rows currently passing the filters, as a table.
    pub fn filtered_table(&self) -> Option<PlayerStatsTable> {
        self.table
            .as_ref()
            .map(|t| t.select_rows(&self.visible_indices))
    }

    /// HTML anchor downloading the filtered table.
    pub fn download_link(&self) -> Option<String> {
        let table = self.filtered_table()?;
        match export::download_link(&table) {
            Ok(link) => Some(link),
            Err(e) => {
                log::error!("Failed to build download link: {e:#}");
                None
            }
        }
    }

    /// Correlate the filtered table's numeric columns. The table goes
    /// through the scratch CSV and is read back under its own column kinds.
    pub fn request_heatmap(&mut self) {
        match self.compute_heatmap() {
            Ok(matrix) => {
                log::info!("Heatmap over {} columns", matrix.size());
                self.heatmap = Some(matrix);
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Heatmap failed: {e:#}");
                self.heatmap = None;
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    fn compute_heatmap(&self) -> Result<CorrelationMatrix> {
        let table = self.filtered_table().context("no table loaded")?;
        let scratch = &self.settings.scratch_csv;
        export::save_csv(&table, scratch)?;
        let reread = loader::load_csv_as(scratch, &table.column_kinds())?;
        Ok(correlation_matrix(&reread)?)
    }

    // -- Files --

    /// Replace the current table with a snapshot file.
    pub fn open_file(&mut self, path: &Path) {
        match loader::load_file(path) {
            Ok(table) => {
                log::info!(
                    "Loaded {} rows with columns {:?} from {}",
                    table.len(),
                    table.columns,
                    path.display()
                );
                self.set_table(table, TableOrigin::File(path.to_path_buf()));
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Write the filtered table to `path` (format from the extension).
    pub fn save_filtered(&mut self, path: &Path) {
        let result = self
            .filtered_table()
            .context("no table loaded")
            .and_then(|table| export::save_file(&table, path));
        if let Err(e) = result {
            log::error!("Failed to save {}: {e:#}", path.display());
            self.status_message = Some(format!("Error: {e:#}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::LoadError;
    use crate::data::loader::tests::{FixtureSource, SAMPLE_PAGE};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Fixture page, counting fetches; fails for 1950.
    struct CountingSource(Rc<Cell<usize>>);

    impl StatsSource for CountingSource {
        fn fetch_page(&self, year: u16) -> Result<String, LoadError> {
            self.0.set(self.0.get() + 1);
            if year == 1950 {
                return Err(LoadError::NoTable);
            }
            Ok(SAMPLE_PAGE.to_string())
        }
    }

    fn state_in(dir: &Path) -> AppState {
        let settings = Settings {
            scratch_csv: dir.join("output.csv"),
            ..Settings::default()
        };
        AppState::new(settings, Box::new(FixtureSource))
    }

    fn text(s: &str) -> StatValue {
        StatValue::Text(s.to_string())
    }

    #[test]
    fn selecting_a_year_shows_every_player() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_in(dir.path());
        state.select_year(2020);

        let table = state.table.as_ref().unwrap();
        assert!(table.column_index("Rk").is_none());
        assert_eq!(state.visible_indices.len(), table.len());
        assert_eq!(state.origin, Some(TableOrigin::Season(2020)));
        assert_eq!(state.filter_columns(), vec!["Tm".to_string(), "Pos".to_string()]);
    }

    #[test]
    fn seasons_are_fetched_once_until_reload() {
        let calls = Rc::new(Cell::new(0));
        let mut state = AppState::new(Settings::default(), Box::new(CountingSource(calls.clone())));

        state.select_year(2020);
        state.select_year(2019);
        state.select_year(2020);
        assert_eq!(calls.get(), 2);
        assert!(state.is_cached(2019));

        state.reload_year();
        assert_eq!(calls.get(), 3);

        state.clear_cache();
        assert!(!state.is_cached(2019));
        assert!(state.table.is_some());
    }

    #[test]
    fn failed_load_keeps_previous_table() {
        let calls = Rc::new(Cell::new(0));
        let mut state = AppState::new(Settings::default(), Box::new(CountingSource(calls)));
        state.select_year(2020);
        state.select_year(1950);

        assert!(state.status_message.as_deref().unwrap().contains("no <table>"));
        assert_eq!(state.origin, Some(TableOrigin::Season(2020)));
        assert_eq!(state.year, 2020);
        assert!(!state.is_cached(1950));
    }

    #[test]
    fn toggles_narrow_and_restore_the_view() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_in(dir.path());
        state.select_year(2020);
        let total = state.visible_indices.len();

        state.select_none("Tm");
        assert!(state.visible_indices.is_empty());
        state.toggle_filter_value("Tm", &text("LAL"));
        assert_eq!(state.visible_indices.len(), 5);
        state.toggle_filter_value("Tm", &text("LAL"));
        assert!(state.visible_indices.is_empty());
        state.select_all("Tm");
        assert_eq!(state.visible_indices.len(), total);
    }

    #[test]
    fn heatmap_goes_through_scratch_csv_and_clears_on_filter() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_in(dir.path());
        state.select_year(2020);

        state.request_heatmap();
        assert!(state.heatmap.is_some());
        assert!(dir.path().join("output.csv").exists());

        state.toggle_filter_value("Pos", &text("C"));
        assert!(state.heatmap.is_none());
    }

    #[test]
    fn heatmap_on_empty_selection_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_in(dir.path());
        state.select_year(2020);
        state.select_none("Pos");

        state.request_heatmap();
        assert!(state.heatmap.is_none());
        assert!(state.status_message.is_some());
    }

    #[test]
    fn download_link_and_snapshot_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_in(dir.path());
        assert!(state.download_link().is_none());

        state.select_year(2020);
        state.select_none("Tm");
        state.toggle_filter_value("Tm", &text("LAL"));
        assert!(state.download_link().unwrap().starts_with("<a href=\"data:file/csv;base64,"));

        let path = dir.path().join("lakers.json");
        state.save_filtered(&path);
        assert!(state.status_message.is_none());

        state.open_file(&path);
        assert_eq!(state.table.as_ref().unwrap().len(), 5);
        assert_eq!(state.origin, Some(TableOrigin::File(path)));
    }
}
