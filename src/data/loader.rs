use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};

use super::model::{ColumnKind, PlayerStatsTable, StatValue, typed_rows, typed_rows_as};
use crate::config::{
    AGE_COLUMN, FIRST_SEASON, LAST_SEASON, POSITION_COLUMN, RANK_COLUMN, Settings, TEAM_COLUMNS,
    USER_AGENT,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a season could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("season {0} is outside {}..={}", FIRST_SEASON, LAST_SEASON)]
    YearOutOfRange(u16),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("page contains no <table>")]
    NoTable,

    #[error("malformed stats table: {0}")]
    Malformed(String),

    #[error("stats table has no '{0}' column")]
    MissingColumn(String),
}

// ---------------------------------------------------------------------------
// Season source
// ---------------------------------------------------------------------------

/// Where season pages come from. The HTTP implementation is the real one;
/// anything returning per-game HTML works.
pub trait StatsSource {
    /// Raw HTML of the per-game stats page for `year`.
    fn fetch_page(&self, year: u16) -> Result<String, LoadError>;
}

/// Fetches `{base_url}/NBA_{year}_per_game.html` with a blocking client.
pub struct HttpStatsSource {
    client: Client,
    base_url: String,
}

impl HttpStatsSource {
    pub fn new(settings: &Settings) -> Result<Self, LoadError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
        })
    }
}

impl StatsSource for HttpStatsSource {
    fn fetch_page(&self, year: u16) -> Result<String, LoadError> {
        let url = season_url(&self.base_url, year);
        log::info!("GET {url}");
        let body = self.client.get(&url).send()?.error_for_status()?.text()?;
        log::debug!("{url}: {} bytes", body.len());
        Ok(body)
    }
}

pub fn season_url(base_url: &str, year: u16) -> String {
    format!("{}/NBA_{year}_per_game.html", base_url.trim_end_matches('/'))
}

pub fn check_season(year: u16) -> Result<u16, LoadError> {
    if (FIRST_SEASON..=LAST_SEASON).contains(&year) {
        Ok(year)
    } else {
        Err(LoadError::YearOutOfRange(year))
    }
}

/// Fetch and clean one season.
///
/// The result has no `Rk` column, no repeated header bands, and no missing
/// cells. Pages without a team or position column are rejected.
pub fn load_season(source: &dyn StatsSource, year: u16) -> Result<PlayerStatsTable, LoadError> {
    check_season(year)?;
    let html = source.fetch_page(year)?;
    let table = parse_stats_page(&html)?;

    if table.find_column(TEAM_COLUMNS).is_none() {
        return Err(LoadError::MissingColumn(TEAM_COLUMNS.join("/")));
    }
    if table.column_index(POSITION_COLUMN).is_none() {
        return Err(LoadError::MissingColumn(POSITION_COLUMN.to_string()));
    }

    log::info!(
        "Season {year}: {} rows, {} columns",
        table.len(),
        table.width()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// HTML table scraping
// ---------------------------------------------------------------------------

fn selector(css: &str) -> Result<Selector, LoadError> {
    Selector::parse(css).map_err(|e| LoadError::Malformed(format!("selector {css}: {e:?}")))
}

fn cell_texts(row: ElementRef<'_>, cells: &Selector) -> Vec<String> {
    row.select(cells)
        .map(|c| c.text().collect::<String>().trim().to_string())
        .collect()
}

/// Parse the first `<table>` of a stats page.
///
/// Header: the last `<thead>` row, or the first row when there is no
/// `<thead>`. Body: the `<tbody>` rows. Rows repeating the header (their
/// `Age` or `Pos` cell reads the column name) are dropped, empty cells
/// become zero, and the rank column is removed.
pub fn parse_stats_page(html: &str) -> Result<PlayerStatsTable, LoadError> {
    let document = Html::parse_document(html);
    let table = document
        .select(&selector("table")?)
        .next()
        .ok_or(LoadError::NoTable)?;
    let cell_sel = selector("th, td")?;

    let head_rows: Vec<ElementRef<'_>> = table.select(&selector("thead > tr")?).collect();
    let (header, body): (ElementRef<'_>, Vec<ElementRef<'_>>) = match head_rows.last() {
        Some(&header) => (header, table.select(&selector("tbody > tr")?).collect()),
        None => {
            let tr = selector("tr")?;
            let mut rows = table.select(&tr);
            let header = rows
                .next()
                .ok_or_else(|| LoadError::Malformed("table has no rows".into()))?;
            (header, rows.collect())
        }
    };

    let columns = cell_texts(header, &cell_sel);
    if columns.iter().all(String::is_empty) {
        return Err(LoadError::Malformed("header row has no cells".into()));
    }

    let sentinels: Vec<(usize, &str)> = [AGE_COLUMN, POSITION_COLUMN]
        .into_iter()
        .filter_map(|name| Some((columns.iter().position(|c| c == name)?, name)))
        .collect();
    if sentinels.is_empty() {
        log::warn!(
            "no '{AGE_COLUMN}' or '{POSITION_COLUMN}' column; repeated header rows cannot be detected"
        );
    }

    let raw: Vec<Vec<String>> = body
        .into_iter()
        .map(|row| cell_texts(row, &cell_sel))
        .filter(|cells| !cells.is_empty())
        .filter(|cells| {
            !sentinels
                .iter()
                .any(|&(idx, name)| cells.get(idx).map(String::as_str) == Some(name))
        })
        .collect();

    let rows = typed_rows(columns.len(), &raw);
    let mut table = PlayerStatsTable::new(columns, rows);
    table.drop_column(RANK_COLUMN);
    Ok(table)
}

// ---------------------------------------------------------------------------
// Snapshot files
// ---------------------------------------------------------------------------

/// Load a table snapshot from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, values typed per column
/// * `.json`    – `{ "columns": [...], "rows": [[...], ...] }`
/// * `.parquet` – one Int64 / Float64 / Utf8 column per table column
pub fn load_file(path: &Path) -> Result<PlayerStatsTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// -- CSV --

pub fn load_csv(path: &Path) -> Result<PlayerStatsTable> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening CSV {}", path.display()))?;
    read_csv(file)
}

/// Read back a CSV written from a table with the given column kinds.
pub fn load_csv_as(path: &Path, kinds: &[ColumnKind]) -> Result<PlayerStatsTable> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening CSV {}", path.display()))?;
    read_csv_as(file, kinds)
}

/// Read CSV with a header row; every column is typed independently and
/// empty cells become zero.
pub fn read_csv<R: Read>(reader: R) -> Result<PlayerStatsTable> {
    let (columns, raw) = read_raw_csv(reader)?;
    let rows = typed_rows(columns.len(), &raw);
    Ok(PlayerStatsTable::new(columns, rows))
}

/// Read CSV written from a table whose column kinds are known, e.g. the
/// download payload decoded against the table it was built from. Text
/// columns stay text even when every cell looks numeric.
pub fn read_csv_as<R: Read>(reader: R, kinds: &[ColumnKind]) -> Result<PlayerStatsTable> {
    let (columns, raw) = read_raw_csv(reader)?;
    if kinds.len() != columns.len() {
        bail!("{} column kinds for {} CSV columns", kinds.len(), columns.len());
    }
    let rows = typed_rows_as(kinds, &raw);
    Ok(PlayerStatsTable::new(columns, rows))
}

fn read_raw_csv<R: Read>(reader: R) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::Reader::from_reader(reader);
    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut raw = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        raw.push(record.iter().map(|v| v.to_string()).collect::<Vec<_>>());
    }
    Ok((columns, raw))
}

// -- JSON --

fn load_json(path: &Path) -> Result<PlayerStatsTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let snapshot: super::export::TableSnapshot =
        serde_json::from_str(&text).context("parsing JSON snapshot")?;

    for (i, row) in snapshot.rows.iter().enumerate() {
        if row.len() != snapshot.columns.len() {
            bail!(
                "Row {i}: {} values for {} columns",
                row.len(),
                snapshot.columns.len()
            );
        }
    }
    Ok(PlayerStatsTable::new(snapshot.columns, snapshot.rows))
}

// -- Parquet --

fn load_parquet(path: &Path) -> Result<PlayerStatsTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let values = (0..batch.num_columns())
                .map(|c| extract_value(batch.column(c), row))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Row {row}"))?;
            rows.push(values);
        }
    }

    Ok(PlayerStatsTable::new(columns, rows))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &Arc<dyn Array>, row: usize) -> Result<StatValue> {
    if col.is_null(row) {
        return Ok(StatValue::Missing);
    }
    let value = match col.data_type() {
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            StatValue::Text(arr.value(row).to_string())
        }
        DataType::LargeUtf8 => StatValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            StatValue::Integer(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            StatValue::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            StatValue::Float(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            StatValue::Float(arr.value(row))
        }
        other => bail!("unsupported parquet column type {other:?}"),
    };
    Ok(value)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_PAGE: &str = include_str!("../../tests/fixtures/per_game_sample.html");

    /// Serves the fixture page for every season.
    pub(crate) struct FixtureSource;

    impl StatsSource for FixtureSource {
        fn fetch_page(&self, _year: u16) -> Result<String, LoadError> {
            Ok(SAMPLE_PAGE.to_string())
        }
    }

    #[test]
    fn fixture_page_is_cleaned() {
        let table = parse_stats_page(SAMPLE_PAGE).unwrap();
        assert!(table.column_index("Rk").is_none());
        assert_eq!(table.columns[0], "Player");
        assert_eq!(table.len(), 12);

        let age = table.column_index("Age").unwrap();
        assert!(table.rows.iter().all(|r| r[age] != StatValue::Text("Age".into())));
        assert!(table.rows.iter().flatten().all(|v| *v != StatValue::Missing));
    }

    #[test]
    fn empty_cells_become_zero() {
        let table = parse_stats_page(SAMPLE_PAGE).unwrap();
        let player = table.column_index("Player").unwrap();
        let three_pct = table.column_index("3P%").unwrap();
        let kyle = table
            .rows
            .iter()
            .find(|r| r[player] == StatValue::Text("Kyle Alexander".into()))
            .unwrap();
        assert_eq!(kyle[three_pct], StatValue::Float(0.0));
        assert_eq!(kyle[table.column_index("Age").unwrap()], StatValue::Integer(23));
    }

    #[test]
    fn table_without_thead_uses_first_row() {
        let html = "<table><tr><th>Rk</th><th>Player</th><th>Age</th></tr>\
                    <tr><td>1</td><td>A</td><td>20</td></tr>\
                    <tr><td>Rk</td><td>Player</td><td>Age</td></tr>\
                    <tr><td>2</td><td>B</td><td></td></tr></table>";
        let table = parse_stats_page(html).unwrap();
        assert_eq!(table.columns, vec!["Player".to_string(), "Age".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1][1], StatValue::Integer(0));
    }

    #[test]
    fn header_bands_are_dropped_without_age_column() {
        let html = "<table><thead><tr><th>Rk</th><th>Player</th><th>Pos</th><th>Tm</th></tr></thead>\
                    <tbody><tr><td>1</td><td>A</td><td>C</td><td>LAL</td></tr>\
                    <tr class=\"thead\"><th>Rk</th><th>Player</th><th>Pos</th><th>Tm</th></tr>\
                    <tr><td>2</td><td>B</td><td>PG</td><td>BOS</td></tr></tbody></table>";
        let table = parse_stats_page(html).unwrap();
        let pos = table.column_index("Pos").unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.rows.iter().all(|r| r[pos] != StatValue::Text("Pos".into())));
        assert_eq!(table.unique_values("Pos").map(|s| s.len()), Some(2));
    }

    #[test]
    fn page_without_table_fails() {
        let err = parse_stats_page("<html><body><p>moved</p></body></html>").unwrap_err();
        assert!(matches!(err, LoadError::NoTable));
    }

    #[test]
    fn season_without_team_column_fails() {
        struct NoTeam;
        impl StatsSource for NoTeam {
            fn fetch_page(&self, _year: u16) -> Result<String, LoadError> {
                Ok("<table><thead><tr><th>Player</th><th>Pos</th><th>Age</th></tr></thead>\
                    <tbody><tr><td>A</td><td>C</td><td>30</td></tr></tbody></table>"
                    .to_string())
            }
        }
        let err = load_season(&NoTeam, 2020).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(_)));
    }

    #[test]
    fn years_outside_range_are_rejected() {
        assert!(matches!(
            load_season(&FixtureSource, 1949),
            Err(LoadError::YearOutOfRange(1949))
        ));
        assert!(load_season(&FixtureSource, 2021).is_err());
        assert!(load_season(&FixtureSource, 1950).is_ok());
    }

    #[test]
    fn season_url_template() {
        assert_eq!(
            season_url("https://example.org/leagues/", 1999),
            "https://example.org/leagues/NBA_1999_per_game.html"
        );
    }

    #[test]
    fn csv_reader_types_columns() {
        let table = read_csv("Player,Age,PTS\nA,20,1.5\nB,,2\n".as_bytes()).unwrap();
        assert_eq!(table.rows[1][1], StatValue::Integer(0));
        assert_eq!(table.rows[1][2], StatValue::Float(2.0));
    }

    #[test]
    fn csv_reader_with_kinds_keeps_numeric_looking_text() {
        let kinds = [ColumnKind::Text, ColumnKind::Text, ColumnKind::Float];
        let table = read_csv_as("Player,Pos,PTS\nA,0,1.5\nB,0,2.0\n".as_bytes(), &kinds).unwrap();
        assert_eq!(table.rows[0][1], StatValue::Text("0".into()));
        assert_eq!(table.rows[1][2], StatValue::Float(2.0));
        assert!(read_csv_as("Player\nA\n".as_bytes(), &kinds).is_err());
    }

    #[test]
    fn unknown_extension_is_an_error() {
        assert!(load_file(Path::new("stats.xlsx")).is_err());
    }
}
