use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};

use super::model::{PlayerStatsTable, StatValue};
use crate::config::DOWNLOAD_FILE_NAME;

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Write the table as CSV: one header row, no index column.
pub fn write_csv<W: Write>(table: &PlayerStatsTable, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(&table.columns)
        .context("writing CSV header")?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(StatValue::to_field))
            .context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

pub fn to_csv_string(table: &PlayerStatsTable) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    String::from_utf8(buf).context("CSV is not UTF-8")
}

pub fn save_csv(table: &PlayerStatsTable, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_csv(table, std::io::BufWriter::new(file))
}

// ---------------------------------------------------------------------------
// Download link
// ---------------------------------------------------------------------------

/// `data:` URI carrying the CSV text as base64.
pub fn csv_data_uri(csv: &str) -> String {
    format!("data:file/csv;base64,{}", STANDARD.encode(csv.as_bytes()))
}

/// HTML anchor that downloads the table as `playerstats.csv`.
pub fn download_link(table: &PlayerStatsTable) -> Result<String> {
    let uri = csv_data_uri(&to_csv_string(table)?);
    Ok(format!(
        r#"<a href="{uri}" download="{DOWNLOAD_FILE_NAME}">Download CSV File</a>"#
    ))
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// JSON snapshot layout (column order preserved).
#[derive(Debug, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<StatValue>>,
}

/// Save the table to a file.  Dispatch by extension (`csv`, `json`,
/// `parquet`/`pq`).
pub fn save_file(table: &PlayerStatsTable, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => save_csv(table, path),
        "json" => save_json(table, path),
        "parquet" | "pq" => save_parquet(table, path),
        other => bail!("Unsupported file extension: .{other}"),
    }?;
    log::info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

fn save_json(table: &PlayerStatsTable, path: &Path) -> Result<()> {
    let snapshot = TableSnapshot {
        columns: table.columns.clone(),
        rows: table.rows.clone(),
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), &snapshot)
        .context("writing JSON snapshot")?;
    Ok(())
}

/// Arrow type for a column: Int64 when every cell is an integer, Float64
/// when every cell is numeric, Utf8 otherwise. Missing cells are nulls.
fn column_type(table: &PlayerStatsTable, c: usize) -> DataType {
    let present = || table.rows.iter().map(|r| &r[c]).filter(|v| **v != StatValue::Missing);
    if present().all(|v| matches!(v, StatValue::Integer(_))) {
        DataType::Int64
    } else if present().all(StatValue::is_numeric) {
        DataType::Float64
    } else {
        DataType::Utf8
    }
}

fn to_record_batch(table: &PlayerStatsTable) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(table.width());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.width());

    for (c, name) in table.columns.iter().enumerate() {
        let cells = table.rows.iter().map(|r| &r[c]);
        let data_type = column_type(table, c);
        let array: ArrayRef = match data_type {
            DataType::Int64 => Arc::new(
                cells
                    .map(|v| match v {
                        StatValue::Integer(i) => Some(*i),
                        _ => None,
                    })
                    .collect::<Int64Array>(),
            ),
            DataType::Float64 => Arc::new(cells.map(StatValue::as_f64).collect::<Float64Array>()),
            _ => Arc::new(
                cells
                    .map(|v| match v {
                        StatValue::Missing => None,
                        other => Some(other.to_field()),
                    })
                    .collect::<StringArray>(),
            ),
        };
        fields.push(Field::new(name, data_type, true));
        arrays.push(array);
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).context("building record batch")
}

fn save_parquet(table: &PlayerStatsTable, path: &Path) -> Result<()> {
    let batch = to_record_batch(table)?;
    if log::log_enabled!(log::Level::Debug) {
        let preview = batch.slice(0, batch.num_rows().min(5));
        if let Ok(text) = arrow::util::pretty::pretty_format_batches(&[preview]) {
            log::debug!("Parquet preview:\n{text}");
        }
    }

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{filtered_indices, init_filter_state};
    use crate::data::loader::{load_file, parse_stats_page, read_csv_as, tests::SAMPLE_PAGE};
    use std::collections::BTreeSet;

    fn lakers() -> PlayerStatsTable {
        let table = parse_stats_page(SAMPLE_PAGE).unwrap();
        let mut filters = init_filter_state(&table);
        filters.insert("Tm".into(), BTreeSet::from([StatValue::Text("LAL".into())]));
        table.select_rows(&filtered_indices(&table, &filters))
    }

    #[test]
    fn csv_has_header_and_no_index() {
        let csv = to_csv_string(&lakers()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Player,Pos,Age,Tm,G,GS,MP,FG%,3P%,TRB,AST,PTS")
        );
        assert_eq!(
            lines.next(),
            Some("Kostas Antetokounmpo,PF,22,LAL,5,0,4.0,0.667,0.0,0.6,0.4,1.4")
        );
        assert_eq!(csv.lines().count(), 1 + 5);
    }

    fn decode_link(link: &str) -> Vec<u8> {
        let payload = link
            .split("base64,")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap();
        STANDARD.decode(payload).unwrap()
    }

    #[test]
    fn download_payload_decodes_to_same_table() {
        let table = lakers();
        let link = download_link(&table).unwrap();
        assert!(link.ends_with(r#"download="playerstats.csv">Download CSV File</a>"#));

        let bytes = decode_link(&link);
        let decoded = read_csv_as(bytes.as_slice(), &table.column_kinds()).unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn zero_filled_text_column_survives_download() {
        let html = "<table><thead><tr><th>Rk</th><th>Player</th><th>Pos</th><th>Age</th><th>Tm</th></tr></thead>\
                    <tbody><tr><td>1</td><td>A</td><td>C</td><td>25</td><td>LAL</td></tr>\
                    <tr><td>2</td><td>B</td><td></td><td>30</td><td>BOS</td></tr></tbody></table>";
        let table = parse_stats_page(html).unwrap();
        let mut filters = init_filter_state(&table);
        filters.insert("Pos".into(), BTreeSet::from([StatValue::Text("0".into())]));
        let view = table.select_rows(&filtered_indices(&table, &filters));
        assert_eq!(view.len(), 1);

        let bytes = decode_link(&download_link(&view).unwrap());
        let decoded = read_csv_as(bytes.as_slice(), &view.column_kinds()).unwrap();
        let pos = decoded.column_index("Pos").unwrap();
        assert_eq!(decoded.rows[0][pos], StatValue::Text("0".into()));
        assert_eq!(decoded, view);
    }

    #[test]
    fn data_uri_prefix() {
        assert_eq!(csv_data_uri("a\n"), "data:file/csv;base64,YQo=");
    }

    #[test]
    fn snapshots_round_trip_through_files() {
        let table = lakers();
        let dir = tempfile::tempdir().unwrap();
        for name in ["stats.csv", "stats.json", "stats.parquet"] {
            let path = dir.path().join(name);
            save_file(&table, &path).unwrap();
            assert_eq!(load_file(&path).unwrap(), table, "{name}");
        }
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(save_file(&lakers(), &dir.path().join("stats.xlsx")).is_err());
    }
}
