use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{CellValue, PurchaseDataset, PurchaseRecord, REQUIRED_COLUMNS};
use super::model::{COL_AGE, COL_AMOUNT, COL_CATEGORY, COL_GENDER, COL_ITEM, COL_PREVIOUS, COL_RATING, COL_SEASON};

/// One raw source row before cleaning: column name → cell.
type RawRow = BTreeMap<String, CellValue>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Fatal load failures. Any of these ends the dashboard session for the
/// chosen file; there is nothing to chart without a usable dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source file could not be opened.
    #[error("cannot read `{path}`: {source}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The source cannot be interpreted as a purchase table at all
    /// (unsupported extension, broken structure, required column absent).
    #[error("`{path}` is not a usable purchase table: {reason}")]
    Malformed { path: PathBuf, reason: String },
    /// No records survived cleaning.
    #[error("dataset is empty after cleaning")]
    Empty,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a purchase dataset from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with the schema columns (recommended)
/// * `.json`    – `[{ "Age": 31, "Gender": "Male", ...}, ...]`
/// * `.parquet` – flat scalar columns, as written by `df.to_parquet()`
///
/// Cleaning runs in a fixed order: rows missing a value in any column are
/// dropped, exact-duplicate rows are dropped (first occurrence wins), then
/// the numeric columns are coerced and rows whose cells do not coerce are
/// dropped like any other missing value.
pub fn load_file(path: &Path) -> Result<PurchaseDataset, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::NotFound {
        path: path.to_path_buf(),
        source,
    })?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "csv" => read_csv(file),
        "json" => read_json(file),
        "parquet" | "pq" => read_parquet(file),
        other => Err(anyhow::anyhow!("unsupported file extension: .{other}")),
    };

    let (columns, rows) = parsed.map_err(|e| LoadError::Malformed {
        path: path.to_path_buf(),
        reason: format!("{e:#}"),
    })?;

    if rows.is_empty() {
        return Err(LoadError::Empty);
    }
    for required in REQUIRED_COLUMNS {
        if !columns.contains(required) {
            return Err(LoadError::Malformed {
                path: path.to_path_buf(),
                reason: format!("missing required column `{required}`"),
            });
        }
    }

    let records = clean(&columns, rows);
    if records.is_empty() {
        return Err(LoadError::Empty);
    }
    Ok(PurchaseDataset::from_records(records))
}

// ---------------------------------------------------------------------------
// Cleaning
// ---------------------------------------------------------------------------

/// The three cleaning passes, in contract order. Coercion failures count as
/// missing values: textual junk like `"N/A"` or a `NaN` reading survives
/// the first pass but must not reach the dataset.
fn clean(columns: &BTreeSet<String>, rows: Vec<RawRow>) -> Vec<PurchaseRecord> {
    let total = rows.len();

    // Pass 1: every observed column must hold a non-null cell.
    let complete: Vec<RawRow> = rows
        .into_iter()
        .filter(|row| {
            columns
                .iter()
                .all(|col| !matches!(row.get(col), None | Some(CellValue::Null)))
        })
        .collect();
    let dropped_missing = total - complete.len();

    // Pass 2: exact duplicates on raw cell values, first occurrence wins.
    let complete_count = complete.len();
    let mut seen: HashSet<RawRow> = HashSet::with_capacity(complete_count);
    let mut unique: Vec<RawRow> = Vec::with_capacity(complete_count);
    for row in complete {
        if seen.insert(row.clone()) {
            unique.push(row);
        }
    }
    let dropped_duplicate = complete_count - unique.len();

    // Pass 3: schema coercion.
    let mut records = Vec::with_capacity(unique.len());
    let mut dropped_uncoercible = 0usize;
    for row in unique {
        match coerce_record(row) {
            Some(rec) => records.push(rec),
            None => dropped_uncoercible += 1,
        }
    }

    log::info!(
        "cleaned dataset: {total} rows read, {dropped_missing} incomplete, \
         {dropped_duplicate} duplicate, {dropped_uncoercible} non-numeric; {} kept",
        records.len()
    );
    records
}

/// Coerce one complete, deduplicated raw row into a typed record. `None`
/// means a numeric cell failed coercion and the row is dropped.
fn coerce_record(mut row: RawRow) -> Option<PurchaseRecord> {
    let age = row.remove(COL_AGE)?.to_i64()?;
    let gender = row.remove(COL_GENDER)?.to_text()?;
    let category = row.remove(COL_CATEGORY)?.to_text()?;
    let item = row.remove(COL_ITEM)?.to_text()?;
    let purchase_amount = row.remove(COL_AMOUNT)?.to_f64()?;
    let review_rating = row.remove(COL_RATING)?.to_f64()?;
    let season = row.remove(COL_SEASON)?.to_text()?;
    let previous_purchases = row.remove(COL_PREVIOUS)?.to_i64()?;

    Some(PurchaseRecord {
        age,
        gender,
        category,
        item,
        purchase_amount,
        review_rating,
        season,
        previous_purchases,
        // Whatever the schema did not claim passes through unused.
        extras: row,
    })
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one purchase per row. Cell
/// types are guessed; the coercion pass settles the schema columns.
fn read_csv(file: File) -> Result<(BTreeSet<String>, Vec<RawRow>)> {
    let mut reader = csv::Reader::from_reader(BufReader::new(file));
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let columns: BTreeSet<String> = headers.iter().cloned().collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let mut row = RawRow::new();
        for (col_idx, value) in record.iter().enumerate() {
            let Some(col_name) = headers.get(col_idx) else {
                bail!("CSV row {row_no} has more cells than headers");
            };
            row.insert(col_name.clone(), guess_cell_type(value));
        }
        rows.push(row);
    }
    Ok((columns, rows))
}

fn guess_cell_type(s: &str) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default
/// `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Age": 31, "Gender": "Male", "Category": "Clothing", ... },
///   ...
/// ]
/// ```
///
/// A key one record has and another lacks counts as a missing value for the
/// lacking record, exactly like the tabular view of the same data.
fn read_json(file: File) -> Result<(BTreeSet<String>, Vec<RawRow>)> {
    let root: JsonValue =
        serde_json::from_reader(BufReader::new(file)).context("parsing JSON")?;
    let records = root
        .as_array()
        .context("expected a top-level JSON array of records")?;

    let mut columns = BTreeSet::new();
    let mut rows = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("row {i} is not a JSON object"))?;
        let mut row = RawRow::new();
        for (key, val) in obj {
            columns.insert(key.clone());
            row.insert(key.clone(), json_to_cell(val));
        }
        rows.push(row);
    }
    Ok((columns, rows))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Load purchase rows from a Parquet file of flat scalar columns (strings,
/// ints, floats, bools), as written by both Pandas and Polars.
fn read_parquet(file: File) -> Result<(BTreeSet<String>, Vec<RawRow>)> {
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut columns = BTreeSet::new();
    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        for field in schema.fields() {
            columns.insert(field.name().clone());
        }
        for row_idx in 0..batch.num_rows() {
            let mut row = RawRow::new();
            for (col_idx, field) in schema.fields().iter().enumerate() {
                row.insert(field.name().clone(), extract_cell(batch.column(col_idx), row_idx));
            }
            rows.push(row);
        }
    }
    Ok((columns, rows))
}

/// Extract a single scalar cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            if let Some(s) = col.as_any().downcast_ref::<StringArray>() {
                CellValue::String(s.value(row).to_string())
            } else {
                // LargeStringArray
                let s = col.as_string::<i64>();
                CellValue::String(s.value(row).to_string())
            }
        }
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().unwrap();
            CellValue::Integer(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().unwrap();
            CellValue::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col.as_any().downcast_ref::<Float32Array>().unwrap();
            CellValue::Float(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = col.as_any().downcast_ref::<Float64Array>().unwrap();
            CellValue::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col.as_any().downcast_ref::<BooleanArray>().unwrap();
            CellValue::Bool(arr.value(row))
        }
        _ => CellValue::String(format!("{:?}", col.data_type())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
