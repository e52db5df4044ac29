//! Reading the flat zone table exported by the upstream statistics step.

use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// One source row, keyed by column name. Cells keep their source type:
/// text for CSV, any JSON value for JSON exports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: HashMap<String, Value>,
}

/// Spellings the exporters use for "no value".
const MISSING_MARKERS: [&str; 4] = ["NA", "NaN", "N/A", "null"];

#[cfg(test)]
impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.cells.insert(column.to_string(), value.into());
        self
    }
}

impl RawRow {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.get(column)
    }

    /// Trimmed, non-empty text for a column; numbers are rendered as text.
    pub fn text(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() || MISSING_MARKERS.contains(&s) {
                    None
                } else {
                    Some(s.to_string())
                }
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Numeric value of a column, `None` when absent or not a number.
    pub fn number(&self, column: &str) -> Option<f64> {
        let value = match self.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => {
                let s = s.trim();
                if MISSING_MARKERS.contains(&s) {
                    return None;
                }
                s.parse::<f64>().ok()
            }
            _ => None,
        };
        value.filter(|v| v.is_finite())
    }
}

impl From<Map<String, Value>> for RawRow {
    fn from(map: Map<String, Value>) -> Self {
        RawRow {
            cells: map.into_iter().collect(),
        }
    }
}

pub fn load_rows(path: &Path) -> Result<Vec<RawRow>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| anyhow!("Zone file has no extension: {:?}", path))?;

    let rows = match extension.as_str() {
        "csv" => load_csv_rows(path)?,
        "json" => load_json_rows(path)?,
        _ => return Err(anyhow!("Unsupported zone file format: {}", extension)),
    };

    info!(rows = rows.len(), path = ?path, "loaded zone rows");
    Ok(rows)
}

fn load_csv_rows(path: &Path) -> Result<Vec<RawRow>> {
    let file = File::open(path).with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = rdr.headers()?.clone();

    let mut rows = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Malformed CSV record {}", line + 1))?;
        let cells = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), Value::String(v.to_string())))
            .collect();
        rows.push(RawRow { cells });
    }
    Ok(rows)
}

fn load_json_rows(path: &Path) -> Result<Vec<RawRow>> {
    let file = File::open(path).with_context(|| format!("Failed to open JSON file: {:?}", path))?;
    let records: Vec<Map<String, Value>> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Zone JSON must be an array of objects: {:?}", path))?;
    Ok(records.into_iter().map(RawRow::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_cells() {
        let row = RawRow::new()
            .with("id", "  A-1 ")
            .with("pop", json!(1200))
            .with("area", " 1234.5 ")
            .with("roads", "NA")
            .with("blank", "")
            .with("null", Value::Null);
        assert_eq!(row.text("id").as_deref(), Some("A-1"));
        assert_eq!(row.text("pop").as_deref(), Some("1200"));
        assert_eq!(row.number("pop"), Some(1200.0));
        assert_eq!(row.number("area"), Some(1234.5));
        assert_eq!(row.number("roads"), None);
        assert_eq!(row.text("roads"), None);
        assert_eq!(row.number("blank"), None);
        assert_eq!(row.text("blank"), None);
        assert_eq!(row.number("null"), None);
        assert_eq!(row.number("absent"), None);
        assert_eq!(row.number("id"), None);
    }

    #[test]
    fn test_load_csv() {
        let file = write_temp(
            ".csv",
            "fbcz_id,country,win_population,geography_wkt\n\
             A,France,100,\"POLYGON ((0 0, 0 1, 1 1, 0 0))\"\n\
             B,France,,\n",
        );
        let rows = load_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].number("win_population"), Some(100.0));
        assert_eq!(
            rows[0].text("geography_wkt").as_deref(),
            Some("POLYGON ((0 0, 0 1, 1 1, 0 0))")
        );
        assert_eq!(rows[1].number("win_population"), None);
    }

    #[test]
    fn test_load_json() {
        let file = write_temp(
            ".json",
            r#"[{"fbcz_id": "A", "country": "Spain", "win_population": 10.5},
                {"fbcz_id": "B", "country": "Spain", "win_roads_km": null}]"#,
        );
        let rows = load_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].number("win_population"), Some(10.5));
        assert_eq!(rows[1].number("win_roads_km"), None);
    }

    #[test]
    fn test_rejects_unknown_format() {
        let file = write_temp(".xlsx", "");
        let err = load_rows(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unsupported zone file format"));

        let file = write_temp(".json", "{\"not\": \"an array\"}");
        assert!(load_rows(file.path()).is_err());
    }
}
