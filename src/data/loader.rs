use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::DataError;
use crate::plan::builder::FormValues;

// ============================================================================
// Format detection
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Yaml,
    Csv,
}

impl DataFormat {
    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(DataFormat::Json),
            "yaml" | "yml" => Ok(DataFormat::Yaml),
            "csv" => Ok(DataFormat::Csv),
            _ => Err(DataError::UnsupportedFormat(format!(
                "{} (expected .json, .yaml, .yml or .csv)",
                path.display()
            ))),
        }
    }
}

/// Load form value records from a JSON, YAML or CSV file.
///
/// JSON and YAML files may hold a single object or a list of objects.
/// Scalar values are converted to strings and `null` becomes the empty
/// string. Nested values are rejected.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<FormValues>, DataError> {
    let path = path.as_ref();
    let format = DataFormat::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let records = parse_records(&content, format).map_err(|e| match e {
        DataError::Json { source, .. } => DataError::Json {
            path: path.display().to_string(),
            source,
        },
        DataError::Yaml { source, .. } => DataError::Yaml {
            path: path.display().to_string(),
            source,
        },
        other => other,
    })?;

    info!(path = %path.display(), records = records.len(), "loaded form data");
    Ok(records)
}

pub fn parse_records(content: &str, format: DataFormat) -> Result<Vec<FormValues>, DataError> {
    match format {
        DataFormat::Json => {
            let value: Value = serde_json::from_str(content).map_err(|source| DataError::Json {
                path: String::new(),
                source,
            })?;
            records_from_value(value)
        }
        DataFormat::Yaml => {
            let value: Value = serde_yaml::from_str(content).map_err(|source| DataError::Yaml {
                path: String::new(),
                source,
            })?;
            records_from_value(value)
        }
        DataFormat::Csv => parse_csv(content),
    }
}

/// Write records as a pretty JSON array.
pub fn save_records(path: impl AsRef<Path>, records: &[FormValues]) -> Result<(), DataError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(records).map_err(|source| DataError::Json {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, json + "\n").map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn records_from_value(value: Value) -> Result<Vec<FormValues>, DataError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| record_from_value(index, item))
            .collect(),
        Value::Null => Ok(Vec::new()),
        single => Ok(vec![record_from_value(0, single)?]),
    }
}

fn record_from_value(index: usize, value: Value) -> Result<FormValues, DataError> {
    let Value::Object(map) = value else {
        return Err(DataError::Shape { index });
    };

    map.into_iter()
        .map(|(field, value)| {
            let text = match value {
                Value::Null => String::new(),
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Array(_) | Value::Object(_) => return Err(DataError::Shape { index }),
            };
            Ok((field, text))
        })
        .collect()
}

// ============================================================================
// CSV
// ============================================================================

/// Header row followed by one record per row. Supports quoted fields,
/// doubled quotes inside them and line breaks inside quotes. Blank rows are
/// skipped; short rows are padded with empty values.
fn parse_csv(content: &str) -> Result<Vec<FormValues>, DataError> {
    let rows = split_csv_rows(content)?;
    let mut rows = rows.into_iter().filter(|(_, row)| !is_blank(row));

    let Some((_, header)) = rows.next() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header.into_iter().map(|h| h.trim().to_string()).collect();
    if let Some(pos) = header.iter().position(String::is_empty) {
        return Err(DataError::Csv {
            line: 1,
            message: format!("header column {} has no name", pos + 1),
        });
    }

    let mut records = Vec::new();
    for (line, row) in rows {
        if row.len() > header.len() {
            return Err(DataError::Csv {
                line,
                message: format!("{} fields but the header has {}", row.len(), header.len()),
            });
        }
        let mut record = FormValues::new();
        for (i, name) in header.iter().enumerate() {
            let value = row.get(i).cloned().unwrap_or_default();
            record.insert(name.clone(), value);
        }
        records.push(record);
    }

    debug!(columns = header.len(), rows = records.len(), "parsed csv");
    Ok(records)
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|f| f.trim().is_empty())
}

/// Split into rows of fields, each tagged with the 1-based line it starts on.
fn split_csv_rows(content: &str) -> Result<Vec<(usize, Vec<String>)>, DataError> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_start = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push((row_start, std::mem::take(&mut row)));
                line += 1;
                row_start = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(DataError::Csv {
            line: row_start,
            message: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push((row_start, row));
    }

    Ok(rows)
}

