//! JSON Lines catalog source.
//!
//! Reads one JSON document per line (the format produced by most document
//! store export tools) and projects two string fields into a [`Record`].
//! Blank lines are ignored. A line that is not valid UTF-8 or JSON is an
//! item error; only failures of the underlying read end the sequence.

use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use super::types::{CatalogError, FieldProjection, Record};
use super::CatalogSource;

/// Catalog backed by a JSON Lines file.
pub struct JsonLinesCatalog {
    path: PathBuf,
    reader: BufReader<File>,
    /// Raw bytes of the current line
    buf: Vec<u8>,
    projection: FieldProjection,
    /// 1-based line number of the last line read
    line_number: u64,
    finished: bool,
}

impl JsonLinesCatalog {
    /// Opens the file at `path`. Failing to open it is fatal.
    pub async fn open(
        path: impl Into<PathBuf>,
        projection: FieldProjection,
    ) -> Result<Self, CatalogError> {
        let path = path.into();
        let file = File::open(&path).await.map_err(|e| {
            CatalogError::fatal(format!("failed to open {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), "Opened JSON Lines catalog");

        Ok(Self {
            path,
            reader: BufReader::new(file),
            buf: Vec::new(),
            projection,
            line_number: 0,
            finished: false,
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_next(&mut self) -> Option<Result<Record, CatalogError>> {
        if self.finished {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf).await {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err(CatalogError::fatal(format!(
                        "read error in {} after line {}: {}",
                        self.path.display(),
                        self.line_number,
                        e
                    ))));
                }
            }
            self.line_number += 1;

            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(CatalogError::item(
                        self.line_number,
                        format!("invalid UTF-8: {}", e),
                    )))
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            return Some(project(line, self.line_number, &self.projection));
        }
    }
}

impl CatalogSource for JsonLinesCatalog {
    fn next_record(&mut self) -> BoxFuture<'_, Option<Result<Record, CatalogError>>> {
        Box::pin(self.read_next())
    }

    fn describe(&self) -> String {
        format!("json-lines:{}", self.path.display())
    }
}

/// Projects one JSON document onto a record.
fn project(
    line: &str,
    position: u64,
    projection: &FieldProjection,
) -> Result<Record, CatalogError> {
    let document: Value = serde_json::from_str(line)
        .map_err(|e| CatalogError::item(position, format!("invalid JSON: {}", e)))?;

    let identifier = string_field(&document, &projection.identifier_field, position)?;
    let locator = string_field(&document, &projection.locator_field, position)?;

    Ok(Record::new(identifier, locator))
}

fn string_field<'a>(document: &'a Value, field: &str, position: u64) -> Result<&'a str, CatalogError> {
    match document.get(field) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(CatalogError::item(
            position,
            format!("field '{}' is not a string: {}", field, other),
        )),
        None => Err(CatalogError::item(
            position,
            format!("missing field '{}'", field),
        )),
    }
}
