//! Bill-of-materials rows read from a CSV export of the CAD BOM table.
//!
//! Every column is kept so it can be written back as file metadata. Cells
//! are normalised the same way for every column:
//! - empty cell → the text `NaN`
//! - numeric cell → a JSON number
//! - anything else → text with newlines removed, trimmed
//!
//! `ITEM NO.` is kept as its canonical dotted text and `PART NUMBER` is never
//! converted to a number, since both are matched as identifiers.

use std::io::Read;
use std::path::Path;

use serde_json::{Number, Value};
use tracing::{debug, info};

use crate::classify::{classify, ItemNumber, ItemType};
use crate::error::BomError;
use crate::metadata::{ITEM_NO, PART_NUMBER, QUANTITY};

#[derive(Debug, Clone, PartialEq)]
pub struct BomRow {
    pub item_number: ItemNumber,
    pub part_number: String,
    /// Every column of the row, in header order.
    pub cells: Vec<(String, Value)>,
}

impl BomRow {
    pub fn cell(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    pub fn quantity(&self) -> Option<&Value> {
        self.cell(QUANTITY)
    }

    /// `PART NUMBER` equals `stem`, or has the form `prefix/stem`.
    pub fn part_number_matches(&self, stem: &str) -> bool {
        if self.part_number == stem {
            return true;
        }
        let pieces: Vec<&str> = self.part_number.split('/').collect();
        pieces.len() == 2 && pieces[1] == stem
    }
}

#[derive(Debug, Clone, Default)]
pub struct Bom {
    pub columns: Vec<String>,
    pub rows: Vec<BomRow>,
}

fn clean_text(raw: &str) -> String {
    raw.replace(['\n', '\r'], "").trim().to_string()
}

fn normalise_cell(raw: &str) -> Value {
    let text = clean_text(raw);
    if text.is_empty() {
        return Value::String("NaN".to_string());
    }
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::String(text)),
        _ => Value::String(text),
    }
}

impl Bom {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BomError> {
        let path = path.as_ref();
        info!(bom = %path.display(), "Reading BOM export");
        let reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        Self::from_csv(reader)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, BomError> {
        Self::from_csv(csv::ReaderBuilder::new().flexible(true).from_reader(reader))
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, BomError> {
        let columns: Vec<String> = reader.headers()?.iter().map(clean_text).collect();
        let item_col = columns
            .iter()
            .position(|c| c == ITEM_NO)
            .ok_or(BomError::MissingColumn(ITEM_NO))?;
        let part_col = columns
            .iter()
            .position(|c| c == PART_NUMBER)
            .ok_or(BomError::MissingColumn(PART_NUMBER))?;

        let mut rows: Vec<BomRow> = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            // Header is line 1.
            let line = index + 2;
            let raw_item = record.get(item_col).unwrap_or("");
            let item_number: ItemNumber =
                clean_text(raw_item)
                    .parse()
                    .map_err(|_| BomError::ItemNumber {
                        row: line,
                        value: raw_item.to_string(),
                    })?;
            let part_number = clean_text(record.get(part_col).unwrap_or(""));

            let cells = columns
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = if i == item_col {
                        Value::String(item_number.to_string())
                    } else if i == part_col {
                        Value::String(part_number.clone())
                    } else {
                        normalise_cell(record.get(i).unwrap_or(""))
                    };
                    (name.clone(), value)
                })
                .collect();

            let row = BomRow {
                item_number,
                part_number,
                cells,
            };
            if rows.contains(&row) {
                debug!(line, "Dropping duplicate BOM row");
                continue;
            }
            rows.push(row);
        }

        info!(rows = rows.len(), columns = columns.len(), "BOM loaded");
        Ok(Bom { columns, rows })
    }

    /// Item types for every row, in row order.
    pub fn classify(&self) -> Vec<ItemType> {
        let numbers: Vec<ItemNumber> = self.rows.iter().map(|r| r.item_number.clone()).collect();
        classify(&numbers)
    }

    /// Rows whose part number matches a file stem.
    pub fn rows_for_stem<'a>(&'a self, stem: &'a str) -> impl Iterator<Item = &'a BomRow> + 'a {
        self.rows.iter().filter(move |r| r.part_number_matches(stem))
    }

    /// First row whose `PART NUMBER` is exactly `part_number`.
    pub fn find_part(&self, part_number: &str) -> Option<&BomRow> {
        self.rows.iter().find(|r| r.part_number == part_number)
    }
}
