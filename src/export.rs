use std::io::{Read, Write};

use chrono::{DateTime, Utc};

use crate::error::DashboardError;
use crate::models::{Dataset, RawRow};

/// Parses rows keyed by the header row. Short rows leave their trailing
/// columns absent; extra cells beyond the header are ignored.
pub fn read_csv<R: Read>(reader: R) -> csv::Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Writes the raw source values of every record. Columns come from the first
/// record; fields needing it are quoted with inner quotes doubled.
pub fn write_csv<W: Write>(dataset: &Dataset, writer: W) -> anyhow::Result<usize> {
    let first = dataset.first().ok_or(DashboardError::DataUnavailable)?;
    let headers: Vec<&str> = first.raw.keys().map(String::as_str).collect();

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);
    writer.write_record(&headers)?;

    for record in dataset.records() {
        writer.write_record(headers.iter().map(|h| record.raw_value(h).unwrap_or("")))?;
    }
    writer.flush()?;
    Ok(dataset.len())
}

pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("IntelliGrade_AllData_{}.csv", now.timestamp_millis())
}
