//! CSV upload parsing into uploaded rows.

use csv::{ReaderBuilder, Trim};
use thiserror::Error;

use crate::models::UploadedRecord;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("uploaded file is empty")]
    Empty,

    #[error("uploaded file has a header but no data rows")]
    NoRows,

    #[error("malformed CSV at line {line}: {message}")]
    Malformed { line: u64, message: String },
}

impl From<csv::Error> for ParseError {
    fn from(e: csv::Error) -> Self {
        ParseError::Malformed {
            line: e.position().map(|p| p.line()).unwrap_or(0),
            message: e.to_string(),
        }
    }
}

/// Parsed upload: declared columns and rows in file order
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedUpload {
    pub fields: Vec<String>,
    pub records: Vec<UploadedRecord>,
}

pub fn parse_upload(bytes: &[u8]) -> Result<ParsedUpload, ParseError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::Empty);
    }

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let fields: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if fields.iter().all(String::is_empty) {
        return Err(ParseError::Empty);
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.iter().all(str::is_empty) {
            continue;
        }
        // Short rows leave trailing columns absent; extra cells without a header are dropped.
        let record = UploadedRecord::from_pairs(
            fields
                .iter()
                .zip(row.iter())
                .filter(|(header, _)| !header.is_empty())
                .map(|(header, value)| (header.as_str(), value)),
        );
        records.push(record);
    }

    if records.is_empty() {
        return Err(ParseError::NoRows);
    }

    tracing::debug!("Parsed upload: {} columns, {} rows", fields.len(), records.len());
    Ok(ParsedUpload { fields, records })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordField;

    #[test]
    fn test_parse_rows_in_order() {
        let csv = "name,platforms,rating\nHades,\"PC, Switch\",10\nCeleste,PS4,9\n";
        let parsed = parse_upload(csv.as_bytes()).unwrap();

        assert_eq!(parsed.fields, vec!["name", "platforms", "rating"]);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].name(), Some("Hades"));
        assert_eq!(parsed.records[0].get(RecordField::Platforms), Some("PC, Switch"));
        assert_eq!(parsed.records[1].name(), Some("Celeste"));
    }

    #[test]
    fn test_bom_and_blank_lines() {
        let csv = b"\xEF\xBB\xBFName,completed\n\n , \nOuter Wilds,yes\n";
        let parsed = parse_upload(csv).unwrap();
        assert_eq!(parsed.fields[0], "Name");
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].name(), Some("Outer Wilds"));
    }

    #[test]
    fn test_short_rows_are_tolerated() {
        let parsed = parse_upload(b"name,platforms,genres\nTunic,PC\n").unwrap();
        assert_eq!(parsed.records[0].get(RecordField::Genres), None);
        assert_eq!(parsed.records[0].len(), 2);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(parse_upload(b""), Err(ParseError::Empty));
        assert_eq!(parse_upload(b"  \n"), Err(ParseError::Empty));
        assert_eq!(parse_upload(b"name,platforms\n"), Err(ParseError::NoRows));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let result = parse_upload(b"name\n\xff\xfe\n");
        assert!(matches!(result, Err(ParseError::Malformed { .. })));
    }
}
