//! Source table parsing.
//!
//! The source is comma-delimited UTF-8 text with standard quoting. The first
//! line names the columns; every following non-empty line becomes one
//! [`Record`] with a freshly generated [`RecordId`].

use std::collections::HashSet;

use quarry_core::{Record, RecordId};

use crate::error::{IngestError, Result};

/// Parses the fetched bytes into records.
///
/// # Errors
///
/// Returns `IngestError::Parse` if the content is not UTF-8, the header is
/// empty or repeats a column name, or any row has a different width than the
/// header.
pub fn parse_table(bytes: &[u8]) -> Result<Vec<Record>> {
    if let Err(e) = std::str::from_utf8(bytes) {
        let line = line_of_offset(bytes, e.valid_up_to());
        return Err(IngestError::parse(format!(
            "line {line}: content is not valid UTF-8"
        )));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let header = read_header(&mut reader)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| IngestError::parse(describe_csv_error(&e)))?;
        let line = row.position().map_or(0, csv::Position::line);
        let values = row.iter().map(str::to_owned).collect();
        let record = Record::from_row(RecordId::generate(), &header, values)
            .map_err(|e| IngestError::parse(format!("line {line}: {e}")))?;
        records.push(record);
    }

    tracing::debug!(
        columns = header.len(),
        records = records.len(),
        "parsed source table"
    );
    Ok(records)
}

fn read_header<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<Vec<String>> {
    let header = reader
        .headers()
        .map_err(|e| IngestError::parse(describe_csv_error(&e)))?
        .clone();

    if header.is_empty() || header.iter().all(str::is_empty) {
        return Err(IngestError::parse("line 1: header row is empty"));
    }

    let mut seen = HashSet::new();
    for (index, name) in header.iter().enumerate() {
        if name.is_empty() {
            return Err(IngestError::parse(format!(
                "line 1: column {} has an empty name",
                index + 1
            )));
        }
        if !seen.insert(name) {
            return Err(IngestError::parse(format!(
                "line 1: duplicate column name '{name}'"
            )));
        }
    }

    Ok(header.iter().map(str::to_owned).collect())
}

fn describe_csv_error(err: &csv::Error) -> String {
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => {
            let line = pos.as_ref().map_or(0, csv::Position::line);
            format!("line {line}: row has {len} fields but header has {expected_len}")
        }
        _ => match err.position() {
            Some(pos) => format!("line {}: {err}", pos.line()),
            None => err.to_string(),
        },
    }
}

fn line_of_offset(bytes: &[u8], offset: usize) -> usize {
    bytes[..offset].iter().filter(|b| **b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err(input: &str) -> String {
        match parse_table(input.as_bytes()).unwrap_err() {
            IngestError::Parse { message } => message,
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn parses_rows_in_order() {
        let records = parse_table(b"name,price\nApple,1.00\nPear,0.50\n").unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("name"), Some("Apple"));
        assert_eq!(records[0].get("price"), Some("1.00"));
        assert_eq!(records[1].get("name"), Some("Pear"));
        assert_eq!(
            records[0].field_names().collect::<Vec<_>>(),
            vec!["name", "price"]
        );
    }

    #[test]
    fn each_row_gets_a_distinct_id() {
        let records = parse_table(b"name\nApple\nApple\nApple\n").unwrap();
        let ids: HashSet<_> = records.iter().map(Record::id).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn handles_quoted_fields() {
        let records = parse_table(b"name,note\n\"Apple, red\",\"said \"\"hi\"\"\"\n").unwrap();
        assert_eq!(records[0].get("name"), Some("Apple, red"));
        assert_eq!(records[0].get("note"), Some("said \"hi\""));
    }

    #[test]
    fn skips_blank_lines() {
        let records = parse_table(b"name\nApple\n\nPear\n").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn header_only_yields_no_records() {
        assert!(parse_table(b"name,price\n").unwrap().is_empty());
    }

    #[test]
    fn source_id_column_is_replaced() {
        let records = parse_table(b"id,name\n42,Apple\n").unwrap();
        assert_eq!(records[0].get("id"), None);
        assert_eq!(records[0].get("name"), Some("Apple"));
        assert_ne!(records[0].id().to_string(), "42");
    }

    #[test]
    fn ragged_row_reports_line() {
        let message = parse_err("name,price\nApple,1.00\nPear\n");
        assert!(message.contains("line 3"), "{message}");
        assert!(message.contains("1 fields"), "{message}");
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(parse_err("").contains("header row is empty"));
    }

    #[test]
    fn blank_column_name_is_rejected() {
        assert!(parse_err("name,,price\na,b,c\n").contains("column 2"));
    }

    #[test]
    fn duplicate_column_is_rejected() {
        assert!(parse_err("name,name\na,b\n").contains("duplicate column name 'name'"));
    }

    #[test]
    fn invalid_utf8_reports_line() {
        let err = parse_table(b"name\nApple\n\xff\xfe\n").unwrap_err();
        match err {
            IngestError::Parse { message } => {
                assert!(message.contains("line 3"), "{message}");
                assert!(message.contains("UTF-8"), "{message}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
