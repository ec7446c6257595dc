use crate::error::{ExportError, Result};
use crate::mapping::{ExportData, MappedRecord};
use csv::{QuoteStyle, Terminator, WriterBuilder};

/// Renders mapped records as CSV text.
///
/// The header row is the union of keys over all records in first-seen
/// order, quoted only where needed. Value cells are always quoted and a
/// record without a column gets `""` there. Every row ends with `\n`.
pub fn serialize(data: &ExportData) -> Result<String> {
    serialize_records(data.records())
}

pub fn serialize_records(records: &[MappedRecord]) -> Result<String> {
    let headers = collect_headers(records);
    if headers.is_empty() {
        return Ok(String::new());
    }

    let mut header_writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    header_writer.write_record(&headers)?;
    let buffer = header_writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;

    let mut row_writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(buffer);
    for record in records {
        row_writer.write_record(headers.iter().map(|header| record.get(header).unwrap_or("")))?;
    }
    let buffer = row_writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;

    String::from_utf8(buffer).map_err(|e| ExportError::InvalidData {
        message: format!("CSV output is not valid UTF-8: {}", e),
    })
}

fn collect_headers(records: &[MappedRecord]) -> Vec<&str> {
    let mut headers: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !headers.contains(&key) {
                headers.push(key);
            }
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_record() {
        let record = MappedRecord::new()
            .with("Name", "John Doe")
            .with("Title", "Engineer");

        let csv = serialize(&ExportData::Single(record)).unwrap();
        assert_eq!(csv, "Name,Title\n\"John Doe\",\"Engineer\"\n");
    }

    #[test]
    fn test_quotes_are_doubled() {
        let record = MappedRecord::new()
            .with("Name", "John \"JD\" Doe")
            .with("About", "Builds things, mostly");

        let csv = serialize(&ExportData::Single(record)).unwrap();
        assert_eq!(
            csv,
            "Name,About\n\"John \"\"JD\"\" Doe\",\"Builds things, mostly\"\n"
        );
    }

    #[test]
    fn test_empty_batch_is_empty_text() {
        assert_eq!(serialize(&ExportData::Batch(Vec::new())).unwrap(), "");
        assert_eq!(serialize(&ExportData::Single(MappedRecord::new())).unwrap(), "");
    }

    #[test]
    fn test_batch_header_is_union_in_first_seen_order() {
        let records = vec![
            MappedRecord::new().with("Name", "User 1").with("Title", "Dev"),
            MappedRecord::new().with("Name", "User 2").with("Location", "Oslo"),
        ];

        let csv = serialize(&ExportData::Batch(records)).unwrap();
        assert_eq!(
            csv,
            "Name,Title,Location\n\"User 1\",\"Dev\",\"\"\n\"User 2\",\"\",\"Oslo\"\n"
        );
    }

    #[test]
    fn test_header_with_comma_is_quoted() {
        let record = MappedRecord::new().with("City, Country", "Oslo, Norway");
        let csv = serialize(&ExportData::Single(record)).unwrap();
        assert_eq!(csv, "\"City, Country\"\n\"Oslo, Norway\"\n");
    }

    #[test]
    fn test_labels_with_spaces_stay_bare() {
        let record = MappedRecord::new()
            .with("Profile URL", "https://example.com/in/jd")
            .with("Email", "");
        let csv = serialize(&ExportData::Single(record)).unwrap();
        assert_eq!(csv, "Profile URL,Email\n\"https://example.com/in/jd\",\"\"\n");
    }
}
